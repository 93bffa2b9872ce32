use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use derive_more::Display;
use log::trace;

use crate::*;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DescriptorKind {
    #[display(fmt = "uniform buffer")]
    UniformBuffer,
    #[display(fmt = "storage buffer")]
    StorageBuffer,
    #[display(fmt = "storage image")]
    StorageImage,
    #[display(fmt = "combined image sampler")]
    CombinedImageSampler,
    #[display(fmt = "sampled image")]
    SampledImage,
    #[display(fmt = "sampler")]
    Sampler,
}

impl DescriptorKind {
    /// The `vk::DescriptorType` constant for this kind.
    pub fn vk_name(self) -> &'static str {
        match self {
            Self::UniformBuffer => "UNIFORM_BUFFER",
            Self::StorageBuffer => "STORAGE_BUFFER",
            Self::StorageImage => "STORAGE_IMAGE",
            Self::CombinedImageSampler => "COMBINED_IMAGE_SAMPLER",
            Self::SampledImage => "SAMPLED_IMAGE",
            Self::Sampler => "SAMPLER",
        }
    }

    pub fn is_buffer(self) -> bool {
        matches!(self, Self::UniformBuffer | Self::StorageBuffer)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BindingRecord {
    pub kind: DescriptorKind,
    /// Zero when the binding is a runtime-sized array.
    pub array_size: u32,
    pub dim: Option<ImageDim>,
    pub stages: StageFlags,
    pub name: String,
}

impl BindingRecord {
    pub fn is_runtime_array(&self) -> bool {
        self.array_size == 0
    }
}

pub type SetTable = BTreeMap<u32, BindingRecord>;
pub type DescriptorSets = BTreeMap<u32, SetTable>;

fn categories(resources: &Resources) -> [(DescriptorKind, &[Resource]); 6] {
    [
        (DescriptorKind::UniformBuffer, &resources.uniform_buffers[..]),
        (DescriptorKind::StorageBuffer, &resources.storage_buffers[..]),
        (DescriptorKind::StorageImage, &resources.storage_images[..]),
        (DescriptorKind::CombinedImageSampler, &resources.combined_image_samplers[..]),
        (DescriptorKind::SampledImage, &resources.sampled_images[..]),
        (DescriptorKind::Sampler, &resources.separate_samplers[..]),
    ]
}

fn image_dim(ty: &TypeDescriptor) -> Option<ImageDim> {
    match ty.kind {
        TypeKind::Image { dim, .. } | TypeKind::SampledImage { dim } => Some(dim),
        _ => None,
    }
}

/// Merges the bindings of every stage into one table per set.
pub fn aggregate<'a, R: Reflector + 'a>(
    modules: impl IntoIterator<Item = (Stage, &'a R)>,
) -> Result<DescriptorSets> {
    let mut sets = DescriptorSets::new();
    for (stage, reflector) in modules {
        for (kind, resources) in categories(reflector.resources()).iter() {
            for res in resources.iter() {
                add_binding(&mut sets, stage, *kind, res)?;
            }
        }
    }
    Ok(sets)
}

fn add_binding(
    sets: &mut DescriptorSets,
    stage: Stage,
    kind: DescriptorKind,
    res: &Resource,
) -> Result<()> {
    let array_size = res.ty.outer_extent().unwrap_or(1);
    let dim = image_dim(&res.ty);
    trace!("{} stage: {} {} at ({}, {})",
        stage, kind, res.name, res.set, res.binding);

    let record = match sets.entry(res.set).or_default().entry(res.binding) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            entry.insert(BindingRecord {
                kind,
                array_size,
                dim,
                stages: stage.flag(),
                name: res.name.clone(),
            });
            return Ok(());
        },
    };

    let conflict = |detail: String| Error::BindingConflict {
        set: res.set,
        binding: res.binding,
        stage,
        detail,
    };
    if record.kind != kind {
        return Err(conflict(format!("{} declared as {}", record.kind, kind)));
    }
    if record.dim != dim {
        return Err(conflict(format!("image dimension {:?} declared as {:?}",
            record.dim, dim)));
    }
    if record.array_size != array_size {
        return Err(conflict(format!("array size {} declared as {}",
            record.array_size, array_size)));
    }
    record.stages |= stage.flag();
    if record.name.is_empty() {
        record.name = res.name.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    fn sampler2d() -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::SampledImage { dim: ImageDim::D2 })
    }

    fn storage2d() -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::Image { dim: ImageDim::D2, sampled: false })
    }

    #[test]
    fn set_layout() {
        let mut vert = TestModule::new(Stage::Vertex);
        let cam = camera_block(&mut vert, "Camera");
        vert.uniform("camera", cam, 0, 0);
        vert.storage_image("image", storage2d(), 1, 0);
        let inst = vert.add_struct("Instances", 64, vec![
            matrix_member("model", mat(4, 4).array_of(0), 0, 16),
        ]);
        vert.structs.get_mut(&inst).unwrap().members[0].array_stride = Some(64);
        vert.storage("instances", TypeDescriptor::structure(inst), 1, 1);

        let mut frag = TestModule::new(Stage::Fragment);
        frag.combined("textures", sampler2d().array_of(8), 0, 1);
        frag.storage_image("", storage2d(), 1, 0);

        let sets = aggregate(vec![(Stage::Vertex, &vert), (Stage::Fragment, &frag)])
            .unwrap();
        assert_eq!(sets.keys().copied().collect::<Vec<_>>(), [0, 1]);

        let b = &sets[&0][&0];
        assert_eq!((b.kind, b.array_size, b.stages),
            (DescriptorKind::UniformBuffer, 1, StageFlags::VERTEX));
        let b = &sets[&0][&1];
        assert_eq!((b.kind, b.array_size, b.stages),
            (DescriptorKind::CombinedImageSampler, 8, StageFlags::FRAGMENT));
        let b = &sets[&1][&0];
        assert_eq!((b.kind, b.stages),
            (DescriptorKind::StorageImage, StageFlags::VERTEX | StageFlags::FRAGMENT));
        assert_eq!(b.name, "image");
        let b = &sets[&1][&1];
        assert_eq!((b.kind, b.stages),
            (DescriptorKind::StorageBuffer, StageFlags::VERTEX));
    }

    #[test]
    fn runtime_array() {
        let mut frag = TestModule::new(Stage::Fragment);
        frag.combined("textures", sampler2d().array_of(0), 0, 0);
        frag.combined("samplers", sampler2d().array_of(64), 0, 1);
        let sets = aggregate(vec![(Stage::Fragment, &frag)]).unwrap();
        assert!(sets[&0][&0].is_runtime_array());
        assert_eq!(sets[&0][&1].array_size, 64);
    }

    #[test]
    fn first_nonempty_name_wins() {
        let mut vert = TestModule::new(Stage::Vertex);
        vert.combined("", sampler2d(), 0, 0);
        let mut frag = TestModule::new(Stage::Fragment);
        frag.combined("albedo", sampler2d(), 0, 0);
        let mut comp = TestModule::new(Stage::Geometry);
        comp.combined("other", sampler2d(), 0, 0);
        let sets = aggregate(vec![
            (Stage::Vertex, &vert),
            (Stage::Fragment, &frag),
            (Stage::Geometry, &comp),
        ]).unwrap();
        assert_eq!(sets[&0][&0].name, "albedo");
    }

    #[test]
    fn conflicts() {
        let mut vert = TestModule::new(Stage::Vertex);
        let cam = camera_block(&mut vert, "Camera");
        vert.uniform("camera", cam, 0, 0);
        vert.combined("tex", sampler2d().array_of(4), 0, 1);

        let mut kind = TestModule::new(Stage::Fragment);
        kind.storage_image("camera", storage2d(), 0, 0);
        let err = aggregate(vec![(Stage::Vertex, &vert), (Stage::Fragment, &kind)])
            .unwrap_err();
        assert!(matches!(err,
            Error::BindingConflict { set: 0, binding: 0, stage: Stage::Fragment, .. }));

        let mut size = TestModule::new(Stage::Fragment);
        size.combined("tex", sampler2d().array_of(2), 0, 1);
        let err = aggregate(vec![(Stage::Vertex, &vert), (Stage::Fragment, &size)])
            .unwrap_err();
        assert!(matches!(err, Error::BindingConflict { set: 0, binding: 1, .. }));

        let mut dim = TestModule::new(Stage::Fragment);
        let cube = TypeDescriptor::new(TypeKind::SampledImage { dim: ImageDim::Cube });
        dim.combined("tex", cube.array_of(4), 0, 1);
        let err = aggregate(vec![(Stage::Vertex, &vert), (Stage::Fragment, &dim)])
            .unwrap_err();
        assert!(matches!(err, Error::BindingConflict { set: 0, binding: 1, .. }));
    }
}
