#![cfg(test)]

use fnv::FnvHashMap as HashMap;

use crate::*;

/// A hand-built module for exercising the generator without SPIR-V.
#[derive(Debug)]
pub(crate) struct TestModule {
    pub(crate) entry: Option<EntryPoint>,
    pub(crate) resources: Resources,
    pub(crate) structs: HashMap<Id, StructType>,
    pub(crate) spec_constants: Vec<SpecConstant>,
    pub(crate) work_group_size: WorkGroupSize,
    pub(crate) code: Vec<u32>,
    next_id: Id,
}

static INIT_LOGGING: std::sync::Once = std::sync::Once::new();

impl TestModule {
    pub(crate) fn new(stage: Stage) -> Self {
        INIT_LOGGING.call_once(env_logger::init);
        Self {
            entry: Some(EntryPoint { name: "main".to_owned(), stage }),
            resources: Default::default(),
            structs: Default::default(),
            spec_constants: Vec::new(),
            work_group_size: Default::default(),
            code: vec![0x0723_0203, 0x0001_0000, 0, 1, 0],
            next_id: 1,
        }
    }

    fn fresh_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn add_struct(
        &mut self,
        name: &str,
        size: u32,
        members: Vec<Member>,
    ) -> Id {
        let id = self.fresh_id();
        self.structs.insert(id, StructType {
            id,
            name: name.to_owned(),
            size,
            members,
        });
        id
    }

    fn resource(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        set: u32,
        binding: u32,
    ) -> Resource {
        let id = self.fresh_id();
        let base_type = ty.struct_id().unwrap_or(0);
        Resource {
            id,
            base_type,
            ty,
            name: name.to_owned(),
            set,
            binding,
            location: None,
        }
    }

    pub(crate) fn uniform(&mut self, name: &str, block: Id, set: u32, binding: u32) {
        let res = self.resource(name, TypeDescriptor::structure(block), set, binding);
        self.resources.uniform_buffers.push(res);
    }

    pub(crate) fn storage(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        set: u32,
        binding: u32,
    ) {
        let res = self.resource(name, ty, set, binding);
        self.resources.storage_buffers.push(res);
    }

    pub(crate) fn push_constants(&mut self, name: &str, block: Id) {
        let res = self.resource(name, TypeDescriptor::structure(block), 0, 0);
        self.resources.push_constant_blocks.push(res);
    }

    pub(crate) fn combined(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        set: u32,
        binding: u32,
    ) {
        let res = self.resource(name, ty, set, binding);
        self.resources.combined_image_samplers.push(res);
    }

    pub(crate) fn storage_image(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        set: u32,
        binding: u32,
    ) {
        let res = self.resource(name, ty, set, binding);
        self.resources.storage_images.push(res);
    }

    pub(crate) fn input(&mut self, name: &str, location: u32, ty: TypeDescriptor) {
        let mut res = self.resource(name, ty, 0, 0);
        res.location = Some(location);
        self.resources.stage_inputs.push(res);
    }

    pub(crate) fn spec_constant(
        &mut self,
        name: &str,
        constant_id: u32,
        ty: TypeDescriptor,
    ) -> SpecConstant {
        let id = self.fresh_id();
        let spec = SpecConstant {
            constant_id,
            id,
            name: name.to_owned(),
            ty,
        };
        self.spec_constants.push(spec.clone());
        spec
    }
}

impl Reflector for TestModule {
    fn entry_point(&self) -> Result<EntryPoint> {
        self.entry.clone().ok_or(Error::MissingEntryPoint { module: 0 })
    }

    fn resources(&self) -> &Resources {
        &self.resources
    }

    fn struct_type(&self, id: Id) -> Result<&StructType> {
        self.structs.get(&id)
            .ok_or_else(|| Error::invalid(format!("no struct {}", id)))
    }

    fn specialization_constants(&self) -> &[SpecConstant] {
        &self.spec_constants
    }

    fn work_group_size(&self) -> &WorkGroupSize {
        &self.work_group_size
    }

    fn code(&self) -> &[u32] {
        &self.code
    }
}

pub(crate) fn member(name: &str, ty: TypeDescriptor, offset: u32) -> Member {
    Member {
        name: name.to_owned(),
        ty,
        offset,
        matrix_stride: None,
        array_stride: None,
        row_major: false,
    }
}

pub(crate) fn matrix_member(
    name: &str,
    ty: TypeDescriptor,
    offset: u32,
    stride: u32,
) -> Member {
    Member { matrix_stride: Some(stride), ..member(name, ty, offset) }
}

pub(crate) fn array_member(
    name: &str,
    ty: TypeDescriptor,
    offset: u32,
    stride: u32,
) -> Member {
    Member { array_stride: Some(stride), ..member(name, ty, offset) }
}

pub(crate) fn vec(n: u32) -> TypeDescriptor {
    TypeDescriptor::float().vector(n)
}

pub(crate) fn mat(columns: u32, rows: u32) -> TypeDescriptor {
    TypeDescriptor::float().matrix(columns, rows)
}

/// std140 block with two mat4s, used as a "camera" in several tests.
pub(crate) fn camera_block(module: &mut TestModule, name: &str) -> Id {
    module.add_struct(name, 128, vec![
        matrix_member("view", mat(4, 4), 0, 16),
        matrix_member("proj", mat(4, 4), 64, 16),
    ])
}
