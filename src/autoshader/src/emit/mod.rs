//! Assembly of the output model and its rendering as Rust source.
use std::collections::BTreeSet;

use log::{debug, info};

use crate::*;

mod render;

pub use render::render;

/// One input module, annotated with everything the later passes need.
#[derive(Debug)]
pub struct ModuleRecord<'r, R> {
    pub reflector: &'r R,
    pub stage: Stage,
    pub entry: String,
    /// Unique short name, e.g. `vert` or `vert_1`.
    pub ident: String,
    pub structs: ModuleStructs,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StageArtifact {
    pub ident: String,
    pub stage: Stage,
    pub entry: String,
    pub specializations: Vec<SpecEntry>,
    pub code: Vec<u32>,
}

/// Everything that ends up in the generated file, in output order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Artifact {
    pub structs: Vec<StructDecl>,
    pub vertex: Option<VertexInput>,
    pub sets: DescriptorSets,
    pub push_ranges: Vec<PushRange>,
    pub stages: Vec<StageArtifact>,
}

impl Artifact {
    pub fn has_vertex_input(&self) -> bool {
        self.vertex.is_some()
    }

    pub fn has_push_constants(&self) -> bool {
        !self.push_ranges.is_empty()
    }

    pub fn is_compute(&self) -> bool {
        self.stages.len() == 1 && self.stages[0].stage == Stage::Compute
    }
}

/// Names the generated file declares or imports besides buffer structs.
fn reserved_names<R: Reflector>(records: &[ModuleRecord<'_, R>], options: &Options) ->
    Vec<String>
{
    let mut names: Vec<String> = ["ash", "vk", "Padded", "Components"].iter()
        .map(|&name| name.to_owned())
        .collect();
    if options.vertex {
        names.push(options.vertex_name.clone());
    }
    let sets: BTreeSet<u32> = records.iter()
        .flat_map(|r| r.reflector.resources().descriptors())
        .map(|res| res.set)
        .collect();
    names.extend(sets.into_iter().map(render::writer_name));
    names.extend(records.iter().map(|r| render::specializer_name(&r.ident)));
    names
}

/// Resolves entry points, assigns module idents, and names structs.
pub fn records<'r, R: Reflector>(modules: &'r [R], options: &Options) ->
    Result<Vec<ModuleRecord<'r, R>>>
{
    let mut records = Vec::with_capacity(modules.len());
    let mut seen: Vec<Stage> = Vec::new();
    for (index, reflector) in modules.iter().enumerate() {
        let entry = reflector.entry_point().map_err(|e| match e {
            Error::MissingEntryPoint { .. } =>
                Error::MissingEntryPoint { module: index },
            e => e,
        })?;
        if entry.stage.vk_flag_name().is_none() {
            return Err(Error::UnsupportedStage { stage: entry.stage.to_string() });
        }
        let repeats = seen.iter().filter(|&&s| s == entry.stage).count();
        seen.push(entry.stage);
        let ident = match repeats {
            0 => entry.stage.postfix().to_owned(),
            n => format!("{}_{}", entry.stage.postfix(), n),
        };
        records.push(ModuleRecord {
            reflector,
            stage: entry.stage,
            entry: entry.name,
            ident,
            structs: Default::default(),
        });
    }

    let reserved = reserved_names(&records, options);
    let structs = discover(records.iter().map(|r| (&r.ident[..], r.reflector)), &reserved)?;
    for (record, structs) in records.iter_mut().zip(structs) {
        record.structs = structs;
    }
    Ok(records)
}

pub fn build<R: Reflector>(modules: &[R], options: &Options) -> Result<Artifact> {
    let records = records(modules, options)?;
    let layouts: Vec<_> = records.iter()
        .map(|r| Layout::new(r.reflector, &r.structs.names))
        .collect();

    let mut structs = Vec::new();
    for (record, layout) in records.iter().zip(layouts.iter()) {
        for &id in record.structs.emit.iter() {
            structs.push(layout.structure(record.reflector.struct_type(id)?)?);
        }
    }

    let vertex = match records.iter().find(|r| r.stage == Stage::Vertex) {
        Some(record) if options.vertex =>
            vertex_input(record.reflector, &options.vertex_name)?,
        _ => None,
    };

    let sets = aggregate(records.iter().map(|r| (r.stage, r.reflector)))?;
    let push_ranges = push_ranges(records.iter().zip(layouts.iter())
        .map(|(r, layout)| (r.stage, layout)))?;

    let mut stages = Vec::with_capacity(records.len());
    for record in records.iter() {
        stages.push(StageArtifact {
            ident: record.ident.clone(),
            stage: record.stage,
            entry: record.entry.clone(),
            specializations: specializations(record.reflector)?,
            code: record.reflector.code().to_vec(),
        });
    }

    debug!("{} structs, {} descriptor sets, {} push constant ranges",
        structs.len(), sets.len(), push_ranges.len());
    Ok(Artifact { structs, vertex, sets, push_ranges, stages })
}

/// Generates the Rust source for a set of modules.
pub fn generate<R: Reflector>(modules: &[R], options: &Options) -> Result<String> {
    let artifact = build(modules, options)?;
    info!("generating bindings for {} modules", artifact.stages.len());
    Ok(render(&artifact, options))
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    fn graphics() -> Vec<TestModule> {
        let mut vert = TestModule::new(Stage::Vertex);
        let cam = camera_block(&mut vert, "Camera");
        vert.uniform("camera", cam, 0, 0);
        vert.input("position", 0, vec(3));
        vert.input("uv", 1, vec(2));
        let push = vert.add_struct("Push", 16, vec![member("tint", vec(4), 0)]);
        vert.push_constants("push", push);

        let mut frag = TestModule::new(Stage::Fragment);
        let cam = camera_block(&mut frag, "Camera");
        frag.uniform("camera", cam, 0, 0);
        let sampled = TypeDescriptor::new(TypeKind::SampledImage { dim: ImageDim::D2 });
        frag.combined("albedo", sampled, 0, 1);
        frag.spec_constant("gamma", 0, TypeDescriptor::float());
        vec![vert, frag]
    }

    #[test]
    fn artifact_contents() {
        let artifact = build(&graphics(), &Options::default()).unwrap();
        let names: Vec<_> = artifact.structs.iter().map(|s| &s.name[..]).collect();
        assert_eq!(names, ["Camera", "Push"]);
        assert!(artifact.has_vertex_input());
        assert!(artifact.has_push_constants());
        assert!(!artifact.is_compute());
        assert_eq!(artifact.sets[&0][&0].stages, StageFlags::VERTEX | StageFlags::FRAGMENT);
        let idents: Vec<_> = artifact.stages.iter().map(|s| &s.ident[..]).collect();
        assert_eq!(idents, ["vert", "frag"]);
        assert_eq!(artifact.stages[1].specializations.len(), 1);
    }

    #[test]
    fn vertex_section_can_be_disabled() {
        let options = Options { vertex: false, ..Default::default() };
        let artifact = build(&graphics(), &options).unwrap();
        assert!(!artifact.has_vertex_input());
    }

    #[test]
    fn repeated_stages_get_numbered() {
        let modules = vec![
            TestModule::new(Stage::Vertex),
            TestModule::new(Stage::Vertex),
            TestModule::new(Stage::Vertex),
        ];
        let records = records(&modules, &Options::default()).unwrap();
        let idents: Vec<_> = records.iter().map(|r| &r.ident[..]).collect();
        assert_eq!(idents, ["vert", "vert_1", "vert_2"]);
    }

    #[test]
    fn missing_entry_point_names_the_module() {
        let mut modules = vec![
            TestModule::new(Stage::Vertex),
            TestModule::new(Stage::Fragment),
        ];
        modules[1].entry = None;
        let err = build(&modules, &Options::default()).unwrap_err();
        assert_eq!(err, Error::MissingEntryPoint { module: 1 });
    }

    #[test]
    fn kernels_are_rejected() {
        let modules = vec![TestModule::new(Stage::Kernel)];
        let err = build(&modules, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStage { .. }));
    }

    #[test]
    fn structs_avoid_generated_names() {
        let mut vert = TestModule::new(Stage::Vertex);
        let v = vert.add_struct("Vertex", 16, vec![member("pos", vec(4), 0)]);
        vert.storage("vertices", TypeDescriptor::structure(v), 0, 0);
        let w = vert.add_struct("DescriptorSet0Writer", 4, vec![
            member("x", TypeDescriptor::float(), 0),
        ]);
        vert.uniform("writer", w, 0, 1);
        vert.input("position", 0, vec(3));

        let out = generate(&[vert], &Options::default()).unwrap();
        assert_eq!(out.matches("pub struct Vertex {").count(), 1);
        assert!(out.contains("pub struct Vertex_1 {"));
        assert_eq!(out.matches("pub struct DescriptorSet0Writer {").count(), 1);
        assert!(out.contains("pub struct DescriptorSet0Writer_1 {"));
    }

    #[test]
    fn deterministic() {
        let a = generate(&graphics(), &Options::default()).unwrap();
        let b = generate(&graphics(), &Options::default()).unwrap();
        assert_eq!(a, b);
    }
}
