use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::*;
use super::{Artifact, StageArtifact};

const HEADER: &str = "// Generated by autoshader. Do not edit.\n";
const RUNTIME: &str = "autoshader_runtime";
const OVERFLOW: &str = "Result<&mut Self, autoshader_runtime::WriterOverflow>";

/// Renders the artifact as a Rust source file.
pub fn render(artifact: &Artifact, options: &Options) -> String {
    let body = Body { artifact, options }.to_string();
    let mut out = String::from(HEADER);
    let depth = options.modules.len();
    for (level, module) in options.modules.iter().enumerate() {
        out.push_str(&indent(level));
        out.push_str(&format!("pub mod {} {{\n", layout::ident(module)));
    }
    for line in body.lines() {
        if !line.is_empty() {
            out.push_str(&indent(depth));
            out.push_str(line);
        }
        out.push('\n');
    }
    for level in (0..depth).rev() {
        out.push_str(&indent(level));
        out.push_str("}\n");
    }
    out
}

fn indent(level: usize) -> String {
    "    ".repeat(level)
}

/// `vert_1` -> `Vert1`
pub(super) fn type_ident(ident: &str) -> String {
    ident.split('_').map(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }).collect()
}

fn stage_flags(flags: StageFlags) -> String {
    let names: Vec<_> = flags.stages()
        .filter_map(|stage| stage.vk_flag_name())
        .map(|name| format!("vk::ShaderStageFlags::{}", name))
        .collect();
    if names.is_empty() {
        "vk::ShaderStageFlags::empty()".to_owned()
    } else {
        names.join(" | ")
    }
}

/// Per-binding base names, unique within the set.
fn binding_names(table: &SetTable) -> BTreeMap<u32, String> {
    let mut names = BTreeMap::new();
    let mut used = Vec::new();
    for (&binding, record) in table.iter() {
        let mut name = if record.name.is_empty() {
            format!("binding{}", binding)
        } else {
            sanitize(&record.name)
        };
        if used.contains(&name) {
            name = format!("{}_{}", name, binding);
        }
        used.push(name.clone());
        names.insert(binding, name);
    }
    names
}

/// Runtime descriptor counts a set's helpers must be told about.
fn runtime_counts(table: &SetTable) -> Vec<String> {
    let names = binding_names(table);
    table.iter()
        .filter(|(_, record)| record.is_runtime_array())
        .map(|(binding, _)| format!("{}_count", names[binding]))
        .collect()
}

struct Body<'a> {
    artifact: &'a Artifact,
    options: &'a Options,
}

impl fmt::Display for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let artifact = self.artifact;
        writeln!(f, "#[allow(unused_imports)]")?;
        writeln!(f, "use {}::ash::{{self, vk}};", RUNTIME)?;
        writeln!(f, "#[allow(unused_imports)]")?;
        writeln!(f, "use {}::Padded;", RUNTIME)?;

        for decl in artifact.structs.iter() {
            writeln!(f)?;
            write_struct(f, decl)?;
        }
        if let Some(vertex) = &artifact.vertex {
            writeln!(f)?;
            write_vertex(f, vertex)?;
        }
        for (&set, table) in artifact.sets.iter() {
            writeln!(f)?;
            write_set_layout(f, set, table)?;
            writeln!(f)?;
            write_set_writer(f, set, table)?;
        }
        if artifact.has_push_constants() {
            writeln!(f)?;
            write_push_ranges(f, &artifact.push_ranges)?;
        }
        for stage in artifact.stages.iter() {
            if stage.specializations.is_empty() { continue; }
            writeln!(f)?;
            write_specializer(f, stage)?;
        }
        if self.options.source {
            for stage in artifact.stages.iter() {
                writeln!(f)?;
                write_code(f, stage)?;
            }
        }
        writeln!(f)?;
        write_components(f, artifact, self.options)
    }
}

fn write_struct(f: &mut fmt::Formatter<'_>, decl: &StructDecl) -> fmt::Result {
    writeln!(f, "#[repr(C)]")?;
    writeln!(f, "#[derive(Clone, Copy, Debug)]")?;
    writeln!(f, "pub struct {} {{", decl.name)?;
    for field in decl.fields.iter() {
        writeln!(f, "    pub {},", field)?;
    }
    writeln!(f, "}}")?;
    writeln!(f)?;
    writeln!(f, "const _: () = assert!(std::mem::size_of::<{}>() == {});",
        decl.name, decl.size)
}

fn write_vertex(f: &mut fmt::Formatter<'_>, vertex: &VertexInput) -> fmt::Result {
    let name = &vertex.name;
    writeln!(f, "#[repr(C)]")?;
    writeln!(f, "#[derive(Clone, Copy, Debug)]")?;
    writeln!(f, "pub struct {} {{", name)?;
    for field in vertex.fields.iter() {
        writeln!(f, "    pub {}: {},", layout::ident(&field.name), field.ty)?;
    }
    writeln!(f, "}}")?;
    writeln!(f)?;

    writeln!(f, "pub fn vertex_binding_descriptions() -> [vk::VertexInputBindingDescription; 1] {{")?;
    writeln!(f, "    [vk::VertexInputBindingDescription {{")?;
    writeln!(f, "        binding: 0,")?;
    writeln!(f, "        stride: std::mem::size_of::<{}>() as u32,", name)?;
    writeln!(f, "        input_rate: vk::VertexInputRate::VERTEX,")?;
    writeln!(f, "    }}]")?;
    writeln!(f, "}}")?;
    writeln!(f)?;

    writeln!(f, "pub fn vertex_attribute_descriptions() -> [vk::VertexInputAttributeDescription; {}] {{",
        vertex.attributes.len())?;
    writeln!(f, "    [")?;
    for attr in vertex.attributes.iter() {
        let offset = format!("{}::offset_of!({}, {})",
            RUNTIME, name, layout::ident(&attr.field));
        writeln!(f, "        vk::VertexInputAttributeDescription {{")?;
        writeln!(f, "            location: {},", attr.location)?;
        writeln!(f, "            binding: 0,")?;
        writeln!(f, "            format: vk::Format::{},", attr.format)?;
        if attr.offset == 0 {
            writeln!(f, "            offset: {} as u32,", offset)?;
        } else {
            writeln!(f, "            offset: ({} + {}) as u32,", offset, attr.offset)?;
        }
        writeln!(f, "        }},")?;
    }
    writeln!(f, "    ]")?;
    writeln!(f, "}}")
}

fn write_set_layout(f: &mut fmt::Formatter<'_>, set: u32, table: &SetTable) ->
    fmt::Result
{
    let names = binding_names(table);
    let params = runtime_counts(table).iter()
        .map(|count| format!("{}: u32", count))
        .join(", ");
    writeln!(f, "pub fn descriptor_set{}_layout_bindings({}) -> [vk::DescriptorSetLayoutBinding; {}] {{",
        set, params, table.len())?;
    writeln!(f, "    [")?;
    for (binding, record) in table.iter() {
        let count = if record.is_runtime_array() {
            format!("{}_count", names[binding])
        } else {
            record.array_size.to_string()
        };
        writeln!(f, "        vk::DescriptorSetLayoutBinding {{")?;
        writeln!(f, "            binding: {},", binding)?;
        writeln!(f, "            descriptor_type: vk::DescriptorType::{},", record.kind.vk_name())?;
        writeln!(f, "            descriptor_count: {},", count)?;
        writeln!(f, "            stage_flags: {},", stage_flags(record.stages))?;
        writeln!(f, "            p_immutable_samplers: std::ptr::null(),")?;
        writeln!(f, "        }},")?;
    }
    writeln!(f, "    ]")?;
    writeln!(f, "}}")
}

fn write_set_writer(f: &mut fmt::Formatter<'_>, set: u32, table: &SetTable) ->
    fmt::Result
{
    let names = binding_names(table);
    let counts = runtime_counts(table);
    let bindings = table.iter().map(|(binding, record)| {
        let count = if record.is_runtime_array() {
            format!("{}_count", names[binding])
        } else {
            record.array_size.to_string()
        };
        format!("({}, {})", binding, count)
    }).join(", ");
    let writer = writer_name(set);

    writeln!(f, "#[derive(Debug)]")?;
    writeln!(f, "pub struct {} {{", writer)?;
    writeln!(f, "    inner: {}::DescriptorWriter,", RUNTIME)?;
    writeln!(f, "}}")?;
    writeln!(f)?;
    writeln!(f, "impl {} {{", writer)?;
    let params = std::iter::once("set: vk::DescriptorSet".to_owned())
        .chain(counts.iter().map(|count| format!("{}: u32", count)))
        .join(", ");
    writeln!(f, "    pub fn new({}) -> Self {{", params)?;
    writeln!(f, "        let bindings = [{}];", bindings)?;
    writeln!(f, "        Self {{ inner: {}::DescriptorWriter::new(set, &bindings) }}", RUNTIME)?;
    writeln!(f, "    }}")?;

    for (binding, record) in table.iter() {
        let ty = format!("vk::DescriptorType::{}", record.kind.vk_name());
        let (params, call) = match record.kind {
            DescriptorKind::UniformBuffer | DescriptorKind::StorageBuffer => (
                "buffer: vk::Buffer, offset: vk::DeviceSize, range: vk::DeviceSize",
                format!("write_buffer({}, {}, buffer, offset, range)", binding, ty),
            ),
            DescriptorKind::CombinedImageSampler => (
                "sampler: vk::Sampler, view: vk::ImageView, layout: vk::ImageLayout",
                format!("write_image({}, {}, sampler, view, layout)", binding, ty),
            ),
            DescriptorKind::SampledImage | DescriptorKind::StorageImage => (
                "view: vk::ImageView, layout: vk::ImageLayout",
                format!("write_image({}, {}, vk::Sampler::null(), view, layout)",
                    binding, ty),
            ),
            DescriptorKind::Sampler => (
                "sampler: vk::Sampler",
                format!("write_image({}, {}, sampler, vk::ImageView::null(), \
                    vk::ImageLayout::UNDEFINED)", binding, ty),
            ),
        };
        writeln!(f)?;
        writeln!(f, "    pub fn set_{}(&mut self, {}) -> {} {{", names[binding], params, OVERFLOW)?;
        writeln!(f, "        self.inner.{}?;", call)?;
        writeln!(f, "        Ok(self)")?;
        writeln!(f, "    }}")?;
    }

    writeln!(f)?;
    writeln!(f, "    pub fn clear(&mut self) {{")?;
    writeln!(f, "        self.inner.clear();")?;
    writeln!(f, "    }}")?;
    writeln!(f)?;
    writeln!(f, "    pub unsafe fn update(&self, device: &ash::Device) {{")?;
    writeln!(f, "        self.inner.update(device);")?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")
}

fn write_push_ranges(f: &mut fmt::Formatter<'_>, ranges: &[PushRange]) -> fmt::Result {
    writeln!(f, "pub fn push_constant_ranges() -> [vk::PushConstantRange; {}] {{", ranges.len())?;
    writeln!(f, "    [")?;
    for range in ranges.iter() {
        writeln!(f, "        vk::PushConstantRange {{")?;
        writeln!(f, "            stage_flags: {},", stage_flags(range.stages))?;
        writeln!(f, "            offset: {},", range.start)?;
        writeln!(f, "            size: {},", range.size())?;
        writeln!(f, "        }},")?;
    }
    writeln!(f, "    ]")?;
    writeln!(f, "}}")
}

pub(super) fn specializer_name(ident: &str) -> String {
    format!("{}Specializer", type_ident(ident))
}

pub(super) fn writer_name(set: u32) -> String {
    format!("DescriptorSet{}Writer", set)
}

fn write_specializer(f: &mut fmt::Formatter<'_>, stage: &StageArtifact) -> fmt::Result {
    let name = specializer_name(&stage.ident);
    let flags = stage_flags(stage.stage.flag());

    writeln!(f, "#[derive(Debug)]")?;
    writeln!(f, "pub struct {} {{", name)?;
    writeln!(f, "    inner: {}::Specializer,", RUNTIME)?;
    writeln!(f, "}}")?;
    writeln!(f)?;
    writeln!(f, "#[allow(non_snake_case)]")?;
    writeln!(f, "impl {} {{", name)?;
    writeln!(f, "    pub fn new() -> Self {{")?;
    writeln!(f, "        let inner = {}::Specializer::new({}, {});",
        RUNTIME, flags, stage.specializations.len())?;
    writeln!(f, "        Self {{ inner }}")?;
    writeln!(f, "    }}")?;

    let mut used = Vec::new();
    for spec in stage.specializations.iter() {
        let mut setter = format!("set_{}", sanitize(&spec.name));
        if used.contains(&setter) {
            setter = format!("{}_{}", setter, spec.constant_id);
        }
        used.push(setter.clone());
        writeln!(f)?;
        writeln!(f, "    pub fn {}(&mut self, value: {}) -> {} {{",
            setter, spec.kind.rust_type(), OVERFLOW)?;
        writeln!(f, "        self.inner.{}({}, value)?;", spec.kind.setter(), spec.constant_id)?;
        writeln!(f, "        Ok(self)")?;
        writeln!(f, "    }}")?;
    }

    writeln!(f)?;
    writeln!(f, "    pub fn stage(&self) -> vk::ShaderStageFlags {{")?;
    writeln!(f, "        self.inner.stage()")?;
    writeln!(f, "    }}")?;
    writeln!(f)?;
    writeln!(f, "    /// The returned info points into `self`.")?;
    writeln!(f, "    pub fn info(&self) -> vk::SpecializationInfo {{")?;
    writeln!(f, "        self.inner.info()")?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")?;
    writeln!(f)?;
    writeln!(f, "impl Default for {} {{", name)?;
    writeln!(f, "    fn default() -> Self {{")?;
    writeln!(f, "        Self::new()")?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")
}

fn code_static(ident: &str) -> String {
    format!("{}_CODE", ident.to_uppercase())
}

fn write_code(f: &mut fmt::Formatter<'_>, stage: &StageArtifact) -> fmt::Result {
    writeln!(f, "pub static {}: [u32; {}] = [", code_static(&stage.ident), stage.code.len())?;
    for chunk in stage.code.chunks(8) {
        let words = chunk.iter().map(|word| format!("{:#010x}", word)).join(", ");
        writeln!(f, "    {},", words)?;
    }
    writeln!(f, "];")
}

fn write_components(
    f: &mut fmt::Formatter<'_>,
    artifact: &Artifact,
    options: &Options,
) -> fmt::Result {
    let mut params = vec!["device: &ash::Device".to_owned()];
    if !options.source {
        for stage in artifact.stages.iter() {
            params.push(format!("{}_code: &[u32]", stage.ident));
        }
    }
    let mut set_args = Vec::new();
    for (&set, table) in artifact.sets.iter() {
        let counts = runtime_counts(table);
        for count in counts.iter() {
            params.push(format!("set{}_{}: u32", set, count));
        }
        let args = counts.iter().map(|count| format!("set{}_{}", set, count)).join(", ");
        set_args.push((set, args));
    }

    writeln!(f, "#[derive(Debug)]")?;
    writeln!(f, "pub struct Components {{")?;
    writeln!(f, "    parts: {}::PipelineParts,", RUNTIME)?;
    writeln!(f, "}}")?;
    writeln!(f)?;
    writeln!(f, "impl Components {{")?;
    writeln!(f, "    pub unsafe fn new({}) -> ash::prelude::VkResult<Self> {{", params.join(", "))?;
    for (set, args) in set_args.iter() {
        writeln!(f, "        let set{} = descriptor_set{}_layout_bindings({});", set, set, args)?;
    }
    let sets = set_args.iter()
        .map(|(set, _)| format!("({}, &set{}[..])", set, set))
        .join(", ");
    let push = if artifact.has_push_constants() {
        "&push_constant_ranges()"
    } else {
        "&[]"
    };
    let code = artifact.stages.iter().map(|stage| if options.source {
        format!("&{}[..]", code_static(&stage.ident))
    } else {
        format!("{}_code", stage.ident)
    }).join(", ");
    writeln!(f, "        let parts = {}::PipelineParts::new(", RUNTIME)?;
    writeln!(f, "            device,")?;
    writeln!(f, "            &[{}],", sets)?;
    writeln!(f, "            {},", push)?;
    writeln!(f, "            &[{}],", code)?;
    writeln!(f, "        )?;")?;
    writeln!(f, "        Ok(Self {{ parts }})")?;
    writeln!(f, "    }}")?;
    writeln!(f)?;
    writeln!(f, "    pub fn set_layouts(&self) -> &[vk::DescriptorSetLayout] {{")?;
    writeln!(f, "        self.parts.set_layouts()")?;
    writeln!(f, "    }}")?;
    writeln!(f)?;
    writeln!(f, "    pub fn layout(&self) -> vk::PipelineLayout {{")?;
    writeln!(f, "        self.parts.layout()")?;
    writeln!(f, "    }}")?;

    for (index, stage) in artifact.stages.iter().enumerate() {
        writeln!(f)?;
        writeln!(f, "    pub fn {}(&self) -> vk::ShaderModule {{", stage.ident)?;
        writeln!(f, "        self.parts.modules()[{}]", index)?;
        writeln!(f, "    }}")?;
    }

    writeln!(f)?;
    writeln!(f, "    pub unsafe fn create_pipe(&self, options: &{}::PipeOptions) ->", RUNTIME)?;
    writeln!(f, "        ash::prelude::VkResult<vk::Pipeline>")?;
    writeln!(f, "    {{")?;
    writeln!(f, "        let stages = [")?;
    for stage in artifact.stages.iter() {
        writeln!(f, "            {}::StageEntry {{", RUNTIME)?;
        writeln!(f, "                stage: {},", stage_flags(stage.stage.flag()))?;
        writeln!(f, "                module: self.{}(),", stage.ident)?;
        writeln!(f, "                entry: {:?},", stage.entry)?;
        writeln!(f, "            }},")?;
    }
    writeln!(f, "        ];")?;
    let vertex = match &artifact.vertex {
        Some(_) if !artifact.is_compute() => {
            writeln!(f, "        let bindings = vertex_binding_descriptions();")?;
            writeln!(f, "        let attributes = vertex_attribute_descriptions();")?;
            writeln!(f, "        let vertex = {}::VertexInput {{", RUNTIME)?;
            writeln!(f, "            bindings: &bindings,")?;
            writeln!(f, "            attributes: &attributes,")?;
            writeln!(f, "        }};")?;
            "Some(&vertex)"
        },
        _ => "None",
    };
    writeln!(f, "        {}::create_pipe(self.parts.device(), self.layout(), &stages, {}, options)",
        RUNTIME, vertex)?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    fn sampled() -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::SampledImage { dim: ImageDim::D2 })
    }

    fn graphics() -> Vec<TestModule> {
        let mut vert = TestModule::new(Stage::Vertex);
        let cam = camera_block(&mut vert, "Camera");
        vert.uniform("camera", cam, 0, 0);
        vert.input("position", 0, vec(3));
        vert.input("normal", 1, vec(3));
        let push = vert.add_struct("Push", 16, vec![member("tint", vec(4), 0)]);
        vert.push_constants("push", push);

        let mut frag = TestModule::new(Stage::Fragment);
        frag.combined("textures", sampled().array_of(0), 1, 0);
        frag.spec_constant("gamma", 0, TypeDescriptor::float());
        vec![vert, frag]
    }

    fn generate(modules: &[TestModule], options: &Options) -> String {
        render(&super::super::build(modules, options).unwrap(), options)
    }

    #[test]
    fn struct_text() {
        let out = generate(&graphics(), &Options::default());
        assert!(out.starts_with(HEADER));
        assert!(out.contains(concat!(
            "#[repr(C)]\n",
            "#[derive(Clone, Copy, Debug)]\n",
            "pub struct Camera {\n",
            "    pub view: [[f32; 4]; 4],\n",
            "    pub proj: [[f32; 4]; 4],\n",
            "}\n",
            "\n",
            "const _: () = assert!(std::mem::size_of::<Camera>() == 128);\n",
        )));
    }

    #[test]
    fn vertex_text() {
        let out = generate(&graphics(), &Options::default());
        assert!(out.contains("pub struct Vertex {\n    pub position: [f32; 3],\n"));
        assert!(out.contains("format: vk::Format::R32G32B32_SFLOAT,"));
        assert!(out.contains("offset: autoshader_runtime::offset_of!(Vertex, normal) as u32,"));
        assert!(out.contains("[vk::VertexInputAttributeDescription; 2]"));
        assert!(out.contains("Some(&vertex)"));

        let options = Options { vertex: false, ..Default::default() };
        let out = generate(&graphics(), &options);
        assert!(!out.contains("pub struct Vertex"));
        assert!(out.contains("&stages, None, options)"));
    }

    #[test]
    fn descriptor_text() {
        let out = generate(&graphics(), &Options::default());
        assert!(out.contains(
            "pub fn descriptor_set0_layout_bindings() -> [vk::DescriptorSetLayoutBinding; 1] {"));
        assert!(out.contains(
            "pub fn descriptor_set1_layout_bindings(textures_count: u32) -> \
            [vk::DescriptorSetLayoutBinding; 1] {"));
        assert!(out.contains("descriptor_count: textures_count,"));
        assert!(out.contains("descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,"));
        assert!(out.contains("pub fn new(set: vk::DescriptorSet, textures_count: u32) -> Self {"));
        assert!(out.contains("let bindings = [(0, textures_count)];"));
        assert!(out.contains("let bindings = [(0, 1)];"));
        assert!(out.contains("pub fn set_camera(&mut self, buffer: vk::Buffer, "));
        assert!(out.contains("self.inner.write_image(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, \
            sampler, view, layout)?;"));
        assert!(out.contains("let set1 = descriptor_set1_layout_bindings(set1_textures_count);"));
    }

    #[test]
    fn push_and_specializer_text() {
        let out = generate(&graphics(), &Options::default());
        assert!(out.contains(concat!(
            "        vk::PushConstantRange {\n",
            "            stage_flags: vk::ShaderStageFlags::VERTEX,\n",
            "            offset: 0,\n",
            "            size: 16,\n",
        )));
        assert!(out.contains("pub struct FragSpecializer {"));
        assert!(out.contains("Specializer::new(vk::ShaderStageFlags::FRAGMENT, 1);"));
        assert!(out.contains("pub fn set_gamma(&mut self, value: f32)"));
        assert!(out.contains("self.inner.set_f32(0, value)?;"));
        assert!(!out.contains("VertSpecializer"));
    }

    #[test]
    fn source_text() {
        let out = generate(&graphics(), &Options::default());
        assert!(out.contains("pub static VERT_CODE: [u32; 5] = [\n    0x07230203, 0x00010000,"));
        assert!(out.contains("&[&VERT_CODE[..], &FRAG_CODE[..]],"));

        let options = Options { source: false, ..Default::default() };
        let out = generate(&graphics(), &options);
        assert!(!out.contains("VERT_CODE"));
        assert!(out.contains("vert_code: &[u32], frag_code: &[u32]"));
        assert!(out.contains("&[vert_code, frag_code],"));
    }

    #[test]
    fn modules_wrap_output() {
        let options = Options {
            modules: vec!["shaders".to_owned(), "mesh".to_owned()],
            ..Default::default()
        };
        let out = generate(&graphics(), &options);
        assert!(out.contains("pub mod shaders {\n    pub mod mesh {\n"));
        assert!(out.contains("\n        pub struct Camera {\n"));
        assert!(out.ends_with("    }\n}\n"));
    }

    #[test]
    fn compute_pipeline_has_no_vertex_input() {
        let mut comp = TestModule::new(Stage::Compute);
        let data = comp.add_struct("Data", 16, vec![member("v", vec(4), 0)]);
        comp.storage("data", TypeDescriptor::structure(data), 0, 0);
        let out = generate(&[comp], &Options::default());
        assert!(out.contains("stage: vk::ShaderStageFlags::COMPUTE,"));
        assert!(out.contains("&stages, None, options)"));
        assert!(out.contains("pub fn comp(&self) -> vk::ShaderModule {"));
        assert!(out.contains("            &[],\n"));
    }

    #[test]
    fn reflected_names_become_identifiers() {
        let mut frag = TestModule::new(Stage::Fragment);
        frag.combined("material.albedo", sampled(), 0, 0);
        frag.combined("lights[]", sampled().array_of(0), 0, 1);
        frag.spec_constant("cfg.gamma", 0, TypeDescriptor::float());
        let out = generate(&[frag], &Options::default());
        assert!(out.contains("pub fn set_material_albedo(&mut self, "));
        assert!(out.contains("pub fn set_lights__(&mut self, "));
        assert!(out.contains("lights___count: u32"));
        assert!(out.contains("pub fn set_cfg_gamma(&mut self, value: f32)"));
        assert!(!out.contains("material.albedo"));
    }

    #[test]
    fn idents() {
        assert_eq!(type_ident("vert"), "Vert");
        assert_eq!(type_ident("vert_1"), "Vert1");
        assert_eq!(stage_flags(StageFlags::empty()), "vk::ShaderStageFlags::empty()");
        assert_eq!(stage_flags(StageFlags::VERTEX | StageFlags::COMPUTE),
            "vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::COMPUTE");
    }
}
