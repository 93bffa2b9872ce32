use autoshader::{Id, Reflector, Resources, SpecConstant, Stage, StructType, WorkGroupSize};
use log::warn;
use spirv_headers as spv;

use crate::*;

fn stage(model: spv::ExecutionModel) -> Option<Stage> {
    Some(match model {
        spv::ExecutionModel::Vertex => Stage::Vertex,
        spv::ExecutionModel::TessellationControl => Stage::TessControl,
        spv::ExecutionModel::TessellationEvaluation => Stage::TessEval,
        spv::ExecutionModel::Geometry => Stage::Geometry,
        spv::ExecutionModel::Fragment => Stage::Fragment,
        spv::ExecutionModel::GLCompute => Stage::Compute,
        spv::ExecutionModel::Kernel => Stage::Kernel,
        _ => return None,
    })
}

impl Module {
    /// The SPIR-V version as a pair `(major, minor)`.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn get_entry_point(&self, name: &impl AsRef<str>) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|entry| entry.name == name.as_ref())
    }

    pub fn structs(&self) -> impl ExactSizeIterator<Item = &StructType> + '_ {
        self.structs.values()
    }
}

impl Reflector for Module {
    /// The first entry point. Further entry points are ignored.
    fn entry_point(&self) -> autoshader::Result<autoshader::EntryPoint> {
        let entry = self.entry_points.first()
            .ok_or(autoshader::Error::MissingEntryPoint { module: 0 })?;
        if self.entry_points.len() > 1 {
            warn!("module has {} entry points; using {}",
                self.entry_points.len(), entry.name);
        }
        let stage = stage(entry.execution_model)
            .ok_or_else(|| autoshader::Error::UnsupportedStage {
                stage: format!("{:?}", entry.execution_model),
            })?;
        Ok(autoshader::EntryPoint { name: entry.name.clone(), stage })
    }

    fn resources(&self) -> &Resources {
        &self.resources
    }

    fn struct_type(&self, id: Id) -> autoshader::Result<&StructType> {
        self.structs.get(&id).ok_or_else(|| autoshader::Error::InvalidModule {
            detail: format!("%{} is not a struct type", id),
        })
    }

    fn specialization_constants(&self) -> &[SpecConstant] {
        &self.spec_constants
    }

    fn work_group_size(&self) -> &WorkGroupSize {
        &self.work_group_size
    }

    fn code(&self) -> &[u32] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use autoshader::{ImageDim, TypeKind};

    use crate::testing::*;
    use super::*;

    // layout(set = 0, binding = 0) uniform Camera { mat4 view; mat4 proj; } camera;
    // layout(set = 1, binding = 2) buffer Lights { vec4 lights[]; };
    fn buffers() -> Module {
        let mut asm = Assembler::new();
        asm.entry_point(spv::ExecutionModel::Vertex, "main", &[]);
        let float = asm.type_float(32);
        let vec4 = asm.type_vector(float, 4);
        let mat4 = asm.type_matrix(vec4, 4);

        let camera = asm.type_struct(&[mat4, mat4]);
        asm.name(camera, "Camera");
        asm.member_name(camera, 0, "view");
        asm.member_name(camera, 1, "proj");
        asm.decorate(camera, spv::Decoration::Block, &[]);
        for member in 0..2 {
            asm.member_decorate(camera, member, spv::Decoration::Offset, &[member * 64]);
            asm.member_decorate(camera, member, spv::Decoration::ColMajor, &[]);
            asm.member_decorate(camera, member, spv::Decoration::MatrixStride, &[16]);
        }
        let ptr = asm.type_pointer(spv::StorageClass::Uniform, camera);
        let var = asm.variable(ptr, spv::StorageClass::Uniform);
        asm.name(var, "camera");
        asm.decorate(var, spv::Decoration::DescriptorSet, &[0]);
        asm.decorate(var, spv::Decoration::Binding, &[0]);

        let lights_arr = asm.type_runtime_array(vec4);
        asm.decorate(lights_arr, spv::Decoration::ArrayStride, &[16]);
        let lights = asm.type_struct(&[lights_arr]);
        asm.name(lights, "Lights");
        asm.member_name(lights, 0, "lights");
        asm.member_decorate(lights, 0, spv::Decoration::Offset, &[0]);
        asm.decorate(lights, spv::Decoration::BufferBlock, &[]);
        let ptr = asm.type_pointer(spv::StorageClass::Uniform, lights);
        let var = asm.variable(ptr, spv::StorageClass::Uniform);
        asm.decorate(var, spv::Decoration::DescriptorSet, &[1]);
        asm.decorate(var, spv::Decoration::Binding, &[2]);

        parse_words(&asm.finish()).unwrap()
    }

    #[test]
    fn buffer_blocks() {
        let module = buffers();
        let entry = module.entry_point().unwrap();
        assert_eq!(entry.name, "main");
        assert_eq!(entry.stage, Stage::Vertex);

        let res = module.resources();
        assert_eq!(res.uniform_buffers.len(), 1);
        let camera = &res.uniform_buffers[0];
        assert_eq!((camera.name.as_str(), camera.set, camera.binding), ("camera", 0, 0));
        let st = module.struct_type(camera.base_type).unwrap();
        assert_eq!(st.name, "Camera");
        assert_eq!(st.size, 128);
        assert_eq!(st.members[1].name, "proj");
        assert_eq!(st.members[1].offset, 64);
        assert_eq!(st.members[1].ty.columns, 4);
        assert!(!st.members[1].row_major);

        assert_eq!(res.storage_buffers.len(), 1);
        let lights = &res.storage_buffers[0];
        assert_eq!((lights.set, lights.binding), (1, 2));
        assert!(lights.name.is_empty());
        let st = module.struct_type(lights.base_type).unwrap();
        // The runtime array counts as a single element.
        assert_eq!(st.size, 16);
        assert_eq!(st.members[0].ty.outer_extent(), Some(0));
        assert_eq!(module.declared_size(lights.base_type).unwrap(), 16);
    }

    #[test]
    fn images_and_samplers() {
        let mut asm = Assembler::new();
        asm.entry_point(spv::ExecutionModel::Fragment, "main", &[]);
        let float = asm.type_float(32);
        let tex2d = asm.type_image(float, spv::Dim::Dim2D, 1);
        let storage = asm.type_image(float, spv::Dim::Dim3D, 2);
        let combined = asm.type_sampled_image(tex2d);
        let sampler = asm.type_sampler();
        let cube = asm.type_image(float, spv::Dim::DimCube, 1);
        let combined_array = asm.type_array_n(combined, 4);

        let vars = [
            (combined_array, "albedo", 0),
            (storage, "volume", 1),
            (cube, "sky", 2),
            (sampler, "linear", 3),
        ];
        for &(ty, name, binding) in vars.iter() {
            let ptr = asm.type_pointer(spv::StorageClass::UniformConstant, ty);
            let var = asm.variable(ptr, spv::StorageClass::UniformConstant);
            asm.name(var, name);
            asm.decorate(var, spv::Decoration::DescriptorSet, &[0]);
            asm.decorate(var, spv::Decoration::Binding, &[binding]);
        }
        let module = parse_words(&asm.finish()).unwrap();
        let res = module.resources();

        let albedo = &res.combined_image_samplers[0];
        assert_eq!(albedo.name, "albedo");
        assert_eq!(albedo.base_type, combined);
        assert_eq!(albedo.ty.kind, TypeKind::SampledImage { dim: ImageDim::D2 });
        assert_eq!(&albedo.ty.array[..], &[4]);
        assert_eq!(res.storage_images[0].ty.kind,
            TypeKind::Image { dim: ImageDim::D3, sampled: false });
        assert_eq!(res.sampled_images[0].name, "sky");
        assert_eq!(res.separate_samplers[0].binding, 3);
        assert_eq!(res.separate_samplers[0].ty.kind, TypeKind::Sampler);
    }

    #[test]
    fn stage_interface() {
        let mut asm = Assembler::new();
        let float = asm.type_float(32);
        let vec3 = asm.type_vector(float, 3);
        let vec4 = asm.type_vector(float, 4);
        let in3 = asm.type_pointer(spv::StorageClass::Input, vec3);
        let out4 = asm.type_pointer(spv::StorageClass::Output, vec4);

        let normal = asm.variable(in3, spv::StorageClass::Input);
        asm.name(normal, "normal");
        asm.decorate(normal, spv::Decoration::Location, &[1]);
        let position = asm.variable(in3, spv::StorageClass::Input);
        asm.name(position, "position");
        asm.decorate(position, spv::Decoration::Location, &[0]);
        let builtin = asm.variable(out4, spv::StorageClass::Output);
        asm.decorate(builtin, spv::Decoration::BuiltIn, &[spv::BuiltIn::Position as u32]);
        let color = asm.variable(out4, spv::StorageClass::Output);
        asm.decorate(color, spv::Decoration::Location, &[0]);
        asm.entry_point(spv::ExecutionModel::Vertex, "main", &[normal, position, builtin, color]);

        let module = parse_words(&asm.finish()).unwrap();
        let res = module.resources();
        let inputs: Vec<_> = res.stage_inputs.iter()
            .map(|r| (r.name.as_str(), r.location))
            .collect();
        assert_eq!(inputs, [("normal", Some(1)), ("position", Some(0))]);
        assert_eq!(res.stage_inputs[0].ty.vector_size, 3);
        assert_eq!(res.stage_outputs.len(), 1);
        assert_eq!(res.stage_outputs[0].id, color);
    }

    #[test]
    fn specialization() {
        let mut asm = Assembler::new();
        asm.entry_point(spv::ExecutionModel::GLCompute, "main", &[]);
        let uint = asm.type_int(32, false);
        let float = asm.type_float(32);
        let boolean = asm.type_bool();
        let uvec3 = asm.type_vector(uint, 3);

        let gamma = asm.spec_constant(float, 2.2f32.to_bits());
        asm.name(gamma, "gamma");
        asm.decorate(gamma, spv::Decoration::SpecId, &[3]);
        let fast = asm.spec_constant_true(boolean);
        asm.name(fast, "fast");
        asm.decorate(fast, spv::Decoration::SpecId, &[1]);

        let x = asm.spec_constant(uint, 64);
        asm.decorate(x, spv::Decoration::SpecId, &[0]);
        let one = asm.constant(uint, 1);
        let size = asm.spec_constant_composite(uvec3, &[x, one, one]);
        asm.decorate(size, spv::Decoration::BuiltIn, &[spv::BuiltIn::WorkgroupSize as u32]);

        let module = parse_words(&asm.finish()).unwrap();
        assert_eq!(module.entry_point().unwrap().stage, Stage::Compute);
        let specs: Vec<_> = module.specialization_constants().iter()
            .map(|c| (c.constant_id, c.name.as_str()))
            .collect();
        assert_eq!(specs, [(3, "gamma"), (1, "fast"), (0, "")]);
        assert_eq!(module.specialization_constants()[1].ty.kind, TypeKind::Boolean);

        let size = module.work_group_size();
        assert_eq!(size.x.as_ref().map(|c| c.constant_id), Some(0));
        assert!(size.y.is_none() && size.z.is_none());
    }

    #[test]
    fn entry_point_errors() {
        let module = parse_words(&Assembler::new().finish()).unwrap();
        assert_eq!(module.entry_point().unwrap_err(),
            autoshader::Error::MissingEntryPoint { module: 0 });
        assert!(module.get_entry_point(&"main").is_none());

        let mut asm = Assembler::new();
        asm.entry_point(spv::ExecutionModel::Kernel, "k", &[]);
        let module = parse_words(&asm.finish()).unwrap();
        assert_eq!(module.entry_point().unwrap().stage, Stage::Kernel);
        assert!(module.struct_type(1).is_err());
    }
}
