use std::convert::TryFrom;

use autoshader::{
    Id, ImageDim, Member, Resource, Resources, SpecConstant, StructType,
    TypeDescriptor, TypeKind, WorkGroupSize,
};
use fnv::FnvHashMap as HashMap;
use log::{debug, trace};
use rspirv::{self, dr};
use rspirv::binary::{Consumer, ParseAction};
use spirv_headers as spv;

use crate::*;
use crate::data::{DecorationSet, MemberDecorationSet, Type, Variable};

const MAGIC: u32 = 0x0723_0203;

#[derive(Debug)]
struct RawModule {
    header: dr::ModuleHeader,
    instructions: Vec<dr::Instruction>,
}

impl RawModule {
    fn new() -> Self {
        Self {
            header: dr::ModuleHeader::new(0),
            instructions: Default::default(),
        }
    }
}

macro_rules! get_operand_variant {
    ($operand:expr, $variant:ident) => {
        match $operand {
            dr::Operand::$variant(val) => Ok(val.clone()),
            other => Err(Error::invalid(format!(
                concat!("expected ", stringify!($variant), ", found {:?}"),
                other,
            ))),
        }
    }
}

macro_rules! parse_operand {
    ($operands:expr, $variant:ident) => {
        $operands.next()
            .ok_or_else(|| Error::invalid(
                concat!("missing ", stringify!($variant), " operand")))
            .and_then(|operand| get_operand_variant!(operand, $variant))?
    };
    ($operands:expr, $variant:ident*) => {
        $operands.map(|operand| get_operand_variant!(operand, $variant))
            .collect::<Result<Vec<_>>>()?
    };
}

fn result_id(inst: &dr::Instruction) -> Result<Id> {
    inst.result_id.ok_or_else(|| Error::invalid(
        format!("Op{:?} has no result id", inst.class.opcode)))
}

fn result_type(inst: &dr::Instruction) -> Result<Id> {
    inst.result_type.ok_or_else(|| Error::invalid(
        format!("Op{:?} has no result type", inst.class.opcode)))
}

#[allow(unreachable_patterns)]
fn image_dim(dim: spv::Dim) -> Result<ImageDim> {
    Ok(match dim {
        spv::Dim::Dim1D => ImageDim::D1,
        spv::Dim::Dim2D => ImageDim::D2,
        spv::Dim::Dim3D => ImageDim::D3,
        spv::Dim::DimCube => ImageDim::Cube,
        spv::Dim::DimRect => ImageDim::Rect,
        spv::Dim::DimBuffer => ImageDim::Buffer,
        spv::Dim::DimSubpassData => ImageDim::SubpassData,
        _ => return Err(Error::new(
            ErrorKind::UnsupportedModule,
            format!("image dimension {:?}", dim),
        )),
    })
}

/// Collects everything reflection needs from the instruction stream.
#[derive(Debug, Default)]
struct Builder {
    names: HashMap<Id, String>,
    member_names: HashMap<(Id, u32), String>,
    decorations: HashMap<Id, DecorationSet>,
    member_decorations: HashMap<(Id, u32), MemberDecorationSet>,
    types: HashMap<Id, Type>,
    // Struct ids in declaration order; members always precede their
    // containing struct.
    struct_order: Vec<Id>,
    constants: HashMap<Id, u64>,
    composites: HashMap<Id, Vec<Id>>,
    // (result id, result type)
    spec_constants: Vec<(Id, Id)>,
    variables: Vec<Variable>,
    entry_points: Vec<EntryPoint>,
}

impl Builder {
    fn add_type(&mut self, inst: &dr::Instruction, ty: Type) -> Result<()> {
        let id = result_id(inst)?;
        if let Type::Struct { .. } = ty {
            self.struct_order.push(id);
        }
        self.types.insert(id, ty);
        Ok(())
    }

    fn consume(&mut self, inst: &dr::Instruction) -> Result<()> {
        let mut ops = inst.operands.iter();
        match inst.class.opcode {
            spv::Op::Name => {
                let target = parse_operand!(ops, IdRef);
                let name = parse_operand!(ops, LiteralString);
                self.names.insert(target, name);
            },
            spv::Op::MemberName => {
                let target = parse_operand!(ops, IdRef);
                let member = parse_operand!(ops, LiteralInt32);
                let name = parse_operand!(ops, LiteralString);
                self.member_names.insert((target, member), name);
            },
            spv::Op::Decorate => {
                let target = parse_operand!(ops, IdRef);
                let decoration = parse_operand!(ops, Decoration);
                let decos = self.decorations.entry(target).or_default();
                match decoration {
                    spv::Decoration::Location =>
                        decos.location = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::Binding =>
                        decos.binding = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::DescriptorSet =>
                        decos.set = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::SpecId =>
                        decos.spec_id = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::ArrayStride =>
                        decos.array_stride = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::BuiltIn =>
                        decos.builtin = Some(parse_operand!(ops, BuiltIn)),
                    spv::Decoration::Block => decos.block = true,
                    spv::Decoration::BufferBlock => decos.buffer_block = true,
                    _ => {},
                }
            },
            spv::Op::MemberDecorate => {
                let target = parse_operand!(ops, IdRef);
                let member = parse_operand!(ops, LiteralInt32);
                let decoration = parse_operand!(ops, Decoration);
                let decos = self.member_decorations.entry((target, member)).or_default();
                match decoration {
                    spv::Decoration::Offset =>
                        decos.offset = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::MatrixStride =>
                        decos.matrix_stride = Some(parse_operand!(ops, LiteralInt32)),
                    spv::Decoration::RowMajor => decos.row_major = true,
                    spv::Decoration::ColMajor => decos.row_major = false,
                    _ => {},
                }
            },
            spv::Op::EntryPoint => {
                let execution_model = parse_operand!(ops, ExecutionModel);
                let _function = parse_operand!(ops, IdRef);
                let name = parse_operand!(ops, LiteralString);
                self.entry_points.push(EntryPoint { name, execution_model });
            },
            spv::Op::TypeVoid => self.add_type(inst, Type::Void)?,
            spv::Op::TypeBool => self.add_type(inst, Type::Bool)?,
            spv::Op::TypeInt => {
                let width = parse_operand!(ops, LiteralInt32);
                let signed = parse_operand!(ops, LiteralInt32) != 0;
                self.add_type(inst, Type::Int { width, signed })?;
            },
            spv::Op::TypeFloat => {
                let width = parse_operand!(ops, LiteralInt32);
                self.add_type(inst, Type::Float { width })?;
            },
            spv::Op::TypeVector => {
                let component = parse_operand!(ops, IdRef);
                let count = parse_operand!(ops, LiteralInt32);
                self.add_type(inst, Type::Vector { component, count })?;
            },
            spv::Op::TypeMatrix => {
                let column = parse_operand!(ops, IdRef);
                let count = parse_operand!(ops, LiteralInt32);
                self.add_type(inst, Type::Matrix { column, count })?;
            },
            spv::Op::TypeImage => {
                let _sampled_type = parse_operand!(ops, IdRef);
                let dim = parse_operand!(ops, Dim);
                let _depth = parse_operand!(ops, LiteralInt32);
                let _arrayed = parse_operand!(ops, LiteralInt32);
                let _ms = parse_operand!(ops, LiteralInt32);
                let sampled = parse_operand!(ops, LiteralInt32);
                self.add_type(inst, Type::Image { dim, sampled })?;
            },
            spv::Op::TypeSampler => self.add_type(inst, Type::Sampler)?,
            spv::Op::TypeSampledImage => {
                let image = parse_operand!(ops, IdRef);
                self.add_type(inst, Type::SampledImage { image })?;
            },
            spv::Op::TypeArray => {
                let element = parse_operand!(ops, IdRef);
                let length = parse_operand!(ops, IdRef);
                self.add_type(inst, Type::Array { element, length })?;
            },
            spv::Op::TypeRuntimeArray => {
                let element = parse_operand!(ops, IdRef);
                self.add_type(inst, Type::RuntimeArray { element })?;
            },
            spv::Op::TypeStruct => {
                let members = parse_operand!(ops, IdRef*);
                self.add_type(inst, Type::Struct { members })?;
            },
            spv::Op::TypePointer => {
                let storage_class = parse_operand!(ops, StorageClass);
                let pointee = parse_operand!(ops, IdRef);
                self.add_type(inst, Type::Pointer { storage_class, pointee })?;
            },
            spv::Op::Constant | spv::Op::SpecConstant => {
                let id = result_id(inst)?;
                let value = match ops.next() {
                    Some(&dr::Operand::LiteralInt32(value)) => Some(u64::from(value)),
                    Some(&dr::Operand::LiteralInt64(value)) => Some(value),
                    _ => None,
                };
                if let Some(value) = value {
                    self.constants.insert(id, value);
                }
                if inst.class.opcode == spv::Op::SpecConstant {
                    self.spec_constants.push((id, result_type(inst)?));
                }
            },
            spv::Op::SpecConstantTrue | spv::Op::SpecConstantFalse => {
                self.spec_constants.push((result_id(inst)?, result_type(inst)?));
            },
            spv::Op::ConstantComposite | spv::Op::SpecConstantComposite => {
                let id = result_id(inst)?;
                let parts = parse_operand!(ops, IdRef*);
                self.composites.insert(id, parts);
            },
            spv::Op::Variable => {
                let storage_class = parse_operand!(ops, StorageClass);
                if storage_class != spv::StorageClass::Function {
                    self.variables.push(Variable {
                        id: result_id(inst)?,
                        ty: result_type(inst)?,
                        storage_class,
                    });
                }
            },
            _ => {},
        }
        Ok(())
    }

    fn get_type(&self, id: Id) -> Result<&Type> {
        self.types.get(&id)
            .ok_or_else(|| Error::invalid(format!("undefined type %{}", id)))
    }

    fn array_length(&self, id: Id) -> Result<u32> {
        let value = *self.constants.get(&id).ok_or_else(|| Error::new(
            ErrorKind::UnsupportedModule,
            format!("array length %{} is not an integer constant", id),
        ))?;
        u32::try_from(value).map_err(|_| Error::new(
            ErrorKind::LimitExceeded,
            format!("array length {} does not fit in 32 bits", value),
        ))
    }

    fn descriptor(&self, id: Id) -> Result<TypeDescriptor> {
        Ok(match *self.get_type(id)? {
            Type::Void => TypeDescriptor::new(TypeKind::Opaque("void".to_owned())),
            Type::Bool => TypeDescriptor::new(TypeKind::Boolean),
            Type::Int { width, signed } =>
                TypeDescriptor::new(TypeKind::Integer { width, signed }),
            Type::Float { width } => TypeDescriptor::new(TypeKind::Float { width }),
            Type::Vector { component, count } => self.descriptor(component)?.vector(count),
            Type::Matrix { column, count } => {
                let column = self.descriptor(column)?;
                let rows = column.vector_size;
                column.matrix(count, rows)
            },
            Type::Array { element, length } =>
                self.descriptor(element)?.array_of(self.array_length(length)?),
            Type::RuntimeArray { element } => self.descriptor(element)?.array_of(0),
            Type::Struct { .. } => TypeDescriptor::structure(id),
            Type::Image { dim, sampled } => TypeDescriptor::new(TypeKind::Image {
                dim: image_dim(dim)?,
                sampled: sampled != 2,
            }),
            Type::Sampler => TypeDescriptor::new(TypeKind::Sampler),
            Type::SampledImage { image } => match *self.get_type(image)? {
                Type::Image { dim, .. } =>
                    TypeDescriptor::new(TypeKind::SampledImage { dim: image_dim(dim)? }),
                _ => return Err(Error::invalid(
                    format!("sampled image %{} does not wrap an image", id))),
            },
            Type::Pointer { pointee, .. } => self.descriptor(pointee)?,
        })
    }

    fn strip_arrays(&self, mut id: Id) -> Id {
        loop {
            match self.types.get(&id) {
                Some(&Type::Array { element, .. }) |
                Some(&Type::RuntimeArray { element }) => id = element,
                _ => return id,
            }
        }
    }

    fn struct_type(&self, id: Id, members: &[Id], structs: &HashMap<Id, StructType>) ->
        Result<StructType>
    {
        let name = self.names.get(&id).cloned()
            .unwrap_or_else(|| format!("_{}", id));
        let mut out = Vec::with_capacity(members.len());
        for (index, &ty) in members.iter().enumerate() {
            let key = (id, index as u32);
            let decos = self.member_decorations.get(&key);
            out.push(Member {
                name: self.member_names.get(&key).cloned()
                    .unwrap_or_else(|| format!("_m{}", index)),
                ty: self.descriptor(ty)?,
                offset: decos.and_then(|d| d.offset).unwrap_or(0),
                matrix_stride: decos.and_then(|d| d.matrix_stride),
                array_stride: self.decorations.get(&ty).and_then(|d| d.array_stride),
                row_major: decos.map_or(false, |d| d.row_major),
            });
        }

        let mut size = 0;
        for member in out.iter() {
            size = size.max(member.offset + member_size(member, structs)?);
        }
        trace!("struct {} (%{}): {} members, {} bytes", name, id, out.len(), size);
        Ok(StructType { id, name, size, members: out })
    }

    fn structs(&self) -> Result<HashMap<Id, StructType>> {
        let mut structs = HashMap::default();
        for &id in self.struct_order.iter() {
            if let Type::Struct { members } = self.get_type(id)? {
                let st = self.struct_type(id, members, &structs)?;
                structs.insert(id, st);
            }
        }
        Ok(structs)
    }

    fn is_block(&self, id: Id, buffer: bool) -> bool {
        self.decorations.get(&id).map_or(false, |d|
            if buffer { d.buffer_block } else { d.block })
    }

    fn resources(&self) -> Result<Resources> {
        let mut resources = Resources::default();
        for var in self.variables.iter() {
            let pointee = match *self.get_type(var.ty)? {
                Type::Pointer { pointee, .. } => pointee,
                _ => return Err(Error::invalid(
                    format!("variable %{} is not a pointer", var.id))),
            };
            let base_type = self.strip_arrays(pointee);
            let decos = self.decorations.get(&var.id);
            let location = decos.and_then(|d| d.location);
            let builtin = decos.map_or(false, |d| d.builtin.is_some());

            let list = match var.storage_class {
                spv::StorageClass::Input if !builtin && location.is_some() =>
                    &mut resources.stage_inputs,
                spv::StorageClass::Output if !builtin && location.is_some() =>
                    &mut resources.stage_outputs,
                class if is_interface_storage(class) => continue,
                spv::StorageClass::Uniform if self.is_block(base_type, true) =>
                    &mut resources.storage_buffers,
                spv::StorageClass::Uniform if self.is_block(base_type, false) =>
                    &mut resources.uniform_buffers,
                spv::StorageClass::StorageBuffer => &mut resources.storage_buffers,
                spv::StorageClass::PushConstant => &mut resources.push_constant_blocks,
                spv::StorageClass::UniformConstant => match *self.get_type(base_type)? {
                    Type::Image { sampled: 2, .. } => &mut resources.storage_images,
                    Type::Image { .. } => &mut resources.sampled_images,
                    Type::SampledImage { .. } => &mut resources.combined_image_samplers,
                    Type::Sampler => &mut resources.separate_samplers,
                    _ => continue,
                },
                _ => continue,
            };
            list.push(Resource {
                id: var.id,
                base_type,
                ty: self.descriptor(pointee)?,
                name: self.names.get(&var.id).cloned().unwrap_or_default(),
                set: decos.and_then(|d| d.set).unwrap_or(0),
                binding: decos.and_then(|d| d.binding).unwrap_or(0),
                location,
            });
        }
        Ok(resources)
    }

    fn spec_constants(&self) -> Result<Vec<SpecConstant>> {
        let mut out = Vec::new();
        for &(id, ty) in self.spec_constants.iter() {
            let constant_id = match self.decorations.get(&id).and_then(|d| d.spec_id) {
                Some(constant_id) => constant_id,
                None => continue,
            };
            out.push(SpecConstant {
                constant_id,
                id,
                name: self.names.get(&id).cloned().unwrap_or_default(),
                ty: self.descriptor(ty)?,
            });
        }
        Ok(out)
    }

    fn work_group_size(&self, spec_constants: &[SpecConstant]) -> WorkGroupSize {
        let composite = self.decorations.iter()
            .filter(|(_, d)| d.builtin == Some(spv::BuiltIn::WorkgroupSize))
            .find_map(|(id, _)| self.composites.get(id));
        let parts = match composite {
            Some(parts) => parts,
            None => return Default::default(),
        };
        let component = |index: usize| {
            let id = *parts.get(index)?;
            spec_constants.iter().find(|c| c.id == id).cloned()
        };
        WorkGroupSize { x: component(0), y: component(1), z: component(2) }
    }

    fn finish(self, words: Vec<u32>) -> Result<Module> {
        let structs = self.structs()?;
        let resources = self.resources()?;
        let spec_constants = self.spec_constants()?;
        let work_group_size = self.work_group_size(&spec_constants);
        let version = words.get(1)
            .map_or((0, 0), |&word| ((word >> 16) as u8, (word >> 8) as u8));
        debug!(
            "SPIR-V {}.{} module: {} entry points, {} structs, {} variables",
            version.0, version.1, self.entry_points.len(), structs.len(),
            self.variables.len(),
        );
        Ok(Module {
            version,
            words,
            entry_points: self.entry_points,
            resources,
            structs,
            spec_constants,
            work_group_size,
        })
    }
}

/// Bytes a member occupies in its block, per its declared strides. A
/// runtime-sized outer dimension counts as one element.
fn member_size(member: &Member, structs: &HashMap<Id, StructType>) -> Result<u32> {
    let ty = &member.ty;
    let scalar = match ty.kind {
        TypeKind::Struct(id) => structs.get(&id).map(|st| st.size)
            .ok_or_else(|| Error::invalid(format!("struct %{} used before definition", id)))?,
        TypeKind::Boolean => 4 * ty.vector_size,
        TypeKind::Integer { width, .. } | TypeKind::Float { width } =>
            width / 8 * ty.vector_size,
        _ => return Err(Error::invalid(
            format!("member {} has an opaque type", member.name))),
    };
    let element = if ty.is_matrix() {
        member.matrix_stride.unwrap_or(scalar) * ty.columns
    } else {
        scalar
    };
    Ok(match (ty.outer_extent(), member.array_stride) {
        (None, _) => element,
        (Some(outer), Some(stride)) => stride * outer.max(1),
        (Some(_), None) => element * ty.array.iter().map(|&n| n.max(1)).product::<u32>(),
    })
}

impl Consumer for RawModule {
    fn initialize(&mut self) -> ParseAction {
        ParseAction::Continue
    }

    fn finalize(&mut self) -> ParseAction {
        ParseAction::Continue
    }

    fn consume_header(&mut self, header: dr::ModuleHeader) -> ParseAction {
        self.instructions.reserve(header.bound as usize);
        self.header = header;
        ParseAction::Continue
    }

    fn consume_instruction(&mut self, inst: dr::Instruction) -> ParseAction {
        self.instructions.push(inst);
        ParseAction::Continue
    }
}

fn raise_module(raw: &RawModule, words: Vec<u32>) -> Result<Module> {
    let mut builder = Builder::default();
    for inst in raw.instructions.iter() {
        builder.consume(inst)?;
    }
    builder.finish(words)
}

pub fn parse_words(words: &impl AsRef<[u32]>) -> Result<Module> {
    let words = words.as_ref();
    let mut raw = RawModule::new();
    rspirv::binary::parse_words(words, &mut raw)
        .map_err(|state| Error::invalid(format!("{:?}", state)))?;
    raise_module(&raw, words.to_vec())
}

/// Parses a module from bytes in either byte order.
pub fn parse_bytes(bytes: &impl AsRef<[u8]>) -> Result<Module> {
    let bytes = bytes.as_ref();
    if bytes.len() % 4 != 0 {
        return Err(Error::invalid(
            format!("length {} is not a multiple of 4", bytes.len())));
    }
    let word = |chunk: &[u8]| [chunk[0], chunk[1], chunk[2], chunk[3]];
    let big_endian = bytes.get(..4)
        .map_or(false, |magic| u32::from_be_bytes(word(magic)) == MAGIC);
    let words: Vec<u32> = bytes.chunks_exact(4)
        .map(|chunk| if big_endian {
            u32::from_be_bytes(word(chunk))
        } else {
            u32::from_le_bytes(word(chunk))
        })
        .collect();
    parse_words(&words)
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    #[test]
    fn bad_length() {
        let err = parse_bytes(&[3u8, 2, 0x23, 7, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidModule);
    }

    #[test]
    fn bad_magic() {
        let err = parse_words(&[0xdead_beefu32, 0x0001_0000, 0, 1, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidModule);
    }

    #[test]
    fn either_byte_order() {
        let mut asm = Assembler::new();
        asm.entry_point(spv::ExecutionModel::Fragment, "main", &[]);
        let words = asm.finish();
        let le: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes().to_vec()).collect();
        let be: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect();
        assert_eq!(parse_bytes(&le).unwrap().words(), &words[..]);
        assert_eq!(parse_bytes(&be).unwrap().words(), &words[..]);
    }

    #[test]
    fn member_sizes_follow_strides() {
        let mut asm = Assembler::new();
        let float = asm.type_float(32);
        let vec3 = asm.type_vector(float, 3);
        let vec4 = asm.type_vector(float, 4);
        let mat4 = asm.type_matrix(vec4, 4);
        let arr = asm.type_array_n(vec3, 3);
        asm.decorate(arr, spv::Decoration::ArrayStride, &[16]);
        let st = asm.type_struct(&[mat4, arr, float]);
        asm.name(st, "Block");
        asm.member_decorate(st, 0, spv::Decoration::Offset, &[0]);
        asm.member_decorate(st, 0, spv::Decoration::MatrixStride, &[16]);
        asm.member_decorate(st, 1, spv::Decoration::Offset, &[64]);
        asm.member_decorate(st, 2, spv::Decoration::Offset, &[112]);
        let module = parse_words(&asm.finish()).unwrap();

        let st = &module.structs[&st];
        assert_eq!(st.name, "Block");
        assert_eq!(st.size, 116);
        let names: Vec<_> = st.members.iter().map(|m| &m.name[..]).collect();
        assert_eq!(names, ["_m0", "_m1", "_m2"]);
        assert_eq!(st.members[0].matrix_stride, Some(16));
        assert_eq!(st.members[1].array_stride, Some(16));
        assert_eq!(&st.members[1].ty.array[..], &[3]);
        assert_eq!(st.members[1].ty.vector_size, 3);
    }
}
