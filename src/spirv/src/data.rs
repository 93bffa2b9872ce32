use autoshader::{Id, Resources, SpecConstant, StructType, WorkGroupSize};
use fnv::FnvHashMap as HashMap;
use spirv_headers as spv;

/// A parsed module, already materialized into reflection data.
#[derive(Debug)]
pub struct Module {
    pub(crate) version: (u8, u8),
    pub(crate) words: Vec<u32>,
    pub(crate) entry_points: Vec<EntryPoint>,
    pub(crate) resources: Resources,
    pub(crate) structs: HashMap<Id, StructType>,
    pub(crate) spec_constants: Vec<SpecConstant>,
    pub(crate) work_group_size: WorkGroupSize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryPoint {
    pub name: String,
    pub execution_model: spv::ExecutionModel,
}

// Intermediate types used during module construction and discarded
// afterward.
#[derive(Debug, Default)]
pub(crate) struct DecorationSet {
    pub(crate) location: Option<u32>,
    pub(crate) set: Option<u32>,
    pub(crate) binding: Option<u32>,
    pub(crate) spec_id: Option<u32>,
    pub(crate) array_stride: Option<u32>,
    pub(crate) builtin: Option<spv::BuiltIn>,
    pub(crate) block: bool,
    pub(crate) buffer_block: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MemberDecorationSet {
    pub(crate) offset: Option<u32>,
    pub(crate) matrix_stride: Option<u32>,
    pub(crate) row_major: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum Type {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: Id, count: u32 },
    Matrix { column: Id, count: u32 },
    Array { element: Id, length: Id },
    RuntimeArray { element: Id },
    Struct { members: Vec<Id> },
    Image { dim: spv::Dim, sampled: u32 },
    Sampler,
    SampledImage { image: Id },
    Pointer { storage_class: spv::StorageClass, pointee: Id },
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Variable {
    pub(crate) id: Id,
    pub(crate) ty: Id,
    pub(crate) storage_class: spv::StorageClass,
}
