//! The data model a shader reflector hands to the generator.
use derive_more::Display;
use smallvec::SmallVec;

use crate::{Result, Stage};

pub type Id = u32;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ImageDim {
    #[display(fmt = "1D")]
    D1,
    #[display(fmt = "2D")]
    D2,
    #[display(fmt = "3D")]
    D3,
    Cube,
    Rect,
    Buffer,
    SubpassData,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TypeKind {
    Boolean,
    Integer { width: u32, signed: bool },
    Float { width: u32 },
    Struct(Id),
    /// `sampled` is false for storage images.
    Image { dim: ImageDim, sampled: bool },
    SampledImage { dim: ImageDim },
    Sampler,
    /// Anything else; the string names the type for diagnostics.
    Opaque(String),
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub vector_size: u32,
    pub columns: u32,
    /// Array extents, outermost first. Zero marks a runtime-sized
    /// dimension.
    pub array: SmallVec<[u32; 2]>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeDescriptor,
    pub offset: u32,
    pub matrix_stride: Option<u32>,
    /// Stride of the outermost array dimension.
    pub array_stride: Option<u32>,
    pub row_major: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructType {
    pub id: Id,
    pub name: String,
    /// Declared size in bytes.
    pub size: u32,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resource {
    pub id: Id,
    /// The resource type with arrays stripped.
    pub base_type: Id,
    pub ty: TypeDescriptor,
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub location: Option<u32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Resources {
    pub uniform_buffers: Vec<Resource>,
    pub storage_buffers: Vec<Resource>,
    pub push_constant_blocks: Vec<Resource>,
    pub storage_images: Vec<Resource>,
    pub combined_image_samplers: Vec<Resource>,
    pub sampled_images: Vec<Resource>,
    pub separate_samplers: Vec<Resource>,
    pub stage_inputs: Vec<Resource>,
    pub stage_outputs: Vec<Resource>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryPoint {
    pub name: String,
    pub stage: Stage,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpecConstant {
    pub constant_id: u32,
    pub id: Id,
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Specialization constants feeding the `WorkgroupSize` built-in.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WorkGroupSize {
    pub x: Option<SpecConstant>,
    pub y: Option<SpecConstant>,
    pub z: Option<SpecConstant>,
}

/// Read-only view of one compiled shader module.
pub trait Reflector {
    fn entry_point(&self) -> Result<EntryPoint>;

    fn resources(&self) -> &Resources;

    fn struct_type(&self, id: Id) -> Result<&StructType>;

    fn declared_size(&self, id: Id) -> Result<u32> {
        Ok(self.struct_type(id)?.size)
    }

    fn specialization_constants(&self) -> &[SpecConstant];

    fn work_group_size(&self) -> &WorkGroupSize;

    /// Module words, for embedding into the output.
    fn code(&self) -> &[u32];
}

impl<R: Reflector + ?Sized> Reflector for &R {
    fn entry_point(&self) -> Result<EntryPoint> {
        (**self).entry_point()
    }

    fn resources(&self) -> &Resources {
        (**self).resources()
    }

    fn struct_type(&self, id: Id) -> Result<&StructType> {
        (**self).struct_type(id)
    }

    fn declared_size(&self, id: Id) -> Result<u32> {
        (**self).declared_size(id)
    }

    fn specialization_constants(&self) -> &[SpecConstant] {
        (**self).specialization_constants()
    }

    fn work_group_size(&self) -> &WorkGroupSize {
        (**self).work_group_size()
    }

    fn code(&self) -> &[u32] {
        (**self).code()
    }
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            vector_size: 1,
            columns: 1,
            array: Default::default(),
        }
    }

    pub fn float() -> Self {
        Self::new(TypeKind::Float { width: 32 })
    }

    pub fn int() -> Self {
        Self::new(TypeKind::Integer { width: 32, signed: true })
    }

    pub fn uint() -> Self {
        Self::new(TypeKind::Integer { width: 32, signed: false })
    }

    pub fn structure(id: Id) -> Self {
        Self::new(TypeKind::Struct(id))
    }

    pub fn vector(mut self, size: u32) -> Self {
        self.vector_size = size;
        self
    }

    pub fn matrix(mut self, columns: u32, rows: u32) -> Self {
        self.vector_size = rows;
        self.columns = columns;
        self
    }

    /// Wraps the type in one more (outer) array dimension.
    pub fn array_of(mut self, extent: u32) -> Self {
        self.array.insert(0, extent);
        self
    }

    pub fn is_matrix(&self) -> bool {
        self.columns > 1
    }

    pub fn is_array(&self) -> bool {
        !self.array.is_empty()
    }

    pub fn struct_id(&self) -> Option<Id> {
        match self.kind {
            TypeKind::Struct(id) => Some(id),
            _ => None,
        }
    }

    /// The type of one matrix column (or the type itself for vectors).
    pub fn column(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            vector_size: self.vector_size,
            columns: 1,
            array: Default::default(),
        }
    }

    /// Extent of the outermost dimension; zero if runtime-sized.
    pub fn outer_extent(&self) -> Option<u32> {
        self.array.first().copied()
    }
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

impl Resources {
    /// Resources whose type is an explicitly laid out block.
    pub fn buffer_blocks(&self) -> impl Iterator<Item = &Resource> {
        self.uniform_buffers.iter()
            .chain(self.storage_buffers.iter())
            .chain(self.push_constant_blocks.iter())
    }

    /// Resources bound through a descriptor set.
    pub fn descriptors(&self) -> impl Iterator<Item = &Resource> {
        self.uniform_buffers.iter()
            .chain(self.storage_buffers.iter())
            .chain(self.storage_images.iter())
            .chain(self.combined_image_samplers.iter())
            .chain(self.sampled_images.iter())
            .chain(self.separate_samplers.iter())
    }
}

impl WorkGroupSize {
    pub fn components(&self) -> [(&'static str, Option<&SpecConstant>); 3] {
        [
            ("WorkGroupSizeX", self.x.as_ref()),
            ("WorkGroupSizeY", self.y.as_ref()),
            ("WorkGroupSizeZ", self.z.as_ref()),
        ]
    }
}
