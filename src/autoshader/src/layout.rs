//! Host-side struct layout.
//!
//! Reproduces the offsets and strides a shader declares for its
//! buffer blocks using `#[repr(C)]` structs, plain arrays, and the
//! `Padded<T, N>` wrapper from the runtime crate.
use std::fmt;

use fnv::FnvHashMap as HashMap;
use fnv::FnvHashSet as HashSet;

use crate::*;

pub type NameMap = HashMap<Id, String>;

/// Type of filler words, both for top-level padding fields and for
/// `Padded<T, N>`.
pub const PAD_SCALAR: &str = "f32";
const PAD_WORD: u32 = 4;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum HostType {
    Scalar(&'static str),
    Named(String),
    Array(Box<HostType>, u32),
    /// `T` followed by `N` filler words.
    Padded(Box<HostType>, u32),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: HostType,
    pub offset: u32,
    pub size: u32,
    pub padding: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructDecl {
    pub id: Id,
    pub name: String,
    pub size: u32,
    pub fields: Vec<Field>,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => f.write_str(name),
            Self::Named(name) => f.write_str(name),
            Self::Array(elem, n) => write!(f, "[{}; {}]", elem, n),
            Self::Padded(elem, n) => write!(f, "Padded<{}, {}>", elem, n),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", ident(&self.name), self.ty)
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const",
    "continue", "do", "dyn", "else", "enum", "extern", "false", "final",
    "fn", "for", "if", "impl", "in", "let", "loop", "macro", "match", "mod",
    "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Replaces every character that cannot appear in an identifier with
/// `_`.
pub fn sanitize(name: &str) -> String {
    let mut out: String = name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Spells `name` as a Rust identifier.
pub fn ident(name: &str) -> String {
    let name = sanitize(name);
    if ["self", "Self", "super", "crate", "_"].contains(&&name[..]) {
        format!("{}_", name)
    } else if KEYWORDS.contains(&&name[..]) {
        format!("r#{}", name)
    } else {
        name
    }
}

fn scalar(kind: &TypeKind, context: &str) -> Result<(&'static str, u32)> {
    Ok(match *kind {
        TypeKind::Float { width: 32 } => ("f32", 4),
        TypeKind::Float { width: 64 } => ("f64", 8),
        TypeKind::Integer { width: 32, signed: true } => ("i32", 4),
        TypeKind::Integer { width: 32, signed: false } => ("u32", 4),
        TypeKind::Integer { width: 64, signed: true } => ("i64", 8),
        TypeKind::Integer { width: 64, signed: false } => ("u64", 8),
        TypeKind::Float { width } => return Err(Error::unsupported(
            context, format!("{}-bit float", width))),
        TypeKind::Integer { width, .. } => return Err(Error::unsupported(
            context, format!("{}-bit integer", width))),
        TypeKind::Boolean =>
            return Err(Error::unsupported(context, "boolean")),
        TypeKind::Struct(_) =>
            return Err(Error::unsupported(context, "struct is not a scalar")),
        TypeKind::Image { dim, .. } | TypeKind::SampledImage { dim } =>
            return Err(Error::unsupported(context, format!("{} image", dim))),
        TypeKind::Sampler =>
            return Err(Error::unsupported(context, "sampler")),
        TypeKind::Opaque(ref name) =>
            return Err(Error::unsupported(context, name.clone())),
    })
}

fn wrap_arrays(mut host: HostType, extents: &[u32]) -> HostType {
    for &extent in extents.iter().rev() {
        host = HostType::Array(Box::new(host), extent.max(1));
    }
    host
}

/// Host spelling of a numeric scalar, vector, or matrix (with any
/// array dimensions). Booleans are spelled `bool` even though they
/// cannot appear in a buffer.
pub fn scalar_name(ty: &TypeDescriptor) -> Result<String> {
    let name = match ty.kind {
        TypeKind::Boolean => "bool",
        ref kind => scalar(kind, "scalar")?.0,
    };
    let mut host = HostType::Scalar(name);
    if ty.vector_size > 1 {
        host = HostType::Array(Box::new(host), ty.vector_size);
    }
    if ty.columns > 1 {
        host = HostType::Array(Box::new(host), ty.columns);
    }
    Ok(wrap_arrays(host, &ty.array).to_string())
}

/// Pads `host`, which has host alignment `align`, out to `stride` bytes.
fn pad_to(host: HostType, size: u32, align: u32, stride: u32, context: &str) ->
    Result<(HostType, u32)>
{
    if stride < size {
        return Err(Error::layout(context, format!(
            "stride {} is smaller than element size {}", stride, size)));
    }
    if stride % align != 0 {
        return Err(Error::layout(context, format!(
            "stride {} is not a multiple of host alignment {}", stride, align)));
    }
    let gap = stride - size;
    if gap == 0 {
        return Ok((host, size));
    }
    if gap % PAD_WORD != 0 {
        return Err(Error::layout(context, format!(
            "padding of {} bytes is not a whole number of words", gap)));
    }
    Ok((HostType::Padded(Box::new(host), gap / PAD_WORD), stride))
}

fn checked_product(size: u32, n: u32, context: &str) -> Result<u32> {
    size.checked_mul(n)
        .ok_or_else(|| Error::layout(context, "size overflows 32 bits"))
}

fn checked_end(offset: u32, size: u32, context: &str) -> Result<u32> {
    offset.checked_add(size)
        .ok_or_else(|| Error::layout(context, "offset overflows 32 bits"))
}

fn round_up(size: u32, align: u32, context: &str) -> Result<u32> {
    Ok(checked_end(size, align - 1, context)? / align * align)
}

/// Allocates names for top-level filler fields of one struct.
#[derive(Debug)]
struct PadNames<'a> {
    next: u32,
    taken: HashSet<&'a str>,
}

impl<'a> PadNames<'a> {
    fn new(st: &'a StructType) -> Self {
        Self {
            next: 0,
            taken: st.members.iter().map(|m| &m.name[..]).collect(),
        }
    }

    fn next(&mut self) -> String {
        loop {
            let name = format!("pad{}_", self.next);
            self.next += 1;
            if !self.taken.contains(&name[..]) {
                return name;
            }
        }
    }
}

/// Lays out the buffer structs of one module.
#[derive(Debug)]
pub struct Layout<'a, R> {
    reflector: &'a R,
    names: &'a NameMap,
}

impl<'a, R: Reflector> Layout<'a, R> {
    pub fn new(reflector: &'a R, names: &'a NameMap) -> Self {
        Self { reflector, names }
    }

    pub fn reflector(&self) -> &'a R {
        self.reflector
    }

    pub fn struct_name(&self, id: Id) -> Result<&'a str> {
        self.names.get(&id).map(|s| &s[..])
            .ok_or_else(|| Error::invalid(format!("struct {} was never named", id)))
    }

    /// Host alignment of a struct: the largest alignment of its members.
    pub fn struct_align(&self, id: Id) -> Result<u32> {
        self.align_within(id, &mut Vec::new())
    }

    fn align_within(&self, id: Id, path: &mut Vec<Id>) -> Result<u32> {
        let st = self.reflector.struct_type(id)?;
        if path.contains(&id) {
            return Err(Error::layout(&st.name[..], "struct contains itself"));
        }
        path.push(id);
        let mut align = PAD_WORD;
        for member in st.members.iter() {
            let member_align = match member.ty.kind {
                TypeKind::Struct(child) => self.align_within(child, path)?,
                ref kind => scalar(kind, &format!("{}.{}", st.name, member.name))?.1,
            };
            align = align.max(member_align);
        }
        path.pop();
        Ok(align)
    }

    /// Host size of a struct: its declared size rounded up to its host
    /// alignment, as `#[repr(C)]` does.
    pub fn struct_size(&self, id: Id) -> Result<u32> {
        let st = self.reflector.struct_type(id)?;
        let size = self.reflector.declared_size(id)?;
        round_up(size, self.struct_align(id)?, &st.name)
    }

    fn column(&self, ty: &TypeDescriptor, context: &str) ->
        Result<(HostType, u32, u32)>
    {
        if let TypeKind::Struct(id) = ty.kind {
            let name = self.struct_name(id)?;
            let size = self.struct_size(id)?;
            let align = self.struct_align(id)?;
            return Ok((HostType::Named(name.to_owned()), size, align));
        }
        let (name, width) = scalar(&ty.kind, context)?;
        let mut host = HostType::Scalar(name);
        if ty.vector_size > 1 {
            host = HostType::Array(Box::new(host), ty.vector_size);
        }
        Ok((host, width * ty.vector_size, width))
    }

    /// Host declaration of `owner.members[index]` together with its
    /// host size in bytes.
    pub fn member(&self, owner: &StructType, index: usize) ->
        Result<(Field, u32)>
    {
        let (field, size, _) = self.member_layout(owner, index)?;
        Ok((field, size))
    }

    /// Like `member`, but also yields the host alignment.
    fn member_layout(&self, owner: &StructType, index: usize) ->
        Result<(Field, u32, u32)>
    {
        let member = owner.members.get(index).ok_or_else(|| Error::invalid(
            format!("{} has no member {}", owner.name, index)))?;
        let context = format!("{}.{}", owner.name, member.name);
        let ty = &member.ty;

        let (mut host, mut size, align) = self.column(ty, &context)?;

        if ty.is_matrix() {
            if member.row_major {
                return Err(Error::unsupported(context, "row-major matrix"));
            }
            let stride = member.matrix_stride.ok_or_else(|| Error::layout(
                &context[..], "matrix without a matrix stride"))?;
            let (col, col_size) = pad_to(host, size, align, stride, &context)?;
            host = HostType::Array(Box::new(col), ty.columns);
            size = checked_product(col_size, ty.columns, &context)?;
        }

        if ty.is_array() {
            let stride = member.array_stride.ok_or_else(|| Error::layout(
                &context[..], "array without an array stride"))?;
            let inner: u32 = ty.array[1..].iter().map(|&n| n.max(1)).product();
            if stride % inner != 0 {
                return Err(Error::layout(context, format!(
                    "stride {} does not divide into {} inner elements",
                    stride, inner)));
            }
            let (elem, elem_size) =
                pad_to(host, size, align, stride / inner, &context)?;
            size = ty.array.iter().try_fold(elem_size, |size, &n|
                checked_product(size, n.max(1), &context))?;
            host = wrap_arrays(elem, &ty.array);
        }

        let field = Field {
            name: member.name.clone(),
            ty: host,
            offset: member.offset,
            size,
            padding: false,
        };
        Ok((field, size, align))
    }

    pub fn host_size(&self, owner: &StructType, index: usize) -> Result<u32> {
        Ok(self.member(owner, index)?.1)
    }

    /// Full host declaration of a struct, including filler fields. The
    /// declaration is `struct_size` bytes long.
    pub fn structure(&self, st: &StructType) -> Result<StructDecl> {
        let name = self.struct_name(st.id)?;
        let host_size = self.struct_size(st.id)?;
        let mut pads = PadNames::new(st);
        let mut fields = Vec::with_capacity(st.members.len());
        let mut offset = 0;
        for (index, member) in st.members.iter().enumerate() {
            let context = format!("{}.{}", st.name, member.name);
            if member.offset < offset {
                return Err(Error::layout(context, format!(
                    "offset {} overlaps the previous member ending at {}",
                    member.offset, offset)));
            }
            let (field, size, align) = self.member_layout(st, index)?;
            if member.offset % align != 0 {
                return Err(Error::layout(context, format!(
                    "offset {} is not a multiple of host alignment {}",
                    member.offset, align)));
            }
            let end = checked_end(member.offset, size, &context)?;
            fill(&mut fields, &mut pads, offset, member.offset, &st.name)?;
            fields.push(field);
            offset = end;
        }
        if host_size < offset {
            return Err(Error::layout(&st.name[..], format!(
                "declared size {} is smaller than its members ({})",
                st.size, offset)));
        }
        fill(&mut fields, &mut pads, offset, host_size, &st.name)?;
        Ok(StructDecl {
            id: st.id,
            name: name.to_owned(),
            size: host_size,
            fields,
        })
    }
}

fn fill(
    fields: &mut Vec<Field>,
    pads: &mut PadNames<'_>,
    from: u32,
    to: u32,
    context: &str,
) -> Result<()> {
    let gap = to - from;
    if gap % PAD_WORD != 0 {
        return Err(Error::layout(context, format!(
            "gap of {} bytes at offset {} is not a whole number of words",
            gap, from)));
    }
    for word in 0..gap / PAD_WORD {
        fields.push(Field {
            name: pads.next(),
            ty: HostType::Scalar(PAD_SCALAR),
            offset: from + word * PAD_WORD,
            size: PAD_WORD,
            padding: true,
        });
    }
    Ok(())
}
