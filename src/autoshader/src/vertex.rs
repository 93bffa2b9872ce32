use std::fmt;

use crate::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NumericFormat {
    Sfloat,
    Sint,
    Uint,
}

/// A `vk::Format` for one vertex attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct VertexFormat {
    pub numeric: NumericFormat,
    pub width: u32,
    pub components: u32,
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for channel in ['R', 'G', 'B', 'A'].iter().take(self.components as usize) {
            write!(f, "{}{}", channel, self.width)?;
        }
        let suffix = match self.numeric {
            NumericFormat::Sfloat => "SFLOAT",
            NumericFormat::Sint => "SINT",
            NumericFormat::Uint => "UINT",
        };
        write!(f, "_{}", suffix)
    }
}

impl VertexFormat {
    fn size(&self) -> u32 {
        self.width / 8 * self.components
    }

    /// Number of input locations one attribute of this format takes.
    fn locations(&self) -> u32 {
        if self.width == 64 && self.components > 2 { 2 } else { 1 }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexField {
    pub name: String,
    pub ty: String,
    pub location: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub field: String,
    /// Offset from the start of the field.
    pub offset: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub fields: Vec<VertexField>,
    pub attributes: Vec<VertexAttribute>,
}

fn format(ty: &TypeDescriptor, context: &str) -> Result<VertexFormat> {
    let (numeric, width) = match ty.kind {
        TypeKind::Float { width } => (NumericFormat::Sfloat, width),
        TypeKind::Integer { width, signed: true } => (NumericFormat::Sint, width),
        TypeKind::Integer { width, signed: false } => (NumericFormat::Uint, width),
        ref kind => return Err(Error::unsupported(
            context, format!("vertex input of type {:?}", kind))),
    };
    if width != 32 && width != 64 {
        return Err(Error::unsupported(context, format!("{}-bit vertex input", width)));
    }
    Ok(VertexFormat { numeric, width, components: ty.vector_size })
}

/// The interleaved vertex struct for a vertex-stage module, or `None`
/// if the stage has no inputs.
pub fn vertex_input<R: Reflector>(reflector: &R, name: &str) ->
    Result<Option<VertexInput>>
{
    let mut inputs: Vec<_> = reflector.resources().stage_inputs.iter()
        .filter_map(|res| Some((res.location?, res)))
        .collect();
    if inputs.is_empty() {
        return Ok(None);
    }
    inputs.sort_by_key(|&(location, _)| location);

    let mut fields = Vec::with_capacity(inputs.len());
    let mut attributes = Vec::new();
    for (location, res) in inputs {
        let field = if res.name.is_empty() {
            format!("location{}", location)
        } else {
            res.name.clone()
        };
        let context = format!("{}.{}", name, field);
        let ty = &res.ty;
        let attr_format = format(ty, &context)?;
        let elements: u32 = ty.array.iter().map(|&n| n.max(1)).product();
        for column in 0..elements * ty.columns {
            attributes.push(VertexAttribute {
                location: location + column * attr_format.locations(),
                format: attr_format,
                field: field.clone(),
                offset: column * attr_format.size(),
            });
        }
        fields.push(VertexField {
            ty: layout::scalar_name(ty)?,
            name: field,
            location,
        });
    }
    Ok(Some(VertexInput { name: name.to_owned(), fields, attributes }))
}
