use std::collections::BTreeMap;

use crate::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SpecKind {
    Bool,
    I32,
    U32,
    F32,
    I64,
    U64,
    F64,
}

impl SpecKind {
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
        }
    }

    /// Name of the `Specializer` method that stores a value of this
    /// kind.
    pub fn setter(self) -> &'static str {
        match self {
            Self::Bool => "set_bool",
            Self::I32 => "set_i32",
            Self::U32 => "set_u32",
            Self::F32 => "set_f32",
            Self::I64 => "set_i64",
            Self::U64 => "set_u64",
            Self::F64 => "set_f64",
        }
    }

    fn of(ty: &TypeDescriptor, context: &str) -> Result<Self> {
        if ty.vector_size != 1 || ty.columns != 1 || ty.is_array() {
            return Err(Error::unsupported(context, "composite specialization constant"));
        }
        Ok(match ty.kind {
            TypeKind::Boolean => Self::Bool,
            TypeKind::Integer { width: 32, signed: true } => Self::I32,
            TypeKind::Integer { width: 32, signed: false } => Self::U32,
            TypeKind::Integer { width: 64, signed: true } => Self::I64,
            TypeKind::Integer { width: 64, signed: false } => Self::U64,
            TypeKind::Float { width: 32 } => Self::F32,
            TypeKind::Float { width: 64 } => Self::F64,
            ref kind => return Err(Error::unsupported(
                context, format!("specialization constant of type {:?}", kind))),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpecEntry {
    pub constant_id: u32,
    pub name: String,
    pub kind: SpecKind,
}

/// Settable specialization constants of a module, ordered by constant
/// id. Unnamed constants are skipped.
pub fn specializations<R: Reflector>(reflector: &R) -> Result<Vec<SpecEntry>> {
    let mut entries: BTreeMap<u32, SpecEntry> = BTreeMap::new();
    let named = reflector.specialization_constants().iter()
        .filter(|spec| !spec.name.is_empty())
        .map(|spec| (&spec.name[..], spec));
    let work_group = reflector.work_group_size().components();
    let work_group = work_group.iter()
        .filter_map(|&(name, spec)| Some((name, spec?)));
    for (name, spec) in named.chain(work_group) {
        if entries.contains_key(&spec.constant_id) { continue; }
        let kind = SpecKind::of(&spec.ty, name)?;
        entries.insert(spec.constant_id, SpecEntry {
            constant_id: spec.constant_id,
            name: name.to_owned(),
            kind,
        });
    }
    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    #[test]
    fn ordered_by_id() {
        let mut comp = TestModule::new(Stage::Compute);
        comp.spec_constant("scale", 4, TypeDescriptor::float());
        comp.spec_constant("enabled", 1, TypeDescriptor::new(TypeKind::Boolean));
        comp.spec_constant("", 2, TypeDescriptor::int());
        let x = comp.spec_constant("", 10, TypeDescriptor::uint());
        comp.work_group_size.x = Some(x);

        let entries = specializations(&comp).unwrap();
        let entries: Vec<_> = entries.iter()
            .map(|e| (e.constant_id, &e.name[..], e.kind))
            .collect();
        assert_eq!(entries, [
            (1, "enabled", SpecKind::Bool),
            (4, "scale", SpecKind::F32),
            (10, "WorkGroupSizeX", SpecKind::U32),
        ]);
    }

    #[test]
    fn named_constant_keeps_its_id() {
        let mut comp = TestModule::new(Stage::Compute);
        let size = comp.spec_constant("local_size", 0, TypeDescriptor::uint());
        comp.work_group_size.x = Some(size);
        let entries = specializations(&comp).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "local_size");
    }

    #[test]
    fn vector_constant_is_rejected() {
        let mut comp = TestModule::new(Stage::Compute);
        comp.spec_constant("v", 0, vec(2));
        assert!(specializations(&comp).unwrap_err().is_unsupported_type());
    }
}
