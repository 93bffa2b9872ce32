//! Discovery, deduplication, and naming of buffer structs across
//! modules.
use std::collections::BTreeMap;

use fnv::FnvHashSet as HashSet;
use log::{debug, trace};

use crate::*;

/// Structs owned by one module after deduplication.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModuleStructs {
    /// Structs this module declares, dependencies first.
    pub emit: Vec<Id>,
    /// Final name of every struct reachable from the module, including
    /// ones declared by an earlier module.
    pub names: NameMap,
}

/// Every struct reachable from a buffer-like resource, ordered so that
/// each struct follows the structs it contains.
pub fn reachable_structs<R: Reflector>(reflector: &R) -> Result<Vec<Id>> {
    let mut order = Vec::new();
    let mut seen = HashSet::default();
    for res in reflector.resources().buffer_blocks() {
        let root = res.ty.struct_id().ok_or_else(|| Error::invalid(
            format!("buffer block {} is not a struct", res.name)))?;
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !seen.insert(id) { continue; }
            stack.push((id, true));
            let st = reflector.struct_type(id)?;
            for member in st.members.iter().rev() {
                match member.ty.struct_id() {
                    Some(child) if !seen.contains(&child) =>
                        stack.push((child, false)),
                    _ => {},
                }
            }
        }
    }
    Ok(order)
}

fn kind_token(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Boolean => "b".to_owned(),
        TypeKind::Integer { width, signed: true } => format!("i{}", width),
        TypeKind::Integer { width, signed: false } => format!("u{}", width),
        TypeKind::Float { width } => format!("f{}", width),
        TypeKind::Struct(id) => format!("s{}", id),
        TypeKind::Image { dim, sampled } => format!("img{}{}", dim, sampled),
        TypeKind::SampledImage { dim } => format!("simg{}", dim),
        TypeKind::Sampler => "smp".to_owned(),
        TypeKind::Opaque(name) => name.clone(),
    }
}

/// A string that is equal for two structs exactly when their host
/// declarations would be identical.
pub fn signature<R: Reflector>(reflector: &R, st: &StructType) ->
    Result<String>
{
    let mut sig = String::new();
    write_signature(reflector, st, &mut Vec::new(), &mut sig)?;
    Ok(sig)
}

/// `path` holds the structs currently being expanded; a struct that
/// refers back to one of them is written as `@Name`.
fn write_signature<R: Reflector>(
    reflector: &R,
    st: &StructType,
    path: &mut Vec<Id>,
    out: &mut String,
) -> Result<()> {
    path.push(st.id);
    out.push_str(&format!("{},{:09}:", st.name, st.size));
    for member in st.members.iter() {
        out.push_str(&member.name);
        out.push(',');
        let ty = &member.ty;
        match ty.kind {
            TypeKind::Struct(id) => {
                let child = reflector.struct_type(id)?;
                if path.contains(&id) {
                    out.push('@');
                    out.push_str(&child.name);
                } else {
                    out.push('{');
                    write_signature(reflector, child, path, out)?;
                    out.push('}');
                }
            },
            ref kind => out.push_str(&kind_token(kind)),
        }
        out.push_str(&format!("x{}x{},{}", ty.vector_size, ty.columns, member.offset));
        if let Some(stride) = member.matrix_stride {
            out.push_str(&format!(";m{}", stride));
        }
        if let Some(stride) = member.array_stride {
            out.push_str(&format!(";a{}", stride));
        }
        for extent in ty.array.iter() {
            out.push_str(&format!("[{}]", extent));
        }
        if member.row_major {
            out.push_str(";r");
        }
        out.push(':');
    }
    path.pop();
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct Occurrence {
    module: usize,
    id: Id,
}

type SubGroup = Vec<Occurrence>;

/// Names every reachable struct of every module so that structurally
/// identical structs share one declaration.
///
/// Each module is given as `(ident, reflector)`; the ident is the
/// suffix used for module-local structs. No struct is given a name in
/// `reserved`.
pub fn discover<'a, 'r, R: Reflector + 'r>(
    modules: impl IntoIterator<Item = (&'a str, &'r R)>,
    reserved: &[String],
) -> Result<Vec<ModuleStructs>> {
    let mut idents = Vec::new();
    let mut out: Vec<ModuleStructs> = Vec::new();
    let mut groups: BTreeMap<String, BTreeMap<String, SubGroup>> =
        BTreeMap::new();
    for (module, (ident, reflector)) in modules.into_iter().enumerate() {
        let order = reachable_structs(reflector)?;
        for &id in order.iter() {
            let st = reflector.struct_type(id)?;
            let sig = signature(reflector, st)?;
            trace!("{}: struct {} => {}", ident, id, sig);
            groups.entry(st.name.clone()).or_default()
                .entry(sig).or_default()
                .push(Occurrence { module, id });
        }
        idents.push(ident);
        out.push(ModuleStructs { emit: order, names: Default::default() });
    }

    let mut taken: HashSet<String> = reserved.iter().cloned().collect();
    let mut dropped: Vec<HashSet<Id>> = vec![Default::default(); out.len()];
    for (name, sigs) in groups.iter() {
        let stem = sanitize(name);
        let mut global = Vec::new();
        let mut local: BTreeMap<usize, Vec<&SubGroup>> = BTreeMap::new();
        for group in sigs.values() {
            let first = group[0].module;
            if group.iter().any(|occ| occ.module != first) {
                global.push(group);
            } else {
                local.entry(first).or_default().push(group);
            }
        }

        let namespaces = local.len() + usize::from(!global.is_empty());
        let mut named = Vec::new();
        for (i, &group) in global.iter().enumerate() {
            let base = if global.len() > 1 {
                format!("{}_{}", stem, i)
            } else {
                stem.clone()
            };
            named.push((base, group));
        }
        for (&module, groups) in local.iter() {
            for (i, &group) in groups.iter().enumerate() {
                let mut base = stem.clone();
                if namespaces > 1 {
                    base = format!("{}_{}", base, idents[module]);
                }
                if groups.len() > 1 {
                    base = format!("{}_{}", base, i);
                }
                named.push((base, group));
            }
        }

        for (base, group) in named {
            let mut unique = base.clone();
            let mut n = 1;
            while taken.contains(&unique) {
                unique = format!("{}_{}", base, n);
                n += 1;
            }
            debug!("{} -> {} ({} occurrences)", name, unique, group.len());
            for (i, occ) in group.iter().enumerate() {
                out[occ.module].names.insert(occ.id, unique.clone());
                if i > 0 {
                    dropped[occ.module].insert(occ.id);
                }
            }
            taken.insert(unique);
        }
    }

    for (structs, dropped) in out.iter_mut().zip(dropped.iter()) {
        structs.emit.retain(|id| !dropped.contains(id));
    }
    Ok(out)
}
