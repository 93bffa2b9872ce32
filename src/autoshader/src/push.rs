//! Push-constant ranges.
//!
//! Each stage only touches some members of the push-constant block, so
//! the block is split into the byte ranges each stage actually reads,
//! and those are merged into the minimal set of ranges tagged with the
//! stages that use them.
use std::collections::BTreeSet;
use std::ops::Range;

use log::{debug, warn};

use crate::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PushRange {
    pub start: u32,
    pub end: u32,
    pub stages: StageFlags,
}

impl PushRange {
    pub fn size(&self) -> u32 {
        self.end - self.start
    }
}

/// Contiguous byte ranges covered by the members of `block`.
pub fn stage_ranges<R: Reflector>(layout: &Layout<'_, R>, block: &StructType) ->
    Result<Vec<Range<u32>>>
{
    let mut ranges = Vec::new();
    let mut current: Option<Range<u32>> = None;
    for (index, member) in block.members.iter().enumerate() {
        let start = member.offset;
        let end = start.checked_add(layout.host_size(block, index)?)
            .ok_or_else(|| Error::layout(
                format!("{}.{}", block.name, member.name),
                "push constant range overflows 32 bits"))?;
        current = Some(match current.take() {
            None => start..end,
            Some(range) if start < range.end => {
                return Err(Error::layout(
                    format!("{}.{}", block.name, member.name),
                    format!("push constant at {} overlaps range ending at {}",
                        start, range.end),
                ));
            },
            Some(range) if start == range.end => range.start..end,
            Some(range) => {
                ranges.push(range);
                start..end
            },
        });
    }
    ranges.extend(current);
    Ok(ranges)
}

/// Splits the union of all stage ranges at every boundary and merges
/// neighboring pieces used by the same stages.
pub fn merge_ranges(stage_ranges: &[(Stage, Vec<Range<u32>>)]) -> Vec<PushRange> {
    let points: BTreeSet<u32> = stage_ranges.iter()
        .flat_map(|(_, ranges)| ranges.iter())
        .flat_map(|range| vec![range.start, range.end])
        .collect();
    let points: Vec<u32> = points.into_iter().collect();

    let mut merged: Vec<PushRange> = Vec::new();
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let stages = stage_ranges.iter()
            .filter(|(_, ranges)| ranges.iter()
                .any(|range| range.start <= lo && hi <= range.end))
            .fold(StageFlags::empty(), |acc, (stage, _)| acc | stage.flag());
        if stages.is_empty() { continue; }
        match merged.last_mut() {
            Some(last) if last.end == lo && last.stages == stages => last.end = hi,
            _ => merged.push(PushRange { start: lo, end: hi, stages }),
        }
    }
    merged
}

/// Push-constant ranges for a set of modules.
pub fn push_ranges<'a, 'r: 'a, R: Reflector + 'r>(
    modules: impl IntoIterator<Item = (Stage, &'a Layout<'r, R>)>,
) -> Result<Vec<PushRange>> {
    let mut per_stage = Vec::new();
    for (stage, layout) in modules {
        let blocks = &layout.reflector().resources().push_constant_blocks;
        let block = match blocks.first() {
            Some(block) => block,
            None => continue,
        };
        if blocks.len() > 1 {
            warn!("{} stage declares {} push constant blocks; using {}",
                stage, blocks.len(), block.name);
        }
        let id = block.ty.struct_id().ok_or_else(|| Error::invalid(
            format!("push constant block {} is not a struct", block.name)))?;
        let st = layout.reflector().struct_type(id)?;
        let ranges = stage_ranges(layout, st)?;
        debug!("{} stage push constants: {:?}", stage, ranges);
        per_stage.push((stage, ranges));
    }
    Ok(merge_ranges(&per_stage))
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use super::*;

    fn block(module: &mut TestModule, members: Vec<Member>) -> Id {
        let size = members.iter().map(|m| m.offset + 64).max().unwrap_or(0);
        let id = module.add_struct("Push", size, members);
        module.push_constants("push", id);
        id
    }

    fn named(module: &TestModule) -> NameMap {
        module.structs.values().map(|st| (st.id, st.name.clone())).collect()
    }

    fn ranges(module: &TestModule) -> Result<Vec<Range<u32>>> {
        let names = named(module);
        let layout = Layout::new(module, &names);
        let st = &module.structs[&module.resources.push_constant_blocks[0].base_type];
        stage_ranges(&layout, st)
    }

    #[test]
    fn merge_across_stages() {
        let mut vert = TestModule::new(Stage::Vertex);
        block(&mut vert, vec![
            matrix_member("a", mat(4, 4), 0, 16),
            matrix_member("c", mat(4, 4), 80, 16),
        ]);
        let mut frag = TestModule::new(Stage::Fragment);
        block(&mut frag, vec![
            member("b", vec(4), 64),
            matrix_member("c", mat(4, 4), 80, 16),
            array_member("d", vec(4).array_of(3), 144, 16),
        ]);

        assert_eq!(ranges(&vert).unwrap(), [0..64, 80..144]);
        assert_eq!(ranges(&frag).unwrap(), [64..192]);

        let (vn, fnames) = (named(&vert), named(&frag));
        let (vl, fl) = (Layout::new(&vert, &vn), Layout::new(&frag, &fnames));
        let merged = push_ranges(vec![(Stage::Vertex, &vl), (Stage::Fragment, &fl)])
            .unwrap();
        let both = StageFlags::VERTEX | StageFlags::FRAGMENT;
        assert_eq!(merged, [
            PushRange { start: 0, end: 64, stages: StageFlags::VERTEX },
            PushRange { start: 64, end: 80, stages: StageFlags::FRAGMENT },
            PushRange { start: 80, end: 144, stages: both },
            PushRange { start: 144, end: 192, stages: StageFlags::FRAGMENT },
        ]);
    }

    #[test]
    fn adjacent_members_join() {
        let mut vert = TestModule::new(Stage::Vertex);
        block(&mut vert, vec![
            member("a", vec(4), 0),
            member("b", vec(3), 16),
            member("c", TypeDescriptor::float(), 28),
        ]);
        assert_eq!(ranges(&vert).unwrap(), [0..32]);
    }

    #[test]
    fn overlap_is_an_error() {
        let mut vert = TestModule::new(Stage::Vertex);
        block(&mut vert, vec![
            member("a", vec(4), 0),
            member("b", vec(4), 12),
        ]);
        assert!(ranges(&vert).unwrap_err().is_layout_error());
    }

    #[test]
    fn offset_overflow_is_an_error() {
        let mut vert = TestModule::new(Stage::Vertex);
        let id = vert.add_struct("Push", u32::MAX - 3, vec![
            member("a", vec(4), u32::MAX - 11),
        ]);
        vert.push_constants("push", id);
        assert!(ranges(&vert).unwrap_err().is_layout_error());
    }

    #[test]
    fn identical_ranges_merge() {
        let merged = merge_ranges(&[
            (Stage::Vertex, vec![0..16]),
            (Stage::Fragment, vec![0..16]),
            (Stage::Geometry, vec![32..48]),
        ]);
        assert_eq!(merged, [
            PushRange { start: 0, end: 16, stages: StageFlags::VERTEX | StageFlags::FRAGMENT },
            PushRange { start: 32, end: 48, stages: StageFlags::GEOMETRY },
        ]);
        assert!(merge_ranges(&[]).is_empty());
    }

    #[test]
    fn repeated_stage_unions() {
        let merged = merge_ranges(&[
            (Stage::Vertex, vec![0..16]),
            (Stage::Vertex, vec![16..32]),
        ]);
        assert_eq!(merged, [
            PushRange { start: 0, end: 32, stages: StageFlags::VERTEX },
        ]);
    }
}
