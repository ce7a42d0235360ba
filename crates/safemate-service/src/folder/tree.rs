//! Folder tree building from a flat list of decoded records.
//!
//! Building is pure and deterministic: the same set of records produces the
//! same tree whatever order they arrive in. Records that cannot be placed are
//! kept in the tree's `unresolved` bucket with a reason.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use safemate_core::types::FolderId;
use safemate_entity::folder::{
    FolderNode, FolderRecord, FolderTree, UnresolvedFolder, UnresolvedReason,
};

/// How siblings (and roots) are ordered in the built tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SiblingOrder {
    /// Alphabetically by name, ties broken by id.
    Name,
    /// By serial number, i.e. creation order within a collection.
    #[default]
    Serial,
    /// Listed ids first in list order, the rest by serial.
    Explicit(Vec<FolderId>),
}

impl SiblingOrder {
    fn compare(&self, a: &FolderRecord, b: &FolderRecord, rank: &HashMap<FolderId, usize>) -> Ordering {
        let by_serial = |a: &FolderRecord, b: &FolderRecord| {
            (a.serial_number, a.collection_id).cmp(&(b.serial_number, b.collection_id))
        };
        match self {
            Self::Name => a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)),
            Self::Serial => by_serial(a, b),
            Self::Explicit(_) => match (rank.get(&a.id), rank.get(&b.id)) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => by_serial(a, b),
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Placement {
    Placed(u32),
    Unresolved(UnresolvedReason),
}

/// Build a folder tree from decoded records.
pub fn build(records: Vec<FolderRecord>, max_depth: u8, order: &SiblingOrder) -> FolderTree {
    assemble(records, Vec::new(), max_depth, order)
}

/// Build a folder tree, merging entries that were rejected before building.
///
/// Children of a rejected entry are reported as having an unresolved
/// ancestor rather than as orphans.
pub fn assemble(
    mut records: Vec<FolderRecord>,
    rejected: Vec<UnresolvedFolder>,
    max_depth: u8,
    order: &SiblingOrder,
) -> FolderTree {
    let rejected_ids: HashSet<FolderId> = rejected.iter().map(|r| r.id).collect();

    records.retain(|r| !rejected_ids.contains(&r.id));
    records.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.level.cmp(&b.level))
            .then_with(|| a.parent_id.cmp(&b.parent_id))
            .then_with(|| a.owner_account_id.cmp(&b.owner_account_id))
    });
    records.dedup_by(|later, first| later.id == first.id);

    let index: HashMap<FolderId, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id, i))
        .collect();

    let placements = place(&records, &index, &rejected_ids, u32::from(max_depth));

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    let mut unresolved = rejected;
    let mut releveled = 0;
    let mut total_folders = 0;

    for (i, placement) in placements.iter().enumerate() {
        match placement {
            Placement::Placed(depth) => {
                total_folders += 1;
                if u32::from(records[i].level) != *depth {
                    releveled += 1;
                }
                match records[i].parent_id.and_then(|p| index.get(&p)) {
                    Some(&parent) => children.entry(parent).or_default().push(i),
                    None => roots.push(i),
                }
            }
            Placement::Unresolved(reason) => unresolved.push(UnresolvedFolder {
                id: records[i].id,
                record: Some(records[i].clone()),
                reason: reason.clone(),
            }),
        }
    }
    unresolved.sort_by(|a, b| a.id.cmp(&b.id));

    let rank: HashMap<FolderId, usize> = match order {
        SiblingOrder::Explicit(ids) => ids
            .iter()
            .enumerate()
            .rev()
            .map(|(pos, id)| (*id, pos))
            .collect(),
        _ => HashMap::new(),
    };

    let builder = NodeBuilder {
        records: &records,
        placements: &placements,
        children: &children,
        order,
        rank: &rank,
    };

    FolderTree {
        roots: builder.nodes(roots),
        unresolved,
        total_folders,
        releveled,
    }
}

/// Resolve every record's structural depth, or why it has none.
///
/// Each record is visited once: a walk stops at the first record whose
/// placement is already known, so the whole pass is linear.
fn place(
    records: &[FolderRecord],
    index: &HashMap<FolderId, usize>,
    rejected: &HashSet<FolderId>,
    max_depth: u32,
) -> Vec<Placement> {
    let mut placements: Vec<Option<Placement>> = vec![None; records.len()];

    for start in 0..records.len() {
        if placements[start].is_some() {
            continue;
        }

        let mut path = Vec::new();
        let mut on_path: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        let cycle_start = loop {
            if placements[current].is_some() {
                break None;
            }
            if let Some(&pos) = on_path.get(&current) {
                break Some(pos);
            }
            on_path.insert(current, path.len());
            path.push(current);
            match records[current].parent_id.and_then(|p| index.get(&p)) {
                Some(&parent) => current = parent,
                None => break None,
            }
        };
        let mut resolve_until = cycle_start.unwrap_or(path.len());

        for &i in &path[resolve_until..] {
            placements[i] = Some(Placement::Unresolved(UnresolvedReason::Cycle));
        }

        while resolve_until > 0 {
            resolve_until -= 1;
            let i = path[resolve_until];
            let placement = match records[i].parent_id {
                None => Placement::Placed(0),
                Some(parent_id) => match index.get(&parent_id) {
                    Some(&parent) => match &placements[parent] {
                        Some(Placement::Placed(depth)) if depth + 1 > max_depth => {
                            Placement::Unresolved(UnresolvedReason::TooDeep { depth: depth + 1 })
                        }
                        Some(Placement::Placed(depth)) => Placement::Placed(depth + 1),
                        Some(Placement::Unresolved(_)) | None => {
                            Placement::Unresolved(UnresolvedReason::UnresolvedAncestor {
                                ancestor: parent_id,
                            })
                        }
                    },
                    None if rejected.contains(&parent_id) => {
                        Placement::Unresolved(UnresolvedReason::UnresolvedAncestor {
                            ancestor: parent_id,
                        })
                    }
                    None => Placement::Unresolved(UnresolvedReason::Orphan {
                        missing_parent: parent_id,
                    }),
                },
            };
            placements[i] = Some(placement);
        }
    }

    placements
        .into_iter()
        .map(|p| p.unwrap_or(Placement::Unresolved(UnresolvedReason::Cycle)))
        .collect()
}

struct NodeBuilder<'a> {
    records: &'a [FolderRecord],
    placements: &'a [Placement],
    children: &'a HashMap<usize, Vec<usize>>,
    order: &'a SiblingOrder,
    rank: &'a HashMap<FolderId, usize>,
}

impl NodeBuilder<'_> {
    fn nodes(&self, mut members: Vec<usize>) -> Vec<FolderNode> {
        members.sort_by(|&a, &b| {
            self.order
                .compare(&self.records[a], &self.records[b], self.rank)
        });
        members.into_iter().map(|i| self.node(i)).collect()
    }

    fn node(&self, i: usize) -> FolderNode {
        let mut record = self.records[i].clone();
        if let Placement::Placed(depth) = self.placements[i] {
            // Depth is bounded by max_depth, which fits in u8.
            record.level = u8::try_from(depth).unwrap_or(u8::MAX);
        }
        let children = self.children.get(&i).cloned().unwrap_or_default();
        FolderNode {
            record,
            children: self.nodes(children),
        }
    }
}
