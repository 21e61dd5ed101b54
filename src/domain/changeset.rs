//! Engine output: the patches to persist and the warnings to surface.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::domain::entities::{Member, MemberId, MemberPatch, Node, Placement};
use crate::domain::error::DomainResult;
use crate::domain::roster::apply_patches;

/// Side effect worth telling the user about; not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HierarchyWarning {
    /// `leader` left the hierarchy while these counselees still point at it.
    OrphanedSubtree {
        leader: MemberId,
        counselees: Vec<MemberId>,
    },
}

impl fmt::Display for HierarchyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyWarning::OrphanedSubtree { leader, counselees } => write!(
                f,
                "{} left the hierarchy; counselees still assigned to it: {}",
                leader,
                counselees.iter().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub patches: Vec<MemberPatch>,
    pub warnings: Vec<HierarchyWarning>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn moved(&self) -> impl Iterator<Item = &MemberId> {
        self.patches.iter().map(|p| &p.id)
    }

    /// Nodes that gain a child when the patches land, deduplicated.
    pub fn target_nodes(&self, root_role: &str) -> Vec<Node> {
        self.patches
            .iter()
            .filter_map(|p| p.placement(root_role).parent_node())
            .unique()
            .collect()
    }

    pub fn placement_of(&self, id: &MemberId, root_role: &str) -> Option<Placement> {
        self.patches
            .iter()
            .rev()
            .find(|p| &p.id == id)
            .map(|p| p.placement(root_role))
    }

    /// Apply to an in-memory member list; all or nothing.
    pub fn apply(&self, members: &mut [Member]) -> DomainResult<()> {
        apply_patches(members, &self.patches)
    }
}
