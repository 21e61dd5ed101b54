//! Tree builder: turns a roster into arena trees for display and traversal.

use std::collections::HashSet;

use generational_arena::Index;
use tracing::debug;

use crate::domain::arena::{NodeData, TreeArena};
use crate::domain::entities::{MemberId, Node};
use crate::domain::error::DomainError;
use crate::domain::roster::Roster;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// The roster split into what hangs from the root and what does not.
#[derive(Debug)]
pub struct HierarchyView {
    /// Everything reachable from the virtual root
    pub active: TreeArena,
    /// One tree per unplaced member that still has counselees
    pub detached: Vec<TreeArena>,
    /// Unplaced members without counselees
    pub unassigned: Vec<MemberId>,
}

/// Constructs hierarchy trees from a roster snapshot.
pub struct HierarchyBuilder {
    root_label: String,
    visited: HashSet<MemberId>,
}

impl HierarchyBuilder {
    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            root_label: root_label.into(),
            visited: HashSet::new(),
        }
    }

    pub fn build(&mut self, roster: &Roster) -> TreeResult<HierarchyView> {
        self.visited.clear();

        let active = self.build_tree(roster, Node::Root)?;

        let mut detached = Vec::new();
        let mut unassigned = Vec::new();
        for member in roster.unassigned() {
            if roster.occupancy(&Node::Member(member.id.clone()))? > 0 {
                detached.push(self.build_tree(roster, Node::Member(member.id.clone()))?);
            } else {
                self.visited.insert(member.id.clone());
                unassigned.push(member.id.clone());
            }
        }

        // Anything not reached from a top node sits on a cycle
        if let Some(stray) = roster
            .members()
            .iter()
            .find(|m| !self.visited.contains(&m.id))
        {
            return Err(DomainError::CycleDetected(stray.id.clone()));
        }

        debug!(
            "built hierarchy view: {} active, {} detached trees, {} unassigned",
            active.len().saturating_sub(1),
            detached.len(),
            unassigned.len()
        );
        Ok(HierarchyView {
            active,
            detached,
            unassigned,
        })
    }

    fn build_tree(&mut self, roster: &Roster, top: Node) -> TreeResult<TreeArena> {
        let mut tree = TreeArena::new();
        let mut stack: Vec<(Node, Option<Index>)> = vec![(top, None)];

        while let Some((node, parent_idx)) = stack.pop() {
            let data = match &node {
                Node::Root => NodeData::Root {
                    label: self.root_label.clone(),
                },
                Node::Member(id) => {
                    // Cycle detection
                    if !self.visited.insert(id.clone()) {
                        return Err(DomainError::CycleDetected(id.clone()));
                    }
                    NodeData::from(roster.member(id)?)
                }
            };

            let current_idx = tree.insert_node(data, parent_idx);

            // Reverse so children pop in roster order
            for child in roster.children_of(&node)?.into_iter().rev() {
                stack.push((Node::Member(child.id.clone()), Some(current_idx)));
            }
        }

        Ok(tree)
    }
}
