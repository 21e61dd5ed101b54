//! Hierarchy engine: validated mutations over a roster snapshot.
//!
//! Every operation reads the snapshot, stages its moves in a [`Draft`],
//! re-checks the fan-out bound and acyclicity on the staged result and only
//! then hands back a [`ChangeSet`]. Nothing here mutates the roster.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::changeset::{ChangeSet, HierarchyWarning};
use crate::domain::entities::{Member, MemberId, MemberPatch, Node, Placement};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::roster::Roster;

/// A mutation request, as issued by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Assign {
        candidates: Vec<MemberId>,
        target: Node,
    },
    Remove {
        member: MemberId,
    },
    Replace {
        outgoing: MemberId,
        incoming: MemberId,
        successor: Option<MemberId>,
    },
    Swap {
        first: MemberId,
        second: MemberId,
    },
    Reconcile,
}

impl Operation {
    pub fn plan(&self, engine: &HierarchyEngine<'_>) -> DomainResult<ChangeSet> {
        match self {
            Operation::Assign { candidates, target } => engine.assign_batch(candidates, target),
            Operation::Remove { member } => engine.remove(member),
            Operation::Replace {
                outgoing,
                incoming,
                successor,
            } => engine.replace(outgoing, incoming, successor.as_ref()),
            Operation::Swap { first, second } => engine.swap(first, second),
            Operation::Reconcile => engine.reconcile(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Assign { .. } => "assign",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
            Operation::Swap { .. } => "swap",
            Operation::Reconcile => "reconcile",
        }
    }
}

pub struct HierarchyEngine<'a> {
    roster: &'a Roster,
}

impl<'a> HierarchyEngine<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    pub fn roster(&self) -> &'a Roster {
        self.roster
    }

    fn capacity(&self) -> usize {
        self.roster.policy().max_fan_out
    }

    /// Re-parent every candidate to `target` in one step.
    ///
    /// Candidates placed elsewhere are moved; duplicates are collapsed.
    #[instrument(level = "debug", skip(self, candidates, target), fields(target = %target, count = candidates.len()))]
    pub fn assign_batch(&self, candidates: &[MemberId], target: &Node) -> DomainResult<ChangeSet> {
        let roster = self.roster;
        if let Node::Member(id) = target {
            roster.member(id)?;
        }

        let candidates: Vec<&MemberId> = candidates.iter().unique().collect();
        for &candidate in &candidates {
            roster.member(candidate)?;
            if let Node::Member(target_id) = target {
                if candidate == target_id || roster.is_ancestor(candidate, target_id)? {
                    return Err(DomainError::SelfReferenceRejected {
                        member: candidate.clone(),
                        target: target.clone(),
                    });
                }
            }
            if roster.placement(candidate)?.parent_node().as_ref() == Some(target) {
                return Err(DomainError::AlreadyAssigned {
                    member: candidate.clone(),
                    node: target.clone(),
                });
            }
        }

        let occupancy = roster.occupancy(target)?;
        if occupancy + candidates.len() > self.capacity() {
            return Err(DomainError::CapacityExceeded {
                node: target.clone(),
                occupancy,
                requested: candidates.len(),
                capacity: self.capacity(),
            });
        }

        let placement = Placement::child_of(target);
        let mut draft = Draft::new(roster);
        for candidate in candidates {
            draft.place(candidate, &placement)?;
        }
        draft.finish()
    }

    /// Take `id` out of the hierarchy.
    ///
    /// Its counselees keep pointing at it; the change set carries an
    /// [`HierarchyWarning::OrphanedSubtree`] when there are any.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&self, id: &MemberId) -> DomainResult<ChangeSet> {
        if self.roster.placement(id)? == Placement::Unassigned {
            return Err(DomainError::NotAssigned(id.clone()));
        }

        let mut draft = Draft::new(self.roster);
        draft.vacate(id)?;
        draft.finish()
    }

    /// `incoming` takes over `outgoing`'s position.
    ///
    /// A leading `incoming` hands its counselees and its former position to
    /// `successor`, which must be unplaced. `outgoing` is then vacated as by
    /// [`remove`](Self::remove).
    #[instrument(level = "debug", skip(self))]
    pub fn replace(
        &self,
        outgoing: &MemberId,
        incoming: &MemberId,
        successor: Option<&MemberId>,
    ) -> DomainResult<ChangeSet> {
        let roster = self.roster;
        let outgoing_at = roster.placement(outgoing)?;
        let incoming_at = roster.placement(incoming)?;

        if outgoing == incoming || outgoing_at == Placement::Under(incoming.clone()) {
            return Err(DomainError::SelfReferenceRejected {
                member: incoming.clone(),
                target: outgoing_at.parent_node().unwrap_or(Node::Root),
            });
        }
        if outgoing_at == Placement::Unassigned {
            return Err(DomainError::NotAssigned(outgoing.clone()));
        }

        let counselees = roster.child_ids(&Node::Member(incoming.clone()))?;
        let leads = roster.is_leader(incoming)?;

        let mut draft = Draft::new(roster);
        if leads {
            let successor = successor.ok_or_else(|| DomainError::SuccessorRequired {
                leader: incoming.clone(),
            })?;
            self.check_successor(successor, outgoing, incoming, counselees.len())?;

            debug!(
                "handing {} counselees of {} to {}",
                counselees.len(),
                incoming,
                successor
            );
            let under_successor = Placement::Under(successor.clone());
            for counselee in &counselees {
                draft.place(counselee, &under_successor)?;
            }
            draft.place(successor, &incoming_at)?;
        } else if let Some(successor) = successor {
            debug!("{} leads nobody, ignoring successor {}", incoming, successor);
        }

        draft.place(incoming, &outgoing_at)?;
        draft.vacate(outgoing)?;
        draft.finish()
    }

    fn check_successor(
        &self,
        successor: &MemberId,
        outgoing: &MemberId,
        incoming: &MemberId,
        inherited: usize,
    ) -> DomainResult<()> {
        let member = self.roster.member(successor)?;
        let invalid = |reason: &str| DomainError::InvalidSuccessor {
            successor: successor.clone(),
            reason: reason.to_string(),
        };

        if successor == outgoing || successor == incoming {
            return Err(invalid("must differ from the members being replaced"));
        }
        if member.assigned_counsel_id.is_some() {
            return Err(invalid("already has a counselor"));
        }
        if member.role.as_deref() == Some(self.roster.policy().root_role.as_str()) {
            return Err(invalid("already holds the root-tier role"));
        }

        let node = Node::Member(successor.clone());
        let occupancy = self.roster.occupancy(&node)?;
        if occupancy + inherited > self.capacity() {
            return Err(DomainError::CapacityExceeded {
                node,
                occupancy,
                requested: inherited,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Exchange the positions of two members; their counselees stay put.
    #[instrument(level = "debug", skip(self))]
    pub fn swap(&self, first: &MemberId, second: &MemberId) -> DomainResult<ChangeSet> {
        let roster = self.roster;
        let first_at = roster.placement(first)?;
        let second_at = roster.placement(second)?;

        if first == second {
            return Err(DomainError::SelfReferenceRejected {
                member: first.clone(),
                target: Node::Member(second.clone()),
            });
        }
        if roster.is_ancestor(first, second)? {
            return Err(DomainError::SelfReferenceRejected {
                member: first.clone(),
                target: Node::Member(second.clone()),
            });
        }
        if roster.is_ancestor(second, first)? {
            return Err(DomainError::SelfReferenceRejected {
                member: second.clone(),
                target: Node::Member(first.clone()),
            });
        }

        let mut draft = Draft::new(roster);
        draft.place(first, &second_at)?;
        draft.place(second, &first_at)?;
        draft.finish()
    }

    /// Clear the root role from members that also point at a counselor.
    #[instrument(level = "debug", skip(self))]
    pub fn reconcile(&self) -> DomainResult<ChangeSet> {
        let mut draft = Draft::new(self.roster);
        for member in self.roster.stale_root_roles() {
            let placement = self.roster.placement_of(member);
            debug!("clearing stale root role of {}", member.id);
            draft.place(&member.id, &placement)?;
        }
        draft.finish()
    }
}

/// Staged moves of one operation.
struct Draft<'a> {
    roster: &'a Roster,
    order: Vec<MemberId>,
    staged: HashMap<MemberId, Member>,
    warnings: Vec<HierarchyWarning>,
}

impl<'a> Draft<'a> {
    fn new(roster: &'a Roster) -> Self {
        Self {
            roster,
            order: Vec::new(),
            staged: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn current(&self, id: &MemberId) -> DomainResult<&Member> {
        match self.staged.get(id) {
            Some(member) => Ok(member),
            None => self.roster.member(id),
        }
    }

    fn place(&mut self, id: &MemberId, placement: &Placement) -> DomainResult<()> {
        let mut member = self.current(id)?.clone();
        member
            .relocated(placement, &self.roster.policy().root_role)
            .apply_to(&mut member);
        if !self.staged.contains_key(id) {
            self.order.push(id.clone());
        }
        self.staged.insert(id.clone(), member);
        Ok(())
    }

    /// Move `id` out of the hierarchy, flagging counselees left behind.
    ///
    /// Must run after every other move of the operation: members staged
    /// under `id` count as left behind too.
    fn vacate(&mut self, id: &MemberId) -> DomainResult<()> {
        self.place(id, &Placement::Unassigned)?;

        let original = self.roster.child_ids(&Node::Member(id.clone()))?;
        let staged_under = self
            .order
            .iter()
            .filter(|m| !original.contains(m))
            .filter(|m| {
                self.staged
                    .get(*m)
                    .and_then(|staged| staged.assigned_counsel_id.as_ref())
                    == Some(id)
            })
            .cloned()
            .collect::<Vec<_>>();
        let left_behind: Vec<MemberId> = original
            .into_iter()
            .filter(|child| match self.staged.get(child) {
                Some(staged) => staged.assigned_counsel_id.as_ref() == Some(id),
                None => true,
            })
            .chain(staged_under)
            .collect();
        if !left_behind.is_empty() {
            debug!(
                "{} leaves the hierarchy with {} counselees still assigned",
                id,
                left_behind.len()
            );
            self.warnings.push(HierarchyWarning::OrphanedSubtree {
                leader: id.clone(),
                counselees: left_behind,
            });
        }
        Ok(())
    }

    fn finish(self) -> DomainResult<ChangeSet> {
        let patches: Vec<MemberPatch> = self
            .order
            .iter()
            .filter_map(|id| {
                let staged = &self.staged[id];
                let patch = MemberPatch {
                    id: id.clone(),
                    assigned_counsel_id: staged.assigned_counsel_id.clone(),
                    role: staged.role.clone(),
                };
                let original = self.roster.get(id)?;
                patch.changes(original).then_some(patch)
            })
            .collect();

        let changes = ChangeSet {
            patches,
            warnings: self.warnings,
        };
        if changes.is_empty() {
            return Ok(changes);
        }

        let after = self.roster.with_patches(&changes.patches)?;
        verify_transition(self.roster, &after, &changes)?;
        debug!("planned {} patches", changes.patches.len());
        Ok(changes)
    }
}

/// Check the invariants a change set must preserve between two snapshots.
///
/// Fan-out is only enforced where occupancy grew, so a snapshot that was
/// already over the bound does not block unrelated moves. Every moved member
/// must still reach the top of its chain.
pub fn verify_transition(before: &Roster, after: &Roster, changes: &ChangeSet) -> DomainResult<()> {
    let root_role = before.policy().root_role.as_str();
    let capacity = after.policy().max_fan_out;

    for node in changes.target_nodes(root_role) {
        let was = before.occupancy(&node)?;
        let now = after.occupancy(&node)?;
        if now > capacity && now > was {
            return Err(DomainError::CapacityExceeded {
                node,
                occupancy: was,
                requested: now - was,
                capacity,
            });
        }
    }

    for id in changes.moved() {
        if let Err(DomainError::CycleDetected(_)) = after.path_to_root(id) {
            let target = changes
                .placement_of(id, root_role)
                .and_then(|p| p.parent_node())
                .unwrap_or(Node::Root);
            return Err(DomainError::SelfReferenceRejected {
                member: id.clone(),
                target,
            });
        }
    }
    Ok(())
}
