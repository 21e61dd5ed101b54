//! Assignment service
//!
//! Runs hierarchy operations against a member store: snapshot, plan,
//! persist, re-validate.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult, StoreResultExt};
use crate::domain::{
    verify_transition, ChangeSet, HierarchyBuilder, HierarchyEngine, HierarchyPolicy,
    HierarchyView, Member, MemberId, Node, Operation, Roster,
};
use crate::infrastructure::traits::MemberStore;

/// Result of an applied operation.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// What was persisted
    pub changes: ChangeSet,
    /// Member list as returned by the store
    pub members: Vec<Member>,
}

/// Service for mutating the counseling hierarchy.
pub struct AssignmentService {
    store: Arc<dyn MemberStore>,
    policy: HierarchyPolicy,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn MemberStore>, policy: HierarchyPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &HierarchyPolicy {
        &self.policy
    }

    /// Load the current roster.
    pub fn snapshot(&self) -> ApplicationResult<Roster> {
        let members = self.store.load().with_store_context("load members")?;
        debug!("snapshot: {} members", members.len());
        Ok(Roster::new(members, self.policy.clone())?)
    }

    /// Current roster arranged as trees.
    pub fn view(&self, root_label: &str) -> ApplicationResult<HierarchyView> {
        let roster = self.snapshot()?;
        Ok(HierarchyBuilder::new(root_label).build(&roster)?)
    }

    /// Validate `operation` against the current snapshot without persisting.
    pub fn plan(&self, operation: &Operation) -> ApplicationResult<ChangeSet> {
        let roster = self.snapshot()?;
        Ok(operation.plan(&HierarchyEngine::new(&roster))?)
    }

    /// Validate, persist and re-validate `operation`.
    ///
    /// A store failure means the operation was not applied. A refreshed
    /// snapshot that breaks an invariant at a touched node is reported as
    /// [`ApplicationError::PostPersistViolation`].
    pub fn execute(&self, operation: &Operation) -> ApplicationResult<Outcome> {
        let before = self.snapshot()?;
        let changes = operation.plan(&HierarchyEngine::new(&before))?;
        if changes.is_empty() {
            debug!("{}: nothing to change", operation.name());
            return Ok(Outcome {
                changes,
                members: before.into_members(),
            });
        }

        let members = self.store.persist(&changes.patches).with_store_context(&format!(
            "{}: persist {} patches, operation not applied",
            operation.name(),
            changes.patches.len()
        ))?;

        let after = Roster::new(members, self.policy.clone())
            .map_err(ApplicationError::PostPersistViolation)?;
        verify_transition(&before, &after, &changes)
            .map_err(ApplicationError::PostPersistViolation)?;

        for warning in &changes.warnings {
            warn!("{}", warning);
        }
        info!(
            "{}: applied {} patches",
            operation.name(),
            changes.patches.len()
        );
        Ok(Outcome {
            changes,
            members: after.into_members(),
        })
    }

    pub fn assign(&self, candidates: &[MemberId], target: &Node) -> ApplicationResult<Outcome> {
        self.execute(&Operation::Assign {
            candidates: candidates.to_vec(),
            target: target.clone(),
        })
    }

    pub fn remove(&self, member: &MemberId) -> ApplicationResult<Outcome> {
        self.execute(&Operation::Remove {
            member: member.clone(),
        })
    }

    pub fn replace(
        &self,
        outgoing: &MemberId,
        incoming: &MemberId,
        successor: Option<&MemberId>,
    ) -> ApplicationResult<Outcome> {
        self.execute(&Operation::Replace {
            outgoing: outgoing.clone(),
            incoming: incoming.clone(),
            successor: successor.cloned(),
        })
    }

    pub fn swap(&self, first: &MemberId, second: &MemberId) -> ApplicationResult<Outcome> {
        self.execute(&Operation::Swap {
            first: first.clone(),
            second: second.clone(),
        })
    }

    pub fn reconcile(&self) -> ApplicationResult<Outcome> {
        self.execute(&Operation::Reconcile)
    }
}
