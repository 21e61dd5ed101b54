//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{MemberId, Node};

/// Domain errors represent hierarchy rule violations.
///
/// Every variant is a rejection: the operation that produced it emitted no
/// patches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("member not found: {0}")]
    NotFound(MemberId),

    #[error(
        "capacity exceeded at {node}: {occupancy} of {capacity} slots used, {requested} requested"
    )]
    CapacityExceeded {
        node: Node,
        occupancy: usize,
        requested: usize,
        capacity: usize,
    },

    #[error("{leader} leads counselees or the root tier; a successor is required")]
    SuccessorRequired { leader: MemberId },

    #[error("invalid successor {successor}: {reason}")]
    InvalidSuccessor { successor: MemberId, reason: String },

    #[error("{member} cannot be placed under {target}: it would report to itself")]
    SelfReferenceRejected { member: MemberId, target: Node },

    #[error("{member} is already assigned to {node}")]
    AlreadyAssigned { member: MemberId, node: Node },

    #[error("{0} holds no position in the hierarchy")]
    NotAssigned(MemberId),

    #[error("cycle detected in hierarchy at: {0}")]
    CycleDetected(MemberId),

    #[error("duplicate member id in roster: {0}")]
    DuplicateMember(MemberId),

    #[error("{member} references unknown counselor {reference}")]
    DanglingReference { member: MemberId, reference: MemberId },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
