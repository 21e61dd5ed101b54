//! Domain layer: entities and hierarchy logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod changeset;
pub mod engine;
pub mod entities;
pub mod error;
pub mod roster;

pub use arena::{NodeData, TreeArena, TreeNode};
pub use builder::{HierarchyBuilder, HierarchyView};
pub use changeset::{ChangeSet, HierarchyWarning};
pub use engine::{verify_transition, HierarchyEngine, Operation};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use roster::{apply_patches, Roster};
