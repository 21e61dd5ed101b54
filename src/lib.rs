//! shepherd: counselor/counselee assignment hierarchy manager
//!
//! Members form a forest hanging from a virtual root (the pastor). Every
//! node, the root included, has at most `max_fan_out` direct counselees.
//! The engine validates assign, remove, replace and swap against a roster
//! snapshot and emits the patches a [`infrastructure::traits::MemberStore`]
//! persists.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
