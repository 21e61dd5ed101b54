//! Test support: logging setup and roster fixtures

use std::env;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{
    DomainResult, HierarchyPolicy, Member, MemberId, Roster, DEFAULT_ROOT_ROLE,
};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // Create a filter for noisy modules
    let noisy_modules = ["config::"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Set up the subscriber with environment filter
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    // Build and set the subscriber
    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Root-tier member.
pub fn counsel(id: &str) -> Member {
    Member::new(id).with_role(DEFAULT_ROOT_ROLE)
}

/// Counselee of `counselor`.
pub fn counselee(id: &str, counselor: &str) -> Member {
    Member::new(id).under(counselor)
}

/// Member outside the hierarchy.
pub fn unassigned(id: &str) -> Member {
    Member::new(id)
}

/// Ids `prefix1..=prefixN`.
pub fn ids(prefix: &str, n: usize) -> Vec<MemberId> {
    (1..=n).map(|i| MemberId::new(format!("{prefix}{i}"))).collect()
}

/// Snapshot under the default policy (fan-out 9, root role "Counsel").
pub fn roster(members: Vec<Member>) -> DomainResult<Roster> {
    Roster::new(members, HierarchyPolicy::default())
}
