//! Tests for AssignmentService against real and failing member stores.

use std::io;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use shepherd::application::services::AssignmentService;
use shepherd::application::ApplicationError;
use shepherd::domain::{
    apply_patches, DomainError, HierarchyPolicy, Member, MemberId, MemberPatch, Node, Operation,
    Placement,
};
use shepherd::infrastructure::traits::{MemberStore, RealFileSystem};
use shepherd::infrastructure::{InMemoryStore, JsonFileStore};
use shepherd::util::testing::{counsel, counselee, init_test_setup, unassigned};

fn id(s: &str) -> MemberId {
    MemberId::new(s)
}

fn service(store: Arc<dyn MemberStore>) -> AssignmentService {
    AssignmentService::new(store, HierarchyPolicy::default())
}

/// Root with eight counselors, a counselee under r1 and two free members.
fn nearly_full_root() -> Vec<Member> {
    let mut members: Vec<Member> = (1..=8).map(|i| counsel(&format!("r{i}"))).collect();
    members.push(counselee("c1", "r1"));
    members.push(unassigned("x"));
    members.push(unassigned("y"));
    members
}

/// Store whose writes always fail.
struct FailingStore {
    members: Vec<Member>,
}

impl MemberStore for FailingStore {
    fn load(&self) -> io::Result<Vec<Member>> {
        Ok(self.members.clone())
    }

    fn persist(&self, _patches: &[MemberPatch]) -> io::Result<Vec<Member>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

/// Store where another writer slips `intruder` into the root tier between
/// our snapshot and our write.
struct RacingStore {
    members: Mutex<Vec<Member>>,
    intruder: MemberId,
}

impl MemberStore for RacingStore {
    fn load(&self) -> io::Result<Vec<Member>> {
        Ok(self.members.lock().unwrap().clone())
    }

    fn persist(&self, patches: &[MemberPatch]) -> io::Result<Vec<Member>> {
        let mut members = self.members.lock().unwrap();
        let concurrent = MemberPatch {
            id: self.intruder.clone(),
            assigned_counsel_id: None,
            role: Some("Counsel".to_string()),
        };
        apply_patches(&mut members, &[concurrent])
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        apply_patches(&mut members, patches)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        Ok(members.clone())
    }
}

// ============================================================
// in-memory store
// ============================================================

#[test]
fn given_in_memory_store_when_assigning_then_store_reflects_patches() {
    // Arrange
    init_test_setup();
    let store = Arc::new(InMemoryStore::new(nearly_full_root()));
    let service = service(store.clone());

    // Act
    let outcome = service.assign(&[id("x")], &Node::Root).unwrap();

    // Assert
    assert_eq!(outcome.changes.patches.len(), 1);
    let roster = service.snapshot().unwrap();
    assert_eq!(roster.placement(&id("x")).unwrap(), Placement::Root);
    assert_eq!(roster.occupancy(&Node::Root).unwrap(), 9);
    assert_eq!(store.load().unwrap(), outcome.members);
}

#[test]
fn given_full_root_when_assigning_then_rejected_and_store_unchanged() {
    init_test_setup();
    let initial = nearly_full_root();
    let store = Arc::new(InMemoryStore::new(initial.clone()));
    let service = service(store.clone());

    let err = service.assign(&[id("x"), id("y")], &Node::Root).unwrap_err();

    assert!(matches!(
        err.rejection(),
        Some(DomainError::CapacityExceeded { .. })
    ));
    assert_eq!(store.load().unwrap(), initial);
}

#[test]
fn given_plan_when_not_executed_then_store_unchanged() {
    init_test_setup();
    let initial = nearly_full_root();
    let store = Arc::new(InMemoryStore::new(initial.clone()));
    let service = service(store.clone());

    let changes = service
        .plan(&Operation::Remove { member: id("r1") })
        .unwrap();

    assert_eq!(changes.patches.len(), 1);
    assert_eq!(changes.warnings.len(), 1);
    assert_eq!(store.load().unwrap(), initial);
}

#[test]
fn given_nothing_to_reconcile_when_executing_then_store_not_written() {
    init_test_setup();
    let store = Arc::new(FailingStore {
        members: nearly_full_root(),
    });

    let outcome = service(store).reconcile().unwrap();

    assert!(outcome.changes.is_empty());
}

// ============================================================
// store failures
// ============================================================

#[test]
fn given_failing_store_when_assigning_then_operation_not_applied() {
    init_test_setup();
    let store = Arc::new(FailingStore {
        members: nearly_full_root(),
    });

    let err = service(store).assign(&[id("x")], &Node::Root).unwrap_err();

    match err {
        ApplicationError::OperationFailed { context, .. } => {
            assert!(context.contains("operation not applied"), "{}", context)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn given_concurrent_writer_when_assigning_then_post_persist_violation() {
    init_test_setup();
    let store = Arc::new(RacingStore {
        members: Mutex::new(nearly_full_root()),
        intruder: id("y"),
    });

    let err = service(store).assign(&[id("x")], &Node::Root).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::PostPersistViolation(DomainError::CapacityExceeded {
            node: Node::Root,
            ..
        })
    ));
}

// ============================================================
// JSON file store
// ============================================================

#[test]
fn given_json_roster_when_swapping_then_file_is_rewritten() {
    // Arrange
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("roster.json");
    std::fs::write(
        &path,
        r#"[
  {"id": 1, "name": "Anna", "assignedCounselId": null, "role": "Counsel"},
  {"id": 2, "name": "Ben", "assignedCounselId": null, "role": "Counsel"},
  {"id": 3, "name": "Cleo", "assignedCounselId": 1, "role": null},
  {"id": 4, "name": "Dan", "assignedCounselId": 2, "role": "Elder"}
]"#,
    )
    .unwrap();
    let store = Arc::new(JsonFileStore::new(&path, Arc::new(RealFileSystem)));
    let service = service(store);

    // Act
    service.swap(&id("3"), &id("4")).unwrap();

    // Assert
    let written: Vec<Member> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let dan = written.iter().find(|m| m.id == id("4")).unwrap();
    assert_eq!(dan.assigned_counsel_id, Some(id("1")));
    assert_eq!(dan.role.as_deref(), Some("Elder"));
    assert_eq!(dan.name.as_deref(), Some("Dan"));
    let cleo = written.iter().find(|m| m.id == id("3")).unwrap();
    assert_eq!(cleo.assigned_counsel_id, Some(id("2")));
}

#[test]
fn given_missing_roster_file_when_snapshotting_then_operation_failed() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(
        temp.path().join("missing.json"),
        Arc::new(RealFileSystem),
    ));

    let err = service(store).snapshot().unwrap_err();

    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
}

#[test]
fn given_roster_with_dangling_counselor_when_snapshotting_then_rejected() {
    init_test_setup();
    let store = Arc::new(InMemoryStore::new(vec![counselee("a", "nobody")]));

    let err = service(store).snapshot().unwrap_err();

    assert_eq!(
        err.rejection(),
        Some(&DomainError::DanglingReference {
            member: id("a"),
            reference: id("nobody"),
        })
    );
}
