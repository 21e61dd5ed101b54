//! Scenario tests for HierarchyEngine operations.
//!
//! Each test plans an operation against a snapshot, applies the resulting
//! patches in memory and checks the resulting hierarchy.

use rstest::{fixture, rstest};

use shepherd::domain::{
    ChangeSet, DomainError, HierarchyEngine, HierarchyWarning, Member, MemberId, Node, Placement,
    Roster,
};
use shepherd::util::testing::{counsel, counselee, ids, init_test_setup, roster, unassigned};

fn id(s: &str) -> MemberId {
    MemberId::new(s)
}

/// Apply `changes` to a copy of `roster`'s members and rebuild the snapshot.
fn applied(roster: &Roster, changes: &ChangeSet) -> Roster {
    let mut members = roster.members().to_vec();
    changes.apply(&mut members).expect("patches apply");
    Roster::new(members, roster.policy().clone()).expect("valid roster")
}

/// Root with seven counselors plus three unassigned members a, b, c.
#[fixture]
fn seven_at_root() -> Roster {
    init_test_setup();
    let mut members: Vec<Member> = (1..=7).map(|i| counsel(&format!("r{i}"))).collect();
    members.extend(["a", "b", "c"].map(unassigned));
    roster(members).unwrap()
}

/// root -> A -> B -> C, plus an unassigned D.
#[fixture]
fn chain() -> Roster {
    init_test_setup();
    roster(vec![
        counsel("A"),
        counselee("B", "A"),
        counselee("C", "B"),
        unassigned("D"),
    ])
    .unwrap()
}

// ============================================================
// queries
// ============================================================

#[rstest]
fn given_chain_when_path_to_root_then_lists_ancestors_top_down(chain: Roster) {
    let path = chain.path_to_root(&id("C")).unwrap();
    assert_eq!(path, vec![id("A"), id("B"), id("C")]);
}

#[rstest]
fn given_chain_when_querying_children_then_snapshot_order(chain: Roster) {
    assert_eq!(chain.child_ids(&Node::Root).unwrap(), vec![id("A")]);
    assert_eq!(chain.child_ids(&Node::member("B")).unwrap(), vec![id("C")]);
    assert!(chain.child_ids(&Node::member("C")).unwrap().is_empty());
}

#[rstest]
fn given_unknown_member_when_querying_then_not_found(chain: Roster) {
    assert_eq!(
        chain.occupancy(&Node::member("ghost")),
        Err(DomainError::NotFound(id("ghost")))
    );
    assert_eq!(
        chain.path_to_root(&id("ghost")),
        Err(DomainError::NotFound(id("ghost")))
    );
}

// ============================================================
// assign_batch
// ============================================================

#[rstest]
fn given_root_with_seven_when_assigning_three_then_capacity_exceeded(seven_at_root: Roster) {
    // Arrange
    let engine = HierarchyEngine::new(&seven_at_root);

    // Act
    let result = engine.assign_batch(&[id("a"), id("b"), id("c")], &Node::Root);

    // Assert
    assert_eq!(
        result,
        Err(DomainError::CapacityExceeded {
            node: Node::Root,
            occupancy: 7,
            requested: 3,
            capacity: 9,
        })
    );
    assert_eq!(seven_at_root.occupancy(&Node::Root).unwrap(), 7);
}

#[rstest]
fn given_root_with_seven_when_assigning_two_then_root_is_full(seven_at_root: Roster) {
    let engine = HierarchyEngine::new(&seven_at_root);

    let changes = engine
        .assign_batch(&[id("a"), id("b")], &Node::Root)
        .unwrap();
    let after = applied(&seven_at_root, &changes);

    assert_eq!(after.occupancy(&Node::Root).unwrap(), 9);
    assert_eq!(after.available_capacity(&Node::Root).unwrap(), 0);
    let a = after.member(&id("a")).unwrap();
    assert_eq!(a.role.as_deref(), Some("Counsel"));
    assert_eq!(a.assigned_counsel_id, None);
}

#[rstest]
#[case::exactly_full(9, true)]
#[case::one_over(10, false)]
fn given_batch_size_when_assigning_under_member_then_cap_is_nine(
    #[case] batch: usize,
    #[case] accepted: bool,
) {
    init_test_setup();
    let mut members = vec![counsel("lead")];
    members.extend(ids("m", batch).iter().map(|m| unassigned(m.as_str())));
    let roster = roster(members).unwrap();

    let result = HierarchyEngine::new(&roster).assign_batch(&ids("m", batch), &Node::member("lead"));

    assert_eq!(result.is_ok(), accepted);
}

#[rstest]
fn given_member_under_other_counselor_when_assigning_then_moves_it(chain: Roster) {
    let changes = HierarchyEngine::new(&chain)
        .assign_batch(&[id("C")], &Node::member("A"))
        .unwrap();
    let after = applied(&chain, &changes);

    assert_eq!(after.placement(&id("C")).unwrap(), Placement::Under(id("A")));
    assert_eq!(after.occupancy(&Node::member("B")).unwrap(), 0);
}

#[rstest]
fn given_ancestor_when_assigning_below_descendant_then_rejects(chain: Roster) {
    let result = HierarchyEngine::new(&chain).assign_batch(&[id("A")], &Node::member("C"));

    assert_eq!(
        result,
        Err(DomainError::SelfReferenceRejected {
            member: id("A"),
            target: Node::member("C"),
        })
    );
}

// ============================================================
// remove
// ============================================================

#[rstest]
fn given_leader_with_counselees_when_removing_then_subtree_is_orphaned() {
    init_test_setup();
    let roster = roster(vec![
        counsel("X"),
        counselee("p", "X"),
        counselee("q", "X"),
    ])
    .unwrap();

    let changes = HierarchyEngine::new(&roster).remove(&id("X")).unwrap();
    let after = applied(&roster, &changes);

    let x = after.member(&id("X")).unwrap();
    assert_eq!(x.assigned_counsel_id, None);
    assert_eq!(x.role, None);
    assert_eq!(after.placement(&id("p")).unwrap(), Placement::Under(id("X")));
    assert_eq!(after.placement(&id("q")).unwrap(), Placement::Under(id("X")));
    assert_eq!(
        changes.warnings,
        vec![HierarchyWarning::OrphanedSubtree {
            leader: id("X"),
            counselees: vec![id("p"), id("q")],
        }]
    );
}

#[rstest]
fn given_removed_member_when_reassigning_then_parent_is_restored(chain: Roster) {
    let engine = HierarchyEngine::new(&chain);
    let removed = applied(&chain, &engine.remove(&id("C")).unwrap());
    assert_eq!(removed.placement(&id("C")).unwrap(), Placement::Unassigned);

    let changes = HierarchyEngine::new(&removed)
        .assign_batch(&[id("C")], &Node::member("B"))
        .unwrap();
    let restored = applied(&removed, &changes);

    assert_eq!(restored.members(), chain.members());
}

// ============================================================
// replace
// ============================================================

#[rstest]
fn given_leading_incoming_with_successor_when_replacing_then_hands_off_counselees() {
    init_test_setup();
    // o leads the root tier slot, i leads k1..k3 under lead, s is free
    let roster = roster(vec![
        counsel("o"),
        counsel("lead"),
        counselee("i", "lead"),
        counselee("k1", "i"),
        counselee("k2", "i"),
        counselee("k3", "i"),
        unassigned("s"),
    ])
    .unwrap();

    let changes = HierarchyEngine::new(&roster)
        .replace(&id("o"), &id("i"), Some(&id("s")))
        .unwrap();
    let after = applied(&roster, &changes);

    assert_eq!(after.placement(&id("i")).unwrap(), Placement::Root);
    assert_eq!(after.placement(&id("s")).unwrap(), Placement::Under(id("lead")));
    assert_eq!(
        after.child_ids(&Node::member("s")).unwrap(),
        vec![id("k1"), id("k2"), id("k3")]
    );
    assert_eq!(after.placement(&id("o")).unwrap(), Placement::Unassigned);
    assert_eq!(after.occupancy(&Node::Root).unwrap(), 2);
}

#[rstest]
fn given_leading_incoming_without_successor_when_replacing_then_successor_required() {
    init_test_setup();
    let roster = roster(vec![
        counsel("o"),
        counsel("i"),
        counselee("k", "i"),
    ])
    .unwrap();

    let result = HierarchyEngine::new(&roster).replace(&id("o"), &id("i"), None);

    assert_eq!(
        result,
        Err(DomainError::SuccessorRequired { leader: id("i") })
    );
}

#[rstest]
fn given_root_tier_incoming_when_replacing_then_successor_takes_root_slot() {
    init_test_setup();
    let roster = roster(vec![
        counsel("o"),
        counsel("i"),
        counselee("k", "i"),
        unassigned("s"),
    ])
    .unwrap();
    assert_eq!(roster.occupancy(&Node::Root).unwrap(), 2);

    let changes = HierarchyEngine::new(&roster)
        .replace(&id("o"), &id("i"), Some(&id("s")))
        .unwrap();
    let after = applied(&roster, &changes);

    assert_eq!(after.placement(&id("s")).unwrap(), Placement::Root);
    assert_eq!(
        after.member(&id("s")).unwrap().role.as_deref(),
        Some("Counsel")
    );
    assert_eq!(after.placement(&id("k")).unwrap(), Placement::Under(id("s")));
    assert_eq!(after.placement(&id("i")).unwrap(), Placement::Root);
    assert_eq!(after.placement(&id("o")).unwrap(), Placement::Unassigned);
    assert_eq!(after.occupancy(&Node::Root).unwrap(), 2);
    assert!(changes.warnings.is_empty());
}

#[rstest]
fn given_incoming_reporting_to_outgoing_when_replacing_then_successor_is_reported() {
    init_test_setup();
    let roster = roster(vec![
        counsel("o"),
        counselee("i", "o"),
        counselee("k", "i"),
        unassigned("s"),
    ])
    .unwrap();

    let changes = HierarchyEngine::new(&roster)
        .replace(&id("o"), &id("i"), Some(&id("s")))
        .unwrap();
    let after = applied(&roster, &changes);

    // s inherits i's old slot under o, which leaves with o
    assert_eq!(after.placement(&id("i")).unwrap(), Placement::Root);
    assert_eq!(after.placement(&id("s")).unwrap(), Placement::Under(id("o")));
    assert_eq!(after.placement(&id("k")).unwrap(), Placement::Under(id("s")));
    assert_eq!(after.placement(&id("o")).unwrap(), Placement::Unassigned);
    assert!(!after.is_rooted(&id("s")).unwrap());
    assert_eq!(
        changes.warnings,
        vec![HierarchyWarning::OrphanedSubtree {
            leader: id("o"),
            counselees: vec![id("s")],
        }]
    );
}

#[rstest]
fn given_unassigned_incoming_when_replacing_then_takes_position(chain: Roster) {
    let changes = HierarchyEngine::new(&chain)
        .replace(&id("B"), &id("D"), None)
        .unwrap();
    let after = applied(&chain, &changes);

    assert_eq!(after.placement(&id("D")).unwrap(), Placement::Under(id("A")));
    assert_eq!(after.placement(&id("B")).unwrap(), Placement::Unassigned);
    // C stays with B and is reported
    assert_eq!(after.placement(&id("C")).unwrap(), Placement::Under(id("B")));
    assert_eq!(changes.warnings.len(), 1);
}

// ============================================================
// swap
// ============================================================

#[rstest]
fn given_members_in_different_subtrees_when_swapping_twice_then_positions_restored() {
    init_test_setup();
    let roster = roster(vec![
        counsel("X"),
        counsel("a"),
        counselee("b", "X"),
        counselee("b1", "b"),
    ])
    .unwrap();

    let once = applied(
        &roster,
        &HierarchyEngine::new(&roster).swap(&id("a"), &id("b")).unwrap(),
    );
    assert_eq!(once.placement(&id("a")).unwrap(), Placement::Under(id("X")));
    assert_eq!(once.placement(&id("b")).unwrap(), Placement::Root);
    // counselees do not travel with their counselor
    assert_eq!(once.placement(&id("b1")).unwrap(), Placement::Under(id("b")));

    let twice = applied(
        &once,
        &HierarchyEngine::new(&once).swap(&id("a"), &id("b")).unwrap(),
    );
    assert_eq!(twice.members(), roster.members());
}

#[rstest]
fn given_parent_and_child_when_swapping_then_rejects(chain: Roster) {
    let result = HierarchyEngine::new(&chain).swap(&id("B"), &id("C"));

    assert!(matches!(
        result,
        Err(DomainError::SelfReferenceRejected { .. })
    ));
}

// ============================================================
// reconcile
// ============================================================

#[rstest]
fn given_member_with_parent_and_root_role_when_reconciling_then_role_cleared() {
    init_test_setup();
    let stale = counselee("s", "A").with_role("Counsel");
    let roster = roster(vec![counsel("A"), stale]).unwrap();
    assert_eq!(roster.placement(&id("s")).unwrap(), Placement::Under(id("A")));

    let changes = HierarchyEngine::new(&roster).reconcile().unwrap();
    let after = applied(&roster, &changes);

    assert_eq!(changes.patches.len(), 1);
    assert_eq!(after.member(&id("s")).unwrap().role, None);
    assert!(HierarchyEngine::new(&after).reconcile().unwrap().is_empty());
}
