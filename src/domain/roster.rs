//! Indexed member snapshot and the hierarchy queries over it.

use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::domain::entities::{HierarchyPolicy, Member, MemberId, MemberPatch, Node, Placement};
use crate::domain::error::{DomainError, DomainResult};

/// Immutable view of the flat member list as a rooted forest.
///
/// Construction checks id uniqueness and referential integrity; cycles are
/// only detected when a query walks into one.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<Member>,
    index: HashMap<MemberId, usize>,
    children: HashMap<Node, Vec<usize>>,
    policy: HierarchyPolicy,
}

impl Roster {
    pub fn new(members: Vec<Member>, policy: HierarchyPolicy) -> DomainResult<Self> {
        let mut index = HashMap::with_capacity(members.len());
        for (pos, member) in members.iter().enumerate() {
            if index.insert(member.id.clone(), pos).is_some() {
                return Err(DomainError::DuplicateMember(member.id.clone()));
            }
        }

        let mut children: HashMap<Node, Vec<usize>> = HashMap::new();
        for (pos, member) in members.iter().enumerate() {
            if let Some(parent) = &member.assigned_counsel_id {
                if !index.contains_key(parent) {
                    return Err(DomainError::DanglingReference {
                        member: member.id.clone(),
                        reference: parent.clone(),
                    });
                }
            }
            if let Some(node) = member.placement(&policy.root_role).parent_node() {
                children.entry(node).or_default().push(pos);
            }
        }

        Ok(Self {
            members,
            index,
            children,
            policy,
        })
    }

    pub fn policy(&self) -> &HierarchyPolicy {
        &self.policy
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.index.get(id).map(|&pos| &self.members[pos])
    }

    pub fn member(&self, id: &MemberId) -> DomainResult<&Member> {
        self.get(id)
            .ok_or_else(|| DomainError::NotFound(id.clone()))
    }

    fn ensure_node(&self, node: &Node) -> DomainResult<()> {
        match node {
            Node::Root => Ok(()),
            Node::Member(id) => self.member(id).map(|_| ()),
        }
    }

    pub fn placement(&self, id: &MemberId) -> DomainResult<Placement> {
        Ok(self.placement_of(self.member(id)?))
    }

    pub fn placement_of(&self, member: &Member) -> Placement {
        member.placement(&self.policy.root_role)
    }

    /// Direct children of `node`, in snapshot order.
    #[instrument(level = "trace", skip(self))]
    pub fn children_of(&self, node: &Node) -> DomainResult<Vec<&Member>> {
        self.ensure_node(node)?;
        Ok(self
            .children
            .get(node)
            .map(|positions| positions.iter().map(|&pos| &self.members[pos]).collect())
            .unwrap_or_default())
    }

    pub fn child_ids(&self, node: &Node) -> DomainResult<Vec<MemberId>> {
        Ok(self
            .children_of(node)?
            .into_iter()
            .map(|m| m.id.clone())
            .collect())
    }

    pub fn occupancy(&self, node: &Node) -> DomainResult<usize> {
        self.ensure_node(node)?;
        Ok(self.children.get(node).map_or(0, Vec::len))
    }

    pub fn available_capacity(&self, node: &Node) -> DomainResult<usize> {
        Ok(self.policy.max_fan_out.saturating_sub(self.occupancy(node)?))
    }

    /// Ancestors from the top of the chain down to and including `id`.
    ///
    /// For root → A → B → C, `path_to_root(C)` is `[A, B, C]`.
    #[instrument(level = "trace", skip(self))]
    pub fn path_to_root(&self, id: &MemberId) -> DomainResult<Vec<MemberId>> {
        let mut path = vec![id.clone()];
        let mut seen = HashSet::from([id.clone()]);
        let mut current = self.member(id)?;

        while let Some(parent) = &current.assigned_counsel_id {
            if !seen.insert(parent.clone()) {
                return Err(DomainError::CycleDetected(id.clone()));
            }
            current = self.member(parent)?;
            path.push(parent.clone());
        }

        path.reverse();
        Ok(path)
    }

    /// Whether the chain above `id` ends in the root tier.
    pub fn is_rooted(&self, id: &MemberId) -> DomainResult<bool> {
        let path = self.path_to_root(id)?;
        match path.first() {
            Some(top) => Ok(self.placement(top)? == Placement::Root),
            None => Ok(false),
        }
    }

    /// Whether `ancestor` appears strictly above `id`.
    pub fn is_ancestor(&self, ancestor: &MemberId, id: &MemberId) -> DomainResult<bool> {
        let path = self.path_to_root(id)?;
        Ok(path[..path.len() - 1].contains(ancestor))
    }

    /// A leader has counselees or sits in the root tier.
    pub fn is_leader(&self, id: &MemberId) -> DomainResult<bool> {
        let member = self.member(id)?;
        Ok(self.placement_of(member) == Placement::Root
            || self.occupancy(&Node::Member(id.clone()))? > 0)
    }

    pub fn leaders(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| {
                self.placement_of(m) == Placement::Root
                    || self.children.contains_key(&Node::Member(m.id.clone()))
            })
            .collect()
    }

    /// Members outside the hierarchy, the candidate pool for assignment.
    pub fn unassigned(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| self.placement_of(m) == Placement::Unassigned)
            .collect()
    }

    /// Members that point at a counselor yet still carry the root role.
    pub fn stale_root_roles(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| {
                m.assigned_counsel_id.is_some()
                    && m.role.as_deref() == Some(self.policy.root_role.as_str())
            })
            .collect()
    }

    /// New snapshot with `patches` applied.
    pub fn with_patches(&self, patches: &[MemberPatch]) -> DomainResult<Roster> {
        let mut members = self.members.clone();
        apply_patches(&mut members, patches)?;
        Roster::new(members, self.policy.clone())
    }
}

/// Apply `patches` in order; an unknown id aborts before anything changes.
pub fn apply_patches(members: &mut [Member], patches: &[MemberPatch]) -> DomainResult<()> {
    let index: HashMap<MemberId, usize> = members
        .iter()
        .enumerate()
        .map(|(pos, m)| (m.id.clone(), pos))
        .collect();

    let positions = patches
        .iter()
        .map(|p| {
            index
                .get(&p.id)
                .copied()
                .ok_or_else(|| DomainError::NotFound(p.id.clone()))
        })
        .collect::<DomainResult<Vec<_>>>()?;

    for (patch, pos) in patches.iter().zip(positions) {
        patch.apply_to(&mut members[pos]);
    }
    Ok(())
}
