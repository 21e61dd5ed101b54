//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Fan-out cap of every node, the virtual root included.
pub const DEFAULT_MAX_FAN_OUT: usize = 9;

/// Role value marking a direct report of the virtual root.
pub const DEFAULT_ROOT_ROLE: &str = "Counsel";

/// Opaque member identifier.
///
/// Deserializes from either a JSON string or a JSON integer, so rosters
/// exported with numeric primary keys load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for MemberId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// A member record, reduced to the fields the hierarchy cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    /// Display name, only used for output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent pointer; `None` means "no counselor"
    #[serde(default)]
    pub assigned_counsel_id: Option<MemberId>,
    /// Free-form role; the configured root role marks the root tier
    #[serde(default)]
    pub role: Option<String>,
}

impl Member {
    pub fn new(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            assigned_counsel_id: None,
            role: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn under(mut self, counselor: impl Into<MemberId>) -> Self {
        self.assigned_counsel_id = Some(counselor.into());
        self
    }

    /// Derive this member's position from its fields.
    ///
    /// The parent pointer wins: a member that still carries the root role
    /// while pointing at a counselor sits under that counselor.
    pub fn placement(&self, root_role: &str) -> Placement {
        match (&self.assigned_counsel_id, self.role.as_deref()) {
            (Some(parent), _) => Placement::Under(parent.clone()),
            (None, Some(role)) if role == root_role => Placement::Root,
            (None, _) => Placement::Unassigned,
        }
    }

    /// Field values this member would have at `placement`.
    pub(crate) fn relocated(&self, placement: &Placement, root_role: &str) -> MemberPatch {
        let kept_role = self.role.clone().filter(|role| role != root_role);
        let (assigned_counsel_id, role) = match placement {
            Placement::Root => (None, Some(root_role.to_string())),
            Placement::Under(parent) => (Some(parent.clone()), kept_role),
            Placement::Unassigned => (None, kept_role),
        };
        MemberPatch {
            id: self.id.clone(),
            assigned_counsel_id,
            role,
        }
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.id),
            None => self.id.to_string(),
        }
    }
}

/// A node of the hierarchy: the virtual root or a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Root,
    Member(MemberId),
}

impl Node {
    pub fn member(id: impl Into<MemberId>) -> Self {
        Self::Member(id.into())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Root => f.write_str("root"),
            Node::Member(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Node {
    type Err = std::convert::Infallible;

    /// `root` (any case) is the virtual root, everything else a member id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("root") {
            Ok(Node::Root)
        } else {
            Ok(Node::Member(MemberId::new(s)))
        }
    }
}

/// Where a member sits in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Direct report of the virtual root
    Root,
    /// Counselee of the given member
    Under(MemberId),
    /// Outside the hierarchy
    Unassigned,
}

impl Placement {
    /// Placement of a direct child of `node`.
    pub fn child_of(node: &Node) -> Self {
        match node {
            Node::Root => Placement::Root,
            Node::Member(id) => Placement::Under(id.clone()),
        }
    }

    /// The node this placement hangs from, `None` when unassigned.
    pub fn parent_node(&self) -> Option<Node> {
        match self {
            Placement::Root => Some(Node::Root),
            Placement::Under(id) => Some(Node::Member(id.clone())),
            Placement::Unassigned => None,
        }
    }
}

/// Field update for one member, carrying the full new value of both
/// hierarchy fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub id: MemberId,
    pub assigned_counsel_id: Option<MemberId>,
    pub role: Option<String>,
}

impl MemberPatch {
    pub fn apply_to(&self, member: &mut Member) {
        member.assigned_counsel_id = self.assigned_counsel_id.clone();
        member.role = self.role.clone();
    }

    /// Whether applying this patch to `member` would change anything.
    pub fn changes(&self, member: &Member) -> bool {
        member.assigned_counsel_id != self.assigned_counsel_id || member.role != self.role
    }

    pub fn placement(&self, root_role: &str) -> Placement {
        match (&self.assigned_counsel_id, self.role.as_deref()) {
            (Some(parent), _) => Placement::Under(parent.clone()),
            (None, Some(role)) if role == root_role => Placement::Root,
            (None, _) => Placement::Unassigned,
        }
    }
}

impl fmt::Display for MemberPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: assignedCounselId={} role={}",
            self.id,
            self.assigned_counsel_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "null".into()),
            self.role.as_deref().unwrap_or("null"),
        )
    }
}

/// Rules the engine enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyPolicy {
    pub max_fan_out: usize,
    pub root_role: String,
}

impl Default for HierarchyPolicy {
    fn default() -> Self {
        Self {
            max_fan_out: DEFAULT_MAX_FAN_OUT,
            root_role: DEFAULT_ROOT_ROLE.to_string(),
        }
    }
}
