use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tree::TreeError;
use crate::utils::new_id;

/// Scope id stored on root groups bound to the whole deployment.
pub const GLOBAL_SCOPE_ID: &str = "global";

/// What a group is bound to. `Group` means "my parent is another group".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Model,
    Site,
    Device,
    Group,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Model => "model",
            ScopeKind::Site => "site",
            ScopeKind::Device => "device",
            ScopeKind::Group => "group",
        }
    }

    /// True for the four kinds a root group may bind to.
    pub fn is_root_scope(&self) -> bool {
        !matches!(self, ScopeKind::Group)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(ScopeKind::Global),
            "model" => Ok(ScopeKind::Model),
            "site" => Ok(ScopeKind::Site),
            "device" => Ok(ScopeKind::Device),
            "group" => Ok(ScopeKind::Group),
            other => Err(TreeError::InvalidScope(other.to_string())),
        }
    }
}

/// A (scope kind, scope id) pair that root groups are addressed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeRef {
    pub kind: ScopeKind,
    pub id: String,
}

impl ScopeRef {
    /// Global scopes ignore the supplied id and use [`GLOBAL_SCOPE_ID`].
    pub fn new(kind: ScopeKind, id: impl Into<String>) -> Self {
        let id = match kind {
            ScopeKind::Global => GLOBAL_SCOPE_ID.to_string(),
            _ => id.into(),
        };
        Self { kind, id }
    }

    pub fn global() -> Self {
        Self::new(ScopeKind::Global, GLOBAL_SCOPE_ID)
    }

    /// Parse a scope from request parameters. `group` is never a valid root scope.
    pub fn parse(kind: &str, id: &str) -> Result<Self, TreeError> {
        let kind: ScopeKind = kind.parse()?;
        if !kind.is_root_scope() {
            return Err(TreeError::InvalidScope(kind.to_string()));
        }
        Ok(Self::new(kind, id))
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A named node in a configuration tree.
///
/// Root groups carry `scope_id`; nested groups (`scope_kind == Group`) carry
/// `parent_id`. Exactly one of the two is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub id: String,
    pub name: String,
    pub scope_kind: ScopeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConfigGroup {
    pub fn new_root(scope: &ScopeRef, name: &str, remark: Option<String>) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            scope_kind: scope.kind,
            scope_id: Some(scope.id.clone()),
            parent_id: None,
            published: false,
            remark,
            created_at: Utc::now(),
        }
    }

    pub fn new_child(parent_id: &str, name: &str, remark: Option<String>) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            scope_kind: ScopeKind::Group,
            scope_id: None,
            parent_id: Some(parent_id.to_string()),
            published: false,
            remark,
            created_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.scope_kind.is_root_scope()
    }

    /// The scope a root group is bound to. `None` for nested groups.
    pub fn scope(&self) -> Option<ScopeRef> {
        match (&self.scope_id, self.is_root()) {
            (Some(id), true) => Some(ScopeRef::new(self.scope_kind, id.clone())),
            _ => None,
        }
    }
}

/// A leaf key/value pair owned by exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigElement {
    pub id: String,
    pub group_id: String,
    pub key: String,
    pub value: String,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConfigElement {
    pub fn new(group_id: &str, key: &str, value: &str, remark: Option<String>) -> Self {
        Self {
            id: new_id(),
            group_id: group_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            published: false,
            remark,
            created_at: Utc::now(),
        }
    }
}

/// Either kind of tree node, as returned by path operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Group(ConfigGroup),
    Element(ConfigElement),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Group(g) => &g.id,
            Node::Element(e) => &e.id,
        }
    }

    /// Group name or element key.
    pub fn name(&self) -> &str {
        match self {
            Node::Group(g) => &g.name,
            Node::Element(e) => &e.key,
        }
    }

    pub fn as_group(&self) -> Option<&ConfigGroup> {
        match self {
            Node::Group(g) => Some(g),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&ConfigElement> {
        match self {
            Node::Element(e) => Some(e),
            Node::Group(_) => None,
        }
    }
}

/// Direct children of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupChildren {
    pub groups: Vec<ConfigGroup>,
    pub elements: Vec<ConfigElement>,
}

impl GroupChildren {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.elements.is_empty()
    }
}

/// A group together with its direct children (GET on a group path).
#[derive(Debug, Clone, Serialize)]
pub struct GroupWithChildren {
    pub group: ConfigGroup,
    pub children: GroupChildren,
}

/// CreateNodeRequest creates an element when `value` is present, otherwise a group
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

/// UpdateValueRequest changes the value of an element
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateValueRequest {
    pub value: String,
    #[serde(default)]
    pub remark: Option<String>,
}

/// RenameRequest renames the last node of a path
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_kind_parse() {
        assert_eq!("site".parse::<ScopeKind>().unwrap(), ScopeKind::Site);
        assert_eq!("group".parse::<ScopeKind>().unwrap(), ScopeKind::Group);
        assert_eq!(
            "tenant".parse::<ScopeKind>().unwrap_err(),
            TreeError::InvalidScope("tenant".to_string())
        );
    }

    #[test]
    fn test_scope_ref_rejects_group() {
        assert!(matches!(
            ScopeRef::parse("group", "abc"),
            Err(TreeError::InvalidScope(_))
        ));
        assert_eq!(ScopeRef::parse("device", "d1").unwrap(), ScopeRef::new(ScopeKind::Device, "d1"));
    }

    #[test]
    fn test_global_scope_normalizes_id() {
        let scope = ScopeRef::parse("global", "anything").unwrap();
        assert_eq!(scope.id, GLOBAL_SCOPE_ID);
        assert_eq!(scope, ScopeRef::global());
    }

    #[test]
    fn test_group_scope() {
        let site = ScopeRef::new(ScopeKind::Site, "s1");
        let root = ConfigGroup::new_root(&site, "account", None);
        assert!(root.is_root());
        assert_eq!(root.scope(), Some(site));
        assert!(!root.published);

        let child = ConfigGroup::new_child(&root.id, "1", None);
        assert!(!child.is_root());
        assert_eq!(child.scope(), None);
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
    }

    #[test]
    fn test_node_serializes_with_kind_tag() {
        let element = ConfigElement::new("g1", "server", "sip.example.com", None);
        let json = serde_json::to_value(Node::Element(element)).unwrap();
        assert_eq!(json["kind"], "element");
        assert_eq!(json["key"], "server");
    }
}
