//! Persistence boundary for configuration groups and elements.
//!
//! Filters are exact-match conjunctions: every field that is `Some` must
//! equal the stored value. `find_*` results come back in creation order.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ConfigElement, ConfigGroup, ScopeKind, ScopeRef};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub id: Option<String>,
    pub scope_kind: Option<ScopeKind>,
    pub scope_id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
}

impl GroupFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// All root groups bound to a scope
    pub fn roots(scope: &ScopeRef) -> Self {
        Self {
            scope_kind: Some(scope.kind),
            scope_id: Some(scope.id.clone()),
            ..Self::default()
        }
    }

    /// The root group with `name` under a scope
    pub fn root(scope: &ScopeRef, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::roots(scope)
        }
    }

    pub fn children_of(parent_id: &str) -> Self {
        Self {
            scope_kind: Some(ScopeKind::Group),
            parent_id: Some(parent_id.to_string()),
            ..Self::default()
        }
    }

    pub fn child(parent_id: &str, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::children_of(parent_id)
        }
    }

    #[cfg(test)]
    pub fn matches(&self, group: &ConfigGroup) -> bool {
        fn eq(want: &Option<String>, have: &Option<String>) -> bool {
            want.is_none() || want == have
        }

        self.id.as_ref().map_or(true, |id| *id == group.id)
            && self.scope_kind.map_or(true, |k| k == group.scope_kind)
            && eq(&self.scope_id, &group.scope_id)
            && eq(&self.parent_id, &group.parent_id)
            && self.name.as_ref().map_or(true, |n| *n == group.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFilter {
    pub id: Option<String>,
    pub group_id: Option<String>,
    pub key: Option<String>,
}

impl ElementFilter {
    pub fn by_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn in_group(group_id: &str) -> Self {
        Self {
            group_id: Some(group_id.to_string()),
            ..Self::default()
        }
    }

    pub fn keyed(group_id: &str, key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::in_group(group_id)
        }
    }

    #[cfg(test)]
    pub fn matches(&self, element: &ConfigElement) -> bool {
        self.id.as_ref().map_or(true, |id| *id == element.id)
            && self.group_id.as_ref().map_or(true, |g| *g == element.group_id)
            && self.key.as_ref().map_or(true, |k| *k == element.key)
    }
}

/// Document-store style accessor (findOne / find / save / deleteOne) for both node kinds.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn find_group(&self, filter: &GroupFilter) -> Result<Option<ConfigGroup>>;

    async fn find_groups(&self, filter: &GroupFilter) -> Result<Vec<ConfigGroup>>;

    /// Insert or replace by id
    async fn save_group(&self, group: &ConfigGroup) -> Result<ConfigGroup>;

    async fn delete_group(&self, id: &str) -> Result<()>;

    async fn find_element(&self, filter: &ElementFilter) -> Result<Option<ConfigElement>>;

    async fn find_elements(&self, filter: &ElementFilter) -> Result<Vec<ConfigElement>>;

    /// Insert or replace by id
    async fn save_element(&self, element: &ConfigElement) -> Result<ConfigElement>;

    async fn delete_element(&self, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_filter_matches_roots_only_in_scope() {
        let site = ScopeRef::new(ScopeKind::Site, "s1");
        let other = ScopeRef::new(ScopeKind::Site, "s2");
        let root = ConfigGroup::new_root(&site, "account", None);

        assert!(GroupFilter::roots(&site).matches(&root));
        assert!(GroupFilter::root(&site, "account").matches(&root));
        assert!(!GroupFilter::root(&site, "network").matches(&root));
        assert!(!GroupFilter::roots(&other).matches(&root));
        assert!(!GroupFilter::children_of(&root.id).matches(&root));
    }

    #[test]
    fn test_group_filter_children() {
        let site = ScopeRef::new(ScopeKind::Site, "s1");
        let root = ConfigGroup::new_root(&site, "account", None);
        let child = ConfigGroup::new_child(&root.id, "1", None);

        assert!(GroupFilter::children_of(&root.id).matches(&child));
        assert!(GroupFilter::child(&root.id, "1").matches(&child));
        assert!(!GroupFilter::child(&root.id, "2").matches(&child));
        assert!(GroupFilter::by_id(&child.id).matches(&child));
        assert!(GroupFilter::default().matches(&child));
    }

    #[test]
    fn test_element_filter() {
        let element = ConfigElement::new("g1", "server", "sip.example.com", None);
        assert!(ElementFilter::in_group("g1").matches(&element));
        assert!(ElementFilter::keyed("g1", "server").matches(&element));
        assert!(!ElementFilter::keyed("g1", "port").matches(&element));
        assert!(!ElementFilter::in_group("g2").matches(&element));
        assert!(ElementFilter::by_id(&element.id).matches(&element));
    }
}
