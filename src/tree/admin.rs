use anyhow::{Context, Result};

use super::events::TreeEvent;
use super::path::{split_path, validate_name, validate_value};
use super::resolver::{ensure_root_scope, ResolvedPath};
use super::store::{ElementFilter, GroupFilter, NodeStore};
use super::{ConfigTree, TreeError};
use crate::models::{
    ConfigElement, ConfigGroup, CreateNodeRequest, GroupChildren, GroupWithChildren, Node,
    ScopeRef,
};

impl ResolvedPath {
    /// The terminal node, or not-found naming the full path.
    pub(super) fn into_leaf(self, path: &str) -> Result<Node, TreeError> {
        self.leaf.ok_or_else(|| TreeError::not_found("node", path))
    }
}

impl<S: NodeStore> ConfigTree<S> {
    /// Create a group, or an element when the request carries a value.
    ///
    /// A single-segment path creates a root group bound to `scope`. Longer
    /// paths need every segment but the last to exist as groups.
    pub async fn create_at_path(
        &self,
        scope: &ScopeRef,
        path: &str,
        req: &CreateNodeRequest,
    ) -> Result<Node> {
        ensure_root_scope(scope)?;
        let segments = split_path(path)?;
        let name = segments[segments.len() - 1];
        validate_name(name)?;

        if segments.len() == 1 {
            if req.value.is_some() {
                return Err(TreeError::InvalidPath(format!(
                    "element '{}' needs an owning group",
                    name
                ))
                .into());
            }
            if self.name_taken(scope, None, name).await? {
                return Err(TreeError::Duplicate(path.to_string()).into());
            }
            let group = ConfigGroup::new_root(scope, name, req.remark.clone());
            let group = self
                .store
                .save_group(&group)
                .await
                .context("Failed to save root group")?;
            tracing::info!("Created root group '{}' under {}", group.name, scope);
            self.emit(TreeEvent::GroupCreated(group.clone()));
            return Ok(Node::Group(group));
        }

        let resolved = self.resolve_path(scope, path).await?;
        if resolved.leaf.is_some() {
            return Err(TreeError::Duplicate(path.to_string()).into());
        }
        let parent = resolved
            .parent()
            .ok_or_else(|| TreeError::InvalidPath(path.to_string()))?;

        match &req.value {
            Some(value) => {
                validate_value(value)?;
                let element = ConfigElement::new(&parent.id, name, value, req.remark.clone());
                let element = self
                    .store
                    .save_element(&element)
                    .await
                    .context("Failed to save element")?;
                tracing::info!("Created element {} under {}", path, scope);
                self.emit(TreeEvent::ElementCreated(element.clone()));
                Ok(Node::Element(element))
            }
            None => {
                let group = ConfigGroup::new_child(&parent.id, name, req.remark.clone());
                let group = self
                    .store
                    .save_group(&group)
                    .await
                    .context("Failed to save group")?;
                tracing::info!("Created group {} under {}", path, scope);
                self.emit(TreeEvent::GroupCreated(group.clone()));
                Ok(Node::Group(group))
            }
        }
    }

    /// Change the value of the element at `path`.
    pub async fn update_value_at_path(
        &self,
        scope: &ScopeRef,
        path: &str,
        value: &str,
        remark: Option<String>,
    ) -> Result<ConfigElement> {
        let leaf = self.resolve_path(scope, path).await?.into_leaf(path)?;
        match leaf {
            Node::Element(element) => self.apply_value(element, value, remark).await,
            Node::Group(_) => Err(TreeError::not_found("element", path).into()),
        }
    }

    /// Rename the last node of `path`. The new name must be free among all
    /// siblings, groups and elements alike.
    pub async fn rename_leaf(&self, scope: &ScopeRef, path: &str, new_name: &str) -> Result<Node> {
        validate_name(new_name)?;
        let resolved = self.resolve_path(scope, path).await?;
        let parent = resolved.parent().cloned();
        let leaf = resolved.into_leaf(path)?;

        if leaf.name() == new_name {
            return Ok(leaf);
        }
        if self.name_taken(scope, parent.as_ref(), new_name).await? {
            return Err(TreeError::Duplicate(new_name.to_string()).into());
        }

        match leaf {
            Node::Group(mut group) => {
                let old = std::mem::replace(&mut group.name, new_name.to_string());
                let group = self
                    .store
                    .save_group(&group)
                    .await
                    .context("Failed to rename group")?;
                tracing::info!("Renamed group '{}' to '{}' under {}", old, new_name, scope);
                self.emit(TreeEvent::GroupRenamed(group.clone()));
                Ok(Node::Group(group))
            }
            Node::Element(mut element) => {
                let old = std::mem::replace(&mut element.key, new_name.to_string());
                let element = self
                    .store
                    .save_element(&element)
                    .await
                    .context("Failed to rename element")?;
                tracing::info!("Renamed element '{}' to '{}' under {}", old, new_name, scope);
                self.emit(TreeEvent::ElementRenamed(element.clone()));
                Ok(Node::Element(element))
            }
        }
    }

    /// Delete the node at `path`. Groups must be empty.
    pub async fn delete_at_path(&self, scope: &ScopeRef, path: &str) -> Result<Node> {
        let leaf = self.resolve_path(scope, path).await?.into_leaf(path)?;
        match leaf {
            Node::Group(group) => self.remove_group(group).await.map(Node::Group),
            Node::Element(element) => self.remove_element(element).await.map(Node::Element),
        }
    }

    pub async fn get_group(&self, id: &str) -> Result<ConfigGroup> {
        self.store
            .find_group(&GroupFilter::by_id(id))
            .await?
            .ok_or_else(|| TreeError::not_found("group", id).into())
    }

    pub async fn get_element(&self, id: &str) -> Result<ConfigElement> {
        self.store
            .find_element(&ElementFilter::by_id(id))
            .await?
            .ok_or_else(|| TreeError::not_found("element", id).into())
    }

    /// Direct child groups and elements of a group, in creation order.
    pub async fn list_children(&self, group_id: &str) -> Result<GroupChildren> {
        let group = self.get_group(group_id).await?;
        self.children_of(&group.id).await
    }

    pub async fn get_group_with_children(&self, id: &str) -> Result<GroupWithChildren> {
        let group = self.get_group(id).await?;
        let children = self.children_of(&group.id).await?;
        Ok(GroupWithChildren { group, children })
    }

    /// Root groups bound to `scope`, in creation order.
    pub async fn list_roots(&self, scope: &ScopeRef) -> Result<Vec<ConfigGroup>> {
        ensure_root_scope(scope)?;
        self.store.find_groups(&GroupFilter::roots(scope)).await
    }

    pub async fn delete_group_by_id(&self, id: &str) -> Result<ConfigGroup> {
        let group = self.get_group(id).await?;
        self.remove_group(group).await
    }

    pub async fn update_element_value(
        &self,
        id: &str,
        value: &str,
        remark: Option<String>,
    ) -> Result<ConfigElement> {
        let element = self.get_element(id).await?;
        self.apply_value(element, value, remark).await
    }

    pub async fn delete_element_by_id(&self, id: &str) -> Result<ConfigElement> {
        let element = self.get_element(id).await?;
        self.remove_element(element).await
    }

    async fn children_of(&self, group_id: &str) -> Result<GroupChildren> {
        let groups = self
            .store
            .find_groups(&GroupFilter::children_of(group_id))
            .await?;
        let elements = self
            .store
            .find_elements(&ElementFilter::in_group(group_id))
            .await?;
        Ok(GroupChildren { groups, elements })
    }

    /// Whether `name` is used by any sibling: a root group of `scope` when
    /// `parent` is `None`, otherwise a child group or element of `parent`.
    async fn name_taken(
        &self,
        scope: &ScopeRef,
        parent: Option<&ConfigGroup>,
        name: &str,
    ) -> Result<bool> {
        let Some(parent) = parent else {
            return Ok(self
                .store
                .find_group(&GroupFilter::root(scope, name))
                .await?
                .is_some());
        };
        if self
            .store
            .find_element(&ElementFilter::keyed(&parent.id, name))
            .await?
            .is_some()
        {
            return Ok(true);
        }
        Ok(self
            .store
            .find_group(&GroupFilter::child(&parent.id, name))
            .await?
            .is_some())
    }

    async fn apply_value(
        &self,
        mut element: ConfigElement,
        value: &str,
        remark: Option<String>,
    ) -> Result<ConfigElement> {
        validate_value(value)?;
        element.value = value.to_string();
        if remark.is_some() {
            element.remark = remark;
        }
        let element = self
            .store
            .save_element(&element)
            .await
            .context("Failed to update element")?;
        tracing::info!("Updated element {} ({})", element.key, element.id);
        self.emit(TreeEvent::ElementUpdated(element.clone()));
        Ok(element)
    }

    async fn remove_group(&self, group: ConfigGroup) -> Result<ConfigGroup> {
        if !self.children_of(&group.id).await?.is_empty() {
            return Err(TreeError::NonEmpty(group.name).into());
        }
        self.store
            .delete_group(&group.id)
            .await
            .context("Failed to delete group")?;
        tracing::info!("Deleted group '{}' ({})", group.name, group.id);
        self.emit(TreeEvent::GroupDeleted(group.clone()));
        Ok(group)
    }

    async fn remove_element(&self, element: ConfigElement) -> Result<ConfigElement> {
        self.store
            .delete_element(&element.id)
            .await
            .context("Failed to delete element")?;
        tracing::info!("Deleted element '{}' ({})", element.key, element.id);
        self.emit(TreeEvent::ElementDeleted(element.clone()));
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::models::{Node, ScopeKind, ScopeRef};
    use crate::tree::TreeError;

    fn device() -> ScopeRef {
        ScopeRef::new(ScopeKind::Device, "D")
    }

    #[tokio::test]
    async fn test_create_root_and_nested() {
        let (tree, events) = tree();
        let nodes = build(&tree, &device(), &["account", "account/1", "account/1/server=sip"]).await;

        let root = nodes[0].as_group().unwrap();
        assert!(root.is_root());
        assert_eq!(root.scope_id.as_deref(), Some("D"));
        assert!(!root.published);

        let child = nodes[1].as_group().unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));

        let element = nodes[2].as_element().unwrap();
        assert_eq!(element.group_id, child.id);
        assert_eq!(element.value, "sip");
        assert!(!element.published);

        assert_eq!(events.names(), vec!["group_created", "group_created", "element_created"]);
    }

    #[tokio::test]
    async fn test_create_duplicate_root() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let err = tree.create_at_path(&device(), "account", &group_req()).await.unwrap_err();
        assert_eq!(tree_error(&err), &TreeError::Duplicate("account".to_string()));

        // Same name under another scope is fine.
        let site = ScopeRef::new(ScopeKind::Site, "D");
        assert!(tree.create_at_path(&site, "account", &group_req()).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_duplicate_across_kinds() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/enable=1", "account/1"]).await;

        let err = tree.create_at_path(&device(), "account/enable", &group_req()).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::Duplicate(_)));

        let err = tree.create_at_path(&device(), "account/1", &value_req("x")).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_create_requires_parents() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let err = tree.create_at_path(&device(), "account/1/server", &value_req("x")).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_root_element_rejected() {
        let (tree, _) = tree();
        let err = tree.create_at_path(&device(), "server", &value_req("x")).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names_and_values() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let err = tree.create_at_path(&device(), "account/a.b", &value_req("x")).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidPath(_)));

        let err = tree.create_at_path(&device(), "account/a", &value_req("x\ny")).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidValue(_)));
    }

    #[tokio::test]
    async fn test_update_value_at_path() {
        let (tree, events) = tree();
        build(&tree, &device(), &["account", "account/server=old"]).await;
        events.clear();

        let element = tree
            .update_value_at_path(&device(), "account/server", "new", Some("moved".to_string()))
            .await
            .unwrap();
        assert_eq!(element.value, "new");
        assert_eq!(element.remark.as_deref(), Some("moved"));
        assert_eq!(events.names(), vec!["element_updated"]);

        let err = tree.update_value_at_path(&device(), "account", "x", None).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rename_leaf() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1", "account/1/server=sip", "account/1/port=5060"]).await;

        let renamed = tree.rename_leaf(&device(), "account/1/server", "host").await.unwrap();
        assert_eq!(renamed.name(), "host");
        assert!(tree.resolve_path(&device(), "account/1/host").await.unwrap().leaf.is_some());
        assert!(tree.resolve_path(&device(), "account/1/server").await.unwrap().leaf.is_none());

        let err = tree.rename_leaf(&device(), "account/1/host", "port").await.unwrap_err();
        assert_eq!(tree_error(&err), &TreeError::Duplicate("port".to_string()));

        let renamed = tree.rename_leaf(&device(), "account/1", "2").await.unwrap();
        assert!(matches!(renamed, Node::Group(_)));
        assert!(tree.resolve_path(&device(), "account/2/host").await.is_ok());
    }

    #[tokio::test]
    async fn test_rename_root_checks_scope_siblings() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "network"]).await;

        let err = tree.rename_leaf(&device(), "account", "network").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::Duplicate(_)));

        let same = tree.rename_leaf(&device(), "account", "account").await.unwrap();
        assert_eq!(same.name(), "account");
    }

    #[tokio::test]
    async fn test_delete_non_empty_then_empty() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1"]).await;

        let err = tree.delete_at_path(&device(), "account").await.unwrap_err();
        assert_eq!(tree_error(&err), &TreeError::NonEmpty("account".to_string()));

        tree.delete_at_path(&device(), "account/1").await.unwrap();
        tree.delete_at_path(&device(), "account").await.unwrap();
        assert!(tree.list_roots(&device()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_element() {
        let (tree, events) = tree();
        let nodes = build(&tree, &device(), &["account", "account/server=sip"]).await;

        let err = tree.delete_group_by_id(nodes[0].id()).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NonEmpty(_)));

        events.clear();
        tree.delete_element_by_id(nodes[1].id()).await.unwrap();
        tree.delete_group_by_id(nodes[0].id()).await.unwrap();
        assert_eq!(events.names(), vec!["element_deleted", "group_deleted"]);
    }

    #[tokio::test]
    async fn test_delete_missing_path() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let err = tree.delete_at_path(&device(), "account/1").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
        let err = tree.delete_at_path(&device(), "account/1/x").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_children_in_creation_order() {
        let (tree, _) = tree();
        let nodes = build(&tree, &device(), &["account", "account/b", "account/z=1", "account/a", "account/y=2"]).await;

        let children = tree.list_children(nodes[0].id()).await.unwrap();
        let groups: Vec<&str> = children.groups.iter().map(|g| g.name.as_str()).collect();
        let elements: Vec<&str> = children.elements.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(groups, vec!["b", "a"]);
        assert_eq!(elements, vec!["z", "y"]);

        let err = tree.list_children("missing").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_element_value_by_id() {
        let (tree, _) = tree();
        let nodes = build(&tree, &device(), &["account", "account/server=old"]).await;

        let element = tree.update_element_value(nodes[1].id(), "new", None).await.unwrap();
        assert_eq!(element.value, "new");
        assert_eq!(tree.get_element(nodes[1].id()).await.unwrap().value, "new");

        let err = tree.update_element_value(nodes[1].id(), "a\rb", None).await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidValue(_)));
    }
}
