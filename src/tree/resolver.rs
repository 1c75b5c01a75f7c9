use anyhow::Result;
use serde::Serialize;

use super::path::split_path;
use super::store::{ElementFilter, GroupFilter, NodeStore};
use super::{ConfigTree, TreeError};
use crate::models::{ConfigGroup, Node, ScopeRef};

/// Outcome of walking a path.
///
/// `parents` holds the groups for every segment but the last. `leaf` is the
/// node for the last segment, or `None` when the parent path exists but the
/// last segment does not (an insertion point).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPath {
    pub parents: Vec<ConfigGroup>,
    pub leaf: Option<Node>,
}

impl ResolvedPath {
    /// Resolved nodes in path order.
    pub fn nodes(&self) -> Vec<Node> {
        self.parents
            .iter()
            .cloned()
            .map(Node::Group)
            .chain(self.leaf.iter().cloned())
            .collect()
    }

    /// The group that owns (or would own) the last segment.
    pub fn parent(&self) -> Option<&ConfigGroup> {
        self.parents.last()
    }
}

pub(super) fn ensure_root_scope(scope: &ScopeRef) -> Result<(), TreeError> {
    if scope.kind.is_root_scope() {
        Ok(())
    } else {
        Err(TreeError::InvalidScope(scope.kind.to_string()))
    }
}

impl<S: NodeStore> ConfigTree<S> {
    /// Walk `path` under `scope`.
    ///
    /// The first segment must name a root group of the scope and every
    /// intermediate segment a child group; otherwise the whole call fails
    /// with not-found. The last segment is tried as an element first, then
    /// as a child group.
    pub async fn resolve_path(&self, scope: &ScopeRef, path: &str) -> Result<ResolvedPath> {
        ensure_root_scope(scope)?;
        let segments = split_path(path)?;
        if segments.len() > self.max_depth + 1 {
            return Err(TreeError::InvalidPath(format!(
                "path has {} segments, at most {} allowed",
                segments.len(),
                self.max_depth + 1
            ))
            .into());
        }

        tracing::debug!("resolve_path: {} {}", scope, path);

        let root = self
            .store
            .find_group(&GroupFilter::root(scope, segments[0]))
            .await?
            .ok_or_else(|| TreeError::not_found("group", segments[0]))?;

        if segments.len() == 1 {
            return Ok(ResolvedPath {
                parents: Vec::new(),
                leaf: Some(Node::Group(root)),
            });
        }

        let last = segments.len() - 1;
        let mut parents = vec![root];
        for (i, segment) in segments.iter().enumerate().take(last).skip(1) {
            let parent_id = parents[i - 1].id.clone();
            let group = self
                .store
                .find_group(&GroupFilter::child(&parent_id, segment))
                .await?
                .ok_or_else(|| TreeError::not_found("group", segments[..=i].join("/")))?;
            parents.push(group);
        }

        let parent_id = parents[last - 1].id.clone();
        let name = segments[last];
        let leaf = match self
            .store
            .find_element(&ElementFilter::keyed(&parent_id, name))
            .await?
        {
            Some(element) => Some(Node::Element(element)),
            None => self
                .store
                .find_group(&GroupFilter::child(&parent_id, name))
                .await?
                .map(Node::Group),
        };

        if leaf.is_none() {
            tracing::debug!("resolve_path: last segment '{}' not found, parent path valid", name);
        }

        Ok(ResolvedPath { parents, leaf })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::models::{ConfigGroup, ScopeKind, ScopeRef};
    use crate::tree::TreeError;

    fn device() -> ScopeRef {
        ScopeRef::new(ScopeKind::Device, "D")
    }

    #[tokio::test]
    async fn test_resolves_element_as_terminal() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1", "account/1/server=sip.example.com"]).await;

        let resolved = tree.resolve_path(&device(), "account/1/server").await.unwrap();
        let names: Vec<String> = resolved.nodes().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["account", "1", "server"]);
        let element = resolved.leaf.as_ref().and_then(|n| n.as_element()).unwrap();
        assert_eq!(element.value, "sip.example.com");
    }

    #[tokio::test]
    async fn test_missing_leaf_keeps_parents() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1", "account/1/server=sip.example.com"]).await;

        let resolved = tree.resolve_path(&device(), "account/1/missing").await.unwrap();
        assert!(resolved.leaf.is_none());
        let names: Vec<String> = resolved.nodes().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["account", "1"]);
        assert_eq!(resolved.parent().unwrap().name, "1");
    }

    #[tokio::test]
    async fn test_resolves_group_as_terminal() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1"]).await;

        let resolved = tree.resolve_path(&device(), "account/1").await.unwrap();
        assert_eq!(resolved.leaf.as_ref().and_then(|n| n.as_group()).unwrap().name, "1");
    }

    #[tokio::test]
    async fn test_single_segment_resolves_root() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let resolved = tree.resolve_path(&device(), "account").await.unwrap();
        assert!(resolved.parents.is_empty());
        assert_eq!(resolved.leaf.unwrap().name(), "account");
    }

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let err = tree.resolve_path(&device(), "network/vlan").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_intermediate_discards_partial_result() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/1"]).await;

        let err = tree.resolve_path(&device(), "account/2/server").await.unwrap_err();
        assert_eq!(
            tree_error(&err),
            &TreeError::NotFound { kind: "group", name: "account/2".to_string() }
        );
    }

    #[tokio::test]
    async fn test_intermediate_element_is_not_a_group() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account", "account/enable=1"]).await;

        let err = tree.resolve_path(&device(), "account/enable/x").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let (tree, _) = tree();
        build(&tree, &device(), &["account"]).await;

        let other = ScopeRef::new(ScopeKind::Device, "E");
        assert!(tree.resolve_path(&other, "account").await.is_err());
        let site = ScopeRef::new(ScopeKind::Site, "D");
        assert!(tree.resolve_path(&site, "account").await.is_err());
    }

    #[tokio::test]
    async fn test_element_wins_over_group_with_same_name() {
        let (tree, _) = tree();
        let nodes = build(&tree, &device(), &["account", "account/dup=element"]).await;
        // Bypass the engine to plant a conflicting group.
        tree.store().insert_group(ConfigGroup::new_child(nodes[0].id(), "dup", None));

        let resolved = tree.resolve_path(&device(), "account/dup").await.unwrap();
        assert!(resolved.leaf.unwrap().as_element().is_some());
    }

    #[tokio::test]
    async fn test_group_scope_rejected() {
        let (tree, _) = tree();
        let scope = ScopeRef::new(ScopeKind::Group, "g");
        let err = tree.resolve_path(&scope, "account").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidScope(_)));
    }

    #[tokio::test]
    async fn test_overlong_path_is_invalid() {
        let (tree, _) = tree();
        let tree = tree.with_max_depth(2);
        build(&tree, &device(), &["a", "a/b", "a/b/c"]).await;

        assert!(tree.resolve_path(&device(), "a/b/c").await.is_ok());
        let err = tree.resolve_path(&device(), "a/b/c/d").await.unwrap_err();
        assert!(matches!(tree_error(&err), TreeError::InvalidPath(_)));
    }
}
