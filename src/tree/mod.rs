//! Configuration hierarchy engine.
//!
//! Groups and elements form one forest per scope (global, model, site,
//! device). [`ConfigTree`] resolves slash-delimited paths inside a scope,
//! applies administrative mutations and publish rules, materializes
//! subtrees, and merges the four scopes of a device into one document
//! that [`render_config_file`] turns into the phone's text format.

mod admin;
mod document;
mod error;
mod events;
mod materialize;
#[cfg(test)]
mod memory;
mod path;
mod publish;
mod render;
mod resolver;
mod store;

use std::sync::Arc;

pub use document::{ConfigMap, DeviceTarget, FlattenMode};
pub use error::TreeError;
pub use events::{TreeEvent, TreeObserver};
pub use materialize::GroupTree;
pub use render::render_config_file;
pub use store::{ElementFilter, GroupFilter, NodeStore};

/// Default bound on nesting below a root group
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// The engine. Stateless apart from its store handle and observers.
pub struct ConfigTree<S> {
    store: S,
    observers: Vec<Arc<dyn TreeObserver>>,
    max_depth: usize,
}

impl<S: NodeStore> ConfigTree<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            observers: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TreeObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn emit(&self, event: TreeEvent) {
        tracing::debug!("tree event: {}", event.name());
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::events::testing::RecordingObserver;
    use super::memory::MemoryNodeStore;
    use super::*;
    use crate::models::{CreateNodeRequest, Node, ScopeRef};

    pub type TestTree = ConfigTree<MemoryNodeStore>;

    pub fn tree() -> (TestTree, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let tree = ConfigTree::new(MemoryNodeStore::new()).with_observer(observer.clone());
        (tree, observer)
    }

    pub fn group_req() -> CreateNodeRequest {
        CreateNodeRequest::default()
    }

    pub fn value_req(value: &str) -> CreateNodeRequest {
        CreateNodeRequest {
            value: Some(value.to_string()),
            remark: None,
        }
    }

    /// Create every path in order; paths with `=` create elements (`a/b=value`).
    pub async fn build(tree: &TestTree, scope: &ScopeRef, paths: &[&str]) -> Vec<Node> {
        let mut nodes = Vec::new();
        for spec in paths {
            let node = match spec.split_once('=') {
                Some((path, value)) => tree.create_at_path(scope, path, &value_req(value)).await,
                None => tree.create_at_path(scope, spec, &group_req()).await,
            };
            nodes.push(node.unwrap());
        }
        nodes
    }

    /// Publish every node along each path, parents first.
    pub async fn publish_all(tree: &TestTree, scope: &ScopeRef, paths: &[&str]) {
        for path in paths {
            tree.set_published_at_path(scope, path, true).await.unwrap();
        }
    }

    pub fn tree_error(err: &anyhow::Error) -> &TreeError {
        err.downcast_ref::<TreeError>()
            .unwrap_or_else(|| panic!("expected TreeError, got {err:#}"))
    }
}
