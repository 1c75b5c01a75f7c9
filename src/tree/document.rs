//! Nested configuration documents and the scope merge.

use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::materialize::GroupTree;
use super::store::NodeStore;
use super::{ConfigTree, TreeError};
use crate::models::{ScopeKind, ScopeRef};

/// Precedence used when merging a device's scopes. Later entries win.
pub const OVERRIDE_CHAIN: [ScopeKind; 4] = [
    ScopeKind::Global,
    ScopeKind::Model,
    ScopeKind::Site,
    ScopeKind::Device,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Scalar(String),
    Map(ConfigMap),
}

impl ConfigNode {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(value) => Some(value),
            ConfigNode::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigNode::Map(map) => Some(map),
            ConfigNode::Scalar(_) => None,
        }
    }
}

/// Map that keeps keys in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: Vec<(String, ConfigNode)>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Replace the value in place when `key` exists, append otherwise.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigNode) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_entries(self) -> Vec<(String, ConfigNode)> {
        self.entries
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigNode)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, ConfigNode)>>(iter: I) -> Self {
        let mut map = ConfigMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for ConfigNode {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        match self {
            ConfigNode::Scalar(value) => serializer.serialize_str(value),
            ConfigNode::Map(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for ConfigMap {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenMode {
    /// Skip unpublished groups (with their whole subtree) and elements.
    PublishedOnly,
    IncludeUnpublished,
}

impl FlattenMode {
    pub fn admits(self, published: bool) -> bool {
        published || self == FlattenMode::IncludeUnpublished
    }
}

/// Contents of a materialized group: child groups first, then elements,
/// each in creation order. The group's own flag is not consulted.
pub fn flatten(tree: &GroupTree, mode: FlattenMode) -> ConfigMap {
    let mut map = ConfigMap::new();
    for child in &tree.children {
        if mode.admits(child.group.published) {
            map.insert(child.group.name.clone(), ConfigNode::Map(flatten(child, mode)));
        }
    }
    for element in &tree.elements {
        if mode.admits(element.published) {
            map.insert(element.key.clone(), ConfigNode::Scalar(element.value.clone()));
        }
    }
    map
}

/// Document contributed by a root group: `{ root.name: flatten(root) }`, or
/// nothing when the root itself is filtered out.
pub fn root_document(tree: &GroupTree, mode: FlattenMode) -> ConfigMap {
    let mut doc = ConfigMap::new();
    if mode.admits(tree.group.published) {
        doc.insert(tree.group.name.clone(), ConfigNode::Map(flatten(tree, mode)));
    }
    doc
}

/// Merge `overlay` into `base`. Maps merge key by key; anything else is
/// replaced by the overlay's value.
pub fn deep_merge(base: &mut ConfigMap, overlay: ConfigMap) {
    for (key, incoming) in overlay.into_entries() {
        match incoming {
            ConfigNode::Map(incoming_map) => {
                if let Some(ConfigNode::Map(existing)) = base.get_mut(&key) {
                    deep_merge(existing, incoming_map);
                    continue;
                }
                base.insert(key, ConfigNode::Map(incoming_map));
            }
            scalar => base.insert(key, scalar),
        }
    }
}

/// Left fold of [`deep_merge`] over `docs`.
pub fn merge_all(docs: impl IntoIterator<Item = ConfigMap>) -> ConfigMap {
    docs.into_iter().fold(ConfigMap::new(), |mut acc, doc| {
        deep_merge(&mut acc, doc);
        acc
    })
}

/// The ids a device's configuration is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub device_id: String,
    pub model_id: String,
    pub site_id: String,
}

impl DeviceTarget {
    pub fn scope(&self, kind: ScopeKind) -> ScopeRef {
        match kind {
            ScopeKind::Model => ScopeRef::new(kind, self.model_id.clone()),
            ScopeKind::Site => ScopeRef::new(kind, self.site_id.clone()),
            ScopeKind::Device => ScopeRef::new(kind, self.device_id.clone()),
            _ => ScopeRef::global(),
        }
    }
}

impl<S: NodeStore> ConfigTree<S> {
    /// Merge every root group of the device's scopes along [`OVERRIDE_CHAIN`].
    ///
    /// Fails with no-configuration when nothing survives filtering.
    pub async fn build_device_configuration(
        &self,
        target: &DeviceTarget,
        mode: FlattenMode,
    ) -> Result<ConfigMap> {
        let mut docs = Vec::new();
        for kind in OVERRIDE_CHAIN {
            let scope = target.scope(kind);
            for root in self.list_roots(&scope).await? {
                if !mode.admits(root.published) {
                    continue;
                }
                let tree = self.materialize(&root.id).await?;
                docs.push(root_document(&tree, mode));
            }
        }

        let merged = merge_all(docs);
        if merged.is_empty() {
            return Err(TreeError::NoConfiguration(target.device_id.clone()).into());
        }
        tracing::debug!(
            "build_device_configuration: {} has {} top-level keys",
            target.device_id,
            merged.len()
        );
        Ok(merged)
    }
}
