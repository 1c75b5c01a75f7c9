use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use super::store::{ElementFilter, GroupFilter, NodeStore};
use crate::models::{ConfigElement, ConfigGroup};

/// In-process `NodeStore` used by the engine tests.
#[derive(Default)]
pub struct MemoryNodeStore {
    groups: Mutex<Vec<ConfigGroup>>,
    elements: Mutex<Vec<ConfigElement>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a group without going through the engine's checks.
    pub fn insert_group(&self, group: ConfigGroup) {
        self.groups.lock().unwrap().push(group);
    }
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn find_group(&self, filter: &GroupFilter) -> Result<Option<ConfigGroup>> {
        let groups = self.groups.lock().unwrap();
        Ok(groups.iter().find(|g| filter.matches(g)).cloned())
    }

    async fn find_groups(&self, filter: &GroupFilter) -> Result<Vec<ConfigGroup>> {
        let groups = self.groups.lock().unwrap();
        Ok(groups.iter().filter(|g| filter.matches(g)).cloned().collect())
    }

    async fn save_group(&self, group: &ConfigGroup) -> Result<ConfigGroup> {
        let mut groups = self.groups.lock().unwrap();
        upsert(&mut groups, group, |g| g.id == group.id);
        Ok(group.clone())
    }

    async fn delete_group(&self, id: &str) -> Result<()> {
        self.groups.lock().unwrap().retain(|g| g.id != id);
        Ok(())
    }

    async fn find_element(&self, filter: &ElementFilter) -> Result<Option<ConfigElement>> {
        let elements = self.elements.lock().unwrap();
        Ok(elements.iter().find(|e| filter.matches(e)).cloned())
    }

    async fn find_elements(&self, filter: &ElementFilter) -> Result<Vec<ConfigElement>> {
        let elements = self.elements.lock().unwrap();
        Ok(elements.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn save_element(&self, element: &ConfigElement) -> Result<ConfigElement> {
        let mut elements = self.elements.lock().unwrap();
        upsert(&mut elements, element, |e| e.id == element.id);
        Ok(element.clone())
    }

    async fn delete_element(&self, id: &str) -> Result<()> {
        self.elements.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }
}
