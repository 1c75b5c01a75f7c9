use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use super::store::{ElementFilter, GroupFilter, NodeStore};
use super::{ConfigTree, TreeError};
use crate::models::{ConfigElement, ConfigGroup};

/// A group with all of its descendants loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTree {
    pub group: ConfigGroup,
    pub elements: Vec<ConfigElement>,
    pub children: Vec<GroupTree>,
}

impl GroupTree {
    /// Direct child subtree by group name.
    pub fn child(&self, name: &str) -> Option<&GroupTree> {
        self.children.iter().find(|c| c.group.name == name)
    }
}

struct Pending {
    group: ConfigGroup,
    elements: Vec<ConfigElement>,
    parent: Option<usize>,
    depth: usize,
}

impl<S: NodeStore> ConfigTree<S> {
    /// Load `root_group_id` and every descendant group and element.
    ///
    /// Groups are visited breadth-first into a flat arena, then folded back
    /// into a tree. Revisiting a group fails with cycle-detected; nesting past
    /// `max_depth` fails with depth-limit.
    pub async fn materialize(&self, root_group_id: &str) -> Result<GroupTree> {
        let root = self.get_group(root_group_id).await?;
        let mut visited = HashSet::from([root.id.clone()]);
        let mut arena = vec![Pending {
            group: root,
            elements: Vec::new(),
            parent: None,
            depth: 0,
        }];

        let mut cursor = 0;
        while cursor < arena.len() {
            let group_id = arena[cursor].group.id.clone();
            let depth = arena[cursor].depth;

            arena[cursor].elements = self
                .store
                .find_elements(&ElementFilter::in_group(&group_id))
                .await?;
            let children = self
                .store
                .find_groups(&GroupFilter::children_of(&group_id))
                .await?;
            if !children.is_empty() && depth >= self.max_depth {
                return Err(TreeError::DepthLimit(self.max_depth).into());
            }
            for child in children {
                if !visited.insert(child.id.clone()) {
                    return Err(TreeError::CycleDetected(child.id).into());
                }
                arena.push(Pending {
                    group: child,
                    elements: Vec::new(),
                    parent: Some(cursor),
                    depth: depth + 1,
                });
            }
            cursor += 1;
        }

        tracing::debug!("materialize: {} loaded {} groups", root_group_id, arena.len());

        // Children always sit after their parent, so folding from the back
        // completes every subtree before its parent is taken.
        let mut children: Vec<Vec<GroupTree>> = arena.iter().map(|_| Vec::new()).collect();
        let mut root = None;
        while let Some(pending) = arena.pop() {
            let mut own = std::mem::take(&mut children[arena.len()]);
            own.reverse();
            let tree = GroupTree {
                group: pending.group,
                elements: pending.elements,
                children: own,
            };
            match pending.parent {
                Some(parent) => children[parent].push(tree),
                None => root = Some(tree),
            }
        }

        root.ok_or_else(|| TreeError::not_found("group", root_group_id).into())
    }
}
