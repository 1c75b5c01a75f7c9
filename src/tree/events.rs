use serde::Serialize;

use crate::models::{ConfigElement, ConfigGroup};

/// State change emitted by the engine after a successful store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TreeEvent {
    GroupCreated(ConfigGroup),
    GroupRenamed(ConfigGroup),
    GroupDeleted(ConfigGroup),
    GroupPublished(ConfigGroup),
    GroupUnpublished(ConfigGroup),
    ElementCreated(ConfigElement),
    ElementUpdated(ConfigElement),
    ElementRenamed(ConfigElement),
    ElementDeleted(ConfigElement),
    ElementPublished(ConfigElement),
    ElementUnpublished(ConfigElement),
}

impl TreeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TreeEvent::GroupCreated(_) => "group_created",
            TreeEvent::GroupRenamed(_) => "group_renamed",
            TreeEvent::GroupDeleted(_) => "group_deleted",
            TreeEvent::GroupPublished(_) => "group_published",
            TreeEvent::GroupUnpublished(_) => "group_unpublished",
            TreeEvent::ElementCreated(_) => "element_created",
            TreeEvent::ElementUpdated(_) => "element_updated",
            TreeEvent::ElementRenamed(_) => "element_renamed",
            TreeEvent::ElementDeleted(_) => "element_deleted",
            TreeEvent::ElementPublished(_) => "element_published",
            TreeEvent::ElementUnpublished(_) => "element_unpublished",
        }
    }

    pub(crate) fn group_publish_changed(group: ConfigGroup) -> Self {
        if group.published {
            TreeEvent::GroupPublished(group)
        } else {
            TreeEvent::GroupUnpublished(group)
        }
    }

    pub(crate) fn element_publish_changed(element: ConfigElement) -> Self {
        if element.published {
            TreeEvent::ElementPublished(element)
        } else {
            TreeEvent::ElementUnpublished(element)
        }
    }
}

/// Receives tree events. Implementations must not block.
pub trait TreeObserver: Send + Sync {
    fn on_event(&self, event: &TreeEvent);
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScopeKind, ScopeRef};

    #[test]
    fn test_event_serializes_as_type_and_payload() {
        let group = ConfigGroup::new_root(&ScopeRef::new(ScopeKind::Model, "t46u"), "account", None);
        let json = serde_json::to_value(TreeEvent::GroupCreated(group)).unwrap();
        assert_eq!(json["type"], "group_created");
        assert_eq!(json["payload"]["name"], "account");
        assert_eq!(json["payload"]["scope_kind"], "model");
    }

    #[test]
    fn test_publish_change_picks_variant() {
        let mut group = ConfigGroup::new_child("p", "1", None);
        assert_eq!(TreeEvent::group_publish_changed(group.clone()).name(), "group_unpublished");
        group.published = true;
        assert_eq!(TreeEvent::group_publish_changed(group).name(), "group_published");
    }
}
