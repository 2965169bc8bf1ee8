//! Change notification.
//!
//! Every committed mutation is reported to a [`ChangeSink`] synchronously,
//! in the calling thread, after the tree edit is complete. No-op calls
//! (idempotent adds, silent removals) report nothing. A sink that fails
//! aborts the calling operation with [`Error::Subscriber`](crate::Error).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::{NodeId, XmlDom};

/// Error type returned by sinks.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Add,
    Update,
    Delete,
    DeleteAll,
    Set,
}

/// Identity snapshot of the link element a change touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl NodeInfo {
    /// Read `uuid`, `title`, `rel` and `type` from an element.
    pub fn from_element(dom: &XmlDom, id: NodeId) -> Self {
        let attr = |name: &str| dom.attr(id, name).map(str::to_string);
        Self {
            uuid: attr("uuid"),
            title: attr("title"),
            rel: attr("rel"),
            node_type: attr("type"),
        }
    }
}

/// A single committed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub entity_type: String,
    pub action: Action,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeInfo>,
}

impl Change {
    pub fn new(entity_type: impl Into<String>, action: Action, data: Value) -> Self {
        Self {
            entity_type: entity_type.into(),
            action,
            data,
            node: None,
        }
    }

    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.node = Some(node);
        self
    }
}

/// A change together with the actor that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub actor: String,
    #[serde(flatten)]
    pub change: Change,
}

/// Receiver of change notifications.
pub trait ChangeSink {
    fn notify(&mut self, actor: &str, change: &Change) -> Result<(), SinkError>;
}

impl<F> ChangeSink for F
where
    F: FnMut(&str, &Change) -> Result<(), SinkError>,
{
    fn notify(&mut self, actor: &str, change: &Change) -> Result<(), SinkError> {
        self(actor, change)
    }
}

/// Sink that records every event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ChangeEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events for one entity type, in order.
    pub fn for_entity<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a ChangeEvent> {
        self.events
            .iter()
            .filter(move |e| e.change.entity_type == entity_type)
    }

    /// Drain the log, returning what was recorded so far.
    pub fn take(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ChangeSink for EventLog {
    fn notify(&mut self, actor: &str, change: &Change) -> Result<(), SinkError> {
        self.events.push(ChangeEvent {
            actor: actor.to_string(),
            change: change.clone(),
        });
        Ok(())
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn notify(&mut self, _actor: &str, _change: &Change) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_event_json_shape() {
        let event = ChangeEvent {
            actor: "ximtags".into(),
            change: Change::new("link", Action::DeleteAll, json!("x-im/story")).with_node(NodeInfo {
                uuid: Some("u1".into()),
                node_type: Some("x-im/story".into()),
                ..NodeInfo::default()
            }),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "actor": "ximtags",
                "entityType": "link",
                "action": "delete-all",
                "data": "x-im/story",
                "node": {"uuid": "u1", "type": "x-im/story"}
            })
        );
    }

    #[test]
    fn test_closure_sink_can_fail() {
        let mut seen = Vec::new();
        let mut sink = |actor: &str, change: &Change| -> Result<(), SinkError> {
            seen.push(format!("{actor}:{}", change.entity_type));
            Err("subscriber offline".into())
        };

        let change = Change::new("author", Action::Add, Value::Null);
        assert!(sink.notify("byline", &change).is_err());
        assert_eq!(seen, vec!["byline:author"]);
    }

    #[test]
    fn test_event_log_records_in_order() {
        let mut log = EventLog::new();
        log.notify("a", &Change::new("tag", Action::Add, Value::Null)).unwrap();
        log.notify("b", &Change::new("author", Action::Delete, Value::Null)).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.for_entity("author").count(), 1);
        let drained = log.take();
        assert_eq!(drained[0].actor, "a");
        assert!(log.is_empty());
    }
}
