//! Event metadata consumed by the generators.
//!
//! The transport layer owns connections, rooms and handler dispatch. The generators only
//! need to know which events exist in which namespace, which way their data flows and
//! what their argument schemas look like.

use crate::schema::SchemaNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which side of the wire produced the data being depicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Data received and validated by the server (client actions).
    In,
    /// Data produced by the server (emissions, action acknowledgements).
    Out,
}

impl Direction {
    /// The opposite direction, used for acknowledgement callbacks.
    pub fn flip(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }

    /// Whether the depicted data is produced output rather than validated input.
    pub fn is_output(self) -> bool {
        self == Direction::Out
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "input"),
            Direction::Out => write!(f, "output"),
        }
    }
}

/// A single event of a namespace.
#[derive(Debug, Clone)]
pub struct EventInfo {
    /// Event name as sent over the wire
    pub name: String,
    /// In for client actions, Out for server emissions
    pub direction: Direction,
    /// Argument tuple of the event
    pub payload: SchemaNode,
    /// Argument tuple of the acknowledgement, when the event expects one
    pub ack: Option<SchemaNode>,
    /// Example argument lists
    pub examples: Vec<Value>,
    /// Human readable description
    pub description: Option<String>,
}

impl EventInfo {
    pub fn new(name: impl Into<String>, direction: Direction, payload: SchemaNode) -> Self {
        Self {
            name: name.into(),
            direction,
            payload,
            ack: None,
            examples: Vec::new(),
            description: None,
        }
    }

    pub fn with_ack(mut self, ack: SchemaNode) -> Self {
        self.ack = Some(ack);
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.examples.push(example);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A namespace and the events it declares.
#[derive(Debug, Clone)]
pub struct Namespace {
    /// Namespace path, `/` for the root namespace
    pub path: String,
    /// Names of security schemes required to connect
    pub security: Vec<String>,
    pub events: Vec<EventInfo>,
}

impl Namespace {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            security: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: EventInfo) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_security(mut self, scheme: impl Into<String>) -> Self {
        self.security.push(scheme.into());
        self
    }

    /// Events flowing in the given direction, in declaration order
    pub fn events_in(&self, direction: Direction) -> impl Iterator<Item = &EventInfo> {
        self.events.iter().filter(move |e| e.direction == direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_is_involution() {
        assert_eq!(Direction::In.flip(), Direction::Out);
        assert_eq!(Direction::Out.flip().flip(), Direction::Out);
    }

    #[test]
    fn test_events_in_direction() {
        let ns = Namespace::new("/")
            .with_event(EventInfo::new("ping", Direction::In, SchemaNode::tuple(vec![])))
            .with_event(EventInfo::new("time", Direction::Out, SchemaNode::tuple(vec![])))
            .with_event(EventInfo::new("chat", Direction::In, SchemaNode::tuple(vec![])));

        let names: Vec<_> = ns.events_in(Direction::In).map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "chat"]);
    }
}
