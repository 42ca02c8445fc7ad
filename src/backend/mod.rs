pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload returned by inspect/history calls.
pub type Document = serde_json::Value;

/// Lines of log output; may block between items while the entity is running.
/// A consumer stuck in `next` stays there until the next line or the end of
/// the stream, so implementations should end the stream when the entity stops.
pub type LogStream = Box<dyn Iterator<Item = String> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Container,
    Image,
    Network,
    Service,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Container => "container",
            EntityKind::Image => "image",
            EntityKind::Network => "network",
            EntityKind::Service => "service",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Kind-specific summary column (image tag, driver, replica count).
    #[serde(default)]
    pub detail: String,
    /// Default command for images; the prefilled text of the run prompt.
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no such entity: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{op} is not supported for {kind} {id}")]
    Unsupported {
        op: &'static str,
        kind: EntityKind,
        id: String,
    },
}

/// Operations the dashboard asks of the orchestration backend.
///
/// Every call may fail; callers turn failures into user-visible messages.
pub trait Backend: Send + Sync {
    fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>, BackendError>;
    fn remove_entity(&self, id: &str, force: bool) -> Result<(), BackendError>;
    fn remove_dangling_images(&self) -> Result<(), BackendError>;
    fn scale_entity(&self, id: &str, replicas: u64) -> Result<(), BackendError>;
    fn inspect_entity(&self, id: &str) -> Result<Document, BackendError>;
    fn entity_history(&self, id: &str) -> Result<Document, BackendError>;
    fn entity_by_id(&self, id: &str) -> Result<Entity, BackendError>;
    fn run_entity(&self, entity: &Entity, args: &str) -> Result<(), BackendError>;
    fn stream_logs(&self, id: &str) -> Result<LogStream, BackendError>;
}
