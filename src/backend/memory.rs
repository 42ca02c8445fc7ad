use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendError, Document, Entity, EntityKind, LogStream};

const DEMO_FIXTURE: &str = include_str!("../../assets/demo.json");

/// Calls kept by the recorder; older ones are dropped.
const CALL_LOG_LIMIT: usize = 256;

/// Seed data for [`InMemoryBackend`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub entities: Vec<Entity>,
    /// Inspect documents by entity id; entities without one inspect as themselves.
    #[serde(default)]
    pub documents: HashMap<String, Document>,
    #[serde(default)]
    pub history: HashMap<String, Document>,
    #[serde(default)]
    pub logs: HashMap<String, Vec<String>>,
}

/// Backend operation, used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Remove,
    RemoveDangling,
    Scale,
    Inspect,
    History,
    ById,
    Run,
    Logs,
}

/// A recorded backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    List(EntityKind),
    Remove { id: String, force: bool },
    RemoveDangling,
    Scale { id: String, replicas: u64 },
    Inspect(String),
    History(String),
    ById(String),
    Run { id: String, args: String },
    Logs(String),
}

/// Backend that keeps its entities in memory.
///
/// Serves the bundled demo data when no daemon is configured and doubles as
/// the recording backend in tests.
pub struct InMemoryBackend {
    fixture: Mutex<Fixture>,
    calls: Mutex<VecDeque<Call>>,
    failures: Mutex<HashMap<Op, String>>,
    next_run: Mutex<u32>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryBackend {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: Mutex::new(fixture),
            calls: Mutex::new(VecDeque::new()),
            failures: Mutex::new(HashMap::new()),
            next_run: Mutex::new(1),
        }
    }

    pub fn demo() -> Result<Self> {
        Ok(Self::new(serde_json::from_str(DEMO_FIXTURE)?))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&content)?))
    }

    /// Makes every later call of `op` fail with `reason`.
    pub fn fail(&self, op: Op, reason: &str) {
        lock(&self.failures).insert(op, reason.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// The most recent calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).iter().cloned().collect()
    }

    pub fn entity_ids(&self, kind: EntityKind) -> Vec<String> {
        lock(&self.fixture)
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id.clone())
            .collect()
    }

    fn record(&self, op: Op, call: Call) -> Result<(), BackendError> {
        {
            let mut calls = lock(&self.calls);
            if calls.len() == CALL_LOG_LIMIT {
                calls.pop_front();
            }
            calls.push_back(call);
        }
        match lock(&self.failures).get(&op) {
            Some(reason) => Err(BackendError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }

    fn find(&self, id: &str) -> Result<Entity, BackendError> {
        lock(&self.fixture)
            .entities
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

impl Backend for InMemoryBackend {
    fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>, BackendError> {
        self.record(Op::List, Call::List(kind))?;
        Ok(lock(&self.fixture)
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    fn remove_entity(&self, id: &str, force: bool) -> Result<(), BackendError> {
        self.record(
            Op::Remove,
            Call::Remove {
                id: id.to_string(),
                force,
            },
        )?;
        let mut fixture = lock(&self.fixture);
        let pos = fixture
            .entities
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        let entity = &fixture.entities[pos];
        if entity.kind == EntityKind::Container && entity.status == "running" && !force {
            return Err(BackendError::Rejected(format!(
                "{} {} is running, force removal required",
                entity.kind, entity.id
            )));
        }
        fixture.entities.remove(pos);
        Ok(())
    }

    fn remove_dangling_images(&self) -> Result<(), BackendError> {
        self.record(Op::RemoveDangling, Call::RemoveDangling)?;
        lock(&self.fixture)
            .entities
            .retain(|e| !(e.kind == EntityKind::Image && e.name == "<none>"));
        Ok(())
    }

    fn scale_entity(&self, id: &str, replicas: u64) -> Result<(), BackendError> {
        self.record(
            Op::Scale,
            Call::Scale {
                id: id.to_string(),
                replicas,
            },
        )?;
        let mut fixture = lock(&self.fixture);
        let entity = fixture
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        if entity.kind != EntityKind::Service {
            return Err(BackendError::Unsupported {
                op: "scale",
                kind: entity.kind,
                id: id.to_string(),
            });
        }
        entity.detail = format!("{replicas} replicas");
        Ok(())
    }

    fn inspect_entity(&self, id: &str) -> Result<Document, BackendError> {
        self.record(Op::Inspect, Call::Inspect(id.to_string()))?;
        let entity = self.find(id)?;
        if let Some(doc) = lock(&self.fixture).documents.get(id) {
            return Ok(doc.clone());
        }
        serde_json::to_value(&entity).map_err(|e| BackendError::Rejected(e.to_string()))
    }

    fn entity_history(&self, id: &str) -> Result<Document, BackendError> {
        self.record(Op::History, Call::History(id.to_string()))?;
        let entity = self.find(id)?;
        if entity.kind != EntityKind::Image {
            return Err(BackendError::Unsupported {
                op: "history",
                kind: entity.kind,
                id: id.to_string(),
            });
        }
        Ok(lock(&self.fixture)
            .history
            .get(id)
            .cloned()
            .unwrap_or_else(|| Document::Array(Vec::new())))
    }

    fn entity_by_id(&self, id: &str) -> Result<Entity, BackendError> {
        self.record(Op::ById, Call::ById(id.to_string()))?;
        self.find(id)
    }

    fn run_entity(&self, entity: &Entity, args: &str) -> Result<(), BackendError> {
        self.record(
            Op::Run,
            Call::Run {
                id: entity.id.clone(),
                args: args.to_string(),
            },
        )?;
        if entity.kind != EntityKind::Image {
            return Err(BackendError::Unsupported {
                op: "run",
                kind: entity.kind,
                id: entity.id.clone(),
            });
        }
        let n = {
            let mut next = lock(&self.next_run);
            let n = *next;
            *next += 1;
            n
        };
        lock(&self.fixture).entities.push(Entity {
            id: format!("run{n:04}"),
            kind: EntityKind::Container,
            name: format!("{}-{n}", entity.name.replace([':', '/'], "-")),
            status: "running".to_string(),
            detail: entity.name.clone(),
            command: args.to_string(),
        });
        Ok(())
    }

    fn stream_logs(&self, id: &str) -> Result<LogStream, BackendError> {
        self.record(Op::Logs, Call::Logs(id.to_string()))?;
        self.find(id)?;
        let lines = lock(&self.fixture).logs.get(id).cloned().unwrap_or_default();
        Ok(Box::new(lines.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, kind: EntityKind, name: &str, status: &str) -> Entity {
        Entity {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            status: status.to_string(),
            detail: String::new(),
            command: String::new(),
        }
    }

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(Fixture {
            entities: vec![
                entity("c1", EntityKind::Container, "web", "running"),
                entity("c2", EntityKind::Container, "batch", "exited"),
                entity("i1", EntityKind::Image, "nginx:latest", ""),
                entity("i2", EntityKind::Image, "<none>", ""),
                entity("s1", EntityKind::Service, "api", ""),
            ],
            ..Fixture::default()
        })
    }

    #[test]
    fn demo_fixture_parses() {
        let backend = InMemoryBackend::demo().unwrap();
        for kind in [
            EntityKind::Container,
            EntityKind::Image,
            EntityKind::Network,
            EntityKind::Service,
        ] {
            assert!(!backend.list_entities(kind).unwrap().is_empty(), "{kind}");
        }
    }

    #[test]
    fn remove_running_requires_force() {
        let backend = backend();
        assert!(backend.remove_entity("c1", false).is_err());
        backend.remove_entity("c1", true).unwrap();
        backend.remove_entity("c2", false).unwrap();
        assert!(backend.entity_ids(EntityKind::Container).is_empty());
    }

    #[test]
    fn remove_drops_only_the_resolved_entity() {
        let backend = InMemoryBackend::new(Fixture {
            entities: vec![
                entity("abc123", EntityKind::Network, "backend", ""),
                entity("abc123", EntityKind::Service, "checkout", ""),
            ],
            ..Fixture::default()
        });
        backend.remove_entity("abc123", false).unwrap();
        assert!(backend.entity_ids(EntityKind::Network).is_empty());
        assert_eq!(backend.entity_ids(EntityKind::Service), vec!["abc123"]);
    }

    #[test]
    fn call_log_keeps_only_recent_calls() {
        let backend = backend();
        for n in 0..CALL_LOG_LIMIT + 44 {
            let _ = backend.entity_by_id(&format!("x{n}"));
        }
        let calls = backend.calls();
        assert_eq!(calls.len(), CALL_LOG_LIMIT);
        assert_eq!(calls[0], Call::ById("x44".to_string()));
        assert_eq!(
            calls.last(),
            Some(&Call::ById(format!("x{}", CALL_LOG_LIMIT + 43)))
        );
    }

    #[test]
    fn remove_dangling_keeps_tagged_images() {
        let backend = backend();
        backend.remove_dangling_images().unwrap();
        assert_eq!(backend.entity_ids(EntityKind::Image), vec!["i1"]);
    }

    #[test]
    fn scale_only_applies_to_services() {
        let backend = backend();
        backend.scale_entity("s1", 4).unwrap();
        assert_eq!(backend.entity_by_id("s1").unwrap().detail, "4 replicas");
        assert!(matches!(
            backend.scale_entity("c2", 2),
            Err(BackendError::Unsupported { op: "scale", .. })
        ));
    }

    #[test]
    fn run_image_creates_container() {
        let backend = backend();
        let image = backend.entity_by_id("i1").unwrap();
        backend.run_entity(&image, "nginx -g daemon off;").unwrap();
        let containers = backend.list_entities(EntityKind::Container).unwrap();
        let created = containers.iter().find(|c| c.id == "run0001").unwrap();
        assert_eq!(created.name, "nginx-latest-1");
        assert_eq!(created.command, "nginx -g daemon off;");
    }

    #[test]
    fn injected_failure_is_recorded_and_returned() {
        let backend = backend();
        backend.fail(Op::Remove, "daemon unavailable");
        let err = backend.remove_entity("c2", false).unwrap_err();
        assert_eq!(err.to_string(), "daemon unavailable");
        assert_eq!(
            backend.calls(),
            vec![Call::Remove {
                id: "c2".to_string(),
                force: false
            }]
        );
        backend.clear_failures();
        backend.remove_entity("c2", false).unwrap();
    }

    #[test]
    fn inspect_falls_back_to_entity_json() {
        let backend = backend();
        let doc = backend.inspect_entity("s1").unwrap();
        assert_eq!(doc["name"], "api");
        assert!(matches!(
            backend.inspect_entity("nope"),
            Err(BackendError::NotFound(_))
        ));
    }
}
