use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Backend, EntityKind};
use crate::widget::entity_list::EntityList;
use crate::widget::{Widget, WidgetError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Containers,
    Images,
    Networks,
    Services,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Containers,
        ViewMode::Images,
        ViewMode::Networks,
        ViewMode::Services,
    ];

    pub fn kind(self) -> EntityKind {
        match self {
            ViewMode::Containers => EntityKind::Container,
            ViewMode::Images => EntityKind::Image,
            ViewMode::Networks => EntityKind::Network,
            ViewMode::Services => EntityKind::Service,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Containers => "Containers",
            ViewMode::Images => "Images",
            ViewMode::Networks => "Networks",
            ViewMode::Services => "Services",
        }
    }

    /// View bound to the number keys `1`-`4`.
    pub fn from_digit(ch: char) -> Option<Self> {
        let index = ch.to_digit(10)?.checked_sub(1)?;
        Self::ALL.get(index as usize).copied()
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Containers => "containers",
            ViewMode::Images => "images",
            ViewMode::Networks => "networks",
            ViewMode::Services => "services",
        })
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|view| view.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown view: {s}"))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a widget named {0} is already registered")]
    NameInUse(String),
    #[error("failed to mount {name}: {source}")]
    Mount {
        name: String,
        #[source]
        source: WidgetError,
    },
    #[error("failed to unmount {name}: {source}")]
    Unmount {
        name: String,
        #[source]
        source: WidgetError,
    },
}

/// Holds two sets of widgets:
/// * one persistent list per view, created up front and reused;
/// * the ephemeral widgets mounted right now, rendered on top of the view.
pub struct WidgetRegistry {
    lists: BTreeMap<ViewMode, Arc<EntityList>>,
    active: Mutex<HashMap<String, Arc<dyn Widget>>>,
}

impl WidgetRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let lists = ViewMode::ALL
            .iter()
            .map(|view| (*view, Arc::new(EntityList::new(view.kind(), backend.clone()))))
            .collect();
        Self {
            lists,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Widget>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn widget_for_view(&self, view: ViewMode) -> Arc<EntityList> {
        // Every view gets a list in `new`.
        self.lists[&view].clone()
    }

    /// Mounts `widget` and makes it active. The lock is held across the
    /// mount so concurrent adds under one name cannot both succeed.
    pub fn add(&self, widget: Arc<dyn Widget>) -> Result<(), RegistryError> {
        let mut active = self.active();
        let name = widget.name().to_string();
        if active.contains_key(&name) {
            return Err(RegistryError::NameInUse(name));
        }
        widget
            .mount()
            .map_err(|source| RegistryError::Mount {
                name: name.clone(),
                source,
            })?;
        tracing::debug!(widget = %name, "registered");
        active.insert(name, widget);
        Ok(())
    }

    /// Unmounts `widget` and drops it from the active set. A widget whose
    /// unmount fails stays registered.
    pub fn remove(&self, widget: &dyn Widget) -> Result<(), RegistryError> {
        let mut active = self.active();
        let name = widget.name().to_string();
        widget
            .unmount()
            .map_err(|source| RegistryError::Unmount {
                name: name.clone(),
                source,
            })?;
        tracing::debug!(widget = %name, "unregistered");
        active.remove(&name);
        Ok(())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active().contains_key(name)
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    /// Active widgets ordered by name, for rendering.
    pub fn active_widgets(&self) -> Vec<Arc<dyn Widget>> {
        let mut widgets: Vec<_> = self.active().values().cloned().collect();
        widgets.sort_by(|a, b| a.name().cmp(b.name()));
        widgets
    }
}
