//! Screen elements and the capabilities the input router relies on.
//!
//! Every widget has a name and a mount/unmount lifecycle. List widgets add
//! [`ActionableWidget`]; transient overlays add [`ModalWidget`] and take over
//! the input stream until they produce an [`Interaction`].

pub mod entity_list;
pub mod line_input;
pub mod pager;
pub mod prompt;

use std::sync::mpsc::Receiver;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use thiserror::Error;

use crate::backend::BackendError;
use crate::keymap::InputEvent;
use crate::ui::theme::Theme;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("{0} is already mounted")]
    AlreadyMounted(String),
    #[error("{0} is not mounted")]
    NotMounted(String),
    #[error("could not load {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no entity selected")]
    NoSelection,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub trait Widget: Send + Sync {
    fn name(&self) -> &str;
    fn mount(&self) -> Result<(), WidgetError>;
    fn unmount(&self) -> Result<(), WidgetError>;
    fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme);
}

/// A widget with a current selection that callers can act upon.
pub trait ActionableWidget: Widget {
    /// Runs `action` with the id of the selected entity.
    ///
    /// The widget's own state is not locked while `action` runs, so the
    /// action may call back into the widget.
    fn on_event(
        &self,
        action: &mut dyn FnMut(&str) -> Result<(), ActionError>,
    ) -> Result<(), ActionError>;
}

/// A transient widget that owns the input stream while it runs.
pub trait ModalWidget: Widget {
    /// Blocks, consuming events from `events`, until the user submits or aborts.
    fn run_interaction(&self, events: &EventSource) -> Interaction;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    pub result: String,
    pub canceled: bool,
}

impl Interaction {
    pub fn submitted(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            canceled: false,
        }
    }

    pub fn canceled() -> Self {
        Self {
            result: String::new(),
            canceled: true,
        }
    }
}

/// The forwarded input stream as seen by a modal or viewer task.
pub struct EventSource {
    events: Receiver<InputEvent>,
    on_handled: Box<dyn Fn(&InputEvent) + Send>,
}

impl EventSource {
    pub fn new(
        events: Receiver<InputEvent>,
        on_handled: impl Fn(&InputEvent) + Send + 'static,
    ) -> Self {
        Self {
            events,
            on_handled: Box::new(on_handled),
        }
    }

    /// Next forwarded event, or `None` once the producer is gone.
    pub fn next(&self) -> Option<InputEvent> {
        self.events.recv().ok()
    }

    /// Reports that `event` was consumed, typically to request a redraw.
    pub fn handled(&self, event: &InputEvent) {
        (self.on_handled)(event);
    }

    pub(crate) fn receiver(&self) -> &Receiver<InputEvent> {
        &self.events
    }
}
