//! Forwarding sessions: how a screen handler lends its input to a task.
//!
//! While a session is open the handler is the only producer and the task
//! is the only consumer of a fresh channel. The receiving end exists before
//! the first event is forwarded, so nothing sent during start-up is lost.
//! Closing happens under the same lock the producer sends under; whatever
//! the task did not consume is handed back to the handler in order. New
//! input queues behind handed-back input until all of it has been replayed.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::event::Notifier;
use crate::keymap::InputEvent;
use crate::registry::{ViewMode, WidgetRegistry};
use crate::widget::pager::Pager;
use crate::widget::{EventSource, Widget};

#[derive(Default)]
struct ForwardState {
    tx: Option<Sender<InputEvent>>,
    returned: VecDeque<InputEvent>,
}

impl ForwardState {
    fn send(&mut self, event: InputEvent) -> Result<(), InputEvent> {
        let Some(tx) = &self.tx else {
            return Err(event);
        };
        match tx.send(event) {
            Ok(()) => Ok(()),
            Err(SendError(event)) => {
                // Consumer vanished without closing; stop forwarding.
                self.tx = None;
                Err(event)
            }
        }
    }
}

/// What [`Forwarder::forward`] did with an event.
#[derive(Debug, PartialEq, Eq)]
pub enum Forwarded {
    /// The open session received it.
    Sent,
    /// Parked behind input a closed session handed back.
    Queued,
    /// Nobody owns the input; the handler interprets it now.
    Interpret(InputEvent),
}

/// The `forwarding` flag of a screen handler together with its channel.
#[derive(Clone, Default)]
pub struct Forwarder {
    state: Arc<Mutex<ForwardState>>,
}

impl Forwarder {
    fn state(&self) -> MutexGuard<'_, ForwardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_forwarding(&self) -> bool {
        self.state().tx.is_some()
    }

    /// Starts forwarding and returns the consuming end, or `None` if a
    /// session is already open.
    pub fn open(&self) -> Option<Receiver<InputEvent>> {
        let mut state = self.state();
        if state.tx.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::channel();
        state.tx = Some(tx);
        Some(rx)
    }

    /// Decides under the lock whether `event` goes to the session, waits
    /// behind returned input, or is interpreted right away.
    pub fn forward(&self, event: InputEvent) -> Forwarded {
        let mut state = self.state();
        if !state.returned.is_empty() {
            state.returned.push_back(event);
            return Forwarded::Queued;
        }
        match state.send(event) {
            Ok(()) => Forwarded::Sent,
            Err(event) => Forwarded::Interpret(event),
        }
    }

    /// Stops forwarding. Events still queued in `rx` go in front of the
    /// returned queue.
    pub fn close(&self, rx: &Receiver<InputEvent>) {
        let mut state = self.state();
        state.tx = None;
        let mut returned: VecDeque<InputEvent> = rx.try_iter().collect();
        returned.append(&mut state.returned);
        state.returned = returned;
    }

    /// Oldest returned event that nobody owns. Returned events are sent
    /// to a session that opened in the meantime instead.
    pub fn next_returned(&self) -> Option<InputEvent> {
        let mut state = self.state();
        while let Some(event) = state.returned.pop_front() {
            if let Err(event) = state.send(event) {
                return Some(event);
            }
        }
        None
    }
}

enum Owner {
    Modal {
        registry: Arc<WidgetRegistry>,
        widget: Arc<dyn Widget>,
    },
    Viewer {
        view: ViewMode,
        pager: Arc<Pager>,
    },
}

/// Scoped ownership of a handler's input by a modal or viewer task.
///
/// Dropping the session releases everything, also when the task unwinds:
/// the modal is unregistered, forwarding stops, a closed viewer is reported
/// to the dispatch loop, and a redraw is requested.
pub struct Session {
    forwarder: Forwarder,
    source: EventSource,
    owner: Owner,
    notifier: Notifier,
}

impl Session {
    pub fn modal(
        forwarder: Forwarder,
        rx: Receiver<InputEvent>,
        registry: Arc<WidgetRegistry>,
        widget: Arc<dyn Widget>,
        notifier: Notifier,
    ) -> Self {
        Self::new(forwarder, rx, Owner::Modal { registry, widget }, notifier)
    }

    pub fn viewer(
        forwarder: Forwarder,
        rx: Receiver<InputEvent>,
        view: ViewMode,
        pager: Arc<Pager>,
        notifier: Notifier,
    ) -> Self {
        Self::new(forwarder, rx, Owner::Viewer { view, pager }, notifier)
    }

    fn new(forwarder: Forwarder, rx: Receiver<InputEvent>, owner: Owner, notifier: Notifier) -> Self {
        let redraw = notifier.clone();
        Self {
            forwarder,
            source: EventSource::new(rx, move |_| redraw.refresh()),
            owner,
            notifier,
        }
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("input owner panicked, releasing its session");
        }
        if let Owner::Modal { registry, widget } = &self.owner {
            if let Err(err) = registry.remove(widget.as_ref()) {
                tracing::warn!(error = %err, "modal cleanup failed");
                self.notifier.appmessage(err.to_string());
            }
        }
        self.forwarder.close(self.source.receiver());
        tracing::debug!("forwarding session closed");
        if let Owner::Viewer { view, pager } = &self.owner {
            pager.close();
            self.notifier.viewer_closed(*view);
        }
        self.notifier.refresh();
    }
}
