use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

use crate::registry::ViewMode;

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Resize(#[allow(dead_code)] u16, #[allow(dead_code)] u16),
    /// Something changed and the dashboard should be redrawn.
    Refresh,
    /// A user-visible status or error line.
    Message(String),
    /// The full-screen viewer started from this view has finished.
    ViewerClosed(ViewMode),
}

pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            if input_tx.send(AppEvent::Key(key)).is_err() {
                                return;
                            }
                        }
                        Ok(Event::Resize(w, h)) => {
                            if input_tx.send(AppEvent::Resize(w, h)).is_err() {
                                return;
                            }
                        }
                        _ => {}
                    }
                } else if input_tx.send(AppEvent::Tick).is_err() {
                    return;
                }
            }
        });

        Self { rx, tx }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.tx.clone())
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

/// Handle for the refresh trigger and the `appmessage` sink.
///
/// Cheap to clone; every spawned modal or viewer task carries its own copy.
/// Sends never fail loudly: once the dispatch loop is gone nobody is left to
/// redraw or read messages.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<AppEvent>,
}

impl Notifier {
    pub fn new(tx: mpsc::Sender<AppEvent>) -> Self {
        Self { tx }
    }

    pub fn refresh(&self) {
        let _ = self.tx.send(AppEvent::Refresh);
    }

    pub fn appmessage(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(message = %text, "app message");
        let _ = self.tx.send(AppEvent::Message(text));
    }

    pub fn viewer_closed(&self, view: ViewMode) {
        let _ = self.tx.send(AppEvent::ViewerClosed(view));
    }
}
