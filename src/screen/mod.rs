//! Per-view keyboard handling.
//!
//! A [`ScreenHandler`] interprets the events of one dashboard view. It either
//! acts on them, hands them back to the dispatcher, or, while a modal or
//! viewer task owns the input, forwards every event to that task untouched.

mod containers;
mod images;
mod networks;
mod services;
pub mod session;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::backend::{Backend, LogStream};
use crate::event::Notifier;
use crate::keymap::{InputEvent, Signal};
use crate::registry::{ViewMode, WidgetRegistry};
use crate::widget::entity_list::EntityList;
use crate::widget::pager::Pager;
use crate::widget::prompt::Prompt;
use crate::widget::{ActionError, ActionableWidget, Interaction, ModalWidget, Widget};

use session::{Forwarded, Forwarder, Session};

/// What the background tasks of a handler need to reach the rest of the app.
#[derive(Clone)]
pub struct ScreenContext {
    pub backend: Arc<dyn Backend>,
    pub registry: Arc<WidgetRegistry>,
    pub notifier: Notifier,
}

impl ScreenContext {
    pub fn new(backend: Arc<dyn Backend>, registry: Arc<WidgetRegistry>, notifier: Notifier) -> Self {
        Self {
            backend,
            registry,
            notifier,
        }
    }

    /// Runs `action` against the selected entity of `view`. Failures are
    /// reported as `"{context}: {error}"`; returns whether the action ran
    /// and succeeded.
    pub fn on_selected(
        &self,
        view: ViewMode,
        context: &str,
        mut action: impl FnMut(&str) -> Result<(), ActionError>,
    ) -> bool {
        match self.registry.widget_for_view(view).on_event(&mut action) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%view, error = %err, "{context}");
                self.notifier.appmessage(format!("{context}: {err}"));
                false
            }
        }
    }

    /// Reloads the rows of `view` after the backend state changed.
    pub fn reload(&self, view: ViewMode) {
        if let Err(err) = self.registry.widget_for_view(view).mount() {
            tracing::warn!(%view, error = %err, "reload failed");
            self.notifier.appmessage(err.to_string());
        }
    }
}

/// Result of a view's command table for one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command of this view.
    Unhandled,
    /// Handled; the handler stays in charge of the screen.
    KeepFocus,
    /// Handled; something else now draws the whole screen.
    ReleaseFocus,
}

/// What [`ScreenHandler::handle`] did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handled {
    Consumed,
    /// Pass on to the next handler in the chain.
    Delegated(InputEvent),
}

pub struct ScreenHandler {
    view: ViewMode,
    ctx: ScreenContext,
    forwarder: Forwarder,
    has_focus: bool,
    viewer: Option<Arc<Pager>>,
    task: Option<JoinHandle<()>>,
}

impl ScreenHandler {
    pub fn new(view: ViewMode, ctx: ScreenContext) -> Self {
        Self {
            view,
            ctx,
            forwarder: Forwarder::default(),
            has_focus: true,
            viewer: None,
            task: None,
        }
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn is_forwarding(&self) -> bool {
        self.forwarder.is_forwarding()
    }

    /// The open full-screen viewer, if this handler started one.
    pub fn active_viewer(&self) -> Option<Arc<Pager>> {
        self.viewer.clone().filter(|pager| !pager.is_closed())
    }

    /// Key hints for the footer.
    pub fn hints(&self) -> &'static [&'static str] {
        match self.view {
            ViewMode::Containers => containers::HINTS,
            ViewMode::Images => images::HINTS,
            ViewMode::Networks => networks::HINTS,
            ViewMode::Services => services::HINTS,
        }
    }

    pub fn handle(&mut self, event: InputEvent) -> Handled {
        match self.forwarder.forward(event) {
            Forwarded::Sent | Forwarded::Queued => Handled::Consumed,
            Forwarded::Interpret(event) => self.interpret(event),
        }
    }

    /// Runs the oldest event a closed session handed back through this
    /// view's commands. `None` once nothing is pending, or when a session
    /// opened since took the rest.
    pub fn handle_returned(&mut self) -> Option<Handled> {
        let event = self.next_returned()?;
        Some(self.interpret(event))
    }

    /// Takes the oldest returned event without interpreting it.
    pub fn next_returned(&self) -> Option<InputEvent> {
        self.forwarder.next_returned()
    }

    #[cfg(test)]
    pub(crate) fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    fn interpret(&mut self, event: InputEvent) -> Handled {
        let outcome = match event {
            InputEvent::Signal(signal) => match self.view {
                ViewMode::Containers => containers::on_signal(self, signal),
                ViewMode::Images => images::on_signal(self, signal),
                ViewMode::Networks => networks::on_signal(self, signal),
                ViewMode::Services => services::on_signal(self, signal),
            },
            InputEvent::Char(ch) => match self.view {
                ViewMode::Containers => containers::on_char(self, ch),
                ViewMode::Images => images::on_char(self, ch),
                ViewMode::Networks => Outcome::Unhandled,
                ViewMode::Services => services::on_char(self, ch),
            },
        };

        match outcome {
            Outcome::Unhandled => Handled::Delegated(event),
            Outcome::KeepFocus => {
                self.has_focus = true;
                self.ctx.notifier.refresh();
                Handled::Consumed
            }
            Outcome::ReleaseFocus => {
                self.has_focus = false;
                Handled::Consumed
            }
        }
    }

    /// Takes the screen back after the viewer reported itself closed.
    pub fn restore_focus(&mut self) {
        self.viewer = None;
        self.has_focus = true;
    }

    /// Blocks until the most recent modal or viewer task has finished.
    /// Returns `false` if it panicked.
    pub fn wait_idle(&mut self) -> bool {
        match self.task.take() {
            Some(task) => task.join().is_ok(),
            None => true,
        }
    }

    fn list(&self) -> Arc<EntityList> {
        self.ctx.registry.widget_for_view(self.view)
    }

    fn on_selected(
        &self,
        context: &str,
        action: impl FnMut(&str) -> Result<(), ActionError>,
    ) -> bool {
        self.ctx.on_selected(self.view, context, action)
    }

    fn sort(&self) -> Outcome {
        self.list().sort();
        Outcome::KeepFocus
    }

    /// Unmounts the view's list and loads it again from the backend.
    fn refresh_list(&self, context: &str) -> Outcome {
        let list = self.list();
        if let Err(err) = list.unmount().and_then(|()| list.mount()) {
            tracing::warn!(view = %self.view, error = %err, "refresh failed");
            self.ctx.notifier.appmessage(format!("{context}: {err}"));
        }
        Outcome::KeepFocus
    }

    /// Removes the selected entity straight away.
    fn remove_selected(&self, force: bool, context: &str) -> Outcome {
        let backend = self.ctx.backend.clone();
        if self.on_selected(context, |id| Ok(backend.remove_entity(id, force)?)) {
            self.ctx.reload(self.view);
        }
        Outcome::KeepFocus
    }

    /// Asks before removing the selected entity; only `y` proceeds.
    fn confirm_remove(&mut self, question: &str, context: &'static str) -> Outcome {
        let prompt = Prompt::new(self.modal_name(), question);
        self.start_modal(prompt, move |ctx, view, interaction| {
            if !interaction.result.trim().eq_ignore_ascii_case("y") {
                return;
            }
            let backend = ctx.backend.clone();
            if ctx.on_selected(view, context, |id| Ok(backend.remove_entity(id, false)?)) {
                ctx.reload(view);
            }
        })
    }

    fn filter_prompt(&mut self) -> Outcome {
        let prompt = Prompt::new(self.modal_name(), "Filter? (blank to remove current filter)");
        self.start_modal(prompt, |ctx, view, interaction| {
            ctx.registry.widget_for_view(view).filter(&interaction.result);
        })
    }

    /// Opens the inspect document of the selected entity full screen.
    fn inspect_selected(&mut self, context: &str) -> Outcome {
        let backend = self.ctx.backend.clone();
        let mut found = None;
        if !self.on_selected(context, |id| {
            found = Some((id.to_string(), backend.inspect_entity(id)?));
            Ok(())
        }) {
            return Outcome::KeepFocus;
        }
        match found {
            Some((id, doc)) => {
                let title = format!("{} {id}", self.view.kind());
                self.start_viewer(Pager::for_document(title, &doc), None)
            }
            None => Outcome::KeepFocus,
        }
    }

    /// Tails the logs of the selected entity full screen.
    fn logs_of_selected(&mut self, context: &str) -> Outcome {
        let backend = self.ctx.backend.clone();
        let mut found = None;
        if !self.on_selected(context, |id| {
            found = Some((id.to_string(), backend.stream_logs(id)?));
            Ok(())
        }) {
            return Outcome::KeepFocus;
        }
        match found {
            Some((id, stream)) => {
                let pager = Pager::for_stream(format!("logs {id}"));
                self.start_viewer(pager, Some(stream))
            }
            None => Outcome::KeepFocus,
        }
    }

    fn modal_name(&self) -> String {
        format!("{}-prompt", self.view)
    }

    /// Hands the input stream to `modal` on a new task.
    ///
    /// Forwarding starts before the modal is registered, so keys typed
    /// while it mounts already reach it. Once the interaction ends the
    /// session is released and, unless canceled, `then` runs with the
    /// result followed by a redraw.
    fn start_modal<M, F>(&mut self, modal: M, then: F) -> Outcome
    where
        M: ModalWidget + 'static,
        F: FnOnce(&ScreenContext, ViewMode, Interaction) + Send + 'static,
    {
        let Some(rx) = self.forwarder.open() else {
            tracing::warn!(view = %self.view, "input already forwarded");
            return Outcome::KeepFocus;
        };

        let modal = Arc::new(modal);
        if let Err(err) = self.ctx.registry.add(modal.clone()) {
            self.forwarder.close(&rx);
            tracing::warn!(view = %self.view, error = %err, "modal not shown");
            self.ctx.notifier.appmessage(err.to_string());
            return Outcome::KeepFocus;
        }

        let session = Session::modal(
            self.forwarder.clone(),
            rx,
            self.ctx.registry.clone(),
            modal.clone(),
            self.ctx.notifier.clone(),
        );
        let ctx = self.ctx.clone();
        let view = self.view;
        tracing::debug!(%view, modal = modal.name(), "modal started");

        let spawned = thread::Builder::new()
            .name(format!("{view}-modal"))
            .spawn(move || {
                let interaction = modal.run_interaction(session.source());
                drop(session);
                if interaction.canceled {
                    tracing::debug!(%view, "modal canceled");
                    return;
                }
                then(&ctx, view, interaction);
                ctx.notifier.refresh();
            });
        self.track(spawned)
    }

    /// Lets `pager` take over the whole screen and the input stream.
    /// `stream` is fed into the pager on its own task.
    fn start_viewer(&mut self, pager: Pager, stream: Option<LogStream>) -> Outcome {
        let Some(rx) = self.forwarder.open() else {
            tracing::warn!(view = %self.view, "input already forwarded");
            return Outcome::KeepFocus;
        };
        let pager = Arc::new(pager);
        let session = Session::viewer(
            self.forwarder.clone(),
            rx,
            self.view,
            pager.clone(),
            self.ctx.notifier.clone(),
        );

        if let Some(stream) = stream {
            let feeder = pager.clone();
            let notifier = self.ctx.notifier.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-logs", self.view))
                .spawn(move || feeder.feed(stream, || notifier.refresh()));
            if let Err(err) = spawned {
                drop(session);
                return self.spawn_failed(err);
            }
        }

        let viewer = pager.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-viewer", self.view))
            .spawn(move || {
                viewer.run(session.source());
                drop(session);
            });
        match spawned {
            Ok(task) => {
                tracing::debug!(view = %self.view, title = pager.title(), "viewer started");
                self.task = Some(task);
                self.viewer = Some(pager);
                Outcome::ReleaseFocus
            }
            Err(err) => self.spawn_failed(err),
        }
    }

    /// A failed spawn drops its closure and with it the session, which
    /// already restores forwarding and the registry.
    fn track(&mut self, spawned: std::io::Result<JoinHandle<()>>) -> Outcome {
        match spawned {
            Ok(task) => {
                self.task = Some(task);
                Outcome::KeepFocus
            }
            Err(err) => self.spawn_failed(err),
        }
    }

    fn spawn_failed(&mut self, err: std::io::Error) -> Outcome {
        tracing::error!(view = %self.view, error = %err, "could not start task");
        self.task = None;
        self.ctx
            .notifier
            .appmessage(format!("Could not start task: {err}"));
        Outcome::KeepFocus
    }
}

/// Signals every view treats the same way.
fn common_signal(handler: &ScreenHandler, signal: Signal) -> Outcome {
    match signal {
        Signal::Sort => handler.sort(),
        _ => Outcome::Unhandled,
    }
}
