use std::sync::Arc;

use crate::keymap::{InputEvent, Signal};
use crate::registry::ViewMode;
use crate::screen::{Handled, ScreenContext, ScreenHandler};
use crate::widget::Widget;
use crate::widget::pager::Pager;

const PAGE_ROWS: isize = 10;

/// Routes input to the active view's handler and falls back to global
/// navigation for everything the handler does not claim.
pub struct Dispatcher {
    active: ViewMode,
    handlers: [ScreenHandler; 4],
    ctx: ScreenContext,
    quit: bool,
}

fn slot(view: ViewMode) -> usize {
    match view {
        ViewMode::Containers => 0,
        ViewMode::Images => 1,
        ViewMode::Networks => 2,
        ViewMode::Services => 3,
    }
}

impl Dispatcher {
    pub fn new(ctx: ScreenContext, initial: ViewMode) -> Self {
        let handlers = ViewMode::ALL.map(|view| ScreenHandler::new(view, ctx.clone()));
        let dispatcher = Self {
            active: initial,
            handlers,
            ctx,
            quit: false,
        };
        dispatcher.load_active();
        dispatcher
    }

    pub fn active_view(&self) -> ViewMode {
        self.active
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn handler(&self, view: ViewMode) -> &ScreenHandler {
        &self.handlers[slot(view)]
    }

    pub fn handler_mut(&mut self, view: ViewMode) -> &mut ScreenHandler {
        &mut self.handlers[slot(view)]
    }

    pub fn context(&self) -> &ScreenContext {
        &self.ctx
    }

    /// Viewer started from the active view, if it still owns the screen.
    pub fn active_viewer(&self) -> Option<Arc<Pager>> {
        self.handler(self.active).active_viewer()
    }

    /// Routes one event. If a finished session handed input back, the
    /// event waits behind it and everything is replayed in order.
    pub fn dispatch(&mut self, event: InputEvent) {
        self.route(event);
        self.replay_returned();
    }

    /// Re-routes events a closed session never consumed. Called on every
    /// redraw request, since that is how a session announces its end.
    pub fn replay_returned(&mut self) {
        loop {
            let mut replayed = false;
            for view in ViewMode::ALL {
                replayed |= self.replay_from(view);
            }
            if !replayed {
                return;
            }
        }
    }

    fn replay_from(&mut self, view: ViewMode) -> bool {
        let mut replayed = false;
        // A replayed key may switch views; the rest goes to the new one.
        while view == self.active {
            let Some(handled) = self.handler_mut(view).handle_returned() else {
                return replayed;
            };
            tracing::debug!(%view, "replayed returned input");
            replayed = true;
            if let Handled::Delegated(event) = handled {
                self.fallback(event);
            }
        }
        while let Some(event) = self.handler(view).next_returned() {
            replayed = true;
            self.route(event);
        }
        replayed
    }

    /// The viewer of `view` finished; its handler takes the screen back.
    pub fn viewer_closed(&mut self, view: ViewMode) {
        self.handler_mut(view).restore_focus();
        self.replay_returned();
        self.ctx.notifier.refresh();
    }

    pub fn switch_to(&mut self, view: ViewMode) {
        if view == self.active {
            return;
        }
        tracing::debug!(from = %self.active, to = %view, "switching view");
        self.active = view;
        self.load_active();
    }

    fn load_active(&self) {
        if let Err(err) = self.ctx.registry.widget_for_view(self.active).mount() {
            tracing::warn!(view = %self.active, error = %err, "could not load view");
            self.ctx.notifier.appmessage(err.to_string());
        }
    }

    fn route(&mut self, event: InputEvent) {
        let active = self.active;
        match self.handler_mut(active).handle(event) {
            Handled::Consumed => {}
            Handled::Delegated(event) => self.fallback(event),
        }
    }

    /// Last link of the chain: list navigation, view switching, quitting.
    fn fallback(&mut self, event: InputEvent) {
        let list = self.ctx.registry.widget_for_view(self.active);
        match event {
            InputEvent::Signal(Signal::Up) => list.move_selection(-1),
            InputEvent::Signal(Signal::Down) => list.move_selection(1),
            InputEvent::Signal(Signal::PageUp) => list.move_selection(-PAGE_ROWS),
            InputEvent::Signal(Signal::PageDown) => list.move_selection(PAGE_ROWS),
            InputEvent::Signal(Signal::Home) => list.select_first(),
            InputEvent::Signal(Signal::End) => list.select_last(),
            InputEvent::Signal(Signal::NextView) => self.switch_to(self.active.next()),
            InputEvent::Signal(Signal::PrevView) => self.switch_to(self.active.prev()),
            InputEvent::Signal(Signal::Quit) | InputEvent::Char('q' | 'Q') => {
                tracing::info!("quit requested");
                self.quit = true;
            }
            InputEvent::Char(ch) => match ViewMode::from_digit(ch) {
                Some(view) => self.switch_to(view),
                None => return,
            },
            _ => return,
        }
        self.ctx.notifier.refresh();
    }
}
