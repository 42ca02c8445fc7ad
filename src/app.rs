use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::backend::Backend;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::event::{AppEvent, Notifier};
use crate::keymap::KeyMap;
use crate::registry::WidgetRegistry;
use crate::screen::ScreenContext;
use crate::ui::theme::Theme;

/// Latest `appmessage`, shown in the message bar.
pub struct StatusLine {
    pub text: String,
    pub at: DateTime<Local>,
}

pub struct App {
    pub dispatcher: Dispatcher,
    pub registry: Arc<WidgetRegistry>,
    pub keymap: KeyMap,
    pub theme: Theme,
    pub status: Option<StatusLine>,
}

impl App {
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        notifier: Notifier,
    ) -> Result<Self> {
        let keymap = config.keymap()?;
        let theme = Theme::load(&config.theme).unwrap_or_else(|| {
            let available = Theme::available_themes().join(", ");
            tracing::warn!(theme = %config.theme, %available, "unknown theme, using default");
            notifier.appmessage(format!(
                "Unknown theme {}, available: {available}",
                config.theme
            ));
            Theme::default()
        });
        let registry = Arc::new(WidgetRegistry::new(backend.clone()));
        let ctx = ScreenContext::new(backend, registry.clone(), notifier);
        let dispatcher = Dispatcher::new(ctx, config.initial_view);
        Ok(Self {
            dispatcher,
            registry,
            keymap,
            theme,
            status: None,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.dispatcher.should_quit()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => {
                if let Some(input) = self.keymap.translate(&key) {
                    self.dispatcher.dispatch(input);
                }
            }
            AppEvent::Refresh | AppEvent::Tick | AppEvent::Resize(_, _) => {
                self.dispatcher.replay_returned();
            }
            AppEvent::Message(text) => {
                self.status = Some(StatusLine {
                    text,
                    at: Local::now(),
                });
            }
            AppEvent::ViewerClosed(view) => self.dispatcher.viewer_closed(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::registry::ViewMode;

    fn app() -> App {
        let (tx, _rx) = mpsc::channel();
        let backend = Arc::new(InMemoryBackend::demo().unwrap());
        let config = Config {
            initial_view: ViewMode::Services,
            ..Config::default()
        };
        App::new(&config, backend, Notifier::new(tx)).unwrap()
    }

    #[test]
    fn keys_are_translated_and_routed() {
        let mut app = app();
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Char('2'), KeyModifiers::NONE)));
        assert_eq!(app.dispatcher.active_view(), ViewMode::Images);
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(app.should_quit());
    }

    #[test]
    fn unknown_theme_lists_the_bundled_ones() {
        let (tx, rx) = mpsc::channel();
        let backend = Arc::new(InMemoryBackend::demo().unwrap());
        let config = Config {
            theme: "no-such-theme".to_string(),
            ..Config::default()
        };
        let app = App::new(&config, backend, Notifier::new(tx)).unwrap();
        assert_eq!(app.theme.name, Theme::default().name);

        let message = rx
            .try_iter()
            .find_map(|e| match e {
                AppEvent::Message(text) => Some(text),
                _ => None,
            })
            .unwrap();
        assert!(message.starts_with("Unknown theme no-such-theme"));
        assert!(message.contains("harbor"));
    }

    #[test]
    fn messages_replace_the_status_line() {
        let mut app = app();
        app.handle_event(AppEvent::Message("first".to_string()));
        app.handle_event(AppEvent::Message("second".to_string()));
        assert_eq!(app.status.as_ref().map(|s| s.text.as_str()), Some("second"));
    }
}
