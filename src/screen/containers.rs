use crate::keymap::Signal;

use super::{Outcome, ScreenHandler, common_signal};

pub(super) const HINTS: &[&str] = &[
    "[F1] sort",
    "[F5] refresh",
    "[Enter] inspect",
    "[l] logs",
    "[%] filter",
    "[^E] remove",
    "[^F] force remove",
];

pub(super) fn on_signal(handler: &mut ScreenHandler, signal: Signal) -> Outcome {
    match signal {
        Signal::Refresh => handler.refresh_list("Error refreshing containers"),
        Signal::Remove => handler.confirm_remove(
            "About to remove the selected container. Do you want to proceed? y/N",
            "Error removing container",
        ),
        Signal::ForceRemove => handler.remove_selected(true, "Error forcing container removal"),
        Signal::Enter => handler.inspect_selected("Error inspecting container"),
        other => common_signal(handler, other),
    }
}

pub(super) fn on_char(handler: &mut ScreenHandler, ch: char) -> Outcome {
    match ch {
        '%' => handler.filter_prompt(),
        'i' | 'I' => handler.inspect_selected("Error inspecting container"),
        'l' | 'L' => handler.logs_of_selected("Error showing container logs"),
        _ => Outcome::Unhandled,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;

    use super::*;
    use crate::backend::memory::{Fixture, InMemoryBackend};
    use crate::backend::{Entity, EntityKind};
    use crate::event::{AppEvent, Notifier};
    use crate::keymap::InputEvent;
    use crate::registry::{ViewMode, WidgetRegistry};
    use crate::screen::ScreenContext;
    use crate::widget::Widget;

    fn setup() -> (ScreenHandler, Arc<InMemoryBackend>, mpsc::Receiver<AppEvent>) {
        let mut fixture = Fixture {
            entities: vec![Entity {
                id: "c0ffee".to_string(),
                kind: EntityKind::Container,
                name: "web".to_string(),
                status: "running".to_string(),
                detail: "nginx:latest".to_string(),
                command: String::new(),
            }],
            ..Fixture::default()
        };
        fixture.logs.insert(
            "c0ffee".to_string(),
            vec!["listening on :80".to_string(), "GET /".to_string()],
        );
        let backend = Arc::new(InMemoryBackend::new(fixture));
        let registry = Arc::new(WidgetRegistry::new(backend.clone()));
        registry.widget_for_view(ViewMode::Containers).mount().unwrap();
        let (tx, rx) = mpsc::channel();
        let ctx = ScreenContext::new(backend.clone(), registry, Notifier::new(tx));
        (ScreenHandler::new(ViewMode::Containers, ctx), backend, rx)
    }

    fn messages(rx: &mpsc::Receiver<AppEvent>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|e| match e {
                AppEvent::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn confirmed_remove_of_running_container_reports_error() {
        let (mut handler, backend, rx) = setup();
        handler.handle(InputEvent::Signal(Signal::Remove));
        handler.handle(InputEvent::Char('y'));
        handler.handle(InputEvent::Signal(Signal::Enter));
        assert!(handler.wait_idle());
        assert_eq!(
            messages(&rx),
            vec!["Error removing container: container c0ffee is running, force removal required"
                .to_string()]
        );
        assert_eq!(backend.entity_ids(EntityKind::Container), vec!["c0ffee"]);
    }

    #[test]
    fn force_remove_skips_confirmation() {
        let (mut handler, backend, rx) = setup();
        handler.handle(InputEvent::Signal(Signal::ForceRemove));
        assert!(!handler.is_forwarding());
        assert!(messages(&rx).is_empty());
        assert!(backend.entity_ids(EntityKind::Container).is_empty());
    }

    #[test]
    fn logs_open_in_a_viewer() {
        let (mut handler, _, _rx) = setup();
        handler.handle(InputEvent::Char('l'));
        assert!(!handler.has_focus());
        let pager = handler.active_viewer().unwrap();
        assert_eq!(pager.title(), "logs c0ffee");

        handler.handle(InputEvent::Signal(Signal::Escape));
        assert!(handler.wait_idle());
        assert!(pager.is_closed());
        assert!(!handler.is_forwarding());
    }
}
