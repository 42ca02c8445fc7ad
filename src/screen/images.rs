use crate::keymap::Signal;
use crate::registry::ViewMode;
use crate::widget::pager::Pager;
use crate::widget::prompt::Prompt;

use super::{Outcome, ScreenHandler, common_signal};

pub(super) const HINTS: &[&str] = &[
    "[F1] sort",
    "[F5] refresh",
    "[Enter] inspect",
    "[i] history",
    "[r] run",
    "[^E] remove",
    "[^F] force remove",
    "[^D] remove dangling",
];

pub(super) fn on_signal(handler: &mut ScreenHandler, signal: Signal) -> Outcome {
    match signal {
        Signal::Refresh => handler.refresh_list("Error refreshing images"),
        Signal::RemoveDangling => {
            match handler.ctx.backend.remove_dangling_images() {
                Ok(()) => handler.ctx.reload(ViewMode::Images),
                Err(err) => {
                    tracing::warn!(error = %err, "removing dangling images");
                    handler
                        .ctx
                        .notifier
                        .appmessage(format!("Error removing dangling images: {err}"));
                }
            }
            Outcome::KeepFocus
        }
        Signal::Remove => handler.remove_selected(false, "Error removing image"),
        Signal::ForceRemove => handler.remove_selected(true, "Error forcing image removal"),
        Signal::Enter => handler.inspect_selected("Error inspecting image"),
        other => common_signal(handler, other),
    }
}

pub(super) fn on_char(handler: &mut ScreenHandler, ch: char) -> Outcome {
    match ch {
        // Already on this view.
        '2' => Outcome::KeepFocus,
        'i' | 'I' => history(handler),
        'r' | 'R' => run(handler),
        _ => Outcome::Unhandled,
    }
}

fn history(handler: &mut ScreenHandler) -> Outcome {
    let backend = handler.ctx.backend.clone();
    let mut found = None;
    if !handler.on_selected("Error showing image history", |id| {
        found = Some((id.to_string(), backend.entity_history(id)?));
        Ok(())
    }) {
        return Outcome::KeepFocus;
    }
    match found {
        Some((id, doc)) => handler.start_viewer(Pager::for_document(format!("history {id}"), &doc), None),
        None => Outcome::KeepFocus,
    }
}

/// Asks for a command, prefilled with the image default, and runs the
/// selected image with it.
fn run(handler: &mut ScreenHandler) -> Outcome {
    let backend = handler.ctx.backend.clone();
    let mut found = None;
    if !handler.on_selected("Error running image", |id| {
        found = Some(backend.entity_by_id(id)?);
        Ok(())
    }) {
        return Outcome::KeepFocus;
    }
    let Some(image) = found else {
        return Outcome::KeepFocus;
    };

    let title = format!("docker run {}", image.name);
    let prompt = Prompt::with_text(handler.modal_name(), title, &image.command);
    handler.start_modal(prompt, move |ctx, _, interaction| {
        match ctx.backend.run_entity(&image, &interaction.result) {
            Ok(()) => ctx.reload(ViewMode::Containers),
            Err(err) => {
                tracing::warn!(image = %image.id, error = %err, "run failed");
                ctx.notifier.appmessage(format!("Error running image: {err}"));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;

    use super::*;
    use crate::backend::memory::{Call, Fixture, InMemoryBackend, Op};
    use crate::backend::{Entity, EntityKind};
    use crate::event::{AppEvent, Notifier};
    use crate::keymap::InputEvent;
    use crate::registry::WidgetRegistry;
    use crate::screen::{Handled, ScreenContext};
    use crate::widget::Widget;

    fn image(id: &str, name: &str, command: &str) -> Entity {
        Entity {
            id: id.to_string(),
            kind: EntityKind::Image,
            name: name.to_string(),
            status: String::new(),
            detail: String::new(),
            command: command.to_string(),
        }
    }

    fn setup() -> (ScreenHandler, Arc<InMemoryBackend>, mpsc::Receiver<AppEvent>) {
        let backend = Arc::new(InMemoryBackend::new(Fixture {
            entities: vec![
                image("sha256:9bd8", "nginx:latest", "nginx -g daemon off;"),
                image("sha256:0000", "<none>", ""),
            ],
            ..Fixture::default()
        }));
        let registry = Arc::new(WidgetRegistry::new(backend.clone()));
        registry.widget_for_view(ViewMode::Images).mount().unwrap();
        let (tx, rx) = mpsc::channel();
        let ctx = ScreenContext::new(backend.clone(), registry, Notifier::new(tx));
        (ScreenHandler::new(ViewMode::Images, ctx), backend, rx)
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
    fn remove_failure_is_reported_with_context() {
        let (mut handler, backend, rx) = setup();
        backend.fail(Op::Remove, "image is in use");
        handler.handle(InputEvent::Signal(Signal::Remove));
        assert_eq!(messages(&rx), vec!["Error removing image: image is in use".to_string()]);
    }

    #[test]
    fn dangling_images_are_pruned() {
        let (mut handler, backend, rx) = setup();
        handler.handle(InputEvent::Signal(Signal::RemoveDangling));
        assert!(messages(&rx).is_empty());
        assert_eq!(backend.entity_ids(EntityKind::Image), vec!["sha256:9bd8"]);
        assert_eq!(handler.list().visible_rows().len(), 1);
    }

    #[test]
    fn digit_two_is_swallowed() {
        let (mut handler, _, _rx) = setup();
        assert_eq!(handler.handle(InputEvent::Char('2')), Handled::Consumed);
    }

    #[test]
    fn run_prompt_is_prefilled_with_image_command() {
        let (mut handler, backend, rx) = setup();
        handler.list().filter("nginx");
        handler.handle(InputEvent::Char('r'));
        for ch in " -v".chars() {
            handler.handle(InputEvent::Char(ch));
        }
        handler.handle(InputEvent::Signal(Signal::Enter));
        assert!(handler.wait_idle());

        assert!(messages(&rx).is_empty());
        assert!(backend.calls().contains(&Call::Run {
            id: "sha256:9bd8".to_string(),
            args: "nginx -g daemon off; -v".to_string(),
        }));
        assert_eq!(backend.entity_ids(EntityKind::Container), vec!["run0001"]);
    }
}
