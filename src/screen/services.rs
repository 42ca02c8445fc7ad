use crate::keymap::Signal;
use crate::widget::prompt::Prompt;

use super::{Outcome, ScreenHandler, common_signal};

pub(super) const HINTS: &[&str] = &[
    "[F1] sort",
    "[F5] refresh",
    "[i] inspect",
    "[l] logs",
    "[%] filter",
    "[^S] scale",
    "[^R] remove",
];

pub(super) fn on_signal(handler: &mut ScreenHandler, signal: Signal) -> Outcome {
    match signal {
        Signal::Refresh => {
            handler.ctx.notifier.appmessage("Refreshing the service list");
            handler.refresh_list("There was an error refreshing the service list")
        }
        Signal::Remove => handler.confirm_remove(
            "About to remove the selected service. Do you want to proceed? y/N",
            "There was an error removing the service",
        ),
        Signal::Scale => scale(handler),
        other => common_signal(handler, other),
    }
}

pub(super) fn on_char(handler: &mut ScreenHandler, ch: char) -> Outcome {
    match ch {
        '%' => handler.filter_prompt(),
        'i' | 'I' => handler.inspect_selected("There was an error inspecting the service"),
        'l' | 'L' => handler.logs_of_selected("There was an error showing service logs"),
        _ => Outcome::Unhandled,
    }
}

/// Asks for a replica count and scales the selected service to it.
/// Anything but a non-negative integer is rejected before the backend is
/// called.
fn scale(handler: &mut ScreenHandler) -> Outcome {
    let prompt = Prompt::new(handler.modal_name(), "Scale service. Number of replicas?");
    handler.start_modal(prompt, |ctx, view, interaction| {
        let input = interaction.result.trim();
        let Ok(replicas) = input.parse::<u64>() else {
            ctx.notifier.appmessage(format!(
                "Cannot scale service, invalid number of replicas: {input}"
            ));
            return;
        };
        let backend = ctx.backend.clone();
        let notifier = ctx.notifier.clone();
        let scaled = ctx.on_selected(view, "There was an error scaling the service", |id| {
            backend.scale_entity(id, replicas)?;
            notifier.appmessage(format!("Service {id} scaled to {replicas} replicas"));
            Ok(())
        });
        if scaled {
            ctx.reload(view);
        }
    })
}
