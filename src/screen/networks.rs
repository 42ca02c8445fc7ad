use crate::keymap::Signal;

use super::{Outcome, ScreenHandler, common_signal};

pub(super) const HINTS: &[&str] = &["[F1] sort", "[F5] refresh", "[Enter] inspect", "[^E] remove"];

pub(super) fn on_signal(handler: &mut ScreenHandler, signal: Signal) -> Outcome {
    match signal {
        Signal::Refresh => handler.refresh_list("Error refreshing networks"),
        Signal::Remove => handler.remove_selected(false, "Error removing network"),
        Signal::Enter => handler.inspect_selected("Error inspecting network"),
        other => common_signal(handler, other),
    }
}
