use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget as _, Wrap};

use crate::ui::theme::Theme;
use crate::widget::line_input::{InputResult, LineInput};
use crate::widget::{EventSource, Interaction, ModalWidget, Widget, WidgetError};

/// Single-line question shown over the current view.
///
/// Serves both y/N confirmations and free-text entry; the caller decides
/// how to read [`Interaction::result`].
pub struct Prompt {
    name: String,
    title: String,
    input: Mutex<LineInput>,
    mounted: AtomicBool,
}

impl Prompt {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::with_text(name, title, "")
    }

    pub fn with_text(name: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            input: Mutex::new(LineInput::new(text)),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> String {
        self.input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value()
            .to_string()
    }
}

impl Widget for Prompt {
    fn name(&self) -> &str {
        &self.name
    }

    fn mount(&self) -> Result<(), WidgetError> {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return Err(WidgetError::AlreadyMounted(self.name.clone()));
        }
        Ok(())
    }

    fn unmount(&self) -> Result<(), WidgetError> {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return Err(WidgetError::NotMounted(self.name.clone()));
        }
        Ok(())
    }

    fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let colors = &theme.colors;
        let input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        let (before, cursor, after) = input.render_parts();
        let cursor_style = Style::default()
            .fg(colors.bg())
            .bg(colors.accent())
            .add_modifier(Modifier::BOLD);

        let mut entry = vec![Span::raw("> "), Span::raw(before.to_string())];
        match cursor {
            Some(ch) => entry.push(Span::styled(ch.to_string(), cursor_style)),
            None => entry.push(Span::styled(" ", cursor_style)),
        }
        entry.push(Span::raw(after.to_string()));

        let lines = vec![
            Line::from(Span::styled(
                self.title.clone(),
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
            Line::from(entry),
        ];

        Clear.render(area, buf);
        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()).fg(colors.fg()));
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

impl ModalWidget for Prompt {
    fn run_interaction(&self, events: &EventSource) -> Interaction {
        while let Some(event) = events.next() {
            let outcome = self
                .input
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handle(&event);
            events.handled(&event);
            match outcome {
                InputResult::Continue => {}
                InputResult::Submit => return Interaction::submitted(self.text()),
                InputResult::Cancel => return Interaction::canceled(),
            }
        }
        // Producer hung up without a decision.
        Interaction::canceled()
    }
}
