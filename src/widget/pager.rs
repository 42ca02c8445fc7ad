use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget as _};

use crate::backend::{Document, LogStream};
use crate::keymap::{InputEvent, Signal};
use crate::ui::theme::Theme;
use crate::widget::EventSource;

const PAGE: usize = 20;

struct PagerState {
    lines: Vec<String>,
    offset: usize,
    /// Keep the last line in view as lines arrive.
    follow: bool,
}

/// Full-screen read-only viewer for documents and log streams.
pub struct Pager {
    title: String,
    state: Mutex<PagerState>,
    closed: AtomicBool,
}

impl Pager {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            state: Mutex::new(PagerState {
                lines,
                offset: 0,
                follow: false,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn for_document(title: impl Into<String>, doc: &Document) -> Self {
        let text = serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string());
        Self::new(title, text.lines().map(str::to_string).collect())
    }

    /// Empty pager that tails whatever [`Pager::feed`] appends.
    pub fn for_stream(title: impl Into<String>) -> Self {
        let pager = Self::new(title, Vec::new());
        pager.state().follow = true;
        pager
    }

    fn state(&self) -> MutexGuard<'_, PagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn lines(&self) -> Vec<String> {
        self.state().lines.clone()
    }

    pub fn offset(&self) -> usize {
        self.state().offset
    }

    pub fn push_line(&self, line: String) {
        let mut state = self.state();
        state.lines.push(line);
        if state.follow {
            state.offset = state.lines.len().saturating_sub(PAGE);
        }
    }

    /// Appends lines from `stream` until it ends or the pager is closed.
    /// `on_line` runs after each appended line.
    ///
    /// Closing is checked before every read, but a read that is already
    /// blocked in the stream only notices it once the next line or the end
    /// of the stream arrives.
    pub fn feed(&self, mut stream: LogStream, on_line: impl Fn()) {
        while !self.is_closed() {
            let Some(line) = stream.next() else {
                return;
            };
            if self.is_closed() {
                return;
            }
            self.push_line(line);
            on_line();
        }
    }

    /// Consumes events until the user closes the pager or the stream ends.
    pub fn run(&self, events: &EventSource) {
        while let Some(event) = events.next() {
            let done = self.handle(&event);
            events.handled(&event);
            if done {
                break;
            }
        }
        self.close();
    }

    fn handle(&self, event: &InputEvent) -> bool {
        let mut state = self.state();
        let last = state.lines.len().saturating_sub(1);
        match *event {
            InputEvent::Signal(Signal::Escape) | InputEvent::Char('q') => return true,
            InputEvent::Signal(Signal::Up) | InputEvent::Char('k') => {
                state.follow = false;
                state.offset = state.offset.saturating_sub(1);
            }
            InputEvent::Signal(Signal::Down) | InputEvent::Char('j') => {
                state.offset = (state.offset + 1).min(last);
            }
            InputEvent::Signal(Signal::PageUp) => {
                state.follow = false;
                state.offset = state.offset.saturating_sub(PAGE);
            }
            InputEvent::Signal(Signal::PageDown) | InputEvent::Char(' ') => {
                state.offset = (state.offset + PAGE).min(last);
            }
            InputEvent::Signal(Signal::Home) | InputEvent::Char('g') => {
                state.follow = false;
                state.offset = 0;
            }
            InputEvent::Signal(Signal::End) | InputEvent::Char('G') => {
                state.offset = state.lines.len().saturating_sub(PAGE);
            }
            _ => {}
        }
        false
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let colors = &theme.colors;
        let state = self.state();
        let height = area.height.saturating_sub(2) as usize;
        let visible: Vec<Line> = state
            .lines
            .iter()
            .skip(state.offset)
            .take(height)
            .map(|l| Line::from(l.as_str()))
            .collect();

        let position = format!(" {}/{} ", state.offset + 1, state.lines.len().max(1));
        let block = Block::bordered()
            .title(Span::styled(
                format!(" {} ", self.title),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(position).right_aligned())
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()).fg(colors.fg()));

        Paragraph::new(visible).block(block).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, mpsc};

    use super::*;

    fn events(list: &[InputEvent]) -> EventSource {
        let (tx, rx) = mpsc::channel();
        for e in list {
            tx.send(*e).unwrap();
        }
        EventSource::new(rx, |_| {})
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn scrolling_is_clamped() {
        let pager = Pager::new("doc", numbered(30));
        pager.run(&events(&[
            InputEvent::Signal(Signal::Up),
            InputEvent::Signal(Signal::PageDown),
            InputEvent::Signal(Signal::PageDown),
            InputEvent::Signal(Signal::Down),
            InputEvent::Signal(Signal::Escape),
        ]));
        assert_eq!(pager.offset(), 29);
        assert!(pager.is_closed());
    }

    #[test]
    fn q_closes_and_leaves_later_events() {
        let pager = Pager::new("doc", numbered(3));
        let source = events(&[InputEvent::Char('q'), InputEvent::Char('x')]);
        pager.run(&source);
        assert!(pager.is_closed());
        assert_eq!(source.next(), Some(InputEvent::Char('x')));
    }

    #[test]
    fn document_is_pretty_printed() {
        let doc = serde_json::json!({"Name": "checkout", "Replicas": 2});
        let pager = Pager::for_document("inspect", &doc);
        let lines = pager.lines();
        assert_eq!(lines.first().map(String::as_str), Some("{"));
        assert!(lines.iter().any(|l| l.contains("\"Replicas\": 2")));
    }

    #[test]
    fn stream_follows_tail_until_user_scrolls() {
        let pager = Pager::for_stream("logs");
        pager.feed(Box::new(numbered(25).into_iter()), || {});
        assert_eq!(pager.offset(), 5);

        pager.handle(&InputEvent::Signal(Signal::Home));
        pager.push_line("late".to_string());
        assert_eq!(pager.offset(), 0);
    }

    #[test]
    fn feed_stops_once_closed() {
        let pager = Pager::for_stream("logs");
        pager.close();
        pager.feed(Box::new(numbered(5).into_iter()), || {});
        assert!(pager.lines().is_empty());
    }

    #[test]
    fn feed_reads_nothing_after_close() {
        let pager = Pager::for_stream("logs");
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let stream = numbered(5).into_iter().inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        pager.feed(Box::new(stream), || pager.close());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(pager.lines(), vec!["line 0".to_string()]);
    }
}
