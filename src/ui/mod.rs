pub mod layout;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::app::App;
use crate::registry::ViewMode;
use crate::widget::Widget;
use layout::{AppLayout, centered_rect, pack_hint_lines};

const POPUP_WIDTH: u16 = 64;
const POPUP_HEIGHT: u16 = 5;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    // A viewer owns the whole screen until it reports itself closed.
    if let Some(pager) = app.dispatcher.active_viewer() {
        pager.render(area, frame.buffer_mut(), &app.theme);
        return;
    }

    let layout = AppLayout::new(area);
    render_header(frame, app, layout.header);

    let active = app.dispatcher.active_view();
    app.registry
        .widget_for_view(active)
        .render(layout.main, frame.buffer_mut(), &app.theme);

    let popup = centered_rect(POPUP_WIDTH, POPUP_HEIGHT, layout.main);
    for widget in app.registry.active_widgets() {
        widget.render(popup, frame.buffer_mut(), &app.theme);
    }

    render_message(frame, app, layout.message);

    let hints = app.dispatcher.handler(active).hints();
    let footer = pack_hint_lines(hints, layout.footer.width as usize)
        .into_iter()
        .next()
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(colors.muted())),
        layout.footer,
    );
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let active = app.dispatcher.active_view();

    let mut spans = vec![Span::styled(
        " dockhand ",
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD),
    )];
    for (i, view) in ViewMode::ALL.iter().enumerate() {
        let label = format!(" {}:{} ", i + 1, view.label());
        let style = if *view == active {
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.selection_bg())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.header_fg())
        };
        spans.push(Span::styled(label, style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg())),
        area,
    );
}

fn render_message(frame: &mut Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let Some(status) = &app.status else {
        return;
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", status.at.format("%H:%M:%S")),
            Style::default().fg(colors.muted()),
        ),
        Span::styled(status.text.as_str(), Style::default().fg(colors.accent_dim())),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
