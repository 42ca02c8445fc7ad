use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget as _};

use crate::backend::{Backend, Entity, EntityKind};
use crate::ui::theme::Theme;
use crate::widget::{ActionError, ActionableWidget, Widget, WidgetError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Name,
    Id,
    Status,
}

impl SortMode {
    fn next(self) -> Self {
        match self {
            SortMode::Name => SortMode::Id,
            SortMode::Id => SortMode::Status,
            SortMode::Status => SortMode::Name,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Name => "name",
            SortMode::Id => "id",
            SortMode::Status => "status",
        }
    }
}

struct ListState {
    mounted: bool,
    rows: Vec<Entity>,
    /// Index into the filtered rows.
    selected: usize,
    sort: SortMode,
    filter: Option<String>,
}

impl ListState {
    fn visible(&self) -> Vec<&Entity> {
        match &self.filter {
            Some(pattern) => {
                let pattern = pattern.to_lowercase();
                self.rows
                    .iter()
                    .filter(|e| {
                        e.name.to_lowercase().contains(&pattern)
                            || e.id.to_lowercase().contains(&pattern)
                    })
                    .collect()
            }
            None => self.rows.iter().collect(),
        }
    }

    fn apply_sort(&mut self) {
        match self.sort {
            SortMode::Name => self.rows.sort_by(|a, b| a.name.cmp(&b.name)),
            SortMode::Id => self.rows.sort_by(|a, b| a.id.cmp(&b.id)),
            SortMode::Status => self
                .rows
                .sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.name.cmp(&b.name))),
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.visible().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }
}

/// The persistent list backing one dashboard view.
///
/// Mounting loads rows from the backend; unmounting drops them so the next
/// mount shows fresh data.
pub struct EntityList {
    name: String,
    kind: EntityKind,
    backend: Arc<dyn Backend>,
    state: Mutex<ListState>,
}

impl EntityList {
    pub fn new(kind: EntityKind, backend: Arc<dyn Backend>) -> Self {
        Self {
            name: format!("{kind}-list"),
            kind,
            backend,
            state: Mutex::new(ListState {
                mounted: false,
                rows: Vec::new(),
                selected: 0,
                sort: SortMode::Name,
                filter: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_mounted(&self) -> bool {
        self.state().mounted
    }

    /// Cycles the sort column.
    pub fn sort(&self) {
        let mut state = self.state();
        state.sort = state.sort.next();
        state.apply_sort();
    }

    pub fn sort_mode(&self) -> SortMode {
        self.state().sort
    }

    /// Keeps rows whose name or id contains `pattern`; blank clears the filter.
    pub fn filter(&self, pattern: &str) {
        let mut state = self.state();
        let pattern = pattern.trim();
        state.filter = (!pattern.is_empty()).then(|| pattern.to_string());
        state.selected = 0;
    }

    pub fn filter_pattern(&self) -> Option<String> {
        self.state().filter.clone()
    }

    pub fn visible_rows(&self) -> Vec<Entity> {
        self.state().visible().into_iter().cloned().collect()
    }

    pub fn selected_id(&self) -> Option<String> {
        let state = self.state();
        state.visible().get(state.selected).map(|e| e.id.clone())
    }

    /// Moves the selection by `delta` rows, clamped to the visible rows.
    pub fn move_selection(&self, delta: isize) {
        let mut state = self.state();
        let count = state.visible().len();
        if count == 0 {
            state.selected = 0;
            return;
        }
        state.selected = state.selected.saturating_add_signed(delta).min(count - 1);
    }

    pub fn select_first(&self) {
        self.state().selected = 0;
    }

    pub fn select_last(&self) {
        let mut state = self.state();
        state.selected = state.visible().len().saturating_sub(1);
    }
}

impl Widget for EntityList {
    fn name(&self) -> &str {
        &self.name
    }

    fn mount(&self) -> Result<(), WidgetError> {
        // Load outside the lock; backend calls may be slow.
        let rows = self
            .backend
            .list_entities(self.kind)
            .map_err(|source| WidgetError::Load {
                name: self.name.clone(),
                source,
            })?;
        let mut state = self.state();
        state.rows = rows;
        state.apply_sort();
        state.clamp_selection();
        state.mounted = true;
        tracing::debug!(widget = %self.name, rows = state.rows.len(), "mounted");
        Ok(())
    }

    fn unmount(&self) -> Result<(), WidgetError> {
        let mut state = self.state();
        state.mounted = false;
        state.rows.clear();
        tracing::debug!(widget = %self.name, "unmounted");
        Ok(())
    }

    fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let colors = &theme.colors;
        let state = self.state();
        let visible = state.visible();

        let height = area.height.saturating_sub(3) as usize;
        let first = state.selected.saturating_sub(height.saturating_sub(1));

        let mut lines = vec![Line::from(Span::styled(
            format!(" {:<14} {:<28} {:<12} {}", "ID", "NAME", "STATUS", "DETAIL"),
            Style::default()
                .fg(colors.muted())
                .add_modifier(Modifier::BOLD),
        ))];
        for (i, entity) in visible.iter().enumerate().skip(first).take(height) {
            let id: String = entity.id.chars().take(12).collect();
            let text = format!(
                " {:<14} {:<28} {:<12} {}",
                id, entity.name, entity.status, entity.detail
            );
            let style = if i == state.selected {
                Style::default()
                    .fg(colors.fg())
                    .bg(colors.selection_bg())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };
            lines.push(Line::from(Span::styled(text, style)));
        }

        let mut title = format!(" {}s ({}) sort: {} ", self.kind, visible.len(), state.sort.as_str());
        if let Some(pattern) = &state.filter {
            title.push_str(&format!("filter: {pattern} "));
        }
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        Paragraph::new(lines).block(block).render(area, buf);
    }
}

impl ActionableWidget for EntityList {
    fn on_event(
        &self,
        action: &mut dyn FnMut(&str) -> Result<(), ActionError>,
    ) -> Result<(), ActionError> {
        let id = self.selected_id().ok_or(ActionError::NoSelection)?;
        action(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{Fixture, InMemoryBackend, Op};

    fn entity(id: &str, name: &str, status: &str) -> Entity {
        Entity {
            id: id.to_string(),
            kind: EntityKind::Container,
            name: name.to_string(),
            status: status.to_string(),
            detail: String::new(),
            command: String::new(),
        }
    }

    fn list() -> (EntityList, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new(Fixture {
            entities: vec![
                entity("c3", "cache", "running"),
                entity("c1", "web", "exited"),
                entity("c2", "api", "running"),
            ],
            ..Fixture::default()
        }));
        (EntityList::new(EntityKind::Container, backend.clone()), backend)
    }

    fn names(list: &EntityList) -> Vec<String> {
        list.visible_rows().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn mount_loads_sorted_rows() {
        let (list, _) = list();
        assert!(!list.is_mounted());
        list.mount().unwrap();
        assert!(list.is_mounted());
        assert_eq!(names(&list), vec!["api", "cache", "web"]);
        assert_eq!(list.selected_id().as_deref(), Some("c2"));
    }

    #[test]
    fn mount_failure_leaves_list_unmounted() {
        let (list, backend) = list();
        backend.fail(Op::List, "daemon down");
        let err = list.mount().unwrap_err();
        assert!(err.to_string().contains("daemon down"));
        assert!(!list.is_mounted());
    }

    #[test]
    fn sort_cycles_columns() {
        let (list, _) = list();
        list.mount().unwrap();
        list.sort();
        assert_eq!(list.sort_mode(), SortMode::Id);
        assert_eq!(names(&list), vec!["web", "api", "cache"]);
        list.sort();
        assert_eq!(names(&list), vec!["web", "api", "cache"]);
        list.sort();
        assert_eq!(list.sort_mode(), SortMode::Name);
    }

    #[test]
    fn filter_matches_name_or_id_and_blank_clears() {
        let (list, _) = list();
        list.mount().unwrap();
        list.filter("WE");
        assert_eq!(names(&list), vec!["web"]);
        list.filter("c3");
        assert_eq!(names(&list), vec!["cache"]);
        list.filter("  ");
        assert_eq!(list.filter_pattern(), None);
        assert_eq!(names(&list).len(), 3);
    }

    #[test]
    fn selection_is_clamped() {
        let (list, _) = list();
        list.mount().unwrap();
        list.move_selection(10);
        assert_eq!(list.selected_id().as_deref(), Some("c1"));
        list.move_selection(-10);
        assert_eq!(list.selected_id().as_deref(), Some("c2"));
        list.select_last();
        assert_eq!(list.selected_id().as_deref(), Some("c1"));
    }

    #[test]
    fn on_event_passes_selected_id() {
        let (list, _) = list();
        list.mount().unwrap();
        list.move_selection(1);
        let mut seen = Vec::new();
        list.on_event(&mut |id| {
            seen.push(id.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["c3"]);
    }

    #[test]
    fn on_event_without_selection_skips_action() {
        let (list, _) = list();
        let mut called = false;
        let err = list
            .on_event(&mut |_| {
                called = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ActionError::NoSelection));
        assert!(!called);
    }

    #[test]
    fn unmount_drops_rows() {
        let (list, _) = list();
        list.mount().unwrap();
        list.unmount().unwrap();
        assert!(!list.is_mounted());
        assert!(list.visible_rows().is_empty());
    }
}
