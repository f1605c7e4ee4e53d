use std::rc::Rc;

use dbx_core::focus::Pane;
use dbx_core::result_model::ResultModel;
use ratatui::layout::{Constraint, Direction, Flex, Layout, Position, Rect};

pub(crate) const COLUMN_SPACING: u16 = 1;
const HISTORY_WIDTH: u16 = 30;
const CONNECTION_WIDTH: u16 = 20;
const EDITOR_HEIGHT: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaneAreas {
    pub connection: Rect,
    pub banner: Rect,
    pub history: Rect,
    pub preview: Rect,
    pub editor: Rect,
    pub results: Rect,
    pub detail: Rect,
    pub raw: Rect,
    pub status: Rect,
}

impl PaneAreas {
    /// Focusable pane under `position`. The preview and bars are not panes.
    pub(crate) fn pane_at(&self, position: Position) -> Option<Pane> {
        [
            (self.editor, Pane::Editor),
            (self.history, Pane::History),
            (self.results, Pane::Results),
            (self.detail, Pane::Detail),
            (self.raw, Pane::Raw),
        ]
        .into_iter()
        .find(|(area, _)| area.contains(position))
        .map(|(_, pane)| pane)
    }
}

pub(crate) fn pane_areas(area: Rect) -> PaneAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(CONNECTION_WIDTH), Constraint::Min(0)])
        .split(rows[0]);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(HISTORY_WIDTH), Constraint::Min(20)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(2, 3), Constraint::Ratio(1, 3)])
        .split(body[0]);
    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(EDITOR_HEIGHT),
            Constraint::Fill(2),
            Constraint::Fill(1),
        ])
        .split(body[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(center[2]);

    PaneAreas {
        connection: top[0],
        banner: top[1],
        history: left[0],
        preview: left[1],
        editor: center[0],
        results: center[1],
        detail: bottom[0],
        raw: bottom[1],
        status: rows[2],
    }
}

/// Area inside a one-cell border.
pub(crate) fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

/// Data rows that fit under the header of a bordered table.
pub(crate) fn table_capacity(area: Rect) -> usize {
    usize::from(inner(area).height.saturating_sub(1))
}

pub(crate) fn list_capacity(area: Rect) -> usize {
    usize::from(inner(area).height)
}

/// Keeps `selected` inside a window of `capacity` rows starting at `offset`,
/// moving the window as little as possible.
pub(crate) fn follow(offset: usize, selected: usize, capacity: usize) -> usize {
    if capacity == 0 || selected < offset {
        return selected;
    }
    if selected >= offset + capacity {
        return selected + 1 - capacity;
    }
    offset
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableHit {
    Header(usize),
    Row { index: usize, column: Option<usize> },
}

/// Screen cells of each results column on the header line, laid out exactly
/// as the table widget lays them out. Widths shrink once they overflow the pane.
pub(crate) fn column_areas(area: Rect, model: &ResultModel) -> Rc<[Rect]> {
    let widths = model
        .columns()
        .iter()
        .map(|column| Constraint::Length(u16::try_from(column.width).unwrap_or(u16::MAX)))
        .collect::<Vec<_>>();
    Layout::horizontal(widths)
        .flex(Flex::Start)
        .spacing(COLUMN_SPACING)
        .split(Rect {
            height: 1,
            ..inner(area)
        })
}

pub(crate) fn table_hit(
    area: Rect,
    model: &ResultModel,
    offset: usize,
    position: Position,
) -> Option<TableHit> {
    let inner = inner(area);
    if !inner.contains(position) {
        return None;
    }
    let column = column_areas(area, model).iter().position(|column| {
        position.x >= column.x && position.x < column.right().saturating_add(COLUMN_SPACING)
    });
    if position.y == inner.y {
        return column.map(TableHit::Header);
    }

    let index = offset + usize::from(position.y - inner.y - 1);
    (index < model.len()).then_some(TableHit::Row { index, column })
}

/// Index of the list entry under `position`, if any.
pub(crate) fn list_hit(area: Rect, offset: usize, len: usize, position: Position) -> Option<usize> {
    let inner = inner(area);
    if !inner.contains(position) {
        return None;
    }
    let index = offset + usize::from(position.y - inner.y);
    (index < len).then_some(index)
}

#[cfg(test)]
mod tests {
    use dbx_core::focus::Pane;
    use dbx_core::result_model::ResultModel;
    use ratatui::layout::{Position, Rect};
    use serde_json::json;

    use super::{column_areas, follow, inner, list_hit, pane_areas, table_hit, TableHit};

    fn model() -> ResultModel {
        model_from(&json!([
            {"id": 1, "name": "alpha"},
            {"id": 2, "name": "beta"},
            {"id": 3, "name": "gamma"}
        ]))
    }

    fn model_from(rows: &serde_json::Value) -> ResultModel {
        let rows = rows
            .as_array()
            .expect("array literal")
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect();
        ResultModel::from_rows(rows, 40)
    }

    #[test]
    fn every_pane_is_reachable_by_pointer() {
        let areas = pane_areas(Rect::new(0, 0, 120, 40));
        for pane in Pane::ALL {
            let area = match pane {
                Pane::Editor => areas.editor,
                Pane::History => areas.history,
                Pane::Results => areas.results,
                Pane::Detail => areas.detail,
                Pane::Raw => areas.raw,
            };
            let center = Position::new(area.x + area.width / 2, area.y + area.height / 2);
            assert_eq!(areas.pane_at(center), Some(pane));
        }
        assert_eq!(areas.pane_at(Position::new(0, 0)), None);
    }

    #[test]
    fn follow_moves_window_only_when_selection_leaves_it() {
        assert_eq!(follow(0, 3, 10), 0);
        assert_eq!(follow(0, 12, 10), 3);
        assert_eq!(follow(5, 2, 10), 2);
        assert_eq!(follow(5, 14, 10), 5);
    }

    #[test]
    fn header_click_resolves_column_by_width() {
        let area = Rect::new(10, 5, 60, 10);
        let model = model();
        let widths = model
            .columns()
            .iter()
            .map(|column| column.width)
            .collect::<Vec<_>>();
        let header_y = inner(area).y;
        let first_x = inner(area).x;
        let second_x = first_x + u16::try_from(widths[0] + 1).expect("small width");

        assert_eq!(
            table_hit(area, &model, 0, Position::new(first_x, header_y)),
            Some(TableHit::Header(0))
        );
        assert_eq!(
            table_hit(area, &model, 0, Position::new(second_x, header_y)),
            Some(TableHit::Header(1))
        );
        assert_eq!(
            table_hit(area, &model, 0, Position::new(inner(area).right() - 1, header_y)),
            None
        );
    }

    #[test]
    fn overflowing_columns_are_hit_where_they_are_drawn() {
        let wide = "x".repeat(60);
        let model = model_from(&json!([
            {"aaa": wide, "bbb": wide, "ccc": wide, "ddd": 1}
        ]));
        let area = Rect::new(0, 0, 90, 10);
        let columns = column_areas(area, &model);
        let header_y = inner(area).y;

        assert_eq!(columns.len(), 4);
        assert!(columns[3].right() <= inner(area).right());
        for (index, column) in columns.iter().enumerate() {
            assert_eq!(
                table_hit(area, &model, 0, Position::new(column.x, header_y)),
                Some(TableHit::Header(index))
            );
        }
    }

    #[test]
    fn row_click_accounts_for_offset_and_ignores_empty_space() {
        let area = Rect::new(0, 0, 60, 10);
        let model = model();
        let x = inner(area).x;
        let first_data_y = inner(area).y + 1;

        assert_eq!(
            table_hit(area, &model, 1, Position::new(x, first_data_y)),
            Some(TableHit::Row {
                index: 1,
                column: Some(0)
            })
        );
        assert_eq!(
            table_hit(area, &model, 0, Position::new(x, first_data_y + 5)),
            None
        );
        assert_eq!(table_hit(area, &model, 0, Position::new(0, 0)), None);
    }

    #[test]
    fn list_click_maps_to_entry() {
        let area = Rect::new(0, 0, 30, 12);
        assert_eq!(list_hit(area, 0, 4, Position::new(2, 1)), Some(0));
        assert_eq!(list_hit(area, 2, 4, Position::new(2, 2)), Some(3));
        assert_eq!(list_hit(area, 0, 4, Position::new(2, 8)), None);
    }
}
