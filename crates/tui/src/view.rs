use dbx_core::connection::ConnectionStatus;
use dbx_core::focus::Pane;
use dbx_core::session::{DetailView, StatusLevel};
use ratatui::layout::{Constraint, Flex, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use crate::layout::{
    column_areas, inner, list_capacity, pane_areas, table_capacity, PaneAreas, COLUMN_SPACING,
};
use crate::TuiApp;

const BANNER: &str = "dbx query workbench";

pub(crate) fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let areas = pane_areas(frame.area());

    render_connection(frame, app, areas.connection);
    let banner = Paragraph::new(Line::from(vec![
        Span::styled(
            BANNER,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(app.endpoint.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(banner, areas.banner);

    render_history(frame, app, &areas);
    render_editor(frame, app, areas.editor);
    render_results(frame, app, areas.results);
    render_detail(frame, app, areas.detail);

    let raw = Paragraph::new(app.session.raw_output())
        .block(pane_block(app, Pane::Raw, Pane::Raw.title().to_string()))
        .wrap(Wrap { trim: false })
        .scroll((app.raw_scroll, 0));
    frame.render_widget(raw, areas.raw);

    let status = app.session.status();
    let color = match status.level {
        StatusLevel::Info => Color::White,
        StatusLevel::Success => Color::Green,
        StatusLevel::Warning => Color::Yellow,
        StatusLevel::Error => Color::Red,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(status.text.as_str(), Style::default().fg(color))),
        areas.status,
    );
}

fn pane_block(app: &TuiApp, pane: Pane, title: String) -> Block<'static> {
    let border = if app.session.focus() == pane {
        Color::Green
    } else {
        Color::White
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn render_connection(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let status = app.session.connection();
    let color = match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Unknown | ConnectionStatus::ServerError => Color::Yellow,
        ConnectionStatus::Disconnected => Color::Red,
    };
    let line = Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::raw(status.label()),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Connection")),
        area,
    );
}

fn render_history(frame: &mut Frame<'_>, app: &TuiApp, areas: &PaneAreas) {
    let entries = app.session.visible_history();
    let cursor = app.session.history_cursor();
    let lines = entries
        .iter()
        .enumerate()
        .skip(app.history_offset)
        .take(list_capacity(areas.history))
        .map(|(index, entry)| {
            let style = if index == cursor {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::styled(entry.label().replace('\n', " "), style)
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(lines).block(pane_block(
            app,
            Pane::History,
            format!("{} ({})", Pane::History.title(), entries.len()),
        )),
        areas.history,
    );

    let preview = match app.session.history_preview() {
        Some(preview) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Time: ", Style::default().fg(Color::Yellow)),
                    Span::raw(preview.time),
                ]),
                Line::from(""),
                Line::styled("Query:", Style::default().fg(Color::Yellow)),
            ];
            lines.extend(preview.query.lines().map(|line| Line::from(line.to_string())));
            lines
        }
        None => vec![Line::styled(
            "No history available",
            Style::default().fg(Color::DarkGray),
        )],
    };
    frame.render_widget(
        Paragraph::new(preview)
            .block(Block::default().borders(Borders::ALL).title("Preview"))
            .wrap(Wrap { trim: false }),
        areas.preview,
    );
}

fn render_editor(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let text = app.session.editor_text();
    frame.render_widget(
        Paragraph::new(text).block(pane_block(
            app,
            Pane::Editor,
            "Query (Enter run, Alt+Enter newline)".to_string(),
        )),
        area,
    );

    if app.session.focus() != Pane::Editor {
        return;
    }
    let inner = inner(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }
    let line_count = text.split('\n').count();
    let last_line = text.rsplit('\n').next().unwrap_or_default();
    let column = u16::try_from(last_line.chars().count())
        .unwrap_or(u16::MAX)
        .min(inner.width - 1);
    let row = u16::try_from(line_count.saturating_sub(1))
        .unwrap_or(u16::MAX)
        .min(inner.height - 1);
    frame.set_cursor_position(Position::new(inner.x + column, inner.y + row));
}

fn render_results(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let block = pane_block(app, Pane::Results, app.session.results_title());
    let Some(model) = app.session.model() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let focused = app.session.focus() == Pane::Results;
    let selected_column = app.session.selected_column();
    let header = Row::new(model.header_cells().into_iter().enumerate().map(|(index, name)| {
        let mut style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        if focused && index == selected_column {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        Cell::from(name).style(style)
    }));

    let selected_row = app.session.selected_row();
    let rows = (app.results_offset..model.len())
        .take(table_capacity(area))
        .filter_map(|index| {
            let cells = model.rendered_row(index)?;
            let style = if selected_row == Some(index) {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            Some(Row::new(cells).style(style))
        })
        .collect::<Vec<_>>();
    let widths = column_areas(area, model)
        .iter()
        .map(|column| Constraint::Length(column.width))
        .collect::<Vec<_>>();

    frame.render_widget(
        Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(COLUMN_SPACING)
            .flex(Flex::Start),
        area,
    );
}

fn render_detail(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let lines = match app.session.detail_view() {
        DetailView::Row {
            position,
            total,
            lines,
        } => {
            let header = Line::styled(
                format!("Row {position}/{total}"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
            std::iter::once(header)
                .chain(lines.into_iter().map(|line| {
                    Line::from(vec![
                        Span::styled(format!("{}:", line.key), Style::default().fg(Color::Cyan)),
                        Span::raw(format!(" {}", line.value)),
                    ])
                }))
                .collect::<Vec<_>>()
        }
        DetailView::Message(message) => {
            vec![Line::styled(message, Style::default().fg(Color::Yellow))]
        }
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(pane_block(app, Pane::Detail, Pane::Detail.title().to_string()))
            .wrap(Wrap { trim: false })
            .scroll((app.detail_scroll, 0)),
        area,
    );
}
