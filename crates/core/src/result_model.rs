use serde_json::Value;

use crate::render::{cell_text, column_width, detail_lines, truncate, DetailLine};
use crate::response::{ResponsePayload, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub width: usize,
}

/// Columns are the sorted keys of the first row; later rows may carry more or
/// fewer keys without changing the column set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultModel {
    columns: Vec<Column>,
    rows: Vec<Row>,
    sort_column: Option<usize>,
    sort_ascending: bool,
    max_column_width: usize,
}

impl ResultModel {
    #[must_use]
    pub fn from_rows(rows: Vec<Row>, max_column_width: usize) -> Self {
        let mut model = Self {
            columns: Vec::new(),
            rows,
            sort_column: None,
            sort_ascending: true,
            max_column_width,
        };
        model.recompute_columns();
        model
    }

    #[must_use]
    pub fn project(payload: &ResponsePayload, max_column_width: usize) -> Option<Self> {
        match payload {
            ResponsePayload::TabularRows(rows) => {
                Some(Self::from_rows(rows.clone(), max_column_width))
            }
            ResponsePayload::Structured(Value::Array(items)) => {
                let rows = items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect::<Vec<_>>();
                if rows.is_empty() {
                    None
                } else {
                    Some(Self::from_rows(rows, max_column_width))
                }
            }
            ResponsePayload::Structured(_) | ResponsePayload::Text(_) => None,
        }
    }

    fn recompute_columns(&mut self) {
        let Some(first) = self.rows.first() else {
            self.columns.clear();
            return;
        };

        let mut names = first.keys().cloned().collect::<Vec<_>>();
        names.sort();
        self.columns = names
            .into_iter()
            .map(|name| Column {
                width: column_width(&name, &self.rows, self.max_column_width),
                name,
            })
            .collect();
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn sort_column(&self) -> Option<usize> {
        self.sort_column
    }

    #[must_use]
    pub fn sort_ascending(&self) -> bool {
        self.sort_ascending
    }

    /// Values compare as text, so `"10" < "9"`.
    pub fn sort_by_column(&mut self, index: usize) -> bool {
        let Some(column) = self.columns.get(index) else {
            return false;
        };
        let name = column.name.clone();

        if self.sort_column == Some(index) {
            self.sort_ascending = !self.sort_ascending;
        } else {
            self.sort_column = Some(index);
            self.sort_ascending = true;
        }

        let ascending = self.sort_ascending;
        self.rows.sort_by(|left, right| {
            let ordering = cell_text(left, &name).cmp(&cell_text(right, &name));
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        self.recompute_columns();
        true
    }

    #[must_use]
    pub fn header_cells(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| truncate(&column.name, column.width))
            .collect()
    }

    #[must_use]
    pub fn rendered_row(&self, index: usize) -> Option<Vec<String>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|column| truncate(&cell_text(row, &column.name), column.width))
                .collect(),
        )
    }

    #[must_use]
    pub fn detail(&self, index: usize) -> Option<Vec<DetailLine>> {
        self.rows.get(index).map(detail_lines)
    }

    #[must_use]
    pub fn title(&self) -> String {
        let mut title = format!("Results ({} rows)", self.rows.len());
        if let Some(column) = self.sort_column.and_then(|index| self.columns.get(index)) {
            let arrow = if self.sort_ascending { '↑' } else { '↓' };
            title.push_str(&format!(" [sorted by {} {arrow}]", column.name));
        }
        title
    }
}
