use serde_json::Value;

use crate::config::MIN_COLUMN_WIDTH;
use crate::response::Row;

pub const ELLIPSIS: char = '…';
pub const WIDTH_SAMPLE_ROWS: usize = 5;
pub const DETAIL_VALUE_LIMIT: usize = 200;

#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(stringify).collect::<Vec<_>>().join(" ")
        ),
        Value::Object(fields) => {
            let mut pairs = fields
                .iter()
                .map(|(key, value)| format!("{key}:{}", stringify(value)))
                .collect::<Vec<_>>();
            pairs.sort();
            format!("{{{}}}", pairs.join(" "))
        }
    }
}

#[must_use]
pub fn cell_text(row: &Row, column: &str) -> String {
    row.get(column).map(stringify).unwrap_or_default()
}

#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut = text
        .chars()
        .take(width.saturating_sub(1))
        .collect::<String>();
    cut.push(ELLIPSIS);
    cut
}

/// Width from the header and the first few rows only, within
/// `[MIN_COLUMN_WIDTH, max_width]`.
#[must_use]
pub fn column_width(name: &str, rows: &[Row], max_width: usize) -> usize {
    let sampled = rows
        .iter()
        .take(WIDTH_SAMPLE_ROWS)
        .map(|row| cell_text(row, name).chars().count())
        .max()
        .unwrap_or(0);

    MIN_COLUMN_WIDTH
        .max(name.chars().count())
        .max(sampled)
        .min(max_width.max(MIN_COLUMN_WIDTH))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLine {
    pub key: String,
    pub value: String,
}

#[must_use]
pub fn detail_lines(row: &Row) -> Vec<DetailLine> {
    let mut keys = row.keys().collect::<Vec<_>>();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let mut value = stringify(&row[key]);
            if value.chars().count() > DETAIL_VALUE_LIMIT {
                value = value.chars().take(DETAIL_VALUE_LIMIT).collect();
                value.push(ELLIPSIS);
            }
            DetailLine {
                key: key.clone(),
                value,
            }
        })
        .collect()
}
