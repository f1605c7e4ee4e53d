use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    TabularRows,
    Structured,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    TabularRows(Vec<Row>),
    Structured(Value),
    Text(String),
}

impl ResponsePayload {
    #[must_use]
    pub fn shape(&self) -> ResponseShape {
        match self {
            Self::TabularRows(_) => ResponseShape::TabularRows,
            Self::Structured(_) => ResponseShape::Structured,
            Self::Text(_) => ResponseShape::Text,
        }
    }
}

#[must_use]
pub fn classify(body: &str) -> ResponsePayload {
    if let Ok(rows) = serde_json::from_str::<Vec<Row>>(body) {
        return ResponsePayload::TabularRows(rows);
    }
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return ResponsePayload::Structured(value);
    }
    ResponsePayload::Text(body.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub status: u16,
    pub payload: ResponsePayload,
    pub raw: String,
}

impl QueryOutcome {
    #[must_use]
    pub fn from_body(status: u16, raw: String) -> Self {
        Self {
            status,
            payload: classify(&raw),
            raw,
        }
    }

    #[must_use]
    pub fn shape(&self) -> ResponseShape {
        self.payload.shape()
    }

    #[must_use]
    pub fn printable(&self) -> String {
        let rendered = match &self.payload {
            ResponsePayload::TabularRows(rows) => serde_json::to_string_pretty(rows),
            ResponsePayload::Structured(value) => serde_json::to_string_pretty(value),
            ResponsePayload::Text(_) => return self.raw.clone(),
        };
        rendered.unwrap_or_else(|_| self.raw.clone())
    }
}
