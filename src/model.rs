use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Choice,
    Signature,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Choice => "choice",
            Self::Signature => "signature",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub display: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldShape {
    Text { length: usize },
    Date,
    Choice { options: Vec<ChoiceOption> },
    Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub shape: FieldShape,
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldKind {
        match self.shape {
            FieldShape::Text { .. } => FieldKind::Text,
            FieldShape::Date => FieldKind::Date,
            FieldShape::Choice { .. } => FieldKind::Choice,
            FieldShape::Signature => FieldKind::Signature,
        }
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match &self.shape {
            FieldShape::Choice { options } => options,
            _ => &[],
        }
    }

    /// Value a freshly rendered form starts with for this field.
    pub fn initial_value(&self) -> FieldValue {
        match &self.shape {
            FieldShape::Text { .. } => FieldValue::Text(String::new()),
            FieldShape::Date => FieldValue::Date(Local::now().naive_local()),
            FieldShape::Choice { .. } => FieldValue::Choice(
                self.options()
                    .first()
                    .map(|option| option.token.clone())
                    .unwrap_or_default(),
            ),
            FieldShape::Signature => FieldValue::Signature(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDateTime),
    /// Unparsed date input, kept so validation can report it.
    RawDate(String),
    Choice(String),
    /// SVG path data, one entry per completed stroke.
    Signature(Vec<String>),
    Unexpected(Value),
}

impl FieldValue {
    /// Decodes a JSON answer according to the kind of field it belongs to.
    pub fn from_json(kind: FieldKind, value: Value) -> Self {
        match (kind, value) {
            (FieldKind::Text, Value::String(text)) => Self::Text(text),
            (FieldKind::Date, Value::String(text)) => match parse_date(&text) {
                Some(date) => Self::Date(date),
                None => Self::RawDate(text),
            },
            (FieldKind::Choice, Value::String(token)) => Self::Choice(token),
            (FieldKind::Signature, Value::Null) => Self::Signature(Vec::new()),
            (FieldKind::Signature, Value::Array(items)) => {
                let strokes: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(ToOwned::to_owned))
                    .collect();
                match strokes {
                    Some(strokes) => Self::Signature(strokes),
                    None => Self::Unexpected(Value::Array(items)),
                }
            }
            (_, other) => Self::Unexpected(other),
        }
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.naive_local());
    }

    ["%d/%m/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSchemaManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source: String,
    pub source_sha256: String,
    pub field_count: usize,
    pub fields: Vec<FieldDescriptor>,
    pub initial_values: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub generated_at: String,
    pub source: String,
    pub answers: String,
    pub field_count: usize,
    pub ignored_answers: Vec<String>,
    pub issue_count: usize,
    pub issues: Vec<FieldIssue>,
}
