use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::field::{FieldSpec, FieldType};

/// Metadata for one selected file; contents never enter the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            reference: None,
        }
    }
}

/// Current value of one field slot.
///
/// Untagged on the wire: strings, booleans, numbers, string arrays, and
/// file-handle arrays map directly onto JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(f64),
    List(Vec<String>),
    Files(Vec<FileHandle>),
}

impl FieldValue {
    /// Whether the value counts as unanswered: empty string, `false`,
    /// or an empty list. A number is never empty once present.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Bool(flag) => !flag,
            FieldValue::Number(_) => false,
            FieldValue::List(entries) => entries.is_empty(),
            FieldValue::Files(files) => files.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&[FileHandle]> {
        match self {
            FieldValue::Files(files) => Some(files),
            _ => None,
        }
    }

    pub fn type_label(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::List(_) => "list",
            FieldValue::Files(_) => "files",
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The empty value a field starts at when no default is supplied.
    /// Number fields start unset instead of at a sentinel.
    pub fn empty_for(spec: &FieldSpec) -> Option<FieldValue> {
        match spec.kind {
            FieldType::Number => None,
            FieldType::Checkbox => Some(FieldValue::Bool(false)),
            FieldType::File => Some(FieldValue::Files(Vec::new())),
            FieldType::Select if spec.multiple => Some(FieldValue::List(Vec::new())),
            _ => Some(FieldValue::Text(String::new())),
        }
    }
}

/// Mutable working record for one form session: field name → current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the form-open record: caller defaults where given, the
    /// field's empty value otherwise. Defaults naming unknown fields are
    /// dropped.
    pub fn seeded(fields: &[FieldSpec], defaults: &BTreeMap<String, FieldValue>) -> Self {
        let mut values = BTreeMap::new();
        for field in fields {
            if let Some(value) = defaults.get(&field.name) {
                values.insert(field.name.clone(), value.clone());
            } else if let Some(empty) = FieldValue::empty_for(field) {
                values.insert(field.name.clone(), empty);
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn clear(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    /// Whether the field holds a non-empty value.
    pub fn is_filled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Serializable envelope for a record that passed final validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub form_id: String,
    pub schema_version: String,
    pub values: Record,
}

impl SubmissionRecord {
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
