use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Record;
use crate::spec::field::FieldSpec;
use crate::spec::validation::CrossFieldRule;
use crate::validate::{ValidationOutcome, Validator};

/// Authored form document: ordered fields plus cross-field rules.
///
/// Field order is display and tab order. The document is pure data; it
/// becomes usable once compiled into a [`FormSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<CrossFieldRule>,
}

/// Schema-authoring failures; the only error class that halts form setup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form spec: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("field '{name}': {detail}")]
    ConstraintMismatch { name: String, detail: String },
    #[error("field '{name}': invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{name}': invalid accept filter: {source}")]
    InvalidAccept {
        name: String,
        #[source]
        source: globset::Error,
    },
    #[error("cross-field rule '{rule}' references unknown field '{field}'")]
    UnknownRuleField { rule: String, field: String },
    #[error("cross-field rule '{0}' blames no fields")]
    UnblamedRule(String),
}

/// Compiled form: the authored spec plus the validator built from it.
///
/// Compiling is the construction boundary — an inconsistent document is
/// refused here rather than rendered.
#[derive(Debug, Clone)]
pub struct FormSchema {
    spec: FormSpec,
    validator: Validator,
}

impl FormSchema {
    pub fn compile(spec: FormSpec) -> Result<Self, SchemaError> {
        let validator = Validator::compile(&spec)?;
        Ok(Self { spec, validator })
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let spec: FormSpec = serde_json::from_str(json)?;
        Self::compile(spec)
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }

    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.spec.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.spec.fields.iter().find(|field| field.name == name)
    }

    /// Checks a record against the compiled validator.
    pub fn validate(&self, record: &Record) -> ValidationOutcome {
        self.validator.validate(record)
    }
}
