use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::Serialize;

use crate::record::{FieldValue, Record};
use crate::spec::field::{Constraint, FieldType, FileConstraint};
use crate::spec::form::{FormSpec, SchemaError};
use crate::spec::validation::CrossFieldRule;

/// One validation failure attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Field name → ordered failures for that field.
pub type ErrorMap = BTreeMap<String, Vec<FieldError>>;

/// Outcome of checking a record; recomputed from scratch on every check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Accepted,
    Rejected(ErrorMap),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    pub fn errors(&self) -> Option<&ErrorMap> {
        match self {
            ValidationOutcome::Accepted => None,
            ValidationOutcome::Rejected(errors) => Some(errors),
        }
    }

    pub fn errors_for(&self, field: &str) -> &[FieldError] {
        self.errors()
            .and_then(|errors| errors.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn from_errors(errors: ErrorMap) -> Self {
        if errors.is_empty() {
            ValidationOutcome::Accepted
        } else {
            ValidationOutcome::Rejected(errors)
        }
    }
}

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern compiles"));
static URL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("static pattern compiles"));
static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ().-]{5,}$").expect("static pattern compiles"));
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static pattern compiles"));

fn plausible_date(text: &str) -> bool {
    let Some(caps) = DATE_SHAPE.captures(text) else {
        return false;
    };
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Compiled validation pipeline for one schema: per-field checks with
/// pre-built regexes, option sets, and accept globs, followed by the
/// cross-field rules. `validate` is a pure function of this and the record.
#[derive(Debug, Clone)]
pub struct Validator {
    checks: Vec<FieldCheck>,
    rules: Vec<CrossFieldRule>,
}

#[derive(Debug, Clone)]
struct FieldCheck {
    name: String,
    kind: FieldType,
    required: bool,
    constraint: Constraint,
    pattern: Option<Regex>,
    allowed: Vec<String>,
    multiple: bool,
    file: FileConstraint,
    accept: Option<GlobSet>,
}

impl Validator {
    pub fn compile(spec: &FormSpec) -> Result<Self, SchemaError> {
        let mut names = BTreeSet::new();
        let mut checks = Vec::with_capacity(spec.fields.len());

        for field in &spec.fields {
            if !names.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            checks.push(FieldCheck::compile(field)?);
        }

        for (index, rule) in spec.rules.iter().enumerate() {
            let label = rule
                .id
                .clone()
                .unwrap_or_else(|| format!("#{}", index + 1));
            if rule.fields.is_empty() {
                return Err(SchemaError::UnblamedRule(label));
            }
            let mut referenced = rule.fields.clone();
            rule.condition.referenced_fields(&mut referenced);
            for name in referenced {
                if !names.contains(&name) {
                    return Err(SchemaError::UnknownRuleField {
                        rule: label,
                        field: name,
                    });
                }
            }
        }

        Ok(Self {
            checks,
            rules: spec.rules.clone(),
        })
    }

    pub fn validate(&self, record: &Record) -> ValidationOutcome {
        let mut errors = ErrorMap::new();

        for check in &self.checks {
            let field_errors = check.run(record);
            if !field_errors.is_empty() {
                errors.entry(check.name.clone()).or_default().extend(field_errors);
            }
        }

        for rule in &self.rules {
            if rule.condition.evaluate(record) == Some(false) {
                let code = rule.code.clone().unwrap_or_else(|| "cross_field".into());
                for field in &rule.fields {
                    errors
                        .entry(field.clone())
                        .or_default()
                        .push(FieldError::new(rule.message.clone(), code.clone()));
                }
            }
        }

        ValidationOutcome::from_errors(errors)
    }
}

impl FieldCheck {
    fn compile(field: &crate::spec::field::FieldSpec) -> Result<Self, SchemaError> {
        let mismatch = |detail: &str| SchemaError::ConstraintMismatch {
            name: field.name.clone(),
            detail: detail.to_string(),
        };

        match &field.options {
            Some(_) if !field.kind.is_choice() => {
                return Err(mismatch("declares options but is not a select or radio field"));
            }
            Some(options) => {
                let mut values = BTreeSet::new();
                for option in options {
                    if !values.insert(option.value.as_str()) {
                        return Err(mismatch(&format!(
                            "declares duplicate option value '{}'",
                            option.value
                        )));
                    }
                }
            }
            None => {}
        }
        if field.kind.is_choice()
            && field.options.as_ref().map(Vec::len).unwrap_or(0) == 0
        {
            return Err(mismatch("is a choice field but declares no options"));
        }
        if field.multiple && field.kind != FieldType::Select {
            return Err(mismatch("sets multiple outside a select field"));
        }
        if field.rows.is_some() && field.kind != FieldType::Textarea {
            return Err(mismatch("sets rows outside a textarea field"));
        }
        if field.file.is_some() && field.kind != FieldType::File {
            return Err(mismatch("declares file limits but is not a file field"));
        }

        let constraint = field.constraint.clone().unwrap_or_default();
        if (constraint.min_len.is_some() || constraint.max_len.is_some())
            && !field.kind.is_textual()
        {
            return Err(mismatch("declares length bounds but is not a textual field"));
        }
        if (constraint.min.is_some() || constraint.max.is_some())
            && field.kind != FieldType::Number
        {
            return Err(mismatch("declares numeric bounds but is not a number field"));
        }
        if constraint.pattern.is_some() && !field.kind.is_textual() {
            return Err(mismatch("declares a pattern but is not a textual field"));
        }
        if let (Some(min), Some(max)) = (constraint.min, constraint.max)
            && min > max
        {
            return Err(mismatch("has inverted numeric bounds"));
        }
        if let (Some(min_len), Some(max_len)) = (constraint.min_len, constraint.max_len)
            && min_len > max_len
        {
            return Err(mismatch("has inverted length bounds"));
        }

        let pattern = match &constraint.pattern {
            Some(source) => Some(Regex::new(source).map_err(|source| {
                SchemaError::InvalidPattern {
                    name: field.name.clone(),
                    source,
                }
            })?),
            None => None,
        };

        let file = field.file.clone().unwrap_or_default();
        let accept = match &file.accept {
            Some(filter) => compile_accept(filter).map_err(|source| SchemaError::InvalidAccept {
                name: field.name.clone(),
                source,
            })?,
            None => None,
        };

        Ok(Self {
            name: field.name.clone(),
            kind: field.kind,
            required: field.required,
            constraint,
            pattern,
            allowed: field.option_values(),
            multiple: field.multiple,
            file,
            accept,
        })
    }

    fn run(&self, record: &Record) -> Vec<FieldError> {
        let Some(value) = record.get(&self.name) else {
            return if self.required {
                vec![FieldError::new("required", "required")]
            } else {
                Vec::new()
            };
        };
        if value.is_empty() {
            return if self.required {
                vec![FieldError::new("required", "required")]
            } else {
                Vec::new()
            };
        }
        if !self.matches_shape(value) {
            return vec![FieldError::new("type mismatch", "type_mismatch")];
        }

        let mut errors = Vec::new();
        match self.kind {
            FieldType::Text
            | FieldType::Email
            | FieldType::Password
            | FieldType::Phone
            | FieldType::Url
            | FieldType::Date
            | FieldType::Textarea => {
                if let Some(text) = value.as_text() {
                    self.check_text(text, &mut errors);
                    self.check_shape(text, &mut errors);
                }
            }
            FieldType::Number => {
                if let Some(number) = value.as_number() {
                    self.check_bounds(number, &mut errors);
                }
            }
            FieldType::Select if self.multiple => {
                if let Some(entries) = value.as_list() {
                    for entry in entries {
                        self.check_option(entry, &mut errors);
                    }
                }
            }
            FieldType::Select | FieldType::Radio => {
                if let Some(text) = value.as_text() {
                    self.check_option(text, &mut errors);
                }
            }
            FieldType::Checkbox => {}
            FieldType::File => {
                if let Some(files) = value.as_files() {
                    self.check_files(files, &mut errors);
                }
            }
        }
        errors
    }

    fn matches_shape(&self, value: &FieldValue) -> bool {
        match self.kind {
            FieldType::Number => matches!(value, FieldValue::Number(_)),
            FieldType::Checkbox => matches!(value, FieldValue::Bool(_)),
            FieldType::File => matches!(value, FieldValue::Files(_)),
            FieldType::Select if self.multiple => matches!(value, FieldValue::List(_)),
            _ => matches!(value, FieldValue::Text(_)),
        }
    }

    fn check_text(&self, text: &str, errors: &mut Vec<FieldError>) {
        let length = text.chars().count();
        if let Some(min_len) = self.constraint.min_len
            && length < min_len
        {
            errors.push(FieldError::new(
                format!("shorter than minimum length {}", min_len),
                "min_length",
            ));
        }
        if let Some(max_len) = self.constraint.max_len
            && length > max_len
        {
            errors.push(FieldError::new(
                format!("longer than maximum length {}", max_len),
                "max_length",
            ));
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(text)
        {
            errors.push(FieldError::new(
                "does not match the required pattern",
                "pattern_mismatch",
            ));
        }
    }

    fn check_shape(&self, text: &str, errors: &mut Vec<FieldError>) {
        match self.kind {
            FieldType::Email if !EMAIL_SHAPE.is_match(text) => {
                errors.push(FieldError::new("not a valid email address", "email"));
            }
            FieldType::Url if !URL_SHAPE.is_match(text) => {
                errors.push(FieldError::new("not a valid URL", "url"));
            }
            FieldType::Phone if !PHONE_SHAPE.is_match(text) => {
                errors.push(FieldError::new("not a valid phone number", "phone"));
            }
            FieldType::Date if !plausible_date(text) => {
                errors.push(FieldError::new(
                    "not a valid date (expected YYYY-MM-DD)",
                    "date",
                ));
            }
            _ => {}
        }
    }

    fn check_bounds(&self, number: f64, errors: &mut Vec<FieldError>) {
        if let Some(min) = self.constraint.min
            && number < min
        {
            errors.push(FieldError::new(format!("below minimum {}", min), "min"));
        }
        if let Some(max) = self.constraint.max
            && number > max
        {
            errors.push(FieldError::new(format!("above maximum {}", max), "max"));
        }
    }

    fn check_option(&self, value: &str, errors: &mut Vec<FieldError>) {
        if !self.allowed.iter().any(|allowed| allowed == value) {
            errors.push(FieldError::new(
                format!("'{}' is not one of the allowed options", value),
                "option_mismatch",
            ));
        }
    }

    fn check_files(&self, files: &[crate::record::FileHandle], errors: &mut Vec<FieldError>) {
        if let Some(max_files) = self.file.max_files
            && files.len() > max_files
        {
            errors.push(FieldError::new(
                format!("too many files (limit {})", max_files),
                "file_count",
            ));
        }
        if let Some(max_size) = self.file.max_size {
            for file in files {
                if file.size > max_size {
                    errors.push(FieldError::new(
                        format!("file '{}' exceeds the size limit", file.name),
                        "file_size",
                    ));
                }
            }
        }
        if let Some(accept) = &self.accept {
            for file in files {
                if !accept.is_match(&file.name) {
                    errors.push(FieldError::new(
                        format!("file '{}' is not an accepted type", file.name),
                        "file_type",
                    ));
                }
            }
        }
    }
}

/// Builds a glob set from a comma-separated accept filter such as
/// `".pdf,.doc,.docx"`. Entries starting with a dot match by extension,
/// anything else is used as a glob verbatim. Matching is case-insensitive.
fn compile_accept(filter: &str) -> Result<Option<GlobSet>, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    let mut any = false;
    for entry in filter.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let glob = if entry.starts_with('.') {
            format!("*{}", entry)
        } else {
            entry.to_string()
        };
        builder.add(GlobBuilder::new(&glob).case_insensitive(true).build()?);
        any = true;
    }
    if any {
        Ok(Some(builder.build()?))
    } else {
        Ok(None)
    }
}
