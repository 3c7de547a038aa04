use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::record::{FieldValue, Record};
use crate::spec::field::{FieldSpec, FieldType, SelectOption};
use crate::spec::form::FormSchema;
use crate::validate::{ErrorMap, FieldError};

/// Input affordance hint for the single-line input capability; affects
/// on-device affordances and format hints, never validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputHint {
    Text,
    Email,
    Password,
    Number,
    Phone,
    Url,
    Date,
}

impl InputHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputHint::Text => "text",
            InputHint::Email => "email",
            InputHint::Password => "password",
            InputHint::Number => "number",
            InputHint::Phone => "phone",
            InputHint::Url => "url",
            InputHint::Date => "date",
        }
    }
}

/// Interactive capability bound to one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum WidgetControl {
    Input {
        hint: InputHint,
    },
    Textarea {
        rows: usize,
    },
    Select {
        options: Vec<SelectOption>,
    },
    MultiSelect {
        options: Vec<SelectOption>,
    },
    Checkbox,
    RadioGroup {
        options: Vec<SelectOption>,
    },
    FilePicker {
        accept: Option<String>,
        max_files: Option<usize>,
        max_size: Option<u64>,
    },
}

/// One rendered field: the capability plus the display contract around it.
///
/// `inline_label` is true only for the checkbox case, where the label sits
/// next to the control instead of above it. Description and errors render
/// below the control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Widget {
    pub field: String,
    pub label: String,
    pub inline_label: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub control: WidgetControl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// An edit event emitted by a widget; the controller applies it to the
/// record and re-renders. Widgets never mutate the record themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub field: String,
    pub value: FieldValue,
}

impl FieldEdit {
    pub fn new(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Maps one field specification to its widget. Total over `FieldType`; a
/// new kind fails to compile here instead of falling through silently.
pub fn render_field(spec: &FieldSpec, value: Option<&FieldValue>, errors: &[FieldError]) -> Widget {
    let control = match spec.kind {
        FieldType::Text => WidgetControl::Input { hint: InputHint::Text },
        FieldType::Email => WidgetControl::Input { hint: InputHint::Email },
        FieldType::Password => WidgetControl::Input { hint: InputHint::Password },
        FieldType::Number => WidgetControl::Input { hint: InputHint::Number },
        FieldType::Phone => WidgetControl::Input { hint: InputHint::Phone },
        FieldType::Url => WidgetControl::Input { hint: InputHint::Url },
        FieldType::Date => WidgetControl::Input { hint: InputHint::Date },
        FieldType::Textarea => WidgetControl::Textarea {
            rows: spec.rows.unwrap_or(3),
        },
        FieldType::Select => {
            let options = spec.options.clone().unwrap_or_default();
            if spec.multiple {
                WidgetControl::MultiSelect { options }
            } else {
                WidgetControl::Select { options }
            }
        }
        FieldType::Checkbox => WidgetControl::Checkbox,
        FieldType::Radio => WidgetControl::RadioGroup {
            options: spec.options.clone().unwrap_or_default(),
        },
        FieldType::File => {
            let file = spec.file.clone().unwrap_or_default();
            WidgetControl::FilePicker {
                accept: file.accept,
                max_files: file.max_files,
                max_size: file.max_size,
            }
        }
    };

    Widget {
        field: spec.name.clone(),
        label: spec.label.clone(),
        inline_label: matches!(spec.kind, FieldType::Checkbox),
        required: spec.required,
        placeholder: spec.placeholder.clone(),
        description: spec.description.clone(),
        control,
        value: value.cloned(),
        errors: errors.iter().map(|error| error.message.clone()).collect(),
    }
}

/// Fill counters exposed to rendering surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewProgress {
    pub filled: usize,
    pub total: usize,
}

/// Snapshot of the whole form for a rendering surface; rebuilt from record
/// state after every edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub busy: bool,
    pub progress: ViewProgress,
    pub widgets: Vec<Widget>,
}

impl FormView {
    pub fn widget(&self, field: &str) -> Option<&Widget> {
        self.widgets.iter().find(|widget| widget.field == field)
    }
}

/// Collects every widget plus form metadata from the current record and
/// error state. `busy` reflects an in-flight submission.
pub fn build_form_view(
    schema: &FormSchema,
    record: &Record,
    errors: &ErrorMap,
    busy: bool,
) -> FormView {
    let widgets = schema
        .fields()
        .iter()
        .map(|field| {
            let field_errors = errors.get(&field.name).map(Vec::as_slice).unwrap_or(&[]);
            render_field(field, record.get(&field.name), field_errors)
        })
        .collect::<Vec<_>>();

    let filled = schema
        .fields()
        .iter()
        .filter(|field| record.is_filled(&field.name))
        .count();

    FormView {
        form_id: schema.id().to_string(),
        form_title: schema.title().to_string(),
        form_version: schema.version().to_string(),
        busy,
        progress: ViewProgress {
            filled,
            total: schema.fields().len(),
        },
        widgets,
    }
}

/// Render the view as human-friendly text.
pub fn render_text(view: &FormView) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", view.form_title, view.form_id));
    let status = if view.busy { "submitting" } else { "editing" };
    lines.push(format!(
        "Status: {} ({}/{})",
        status, view.progress.filled, view.progress.total
    ));
    lines.push("Fields:".to_string());
    for widget in &view.widgets {
        let mut entry = format!(" - {} ({})", widget.field, widget.label);
        if widget.required {
            entry.push_str(" *");
        }
        if let Some(value) = &widget.value
            && !value.is_empty()
        {
            entry.push_str(&format!(" = {}", display_value(widget, value)));
        }
        lines.push(entry);
        if let Some(description) = &widget.description {
            lines.push(format!("   {}", description));
        }
        for error in &widget.errors {
            lines.push(format!("   ! {}", error));
        }
    }
    lines.join("\n")
}

/// Render the view as a structured JSON-friendly value.
pub fn render_json_ui(view: &FormView) -> Value {
    let widgets = view.widgets.iter().map(widget_json).collect::<Vec<_>>();
    json!({
        "form_id": view.form_id,
        "form_title": view.form_title,
        "form_version": view.form_version,
        "status": if view.busy { "submitting" } else { "editing" },
        "progress": {
            "filled": view.progress.filled,
            "total": view.progress.total,
        },
        "widgets": widgets,
    })
}

fn widget_json(widget: &Widget) -> Value {
    let mut map = match serde_json::to_value(&widget.control) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    map.insert("field".into(), Value::String(widget.field.clone()));
    map.insert("label".into(), Value::String(widget.label.clone()));
    map.insert("inline_label".into(), Value::Bool(widget.inline_label));
    map.insert("required".into(), Value::Bool(widget.required));
    if let Some(placeholder) = &widget.placeholder {
        map.insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    if let Some(description) = &widget.description {
        map.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(value) = &widget.value {
        map.insert("value".into(), value.to_value());
    }
    if !widget.errors.is_empty() {
        map.insert(
            "errors".into(),
            Value::Array(
                widget
                    .errors
                    .iter()
                    .map(|error| Value::String(error.clone()))
                    .collect(),
            ),
        );
    }
    Value::Object(map)
}

/// Render the view as an Adaptive Card v1.3 transport.
pub fn render_card(view: &FormView) -> Value {
    let mut body = Vec::new();

    body.push(json!({
        "type": "TextBlock",
        "text": view.form_title,
        "weight": "Bolder",
        "size": "Large",
        "wrap": true,
    }));

    for widget in &view.widgets {
        let mut items = Vec::new();
        if !widget.inline_label {
            let label = if widget.required {
                format!("{} *", widget.label)
            } else {
                widget.label.clone()
            };
            items.push(json!({
                "type": "TextBlock",
                "text": label,
                "weight": "Bolder",
                "wrap": true,
            }));
        }
        items.push(widget_input(widget));
        if let Some(description) = &widget.description {
            items.push(json!({
                "type": "TextBlock",
                "text": description,
                "wrap": true,
                "spacing": "Small",
            }));
        }
        for error in &widget.errors {
            items.push(json!({
                "type": "TextBlock",
                "text": error,
                "color": "Attention",
                "wrap": true,
                "spacing": "Small",
            }));
        }
        body.push(json!({
            "type": "Container",
            "items": items,
        }));
    }

    let actions = if view.busy {
        Vec::new()
    } else {
        vec![json!({
            "type": "Action.Submit",
            "title": "Submit",
            "data": {
                "form": {
                    "formId": view.form_id,
                    "action": "submit",
                }
            }
        })]
    };

    json!({
        "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
        "type": "AdaptiveCard",
        "version": "1.3",
        "body": body,
        "actions": actions,
    })
}

fn widget_input(widget: &Widget) -> Value {
    match &widget.control {
        WidgetControl::Input { hint } => {
            let mut map = Map::new();
            let kind = match hint {
                InputHint::Number => "Input.Number",
                InputHint::Date => "Input.Date",
                _ => "Input.Text",
            };
            map.insert("type".into(), Value::String(kind.into()));
            map.insert("id".into(), Value::String(widget.field.clone()));
            map.insert("isRequired".into(), Value::Bool(widget.required));
            let style = match hint {
                InputHint::Email => Some("Email"),
                InputHint::Phone => Some("Tel"),
                InputHint::Url => Some("Url"),
                _ => None,
            };
            if let Some(style) = style {
                map.insert("style".into(), Value::String(style.into()));
            }
            if let Some(placeholder) = &widget.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(value) = &widget.value
                && !value.is_empty()
            {
                map.insert("value".into(), Value::String(display_value(widget, value)));
            }
            Value::Object(map)
        }
        WidgetControl::Textarea { rows } => {
            let mut map = Map::new();
            map.insert("type".into(), Value::String("Input.Text".into()));
            map.insert("id".into(), Value::String(widget.field.clone()));
            map.insert("isRequired".into(), Value::Bool(widget.required));
            map.insert("isMultiline".into(), Value::Bool(true));
            map.insert("maxLines".into(), json!(rows));
            if let Some(placeholder) = &widget.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(value) = &widget.value
                && let Some(text) = value.as_text()
                && !text.is_empty()
            {
                map.insert("value".into(), Value::String(text.to_string()));
            }
            Value::Object(map)
        }
        WidgetControl::Select { options } => choice_set(widget, options, "compact", false),
        WidgetControl::MultiSelect { options } => choice_set(widget, options, "compact", true),
        WidgetControl::RadioGroup { options } => choice_set(widget, options, "expanded", false),
        WidgetControl::Checkbox => {
            let mut map = Map::new();
            map.insert("type".into(), Value::String("Input.Toggle".into()));
            map.insert("id".into(), Value::String(widget.field.clone()));
            map.insert("title".into(), Value::String(widget.label.clone()));
            map.insert("isRequired".into(), Value::Bool(widget.required));
            map.insert("valueOn".into(), Value::String("true".into()));
            map.insert("valueOff".into(), Value::String("false".into()));
            if let Some(value) = &widget.value {
                let checked = value.as_bool() == Some(true);
                map.insert(
                    "value".into(),
                    Value::String(if checked { "true" } else { "false" }.into()),
                );
            }
            Value::Object(map)
        }
        WidgetControl::FilePicker { .. } => json!({
            "type": "TextBlock",
            "text": "(file upload is not supported on this surface)",
            "isSubtle": true,
            "wrap": true,
        }),
    }
}

fn choice_set(widget: &Widget, options: &[SelectOption], style: &str, multi: bool) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String("Input.ChoiceSet".into()));
    map.insert("id".into(), Value::String(widget.field.clone()));
    map.insert("style".into(), Value::String(style.into()));
    map.insert("isRequired".into(), Value::Bool(widget.required));
    if multi {
        map.insert("isMultiSelect".into(), Value::Bool(true));
    }
    let choices = options
        .iter()
        .map(|option| {
            json!({
                "title": option.label,
                "value": option.value,
            })
        })
        .collect::<Vec<_>>();
    map.insert("choices".into(), Value::Array(choices));
    if let Some(value) = &widget.value
        && !value.is_empty()
    {
        map.insert("value".into(), Value::String(display_value(widget, value)));
    }
    Value::Object(map)
}

fn display_value(widget: &Widget, value: &FieldValue) -> String {
    if matches!(
        widget.control,
        WidgetControl::Input {
            hint: InputHint::Password
        }
    ) {
        return "********".to_string();
    }
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::Bool(flag) => flag.to_string(),
        FieldValue::Number(number) => number.to_string(),
        FieldValue::List(entries) => entries.join(","),
        FieldValue::Files(files) => format!("{} file(s)", files.len()),
    }
}
