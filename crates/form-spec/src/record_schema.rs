use serde_json::{Map, Value, json};

use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::FormSchema;

/// Generates a JSON Schema describing the record shape for a form.
pub fn generate(schema: &FormSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in schema.fields() {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": schema.title(),
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(field: &FieldSpec) -> Value {
    let mut map = Map::new();

    match field.kind {
        FieldType::Text | FieldType::Password | FieldType::Phone | FieldType::Textarea => {
            map.insert("type".into(), Value::String("string".into()));
            string_bounds(field, &mut map);
        }
        FieldType::Email => {
            map.insert("type".into(), Value::String("string".into()));
            map.insert("format".into(), Value::String("email".into()));
            string_bounds(field, &mut map);
        }
        FieldType::Url => {
            map.insert("type".into(), Value::String("string".into()));
            map.insert("format".into(), Value::String("uri".into()));
            string_bounds(field, &mut map);
        }
        FieldType::Date => {
            map.insert("type".into(), Value::String("string".into()));
            map.insert("format".into(), Value::String("date".into()));
        }
        FieldType::Number => {
            map.insert("type".into(), Value::String("number".into()));
            if let Some(constraint) = &field.constraint {
                if let Some(min) = constraint.min {
                    map.insert("minimum".into(), json!(min));
                }
                if let Some(max) = constraint.max {
                    map.insert("maximum".into(), json!(max));
                }
            }
        }
        FieldType::Checkbox => {
            map.insert("type".into(), Value::String("boolean".into()));
        }
        FieldType::Select if field.multiple => {
            map.insert("type".into(), Value::String("array".into()));
            map.insert(
                "items".into(),
                json!({
                    "type": "string",
                    "enum": field.option_values(),
                }),
            );
        }
        FieldType::Select | FieldType::Radio => {
            map.insert("type".into(), Value::String("string".into()));
            map.insert("enum".into(), json!(field.option_values()));
        }
        FieldType::File => {
            map.insert("type".into(), Value::String("array".into()));
            map.insert(
                "items".into(),
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "size": { "type": "integer", "minimum": 0 },
                        "reference": { "type": "string" },
                    },
                    "required": ["name", "size"],
                }),
            );
            if let Some(file) = &field.file
                && let Some(max_files) = file.max_files
            {
                map.insert("maxItems".into(), json!(max_files));
            }
        }
    }

    map.insert("title".into(), Value::String(field.label.clone()));
    if let Some(description) = &field.description {
        map.insert("description".into(), Value::String(description.clone()));
    }

    Value::Object(map)
}

fn string_bounds(field: &FieldSpec, map: &mut Map<String, Value>) {
    if let Some(constraint) = &field.constraint {
        if let Some(min_len) = constraint.min_len {
            map.insert("minLength".into(), json!(min_len));
        }
        if let Some(max_len) = constraint.max_len {
            map.insert("maxLength".into(), json!(max_len));
        }
        if let Some(pattern) = &constraint.pattern {
            map.insert("pattern".into(), Value::String(pattern.clone()));
        }
    }
}
