use crate::record::{FieldValue, FileHandle, Record};
use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::FormSchema;

/// Builds a best-effort example record for a schema. Values satisfy length
/// and numeric bounds and option membership; author patterns are not
/// synthesized.
pub fn generate(schema: &FormSchema) -> Record {
    let mut record = Record::new();
    for field in schema.fields() {
        record.set(field.name.clone(), example_value(field));
    }
    record
}

fn example_value(field: &FieldSpec) -> FieldValue {
    match field.kind {
        FieldType::Text | FieldType::Textarea | FieldType::Password => {
            FieldValue::Text(example_text(field))
        }
        FieldType::Email => FieldValue::Text("user@example.com".into()),
        FieldType::Phone => FieldValue::Text("+1 555 010 0123".into()),
        FieldType::Url => FieldValue::Text("https://example.com".into()),
        FieldType::Date => FieldValue::Text("2024-01-01".into()),
        FieldType::Number => {
            let min = field
                .constraint
                .as_ref()
                .and_then(|constraint| constraint.min);
            FieldValue::Number(min.unwrap_or(0.0))
        }
        FieldType::Checkbox => FieldValue::Bool(true),
        FieldType::Select if field.multiple => {
            FieldValue::List(field.option_values().into_iter().take(1).collect())
        }
        FieldType::Select | FieldType::Radio => {
            let first = field.option_values().into_iter().next().unwrap_or_default();
            FieldValue::Text(first)
        }
        FieldType::File => FieldValue::Files(vec![example_file(field)]),
    }
}

fn example_text(field: &FieldSpec) -> String {
    let mut text = format!("example-{}", field.name);
    if let Some(constraint) = &field.constraint {
        if let Some(min_len) = constraint.min_len {
            while text.chars().count() < min_len {
                text.push('x');
            }
        }
        if let Some(max_len) = constraint.max_len
            && text.chars().count() > max_len
        {
            text = text.chars().take(max_len).collect();
        }
    }
    text
}

fn example_file(field: &FieldSpec) -> FileHandle {
    let extension = field
        .file
        .as_ref()
        .and_then(|file| file.accept.as_deref())
        .and_then(|accept| {
            accept
                .split(',')
                .map(str::trim)
                .find(|entry| entry.starts_with('.'))
                .map(str::to_string)
        })
        .unwrap_or_else(|| ".txt".to_string());
    FileHandle::new(format!("example{}", extension), 1)
}
