use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use form_spec::{FormSchema, FormSpec, Record, SchemaError, example_record, record_schema};

/// Input shape describing what should be generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInput {
    pub dir_name: String,
    #[serde(default)]
    pub summary_md: Option<String>,
    pub form: FormSpec,
}

/// Derived artifacts for one form schema.
#[derive(Debug)]
pub struct GeneratedBundle {
    pub schema: FormSchema,
    pub record_schema: Value,
    pub example: Record,
}

/// Compiles the authored document and derives the bundle artifacts.
/// An inconsistent document fails here, before anything is written.
pub fn build_bundle(input: &BuildInput) -> Result<GeneratedBundle, SchemaError> {
    let schema = FormSchema::compile(input.form.clone())?;
    Ok(GeneratedBundle {
        record_schema: record_schema(&schema),
        example: example_record(&schema),
        schema,
    })
}

/// Writes the bundle under `<out_root>/<dir_name>/`:
/// `forms/<id>.form.json`, `schemas/<id>.record.schema.json`,
/// `examples/<id>.example.record.json`, and a README.
pub fn write_bundle(
    bundle: &GeneratedBundle,
    input: &BuildInput,
    out_root: &Path,
) -> io::Result<PathBuf> {
    let bundle_dir = out_root.join(&input.dir_name);
    let forms_dir = bundle_dir.join("forms");
    let schemas_dir = bundle_dir.join("schemas");
    let examples_dir = bundle_dir.join("examples");
    fs::create_dir_all(&forms_dir)?;
    fs::create_dir_all(&schemas_dir)?;
    fs::create_dir_all(&examples_dir)?;

    let id = bundle.schema.id();
    fs::write(
        forms_dir.join(format!("{}.form.json", id)),
        to_pretty(bundle.schema.spec())?,
    )?;
    fs::write(
        schemas_dir.join(format!("{}.record.schema.json", id)),
        to_pretty(&bundle.record_schema)?,
    )?;
    fs::write(
        examples_dir.join(format!("{}.example.record.json", id)),
        to_pretty(&bundle.example)?,
    )?;
    fs::write(bundle_dir.join("README.md"), readme(bundle, input))?;

    Ok(bundle_dir)
}

fn to_pretty<T: Serialize>(value: &T) -> io::Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut text| {
            text.push('\n');
            text
        })
        .map_err(io::Error::other)
}

fn readme(bundle: &GeneratedBundle, input: &BuildInput) -> String {
    let mut out = format!("# {}\n", bundle.schema.title());
    if let Some(summary) = &input.summary_md {
        out.push('\n');
        out.push_str(summary);
        out.push('\n');
    }
    out.push_str(&format!(
        "\nGenerated artifacts for form `{}` (version {}).\n",
        bundle.schema.id(),
        bundle.schema.version()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json};
    use tempfile::TempDir;

    fn sample_input() -> BuildInput {
        from_str(
            &json!({
                "dir_name": "survey",
                "summary_md": "A tiny survey.",
                "form": {
                    "id": "survey",
                    "title": "Survey",
                    "version": "0.1.0",
                    "fields": [
                        { "name": "company", "type": "text", "label": "Company", "required": true },
                        {
                            "name": "tier",
                            "type": "radio",
                            "label": "Tier",
                            "required": true,
                            "options": [
                                { "label": "Free", "value": "free" },
                                { "label": "Pro", "value": "pro" }
                            ]
                        }
                    ]
                }
            })
            .to_string(),
        )
        .expect("sample input deserializes")
    }

    #[test]
    fn build_bundle_derives_schema_and_example() {
        let bundle = build_bundle(&sample_input()).expect("bundle builds");
        assert_eq!(bundle.schema.id(), "survey");
        assert_eq!(bundle.record_schema["properties"]["tier"]["enum"], json!(["free", "pro"]));
        assert!(bundle.schema.validate(&bundle.example).is_accepted());
    }

    #[test]
    fn build_bundle_refuses_inconsistent_documents() {
        let mut input = sample_input();
        input.form.fields[1].options = None;
        assert!(build_bundle(&input).is_err());
    }

    #[test]
    fn write_bundle_lays_out_the_artifacts() {
        let input = sample_input();
        let bundle = build_bundle(&input).expect("bundle builds");
        let temp_dir = TempDir::new().expect("temp dir");

        let bundle_dir = write_bundle(&bundle, &input, temp_dir.path()).expect("bundle writes");

        assert!(bundle_dir.join("forms").join("survey.form.json").exists());
        assert!(
            bundle_dir
                .join("schemas")
                .join("survey.record.schema.json")
                .exists()
        );
        assert!(
            bundle_dir
                .join("examples")
                .join("survey.example.record.json")
                .exists()
        );
        assert!(bundle_dir.join("README.md").exists());

        let spec_contents = fs::read_to_string(bundle_dir.join("forms").join("survey.form.json"))
            .expect("read spec file");
        let spec_value: Value = serde_json::from_str(&spec_contents).expect("spec file JSON");
        assert_eq!(spec_value["id"].as_str(), Some("survey"));
    }
}
