pub mod builder;

mod presenter;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use builder::{BuildInput, GeneratedBundle, build_bundle, write_bundle};
use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    Constraint, CrossFieldRule, Expr, FieldEdit, FieldSpec, FieldType, FieldValue, FileConstraint,
    FileHandle, FormController, FormSchema, FormSpec, InputHint, Record, SelectOption,
    SubmissionRecord, SubmitError, SubmitOutcome, SubmitReport, ValidationOutcome, Widget,
    WidgetControl, render_card, render_json_ui, render_text,
};
use presenter::{FillPresenter, InputParseError, PromptContext, Verbosity};
use serde_json::{Number, Value};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Schema-driven form CLI",
    long_about = "Fills, validates, renders, and scaffolds declarative form schemas backed by the form-spec engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Card,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a form interactively and hand the accepted record to a sink.
    Fill {
        /// Path to the form spec JSON describing the schema.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file containing default values.
        #[arg(long, value_name = "DEFAULTS")]
        defaults: Option<PathBuf>,
        /// Write the accepted record JSON here.
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
        /// Show verbose output (statuses, field lists, parse expectations).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also emit the submission JSON for debugging.
        #[arg(long)]
        record_json: bool,
        /// Render output mode shown before each submit attempt.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate a record file against a schema.
    Validate {
        /// Path to the form spec JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the record JSON file.
        #[arg(long, value_name = "RECORD")]
        record: PathBuf,
    },
    /// Print the rendered form view.
    Render {
        /// Path to the form spec JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional record JSON file to render against.
        #[arg(long, value_name = "RECORD")]
        record: Option<PathBuf>,
        /// Render output mode.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Interactive schema builder that creates a bundle of derived artifacts.
    New {
        /// Root directory where the generated bundle will be emitted
        /// (defaults to DYNAFORM_OUTPUT_DIR or the current working directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing bundle if present.
        #[arg(long)]
        force: bool,
        /// Show internal bundle data for debugging.
        #[arg(long)]
        verbose: bool,
    },
    /// Non-interactive builder that consumes a JSON description and emits the bundle.
    Generate {
        /// JSON file describing the form metadata + fields.
        #[arg(long, value_name = "INPUT")]
        input: PathBuf,
        /// Root directory where the generated bundle will be emitted.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing bundle if present.
        #[arg(long)]
        force: bool,
        /// Show internal bundle data for debugging.
        #[arg(long)]
        verbose: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fill {
            schema,
            defaults,
            out,
            verbose,
            record_json,
            format,
        } => run_fill(schema, defaults, out, verbose, record_json, format),
        Command::Validate { schema, record } => run_validate(schema, record),
        Command::Render {
            schema,
            record,
            format,
        } => run_render(schema, record, format),
        Command::New {
            out,
            force,
            verbose,
        } => run_new(out, force, verbose),
        Command::Generate {
            input,
            out,
            force,
            verbose,
        } => run_generate(input, out, force, verbose),
    }
}

fn load_schema(path: &Path) -> CliResult<FormSchema> {
    let contents = fs::read_to_string(path)?;
    Ok(FormSchema::from_json(&contents)?)
}

fn run_fill(
    schema_path: PathBuf,
    defaults_path: Option<PathBuf>,
    out: Option<PathBuf>,
    verbose: bool,
    record_json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let schema = load_schema(&schema_path)?;
    let defaults: BTreeMap<String, FieldValue> = match defaults_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => BTreeMap::new(),
    };

    let mut controller = FormController::with_defaults(schema, defaults);
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose), record_json);
    presenter.show_header(&controller.view());

    let all_fields: Vec<String> = controller
        .schema()
        .fields()
        .iter()
        .map(|field| field.name.clone())
        .collect();
    prompt_fields(&mut controller, &all_fields, &presenter)?;

    loop {
        print_render_output(format, &controller.view())?;
        let mut sink = record_sink(out.clone());
        match controller.submit_with(&mut sink) {
            SubmitReport::Completed(SubmitOutcome::Succeeded) => {
                let submission = SubmissionRecord {
                    form_id: controller.schema().id().to_string(),
                    schema_version: controller.schema().version().to_string(),
                    values: controller.record().clone(),
                };
                presenter.show_completion(&submission);
                return Ok(());
            }
            SubmitReport::Completed(SubmitOutcome::Failed(notice)) => {
                return Err(format!("submission failed: {}", notice).into());
            }
            SubmitReport::Rejected => {
                presenter.show_errors(controller.errors());
                let offending: Vec<String> = controller.errors().keys().cloned().collect();
                prompt_fields(&mut controller, &offending, &presenter)?;
            }
            SubmitReport::InFlight => {
                return Err("a submission is already in flight".into());
            }
        }
    }
}

fn prompt_fields(
    controller: &mut FormController,
    fields: &[String],
    presenter: &FillPresenter,
) -> CliResult<()> {
    let total = controller.schema().fields().len();
    for (index, name) in fields.iter().enumerate() {
        let view = controller.view();
        let Some(widget) = view.widget(name) else {
            continue;
        };
        let prompt = PromptContext::new(widget, index + 1, total);
        if let Some(value) = prompt_widget(&prompt, widget, presenter)? {
            controller.apply_edit(FieldEdit::new(name.clone(), value));
        }
    }
    Ok(())
}

fn prompt_widget(
    prompt: &PromptContext,
    widget: &Widget,
    presenter: &FillPresenter,
) -> CliResult<Option<FieldValue>> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input ended before the form was complete".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("form aborted by user".into());
        }
        if trimmed.is_empty() {
            return Ok(None);
        }

        match parse_input(widget, trimmed) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

fn parse_input(widget: &Widget, raw: &str) -> Result<FieldValue, InputParseError> {
    match &widget.control {
        WidgetControl::Input {
            hint: InputHint::Number,
        } => parse_number(raw),
        WidgetControl::Input { .. } | WidgetControl::Textarea { .. } => {
            Ok(FieldValue::Text(raw.to_string()))
        }
        WidgetControl::Checkbox => parse_boolean(raw),
        WidgetControl::Select { options } | WidgetControl::RadioGroup { options } => {
            parse_choice(options, raw).map(FieldValue::Text)
        }
        WidgetControl::MultiSelect { options } => {
            let mut entries = Vec::new();
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                entries.push(parse_choice(options, part)?);
            }
            Ok(FieldValue::List(entries))
        }
        WidgetControl::FilePicker { .. } => parse_files(raw),
    }
}

fn parse_boolean(raw: &str) -> Result<FieldValue, InputParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(FieldValue::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(FieldValue::Bool(false)),
        _ => Err(InputParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<FieldValue, InputParseError> {
    raw.parse::<f64>()
        .map_err(|_| {
            InputParseError::new("Please enter a number.", Some("expected number".to_string()))
        })
        .and_then(|value| {
            if value.is_finite() {
                Ok(FieldValue::Number(value))
            } else {
                Err(InputParseError::new(
                    "Please enter a finite number.",
                    Some("number must be finite".to_string()),
                ))
            }
        })
}

fn parse_choice(options: &[SelectOption], raw: &str) -> Result<String, InputParseError> {
    if let Some(option) = options.iter().find(|option| {
        option.value.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw)
    }) {
        Ok(option.value.clone())
    } else {
        let allowed = options
            .iter()
            .map(|option| option.value.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(InputParseError::new(
            format!("Choose one of: {}.", allowed),
            Some(format!("allowed values: {}", allowed)),
        ))
    }
}

/// Parses a comma-separated file list. Each entry is either a path on disk
/// (only its metadata is read) or a `name:bytes` literal.
fn parse_files(raw: &str) -> Result<FieldValue, InputParseError> {
    let mut files = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let path = Path::new(entry);
        if path.is_file() {
            let metadata = fs::metadata(path).map_err(|err| {
                InputParseError::new(
                    format!("Cannot read metadata for '{}'.", entry),
                    Some(err.to_string()),
                )
            })?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.to_string());
            files.push(FileHandle {
                name,
                size: metadata.len(),
                reference: Some(entry.to_string()),
            });
            continue;
        }
        if let Some((name, size)) = entry.rsplit_once(':')
            && let Ok(size) = size.trim().parse::<u64>()
            && !name.trim().is_empty()
        {
            files.push(FileHandle::new(name.trim(), size));
            continue;
        }
        return Err(InputParseError::new(
            format!("'{}' is not a readable file or a name:bytes entry.", entry),
            Some("expected an existing path or name:bytes".to_string()),
        ));
    }
    Ok(FieldValue::Files(files))
}

fn record_sink(out: Option<PathBuf>) -> impl FnMut(&Record) -> Result<(), SubmitError> {
    move |record: &Record| {
        if let Some(path) = &out {
            let json = serde_json::to_string_pretty(record)
                .map_err(|err| SubmitError::new(err.to_string()))?;
            fs::write(path, json).map_err(|err| SubmitError::new(err.to_string()))?;
        }
        Ok(())
    }
}

fn print_render_output(mode: RenderMode, view: &form_spec::FormView) -> CliResult<()> {
    match mode {
        RenderMode::Text => Ok(()),
        RenderMode::Card => {
            println!(
                "Adaptive card:\n{}",
                serde_json::to_string_pretty(&render_card(view))?
            );
            Ok(())
        }
        RenderMode::Json => {
            println!(
                "JSON UI:\n{}",
                serde_json::to_string_pretty(&render_json_ui(view))?
            );
            Ok(())
        }
    }
}

fn run_validate(schema_path: PathBuf, record_path: PathBuf) -> CliResult<()> {
    let schema = load_schema(&schema_path)?;
    let record: Record = serde_json::from_str(&fs::read_to_string(record_path)?)?;

    let outcome = schema.validate(&record);
    println!(
        "Validation result: {}",
        if outcome.is_accepted() {
            "accepted"
        } else {
            "rejected"
        }
    );
    describe_outcome(&outcome);

    if outcome.is_accepted() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_outcome(outcome: &ValidationOutcome) {
    let Some(errors) = outcome.errors() else {
        return;
    };
    println!("Errors:");
    for (field, field_errors) in errors {
        for error in field_errors {
            println!("  {}: {} ({})", field, error.message, error.code);
        }
    }
}

fn run_render(
    schema_path: PathBuf,
    record_path: Option<PathBuf>,
    format: RenderMode,
) -> CliResult<()> {
    let schema = load_schema(&schema_path)?;
    let record = match record_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Record::seeded(schema.fields(), &BTreeMap::new()),
    };

    let errors = match schema.validate(&record) {
        ValidationOutcome::Accepted => form_spec::ErrorMap::new(),
        ValidationOutcome::Rejected(errors) => errors,
    };
    let view = form_spec::build_form_view(&schema, &record, &errors, false);

    match format {
        RenderMode::Text => println!("{}", render_text(&view)),
        RenderMode::Card => println!("{}", serde_json::to_string_pretty(&render_card(&view))?),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&view))?),
    }
    Ok(())
}

fn run_generate(
    input_path: PathBuf,
    out_dir: Option<PathBuf>,
    force: bool,
    verbose: bool,
) -> CliResult<()> {
    let contents = fs::read_to_string(&input_path)?;
    let input: BuildInput = serde_json::from_str(&contents)?;
    let out_root = resolve_output_root(out_dir)?;
    emit_bundle(&input, &out_root, force, verbose)
}

fn run_new(out_dir: Option<PathBuf>, force: bool, verbose: bool) -> CliResult<()> {
    println!("Interactive form schema builder");
    let form_id = prompt_non_empty(&mark_required("Form ID"), None)?;
    let title = prompt_non_empty(&mark_required("Form title"), None)?;
    let version = prompt_non_empty(&mark_required("Form version"), Some("0.1.0"))?;
    let description = prompt_optional("Description (optional)")?;
    let summary = prompt_optional("Summary for README (optional)")?;
    let dir_name = prompt_non_empty(&mark_required("Output directory name"), Some(&form_id))?;
    let out_root = resolve_output_root(out_dir)?;

    let mut fields: Vec<FieldSpec> = Vec::new();
    loop {
        let name = prompt_optional("Field name (blank to finish)")?;
        let name = match name.filter(|value| !value.trim().is_empty()) {
            Some(name) => {
                if fields.iter().any(|field| field.name == name) {
                    println!(
                        "Field name '{}' already used; choose a different identifier.",
                        name
                    );
                    continue;
                }
                name
            }
            None => break,
        };

        let label = prompt_non_empty(&mark_required("Field label"), Some(&name))?;
        let kind = prompt_field_type()?;
        let required = prompt_bool("Required?", true)?;
        let placeholder = prompt_optional("Placeholder (optional)")?;
        let field_description = prompt_optional("Field description (optional)")?;

        let mut field = FieldSpec::new(name, kind, label);
        field.required = required;
        field.placeholder = placeholder;
        field.description = field_description;

        match kind {
            FieldType::Select | FieldType::Radio => {
                field.options = Some(prompt_options()?);
                if kind == FieldType::Select {
                    field.multiple = prompt_bool("Allow multiple selections?", false)?;
                }
            }
            FieldType::Textarea => {
                field.rows = prompt_optional_usize("Visible rows (blank for default)")?;
            }
            FieldType::File => {
                let accept = prompt_optional("Accept filter (e.g. .pdf,.doc; blank for any)")?;
                let max_files = prompt_optional_usize("Maximum file count (blank for none)")?;
                let max_size = prompt_optional_u64("Maximum file size in bytes (blank for none)")?;
                if accept.is_some() || max_files.is_some() || max_size.is_some() {
                    field.file = Some(FileConstraint {
                        accept,
                        max_files,
                        max_size,
                    });
                }
            }
            _ => {}
        }
        field.constraint = prompt_constraint(kind)?;

        fields.push(field);
    }

    if fields.is_empty() {
        return Err("at least one field is required".into());
    }

    let rules = prompt_rules(&fields)?;
    let input = BuildInput {
        dir_name,
        summary_md: summary,
        form: FormSpec {
            id: form_id,
            title,
            version,
            description,
            fields,
            rules,
        },
    };
    emit_bundle(&input, &out_root, force, verbose)
}

fn emit_bundle(input: &BuildInput, out_root: &Path, force: bool, verbose: bool) -> CliResult<()> {
    let bundle_dir = out_root.join(&input.dir_name);
    if bundle_dir.exists() {
        if force {
            fs::remove_dir_all(&bundle_dir)?;
        } else {
            return Err(format!(
                "bundle {} already exists; rerun with --force to overwrite",
                bundle_dir.display()
            )
            .into());
        }
    }

    let bundle = build_bundle(input)?;
    let bundle_dir = write_bundle(&bundle, input, out_root)?;
    println!("Generated form bundle at {}", bundle_dir.display());
    if verbose {
        println!("Detailed bundle state:");
        dump_bundle_debug(&bundle)?;
    }
    Ok(())
}

fn dump_bundle_debug(bundle: &GeneratedBundle) -> CliResult<()> {
    println!("Form specification:");
    println!("{}", serde_json::to_string_pretty(bundle.schema.spec())?);
    println!("Record schema:");
    println!("{}", serde_json::to_string_pretty(&bundle.record_schema)?);
    println!("Example record:");
    println!("{}", serde_json::to_string_pretty(&bundle.example)?);
    Ok(())
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os("DYNAFORM_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

fn prompt_line(prompt: &str, default: Option<&str>) -> CliResult<String> {
    if let Some(default_value) = default {
        print!("{} [{}]: ", prompt, default_value);
    } else {
        print!("{}: ", prompt);
    }
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        if let Some(default_value) = default {
            Ok(default_value.to_string())
        } else {
            Ok(String::new())
        }
    } else {
        Ok(trimmed.to_string())
    }
}

fn prompt_optional(prompt: &str) -> CliResult<Option<String>> {
    let value = prompt_line(prompt, None)?;
    if value.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn prompt_non_empty(prompt: &str, default: Option<&str>) -> CliResult<String> {
    loop {
        let value = prompt_line(prompt, default)?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
        println!("Value cannot be empty.");
    }
}

fn mark_required(prompt: &str) -> String {
    format!("{} (required)", prompt.trim())
}

fn prompt_bool(prompt: &str, default: bool) -> CliResult<bool> {
    let prompt_text = format!("{} (y/n)", prompt.trim());
    let default_hint = if default { "Y" } else { "N" };
    loop {
        let line = prompt_line(&prompt_text, Some(default_hint))?;
        match line.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => {
                println!("Invalid answer '{}'. Expected yes or no.", other);
            }
        }
    }
}

fn prompt_field_type() -> CliResult<FieldType> {
    loop {
        let value = prompt_line(
            "Field type (text|email|password|number|phone|url|date|textarea|select|checkbox|radio|file)",
            Some("text"),
        )?;
        match parse_field_type(value.trim()) {
            Some(kind) => return Ok(kind),
            None => println!("Unknown field type '{}'.", value.trim()),
        }
    }
}

fn parse_field_type(raw: &str) -> Option<FieldType> {
    match raw.to_lowercase().as_str() {
        "text" => Some(FieldType::Text),
        "email" => Some(FieldType::Email),
        "password" => Some(FieldType::Password),
        "number" => Some(FieldType::Number),
        "phone" => Some(FieldType::Phone),
        "url" => Some(FieldType::Url),
        "date" => Some(FieldType::Date),
        "textarea" => Some(FieldType::Textarea),
        "select" => Some(FieldType::Select),
        "checkbox" => Some(FieldType::Checkbox),
        "radio" => Some(FieldType::Radio),
        "file" => Some(FieldType::File),
        _ => None,
    }
}

fn prompt_options() -> CliResult<Vec<SelectOption>> {
    loop {
        let raw = prompt_line(
            "Comma separated options (label=value or value, e.g. Free=free,Pro=pro)",
            None,
        )?;
        let mut options = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let option = match entry.split_once('=') {
                Some((label, value)) => SelectOption::new(label.trim(), value.trim()),
                None => SelectOption::new(entry, entry),
            };
            options.push(option);
        }
        if options.is_empty() {
            println!("Provide at least one option for choice fields.");
            continue;
        }
        return Ok(options);
    }
}

fn prompt_constraint(kind: FieldType) -> CliResult<Option<Constraint>> {
    let mut constraint = Constraint::default();
    if kind == FieldType::Number {
        constraint.min = prompt_optional_f64("Minimum numeric value (blank for none)")?;
        constraint.max = prompt_optional_f64("Maximum numeric value (blank for none)")?;
    }
    if kind.is_textual() {
        constraint.min_len = prompt_optional_usize("Minimum length (blank for none)")?;
        constraint.max_len = prompt_optional_usize("Maximum length (blank for none)")?;
        constraint.pattern =
            prompt_optional("Regex pattern (blank for none)")?.filter(|p| !p.trim().is_empty());
    }
    if constraint.is_empty() {
        Ok(None)
    } else {
        Ok(Some(constraint))
    }
}

fn prompt_optional_f64(prompt: &str) -> CliResult<Option<f64>> {
    loop {
        let raw = prompt_line(prompt, None)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<f64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => {
                println!("Enter a number or leave blank.");
            }
        }
    }
}

fn prompt_optional_usize(prompt: &str) -> CliResult<Option<usize>> {
    loop {
        let raw = prompt_line(prompt, None)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<usize>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => {
                println!("Please enter a whole number or leave blank.");
            }
        }
    }
}

fn prompt_optional_u64(prompt: &str) -> CliResult<Option<u64>> {
    loop {
        let raw = prompt_line(prompt, None)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<u64>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => {
                println!("Please enter a whole number or leave blank.");
            }
        }
    }
}

fn existing_field_names(fields: &[FieldSpec]) -> String {
    if fields.is_empty() {
        "<none>".into()
    } else {
        fields
            .iter()
            .map(|field| field.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn field_exists(fields: &[FieldSpec], candidate: &str) -> bool {
    fields.iter().any(|field| field.name == candidate)
}

fn prompt_rules(fields: &[FieldSpec]) -> CliResult<Vec<CrossFieldRule>> {
    let mut rules = Vec::new();
    while prompt_bool("Add cross-field rule?", false)? {
        let id = prompt_optional("Rule ID (optional)")?;
        let message = prompt_non_empty("Rule message", None)?;
        let blamed = prompt_blamed_fields(fields)?;
        let condition = prompt_condition(fields, 0)?;
        rules.push(CrossFieldRule {
            id,
            message,
            fields: blamed,
            condition,
            code: None,
        });
    }
    Ok(rules)
}

fn prompt_blamed_fields(fields: &[FieldSpec]) -> CliResult<Vec<String>> {
    loop {
        println!("Available fields: {}", existing_field_names(fields));
        let raw = prompt_line("Fields to blame on failure (comma separated)", None)?;
        let mut blamed = raw
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect::<Vec<_>>();
        blamed.dedup();
        if blamed.is_empty() {
            println!("Provide at least one field.");
            continue;
        }
        let unknown = blamed
            .iter()
            .filter(|field| !field_exists(fields, field))
            .cloned()
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            println!("Unknown fields: {}.", unknown.join(", "));
            continue;
        }
        return Ok(blamed);
    }
}

fn prompt_condition(fields: &[FieldSpec], depth: usize) -> CliResult<Expr> {
    const MAX_DEPTH: usize = 4;
    let mut prompt = String::from("Condition type (comparison/present");
    if depth < MAX_DEPTH {
        prompt.push_str("/and/or/not");
    }
    prompt.push(')');
    let choice = prompt_line(&prompt, Some("comparison"))?;
    match choice.trim().to_lowercase().as_str() {
        "present" => prompt_present_condition(fields),
        "and" if depth < MAX_DEPTH => {
            let left = prompt_condition(fields, depth + 1)?;
            let right = prompt_condition(fields, depth + 1)?;
            Ok(Expr::And {
                expressions: vec![left, right],
            })
        }
        "or" if depth < MAX_DEPTH => {
            let left = prompt_condition(fields, depth + 1)?;
            let right = prompt_condition(fields, depth + 1)?;
            Ok(Expr::Or {
                expressions: vec![left, right],
            })
        }
        "not" if depth < MAX_DEPTH => {
            let inner = prompt_condition(fields, depth + 1)?;
            Ok(Expr::Not {
                expression: Box::new(inner),
            })
        }
        _ => prompt_comparison_condition(fields),
    }
}

fn prompt_present_condition(fields: &[FieldSpec]) -> CliResult<Expr> {
    println!("Existing fields: {}", existing_field_names(fields));
    let target = prompt_non_empty("Field to check for a value", None)?;
    Ok(Expr::Present { name: target })
}

fn prompt_comparison_condition(fields: &[FieldSpec]) -> CliResult<Expr> {
    println!("Existing fields: {}", existing_field_names(fields));
    let operator = prompt_line("Operator (eq/ne/lt/lte/gt/gte)", Some("eq"))?;
    let normalized = operator.trim().to_lowercase();
    let left_name = prompt_non_empty("Field to compare", None)?;
    let left = Expr::Field { name: left_name };
    let operand = prompt_line("Right operand type (literal/field)", Some("literal"))?;
    let right = match operand.trim().to_lowercase().as_str() {
        "field" => {
            let right_name = prompt_non_empty("Field for the right operand", None)?;
            Expr::Field { name: right_name }
        }
        _ => {
            let value = prompt_non_empty("Value to compare against", None)?;
            Expr::Literal {
                value: parse_expression_literal(&value),
            }
        }
    };
    Ok(build_binary_condition(&normalized, left, right))
}

fn build_binary_condition(operator: &str, left: Expr, right: Expr) -> Expr {
    let left = Box::new(left);
    let right = Box::new(right);
    match operator {
        "ne" => Expr::Ne { left, right },
        "lt" => Expr::Lt { left, right },
        "lte" => Expr::Lte { left, right },
        "gt" => Expr::Gt { left, right },
        "gte" => Expr::Gte { left, right },
        _ => Expr::Eq { left, right },
    }
}

fn parse_expression_literal(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int_val) = trimmed.parse::<i64>() {
        return Value::Number(Number::from(int_val));
    }
    if let Ok(float_val) = trimmed.parse::<f64>()
        && let Some(number) = Number::from_f64(float_val)
    {
        return Value::Number(number);
    }
    if let Ok(json_val) = serde_json::from_str::<Value>(trimmed) {
        return json_val;
    }
    Value::String(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use serde_json::{from_str, json};
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../../ci/fixtures/sample_form_build.json");

    #[test]
    fn parse_boolean_accepts_common_spellings() {
        assert_eq!(parse_boolean("yes").unwrap(), FieldValue::Bool(true));
        assert_eq!(parse_boolean("0").unwrap(), FieldValue::Bool(false));
        assert!(parse_boolean("maybe").is_err());
    }

    #[test]
    fn parse_number_requires_finite_values() {
        assert_eq!(parse_number("4.5").unwrap(), FieldValue::Number(4.5));
        assert!(parse_number("inf").is_err());
        assert!(parse_number("four").is_err());
    }

    #[test]
    fn parse_choice_matches_values_and_labels_case_insensitively() {
        let options = vec![
            SelectOption::new("Free tier", "free"),
            SelectOption::new("Pro tier", "pro"),
        ];
        assert_eq!(parse_choice(&options, "FREE").unwrap(), "free");
        assert_eq!(parse_choice(&options, "pro tier").unwrap(), "pro");
        assert!(parse_choice(&options, "enterprise").is_err());
    }

    #[test]
    fn parse_files_accepts_name_size_literals() {
        let value = parse_files("report.pdf:2048, notes.txt:16").unwrap();
        match value {
            FieldValue::Files(files) => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].name, "report.pdf");
                assert_eq!(files[0].size, 2048);
            }
            other => panic!("expected files, got {:?}", other),
        }
        assert!(parse_files("no-such-file.bin").is_err());
    }

    #[test]
    fn parse_files_reads_metadata_from_disk() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("attachment.txt");
        fs::write(&path, b"hello").expect("write file");

        let value = parse_files(path.to_str().expect("utf-8 path")).unwrap();
        match value {
            FieldValue::Files(files) => {
                assert_eq!(files[0].name, "attachment.txt");
                assert_eq!(files[0].size, 5);
                assert!(files[0].reference.is_some());
            }
            other => panic!("expected files, got {:?}", other),
        }
    }

    #[test]
    fn parse_input_builds_multi_select_lists() {
        let widget = form_spec::render_field(
            &FieldSpec {
                multiple: true,
                options: Some(vec![
                    SelectOption::new("Rust", "rust"),
                    SelectOption::new("Forms", "forms"),
                ]),
                ..FieldSpec::new("tags", FieldType::Select, "Tags")
            },
            None,
            &[],
        );
        assert_eq!(
            parse_input(&widget, "rust, forms").unwrap(),
            FieldValue::List(vec!["rust".into(), "forms".into()])
        );
        assert!(parse_input(&widget, "rust, cobol").is_err());
    }

    #[test]
    fn expression_literals_parse_by_shape() {
        assert_eq!(parse_expression_literal("true"), Value::Bool(true));
        assert_eq!(parse_expression_literal("42"), json!(42));
        assert_eq!(parse_expression_literal("4.5"), json!(4.5));
        assert_eq!(parse_expression_literal("plain"), json!("plain"));
    }

    #[test]
    fn fixture_generates_bundle() {
        let input: BuildInput =
            from_str(FIXTURE).expect("fixture should deserialize into BuildInput");
        let bundle = build_bundle(&input).expect("bundle build should succeed");
        let temp_dir = TempDir::new().expect("temp dir");

        let bundle_dir =
            write_bundle(&bundle, &input, temp_dir.path()).expect("bundle write should succeed");

        assert!(bundle_dir.join("forms").join("smoke-form.form.json").exists());
        assert!(
            bundle_dir
                .join("schemas")
                .join("smoke-form.record.schema.json")
                .exists()
        );
        assert!(
            bundle_dir
                .join("examples")
                .join("smoke-form.example.record.json")
                .exists()
        );
    }

    #[test]
    fn generate_command_emits_a_bundle() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let input_path = workspace.path().join("input.json");
        fs::write(&input_path, FIXTURE)?;
        let out_root = workspace.path().join("bundles");

        let mut cmd = Command::cargo_bin("dynaform")?;
        cmd.arg("generate")
            .arg("--input")
            .arg(&input_path)
            .arg("--out")
            .arg(&out_root)
            .assert()
            .success();

        let spec_path = out_root
            .join("smoke-form")
            .join("forms")
            .join("smoke-form.form.json");
        let spec_json = fs::read_to_string(&spec_path)?;
        let spec: Value = serde_json::from_str(&spec_json)?;
        assert_eq!(spec["id"].as_str(), Some("smoke-form"));
        Ok(())
    }

    #[test]
    fn validate_command_accepts_and_rejects() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let schema_path = workspace.path().join("simple.form.json");
        fs::write(
            &schema_path,
            json!({
                "id": "simple",
                "title": "Simple",
                "version": "1.0",
                "fields": [
                    { "name": "name", "type": "text", "label": "Name", "required": true }
                ]
            })
            .to_string(),
        )?;

        let good = workspace.path().join("good.json");
        fs::write(&good, json!({ "name": "Ada" }).to_string())?;
        Command::cargo_bin("dynaform")?
            .arg("validate")
            .arg("--schema")
            .arg(&schema_path)
            .arg("--record")
            .arg(&good)
            .assert()
            .success();

        let bad = workspace.path().join("bad.json");
        fs::write(&bad, json!({ "name": "" }).to_string())?;
        Command::cargo_bin("dynaform")?
            .arg("validate")
            .arg("--schema")
            .arg(&schema_path)
            .arg("--record")
            .arg(&bad)
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn fill_command_completes_a_simple_form() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let schema_path = workspace.path().join("simple.form.json");
        fs::write(
            &schema_path,
            json!({
                "id": "simple",
                "title": "Simple",
                "version": "1.0",
                "fields": [
                    { "name": "name", "type": "text", "label": "Name", "required": true },
                    { "name": "subscribe", "type": "checkbox", "label": "Subscribe" }
                ]
            })
            .to_string(),
        )?;
        let out_path = workspace.path().join("record.json");

        let mut cmd = Command::cargo_bin("dynaform")?;
        cmd.arg("fill")
            .arg("--schema")
            .arg(&schema_path)
            .arg("--out")
            .arg(&out_path)
            .write_stdin("Ada\nyes\n")
            .assert()
            .success();

        let record: Value = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
        assert_eq!(record["name"], "Ada");
        assert_eq!(record["subscribe"], true);
        Ok(())
    }

    #[test]
    fn new_command_builds_a_minimal_schema() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let output_root = workspace.path().join("builder-out");
        let answers = [
            "form-id",    // form id
            "Form Title", // title
            "",           // version (default)
            "",           // description
            "",           // summary
            "",           // output directory name (default form-id)
            "question",   // first field name
            "",           // label (default)
            "",           // type (default text)
            "",           // required (default yes)
            "",           // placeholder
            "",           // field description
            "",           // min length
            "",           // max length
            "",           // pattern
            "",           // next field name (finish)
            "",           // add cross-field rule (default no)
        ];
        let stdin = format!("{}\n", answers.join("\n"));

        let mut cmd = Command::cargo_bin("dynaform")?;
        cmd.arg("new")
            .arg("--out")
            .arg(&output_root)
            .write_stdin(stdin)
            .assert()
            .success();

        let spec_path = output_root
            .join("form-id")
            .join("forms")
            .join("form-id.form.json");
        let spec_json = fs::read_to_string(&spec_path)?;
        let spec: Value = serde_json::from_str(&spec_json)?;
        let field = &spec["fields"][0];
        assert_eq!(field["name"].as_str(), Some("question"));
        assert_eq!(field["type"].as_str(), Some("text"));
        assert_eq!(field["required"].as_bool(), Some(true));
        Ok(())
    }
}
