use std::fmt::Write;

use form_spec::{ErrorMap, FormView, InputHint, SubmissionRecord, Widget, WidgetControl};

/// Controls which bits of state the fill session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status, field list, parse expectations.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Presenter responsible for printing prompts as the session walks the form.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_record_json: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity, show_record_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_record_json,
        }
    }

    pub fn show_header(&mut self, view: &FormView) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", view.form_title);
        if self.verbosity.is_verbose() {
            self.show_status(view);
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, view: &FormView) {
        if !self.verbosity.is_verbose() {
            return;
        }
        let status = if view.busy { "submitting" } else { "editing" };
        println!(
            "Status: {} ({}/{})",
            status, view.progress.filled, view.progress.total
        );
        println!("Fields:");
        for widget in &view.widgets {
            let mut entry = format!(" - {} ({})", widget.field, widget.label);
            if widget.required {
                entry.push_str(" [required]");
            }
            println!("{}", entry);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            println!("Choices: {}", prompt.choices.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &InputParseError) {
        eprintln!("Invalid input: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_errors(&self, errors: &ErrorMap) {
        eprintln!("Validation errors:");
        for (field, field_errors) in errors {
            for error in field_errors {
                eprintln!("  {}: {}", field, error.message);
            }
        }
    }

    pub fn show_completion(&self, submission: &SubmissionRecord) {
        println!("Done ✅");
        match submission.to_cbor() {
            Ok(bytes) => {
                println!("Record (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize record to CBOR: {}", err);
            }
        }
        if self.show_record_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize record to JSON: {}", err);
                }
            }
        }
    }
}

/// Context used to format a single field prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub choices: Vec<String>,
}

impl PromptContext {
    pub fn new(widget: &Widget, index: usize, total: usize) -> Self {
        Self {
            index: index.max(1),
            total,
            label: widget.label.clone(),
            description: widget.description.clone(),
            required: widget.required,
            hint: control_hint(&widget.control),
            choices: control_choices(&widget.control),
        }
    }
}

fn control_hint(control: &WidgetControl) -> Option<String> {
    match control {
        WidgetControl::Input { hint: InputHint::Number } => Some("(number)".to_string()),
        WidgetControl::Input { hint: InputHint::Date } => Some("(YYYY-MM-DD)".to_string()),
        WidgetControl::Checkbox => Some("(yes/no, y/n, true/false)".to_string()),
        WidgetControl::Select { options } | WidgetControl::RadioGroup { options } => {
            let values = options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>();
            Some(format!("({})", values.join("/")))
        }
        WidgetControl::MultiSelect { options } => {
            let values = options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>();
            Some(format!("(comma separated: {})", values.join("/")))
        }
        WidgetControl::FilePicker { .. } => {
            Some("(comma separated file paths or name:bytes)".to_string())
        }
        _ => None,
    }
}

fn control_choices(control: &WidgetControl) -> Vec<String> {
    match control {
        WidgetControl::Select { options }
        | WidgetControl::MultiSelect { options }
        | WidgetControl::RadioGroup { options } => options
            .iter()
            .map(|option| option.value.clone())
            .collect(),
        _ => Vec::new(),
    }
}

/// Error produced when parsing field input from the user.
#[derive(Debug)]
pub struct InputParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl InputParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
