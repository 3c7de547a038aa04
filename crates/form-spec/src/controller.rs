use std::collections::BTreeMap;

use thiserror::Error;

use crate::record::{FieldValue, Record};
use crate::render::{FieldEdit, FormView, build_form_view};
use crate::spec::form::FormSchema;
use crate::validate::{ErrorMap, ValidationOutcome};

/// Failure reported by a submit sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SubmitError(pub String);

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Caller-supplied consumer of an accepted record. Invoked at most once
/// per user-initiated submit; its failures surface as a form-level notice.
pub trait SubmitSink {
    fn submit(&mut self, record: &Record) -> Result<(), SubmitError>;
}

impl<F> SubmitSink for F
where
    F: FnMut(&Record) -> Result<(), SubmitError>,
{
    fn submit(&mut self, record: &Record) -> Result<(), SubmitError> {
        self(record)
    }
}

/// Observable controller phases. Validation runs synchronously inside the
/// edit and submit transitions, so it never shows up as a resting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
}

/// What happened to one edit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDisposition {
    Applied,
    UnknownField,
    Busy,
}

/// What happened to a submit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStart {
    /// Final validation failed; errors are populated and no submission ran.
    Rejected,
    /// The record was accepted and a submission is now in flight.
    Dispatched,
    /// A submission is already outstanding; the request had no effect.
    InFlight,
}

/// Terminal result of one submission attempt, returned to the embedding
/// application to present however it chooses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed(String),
}

/// Result of driving a full submit cycle in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReport {
    Rejected,
    InFlight,
    Completed(SubmitOutcome),
}

/// Owns one form session: the working record, its validation state, and
/// the submission lifecycle. The record is exclusive to this instance.
#[derive(Debug, Clone)]
pub struct FormController {
    schema: FormSchema,
    defaults: BTreeMap<String, FieldValue>,
    record: Record,
    errors: ErrorMap,
    phase: Phase,
    last_outcome: Option<SubmitOutcome>,
}

impl FormController {
    pub fn new(schema: FormSchema) -> Self {
        Self::with_defaults(schema, BTreeMap::new())
    }

    /// Opens a form with caller defaults; fields absent from the map start
    /// at their type's empty value.
    pub fn with_defaults(schema: FormSchema, defaults: BTreeMap<String, FieldValue>) -> Self {
        let record = Record::seeded(schema.fields(), &defaults);
        Self {
            schema,
            defaults,
            record,
            errors: ErrorMap::new(),
            phase: Phase::Editing,
            last_outcome: None,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn last_outcome(&self) -> Option<&SubmitOutcome> {
        self.last_outcome.as_ref()
    }

    /// The current view; `busy` while a submission is outstanding.
    pub fn view(&self) -> FormView {
        build_form_view(
            &self.schema,
            &self.record,
            &self.errors,
            matches!(self.phase, Phase::Submitting),
        )
    }

    /// Applies one widget edit and synchronously re-validates the whole
    /// record — cross-field rules may flip on an unrelated field's edit.
    /// Edits are ignored while a submission is in flight.
    pub fn apply_edit(&mut self, edit: FieldEdit) -> EditDisposition {
        if matches!(self.phase, Phase::Submitting) {
            return EditDisposition::Busy;
        }
        if self.schema.field(&edit.field).is_none() {
            return EditDisposition::UnknownField;
        }
        self.record.set(edit.field, edit.value);
        self.revalidate();
        EditDisposition::Applied
    }

    fn revalidate(&mut self) -> bool {
        match self.schema.validate(&self.record) {
            ValidationOutcome::Accepted => {
                self.errors.clear();
                true
            }
            ValidationOutcome::Rejected(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// Runs the final full-record check and, on acceptance, opens the
    /// submission window. Returns `InFlight` without any observable effect
    /// while a previous submission is outstanding.
    pub fn begin_submit(&mut self) -> SubmitStart {
        if matches!(self.phase, Phase::Submitting) {
            return SubmitStart::InFlight;
        }
        if self.revalidate() {
            self.phase = Phase::Submitting;
            SubmitStart::Dispatched
        } else {
            self.last_outcome = Some(SubmitOutcome::Failed("validation failed".into()));
            SubmitStart::Rejected
        }
    }

    /// Resolves the outstanding submission and returns to `Editing`.
    /// A sink failure becomes a generic, non-field-specific notice.
    /// No-op (`None`) when no submission is in flight.
    pub fn finish_submit(&mut self, result: Result<(), SubmitError>) -> Option<SubmitOutcome> {
        if !matches!(self.phase, Phase::Submitting) {
            return None;
        }
        self.phase = Phase::Editing;
        let outcome = match result {
            Ok(()) => SubmitOutcome::Succeeded,
            Err(error) => SubmitOutcome::Failed(error.to_string()),
        };
        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// Drives one full submit cycle against a synchronous sink. The sink
    /// runs exactly once per dispatched submission, never on `Rejected`
    /// or `InFlight`.
    pub fn submit_with<S: SubmitSink>(&mut self, sink: &mut S) -> SubmitReport {
        match self.begin_submit() {
            SubmitStart::InFlight => SubmitReport::InFlight,
            SubmitStart::Rejected => SubmitReport::Rejected,
            SubmitStart::Dispatched => {
                let result = sink.submit(&self.record);
                self.finish_submit(result)
                    .map(SubmitReport::Completed)
                    .unwrap_or(SubmitReport::InFlight)
            }
        }
    }

    /// Restores the construction-time record and clears validation and
    /// outcome state. Caller policy after a successful submission. Ignored
    /// while a submission is outstanding.
    pub fn reset(&mut self) {
        if matches!(self.phase, Phase::Submitting) {
            return;
        }
        self.record = Record::seeded(self.schema.fields(), &self.defaults);
        self.errors.clear();
        self.last_outcome = None;
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}
