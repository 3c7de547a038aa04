#![allow(missing_docs)]

pub mod controller;
pub mod examples;
pub mod expr;
pub mod record;
pub mod record_schema;
pub mod render;
pub mod spec;
pub mod validate;

pub use controller::{
    EditDisposition, FormController, Phase, SubmitError, SubmitOutcome, SubmitReport, SubmitSink,
    SubmitStart,
};
pub use examples::generate as example_record;
pub use expr::Expr;
pub use record::{FieldValue, FileHandle, Record, SubmissionRecord};
pub use record_schema::generate as record_schema;
pub use render::{
    FieldEdit, FormView, InputHint, ViewProgress, Widget, WidgetControl, build_form_view,
    render_card, render_field, render_json_ui, render_text,
};
pub use spec::{
    Constraint, CrossFieldRule, FieldSpec, FieldType, FileConstraint, FormSchema, FormSpec,
    SchemaError, SelectOption,
};
pub use validate::{ErrorMap, FieldError, ValidationOutcome, Validator};
