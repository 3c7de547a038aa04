use std::collections::BTreeMap;

use form_spec::{
    EditDisposition, FieldEdit, FieldValue, FormController, FormSchema, Phase, Record, SubmitError,
    SubmitOutcome, SubmitReport, SubmitStart,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "registration_form" => include_str!("fixtures/registration_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn registration() -> FormSchema {
    FormSchema::from_json(fixture("registration_form")).expect("registration fixture compiles")
}

fn fill_valid(controller: &mut FormController) {
    let edits = [
        ("firstName", FieldValue::Text("John".into())),
        ("lastName", FieldValue::Text("Doe".into())),
        ("email", FieldValue::Text("john@example.com".into())),
        ("password", FieldValue::Text("Abcdef1!".into())),
        ("confirmPassword", FieldValue::Text("Abcdef1!".into())),
        ("role", FieldValue::Text("user".into())),
        ("terms", FieldValue::Bool(true)),
    ];
    for (field, value) in edits {
        assert_eq!(
            controller.apply_edit(FieldEdit::new(field, value)),
            EditDisposition::Applied
        );
    }
}

#[test]
fn record_opens_seeded_with_defaults_and_empty_values() {
    let mut defaults = BTreeMap::new();
    defaults.insert("role".to_string(), FieldValue::Text("admin".into()));

    let controller = FormController::with_defaults(registration(), defaults);
    let record = controller.record();
    assert_eq!(record.get("role"), Some(&FieldValue::Text("admin".into())));
    assert_eq!(record.get("firstName"), Some(&FieldValue::Text(String::new())));
    assert_eq!(record.get("terms"), Some(&FieldValue::Bool(false)));
    // no validation has run yet; the form opens without errors showing
    assert!(controller.errors().is_empty());
}

#[test]
fn every_edit_revalidates_the_whole_record() {
    let mut controller = FormController::new(registration());
    fill_valid(&mut controller);
    assert!(controller.errors().is_empty());

    controller.apply_edit(FieldEdit::new(
        "confirmPassword",
        FieldValue::Text("different".into()),
    ));
    assert!(controller.errors().contains_key("confirmPassword"));

    // fixing the *other* password field clears the cross-field error
    controller.apply_edit(FieldEdit::new(
        "password",
        FieldValue::Text("different".into()),
    ));
    let confirm_errors = controller
        .errors()
        .get("confirmPassword")
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    assert!(confirm_errors.iter().all(|error| error.code != "password_mismatch"));
}

#[test]
fn edits_to_unknown_fields_are_refused() {
    let mut controller = FormController::new(registration());
    assert_eq!(
        controller.apply_edit(FieldEdit::new("ghost", FieldValue::Bool(true))),
        EditDisposition::UnknownField
    );
    assert_eq!(controller.record().get("ghost"), None);
}

#[test]
fn rejected_submit_never_reaches_the_sink() {
    let mut controller = FormController::new(registration());
    let mut calls = 0;
    let mut sink = |_: &Record| -> Result<(), SubmitError> {
        calls += 1;
        Ok(())
    };

    assert_eq!(controller.submit_with(&mut sink), SubmitReport::Rejected);
    assert_eq!(calls, 0);
    assert_eq!(controller.phase(), Phase::Editing);
    assert!(!controller.errors().is_empty());
    assert_eq!(
        controller.last_outcome(),
        Some(&SubmitOutcome::Failed("validation failed".into()))
    );
}

#[test]
fn accepted_submit_invokes_the_sink_exactly_once() {
    let mut controller = FormController::new(registration());
    fill_valid(&mut controller);

    let mut calls = 0;
    let mut sink = |record: &Record| -> Result<(), SubmitError> {
        calls += 1;
        assert_eq!(record.get("role"), Some(&FieldValue::Text("user".into())));
        Ok(())
    };
    assert_eq!(
        controller.submit_with(&mut sink),
        SubmitReport::Completed(SubmitOutcome::Succeeded)
    );
    assert_eq!(calls, 1);
    assert_eq!(controller.phase(), Phase::Editing);
}

#[test]
fn second_submit_while_in_flight_has_no_observable_effect() {
    let mut controller = FormController::new(registration());
    fill_valid(&mut controller);

    assert_eq!(controller.begin_submit(), SubmitStart::Dispatched);
    assert_eq!(controller.phase(), Phase::Submitting);
    assert!(controller.view().busy);

    // a repeated request is swallowed
    assert_eq!(controller.begin_submit(), SubmitStart::InFlight);

    // and the one-call driver refuses to run its sink
    let mut calls = 0;
    let mut sink = |_: &Record| -> Result<(), SubmitError> {
        calls += 1;
        Ok(())
    };
    assert_eq!(controller.submit_with(&mut sink), SubmitReport::InFlight);
    assert_eq!(calls, 0);

    assert_eq!(
        controller.finish_submit(Ok(())),
        Some(SubmitOutcome::Succeeded)
    );
    assert_eq!(controller.phase(), Phase::Editing);
}

#[test]
fn edits_are_ignored_while_submitting() {
    let mut controller = FormController::new(registration());
    fill_valid(&mut controller);
    assert_eq!(controller.begin_submit(), SubmitStart::Dispatched);

    assert_eq!(
        controller.apply_edit(FieldEdit::new("firstName", FieldValue::Text("Eve".into()))),
        EditDisposition::Busy
    );
    assert_eq!(
        controller.record().get("firstName"),
        Some(&FieldValue::Text("John".into()))
    );

    controller.finish_submit(Ok(()));
}

#[test]
fn sink_failures_become_a_form_level_notice() {
    let mut controller = FormController::new(registration());
    fill_valid(&mut controller);

    let mut sink =
        |_: &Record| -> Result<(), SubmitError> { Err(SubmitError::new("upstream unavailable")) };
    assert_eq!(
        controller.submit_with(&mut sink),
        SubmitReport::Completed(SubmitOutcome::Failed("upstream unavailable".into()))
    );
    // failure is recoverable; the form is editable again for a retry
    assert_eq!(controller.phase(), Phase::Editing);
    assert!(controller.errors().is_empty());

    let mut retry = |_: &Record| -> Result<(), SubmitError> { Ok(()) };
    assert_eq!(
        controller.submit_with(&mut retry),
        SubmitReport::Completed(SubmitOutcome::Succeeded)
    );
}

#[test]
fn finish_submit_without_a_dispatch_is_a_no_op() {
    let mut controller = FormController::new(registration());
    assert_eq!(controller.finish_submit(Ok(())), None);
    assert_eq!(controller.last_outcome(), None);
}

#[test]
fn reset_restores_the_construction_defaults() {
    let mut defaults = BTreeMap::new();
    defaults.insert("role".to_string(), FieldValue::Text("admin".into()));
    let mut controller = FormController::with_defaults(registration(), defaults);

    controller.apply_edit(FieldEdit::new("role", FieldValue::Text("user".into())));
    controller.apply_edit(FieldEdit::new("firstName", FieldValue::Text("Eve".into())));
    controller.reset();

    assert_eq!(
        controller.record().get("role"),
        Some(&FieldValue::Text("admin".into()))
    );
    assert_eq!(
        controller.record().get("firstName"),
        Some(&FieldValue::Text(String::new()))
    );
    assert!(controller.errors().is_empty());
    assert_eq!(controller.last_outcome(), None);
}
