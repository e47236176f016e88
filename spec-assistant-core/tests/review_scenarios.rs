//! End-to-end review of a two-key extraction run, driven through the public
//! session API and the keyboard surface.

use serde_json::json;
use spec_assistant_core::{
    handle_key, ExtractionRun, KeyEffect, KeyInput, Outcome, Rejection, ReviewPolicy,
    ReviewSession, ReviewStatus, NOT_FOUND,
};

fn vendor_model_session() -> ReviewSession {
    let response = json!({
        "Vendor": {
            "key_value": "Acme",
            "source_locations": [{"pdf_filename": "datasheet.pdf", "page_numbers": [1, 4]}],
            "description": "Manufacturer on the title page"
        },
        "Model": null
    });
    let run = ExtractionRun::from_response(vec!["Vendor".into(), "Model".into()], &response);
    ReviewSession::start(run, ReviewPolicy::default())
}

#[test]
fn failed_extraction_starts_pending_as_not_found() {
    let s = vendor_model_session();

    let model = s.record("Model");
    assert_eq!(model.value(), NOT_FOUND);
    assert_eq!(model.original_value(), NOT_FOUND);
    assert_eq!(model.status(), ReviewStatus::Pending);
    assert_eq!(s.record("Vendor").value(), "Acme");
    assert_eq!(s.navigator().current_index(), 0);
}

#[test]
fn accept_advances_to_next_key() {
    let mut s = vendor_model_session();

    assert!(s.accept("Vendor").is_applied());

    assert_eq!(s.navigator().current_index(), 1);
    assert_eq!(s.current_key(), Some("Model"));
}

#[test]
fn edit_on_last_key_trims_and_stays() {
    let mut s = vendor_model_session();
    s.accept("Vendor");

    assert!(s.edit("Model", "  X200  ").is_applied());

    assert_eq!(s.record("Model").value(), "X200");
    assert_eq!(s.record("Model").status(), ReviewStatus::Edited);
    assert_eq!(s.navigator().current_index(), 1);
}

#[test]
fn completed_review_exports_reviewed_values() {
    let mut s = vendor_model_session();
    s.accept("Vendor");
    s.edit("Model", "  X200  ");

    assert!(s.all_reviewed());
    let payload = s.export_payload();

    assert_eq!(payload.len(), 2);
    assert_eq!(payload["Vendor"].key_value.as_deref(), Some("Acme"));
    assert_eq!(payload["Vendor"].source_locations[0].page_numbers, vec![1, 4]);
    assert_eq!(
        payload["Vendor"].description.as_deref(),
        Some("Manufacturer on the title page")
    );
    assert_eq!(payload["Model"].key_value.as_deref(), Some("X200"));

    let wire = serde_json::to_value(&payload).unwrap();
    assert_eq!(wire["Model"]["key_value"], json!("X200"));
    assert_eq!(wire["Vendor"]["source_locations"][0]["pdf_filename"], json!("datasheet.pdf"));
}

#[test]
fn second_accept_is_a_noop() {
    let mut s = vendor_model_session();
    s.accept("Vendor");
    assert_eq!(s.navigator().current_index(), 1);

    let outcome = s.accept("Vendor");

    assert_eq!(
        outcome,
        Outcome::Rejected(Rejection::InvalidTransition {
            action: "accept",
            from: ReviewStatus::Accepted,
        })
    );
    assert_eq!(s.record("Vendor").status(), ReviewStatus::Accepted);
    assert_eq!(s.navigator().current_index(), 1);
}

#[test]
fn keyboard_walkthrough_reaches_export() {
    let mut s = vendor_model_session();

    assert_eq!(handle_key(&mut s, KeyInput::Char('d')), KeyEffect::Ignored);
    assert_eq!(handle_key(&mut s, KeyInput::Enter), KeyEffect::Render);
    assert_eq!(handle_key(&mut s, KeyInput::Char('e')), KeyEffect::Render);
    while s.edit_buffer().is_some_and(|b| !b.is_empty()) {
        handle_key(&mut s, KeyInput::Backspace);
    }
    for c in "X200".chars() {
        handle_key(&mut s, KeyInput::Char(c));
    }
    assert_eq!(handle_key(&mut s, KeyInput::Enter), KeyEffect::Render);

    assert!(s.all_reviewed());
    assert_eq!(handle_key(&mut s, KeyInput::Char('d')), KeyEffect::Export);
    assert_eq!(s.export_payload()["Model"].key_value.as_deref(), Some("X200"));
}

#[test]
fn review_again_from_summary_blocks_export_until_resolved() {
    let mut s = vendor_model_session();
    s.accept("Vendor");
    s.accept("Model");
    assert!(s.all_reviewed());

    assert!(s.review_again("Vendor"));
    assert_eq!(s.current_key(), Some("Vendor"));
    assert!(!s.all_reviewed());
    assert_eq!(handle_key(&mut s, KeyInput::Char('d')), KeyEffect::Ignored);

    s.accept("Vendor");
    assert!(s.all_reviewed());
}

#[test]
fn malformed_response_degrades_to_not_found() {
    let response = json!({
        "Vendor": "just a string",
        "Model": {"key_value": 200, "source_locations": "nope"}
    });
    let run = ExtractionRun::from_response(
        vec!["Vendor".into(), "Model".into(), "Voltage".into()],
        &response,
    );
    let s = ReviewSession::start(run, ReviewPolicy::default());

    assert_eq!(s.record("Vendor").value(), NOT_FOUND);
    assert_eq!(s.record("Model").value(), "200");
    assert_eq!(s.record("Voltage").value(), NOT_FOUND);
    assert_eq!(s.pending_count(), 3);
}
