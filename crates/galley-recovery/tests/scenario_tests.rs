use galley_core::{AnnotationKind, RecoveryConfig, Span};
use galley_recovery::{
    locate, recover_annotations, Recovery, RecoveryPath, Rung, Stage, StageOutcome, Validator,
};
use galley_recovery::markup::strip_markup;
use galley_recovery::trace::strip_reasoning;
use galley_recovery::validate::structural_parse;
use galley_test_utils::{fixtures, recording_recovery};
use galley_core::IdAllocator;
use pretty_assertions::assert_eq;

fn parsed(rung: Rung) -> RecoveryPath {
    RecoveryPath::Parsed {
        rung,
        from_trace: false,
    }
}

#[test]
fn test_clean_payload_passes_through() {
    let report = Recovery::default().recover(fixtures::CLEAN_PAYLOAD, "teh cat");
    assert_eq!(report.path, parsed(Rung::Verbatim));

    let item = report.annotations.first();
    assert_eq!(report.annotations.len(), 1);
    assert_eq!(item.kind, AnnotationKind::Error);
    assert_eq!(item.original, "teh");
    assert_eq!(item.suggestion, "the");
    assert_eq!(item.reason, "typo");
    assert_eq!(item.category, "spelling");
    assert_eq!(item.span, Span::default());
}

#[test]
fn test_fenced_payload_matches_clean_payload() {
    let clean = recover_annotations(fixtures::CLEAN_PAYLOAD, "");
    let fenced = recover_annotations(fixtures::FENCED_PAYLOAD, "");

    assert_eq!(fenced.len(), clean.len());
    let (a, b) = (clean.first(), fenced.first());
    assert_eq!(
        (&a.kind, &a.original, &a.suggestion, &a.reason, &a.category),
        (&b.kind, &b.original, &b.suggestion, &b.reason, &b.category)
    );
}

#[test]
fn test_trace_is_removed_before_parsing() {
    let report = Recovery::default().recover(fixtures::TRACE_THEN_PAYLOAD, "");
    assert!(report.had_trace);
    assert_eq!(report.path, parsed(Rung::Verbatim));
    assert_eq!(report.annotations.first().original, "teh");
}

#[test]
fn test_truncated_payload_inside_trace_is_harvested() {
    let report = Recovery::default().recover(fixtures::TRUNCATED_INSIDE_TRACE, "");
    assert!(report.had_trace);
    assert_eq!(report.path, RecoveryPath::Harvested);
    assert_eq!(report.annotations.len(), 1);
    assert_eq!(report.annotations.first().kind, AnnotationKind::Warning);
}

#[test]
fn test_empty_input_yields_single_fallback() {
    let report = Recovery::default().recover(fixtures::EMPTY, "");
    assert_eq!(report.path, RecoveryPath::Fallback);
    assert!(report.path.is_degraded());
    assert_eq!(report.annotations.len(), 1);
    assert_eq!(report.annotations.first().category, "system");
}

#[test]
fn test_stray_closer_is_corrected() {
    let report = Recovery::default().recover(fixtures::STRAY_CLOSER, "");
    assert_eq!(report.path, parsed(Rung::Enhanced));
    assert_eq!(report.annotations.len(), 1);
    assert_eq!(report.annotations.first().suggestion, "the");
}

#[test]
fn test_chat_envelope_is_unwrapped() {
    let annotations = recover_annotations(fixtures::CHAT_ENVELOPE, "");
    assert_eq!(annotations.first().kind, AnnotationKind::Suggestion);
    assert_eq!(annotations.first().suggestion, "utilize");
}

#[test]
fn test_longest_region_wins_over_prose_fragments() {
    let report = Recovery::default().recover(fixtures::PROSE_AROUND_PAYLOAD, "");
    assert_eq!(report.path, parsed(Rung::Verbatim));
    let originals: Vec<&str> = report.annotations.iter().map(|i| i.original.as_str()).collect();
    assert_eq!(originals, ["data is", "recieve"]);
}

#[test]
fn test_sloppy_syntax_is_repaired() {
    let report = Recovery::default().recover(fixtures::SLOPPY_SYNTAX, "");
    assert_eq!(report.path, parsed(Rung::Enhanced));
    let item = report.annotations.first();
    assert_eq!(item.original, "teh");
    assert_eq!(item.category, "spelling");
    assert_eq!(item.span, Span::new(4, 7));
}

#[test]
fn test_trace_only_response_is_synthesized() {
    let report = Recovery::default().recover(fixtures::TRACE_ONLY, "");
    assert_eq!(report.path, RecoveryPath::TraceSynthesized);
    let item = report.annotations.first();
    assert_eq!(item.kind, AnnotationKind::Suggestion);
    assert_eq!(item.original, "recieve");
    assert_eq!(item.suggestion, "receive");
}

#[test]
fn test_refusal_falls_back() {
    let report = Recovery::default().recover(fixtures::GARBAGE, "");
    assert_eq!(report.path, RecoveryPath::Fallback);
    assert!(!report.had_trace);
}

#[test]
fn test_every_fixture_yields_annotations() {
    for raw in fixtures::ALL {
        let annotations = recover_annotations(raw, "");
        assert!(!annotations.is_empty(), "empty result for {raw:?}");
    }
}

#[test]
fn test_quoted_brackets_do_not_break_boundaries() {
    let raw = r#"{"items":[{"kind":"error","original":"a ] } [ {","suggestion":"x","reason":"y","category":"z"}]}"#;
    let report = Recovery::default().recover(raw, "");
    assert_eq!(report.path, parsed(Rung::Verbatim));
    assert_eq!(report.annotations.first().original, "a ] } [ {");
}

#[test]
fn test_backticks_inside_values_keep_the_payload() {
    let raw = r#"{"items":[{"kind":"suggestion","original":"code","suggestion":"wrap as ```[code]``` block","reason":"formatting","category":"style"},{"kind":"error","original":"teh","suggestion":"the","reason":"typo","category":"spelling"}]}"#;
    let report = Recovery::default().recover(raw, "");
    assert_eq!(report.path, parsed(Rung::Verbatim));
    assert_eq!(report.annotations.len(), 2);
    assert_eq!(report.annotations.first().suggestion, "wrap as ```[code]``` block");
    assert_eq!(report.annotations.as_slice()[1].original, "teh");
}

#[test]
fn test_items_missing_mandatory_fields_are_dropped() {
    let raw = r#"[
        {"kind":"error","original":"a","suggestion":"b","reason":"c"},
        {"kind":"error","original":"d","suggestion":"e","reason":"f","category":"g"},
        {"original":"h","suggestion":"i","reason":"j","category":"k"}
    ]"#;
    let annotations = recover_annotations(raw, "");
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations.first().original, "d");
}

#[test]
fn test_winning_rung_applied_directly_gives_same_annotations() {
    let config = RecoveryConfig::default();
    for raw in [fixtures::STRAY_CLOSER, fixtures::SLOPPY_SYNTAX] {
        let report = Recovery::new(config.clone()).recover(raw, "");
        let RecoveryPath::Parsed { rung, .. } = report.path else {
            panic!("expected a parsed path for {raw}");
        };

        let stripped = strip_markup(&strip_reasoning(raw).text);
        let boundary = locate(&stripped, config.max_boundary_starts).unwrap();
        let value = structural_parse(&rung.apply(boundary.text)).unwrap();
        let direct = Validator::new(&config, "")
            .validate(&value, &mut IdAllocator::new())
            .unwrap();

        let strip_ids = |items: Vec<galley_core::AnnotationItem>| {
            items
                .into_iter()
                .map(|i| (i.kind, i.original, i.suggestion, i.reason, i.category, i.span))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip_ids(report.annotations.into_vec()), strip_ids(direct));
    }
}

#[test]
fn test_observer_sees_every_stage_in_order() {
    let (recovery, observer) = recording_recovery(RecoveryConfig::default());
    let _ = recovery.recover(fixtures::STRAY_CLOSER, "");

    let stages = observer.stages();
    assert_eq!(
        &stages[..4],
        &[
            Stage::Normalize,
            Stage::StripTrace,
            Stage::StripMarkup,
            Stage::LocateBoundary
        ]
    );
    assert_eq!(
        observer.outcome_of(Stage::Repair(Rung::Verbatim)),
        Some(StageOutcome::Rejected)
    );
    assert_eq!(
        observer.outcome_of(Stage::Repair(Rung::Enhanced)),
        Some(StageOutcome::Accepted(1))
    );
    assert_eq!(observer.outcome_of(Stage::Fallback), None);
}

#[test]
fn test_observer_reports_fallback() {
    let (recovery, observer) = recording_recovery(RecoveryConfig::default());
    let _ = recovery.recover(fixtures::GARBAGE, "");

    assert_eq!(
        observer.outcome_of(Stage::LocateBoundary),
        Some(StageOutcome::Skipped)
    );
    assert_eq!(observer.outcome_of(Stage::Harvest), Some(StageOutcome::Rejected));
    assert_eq!(
        observer.outcome_of(Stage::Fallback),
        Some(StageOutcome::Accepted(1))
    );
}

#[test]
fn test_observer_events_are_per_run_after_clear() {
    let (recovery, observer) = recording_recovery(RecoveryConfig::default());
    let _ = recovery.recover(fixtures::GARBAGE, "");
    assert!(observer
        .events()
        .iter()
        .any(|e| e.stage == Stage::Fallback && !e.detail.is_empty()));

    observer.clear();
    assert!(observer.events().is_empty());

    let _ = recovery.recover(fixtures::CLEAN_PAYLOAD, "");
    let events = observer.events();
    assert_eq!(events.first().map(|e| e.stage), Some(Stage::Normalize));
    assert!(events.iter().all(|e| e.stage != Stage::Fallback));
}

#[test]
fn test_tracing_observer_under_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let annotations = recover_annotations(fixtures::GARBAGE, "");
        assert_eq!(annotations.len(), 1);
    });
}

#[test]
fn test_custom_list_keys_and_placeholder() {
    let config = RecoveryConfig::default()
        .with_list_keys(["findings"])
        .with_placeholder("(n/a)");
    let raw = r#"{"findings":[{"kind":"warning","original":"","suggestion":"s","reason":"r","category":"c"}]}"#;
    let report = Recovery::new(config).recover(raw, "");
    assert_eq!(report.path, parsed(Rung::Verbatim));
    assert_eq!(report.annotations.first().original, "(n/a)");
}

#[test]
fn test_duplicate_model_ids_are_made_unique() {
    let raw = r#"[
        {"id":"x","kind":"error","original":"a","suggestion":"b","reason":"c","category":"d"},
        {"id":"x","kind":"error","original":"e","suggestion":"f","reason":"g","category":"h"}
    ]"#;
    let annotations = recover_annotations(raw, "");
    assert_eq!(annotations.first().id.as_str(), "x");
    assert_ne!(annotations.as_slice()[1].id.as_str(), "x");
}
