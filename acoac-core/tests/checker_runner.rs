//! Exercises [`CheckerRunner::run`]'s subprocess spawn/timeout/kill logic
//! end to end against fixture shell scripts standing in for a real
//! bounded model checker binary.

use std::path::PathBuf;
use std::time::Duration;

use acoac_core::checker::{parse_checker_output, CheckerRunner};
use acoac_core::error::CheckerError;
use acoac_core::model::AnalysisResult;
use acoac_core::symbols::Symbols;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn run_captures_a_reachable_verdict_from_a_successful_child() {
    let runner = CheckerRunner::new(fixture("fake_checker_reachable.sh").to_string_lossy().into_owned(), Duration::from_secs(5));
    let model = fixture("fake_checker_reachable.sh");
    let output = runner.run(&model, Some("10")).unwrap();

    let mut symbols = Symbols::new();
    let r = symbols.intern_attr("r");
    symbols.intern_value(r, "X");
    let result = parse_checker_output(&output, &symbols, &[]).unwrap();
    match result {
        AnalysisResult::Reachable { actions, .. } => assert_eq!(actions.len(), 1),
        other => panic!("expected Reachable, got {other:?}"),
    }
}

#[test]
fn run_captures_an_unreachable_verdict() {
    let runner = CheckerRunner::new(fixture("fake_checker_unreachable.sh").to_string_lossy().into_owned(), Duration::from_secs(5));
    let model = fixture("fake_checker_unreachable.sh");
    let output = runner.run(&model, None).unwrap();

    let symbols = Symbols::new();
    let result = parse_checker_output(&output, &symbols, &[]).unwrap();
    assert_eq!(result, AnalysisResult::Unreachable);
}

#[test]
fn run_kills_a_child_that_outlives_its_timeout() {
    let runner = CheckerRunner::new(fixture("fake_checker_hangs.sh").to_string_lossy().into_owned(), Duration::from_millis(200));
    let model = fixture("fake_checker_hangs.sh");
    let err = runner.run(&model, None).unwrap_err();
    assert!(matches!(err, CheckerError::Timeout));
}

#[test]
fn run_reports_spawn_failure_for_a_missing_binary() {
    let runner = CheckerRunner::new("/nonexistent/not-a-real-checker".to_string(), Duration::from_secs(5));
    let model = fixture("fake_checker_unreachable.sh");
    let err = runner.run(&model, None).unwrap_err();
    assert!(matches!(err, CheckerError::Spawn(_)));
}
