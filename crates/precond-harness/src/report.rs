//! Summary rendering for stdout.
//!
//! The report is product output, not diagnostics: it goes to stdout via the
//! caller, while `tracing` carries everything else.

use precond_core::types::RunSummary;
use serde::Serialize;

/// Render the human-readable report: one verdict block per scenario plus
/// the final tally.
#[must_use]
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("============================================================\n");
    out.push_str("TEST SUMMARY\n");
    out.push_str("============================================================\n");

    for result in &summary.results {
        let status = if result.passed { "✓ PASS" } else { "✗ FAIL" };
        out.push_str(&format!("  {status}: {}\n", result.name));
        for line in result.detail.lines() {
            out.push_str(&format!("      {line}\n"));
        }
    }

    out.push_str(&format!(
        "\nTotal: {}/{} passed\n",
        summary.passed(),
        summary.results.len()
    ));
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: usize,
    failed: usize,
    ok: bool,
    results: &'a [precond_core::types::ScenarioResult],
}

/// Render the summary as JSON for scripting.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    let report = JsonReport {
        passed: summary.passed(),
        failed: summary.failed(),
        ok: summary.all_passed(),
        results: &summary.results,
    };
    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use precond_core::types::ScenarioResult;

    use super::*;

    fn summary() -> RunSummary {
        let mut summary = RunSummary::default();
        summary.record(ScenarioResult::pass("If-None-Match create new", "expected Applied"));
        summary.record(ScenarioResult::fail(
            "Optimistic locking race",
            "2 succeeded, 3 failed out of 5 writers\nlost update",
        ));
        summary
    }

    #[test]
    fn test_text_report_lists_verdicts_and_tally() {
        let text = render_text(&summary());
        assert!(text.contains("✓ PASS: If-None-Match create new"));
        assert!(text.contains("✗ FAIL: Optimistic locking race"));
        assert!(text.contains("      lost update"));
        assert!(text.contains("Total: 1/2 passed"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let json = render_json(&summary()).expect("render");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["passed"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["ok"], false);
        assert_eq!(value["results"][1]["name"], "Optimistic locking race");
    }
}
