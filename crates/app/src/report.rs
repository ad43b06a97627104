use chrono::DateTime;
use repofinder_core::domain::FinderResult;

/// Render resolved results as the numbered listing printed by the CLI.
pub fn format_results(results: &[FinderResult]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "Result {}: {}\n",
            i,
            result.remote().url().unwrap_or("")
        ));
        out.push_str(&format!(" - Finder: {}\n", result.finder()));
        out.push_str(&format!(" - Priority: {}\n", result.priority()));
        out.push_str(&format!(
            " - Summary last modified: {}\n",
            format_timestamp(result.summary_last_modified())
        ));
        out.push_str(" - Refs:\n");
        for name in result.supported_refs() {
            out.push_str(&format!("  - {}\n", name));
        }
    }
    out
}

/// Seconds since the epoch as ISO-8601 UTC; 0 is unknown.
fn format_timestamp(seconds: u64) -> String {
    if seconds == 0 {
        return "unknown".to_string();
    }

    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "invalid".to_string())
}
