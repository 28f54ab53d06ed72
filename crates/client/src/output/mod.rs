//! Output formatting functions.

pub mod json;
pub mod pretty;

use crate::cli::OutputFormat;
use crate::session::CheckAuthReport;

/// Format a check-auth report for output.
pub fn format_report(report: &CheckAuthReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(report),
        OutputFormat::Pretty => pretty::format_report(report),
    }
}

/// Format configuration problems for output.
pub fn format_problems(problems: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(&serde_json::json!({
            "valid": problems.is_empty(),
            "problems": problems,
        })),
        OutputFormat::Pretty => pretty::format_problems(problems),
    }
}
