//! Pretty output formatting.

use crate::session::CheckAuthReport;

/// Format a check-auth report for display.
pub fn format_report(report: &CheckAuthReport) -> String {
    let mut output = if report.authenticated {
        "AUTHENTICATED".to_string()
    } else {
        "NOT AUTHENTICATED".to_string()
    };

    if let Some(user) = &report.user {
        if let Some(sub) = user.get("sub").and_then(|v| v.as_str()) {
            output.push_str(&format!("\n  Subject: {}", sub));
        }
        if let Some(email) = user.get("email").and_then(|v| v.as_str()) {
            output.push_str(&format!("\n  Email: {}", email));
        }
        if let Some(name) = user.get("name").and_then(|v| v.as_str()) {
            output.push_str(&format!("\n  Name: {}", name));
        }
    }

    if !report.events.is_empty() {
        output.push_str("\n  Events:");
        for event in &report.events {
            output.push_str(&format!("\n    - {}", event));
        }
    }
    output
}

/// Format configuration problems for display.
pub fn format_problems(problems: &[String]) -> String {
    if problems.is_empty() {
        return "Configuration is valid.".to_string();
    }
    let mut output = format!("PROBLEMS ({})\n", problems.len());
    output.push_str(&"-".repeat(40));
    for problem in problems {
        output.push_str(&format!("\n  {}", problem));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_authenticated_report() {
        let report = CheckAuthReport {
            authenticated: true,
            user: Some(serde_json::json!({"sub": "user-1", "email": "dev@example.com"})),
            events: vec!["authorized".to_string()],
        };

        assert_eq!(
            format_report(&report),
            "AUTHENTICATED\n  Subject: user-1\n  Email: dev@example.com\n  Events:\n    - authorized"
        );
    }

    #[test]
    fn test_format_unauthenticated_report() {
        let report = CheckAuthReport {
            authenticated: false,
            user: None,
            events: Vec::new(),
        };

        assert_eq!(format_report(&report), "NOT AUTHENTICATED");
    }

    #[test]
    fn test_format_problems() {
        assert_eq!(format_problems(&[]), "Configuration is valid.");
        assert!(format_problems(&["client_id is required".to_string()])
            .ends_with("\n  client_id is required"));
    }
}
