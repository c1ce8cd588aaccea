// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Consistent formatting for fatal, user-facing errors.
//!
//! Each message carries possible causes and actionable fixes. Everything
//! that is not fatal is logged through `tracing` instead.

/// Formats an error message with title, causes and fixes.
///
/// # Example
///
/// ```
/// use fwsync::error::format_error;
///
/// let error = format_error(
///     "Unable to retrieve firmware information",
///     &["No network connection", "Catalog service is down"],
///     &["Check connectivity: curl https://api.ipsw.me/v4/devices"],
/// );
/// assert!(error.contains("Possible causes:"));
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = format!("[✗] {}\n", title);

    if !causes.is_empty() {
        output.push_str("\nPossible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
    }

    if !fixes.is_empty() {
        output.push_str("\nTry these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
    }

    output
}

/// Message for an unreachable catalog, which ends the run.
pub fn catalog_unavailable(url: &str, err: &dyn std::fmt::Display) -> String {
    let title = format!("Unable to retrieve firmware information from {}: {}", url, err);
    let check = format!("Check connectivity: curl {}/devices", url.trim_end_matches('/'));
    format_error(
        &title,
        &[
            "No network connection",
            "Catalog service is down or rate limiting",
            "Wrong catalog_url in config",
        ],
        &[
            check.as_str(),
            "Raise the timeout: --read-timeout 120",
            "Point at another mirror: --catalog-url <URL>",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        let error = format_error("Test Error", &["Cause 1", "Cause 2"], &["Fix 1", "Fix 2"]);

        assert!(error.starts_with("[✗] Test Error"));
        assert!(error.contains("  - Cause 1"));
        assert!(error.contains("  - Cause 2"));
        assert!(error.contains("  1. Fix 1"));
        assert!(error.contains("  2. Fix 2"));
    }

    #[test]
    fn test_empty_causes_and_fixes() {
        let error = format_error("Empty test", &[], &[]);
        assert_eq!(error, "[✗] Empty test\n");
    }

    #[test]
    fn test_catalog_unavailable_mentions_url() {
        let error = catalog_unavailable("https://api.ipsw.me/v4/", &"HTTP 503");
        assert!(error.contains("https://api.ipsw.me/v4/: HTTP 503"));
        assert!(error.contains("curl https://api.ipsw.me/v4/devices"));
    }
}
