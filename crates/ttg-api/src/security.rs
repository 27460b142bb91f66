//! Input validation for path parameters and log output.

/// Longest prompt excerpt written to logs.
pub const MAX_LOGGED_PROMPT_CHARS: usize = 80;

/// Validate a video or job id taken from a URL path.
///
/// Valid format: ASCII alphanumerics and hyphens, 1-64 chars.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Single-line, truncated copy of user text for log fields.
pub fn log_preview(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_LOGGED_PROMPT_CHARS)
        .collect()
}
