//! Deterministic external namespace names.
//!
//! The provisioning backend requires DNS-1123 subdomain labels: lowercase
//! `[a-z0-9-]`, at most 63 characters. The name is derived from
//! (team id, project name) so the same project always maps to the same
//! namespace.

use uuid::Uuid;

pub const MAX_NAMESPACE_LEN: usize = 63;

/// Sanitize `{team_id}-{project_name}` into a valid namespace name:
/// lowercased, disallowed characters replaced by `-`, hyphen runs
/// collapsed, leading/trailing hyphens stripped, truncated to 63 chars.
pub fn namespace_name(team_id: Uuid, project_name: &str) -> String {
    let raw = format!("{team_id}-{project_name}").to_lowercase();

    let mut sanitized = String::with_capacity(raw.len());
    let mut prev_hyphen = false;
    for c in raw.chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' {
            if prev_hyphen {
                continue;
            }
            prev_hyphen = true;
        } else {
            prev_hyphen = false;
        }
        sanitized.push(c);
    }

    sanitized
        .trim_matches('-')
        .chars()
        .take(MAX_NAMESPACE_LEN)
        .collect()
}
