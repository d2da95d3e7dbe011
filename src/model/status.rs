use chrono::DateTime;
use chrono_humanize::{Accuracy, HumanTime, Tense};

/// Status icon shown next to a build or stage row.
///
/// The mapping from raw status strings is fixed: anything outside the four
/// known states renders without an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Passed,
    Failed,
    Running,
    Aborted,
}

impl StatusIcon {
    pub fn for_status(status: &str) -> Option<Self> {
        match status {
            "Succeeded" => Some(Self::Passed),
            "Failed" | "Error" => Some(Self::Failed),
            "Running" => Some(Self::Running),
            "Aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Stable asset key the host resolves to an icon file. The running icon
    /// is a spinner on the host side.
    pub fn asset_key(&self) -> &'static str {
        match self {
            Self::Passed => "build-passed",
            Self::Failed => "build-failed",
            Self::Running => "build-running",
            Self::Aborted => "build-aborted",
        }
    }
}

/// Uppercases only the first character; empty input yields an empty string.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Human-readable duration between two RFC 3339 timestamps, prefixed.
///
/// Returns `prefix + duration` (e.g. "2 hours") when both timestamps parse;
/// any missing or malformed timestamp yields an empty string. Malformed input
/// is expected during transient cluster states and is never an error.
pub fn elapsed_time(prefix: &str, started: Option<&str>, completed: Option<&str>) -> String {
    let (Some(started), Some(completed)) = (started, completed) else {
        return String::new();
    };

    let Ok(started) = DateTime::parse_from_rfc3339(started) else {
        return String::new();
    };
    let Ok(completed) = DateTime::parse_from_rfc3339(completed) else {
        return String::new();
    };

    let duration = completed.signed_duration_since(started);
    let human = HumanTime::from(duration).to_text_en(Accuracy::Rough, Tense::Present);
    format!("{prefix}{human}")
}
