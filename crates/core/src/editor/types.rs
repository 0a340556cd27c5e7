//! Types for the editor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Per-job editing options, passed through to the tool.
///
/// Values are not validated beyond dropping empty strings. `threshold`
/// only applies together with `edit_mode`, and a zero threshold counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditOptions {
    /// Padding kept around cuts, e.g. `0.2sec`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,

    /// Selection strategy, e.g. `audio` or `motion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_mode: Option<String>,

    /// Sensitivity for the selection strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl EditOptions {
    pub fn with_margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = Some(margin.into());
        self
    }

    pub fn with_edit_mode(mut self, mode: impl Into<String>) -> Self {
        self.edit_mode = Some(mode.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Builds the tool arguments for these options. Unset options are omitted.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(margin) = non_empty(&self.margin) {
            args.push("--margin".to_string());
            args.push(margin.to_string());
        }

        if let Some(mode) = non_empty(&self.edit_mode) {
            args.push("--edit".to_string());
            match self.threshold.filter(|t| *t != 0.0) {
                Some(threshold) => args.push(format!("{}:threshold={}", mode, threshold)),
                None => args.push(mode.to_string()),
            }
        }

        args
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// One execution request.
#[derive(Debug, Clone)]
pub struct EditJob {
    pub job_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: EditOptions,
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The tool exited successfully and wrote the output.
    Success {
        output_path: PathBuf,
        duration_ms: u64,
    },
    /// The tool exited with a non-zero status.
    ToolFailure {
        exit_code: Option<i32>,
        /// Diagnostic stream, verbatim.
        stderr: String,
    },
    /// The deadline elapsed and the process was killed.
    Timeout { deadline: Duration },
}

impl EditOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            EditOutcome::Success { .. } => "success",
            EditOutcome::ToolFailure { .. } => "tool_failure",
            EditOutcome::Timeout { .. } => "timeout",
        }
    }
}

/// Formats a deadline for status messages, e.g. `1 hour` or `90 seconds`.
pub fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else if secs > 0 {
        (secs, "second")
    } else {
        return format!("{} ms", duration.as_millis());
    };

    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_options_no_args() {
        assert!(EditOptions::default().to_args().is_empty());
    }

    #[test]
    fn test_margin_and_mode_with_threshold() {
        let options = EditOptions::default()
            .with_margin("0.2sec")
            .with_edit_mode("audio")
            .with_threshold(0.04);
        assert_eq!(
            options.to_args(),
            vec!["--margin", "0.2sec", "--edit", "audio:threshold=0.04"]
        );
    }

    #[test]
    fn test_threshold_without_mode_ignored() {
        let options = EditOptions::default().with_threshold(0.5);
        assert!(options.to_args().is_empty());
    }

    #[test]
    fn test_zero_threshold_is_unset() {
        let options = EditOptions::default()
            .with_edit_mode("audio")
            .with_threshold(0.0);
        assert_eq!(options.to_args(), vec!["--edit", "audio"]);
    }

    #[test]
    fn test_empty_strings_are_unset() {
        let options = EditOptions {
            margin: Some(String::new()),
            edit_mode: Some("  ".to_string()),
            threshold: Some(0.1),
        };
        assert!(options.to_args().is_empty());
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(Duration::from_secs(3600)), "1 hour");
        assert_eq!(humanize_duration(Duration::from_secs(7200)), "2 hours");
        assert_eq!(humanize_duration(Duration::from_secs(120)), "2 minutes");
        assert_eq!(humanize_duration(Duration::from_secs(90)), "90 seconds");
        assert_eq!(humanize_duration(Duration::from_millis(250)), "250 ms");
    }
}
