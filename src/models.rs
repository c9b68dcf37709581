use crate::error::PipelineError;

/// Severity of a user-facing banner, named after the bootstrap-style
/// classes the form renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Danger,
    Warning,
    Success,
}

impl MessageKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            MessageKind::Danger => "danger",
            MessageKind::Warning => "warning",
            MessageKind::Success => "success",
        }
    }
}

/// Terminal state of one upload/profile cycle, as seen by the web layer.
///
/// The pipeline returns this instead of pushing flash messages into a
/// session; controllers turn it into a redirect carrying the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Ready,
    NoFile,
    RejectedFormat,
    UnreadableFile,
    ProfilingFailed,
    StorageFailure,
}

impl UploadOutcome {
    pub fn from_result(result: &Result<(), PipelineError>) -> Self {
        match result {
            Ok(()) => UploadOutcome::Ready,
            Err(PipelineError::NoFile) => UploadOutcome::NoFile,
            Err(PipelineError::RejectedFormat(_)) => UploadOutcome::RejectedFormat,
            Err(PipelineError::Unreadable(_)) => UploadOutcome::UnreadableFile,
            Err(PipelineError::Profiling(_)) => UploadOutcome::ProfilingFailed,
            Err(PipelineError::Storage(_)) => UploadOutcome::StorageFailure,
        }
    }

    /// Stable code carried in the redirect query string.
    pub fn code(&self) -> &'static str {
        match self {
            UploadOutcome::Ready => "ready",
            UploadOutcome::NoFile => "no_file",
            UploadOutcome::RejectedFormat => "rejected_format",
            UploadOutcome::UnreadableFile => "unreadable_file",
            UploadOutcome::ProfilingFailed => "profiling_failed",
            UploadOutcome::StorageFailure => "storage_failure",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, UploadOutcome::Ready)
    }
}

/// A banner shown above the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub kind: MessageKind,
    pub text: &'static str,
}

impl Feedback {
    /// Maps a status code from the query string back to a banner.
    /// Unknown codes render nothing.
    pub fn for_code(code: &str) -> Option<Feedback> {
        let feedback = match code {
            "ready" => Feedback {
                kind: MessageKind::Success,
                text: "Report generated successfully. Use Download Report to get it.",
            },
            "no_file" => Feedback {
                kind: MessageKind::Warning,
                text: "No file selected. Please choose a file.",
            },
            "rejected_format" => Feedback {
                kind: MessageKind::Danger,
                text: "Unsupported file format. Upload a CSV or Excel file.",
            },
            "unreadable_file" => Feedback {
                kind: MessageKind::Danger,
                text: "Could not read the file. Please upload a valid CSV or Excel file.",
            },
            "profiling_failed" => Feedback {
                kind: MessageKind::Danger,
                text: "Report generation failed. The file could not be profiled.",
            },
            "storage_failure" => Feedback {
                kind: MessageKind::Danger,
                text: "Internal error while storing the upload. Please try again.",
            },
            "no_report" => Feedback {
                kind: MessageKind::Warning,
                text: "No report available. Please upload a file first.",
            },
            _ => return None,
        };
        Some(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_outcome_code_maps_to_a_feedback() {
        let outcomes = [
            UploadOutcome::Ready,
            UploadOutcome::NoFile,
            UploadOutcome::RejectedFormat,
            UploadOutcome::UnreadableFile,
            UploadOutcome::ProfilingFailed,
            UploadOutcome::StorageFailure,
        ];
        for outcome in outcomes {
            assert!(
                Feedback::for_code(outcome.code()).is_some(),
                "no feedback for {:?}",
                outcome
            );
        }
    }

    #[test]
    fn unknown_code_renders_nothing() {
        assert!(Feedback::for_code("definitely_not_a_code").is_none());
        assert!(Feedback::for_code("").is_none());
    }

    #[test]
    fn failure_results_map_to_their_outcome() {
        let err: Result<(), PipelineError> = Err(PipelineError::NoFile);
        assert_eq!(UploadOutcome::from_result(&err), UploadOutcome::NoFile);

        let err: Result<(), PipelineError> =
            Err(PipelineError::RejectedFormat("notes.txt".to_string()));
        assert_eq!(
            UploadOutcome::from_result(&err),
            UploadOutcome::RejectedFormat
        );

        assert_eq!(
            UploadOutcome::from_result(&Ok(())),
            UploadOutcome::Ready
        );
        assert!(UploadOutcome::Ready.is_ready());
    }

    #[test]
    fn ready_is_a_success_banner() {
        let feedback = Feedback::for_code("ready").unwrap();
        assert_eq!(feedback.kind, MessageKind::Success);
        assert_eq!(feedback.kind.css_class(), "success");
    }
}
