use crate::domain::{DocumentUploadResponse, SimplifiedDocument};

/// The page-level UI state as one tagged union. Impossible combinations
/// (a processing flag alongside a completed result, for example) cannot be
/// represented.
#[derive(Debug, Clone)]
pub enum ViewState {
    Idle,
    Uploading,
    Processing { upload: DocumentUploadResponse },
    Completed { document: Box<SimplifiedDocument> },
    Failed { message: String },
}

impl ViewState {
    /// A new upload is only allowed from a settled state.
    pub fn is_busy(&self) -> bool {
        matches!(self, ViewState::Uploading | ViewState::Processing { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Uploading => "uploading",
            ViewState::Processing { .. } => "processing",
            ViewState::Completed { .. } => "completed",
            ViewState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    UploadStarted,
    UploadSucceeded(DocumentUploadResponse),
    UploadFailed(String),
    ProcessingSucceeded(Box<SimplifiedDocument>),
    ProcessingFailed(String),
    Reset,
}

/// The single reducer over the view state. Events that are not valid in the
/// current state are no-ops, so `Completed` and `Failed` can only be left
/// through `Reset`. An `UploadSucceeded` event lands in `Processing`; the
/// driver reacts to that state by issuing the process call, and its outcome
/// (success or failure) always comes back through this reducer.
pub fn reduce(state: ViewState, event: ViewEvent) -> ViewState {
    match (state, event) {
        (ViewState::Idle, ViewEvent::UploadStarted) => ViewState::Uploading,
        (ViewState::Uploading, ViewEvent::UploadSucceeded(upload)) => {
            ViewState::Processing { upload }
        }
        (ViewState::Uploading, ViewEvent::UploadFailed(message)) => ViewState::Failed { message },
        (ViewState::Processing { .. }, ViewEvent::ProcessingSucceeded(document)) => {
            ViewState::Completed { document }
        }
        (ViewState::Processing { .. }, ViewEvent::ProcessingFailed(message)) => {
            ViewState::Failed { message }
        }
        (ViewState::Completed { .. } | ViewState::Failed { .. }, ViewEvent::Reset) => {
            ViewState::Idle
        }
        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentType, ProcessingStatus, SimplificationLevel};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn upload() -> DocumentUploadResponse {
        DocumentUploadResponse {
            document_id: Uuid::new_v4(),
            filename: "lease.pdf".to_string(),
            file_type: DocumentType::Pdf,
            file_size: 2048,
            upload_timestamp: Utc::now(),
            status: ProcessingStatus::Uploaded,
            message: "Document uploaded successfully".to_string(),
        }
    }

    fn document() -> Box<SimplifiedDocument> {
        Box::new(SimplifiedDocument {
            document_id: Uuid::new_v4(),
            original_filename: "lease.pdf".to_string(),
            summary: "A lease.".to_string(),
            key_points: vec![],
            important_terms: BTreeMap::new(),
            deadlines_obligations: vec![],
            warnings: vec![],
            next_steps: vec![],
            processing_timestamp: Utc::now(),
            simplification_level: SimplificationLevel::Standard,
            confidence_score: 0.8,
            original_text: None,
            word_count_original: 10,
            word_count_simplified: 2,
            reading_level: "intermediate".to_string(),
        })
    }

    #[test]
    fn test_happy_path() {
        let state = reduce(ViewState::Idle, ViewEvent::UploadStarted);
        assert!(matches!(state, ViewState::Uploading));

        let state = reduce(state, ViewEvent::UploadSucceeded(upload()));
        assert!(matches!(state, ViewState::Processing { .. }));
        assert!(state.is_busy());

        let state = reduce(state, ViewEvent::ProcessingSucceeded(document()));
        assert!(matches!(state, ViewState::Completed { .. }));

        let state = reduce(state, ViewEvent::Reset);
        assert!(matches!(state, ViewState::Idle));
    }

    #[test]
    fn test_failures_land_in_failed() {
        let state = reduce(ViewState::Uploading, ViewEvent::UploadFailed("boom".into()));
        assert!(matches!(state, ViewState::Failed { .. }));

        let state = reduce(
            ViewState::Processing { upload: upload() },
            ViewEvent::ProcessingFailed("timeout".into()),
        );
        match state {
            ViewState::Failed { message } => assert_eq!(message, "timeout"),
            other => panic!("expected Failed, got {}", other.name()),
        }
    }

    #[test]
    fn test_terminal_states_only_accept_reset() {
        let completed = ViewState::Completed {
            document: document(),
        };
        for event in [
            ViewEvent::UploadStarted,
            ViewEvent::UploadSucceeded(upload()),
            ViewEvent::UploadFailed("x".into()),
            ViewEvent::ProcessingSucceeded(document()),
            ViewEvent::ProcessingFailed("x".into()),
        ] {
            let state = reduce(completed.clone(), event);
            assert!(matches!(state, ViewState::Completed { .. }));
        }
        assert!(matches!(
            reduce(completed, ViewEvent::Reset),
            ViewState::Idle
        ));

        let failed = ViewState::Failed {
            message: "x".into(),
        };
        let state = reduce(failed.clone(), ViewEvent::UploadStarted);
        assert!(matches!(state, ViewState::Failed { .. }));
        assert!(matches!(reduce(failed, ViewEvent::Reset), ViewState::Idle));
    }

    #[test]
    fn test_no_upload_while_busy() {
        let state = reduce(ViewState::Uploading, ViewEvent::UploadStarted);
        assert!(matches!(state, ViewState::Uploading));
        assert!(state.is_busy());

        let processing = ViewState::Processing { upload: upload() };
        let state = reduce(processing, ViewEvent::UploadStarted);
        assert!(matches!(state, ViewState::Processing { .. }));
    }

    #[test]
    fn test_idle_ignores_stray_results() {
        let state = reduce(ViewState::Idle, ViewEvent::ProcessingSucceeded(document()));
        assert!(matches!(state, ViewState::Idle));
        let state = reduce(ViewState::Idle, ViewEvent::Reset);
        assert!(matches!(state, ViewState::Idle));
    }
}
