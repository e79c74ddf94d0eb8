use crate::storage::{ObjectTag, StoreError, CLASSIFICATION_TAG_KEY};

use super::classify::SensitiveKind;
use super::error::PipelineError;

// ═══════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════

/// One storage notification: the object to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEvent {
    pub source_bucket: String,
    pub object_key: String,
}

impl IngestEvent {
    pub fn new(source_bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            object_key: object_key.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Decisions
// ═══════════════════════════════════════════════════════════

/// Content verdict for one payload. Recomputed on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassificationVerdict {
    pub has_sensitive_data: bool,
    pub has_legal_flag: bool,
    /// First pattern that matched, when `has_sensitive_data`.
    pub sensitive_kind: Option<SensitiveKind>,
}

/// Access classification written as the `DataClassification` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationTag {
    Sensitive,
    Anonymized,
}

impl ClassificationTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensitive => "SENSITIVE",
            Self::Anonymized => "ANONYMIZED",
        }
    }

    pub fn object_tag(&self) -> ObjectTag {
        ObjectTag::new(CLASSIFICATION_TAG_KEY, self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub destination_bucket: String,
    pub classification: ClassificationTag,
}

// ═══════════════════════════════════════════════════════════
// Run report
// ═══════════════════════════════════════════════════════════

/// Orchestrator states, in the order a complete run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    CheckedIdempotency,
    Read,
    Transformed,
    Classified,
    Routed,
    Written,
    Tagged,
    Held,
    MarkedProcessed,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::CheckedIdempotency => "checked_idempotency",
            Self::Read => "read",
            Self::Transformed => "transformed",
            Self::Classified => "classified",
            Self::Routed => "routed",
            Self::Written => "written",
            Self::Tagged => "tagged",
            Self::Held => "held",
            Self::MarkedProcessed => "marked_processed",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// Written to its destination. Best-effort steps may still have failed.
    Routed,
    /// The source carried `processed=true`; nothing was touched.
    AlreadyProcessed,
    /// Stopped before completion. Earlier side effects are not rolled back.
    Aborted(PipelineError),
}

/// A best-effort step that failed without stopping the run.
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: PipelineState,
    pub error: StoreError,
}

/// Report of one pipeline run. Never persisted.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub event: IngestEvent,
    pub states: Vec<PipelineState>,
    pub disposition: Disposition,
    pub verdict: Option<ClassificationVerdict>,
    pub routing: Option<RoutingDecision>,
    pub step_failures: Vec<StepFailure>,
}

impl PipelineOutcome {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Received)
    }

    pub fn visited(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.disposition, Disposition::Routed)
    }
}
