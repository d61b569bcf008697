use serde::Serialize;

/// Step of the per-record pipeline at which a record failed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DecodeKey,
    FetchBytes,
    DetectLabels,
    Upsert,
    DeleteByQuery,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Indexed { key: String, labels: Vec<String> },
    Deleted { key: String, removed: u64 },
    Skipped { key: String, reason: String },
    Failed { key: String, stage: Stage, error: String },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Indexed { .. } | RecordOutcome::Deleted { .. } => self.succeeded += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
