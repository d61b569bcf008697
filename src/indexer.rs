use crate::batch::{BatchReport, RecordOutcome, Stage};
use crate::document::{document_id, encode};
use crate::error::AppError;
use crate::labels::LabelOracle;
use crate::notification::{is_folder_placeholder, StorageEvent, StorageRecord};
use crate::search::{SearchTransport, StoreRequest};
use crate::storage::ObjectStore;
use chrono::Utc;
use std::sync::Arc;

/// Handles object-created notifications: fetch, label, upsert.
pub struct IndexingHandler {
    store: Arc<dyn ObjectStore>,
    oracle: Arc<dyn LabelOracle>,
    search: Arc<dyn SearchTransport>,
    index: String,
}

impl IndexingHandler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        oracle: Arc<dyn LabelOracle>,
        search: Arc<dyn SearchTransport>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            oracle,
            search,
            index: index.into(),
        }
    }

    /// Processes records one after another. A failing record is reported and
    /// logged; it never stops its siblings and never fails the batch.
    pub async fn handle(&self, event: &StorageEvent) -> BatchReport {
        log::info!("Indexing batch of {} record(s)", event.records.len());
        let mut report = BatchReport::default();

        for record in &event.records {
            let outcome = self.process_record(record).await;
            if let RecordOutcome::Failed { key, stage, error } = &outcome {
                log::warn!(
                    "Failed to index s3://{}/{} at {:?}: {}",
                    record.bucket(),
                    key,
                    stage,
                    error
                );
            }
            report.push(outcome);
        }

        log::info!(
            "Indexing batch finished: {} indexed, {} skipped, {} failed",
            report.succeeded,
            report.skipped,
            report.failed
        );
        report
    }

    async fn process_record(&self, record: &StorageRecord) -> RecordOutcome {
        log::debug!(
            "Received {} for s3://{}/{} (sequencer {:?})",
            record.event_name.as_deref().unwrap_or("object event"),
            record.bucket(),
            record.raw_key(),
            record.s3.object.sequencer
        );

        let key = match record.decoded_key() {
            Ok(key) => key,
            Err(e) => return failed(record.raw_key(), Stage::DecodeKey, e),
        };

        if is_folder_placeholder(&key) {
            log::debug!("Skipping folder placeholder: {}", key);
            return RecordOutcome::Skipped {
                key,
                reason: "folder placeholder".to_string(),
            };
        }

        match self.index_object(record.bucket(), &key).await {
            Ok(labels) => {
                log::info!("Indexed {} successfully with labels: {:?}", key, labels);
                RecordOutcome::Indexed { key, labels }
            }
            Err((stage, e)) => failed(&key, stage, e),
        }
    }

    async fn index_object(&self, bucket: &str, key: &str) -> Result<Vec<String>, (Stage, AppError)> {
        let bytes = self
            .store
            .get_object(bucket, key)
            .await
            .map_err(|e| (Stage::FetchBytes, e))?;

        let labels = self
            .oracle
            .detect_labels(bytes)
            .await
            .map_err(|e| (Stage::DetectLabels, e))?;
        log::debug!("Detected labels for {}: {:?}", key, labels);

        let document = encode(key, bucket, &labels, Utc::now());
        let id = document_id(bucket, key);
        log::trace!("Built document {} for {}: {}", id, key, document);

        self.search
            .send(StoreRequest::upsert(&self.index, &id, document))
            .await
            .map_err(|e| (Stage::Upsert, e))?;

        Ok(labels)
    }
}

fn failed(key: &str, stage: Stage, error: AppError) -> RecordOutcome {
    RecordOutcome::Failed {
        key: key.to_string(),
        stage,
        error: error.to_string(),
    }
}
