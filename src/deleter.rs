use crate::batch::{BatchReport, RecordOutcome, Stage};
use crate::document::build_delete_query;
use crate::error::AppError;
use crate::notification::{StorageEvent, StorageRecord};
use crate::search::{SearchTransport, StoreRequest};
use std::sync::Arc;

/// Handles object-removed notifications with a delete-by-query on `key`,
/// which also clears any duplicate documents left for that key.
pub struct DeletionHandler {
    search: Arc<dyn SearchTransport>,
    index: String,
}

impl DeletionHandler {
    pub fn new(search: Arc<dyn SearchTransport>, index: impl Into<String>) -> Self {
        Self {
            search,
            index: index.into(),
        }
    }

    /// Attempts every record, then fails the invocation if any of them failed,
    /// regardless of position, so the batch can be redelivered. Deleting an
    /// already-removed key is a no-op, which makes redelivery safe.
    pub async fn handle(&self, event: &StorageEvent) -> Result<BatchReport, AppError> {
        log::info!("Deleting batch of {} record(s)", event.records.len());
        let mut report = BatchReport::default();

        for record in &event.records {
            let outcome = self.process_record(record).await;
            if let RecordOutcome::Failed { key, stage, error } = &outcome {
                log::warn!("Failed to de-index {} at {:?}: {}", key, stage, error);
            }
            report.push(outcome);
        }

        if report.has_failures() {
            log::error!(
                "Deletion batch failed for {} of {} record(s)",
                report.failed,
                report.total
            );
            return Err(AppError::BatchFailed {
                failed: report.failed,
                total: report.total,
            });
        }

        log::info!("Deletion batch finished: {} record(s) removed", report.succeeded);
        Ok(report)
    }

    async fn process_record(&self, record: &StorageRecord) -> RecordOutcome {
        let key = match record.decoded_key() {
            Ok(key) => key,
            Err(e) => {
                return RecordOutcome::Failed {
                    key: record.raw_key().to_string(),
                    stage: Stage::DecodeKey,
                    error: e.to_string(),
                }
            }
        };

        let request = StoreRequest::delete_by_query(&self.index, build_delete_query(&key));
        match self.search.send(request).await {
            Ok(body) => {
                let removed = body["deleted"].as_u64().unwrap_or(0);
                log::info!("Removed {} document(s) for {}", removed, key);
                RecordOutcome::Deleted { key, removed }
            }
            Err(e) => RecordOutcome::Failed {
                key,
                stage: Stage::DeleteByQuery,
                error: e.to_string(),
            },
        }
    }
}
