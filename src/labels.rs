use crate::config::AppConfig;
use crate::error::AppError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rekognition::{error::DisplayErrorContext, primitives::Blob, types::Image, Client};

/// Maps raw image bytes to lower-cased labels.
#[async_trait]
pub trait LabelOracle: Send + Sync {
    async fn detect_labels(&self, image: Vec<u8>) -> Result<Vec<String>, AppError>;
}

/// Rekognition `DetectLabels`. Cardinality and confidence limits are request
/// parameters and are not re-checked on the response.
pub struct RekognitionOracle {
    client: Client,
    max_labels: i32,
    min_confidence: f32,
}

impl RekognitionOracle {
    pub fn new(config: &AppConfig, sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            max_labels: config.max_labels,
            min_confidence: config.min_confidence,
        }
    }
}

#[async_trait]
impl LabelOracle for RekognitionOracle {
    async fn detect_labels(&self, image: Vec<u8>) -> Result<Vec<String>, AppError> {
        log::debug!(
            "Detecting labels for {} bytes (max {}, min confidence {})",
            image.len(),
            self.max_labels,
            self.min_confidence
        );
        let output = self
            .client
            .detect_labels()
            .image(Image::builder().bytes(Blob::new(image)).build())
            .max_labels(self.max_labels)
            .min_confidence(self.min_confidence)
            .send()
            .await
            .map_err(|e| AppError::Oracle(DisplayErrorContext(e).to_string()))?;

        let names = output
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|label| label.name);
        Ok(normalize_labels(names))
    }
}

/// Lower-cases in oracle order. Duplicates are kept.
pub fn normalize_labels<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    names.into_iter().map(|name| name.to_lowercase()).collect()
}
