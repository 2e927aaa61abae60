//! Vehicle label resolution for a detected accident.

use roadwatch_core::vehicle::{match_vehicle_label, VehicleType};
use roadwatch_vision::VehicleClassifier;
use serde::Serialize;

/// Where a resolved label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Supplied by the uploader.
    Manual,
    /// Matched in the vehicle classifier's answer.
    Classified,
    /// Classifier failed or named nothing in the vocabulary.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub vehicle_type: VehicleType,
    pub source: LabelSource,
}

/// Use the manual label when it is in the vocabulary, otherwise ask the
/// classifier about `jpeg` and match its answer.
pub async fn resolve_vehicle_type(
    manual: Option<&str>,
    jpeg: &[u8],
    classifier: &dyn VehicleClassifier,
) -> ResolvedLabel {
    if let Some(vehicle_type) = manual.and_then(VehicleType::parse_label) {
        return ResolvedLabel {
            vehicle_type,
            source: LabelSource::Manual,
        };
    }

    if let Some(label) = manual.filter(|m| !m.trim().is_empty()) {
        tracing::debug!(label, "Manual vehicle type not in vocabulary, classifying");
    }

    match classifier.classify_vehicle(jpeg).await {
        Ok(response) => {
            let vehicle_type = match_vehicle_label(&response);
            let source = if vehicle_type == VehicleType::DEFAULT
                && !response.to_lowercase().contains(VehicleType::DEFAULT.as_str())
            {
                LabelSource::Default
            } else {
                LabelSource::Classified
            };
            ResolvedLabel {
                vehicle_type,
                source,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Vehicle classifier failed, using default label");
            ResolvedLabel {
                vehicle_type: VehicleType::DEFAULT,
                source: LabelSource::Default,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use roadwatch_vision::VisionError;

    use super::*;

    struct Canned {
        answer: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(answer: Option<&'static str>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VehicleClassifier for Canned {
        async fn classify_vehicle(&self, _jpeg: &[u8]) -> Result<String, VisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .map(str::to_string)
                .ok_or(VisionError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn manual_label_passes_through_normalized() {
        let classifier = Canned::new(Some("car"));
        let label = resolve_vehicle_type(Some("Truck"), &[], &classifier).await;

        assert_eq!(label.vehicle_type, VehicleType::Truck);
        assert_eq!(label.source, LabelSource::Manual);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_manual_label_triggers_classification() {
        let classifier = Canned::new(Some("this looks like a red Truck on the highway"));
        let label = resolve_vehicle_type(Some("lorry"), &[], &classifier).await;

        assert_eq!(label.vehicle_type, VehicleType::Truck);
        assert_eq!(label.source, LabelSource::Classified);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_manual_label_classifies() {
        let classifier = Canned::new(Some("Bus"));
        let label = resolve_vehicle_type(None, &[], &classifier).await;
        assert_eq!(label.vehicle_type, VehicleType::Bus);
    }

    #[tokio::test]
    async fn unmatched_answer_defaults() {
        let classifier = Canned::new(Some("a tractor"));
        let label = resolve_vehicle_type(None, &[], &classifier).await;
        assert_eq!(label.vehicle_type, VehicleType::Other);
        assert_eq!(label.source, LabelSource::Default);
    }

    #[tokio::test]
    async fn explicit_other_is_classified() {
        let classifier = Canned::new(Some("other"));
        let label = resolve_vehicle_type(None, &[], &classifier).await;
        assert_eq!(label.vehicle_type, VehicleType::Other);
        assert_eq!(label.source, LabelSource::Classified);
    }

    #[tokio::test]
    async fn classifier_failure_defaults() {
        let classifier = Canned::new(None);
        let label = resolve_vehicle_type(Some(""), &[], &classifier).await;
        assert_eq!(label.vehicle_type, VehicleType::Other);
        assert_eq!(label.source, LabelSource::Default);
    }
}
