//! First-positive accident detection over sampled candidates.

use roadwatch_core::verdict::parse_accident_verdict;
use roadwatch_vision::AccidentClassifier;

use crate::sampler::{Candidate, Sampler};
use crate::source::{DecodeError, FrameSource};

/// The candidate that fired, with the JPEG the classifier saw.
#[derive(Debug)]
pub struct Detection {
    pub candidate: Candidate,
    pub jpeg: Vec<u8>,
    /// Candidates classified, including the one that fired.
    pub candidates_checked: usize,
}

/// Result of running the detection loop to completion or first hit.
#[derive(Debug)]
pub enum DetectionResult {
    Detected(Detection),
    NotDetected { candidates_checked: usize },
}

/// Classify candidates in order and stop at the first positive verdict.
///
/// Later candidates are never classified, and no frames beyond the firing
/// candidate are decoded. A classifier error, or a frame that cannot be
/// encoded, counts as a negative verdict. Only decode errors abort.
pub async fn detect_first_accident<S: FrameSource + ?Sized>(
    sampler: &mut Sampler<'_, S>,
    classifier: &dyn AccidentClassifier,
) -> Result<DetectionResult, DecodeError> {
    let mut candidates_checked = 0;

    while let Some(candidate) = sampler.next_candidate().await? {
        candidates_checked += 1;
        let position = candidate.position;

        let jpeg = match candidate.frame.to_jpeg() {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(position, error = %e, "Failed to encode candidate frame, skipping");
                continue;
            }
        };

        match classifier.classify_accident(&jpeg).await {
            Ok(response) if parse_accident_verdict(&response) => {
                tracing::info!(position, "Accident detected");
                return Ok(DetectionResult::Detected(Detection {
                    candidate,
                    jpeg,
                    candidates_checked,
                }));
            }
            Ok(response) => {
                tracing::debug!(position, response = %response, "No accident in candidate");
            }
            Err(e) => {
                tracing::warn!(position, error = %e, "Accident classifier failed, treating as negative");
            }
        }
    }

    Ok(DetectionResult::NotDetected { candidates_checked })
}
