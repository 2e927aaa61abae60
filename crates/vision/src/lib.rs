//! Vision-model collaborators.
//!
//! The pipeline asks two questions about a JPEG frame: "is this an
//! accident?" and "what vehicle is involved?". Both are answered in free
//! text; interpreting the text is the caller's job (see
//! `roadwatch_core::verdict` and `roadwatch_core::vehicle`).

pub mod gemini;

use async_trait::async_trait;

pub use gemini::{GeminiClient, GeminiConfig};

/// Prompt sent alongside a candidate frame.
pub const ACCIDENT_PROMPT: &str = "Is there an accident? Reply True or False.";

/// Prompt sent alongside the detection frame when no label was supplied.
pub const VEHICLE_PROMPT: &str =
    "What type of vehicle is in this accident? Choose one: car, truck, bus, bike, auto, or other.";

/// Errors from a vision-model round trip.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("vision API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response parsed but carried no text (e.g. blocked by safety filters).
    #[error("vision API returned no text")]
    EmptyResponse,
}

/// Answers "is there an accident in this frame?" with free text.
#[async_trait]
pub trait AccidentClassifier: Send + Sync {
    async fn classify_accident(&self, jpeg: &[u8]) -> Result<String, VisionError>;
}

/// Answers "what vehicle is in this accident?" with free text.
#[async_trait]
pub trait VehicleClassifier: Send + Sync {
    async fn classify_vehicle(&self, jpeg: &[u8]) -> Result<String, VisionError>;
}
