//! AI analysis engine for osintel.
//!
//! Builds an analysis-type-specific prompt, invokes the inference endpoint,
//! and parses the semi-structured response into a structured payload. The
//! engine never raises to its caller: transport failures and unparseable
//! model output are both folded into the returned [`AnalysisOutcome`], so a
//! batch can never be aborted by a single bad item.

pub mod client;
pub mod engine;
pub mod error;
pub mod prompt;

pub use client::InferenceClient;
pub use engine::{AnalysisEngine, AnalysisInput, AnalysisOutcome, EngineConfig, ModelOutput};
pub use error::EngineError;
