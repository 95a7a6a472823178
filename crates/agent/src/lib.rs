//! Language-model side of the CRM.
//!
//! - [`llm`]: one [`LlmClient`] per provider, chosen once from configuration
//! - [`structured`]: prompt → fenced JSON → typed value, with fallback
//! - [`extraction`]: contact/deal extraction and summaries
//! - [`query`]: natural-language questions → [`FilterSpec`](zeroclick_core::query::FilterSpec)
//! - [`speech`]: audio transcription
//!
//! The model only ever translates text into structured records. Every
//! failure degrades to a fixed fallback value instead of an error.

pub mod extraction;
pub mod llm;
pub mod query;
pub mod speech;
pub mod structured;

/// Scripted collaborators for tests in this and dependent crates.
#[cfg(any(test, feature = "testing"))]
pub mod test_support;

pub use extraction::{CrmExtractor, DEFAULT_SUMMARY_WORDS};
pub use llm::{build_client, CompletionRequest, LlmClient, LlmError};
pub use query::QueryAgent;
pub use speech::{AudioInput, SpeechError, Transcriber, Transcription, WhisperApiTranscriber};
