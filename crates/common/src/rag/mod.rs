//! Query resolution engine
//!
//! Decides, per incoming question, whether to answer via retrieved-document
//! grounding, supplied fallback context, or ungrounded model inference, and
//! assembles the final prompt.

mod engine;
mod preprocess;
mod postprocess;

pub use engine::{AnswerEnvelope, AnswerSource, QueryEngine};
pub use preprocess::rewrite_for_search;
pub use postprocess::normalize_time_ranges;
