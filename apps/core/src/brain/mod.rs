//! # Brain Module
//!
//! Fast, non-LLM decisions made before the hosted model is called.
//!
//! ## Components
//! - `intent`: keyword routing between short answers and detailed explanations
//! - `curriculum`: the lessons the tutor covers and their vocabulary
//! - `expansion`: query expansion and passage deduplication for retrieval
//! - `level`: rule-based level assessment of a finished session

pub mod curriculum;
pub mod expansion;
pub mod intent;
pub mod level;

pub use intent::{IntentRouter, ResponseMode, RouteDecision};
pub use level::{assess_level, StudentLevel};
