//! Survey lifecycle decision engine.
//!
//! Given a contact and an event configuration the engine decides whether a survey may be sent and
//! through which channel; given a completed response it classifies the score, routes thank-you
//! content, and selects follow-up automation rules. It also mints the API keys that external
//! systems use to trigger sends.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
