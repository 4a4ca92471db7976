//! Covert unlock gesture recognition for HushVault.
//!
//! Tap events from the disguised surface are matched against configured
//! sequences under timing and rate-limit constraints. Recognition happens
//! before any password is requested and is independent of key custody.

pub mod config;
pub mod recognizer;

pub use config::{GestureConfig, TapSequence, TapTarget};
pub use recognizer::{GestureRecognizer, GestureSnapshot, RecognizerState, TapOutcome};
