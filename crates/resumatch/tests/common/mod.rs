//! Shared test utilities for resumatch integration tests.
//!
//! This module provides:
//! - `TestHarness`: an upload tree, a file database and fake collaborators
//!   wired into `Services`
//! - deterministic fakes for the embedding, inference and OCR services

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
