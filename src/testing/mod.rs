//! Testing utilities and mock implementations
//!
//! Mocks stand in for the inference backend, the text extractor and the
//! decision store, so tests run without model files, OCR tools or disk I/O.

pub mod mocks;

pub use mocks::*;
