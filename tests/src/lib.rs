//! # ChainViz Test Suite
//!
//! Unified test crate for flows that span more than one component.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── pipeline.rs   # normalizer → bus → engine → UI mirror
//!     └── live.rs       # full runtime against a local push server
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cv-tests
//! cargo test -p cv-tests integration::live::
//! ```

pub mod integration;
