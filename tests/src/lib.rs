//! # Xorde Hub Test Suite
//!
//! Cross-crate scenarios that drive the hub the way a deployment does.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── codec_benchmarks.rs   # packet codec and module discovery
//! └── src/integration/
//!     ├── scenarios.rs          # reconciliation and link scenarios
//!     └── transport.rs          # full runtime over TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p hub-tests
//!
//! # Benchmarks
//! cargo bench -p hub-tests
//! ```

pub mod integration;
