//! Provider End-to-End Suite
//!
//! Exercises the root facade against both providers with one shared model.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test provider_end_to_end
//! ```

mod common;

mod document_store;
mod in_memory;
