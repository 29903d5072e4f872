//! End-to-end integration tests for Certrix.
//!
//! These tests exercise the full library surface:
//! - CA creation, loading and caching
//! - Leaf issuance and the validity policy
//! - Bundle generation and its archive layout
//! - Batch renewal with per-entry failure isolation
//! - JSON request handling at the invocation boundary

#![cfg(test)]
