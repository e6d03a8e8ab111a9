//! Property-based tests for command-resilience components.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across all components.

pub mod bulkhead;
pub mod circuit_breaker;
