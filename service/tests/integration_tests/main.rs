//! Integration tests for the Tracelink demo service.
//!
//! These tests drive the fully instrumented router and inspect the spans and
//! log records it produces.

mod common;
mod demo_tests;
mod health_tests;
mod propagation_tests;
