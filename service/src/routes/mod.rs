//! API route definitions.
//!
//! This module organizes all HTTP routes for the demo service.

mod demo;
mod health;

pub use demo::{demo_routes, GreetRequest, GreetResponse};
pub use health::health_routes;
