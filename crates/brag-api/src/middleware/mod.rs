//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod cors;

pub use cors::cors_middleware;
