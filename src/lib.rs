// ABOUTME: Library root for berth, an HTTP control plane over a container engine.
// ABOUTME: The main binary is in main.rs.

#![recursion_limit = "256"]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod outcome;
pub mod params;
pub mod types;
