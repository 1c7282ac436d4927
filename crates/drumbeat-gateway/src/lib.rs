//! HTTP control surface: submit, inspect, and cancel send tasks.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
