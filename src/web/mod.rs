//! Web API module for the study planner.

pub mod error;
pub mod extract;
pub mod middleware;
pub mod plan;
pub mod routes;
pub mod sessions;
pub mod status;
pub mod transcript;

pub use routes::*;
