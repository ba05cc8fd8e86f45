//! Video generation relay
//!
//! Bridges a fire-and-forget workflow webhook with clients that need to
//! learn the workflow's job id for their request and later receive the
//! job's result, either by polling or over a server-sent event stream.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
