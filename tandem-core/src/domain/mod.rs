//! Core domain types
//!
//! These types are shared between the HTTP clients (which produce them from
//! wire responses) and the pollers (which make decisions on them).

pub mod poller;
pub mod repo;
pub mod state;
pub mod workflow;
