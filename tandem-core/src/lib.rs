//! Tandem Core
//!
//! Core types shared by the Tandem pollers and their service clients.
//!
//! This crate contains:
//! - Domain types: poller configuration, repository coordinates, workflow
//!   runs and the persisted poller state records
//! - DTOs: wire shapes exchanged with GitHub, the content store and the
//!   tagging service

pub mod domain;
pub mod dto;
