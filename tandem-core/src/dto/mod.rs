//! Data transfer objects
//!
//! Wire shapes exchanged with the three external services. Only the fields
//! the pollers act on are modelled; everything else in a response is ignored.

pub mod github;
pub mod storage;
pub mod tagging;
