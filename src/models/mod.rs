//! Core data models for the model gateway.
//!
//! These entities mirror the payloads exchanged with the remote platform
//! (tokens, buckets, objects, translation jobs) and serialize naturally as
//! JSON via `serde`.

pub mod bucket;
pub mod credential;
pub mod object;
pub mod translation;
