//! Remote collaborators and the gateway that sequences them.

pub mod aps;
pub mod gateway;
#[cfg(test)]
pub mod memory;
pub mod remote;
pub mod urn;
