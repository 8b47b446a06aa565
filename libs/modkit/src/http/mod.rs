//! Outgoing HTTP helpers shared by module adapters.

pub mod client;
