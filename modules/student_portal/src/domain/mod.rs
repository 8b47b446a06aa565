pub mod aggregate;
pub mod clock;
pub mod error;
pub mod record;
pub mod repo;
pub mod resolve;
pub mod schedule;
pub mod service;
