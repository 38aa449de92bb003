//! Application services composed from domain and infrastructure layers.

pub mod error;
pub mod trigger;
