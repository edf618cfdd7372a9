//! Infrastructure layer: configuration, persistence adapters, and the
//! application use cases that orchestrate the domain crates.

pub mod config;
pub mod db;
pub mod repository;
pub mod use_cases;
