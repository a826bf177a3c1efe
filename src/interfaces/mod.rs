//! Adapters between the outside world and the orchestrator: CSV for seeding
//! and dumping wallet rows, JSON lines for requests and responses.

pub mod csv;
pub mod json;
