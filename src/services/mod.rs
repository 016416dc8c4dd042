//! Core services: matching, walking, downloading and orchestration

pub mod budget;
pub mod dedup;
pub mod download;
pub mod extract;
pub mod fs;
pub mod matcher;
pub mod orchestrator;
pub mod sink;
pub mod targets;
pub mod walker;
