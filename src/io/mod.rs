//! On-disk persistence

pub mod state;
