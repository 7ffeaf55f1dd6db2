//! Data models

pub mod client;
pub mod prediction;

pub use client::*;
pub use prediction::*;
