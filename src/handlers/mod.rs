//! HTTP handlers

pub mod health;
pub mod predict;
pub mod clients;
pub mod predictions;
pub mod model;
