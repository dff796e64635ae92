//! HTTP handlers grouped by resource.

pub mod access;
pub mod assignments;
pub mod health;
pub mod roles;
