//! Ledgerwell domain core.
//!
//! Pure domain logic shared by the persistence, integration and API layers.
//! This crate has zero internal dependencies so that any future worker or
//! CLI tooling can reuse it.

pub mod availability;
pub mod booking;
pub mod error;
pub mod hashing;
pub mod roles;
pub mod storage;
pub mod subscription;
pub mod types;
pub mod validation;
