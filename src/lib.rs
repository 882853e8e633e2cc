//! Normalization and reporting core of the BIP revenue dashboard.
//!
//! Workbook sheets come in as raw cell grids, get reshaped into tidy tables
//! and aggregates, and leave as plain serializable data.

pub mod config;
pub mod domain;
pub mod infra;
pub mod usecase;
