//! Core module - The table model and its building blocks
//!
//! This module provides:
//! - Column catalog (all/active columns, types, completion)
//! - Row store with side-array match state and counters
//! - Projection expression parser
//! - Search/match engine
//! - Table model (view state machine, truncate, load/export bridge)
//! - Rendering of views for the CLI

pub mod catalog;
pub mod error;
pub mod model;
pub mod projection;
pub mod render;
pub mod rows;
pub mod search;
