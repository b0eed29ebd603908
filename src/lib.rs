//! Tax engine for the Brazilian consumption tax reform.
//!
//! This crate computes the legacy taxes (ICMS, IPI, PIS, COFINS, ISS) and
//! the new ones (IBS, CBS, IS) across the 2026-2033 transition, selecting
//! the applicable engine from the operation date, and nets legacy credits
//! against new-system debits.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod compensation;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod orchestrator;
