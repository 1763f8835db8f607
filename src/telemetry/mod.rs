//! # Telemetry Module
//!
//! Latest-value telemetry state and everything that reads it.
//!
//! This module handles:
//! - Holding the newest record per telemetry class
//! - Rendering records for the operator (human text or `;` machine lines)
//! - Appending store snapshots to rotating CSV or JSONL log files

pub mod store;
pub mod present;
pub mod logger;
