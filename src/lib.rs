//! # Telemetry Link Library
//!
//! Point-to-point telemetry between a flight computer and a ground receiver
//! over a half-duplex radio carrying fixed 32-byte frames.
//!
//! This library provides the frame codec, the latest-value telemetry store,
//! the half-duplex link, the operator console and the cooperative scheduler
//! shared by both ends of the link.

pub mod config;
pub mod error;
pub mod packet;
pub mod telemetry;
pub mod link;
pub mod console;
pub mod scheduler;
pub mod sensors;
pub mod node;
