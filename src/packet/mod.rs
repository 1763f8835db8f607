//! # Packet Codec Module
//!
//! The 32-byte telemetry frame protocol shared by both ends of the link.
//!
//! This module handles:
//! - The canonical tag table and typed telemetry records
//! - Affine fixed-point quantization of IMU readings
//! - Packed GPS date/time words
//! - The multiply-XOR frame checksum
//! - Frame encoding and validated decoding

pub mod protocol;
pub mod quantize;
pub mod datetime;
pub mod checksum;
pub mod encoder;
pub mod decoder;
