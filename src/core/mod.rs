//! Core module containing the driver functionality
//!
//! This module provides:
//! - Transport layer for station connections (Serial, TCP)
//! - Vaisala ASCII protocol: command client, message parser, unit normalization
//! - Observation packets
//! - Polling driver with retry and rain accumulation tracking

pub mod driver;
pub mod packet;
pub mod protocol;
pub mod transport;
