//! Vaisala ASCII protocol
//!
//! Provides the command client, the data message parser and the unit
//! normalizer for WXT510/WXT520 stations:
//! - Station client (addressed command frames, one response line each)
//! - Observation table (abbreviation to canonical name)
//! - Parser for `abbr=value<unit>` data messages
//! - Unit normalization to METRICWX
//! - Integrity tag (CRC) helpers

pub mod checksum;
pub mod observation;
pub mod parser;
pub mod station;
pub mod units;

pub use checksum::{crc16, crc_tag, verify as verify_crc};
pub use observation::{Category, OBSERVATIONS};
pub use parser::{parse, Observations};
pub use station::{Message, Station};
pub use units::{normalize, UnitSystem};
