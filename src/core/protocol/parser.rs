//! Data message parser
//!
//! A data message is a comma separated list that starts with the message
//! identifier and continues with `abbr=value<unit>` fields:
//!
//! ```text
//! 0R0,Dn=000#,Dm=106#,Sm=4.0M,Ta=16.0C,Ua=50.0P,Pa=1018.1H,Rc=0.00M,Id=Ant
//! ```
//!
//! Parsing never fails. Fields that cannot be decoded are logged and left
//! out, values that cannot be read are recorded as absent.

use super::observation::{self, INFORMATION};
use super::units::{self, INVALID};
use std::collections::BTreeMap;

/// Canonical observation name to normalized value.
///
/// `None` means the station reported the field without a valid reading.
pub type Observations = BTreeMap<&'static str, Option<f64>>;

/// Parse one response line into normalized observations
pub fn parse(raw: &[u8]) -> Observations {
    let mut parsed = Observations::new();

    for part in trim(raw).split(|&b| b == b',') {
        let mut pieces = part.splitn(3, |&b| b == b'=');
        let (abbr, vstr) = match (pieces.next(), pieces.next(), pieces.next()) {
            // message identifier such as 0R0
            (_, None, _) => continue,
            (Some(abbr), Some(vstr), None) => (abbr, vstr),
            _ => {
                tracing::debug!("skip observation: '{}'", String::from_utf8_lossy(part));
                continue;
            }
        };

        if abbr == INFORMATION {
            continue;
        }

        let Some(name) = observation::lookup(abbr) else {
            tracing::debug!(
                "unknown sensor {}: {}",
                String::from_utf8_lossy(abbr),
                String::from_utf8_lossy(vstr)
            );
            continue;
        };

        parsed.insert(name, parse_value(name, vstr));
    }

    parsed
}

fn parse_value(name: &str, vstr: &[u8]) -> Option<f64> {
    let Some((&unit, number)) = vstr.split_last() else {
        tracing::error!("parse failed for {}: empty value", name);
        return None;
    };

    if unit == INVALID {
        return None;
    }

    let value = std::str::from_utf8(number)
        .ok()
        .and_then(|s| s.parse::<f64>().ok());

    match value {
        Some(value) => Some(units::normalize(name, value, unit)),
        None => {
            tracing::error!(
                "parse failed for {} ({})",
                name,
                String::from_utf8_lossy(vstr)
            );
            None
        }
    }
}

/// Strip surrounding whitespace, including the line terminator
fn trim(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &raw[start..end]
}
