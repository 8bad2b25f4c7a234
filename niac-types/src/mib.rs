use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A dotted-numeric SNMP object identifier, ordered lexicographically over
/// its numeric components (not its string representation — `1.3.6.1.2.1.2`
/// sorts before `1.3.6.1.2.1.10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Oid(pub Vec<u32>);

impl Oid {
    pub fn parse(s: &str) -> Option<Oid> {
        let parts: Result<Vec<u32>, _> = s.trim().split('.').filter(|p| !p.is_empty()).map(|p| p.parse()).collect();
        parts.ok().map(Oid)
    }

    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Oid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::parse(s).ok_or_else(|| format!("invalid OID: {s}"))
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// The value carried by a MIB entry, spanning both the synthesized system
/// MIB and walk-file-backed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MibValue {
    String(String),
    Oid(Oid),
    Integer(i64),
    Gauge32(u32),
    Counter32(u32),
    Counter64(u64),
    Timeticks(u32),
    IpAddress(std::net::Ipv4Addr),
    HexString(Vec<u8>),
}

impl MibValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            MibValue::String(_) => "STRING",
            MibValue::Oid(_) => "OID",
            MibValue::Integer(_) => "INTEGER",
            MibValue::Gauge32(_) => "Gauge32",
            MibValue::Counter32(_) => "Counter32",
            MibValue::Counter64(_) => "Counter64",
            MibValue::Timeticks(_) => "Timeticks",
            MibValue::IpAddress(_) => "IpAddress",
            MibValue::HexString(_) => "Hex-STRING",
        }
    }
}

/// One row of a walk-file-backed MIB: an `(OID, type, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MibEntry {
    pub oid: Oid,
    pub value: MibValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_orders_numerically_not_lexically() {
        let a = Oid::parse("1.3.6.1.2.1.2").unwrap();
        let b = Oid::parse("1.3.6.1.2.1.10").unwrap();
        assert!(a < b);
    }

    #[test]
    fn oid_round_trips_through_display() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.to_string().parse::<Oid>().unwrap(), oid);
    }
}
