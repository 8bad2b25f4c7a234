//! Shared value types for the `niac` network simulator: addresses, the
//! device data model, the error taxonomy, and the handful of records
//! (neighbor, run, MIB entry, lease) that flow between crates.

pub mod device;
pub mod error;
pub mod frame;
pub mod lease;
pub mod mac;
pub mod mib;
pub mod neighbor;
pub mod run_record;

pub use device::{
    DeviceKind, Device, DhcpConfig, DhcpPoolConfig, DiscoveryConfig, DnsRecordConfig, IcmpConfig,
    Interface, PortChannel, SnmpAgentConfig, StaticLeaseConfig, StpConfig, ThresholdMetric,
    TrafficConfig, TrapPolicy, Vlan,
};
pub use error::{Error, ErrorDetails, Result};
pub use frame::{Frame, SerialSource};
pub use lease::DhcpLease;
pub use mac::{MacAddr, MacAddrParseError};
pub use mib::{MibEntry, MibValue, Oid};
pub use neighbor::{DiscoveryProtocol, NeighborRecord};
pub use run_record::RunRecord;
