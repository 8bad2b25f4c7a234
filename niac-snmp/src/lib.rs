//! SNMP v1/v2c agent (C8): BER codec, system + walk-file MIB, GET/GETNEXT/
//! GETBULK/SET dispatch, and trap emission.

mod agent;
mod ber;
mod mib;
mod pdu;
mod trap;
mod walk;

pub use agent::{build_get_request, BiasFn, SnmpAgent, DEFAULT_BULK_MAX};
pub use mib::{MibStore, SystemMibConfig, UpTimeClock};
pub use pdu::{Message, Pdu, PduKind, SnmpVersion, VarBind, VarBindValue};
pub use trap::{cold_start, link_state, threshold_crossed, ThresholdDebouncer};
pub use walk::parse as parse_walk_file;
