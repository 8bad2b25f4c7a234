//! DNS server component (C7): `A`/`PTR` answers over UDP/53, no recursion.

mod packet;
mod server;

pub use packet::{build_a_response, build_ptr_response, DnsQuery, RecordType, ResponseCode, HEADER_SIZE};
pub use server::DnsServer;
