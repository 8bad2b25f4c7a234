//! DHCP v4 server component (C6): wire format plus the per-device lease
//! state machine.

mod packet;
mod server;

pub use packet::{
    build_reply, DhcpMessageType, DhcpOption, DhcpPacket, ReplyOptions, CLIENT_PORT, HEADER_SIZE,
    MAGIC_COOKIE, SERVER_PORT,
};
pub use server::DhcpServer;
