//! DHCPv4 wire format: the fixed 236-byte header plus magic cookie and a
//! TLV option stream. Field layout mirrors RFC 2131.

use std::net::Ipv4Addr;

use niac_types::{Error, MacAddr};

/// DHCP message types (option 53).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl DhcpMessageType {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => Self::Discover,
            2 => Self::Offer,
            3 => Self::Request,
            4 => Self::Decline,
            5 => Self::Ack,
            6 => Self::Nak,
            7 => Self::Release,
            8 => Self::Inform,
            _ => return None,
        })
    }
}

/// DHCP option codes this server produces or consumes.
#[repr(u8)]
pub enum DhcpOption {
    Pad = 0,
    SubnetMask = 1,
    Router = 3,
    DnsServer = 6,
    DomainName = 15,
    BroadcastAddress = 28,
    NtpServers = 42,
    RequestedIp = 50,
    LeaseTime = 51,
    MessageType = 53,
    ServerIdentifier = 54,
    ParameterRequestList = 55,
    RenewalTime = 58,
    RebindingTime = 59,
    ClientIdentifier = 61,
    TftpServerName = 66,
    BootfileName = 67,
    DomainSearch = 119,
    End = 255,
}

const OP_REQUEST: u8 = 1;
const OP_REPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN: u8 = 6;
pub const HEADER_SIZE: usize = 236;
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
pub const CLIENT_PORT: u16 = 68;
pub const SERVER_PORT: u16 = 67;

/// A parsed DHCPv4 datagram: fixed header fields plus the raw option bytes.
#[derive(Debug, Clone)]
pub struct DhcpPacket {
    pub op: u8,
    pub xid: u32,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: MacAddr,
    pub options: Vec<u8>,
}

impl DhcpPacket {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::FrameMalformed("DHCP packet shorter than header".into()));
        }
        if data[236..240] != MAGIC_COOKIE {
            return Err(Error::FrameMalformed("DHCP magic cookie mismatch".into()));
        }
        let mut chaddr = [0u8; 6];
        chaddr.copy_from_slice(&data[28..34]);
        Ok(DhcpPacket {
            op: data[0],
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            yiaddr: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            siaddr: Ipv4Addr::new(data[20], data[21], data[22], data[23]),
            giaddr: Ipv4Addr::new(data[24], data[25], data[26], data[27]),
            chaddr: MacAddr::new(chaddr),
            options: data[240..].to_vec(),
        })
    }

    pub fn message_type(&self) -> Option<DhcpMessageType> {
        find_option(&self.options, DhcpOption::MessageType as u8)
            .and_then(|v| v.first().copied())
            .and_then(DhcpMessageType::from_u8)
    }

    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        find_option(&self.options, DhcpOption::RequestedIp as u8)
            .filter(|v| v.len() == 4)
            .map(|v| Ipv4Addr::new(v[0], v[1], v[2], v[3]))
    }

    pub fn is_broadcast_flag(&self) -> bool {
        self.flags & 0x8000 != 0
    }
}

fn find_option(options: &[u8], code: u8) -> Option<Vec<u8>> {
    let mut offset = 0;
    while offset < options.len() {
        let opt = options[offset];
        if opt == DhcpOption::Pad as u8 {
            offset += 1;
            continue;
        }
        if opt == DhcpOption::End as u8 {
            break;
        }
        if offset + 1 >= options.len() {
            break;
        }
        let len = options[offset + 1] as usize;
        if offset + 2 + len > options.len() {
            break;
        }
        if opt == code {
            return Some(options[offset + 2..offset + 2 + len].to_vec());
        }
        offset += 2 + len;
    }
    None
}

/// Everything the server needs to fill in a reply: lease terms plus the
/// option set described in `spec.md` §4.6.
#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    pub lease_secs: u32,
    pub subnet_mask: Option<Ipv4Addr>,
    pub router: Option<Ipv4Addr>,
    pub dns_servers: Vec<Ipv4Addr>,
    pub domain: Option<String>,
    pub ntp_servers: Vec<Ipv4Addr>,
    pub domain_search: Vec<String>,
    pub tftp_server: Option<String>,
    pub bootfile: Option<String>,
}

/// Build an OFFER or ACK/NAK reply datagram (server role).
#[allow(clippy::too_many_arguments)]
pub fn build_reply(
    msg_type: DhcpMessageType,
    xid: u32,
    chaddr: MacAddr,
    yiaddr: Ipv4Addr,
    server_id: Ipv4Addr,
    broadcast_flag: bool,
    opts: &ReplyOptions,
) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_SIZE + 4];
    buf[0] = OP_REPLY;
    buf[1] = HTYPE_ETHERNET;
    buf[2] = HLEN;
    buf[3] = 0; // hops
    buf[4..8].copy_from_slice(&xid.to_be_bytes());
    buf[10..12].copy_from_slice(&(if broadcast_flag { 0x8000u16 } else { 0 }).to_be_bytes());
    buf[16..20].copy_from_slice(&yiaddr.octets());
    buf[20..24].copy_from_slice(&server_id.octets());
    buf[28..34].copy_from_slice(&chaddr.octets());
    buf[236..240].copy_from_slice(&MAGIC_COOKIE);

    let mut options = Vec::new();
    push_opt(&mut options, DhcpOption::MessageType as u8, &[msg_type as u8]);
    push_opt(&mut options, DhcpOption::ServerIdentifier as u8, &server_id.octets());

    if !matches!(msg_type, DhcpMessageType::Nak) {
        push_opt(&mut options, DhcpOption::LeaseTime as u8, &opts.lease_secs.to_be_bytes());
        push_opt(&mut options, 58, &(opts.lease_secs / 2).to_be_bytes());
        push_opt(&mut options, 59, &(opts.lease_secs * 7 / 8).to_be_bytes());
        if let Some(mask) = opts.subnet_mask {
            push_opt(&mut options, DhcpOption::SubnetMask as u8, &mask.octets());
        }
        if let Some(router) = opts.router {
            push_opt(&mut options, DhcpOption::Router as u8, &router.octets());
        }
        if !opts.dns_servers.is_empty() {
            let mut v = Vec::new();
            for ip in &opts.dns_servers {
                v.extend_from_slice(&ip.octets());
            }
            push_opt(&mut options, DhcpOption::DnsServer as u8, &v);
        }
        if let Some(domain) = &opts.domain {
            push_opt(&mut options, DhcpOption::DomainName as u8, domain.as_bytes());
        }
        if !opts.ntp_servers.is_empty() {
            let mut v = Vec::new();
            for ip in &opts.ntp_servers {
                v.extend_from_slice(&ip.octets());
            }
            push_opt(&mut options, DhcpOption::NtpServers as u8, &v);
        }
        if !opts.domain_search.is_empty() {
            push_opt(&mut options, DhcpOption::DomainSearch as u8, opts.domain_search.join(" ").as_bytes());
        }
        if let Some(tftp) = &opts.tftp_server {
            push_opt(&mut options, DhcpOption::TftpServerName as u8, tftp.as_bytes());
        }
        if let Some(bootfile) = &opts.bootfile {
            push_opt(&mut options, DhcpOption::BootfileName as u8, bootfile.as_bytes());
        }
    }
    options.push(DhcpOption::End as u8);

    buf.extend_from_slice(&options);
    buf
}

fn push_opt(buf: &mut Vec<u8>, code: u8, value: &[u8]) {
    buf.push(code);
    buf.push(value.len() as u8);
    buf.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_discover(xid: u32, mac: MacAddr) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE + 6];
        buf[0] = OP_REQUEST;
        buf[4..8].copy_from_slice(&xid.to_be_bytes());
        buf[28..34].copy_from_slice(&mac.octets());
        buf[236..240].copy_from_slice(&MAGIC_COOKIE);
        buf[240] = DhcpOption::MessageType as u8;
        buf[241] = 1;
        buf[242] = DhcpMessageType::Discover as u8;
        buf[243] = DhcpOption::End as u8;
        buf
    }

    #[test]
    fn parses_message_type_from_options() {
        let mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        let data = sample_discover(0x1234, mac);
        let pkt = DhcpPacket::parse(&data).unwrap();
        assert_eq!(pkt.xid, 0x1234);
        assert_eq!(pkt.chaddr, mac);
        assert_eq!(pkt.message_type(), Some(DhcpMessageType::Discover));
    }

    #[test]
    fn rejects_missing_magic_cookie() {
        let mut data = vec![0u8; HEADER_SIZE + 4];
        data[236..240].copy_from_slice(&[1, 2, 3, 4]);
        assert!(DhcpPacket::parse(&data).is_err());
    }

    #[test]
    fn reply_carries_server_identifier_and_lease() {
        let mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let opts = ReplyOptions {
            lease_secs: 3600,
            subnet_mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
            router: Some(Ipv4Addr::new(10, 0, 0, 1)),
            ..Default::default()
        };
        let reply = build_reply(
            DhcpMessageType::Offer,
            0xabcd,
            mac,
            Ipv4Addr::new(10, 0, 0, 50),
            Ipv4Addr::new(10, 0, 0, 1),
            false,
            &opts,
        );
        let parsed = DhcpPacket::parse(&reply).unwrap();
        assert_eq!(parsed.yiaddr, Ipv4Addr::new(10, 0, 0, 50));
        assert_eq!(parsed.message_type(), Some(DhcpMessageType::Offer));
    }
}
