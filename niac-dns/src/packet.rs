//! DNS wire format (RFC 1035 §4): the fixed 12-byte header, the question
//! section, and the answer records this server emits.

use std::net::Ipv4Addr;

use niac_types::Error;

pub const HEADER_SIZE: usize = 12;

/// DNS record types this agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RecordType {
    A = 1,
    Ptr = 12,
    Unsupported = 0,
}

impl RecordType {
    fn from_u16(v: u16) -> Self {
        match v {
            1 => RecordType::A,
            12 => RecordType::Ptr,
            _ => RecordType::Unsupported,
        }
    }
}

/// Response codes this server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    NoError = 0,
    NxDomain = 3,
    NotImplemented = 4,
}

const FLAG_QR_RESPONSE: u16 = 0x8000;
const FLAG_RD: u16 = 0x0100;
const FLAG_RA: u16 = 0x0080;

/// A parsed question: the name as its dot-joined labels, its type and class.
#[derive(Debug, Clone)]
pub struct Question {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: u16,
    /// Byte length of the encoded question, so the caller can locate any
    /// bytes that follow it (there are none we care about here).
    pub wire_len: usize,
}

/// A parsed query datagram: transaction id plus the (at most one) question
/// this server answers. Recursion and zone transfer are out of scope.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub id: u16,
    pub question: Question,
}

impl DnsQuery {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::FrameMalformed("DNS packet shorter than header".into()));
        }
        let id = u16::from_be_bytes([data[0], data[1]]);
        let qdcount = u16::from_be_bytes([data[4], data[5]]);
        if qdcount == 0 {
            return Err(Error::FrameMalformed("DNS query carries no question".into()));
        }
        let question = parse_question(&data[HEADER_SIZE..], data)?;
        Ok(DnsQuery { id, question })
    }
}

fn parse_name(buf: &[u8], full: &[u8]) -> Result<(String, usize), Error> {
    let mut labels = Vec::new();
    let mut offset = 0;
    loop {
        if offset >= buf.len() {
            return Err(Error::FrameMalformed("DNS name ran past packet end".into()));
        }
        let len = buf[offset] as usize;
        if len == 0 {
            offset += 1;
            break;
        }
        if len & 0xc0 == 0xc0 {
            // Compression pointer: resolve once, non-recursively, against
            // the full packet. Only ever seen on names we write ourselves.
            if offset + 1 >= buf.len() {
                return Err(Error::FrameMalformed("truncated DNS compression pointer".into()));
            }
            let ptr = (((buf[offset] as usize) & 0x3f) << 8) | buf[offset + 1] as usize;
            let (tail, _) = parse_name(&full[ptr..], full)?;
            labels.push(tail);
            offset += 2;
            return Ok((labels.join("."), offset));
        }
        offset += 1;
        if offset + len > buf.len() {
            return Err(Error::FrameMalformed("DNS label length overruns packet".into()));
        }
        labels.push(String::from_utf8_lossy(&buf[offset..offset + len]).to_lowercase());
        offset += len;
    }
    Ok((labels.join("."), offset))
}

fn parse_question(buf: &[u8], full: &[u8]) -> Result<Question, Error> {
    let (name, name_len) = parse_name(buf, full)?;
    if name_len + 4 > buf.len() {
        return Err(Error::FrameMalformed("truncated DNS question".into()));
    }
    let qtype = u16::from_be_bytes([buf[name_len], buf[name_len + 1]]);
    let qclass = u16::from_be_bytes([buf[name_len + 2], buf[name_len + 3]]);
    Ok(Question {
        name,
        qtype: RecordType::from_u16(qtype),
        qclass,
        wire_len: name_len + 4,
    })
}

fn encode_name(name: &str, buf: &mut Vec<u8>) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// Build an `A` response carrying zero or more addresses (zero implies
/// NXDOMAIN at the caller's discretion via `rcode`).
pub fn build_a_response(query: &DnsQuery, addrs: &[Ipv4Addr], ttl_secs: u32, rcode: ResponseCode) -> Vec<u8> {
    build_response(query, rcode, |buf| {
        for addr in addrs {
            encode_name(&query.question.name, buf);
            buf.extend_from_slice(&(RecordType::A as u16).to_be_bytes());
            buf.extend_from_slice(&1u16.to_be_bytes()); // IN
            buf.extend_from_slice(&ttl_secs.to_be_bytes());
            buf.extend_from_slice(&4u16.to_be_bytes());
            buf.extend_from_slice(&addr.octets());
        }
    }, addrs.len() as u16)
}

/// Build a `PTR` response carrying at most one hostname.
pub fn build_ptr_response(query: &DnsQuery, hostname: Option<&str>, ttl_secs: u32) -> Vec<u8> {
    let rcode = if hostname.is_some() { ResponseCode::NoError } else { ResponseCode::NxDomain };
    let ancount = if hostname.is_some() { 1 } else { 0 };
    build_response(query, rcode, |buf| {
        if let Some(host) = hostname {
            encode_name(&query.question.name, buf);
            buf.extend_from_slice(&(RecordType::Ptr as u16).to_be_bytes());
            buf.extend_from_slice(&1u16.to_be_bytes());
            buf.extend_from_slice(&ttl_secs.to_be_bytes());
            let mut rdata = Vec::new();
            encode_name(host, &mut rdata);
            buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            buf.extend_from_slice(&rdata);
        }
    }, ancount)
}

fn build_response(query: &DnsQuery, rcode: ResponseCode, write_answers: impl FnOnce(&mut Vec<u8>), ancount: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&query.id.to_be_bytes());
    let flags = FLAG_QR_RESPONSE | FLAG_RD | FLAG_RA | (rcode as u16 & 0x000f);
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    buf.extend_from_slice(&ancount.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes()); // nscount
    buf.extend_from_slice(&0u16.to_be_bytes()); // arcount

    encode_name(&query.question.name, &mut buf);
    buf.extend_from_slice(&(query.question.qtype as u16).to_be_bytes());
    buf.extend_from_slice(&query.question.qclass.to_be_bytes());

    write_answers(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query(name: &str, qtype: RecordType) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&0x55aau16.to_be_bytes());
        buf[4..6].copy_from_slice(&1u16.to_be_bytes());
        encode_name(name, &mut buf);
        buf.extend_from_slice(&(qtype as u16).to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf
    }

    #[test]
    fn parses_lowercased_question_name() {
        let data = sample_query("Host.Example.", RecordType::A);
        let query = DnsQuery::parse(&data).unwrap();
        assert_eq!(query.id, 0x55aa);
        assert_eq!(query.question.name, "host.example");
        assert_eq!(query.question.qtype, RecordType::A);
    }

    #[test]
    fn a_response_carries_requested_addresses() {
        let data = sample_query("host.example.", RecordType::A);
        let query = DnsQuery::parse(&data).unwrap();
        let reply = build_a_response(&query, &[Ipv4Addr::new(10, 0, 0, 5)], 300, ResponseCode::NoError);
        assert_eq!(u16::from_be_bytes([reply[0], reply[1]]), 0x55aa);
        assert_eq!(u16::from_be_bytes([reply[6], reply[7]]), 1);
        assert!(reply.ends_with(&[10, 0, 0, 5]));
    }

    #[test]
    fn empty_ptr_reports_nxdomain_flag() {
        let data = sample_query("5.0.0.10.in-addr.arpa.", RecordType::Ptr);
        let query = DnsQuery::parse(&data).unwrap();
        let reply = build_ptr_response(&query, None, 300);
        let flags = u16::from_be_bytes([reply[2], reply[3]]);
        assert_eq!(flags & 0x000f, ResponseCode::NxDomain as u16);
    }
}
