//! SNMPv1/v2c message framing: the outer `Message`, the five PDU kinds this
//! agent handles, and variable bindings carrying [`MibValue`]s or the
//! RFC 1905 exception values.

use niac_types::{Error, MibValue, Oid};

use crate::ber::{
    decode_integer, decode_oid, decode_tlv, decode_unsigned, encode_integer, encode_oid,
    encode_tlv, encode_unsigned, Tlv, TAG_COUNTER32, TAG_COUNTER64, TAG_END_OF_MIB_VIEW, TAG_GAUGE32,
    TAG_GET_BULK_REQUEST, TAG_GET_NEXT_REQUEST, TAG_GET_REQUEST, TAG_GET_RESPONSE, TAG_INTEGER, TAG_IP_ADDRESS,
    TAG_NO_SUCH_INSTANCE, TAG_NO_SUCH_OBJECT, TAG_NULL, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE, TAG_SET_REQUEST,
    TAG_SNMPV2_TRAP, TAG_TIMETICKS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
}

impl SnmpVersion {
    fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(SnmpVersion::V1),
            1 => Some(SnmpVersion::V2c),
            _ => None,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            SnmpVersion::V1 => 0,
            SnmpVersion::V2c => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    GetRequest,
    GetNextRequest,
    GetResponse,
    SetRequest,
    GetBulkRequest,
    SnmpV2Trap,
}

impl PduKind {
    fn tag(self) -> u8 {
        match self {
            PduKind::GetRequest => TAG_GET_REQUEST,
            PduKind::GetNextRequest => TAG_GET_NEXT_REQUEST,
            PduKind::GetResponse => TAG_GET_RESPONSE,
            PduKind::SetRequest => TAG_SET_REQUEST,
            PduKind::GetBulkRequest => TAG_GET_BULK_REQUEST,
            PduKind::SnmpV2Trap => TAG_SNMPV2_TRAP,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            TAG_GET_REQUEST => PduKind::GetRequest,
            TAG_GET_NEXT_REQUEST => PduKind::GetNextRequest,
            TAG_GET_RESPONSE => PduKind::GetResponse,
            TAG_SET_REQUEST => PduKind::SetRequest,
            TAG_GET_BULK_REQUEST => PduKind::GetBulkRequest,
            TAG_SNMPV2_TRAP => PduKind::SnmpV2Trap,
            _ => return None,
        })
    }
}

/// The value half of a variable binding: either a concrete MIB value, the
/// unset placeholder a request carries, or one of the RFC 1905 exceptions a
/// response carries in place of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum VarBindValue {
    Value(MibValue),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

#[derive(Debug, Clone)]
pub struct VarBind {
    pub oid: Oid,
    pub value: VarBindValue,
}

impl VarBind {
    pub fn unset(oid: Oid) -> Self {
        VarBind { oid, value: VarBindValue::Null }
    }
}

/// A decoded PDU. `error_status`/`error_index` double as
/// non-repeaters/max-repetitions for `GetBulkRequest`, matching the wire
/// layout (RFC 1905 §4.2.3).
#[derive(Debug, Clone)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    pub error_status: i32,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub version: SnmpVersion,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let outer = decode_tlv(data)?;
        if outer.tag != TAG_SEQUENCE {
            return Err(Error::FrameMalformed("SNMP message is not a SEQUENCE".into()));
        }
        let mut cursor = outer.content;

        let version_tlv = decode_tlv(cursor)?;
        let version = SnmpVersion::from_i64(decode_integer(version_tlv.content)?)
            .ok_or_else(|| Error::ProtocolUnsupported("unsupported SNMP version".into()))?;
        cursor = &cursor[version_tlv.consumed..];

        let community_tlv = decode_tlv(cursor)?;
        let community = community_tlv.content.to_vec();
        cursor = &cursor[community_tlv.consumed..];

        let pdu_tlv = decode_tlv(cursor)?;
        let kind = PduKind::from_tag(pdu_tlv.tag)
            .ok_or_else(|| Error::ProtocolUnsupported(format!("unknown SNMP PDU tag {:#x}", pdu_tlv.tag)))?;
        let pdu = parse_pdu(kind, pdu_tlv.content)?;

        Ok(Message { version, community, pdu })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut pdu_body = Vec::new();
        encode_tlv(TAG_INTEGER, &encode_integer(self.pdu.request_id as i64), &mut pdu_body);
        encode_tlv(TAG_INTEGER, &encode_integer(self.pdu.error_status as i64), &mut pdu_body);
        encode_tlv(TAG_INTEGER, &encode_integer(self.pdu.error_index as i64), &mut pdu_body);

        let mut varbinds_body = Vec::new();
        for vb in &self.pdu.varbinds {
            let mut entry = Vec::new();
            encode_tlv(TAG_OID, &encode_oid(&vb.oid.0), &mut entry);
            encode_varbind_value(&vb.value, &mut entry);
            let mut seq = Vec::new();
            encode_tlv(TAG_SEQUENCE, &entry, &mut seq);
            varbinds_body.extend(seq);
        }
        encode_tlv(TAG_SEQUENCE, &varbinds_body, &mut pdu_body);

        let mut pdu_frame = Vec::new();
        encode_tlv(self.pdu.kind.tag(), &pdu_body, &mut pdu_frame);

        let mut body = Vec::new();
        encode_tlv(TAG_INTEGER, &encode_integer(self.version.as_i64()), &mut body);
        encode_tlv(TAG_OCTET_STRING, &self.community, &mut body);
        body.extend(pdu_frame);

        let mut out = Vec::new();
        encode_tlv(TAG_SEQUENCE, &body, &mut out);
        out
    }
}

fn parse_pdu(kind: PduKind, content: &[u8]) -> Result<Pdu, Error> {
    let mut cursor = content;
    let request_id_tlv = decode_tlv(cursor)?;
    let request_id = decode_integer(request_id_tlv.content)? as i32;
    cursor = &cursor[request_id_tlv.consumed..];

    let error_status_tlv = decode_tlv(cursor)?;
    let error_status = decode_integer(error_status_tlv.content)? as i32;
    cursor = &cursor[error_status_tlv.consumed..];

    let error_index_tlv = decode_tlv(cursor)?;
    let error_index = decode_integer(error_index_tlv.content)? as i32;
    cursor = &cursor[error_index_tlv.consumed..];

    let varbinds_tlv = decode_tlv(cursor)?;
    let varbinds = parse_varbinds(varbinds_tlv.content)?;

    Ok(Pdu { kind, request_id, error_status, error_index, varbinds })
}

fn parse_varbinds(mut cursor: &[u8]) -> Result<Vec<VarBind>, Error> {
    let mut out = Vec::new();
    while !cursor.is_empty() {
        let entry_tlv = decode_tlv(cursor)?;
        if entry_tlv.tag != TAG_SEQUENCE {
            return Err(Error::FrameMalformed("VarBind is not a SEQUENCE".into()));
        }
        let mut inner = entry_tlv.content;
        let oid_tlv = decode_tlv(inner)?;
        let oid = Oid(decode_oid(oid_tlv.content)?);
        inner = &inner[oid_tlv.consumed..];
        let value_tlv = decode_tlv(inner)?;
        let value = decode_varbind_value(&value_tlv)?;
        out.push(VarBind { oid, value });
        cursor = &cursor[entry_tlv.consumed..];
    }
    Ok(out)
}

fn decode_varbind_value(tlv: &Tlv<'_>) -> Result<VarBindValue, Error> {
    Ok(match tlv.tag {
        TAG_NULL => VarBindValue::Null,
        TAG_NO_SUCH_OBJECT => VarBindValue::NoSuchObject,
        TAG_NO_SUCH_INSTANCE => VarBindValue::NoSuchInstance,
        TAG_END_OF_MIB_VIEW => VarBindValue::EndOfMibView,
        TAG_INTEGER => VarBindValue::Value(MibValue::Integer(decode_integer(tlv.content)?)),
        TAG_OCTET_STRING => VarBindValue::Value(MibValue::String(String::from_utf8_lossy(tlv.content).into_owned())),
        TAG_OID => VarBindValue::Value(MibValue::Oid(Oid(decode_oid(tlv.content)?))),
        TAG_GAUGE32 => VarBindValue::Value(MibValue::Gauge32(decode_unsigned(tlv.content)? as u32)),
        TAG_COUNTER32 => VarBindValue::Value(MibValue::Counter32(decode_unsigned(tlv.content)? as u32)),
        TAG_COUNTER64 => VarBindValue::Value(MibValue::Counter64(decode_unsigned(tlv.content)?)),
        TAG_TIMETICKS => VarBindValue::Value(MibValue::Timeticks(decode_unsigned(tlv.content)? as u32)),
        TAG_IP_ADDRESS if tlv.content.len() == 4 => VarBindValue::Value(MibValue::IpAddress(
            std::net::Ipv4Addr::new(tlv.content[0], tlv.content[1], tlv.content[2], tlv.content[3]),
        )),
        _ => return Err(Error::FrameMalformed(format!("unsupported VarBind value tag {:#x}", tlv.tag))),
    })
}

fn encode_varbind_value(value: &VarBindValue, out: &mut Vec<u8>) {
    match value {
        VarBindValue::Null => encode_tlv(TAG_NULL, &[], out),
        VarBindValue::NoSuchObject => encode_tlv(TAG_NO_SUCH_OBJECT, &[], out),
        VarBindValue::NoSuchInstance => encode_tlv(TAG_NO_SUCH_INSTANCE, &[], out),
        VarBindValue::EndOfMibView => encode_tlv(TAG_END_OF_MIB_VIEW, &[], out),
        VarBindValue::Value(mib) => match mib {
            MibValue::String(s) => encode_tlv(TAG_OCTET_STRING, s.as_bytes(), out),
            MibValue::Oid(oid) => encode_tlv(TAG_OID, &encode_oid(&oid.0), out),
            MibValue::Integer(i) => encode_tlv(TAG_INTEGER, &encode_integer(*i), out),
            MibValue::Gauge32(g) => encode_tlv(TAG_GAUGE32, &encode_unsigned(*g as u64, 1), out),
            MibValue::Counter32(c) => encode_tlv(TAG_COUNTER32, &encode_unsigned(*c as u64, 1), out),
            MibValue::Counter64(c) => encode_tlv(TAG_COUNTER64, &encode_unsigned(*c, 1), out),
            MibValue::Timeticks(t) => encode_tlv(TAG_TIMETICKS, &encode_unsigned(*t as u64, 1), out),
            MibValue::IpAddress(ip) => encode_tlv(TAG_IP_ADDRESS, &ip.octets(), out),
            MibValue::HexString(bytes) => encode_tlv(TAG_OCTET_STRING, bytes, out),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_get(oid: &str) -> Message {
        Message {
            version: SnmpVersion::V2c,
            community: b"public".to_vec(),
            pdu: Pdu {
                kind: PduKind::GetRequest,
                request_id: 42,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind::unset(oid.parse().unwrap())],
            },
        }
    }

    #[test]
    fn message_round_trips_through_encode_and_parse() {
        let msg = sample_get("1.3.6.1.2.1.1.1.0");
        let encoded = msg.encode();
        let parsed = Message::parse(&encoded).unwrap();
        assert_eq!(parsed.version, SnmpVersion::V2c);
        assert_eq!(parsed.community, b"public");
        assert_eq!(parsed.pdu.request_id, 42);
        assert_eq!(parsed.pdu.varbinds[0].oid.to_string(), "1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn rejects_unknown_version() {
        let mut msg = sample_get("1.3.6.1.2.1.1.1.0");
        msg.version = SnmpVersion::V2c;
        let mut encoded = msg.encode();
        // Corrupt the version INTEGER content (third byte: tag, len, value).
        encoded[4] = 9;
        assert!(Message::parse(&encoded).is_err());
    }
}
