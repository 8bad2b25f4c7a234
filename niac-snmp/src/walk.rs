//! Walk-file parser (`spec.md` §9): line-oriented `<OID> = <TYPE>: <VALUE>`
//! triples, as produced by `snmpwalk` against a real device.

use niac_types::{Error, MibEntry, MibValue, Oid};

pub fn parse(contents: &str) -> Result<Vec<MibEntry>, Error> {
    let mut entries = Vec::new();
    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        entries.push(parse_line(line).map_err(|msg| {
            Error::ConfigInvalid {
                field: format!("walk_file:{}", lineno + 1),
                expected: "<OID> = <TYPE>: <VALUE>".into(),
                got: line.to_string(),
                suggestion: msg,
            }
        })?);
    }
    // D2: walk entries are strictly ordered; a final sort guarantees it
    // regardless of file order.
    entries.sort_by(|a, b| a.oid.cmp(&b.oid));
    Ok(entries)
}

fn strip_comment(line: &str) -> &str {
    if let Some(idx) = line.find('#') {
        return &line[..idx];
    }
    if let Some(idx) = line.find("//") {
        return &line[..idx];
    }
    line
}

fn parse_line(line: &str) -> Result<MibEntry, String> {
    let (oid_part, rest) = line.split_once('=').ok_or_else(|| "missing '='".to_string())?;
    let oid = Oid::parse(oid_part.trim()).ok_or_else(|| format!("invalid OID: {}", oid_part.trim()))?;

    let (type_part, value_part) = rest.trim().split_once(':').ok_or_else(|| "missing ':'".to_string())?;
    let value = parse_value(type_part.trim(), value_part.trim())?;
    Ok(MibEntry { oid, value })
}

fn parse_value(type_name: &str, raw: &str) -> Result<MibValue, String> {
    let unquoted = raw.trim_matches('"');
    Ok(match type_name {
        "STRING" => MibValue::String(unquoted.to_string()),
        "OID" => MibValue::Oid(Oid::parse(unquoted).ok_or_else(|| format!("invalid OID value: {unquoted}"))?),
        "INTEGER" => MibValue::Integer(unquoted.parse().map_err(|_| format!("invalid INTEGER: {unquoted}"))?),
        "Gauge32" => MibValue::Gauge32(unquoted.parse().map_err(|_| format!("invalid Gauge32: {unquoted}"))?),
        "Counter32" => MibValue::Counter32(unquoted.parse().map_err(|_| format!("invalid Counter32: {unquoted}"))?),
        "Counter64" => MibValue::Counter64(unquoted.parse().map_err(|_| format!("invalid Counter64: {unquoted}"))?),
        "Timeticks" => MibValue::Timeticks(unquoted.parse().map_err(|_| format!("invalid Timeticks: {unquoted}"))?),
        "IpAddress" => MibValue::IpAddress(unquoted.parse().map_err(|_| format!("invalid IpAddress: {unquoted}"))?),
        "Hex-STRING" => MibValue::HexString(
            unquoted
                .split_whitespace()
                .map(|b| u8::from_str_radix(b, 16))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| format!("invalid Hex-STRING: {unquoted}"))?,
        ),
        other => return Err(format!("unsupported walk type {other}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_triples_ignoring_comments_and_blanks() {
        let input = "\
            # a comment\n\
            \n\
            1.3.6.1.2.1.1.1.0 = STRING: \"Cisco IOS\"\n\
            1.3.6.1.2.1.2.2.1.10.1 = Counter32: 98765\n\
            // trailing comment\n\
            1.3.6.1.2.1.1.5.0 = STRING: r1\n\
        ";
        let entries = parse(input).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].oid.to_string(), "1.3.6.1.2.1.1.1.0");
        assert_eq!(entries[0].value, MibValue::String("Cisco IOS".into()));
    }

    #[test]
    fn final_sort_enforces_strict_ordering_regardless_of_file_order() {
        let input = "\
            1.3.6.1.2.1.2.2.1.1.10 = INTEGER: 10\n\
            1.3.6.1.2.1.2.2.1.1.2 = INTEGER: 2\n\
        ";
        let entries = parse(input).unwrap();
        assert!(entries[0].oid < entries[1].oid);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse("not a walk line").is_err());
    }
}
