use crate::error::{SmsError, SmsResult};
use crate::framer;
use crate::responses::info_fields;
use num_enum::TryFromPrimitive;

/// The storage status of an SMS message, as used by `AT+CMGL=<stat>` and
/// reported in listing headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageStatus {
    /// Received and unread
    ReceivedUnread = 0,
    /// Received and read
    ReceivedRead = 1,
    /// Outgoing and unsent
    StoredUnsent = 2,
    /// Outgoing and sent
    StoredSent = 3,
    /// Any kind (listing only)
    All = 4,
}

/// Header line of one `+CMGL` listing entry:
/// `+CMGL: <index>,<stat>,<alpha?>,<length>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmglHeader {
    pub index: u32,
    pub status: MessageStatus,
    pub alpha: Option<String>,
    /// TPDU octet count announced for the PDU line that follows
    pub length: usize,
}

impl CmglHeader {
    /// Parse one listing header line; `None` when the line is not a
    /// `+CMGL` header.
    pub fn from_line(line: &str) -> Option<SmsResult<Self>> {
        let fields = info_fields(line, "+CMGL:")?;
        Some(Self::from_fields(fields))
    }

    fn from_fields(fields: Vec<String>) -> SmsResult<Self> {
        if fields.len() < 4 {
            return Err(SmsError::Protocol(format!(
                "+CMGL header carries {} fields, expected 4",
                fields.len()
            )));
        }
        Ok(Self {
            index: parse_number(&fields[0], "+CMGL index")?,
            status: parse_status(&fields[1])?,
            alpha: Some(fields[2].clone()).filter(|f| !f.is_empty()),
            length: parse_number(&fields[3], "+CMGL length")? as usize,
        })
    }
}

/// Header line of an `AT+CMGR` read: `+CMGR: <stat>,<alpha?>,<length>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmgrHeader {
    pub status: MessageStatus,
    pub alpha: Option<String>,
    pub length: usize,
}

impl CmgrHeader {
    /// Parse the read header line; `None` when the line is not a
    /// `+CMGR` header.
    pub fn from_line(line: &str) -> Option<SmsResult<Self>> {
        let fields = info_fields(line, "+CMGR:")?;
        Some(Self::from_fields(fields))
    }

    fn from_fields(fields: Vec<String>) -> SmsResult<Self> {
        if fields.len() < 3 {
            return Err(SmsError::Protocol(format!(
                "+CMGR header carries {} fields, expected 3",
                fields.len()
            )));
        }
        Ok(Self {
            status: parse_status(&fields[0])?,
            alpha: Some(fields[1].clone()).filter(|f| !f.is_empty()),
            length: parse_number(&fields[2], "+CMGR length")? as usize,
        })
    }
}

/// Walk an `AT+CMGL` response: alternating header lines and uppercase hex
/// PDU lines, ended by the `OK` trailer.
///
/// The walk is a two-state machine (awaiting-header, awaiting-pdu). Lines
/// that are neither header nor trailer are skipped while awaiting a header;
/// a non-hex line where a PDU is due is a protocol error. An empty listing
/// (only `OK`) yields an empty vector.
pub fn walk_pdu_listing(response: &str) -> SmsResult<Vec<(CmglHeader, String)>> {
    let mut entries = Vec::new();
    let mut pending: Option<CmglHeader> = None;
    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match pending.take() {
            None => {
                if let Some(header) = CmglHeader::from_line(line) {
                    pending = Some(header?);
                }
            }
            Some(header) => {
                if !framer::is_hex_pdu(line) {
                    return Err(SmsError::Protocol(format!(
                        "expected hex PDU after +CMGL header for index {}, got {line:?}",
                        header.index
                    )));
                }
                entries.push((header, line.to_string()));
            }
        }
    }
    if let Some(header) = pending {
        return Err(SmsError::Protocol(format!(
            "+CMGL header for index {} has no PDU line",
            header.index
        )));
    }
    Ok(entries)
}

fn parse_number(field: &str, what: &str) -> SmsResult<u32> {
    field
        .parse()
        .map_err(|_| SmsError::Protocol(format!("non-numeric {what} {field:?}")))
}

fn parse_status(field: &str) -> SmsResult<MessageStatus> {
    field
        .parse::<u8>()
        .ok()
        .and_then(|raw| MessageStatus::try_from(raw).ok())
        .ok_or_else(|| SmsError::Protocol(format!("message status {field:?} outside 0..=4")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\n+CMGL: 2,1,,24\n07911234567890F1000B8190\n\n+CMGL: 5,1,,24\n07911234567890F1000B8191\n\nOK\n";

    #[test]
    fn walks_header_pdu_pairs() {
        let entries = walk_pdu_listing(LISTING).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.index, 2);
        assert_eq!(entries[0].0.status, MessageStatus::ReceivedRead);
        assert_eq!(entries[0].1, "07911234567890F1000B8190");
        assert_eq!(entries[1].0.index, 5);
    }

    #[test]
    fn empty_listing_is_empty() {
        assert!(walk_pdu_listing("\nOK\n").unwrap().is_empty());
    }

    #[test]
    fn non_hex_pdu_line_is_protocol_error() {
        let result = walk_pdu_listing("+CMGL: 2,1,,24\nnot-a-pdu\nOK\n");
        assert!(matches!(result, Err(SmsError::Protocol(_))));
    }

    #[test]
    fn dangling_header_is_protocol_error() {
        let result = walk_pdu_listing("+CMGL: 2,1,,24\nOK\n");
        assert!(matches!(result, Err(SmsError::Protocol(_))));
    }

    #[test]
    fn cmgr_header_parses() {
        let header = CmgrHeader::from_line("+CMGR: 1,,24").unwrap().unwrap();
        assert_eq!(header.status, MessageStatus::ReceivedRead);
        assert_eq!(header.length, 24);
        assert!(CmgrHeader::from_line("OK").is_none());
    }
}
