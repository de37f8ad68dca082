use crate::error::{SmsError, SmsResult};
use crate::responses::find_info_fields;

/// Parsed `+CREG: <n>,<stat>[,<lac>,<cid>[,<act>]]` response.
///
/// The location fields are hex-encoded on the wire (`lac` as four hex
/// digits, `cid` as up to eight) and only present once location reporting
/// has been enabled with `AT+CREG=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationInfo {
    /// Unsolicited-result-code setting echoed by the modem
    pub mode: u8,
    /// Registration state (1 = home network, 5 = roaming)
    pub status: u8,
    /// Location area code, decoded from hex
    pub lac: Option<u32>,
    /// Cell identifier, decoded from hex
    pub cid: Option<u32>,
}

impl RegistrationInfo {
    /// Parse the full `AT+CREG?` response text.
    pub fn from_response(response: &str) -> SmsResult<Self> {
        let fields = find_info_fields(response, "+CREG:")
            .ok_or_else(|| SmsError::Protocol("missing +CREG line".into()))?;
        if fields.len() < 2 {
            return Err(SmsError::Protocol(format!(
                "+CREG carries {} fields, expected at least 2",
                fields.len()
            )));
        }
        let mode = parse_u8(&fields[0])?;
        let status = parse_u8(&fields[1])?;
        let lac = fields.get(2).and_then(|f| u32::from_str_radix(f, 16).ok());
        let cid = fields.get(3).and_then(|f| u32::from_str_radix(f, 16).ok());
        Ok(Self {
            mode,
            status,
            lac,
            cid,
        })
    }

    /// True when registered on the home network or roaming.
    pub fn is_registered(&self) -> bool {
        self.status == 1 || self.status == 5
    }
}

fn parse_u8(field: &str) -> SmsResult<u8> {
    field
        .parse()
        .map_err(|_| SmsError::Protocol(format!("non-numeric +CREG field {field:?}")))
}
