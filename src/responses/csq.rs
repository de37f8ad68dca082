use crate::error::{SmsError, SmsResult};
use crate::responses::find_info_fields;

/// Parsed `+CSQ: <rssi>,<ber>` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    /// Received signal strength in dBm; `None` when the modem reports
    /// "unknown" (99) or any other out-of-scale value
    pub rssi: Option<i32>,
    /// Bit error rate, verbatim; `None` when not an integer
    pub ber: Option<u32>,
}

impl SignalQuality {
    /// Parse the full `AT+CSQ` response text.
    pub fn from_response(response: &str) -> SmsResult<Self> {
        let fields = find_info_fields(response, "+CSQ:")
            .ok_or_else(|| SmsError::Protocol("missing +CSQ line".into()))?;
        let raw = fields.first().and_then(|f| f.parse::<i64>().ok());
        let ber = fields.get(1).and_then(|f| f.parse::<u32>().ok());
        Ok(Self {
            rssi: raw.and_then(rssi_dbm),
            ber,
        })
    }
}

/// Map the raw `+CSQ` value onto dBm.
///
/// 0 is the -113 dBm floor, 31 the -51 dBm ceiling, 1..=30 interpolate in
/// 2 dBm steps; everything else (99 = unknown) has no dBm equivalent.
fn rssi_dbm(raw: i64) -> Option<i32> {
    match raw {
        0 => Some(-113),
        1..=30 => Some(-113 + 2 * raw as i32),
        31 => Some(-51),
        _ => None,
    }
}
