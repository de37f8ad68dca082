use crate::error::{SmsError, SmsResult};
use crate::responses::find_info_fields;

/// Parsed `+COPS: <mode>[,<format>,<oper>[,<act>]]` response.
///
/// Issued twice by the session: once with `format=0` for the operator's
/// long name, once with `format=2` for the numeric MCC+MNC form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSelection {
    pub mode: u8,
    pub format: Option<u8>,
    /// Operator in the requested format; `None` when not registered
    pub operator: Option<String>,
}

impl OperatorSelection {
    /// Parse the full `AT+COPS?` response text.
    pub fn from_response(response: &str) -> SmsResult<Self> {
        let fields = find_info_fields(response, "+COPS:")
            .ok_or_else(|| SmsError::Protocol("missing +COPS line".into()))?;
        let mode = fields
            .first()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| SmsError::Protocol("non-numeric +COPS mode".into()))?;
        let format = fields.get(1).and_then(|f| f.parse().ok());
        let operator = fields.get(2).filter(|f| !f.is_empty()).cloned();
        Ok(Self {
            mode,
            format,
            operator,
        })
    }

    /// Split a numeric-format operator (`format=2`, 5 or 6 digits) into
    /// MCC and MNC.
    pub fn numeric_codes(&self) -> Option<(u16, u16)> {
        let oper = self.operator.as_deref()?;
        if oper.len() < 4 || !oper.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mcc = oper[..3].parse().ok()?;
        let mnc = oper[3..].parse().ok()?;
        Some((mcc, mnc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_format() {
        let cops = OperatorSelection::from_response("+COPS: 0,0,\"NTT DOCOMO\",7\nOK").unwrap();
        assert_eq!(cops.mode, 0);
        assert_eq!(cops.format, Some(0));
        assert_eq!(cops.operator.as_deref(), Some("NTT DOCOMO"));
        assert_eq!(cops.numeric_codes(), None);
    }

    #[test]
    fn splits_numeric_format() {
        let cops = OperatorSelection::from_response("+COPS: 0,2,\"44010\"\nOK").unwrap();
        assert_eq!(cops.numeric_codes(), Some((440, 10)));
    }

    #[test]
    fn unregistered_has_no_operator() {
        let cops = OperatorSelection::from_response("+COPS: 0\nOK").unwrap();
        assert_eq!(cops.operator, None);
        assert_eq!(cops.numeric_codes(), None);
    }
}
