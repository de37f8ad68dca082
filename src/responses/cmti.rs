use crate::error::{SmsError, SmsResult};
use crate::responses::info_fields;

/// Parsed `+CMTI: "<mem>",<index>` unsolicited new-message indication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessageIndex {
    /// Storage the message landed in, e.g. `SM`
    pub storage: String,
    /// Slot index to hand to `AT+CMGR`
    pub index: u32,
}

impl NewMessageIndex {
    /// Parse a single notification line.
    pub fn from_line(line: &str) -> SmsResult<Self> {
        let fields = info_fields(line, "+CMTI:")
            .ok_or_else(|| SmsError::Protocol("not a +CMTI line".into()))?;
        let index = fields
            .get(1)
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| SmsError::Protocol(format!("non-numeric +CMTI index in {line:?}")))?;
        Ok(Self {
            storage: fields[0].clone(),
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indication() {
        let cmti = NewMessageIndex::from_line("+CMTI: \"SM\",4").unwrap();
        assert_eq!(cmti.storage, "SM");
        assert_eq!(cmti.index, 4);
    }

    #[test]
    fn rejects_other_notifications() {
        assert!(NewMessageIndex::from_line("+CREG: 1").is_err());
        assert!(NewMessageIndex::from_line("+CMTI: \"SM\",x").is_err());
    }
}
