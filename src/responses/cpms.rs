use crate::error::{SmsError, SmsResult};
use crate::responses::find_info_fields;

/// One of the three preferred-storage slots reported by `+CPMS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArea {
    /// Memory name, e.g. `SM` or `ME`
    pub memory: String,
    pub used: u32,
    pub total: u32,
}

/// Parsed `AT+CPMS?` query response.
///
/// The query form carries nine fields: name, used, and total for the read,
/// write, and store slots in that order. Anything shorter is a protocol
/// error (the six-field set-command echo is not accepted here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReport {
    /// Storage read by `+CMGL` / `+CMGR`
    pub read: StorageArea,
    /// Storage written by `+CMGW`
    pub write: StorageArea,
    /// Storage for newly received messages
    pub store: StorageArea,
}

impl StorageReport {
    /// Parse the full `AT+CPMS?` response text.
    pub fn from_response(response: &str) -> SmsResult<Self> {
        let fields = find_info_fields(response, "+CPMS:")
            .ok_or_else(|| SmsError::Protocol("missing +CPMS line".into()))?;
        if fields.len() < 9 {
            return Err(SmsError::Protocol(format!(
                "+CPMS carries {} fields, expected 9",
                fields.len()
            )));
        }
        Ok(Self {
            read: area(&fields[0..3])?,
            write: area(&fields[3..6])?,
            store: area(&fields[6..9])?,
        })
    }
}

fn area(fields: &[String]) -> SmsResult<StorageArea> {
    let count = |field: &str| {
        field
            .parse()
            .map_err(|_| SmsError::Protocol(format!("non-numeric +CPMS count {field:?}")))
    };
    Ok(StorageArea {
        memory: fields[0].clone(),
        used: count(&fields[1])?,
        total: count(&fields[2])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nine_field_query() {
        let report =
            StorageReport::from_response("+CPMS: \"SM\",2,30,\"SM\",2,30,\"ME\",0,50\nOK").unwrap();
        assert_eq!(report.read.memory, "SM");
        assert_eq!(report.read.used, 2);
        assert_eq!(report.read.total, 30);
        assert_eq!(report.store.memory, "ME");
        assert_eq!(report.store.total, 50);
    }

    #[test]
    fn rejects_set_command_echo() {
        // The set form echoes only used/total pairs.
        assert!(matches!(
            StorageReport::from_response("+CPMS: 2,30,2,30,0,50\nOK"),
            Err(SmsError::Protocol(_))
        ));
    }
}
