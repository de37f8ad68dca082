use crate::responses::find_info_fields;

/// Parsed `+CNUM: <alpha>,<number>,<type>` subscriber-number entry.
///
/// Not every SIM provisions its own number, so the session treats an
/// absent `+CNUM` line as "unknown" rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberNumber {
    /// Optional alphanumeric label stored alongside the number
    pub alpha: Option<String>,
    pub number: String,
    /// Address type octet (145 = international)
    pub kind: Option<u16>,
}

impl SubscriberNumber {
    /// Extract the first subscriber number from an `AT+CNUM` response,
    /// if the SIM carries one.
    pub fn from_response(response: &str) -> Option<Self> {
        let fields = find_info_fields(response, "+CNUM:")?;
        let number = fields.get(1).filter(|f| !f.is_empty())?.clone();
        Some(Self {
            alpha: fields.first().filter(|f| !f.is_empty()).cloned(),
            number,
            kind: fields.get(2).and_then(|f| f.parse().ok()),
        })
    }
}
