use crate::responses::find_info_fields;

/// Extract the numeric result of a store or send acknowledgement:
/// the message reference from `+CMGS: <mr>` or the storage index from
/// `+CMGW: <index>`.
pub fn submit_result(response: &str, tag: &str) -> Option<u32> {
    find_info_fields(response, tag)?.first()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_reference_and_index() {
        assert_eq!(submit_result("+CMGS: 41\n\nOK", "+CMGS:"), Some(41));
        assert_eq!(submit_result("+CMGW: 7\n\nOK", "+CMGW:"), Some(7));
    }

    #[test]
    fn missing_or_malformed_is_none() {
        assert_eq!(submit_result("OK", "+CMGS:"), None);
        assert_eq!(submit_result("+CMGS: x\nOK", "+CMGS:"), None);
    }
}
