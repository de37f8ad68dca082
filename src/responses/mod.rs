// ABOUTME: Typed parsers for AT command-family responses, one module per family
// ABOUTME: Exports the generic quoted-CSV information-response parser they all share

//! Response parsers.
//!
//! Every information response a modem emits has the shape
//! `+TAG: v0,v1,...` where fields may be bare or double-quoted and commas
//! inside quotes do not split. [`info_fields`] implements that grammar once;
//! each command family turns the raw field list into a typed record.
//! Multi-row responses (`+CGDCONT`, `+CGACT`, `+CGPADDR`, `+CMGL`) apply the
//! generic parser line by line and assemble per-family records.

pub mod cmti;
pub mod cnum;
pub mod cops;
pub mod cpms;
pub mod creg;
pub mod csq;
pub mod list;
pub mod pdp;
pub mod submit;

pub use cmti::NewMessageIndex;
pub use cnum::SubscriberNumber;
pub use cops::OperatorSelection;
pub use cpms::{StorageArea, StorageReport};
pub use creg::RegistrationInfo;
pub use csq::SignalQuality;
pub use list::{walk_pdu_listing, CmglHeader, CmgrHeader, MessageStatus};
pub use pdp::PdpContext;
pub use submit::submit_result;

/// Split the field list of `+TAG: v0,v1,...` for the given `tag`
/// (including the trailing colon, e.g. `"+CSQ:"`).
///
/// Returns `None` when the line does not carry the tag. Fields are trimmed,
/// surrounding double quotes are stripped, and commas inside quotes do not
/// split.
pub fn info_fields(line: &str, tag: &str) -> Option<Vec<String>> {
    let rest = line.trim_start().strip_prefix(tag)?;
    Some(split_quoted_csv(rest))
}

fn split_quoted_csv(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in input.chars() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

/// Find the first line carrying `tag` anywhere in a response and parse its
/// fields.
pub fn find_info_fields(response: &str, tag: &str) -> Option<Vec<String>> {
    response.lines().find_map(|line| info_fields(line, tag))
}

/// True when the response contains an `OK` anchored at a line start.
pub fn has_ok(response: &str) -> bool {
    response.lines().any(|line| line.starts_with("OK"))
}

/// True when the response contains the `> ` continuation prompt anchored at
/// a line start.
pub fn has_prompt(response: &str) -> bool {
    response.lines().any(|line| line.starts_with("> "))
        || response.lines().last().map_or(false, |line| line == ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_bare_and_quoted_fields() {
        let fields = info_fields("+COPS: 0,0,\"Vodafone, UK\",7", "+COPS:").unwrap();
        assert_eq!(fields, vec!["0", "0", "Vodafone, UK", "7"]);
    }

    #[test]
    fn preserves_empty_fields() {
        let fields = info_fields("+CMGL: 3,1,,24", "+CMGL:").unwrap();
        assert_eq!(fields, vec!["3", "1", "", "24"]);
    }

    #[test]
    fn rejects_other_tags() {
        assert!(info_fields("+CSQ: 24,99", "+CREG:").is_none());
        assert!(info_fields("garbage", "+CSQ:").is_none());
    }

    #[test]
    fn ok_detection_is_line_anchored() {
        assert!(has_ok("+CSQ: 24,99\n\nOK\n"));
        assert!(!has_ok("TOKEN\nNOT OKAY HERE"));
    }

    #[test]
    fn prompt_detection() {
        assert!(has_prompt("\n> "));
        assert!(!has_prompt("OK\n"));
    }
}
