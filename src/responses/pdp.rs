use crate::responses::info_fields;
use std::collections::HashMap;

/// One packet-data context, merged from the `+CGDCONT`, `+CGACT`, and
/// `+CGPADDR` multi-row responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdpContext {
    pub cid: u32,
    /// Protocol family, e.g. `IP` or `IPV4V6`
    pub pdp_type: String,
    pub apn: String,
    /// Activation state from `+CGACT`
    pub active: bool,
    /// Assigned address from `+CGPADDR`, when activated
    pub address: Option<String>,
}

/// Parse the `AT+CGDCONT?` response: one `+CGDCONT: <cid>,<type>,<apn>,...`
/// row per defined context. Malformed rows are skipped.
pub fn defined_contexts(response: &str) -> Vec<PdpContext> {
    rows(response, "+CGDCONT:")
        .filter_map(|fields| {
            let cid = fields.first()?.parse().ok()?;
            Some(PdpContext {
                cid,
                pdp_type: fields.get(1).cloned().unwrap_or_default(),
                apn: fields.get(2).cloned().unwrap_or_default(),
                active: false,
                address: None,
            })
        })
        .collect()
}

/// Parse the `AT+CGACT?` response into a cid -> activation map.
pub fn activation_states(response: &str) -> HashMap<u32, bool> {
    rows(response, "+CGACT:")
        .filter_map(|fields| {
            let cid = fields.first()?.parse().ok()?;
            Some((cid, fields.get(1).map(String::as_str) == Some("1")))
        })
        .collect()
}

/// Parse the `AT+CGPADDR=<cids>` response into a cid -> address map.
pub fn context_addresses(response: &str) -> HashMap<u32, String> {
    rows(response, "+CGPADDR:")
        .filter_map(|fields| {
            let cid = fields.first()?.parse().ok()?;
            let address = fields.get(1).filter(|a| !a.is_empty())?.clone();
            Some((cid, address))
        })
        .collect()
}

/// Overlay activation states and addresses onto the defined contexts.
pub fn merge_context_table(
    mut contexts: Vec<PdpContext>,
    activation: HashMap<u32, bool>,
    addresses: HashMap<u32, String>,
) -> Vec<PdpContext> {
    for context in &mut contexts {
        context.active = activation.get(&context.cid).copied().unwrap_or(false);
        context.address = addresses.get(&context.cid).cloned();
    }
    contexts
}

fn rows<'a>(response: &'a str, tag: &'a str) -> impl Iterator<Item = Vec<String>> + 'a {
    response
        .lines()
        .filter_map(move |line| info_fields(line, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_the_three_responses() {
        let contexts = defined_contexts(
            "+CGDCONT: 1,\"IP\",\"internet\",\"\",0,0\n+CGDCONT: 2,\"IP\",\"mms\",\"\",0,0\nOK",
        );
        let activation = activation_states("+CGACT: 1,1\n+CGACT: 2,0\nOK");
        let addresses = context_addresses("+CGPADDR: 1,\"10.64.2.1\"\nOK");

        let merged = merge_context_table(contexts, activation, addresses);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].cid, 1);
        assert_eq!(merged[0].apn, "internet");
        assert!(merged[0].active);
        assert_eq!(merged[0].address.as_deref(), Some("10.64.2.1"));
        assert!(!merged[1].active);
        assert_eq!(merged[1].address, None);
    }

    #[test]
    fn no_contexts_defined() {
        assert!(defined_contexts("OK").is_empty());
    }
}
