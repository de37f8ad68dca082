// ABOUTME: Byte-stream framing for modem output: CRLF normalization, blank-line trimming
// ABOUTME: Hosts the anchored terminator scan and line classification helpers used by the transport

/// Normalize a received chunk: every CRLF or lone CR becomes LF.
///
/// Invalid UTF-8 is replaced lossily; modems speak ASCII on the command
/// channel, so this only triggers on line noise.
pub fn normalize(bytes: &[u8]) -> String {
    normalize_str(&String::from_utf8_lossy(bytes))
}

/// CRLF/CR -> LF on an already-decoded chunk.
pub fn normalize_str(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Strip leading and trailing blank lines from a normalized chunk.
pub fn trim_blank(text: &str) -> &str {
    text.trim_matches(|c| c == '\n' || c == ' ' || c == '\t')
}

/// True for a non-empty, even-length, uppercase-hex string — the shape of a
/// PDU payload line in `+CMGL` / `+CMGR` responses.
pub fn is_hex_pdu(line: &str) -> bool {
    !line.is_empty()
        && line.len() % 2 == 0
        && line
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

/// Response terminators recognized at start-of-line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminator {
    /// `OK`
    Success,
    /// `ERROR`, `+CME ERROR:`, or `+CMS ERROR:`
    Failure,
    /// `> ` continuation prompt after a CMGS/CMGW length announcement
    Prompt,
}

/// Scan the response buffer for a terminator anchored at a line start.
///
/// `scan_from` is the byte offset of the first line not yet fully scanned;
/// it is advanced past complete non-matching lines so repeated appends do
/// not rescan the whole buffer. The final (possibly incomplete) line is
/// re-examined on the next call.
pub(crate) fn find_terminator(buffer: &str, scan_from: &mut usize) -> Option<Terminator> {
    let mut pos = *scan_from;
    loop {
        let rest = &buffer[pos..];
        if rest.starts_with("OK") {
            return Some(Terminator::Success);
        }
        if rest.starts_with("ERROR")
            || rest.starts_with("+CME ERROR")
            || rest.starts_with("+CMS ERROR")
        {
            return Some(Terminator::Failure);
        }
        if rest.starts_with("> ") {
            return Some(Terminator::Prompt);
        }
        match rest.find('\n') {
            Some(offset) => {
                pos += offset + 1;
                *scan_from = pos;
            }
            None => {
                *scan_from = pos;
                return None;
            }
        }
    }
}

/// True for an unsolicited result code: `+TAG:` where TAG is three or more
/// uppercase letters or digits.
pub(crate) fn is_notification(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('+') else {
        return false;
    };
    let Some(colon) = rest.find(':') else {
        return false;
    };
    let tag = &rest[..colon];
    tag.len() >= 3 && tag.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_lone_cr() {
        assert_eq!(normalize(b"AT\r\nOK\r\n"), "AT\nOK\n");
        assert_eq!(normalize(b"one\rtwo"), "one\ntwo");
        assert_eq!(normalize(b"mixed\r\n\rend"), "mixed\n\nend");
    }

    #[test]
    fn trims_surrounding_blank_lines() {
        assert_eq!(trim_blank("\n\n+CMTI: \"SM\",4\n"), "+CMTI: \"SM\",4");
        assert_eq!(trim_blank("plain"), "plain");
        assert_eq!(trim_blank("\n \n"), "");
    }

    #[test]
    fn hex_pdu_shape() {
        assert!(is_hex_pdu("07917238010010F5"));
        assert!(!is_hex_pdu("07917238010010f5")); // lowercase
        assert!(!is_hex_pdu("079"));
        assert!(!is_hex_pdu(""));
        assert!(!is_hex_pdu("07G1"));
    }

    #[test]
    fn terminator_anchored_at_line_start() {
        let mut from = 0;
        assert_eq!(
            find_terminator("+CSQ: 24,99\n\nOK\n", &mut from),
            Some(Terminator::Success)
        );

        let mut from = 0;
        // Not anchored: OK embedded mid-line must not match.
        assert_eq!(find_terminator("TOKEN\nvalue", &mut from), None);

        let mut from = 0;
        assert_eq!(
            find_terminator("\n+CME ERROR: 50\n", &mut from),
            Some(Terminator::Failure)
        );

        let mut from = 0;
        assert_eq!(find_terminator("\n> ", &mut from), Some(Terminator::Prompt));
    }

    #[test]
    fn terminator_incremental_scan_resumes_on_partial_line() {
        let mut buffer = String::from("+CMGR: 1,,24\nO");
        let mut from = 0;
        assert_eq!(find_terminator(&buffer, &mut from), None);
        // Scan resumed from the incomplete final line, not the whole buffer.
        assert_eq!(from, buffer.len() - 1);

        buffer.push('K');
        assert_eq!(find_terminator(&buffer, &mut from), Some(Terminator::Success));
    }

    #[test]
    fn notification_requires_long_uppercase_tag() {
        assert!(is_notification("+CMTI: \"SM\",4"));
        assert!(is_notification("+CREG: 1"));
        assert!(!is_notification("+CM: 1")); // tag too short
        assert!(!is_notification("+cmti: \"SM\",4"));
        assert!(!is_notification("RING"));
        assert!(!is_notification("+CMTI"));
    }
}
