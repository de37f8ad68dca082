// ABOUTME: Consumed contract for the external SMS PDU codec
// ABOUTME: Defines the trait seam plus the decoded/generated record types; no bit-level parsing lives here

use std::fmt;
use thiserror::Error;

/// The two transfer-layer PDU types this driver handles.
///
/// `SmsDeliver` is a mobile-terminated message (carries an originating
/// address and a service-centre timestamp); `SmsSubmit` is mobile-originated
/// (carries a destination address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    SmsDeliver,
    SmsSubmit,
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PduType::SmsDeliver => write!(f, "SMS-DELIVER"),
            PduType::SmsSubmit => write!(f, "SMS-SUBMIT"),
        }
    }
}

/// Concatenation header carried by one fragment of a multi-part message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatFragment {
    /// Reference number shared by all fragments of one logical message
    pub reference: u16,
    /// 1-based position of this fragment, `1..=total`
    pub sequence: u8,
    /// Total number of fragments
    pub total: u8,
}

/// The result of decoding one hex-encoded PDU.
#[derive(Debug, Clone)]
pub struct DecodedPdu {
    pub kind: PduType,
    /// Decoded message text for this single PDU
    pub text: String,
    /// Originating address; present for SMS-DELIVER
    pub origination: Option<String>,
    /// Destination address; present for SMS-SUBMIT
    pub destination: Option<String>,
    /// Service-centre timestamp as an ISO-8601 string with offset,
    /// passed through verbatim; present for SMS-DELIVER
    pub timestamp: Option<String>,
    /// Concatenation header, absent for single-part messages
    pub concat: Option<ConcatFragment>,
}

/// One outbound PDU produced for a (destination, text) pair.
#[derive(Debug, Clone)]
pub struct SubmitPdu {
    /// Uppercase hex encoding of the full PDU, SMSC header included
    pub hex: String,
    /// TPDU octet count to announce in `AT+CMGS=` / `AT+CMGW=`
    pub tpdu_length: usize,
}

/// Error reported by the external codec for malformed hex or
/// unencodable text.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        DecodeError(message.into())
    }
}

/// The external PDU codec this driver consumes.
///
/// The driver never inspects PDU bytes itself: listing and reading hand the
/// uppercase hex payload to [`PduCodec::parse`], and the send path asks
/// [`PduCodec::generate_submit`] for the ordered PDU chunks of an outbound
/// message (one chunk per fragment for long texts).
pub trait PduCodec: Send + Sync {
    /// Decode a hex-encoded PDU. Fails on malformed hex.
    fn parse(&self, hex: &str) -> Result<DecodedPdu, DecodeError>;

    /// Build the ordered list of SMS-SUBMIT PDUs carrying `text` to
    /// `destination`, splitting into concatenated fragments as needed.
    fn generate_submit(&self, destination: &str, text: &str) -> Result<Vec<SubmitPdu>, DecodeError>;
}
