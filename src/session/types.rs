// ABOUTME: Result records returned by the high-level session operations
// ABOUTME: Covers logical SMS messages plus the modem/network/storage/location query reports

use crate::pdu::{DecodedPdu, PduType};
use crate::responses::{MessageStatus, PdpContext, SubscriberNumber};

/// A logical SMS message: either a single PDU, one fragment of a
/// concatenated message, or the merged whole.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    /// Storage index; for a merged message, the index of the first
    /// fragment encountered
    pub index: u32,
    pub status: MessageStatus,
    pub kind: PduType,
    /// Originating address; set for SMS-DELIVER only
    pub from: Option<String>,
    /// Destination address; set for SMS-SUBMIT only
    pub to: Option<String>,
    /// Service-centre timestamp (ISO-8601 with offset); SMS-DELIVER only
    pub date: Option<String>,
    /// Concatenation state; absent for single-part messages
    pub concat: Option<ConcatInfo>,
    /// Message text; for a merged message the ordered concatenation of
    /// the fragment texts, with `[?]` standing in for missing fragments
    pub text: String,
}

impl SmsMessage {
    /// Build a message record from a decoded PDU and its listing header.
    ///
    /// Addressing and timestamp fields follow the PDU type: a DELIVER
    /// carries `from`/`date`, a SUBMIT carries `to`.
    pub(crate) fn from_decoded(index: u32, status: MessageStatus, decoded: DecodedPdu) -> Self {
        let (from, to, date) = match decoded.kind {
            PduType::SmsDeliver => (decoded.origination, None, decoded.timestamp),
            PduType::SmsSubmit => (None, decoded.destination, None),
        };
        Self {
            index,
            status,
            kind: decoded.kind,
            from,
            to,
            date,
            concat: decoded.concat.map(|fragment| ConcatInfo {
                reference: fragment.reference,
                total: fragment.total,
                part: ConcatPart::Fragment {
                    sequence: fragment.sequence,
                },
            }),
            text: decoded.text,
        }
    }

    /// The storage indexes occupied by this message: every fragment slot
    /// for a merged message, otherwise just its own index.
    pub fn storage_indexes(&self) -> Vec<u32> {
        match &self.concat {
            Some(ConcatInfo {
                part: ConcatPart::Merged { indexes },
                ..
            }) => indexes.iter().flatten().copied().collect(),
            _ => vec![self.index],
        }
    }

    /// True while this record is an unmerged fragment of a larger message.
    pub fn is_fragment(&self) -> bool {
        matches!(
            self.concat,
            Some(ConcatInfo {
                part: ConcatPart::Fragment { .. },
                ..
            })
        )
    }
}

/// Concatenation state attached to a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatInfo {
    /// Reference number shared by all fragments of the logical message
    pub reference: u16,
    /// Total number of fragments
    pub total: u8,
    pub part: ConcatPart,
}

/// Whether fragment ordering has been resolved yet.
///
/// `Fragment` carries the 1-based sequence of an individual part;
/// `Merged` carries the storage indexes ordered by sequence, with `None`
/// holes for fragments that never arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcatPart {
    Fragment { sequence: u8 },
    Merged { indexes: Vec<Option<u32>> },
}

/// Identification strings gathered from `AT+CGMI/CGMM/CGMR/CGSN` plus the
/// SIM's own number when provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemInfo {
    pub manufacturer: String,
    pub model: String,
    pub revision: String,
    pub serial: String,
    pub own_number: Option<SubscriberNumber>,
}

/// Operator identity and the packet-data context table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Operator long name (`+COPS` format 0)
    pub operator: Option<String>,
    /// Mobile country code from the numeric `+COPS` form
    pub mcc: Option<u16>,
    /// Mobile network code from the numeric `+COPS` form
    pub mnc: Option<u16>,
    pub contexts: Vec<PdpContext>,
}

/// The serving cell's identifiers, the inputs a cell-tower geolocation
/// service needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLocation {
    pub mcc: u16,
    pub mnc: u16,
    /// Location area code (decimal; decoded from the `+CREG` hex form)
    pub lac: u32,
    /// Cell identifier (decimal; decoded from the `+CREG` hex form)
    pub cid: u32,
}
