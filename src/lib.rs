//! Async SMS driver for AT-command cellular modems.
//!
//! This crate drives a cellular modem over a serial link to send and
//! receive SMS messages in PDU mode. It arbitrates a single-outstanding
//! request pipeline over the port, distinguishes solicited responses from
//! unsolicited network notifications, and reassembles multi-part
//! (concatenated) SMS into logical messages.
//!
//! The stack, bottom up:
//!
//! * [`framer`] — CRLF normalization and the anchored response-terminator
//!   scan,
//! * [`transport`] — [`AtTransport`]: open/close, `exec` with timeout and
//!   backpressure (at most one command in flight), notification routing,
//! * [`responses`] — typed parsers for each AT command family,
//! * [`session`] — [`SmsSession`]: initialization sequence and the
//!   high-level operations (list/read/delete/send/store, info queries,
//!   live receive),
//! * [`reassembly`] — concatenated-SMS merging in list and live modes,
//! * [`events`] — lifecycle event fan-out,
//! * [`pdu`] — the consumed contract of the external PDU codec.
//!
//! PDU encoding/decoding itself is deliberately external: bring any
//! GSM 03.40 codec and implement [`PduCodec`] for it.

pub mod config;
pub mod error;
pub mod events;
pub mod framer;
pub mod pdu;
pub mod reassembly;
pub mod responses;
pub mod session;
pub mod transport;


pub use config::ModemConfig;
pub use error::{SmsError, SmsResult};
pub use events::ModemEvent;
pub use pdu::{ConcatFragment, DecodeError, DecodedPdu, PduCodec, PduType, SubmitPdu};
pub use reassembly::Reassembler;
pub use responses::{
    MessageStatus, NewMessageIndex, PdpContext, SignalQuality, StorageReport, SubscriberNumber,
};
pub use session::types::{
    CellLocation, ConcatInfo, ConcatPart, ModemInfo, NetworkInfo, SmsMessage,
};
pub use session::SmsSession;
pub use transport::{AtTransport, ExecOptions};
