// ABOUTME: High-level SMS session: modem initialization plus the list/read/delete/send operations
// ABOUTME: Owns the transport, the external PDU codec, and the live-receive reassembly state

//! SMS session layer.
//!
//! [`SmsSession`] binds an [`AtTransport`] to an external [`PduCodec`] and
//! exposes the high-level operations: listing, reading, deleting, sending,
//! storing, the info queries, and live receive of `+CMTI`-indicated
//! messages with concatenated-SMS reassembly.
//!
//! Operations serialize themselves over the single-slot transport; callers
//! issuing commands concurrently from elsewhere observe [`SmsError::Busy`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use at_sms::{DecodedPdu, DecodeError, ModemConfig, PduCodec, SmsSession, SubmitPdu};
//!
//! struct Codec; // any GSM 03.40 PDU codec implementation
//!
//! impl PduCodec for Codec {
//!     fn parse(&self, _hex: &str) -> Result<DecodedPdu, DecodeError> {
//!         unimplemented!()
//!     }
//!     fn generate_submit(&self, _dest: &str, _text: &str) -> Result<Vec<SubmitPdu>, DecodeError> {
//!         unimplemented!()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ModemConfig::new("/dev/ttyUSB0");
//!     let mut session = SmsSession::new(config, Codec);
//!     session.open().await?;
//!
//!     session.send_message("+8190000000000", "hello from rust").await?;
//!     for message in session.list_messages(at_sms::MessageStatus::All).await? {
//!         println!("[{}] {:?}: {}", message.index, message.from, message.text);
//!     }
//!
//!     // Block until the network delivers something to us.
//!     let incoming = session.next_message().await?;
//!     println!("from {:?}: {}", incoming.from, incoming.text);
//!     Ok(())
//! }
//! ```

pub mod types;

use crate::config::ModemConfig;
use crate::error::{SmsError, SmsResult};
use crate::events::ModemEvent;
use crate::pdu::{PduCodec, SubmitPdu};
use crate::reassembly::Reassembler;
use crate::responses::{
    self, CmgrHeader, MessageStatus, NewMessageIndex, OperatorSelection, RegistrationInfo,
    SignalQuality, StorageReport, SubscriberNumber,
};
use crate::transport::{AtTransport, ExecOptions};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use types::{CellLocation, ModemInfo, NetworkInfo, SmsMessage};

/// The initialization sequence issued on open, in order: echo off, result
/// codes on, verbose responses, auto-answer off, `+CMTI` indications for
/// new messages, PDU mode.
pub const INIT_COMMANDS: [&str; 6] = [
    "ATE0",
    "ATQ0",
    "ATV1",
    "ATS0=0",
    "AT+CNMI=2,1,0,0,0",
    "AT+CMGF=0",
];

/// Stateful SMS orchestrator over one modem.
///
/// Bound to its transport's lifetime; the initialization sequence must run
/// (via [`open`](SmsSession::open)) before any high-level operation.
pub struct SmsSession<C: PduCodec> {
    transport: AtTransport,
    codec: C,
    command_timeout: Duration,
    concatenate: bool,
    indications: mpsc::UnboundedReceiver<NewMessageIndex>,
    live: Reassembler,
    initialized: bool,
}

impl<C: PduCodec> SmsSession<C> {
    /// Create a closed session from a configuration and a PDU codec.
    pub fn new(config: ModemConfig, codec: C) -> Self {
        let command_timeout = config.command_timeout;
        let concatenate = config.concatenate;
        let (transport, indications) = AtTransport::new(config);
        Self {
            transport,
            codec,
            command_timeout,
            concatenate,
            indications,
            live: Reassembler::new(),
            initialized: false,
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.transport.subscribe()
    }

    /// Direct access to the underlying transport, for raw AT commands.
    pub fn transport(&self) -> &AtTransport {
        &self.transport
    }

    /// Open the serial port and run the initialization sequence.
    pub async fn open(&mut self) -> SmsResult<()> {
        self.transport.open().await?;
        self.initialize().await
    }

    /// Like [`open`](SmsSession::open), but over an arbitrary duplex byte
    /// stream instead of the configured serial device.
    pub async fn open_stream<S>(&mut self, stream: S) -> SmsResult<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        self.transport.open_stream(stream);
        self.initialize().await
    }

    /// Close the port; a later [`open`](SmsSession::open) re-initializes.
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.initialized = false;
    }

    async fn initialize(&mut self) -> SmsResult<()> {
        if self.initialized {
            return Ok(());
        }
        for command in INIT_COMMANDS {
            let response = self.exec(command).await?;
            if !responses::has_ok(&response) {
                return Err(SmsError::InitFailed {
                    command: command.to_string(),
                    response,
                });
            }
        }
        self.initialized = true;
        debug!("modem initialization complete");
        Ok(())
    }

    /// List stored messages, reassembling concatenated ones unless the
    /// configuration disabled it. Sorted ascending by storage index before
    /// reassembly.
    pub async fn list_messages(&mut self, status: MessageStatus) -> SmsResult<Vec<SmsMessage>> {
        let response = self.exec_ok(&format!("AT+CMGL={}", status as u8)).await?;
        let mut messages = Vec::new();
        for (header, hex) in responses::walk_pdu_listing(&response)? {
            let decoded = self.codec.parse(&hex)?;
            messages.push(SmsMessage::from_decoded(header.index, header.status, decoded));
        }
        messages.sort_by_key(|m| m.index);
        Ok(if self.concatenate {
            Reassembler::merge_list(messages)
        } else {
            messages
        })
    }

    /// Read one message by storage index.
    ///
    /// Returns `None` when the slot is empty or the response does not have
    /// the `+CMGR` header / hex-PDU shape. When the slot holds one fragment
    /// of a concatenated message and reassembly is enabled, the whole
    /// listing is consulted and the merged entry containing this index is
    /// returned instead.
    pub async fn read_message(&mut self, index: u32) -> SmsResult<Option<SmsMessage>> {
        let Some(message) = self.read_single(index).await? else {
            return Ok(None);
        };
        if self.concatenate && message.is_fragment() {
            let listing = self.list_messages(MessageStatus::All).await?;
            return Ok(listing
                .into_iter()
                .find(|candidate| candidate.storage_indexes().contains(&index)));
        }
        Ok(Some(message))
    }

    /// Delete one logical message: every fragment slot for a merged
    /// message, the single slot otherwise. Returns the message that was
    /// deleted, or `None` when the slot was already empty (the delete is
    /// still issued, keeping the operation idempotent for callers).
    pub async fn delete_message(&mut self, index: u32) -> SmsResult<Option<SmsMessage>> {
        let message = self.read_message(index).await?;
        let indexes = message
            .as_ref()
            .map(SmsMessage::storage_indexes)
            .unwrap_or_else(|| vec![index]);
        for target in indexes {
            let response = self.exec(&format!("AT+CMGD={target}")).await?;
            if !responses::has_ok(&response) {
                return Err(SmsError::Modem { response });
            }
        }
        Ok(message)
    }

    /// Delete every stored message (`AT+CMGD=0,4`).
    pub async fn delete_all_messages(&mut self) -> SmsResult<()> {
        self.exec_ok("AT+CMGD=0,4").await?;
        Ok(())
    }

    /// Send `text` to `destination`, fragmenting through the codec as
    /// needed. Fragments go out strictly in sequence; the first failure
    /// aborts with [`SmsError::SendFailed`] and already-sent fragments are
    /// not rolled back.
    pub async fn send_message(&mut self, destination: &str, text: &str) -> SmsResult<()> {
        validate_destination(destination)?;
        let pdus = self.codec.generate_submit(destination, text)?;
        debug!(destination, fragments = pdus.len(), "sending message");
        for pdu in &pdus {
            self.submit_pdu(&format!("AT+CMGS={}", pdu.tpdu_length), pdu)
                .await?;
        }
        Ok(())
    }

    /// Store `text` for `destination` without sending (`AT+CMGW=<len>,2`).
    /// Returns the storage indexes of the written fragments, in order.
    pub async fn write_submit_message(
        &mut self,
        destination: &str,
        text: &str,
    ) -> SmsResult<Vec<u32>> {
        validate_destination(destination)?;
        let pdus = self.codec.generate_submit(destination, text)?;
        let mut stored = Vec::with_capacity(pdus.len());
        for pdu in &pdus {
            let response = self
                .submit_pdu(&format!("AT+CMGW={},2", pdu.tpdu_length), pdu)
                .await?;
            let index = responses::submit_result(&response, "+CMGW:")
                .ok_or_else(|| SmsError::Protocol("missing +CMGW index".into()))?;
            stored.push(index);
        }
        Ok(stored)
    }

    /// Send a previously stored message (`AT+CMSS`), one command per
    /// fragment slot. The first non-`OK` response aborts.
    pub async fn send_stored_message(&mut self, index: u32) -> SmsResult<()> {
        let indexes = self
            .read_message(index)
            .await?
            .as_ref()
            .map(SmsMessage::storage_indexes)
            .unwrap_or_else(|| vec![index]);
        for target in indexes {
            let response = self.exec(&format!("AT+CMSS={target}")).await?;
            if !responses::has_ok(&response) {
                return Err(SmsError::Modem { response });
            }
        }
        Ok(())
    }

    /// Manufacturer, model, revision, serial, and the SIM's own number.
    pub async fn modem_info(&mut self) -> SmsResult<ModemInfo> {
        let manufacturer = self.query_value("AT+CGMI").await?;
        let model = self.query_value("AT+CGMM").await?;
        let revision = self.query_value("AT+CGMR").await?;
        let serial = self.query_value("AT+CGSN").await?;
        let own_number = SubscriberNumber::from_response(&self.exec_ok("AT+CNUM").await?);
        Ok(ModemInfo {
            manufacturer,
            model,
            revision,
            serial,
            own_number,
        })
    }

    /// Operator name, numeric MCC/MNC, and the packet-data context table.
    pub async fn network_info(&mut self) -> SmsResult<NetworkInfo> {
        self.exec_ok("AT+COPS=3,0").await?;
        let names = OperatorSelection::from_response(&self.exec_ok("AT+COPS?").await?)?;
        self.exec_ok("AT+COPS=3,2").await?;
        let numeric = OperatorSelection::from_response(&self.exec_ok("AT+COPS?").await?)?;
        let (mcc, mnc) = match numeric.numeric_codes() {
            Some((mcc, mnc)) => (Some(mcc), Some(mnc)),
            None => (None, None),
        };

        let defined = responses::pdp::defined_contexts(&self.exec_ok("AT+CGDCONT?").await?);
        let activation = responses::pdp::activation_states(&self.exec_ok("AT+CGACT?").await?);
        let addresses = if defined.is_empty() {
            Default::default()
        } else {
            let cids = defined
                .iter()
                .map(|context| context.cid.to_string())
                .collect::<Vec<_>>()
                .join(",");
            responses::pdp::context_addresses(&self.exec_ok(&format!("AT+CGPADDR={cids}")).await?)
        };

        Ok(NetworkInfo {
            operator: names.operator,
            mcc,
            mnc,
            contexts: responses::pdp::merge_context_table(defined, activation, addresses),
        })
    }

    /// Signal strength and bit error rate from `AT+CSQ`.
    pub async fn signal_quality(&mut self) -> SmsResult<SignalQuality> {
        let response = self.exec_ok("AT+CSQ").await?;
        SignalQuality::from_response(&response)
    }

    /// Preferred-storage report from `AT+CPMS?`.
    pub async fn message_storage(&mut self) -> SmsResult<StorageReport> {
        let response = self.exec_ok("AT+CPMS?").await?;
        StorageReport::from_response(&response)
    }

    /// Point all three preferred-storage slots at `memory` (e.g. `"SM"`),
    /// then report the resulting state.
    pub async fn set_message_storage(&mut self, memory: &str) -> SmsResult<StorageReport> {
        if memory.is_empty() || !memory.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SmsError::Validation(format!(
                "invalid storage memory name {memory:?}"
            )));
        }
        self.exec_ok(&format!("AT+CPMS=\"{memory}\",\"{memory}\",\"{memory}\""))
            .await?;
        self.message_storage().await
    }

    /// The serving cell's identifiers (MCC, MNC, LAC, CID) — the inputs a
    /// cell-tower geolocation service needs.
    pub async fn location_info(&mut self) -> SmsResult<CellLocation> {
        self.exec_ok("AT+CREG=2").await?;
        let registration = RegistrationInfo::from_response(&self.exec_ok("AT+CREG?").await?)?;
        let (lac, cid) = match (registration.lac, registration.cid) {
            (Some(lac), Some(cid)) => (lac, cid),
            _ => {
                return Err(SmsError::Protocol(
                    "+CREG response carries no cell location".into(),
                ))
            }
        };
        self.exec_ok("AT+COPS=3,2").await?;
        let numeric = OperatorSelection::from_response(&self.exec_ok("AT+COPS?").await?)?;
        let (mcc, mnc) = numeric
            .numeric_codes()
            .ok_or_else(|| SmsError::Protocol("+COPS numeric form missing".into()))?;
        Ok(CellLocation { mcc, mnc, lac, cid })
    }

    /// Await the next complete incoming message.
    ///
    /// Blocks on `+CMTI` indications, reads each indicated slot, and feeds
    /// fragments through the live reassembler; returns once a logical
    /// message is complete (immediately for single-part messages). The
    /// returned message is also published as a
    /// [`ModemEvent::Message`] event.
    pub async fn next_message(&mut self) -> SmsResult<SmsMessage> {
        if !self.transport.is_open() {
            return Err(SmsError::PortClosed);
        }
        loop {
            let Some(indication) = self.indications.recv().await else {
                return Err(SmsError::PortClosed);
            };
            debug!(
                storage = %indication.storage,
                index = indication.index,
                "new message indication"
            );
            let Some(message) = self.read_single(indication.index).await? else {
                warn!(index = indication.index, "indicated slot is empty");
                continue;
            };
            let complete = if self.concatenate {
                self.live.push(message)
            } else {
                Some(message)
            };
            if let Some(message) = complete {
                self.transport
                    .events()
                    .publish(ModemEvent::Message(message.clone()));
                return Ok(message);
            }
        }
    }

    /// Read one slot without concat resolution: `None` when the response
    /// does not carry a `+CMGR` header followed by an uppercase hex PDU.
    async fn read_single(&mut self, index: u32) -> SmsResult<Option<SmsMessage>> {
        let response = self.exec(&format!("AT+CMGR={index}")).await?;
        let mut lines = response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let Some(header) = lines.next().and_then(CmgrHeader::from_line) else {
            return Ok(None);
        };
        let header = header?;
        let Some(pdu_line) = lines.next().filter(|line| crate::framer::is_hex_pdu(line)) else {
            return Ok(None);
        };
        let decoded = self.codec.parse(pdu_line)?;
        Ok(Some(SmsMessage::from_decoded(index, header.status, decoded)))
    }

    /// Two-phase PDU submission shared by CMGS and CMGW: announce the
    /// length, require the `> ` prompt, then write the hex body terminated
    /// by Ctrl-Z and require `OK`.
    async fn submit_pdu(&mut self, announce: &str, pdu: &SubmitPdu) -> SmsResult<String> {
        let prompt = self.exec(announce).await?;
        if !responses::has_prompt(&prompt) {
            return Err(SmsError::SendFailed { response: prompt });
        }
        let options = ExecOptions::pdu_body().with_timeout(self.command_timeout);
        let response = self.transport.exec(&pdu.hex, options).await?;
        if !responses::has_ok(&response) {
            return Err(SmsError::SendFailed { response });
        }
        Ok(response)
    }

    /// Issue one command with the session timeout.
    async fn exec(&mut self, command: &str) -> SmsResult<String> {
        let options = ExecOptions::default().with_timeout(self.command_timeout);
        self.transport.exec(command, options).await
    }

    /// Issue one command and require an `OK` trailer.
    async fn exec_ok(&mut self, command: &str) -> SmsResult<String> {
        let response = self.exec(command).await?;
        if !responses::has_ok(&response) {
            return Err(SmsError::Modem { response });
        }
        Ok(response)
    }

    /// First payload line of a simple `<value>\nOK` query.
    async fn query_value(&mut self, command: &str) -> SmsResult<String> {
        let response = self.exec_ok(command).await?;
        response
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("OK"))
            .map(str::to_string)
            .ok_or_else(|| SmsError::Protocol(format!("{command} returned no value")))
    }
}

/// Destination numbers: optional leading `+`, then 3..=20 digits.
fn validate_destination(destination: &str) -> SmsResult<()> {
    let digits = destination.strip_prefix('+').unwrap_or(destination);
    let valid = (3..=20).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(SmsError::Validation(format!(
            "invalid destination number {destination:?}"
        )))
    }
}
