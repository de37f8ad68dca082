// ABOUTME: Serial AT transport: request/response arbitration with a single in-flight command slot
// ABOUTME: A background reader task frames chunks, resolves responses, and routes unsolicited lines

use crate::config::{self, ModemConfig};
use crate::error::{SmsError, SmsResult};
use crate::events::{EventBus, ModemEvent};
use crate::framer;
use crate::responses::NewMessageIndex;
use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, warn};

/// Byte appended after a command line.
pub const COMMAND_TERMINATOR: u8 = 0x0D;

/// Ctrl-Z, terminating a PDU body after the `> ` prompt.
pub const PDU_TERMINATOR: u8 = 0x1A;

/// Per-command options for [`AtTransport::exec`].
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    /// Response deadline, 1 ms ..= 60 s
    pub timeout: Duration,
    /// Byte written after the command text
    pub terminator: u8,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: config::DEFAULT_COMMAND_TIMEOUT,
            terminator: COMMAND_TERMINATOR,
        }
    }
}

impl ExecOptions {
    /// Options for the PDU body write that follows a `> ` prompt.
    pub fn pdu_body() -> Self {
        Self {
            terminator: PDU_TERMINATOR,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The command currently awaiting its response terminator.
struct Pending {
    buffer: String,
    /// Offset of the first line the terminator scan has not finished with
    scan_from: usize,
    reply: oneshot::Sender<String>,
}

type CommandSlot = Arc<Mutex<Option<Pending>>>;

struct PortState {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    slot: CommandSlot,
    reader: JoinHandle<()>,
}

/// Request/response arbiter over one serial port.
///
/// The transport owns the port exclusively and enforces the pipeline
/// contract: at most one command in flight, responses collected until a
/// terminator (`OK`, `ERROR`, `+CME/+CMS ERROR`, or the `> ` prompt) is
/// seen anchored at a line start, unsolicited result codes routed to the
/// notification surface while idle.
///
/// Lifecycle: created closed, [`open`](AtTransport::open)ed once
/// (idempotent), reusable for commands, [`close`](AtTransport::close)d
/// idempotently. Closing rejects the in-flight command with
/// [`SmsError::PortClosed`].
pub struct AtTransport {
    config: ModemConfig,
    events: EventBus,
    indications: mpsc::UnboundedSender<NewMessageIndex>,
    state: Option<PortState>,
}

impl AtTransport {
    /// Create a closed transport for the configured port.
    ///
    /// The returned receiver yields one [`NewMessageIndex`] per `+CMTI`
    /// indication; the session's live-receive loop consumes it.
    pub fn new(config: ModemConfig) -> (Self, mpsc::UnboundedReceiver<NewMessageIndex>) {
        let events = EventBus::new(config.event_capacity);
        let (indications, indication_rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                events,
                indications,
                state: None,
            },
            indication_rx,
        )
    }

    /// Subscribe to lifecycle events from this point onward.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ModemEvent> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Acquire the serial port and start the receive pipeline.
    ///
    /// Idempotent: a second call on an open transport does nothing and
    /// `PortOpen` is emitted once per actual open.
    pub async fn open(&mut self) -> SmsResult<()> {
        if self.state.is_some() {
            return Ok(());
        }
        self.config.validate()?;
        let stream = tokio_serial::new(&self.config.device, self.config.baud_rate)
            .open_native_async()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        debug!(device = %self.config.device, baud = self.config.baud_rate, "serial port opened");
        self.install(stream);
        Ok(())
    }

    /// Start the receive pipeline over an arbitrary duplex byte stream.
    ///
    /// Used by tests (`tokio::io::duplex`) and by callers driving a modem
    /// behind something other than a native serial device. Idempotent like
    /// [`open`](AtTransport::open).
    pub fn open_stream<S>(&mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        if self.state.is_some() {
            return;
        }
        self.install(stream);
    }

    fn install<S>(&mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let slot: CommandSlot = Arc::new(Mutex::new(None));
        let reader = tokio::spawn(run_reader(
            read_half,
            Arc::clone(&slot),
            self.events.clone(),
            self.indications.clone(),
        ));
        self.state = Some(PortState {
            writer: Mutex::new(Box::new(write_half)),
            slot,
            reader,
        });
        self.events.publish(ModemEvent::PortOpen);
    }

    /// Release the port. Idempotent; emits `PortClose` at most once per
    /// open and rejects a pending command with [`SmsError::PortClosed`].
    pub async fn close(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        state.reader.abort();
        // Dropping the reply sender rejects the caller with PortClosed.
        state.slot.lock().await.take();
        self.events.publish(ModemEvent::PortClose);
    }

    /// Write `command` plus one terminator byte and await the classified
    /// response.
    ///
    /// Resolves with the accumulated response text verbatim, including any
    /// `OK`/`ERROR` trailer and `+CME ERROR:` lines; modem-reported
    /// failures are surfaced by the session layer after parsing, not here.
    ///
    /// Fails fast with [`SmsError::PortClosed`] before open and
    /// [`SmsError::Busy`] while another command is in flight — there is no
    /// queueing; callers serialize. On timeout the in-flight slot is
    /// released (late chunks are discarded) and the port stays open.
    pub async fn exec(&self, command: &str, options: ExecOptions) -> SmsResult<String> {
        config::validate_timeout(options.timeout)?;
        let state = self.state.as_ref().ok_or(SmsError::PortClosed)?;

        let (reply_tx, mut reply_rx) = oneshot::channel();
        {
            let mut slot = state.slot.lock().await;
            if slot.is_some() {
                return Err(SmsError::Busy);
            }
            *slot = Some(Pending {
                buffer: String::new(),
                scan_from: 0,
                reply: reply_tx,
            });
        }

        let frame_write = async {
            let mut writer = state.writer.lock().await;
            writer.write_all(command.as_bytes()).await?;
            writer.write_all(&[options.terminator]).await?;
            writer.flush().await
        };
        if let Err(e) = frame_write.await {
            state.slot.lock().await.take();
            return Err(SmsError::Io(e));
        }
        debug!(command, "command issued");
        self.events.publish(ModemEvent::Command(command.to_string()));

        match tokio::time::timeout(options.timeout, &mut reply_rx).await {
            Ok(Ok(response)) => {
                self.events.publish(ModemEvent::Response(response.clone()));
                Ok(response)
            }
            Ok(Err(_)) => Err(SmsError::PortClosed),
            Err(_) => {
                state.slot.lock().await.take();
                // The reader may have resolved at the deadline edge.
                if let Ok(response) = reply_rx.try_recv() {
                    self.events.publish(ModemEvent::Response(response.clone()));
                    return Ok(response);
                }
                warn!(command, timeout = ?options.timeout, "command timed out");
                Err(SmsError::Timeout {
                    command: command.to_string(),
                    terminator: options.terminator,
                    timeout: options.timeout,
                })
            }
        }
    }
}

/// Receive pipeline: read chunks, normalize line endings, and either grow
/// the in-flight response buffer or classify idle lines as notifications.
async fn run_reader<R>(
    mut reader: R,
    slot: CommandSlot,
    events: EventBus,
    indications: mpsc::UnboundedSender<NewMessageIndex>,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut chunk = BytesMut::with_capacity(4096);
    loop {
        chunk.clear();
        match reader.read_buf(&mut chunk).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "serial read failed");
                break;
            }
        }
        events.publish(ModemEvent::RawBytes(Bytes::copy_from_slice(&chunk)));
        let normalized = framer::normalize(&chunk);

        let mut guard = slot.lock().await;
        if let Some(pending) = guard.as_mut() {
            // In flight: every chunk belongs to the response. The anchored
            // scan resumes from the last incomplete line.
            pending.buffer.push_str(&normalized);
            if framer::find_terminator(&pending.buffer, &mut pending.scan_from).is_some() {
                if let Some(Pending { buffer, reply, .. }) = guard.take() {
                    let _ = reply.send(buffer);
                }
            }
        } else {
            drop(guard);
            for line in framer::trim_blank(&normalized).lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if framer::is_notification(line) {
                    debug!(line, "unsolicited result code");
                    events.publish(ModemEvent::Notification(line.to_string()));
                    if let Ok(indication) = NewMessageIndex::from_line(line) {
                        let _ = indications.send(indication);
                    }
                }
                // Anything else while idle is noise; it was already visible
                // on the raw-bytes event.
            }
        }
    }
    // Stream ended: reject a command still in flight.
    slot.lock().await.take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn transport() -> (AtTransport, mpsc::UnboundedReceiver<NewMessageIndex>) {
        AtTransport::new(ModemConfig::new("/dev/null-modem"))
    }

    #[tokio::test]
    async fn exec_resolves_on_ok_terminator() {
        let (mut at, _cmti) = transport();
        let (local, mut remote) = duplex(256);
        at.open_stream(local);

        let modem = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = remote.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"AT+CSQ\r");
            remote.write_all(b"\r\n+CSQ: 24,99\r\n\r\nOK\r\n").await.unwrap();
            remote
        });

        let response = at.exec("AT+CSQ", ExecOptions::default()).await.unwrap();
        assert_eq!(response, "\n+CSQ: 24,99\n\nOK\n");
        modem.await.unwrap();
    }

    #[tokio::test]
    async fn exec_before_open_is_port_closed() {
        let (at, _cmti) = transport();
        assert!(matches!(
            at.exec("AT", ExecOptions::default()).await,
            Err(SmsError::PortClosed)
        ));
    }

    #[tokio::test]
    async fn concurrent_exec_is_busy() {
        let (mut at, _cmti) = transport();
        let (local, mut remote) = duplex(256);
        at.open_stream(local);

        let modem = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = remote.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"AT\r");
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.write_all(b"\r\nOK\r\n").await.unwrap();
            remote
        });

        let (first, second) = tokio::join!(
            at.exec("AT", ExecOptions::default()),
            at.exec("AT", ExecOptions::default()),
        );
        let outcomes = (first.is_ok(), second.is_ok());
        assert!(outcomes == (true, false) || outcomes == (false, true));
        let busy = if outcomes.0 { second } else { first };
        assert!(matches!(busy, Err(SmsError::Busy)));
        modem.await.unwrap();
    }

    #[tokio::test]
    async fn timeout_releases_the_slot() {
        let (mut at, _cmti) = transport();
        let (local, mut remote) = duplex(256);
        at.open_stream(local);

        // Silent modem for the first command.
        let options = ExecOptions::default().with_timeout(Duration::from_millis(50));
        let result = at.exec("AT", options).await;
        assert!(matches!(result, Err(SmsError::Timeout { .. })));

        // Drain both stalled command frames, then answer the retry.
        let modem = tokio::spawn(async move {
            let mut seen = Vec::new();
            let mut buf = [0u8; 64];
            while !seen.ends_with(b"AT\rAT\r") {
                let n = remote.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
            }
            remote.write_all(b"\r\nOK\r\n").await.unwrap();
            remote
        });

        let response = at.exec("AT", options).await.unwrap();
        assert!(response.contains("OK"));
        modem.await.unwrap();
    }

    #[tokio::test]
    async fn idle_notification_is_published_and_cmti_routed() {
        let (mut at, mut cmti) = transport();
        let (local, mut remote) = duplex(256);
        let mut events = at.subscribe();
        at.open_stream(local);

        remote.write_all(b"\r\n+CMTI: \"SM\",4\r\n").await.unwrap();

        let indication = cmti.recv().await.unwrap();
        assert_eq!(indication.storage, "SM");
        assert_eq!(indication.index, 4);

        let mut saw_notification = false;
        while let Ok(event) = events.try_recv() {
            if let ModemEvent::Notification(line) = event {
                assert_eq!(line, "+CMTI: \"SM\",4");
                saw_notification = true;
            }
        }
        assert!(saw_notification);
    }

    #[tokio::test]
    async fn notification_mid_response_does_not_corrupt_the_buffer() {
        let (mut at, mut cmti) = transport();
        let (local, mut remote) = duplex(256);
        at.open_stream(local);

        let modem = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            remote.read(&mut buf).await.unwrap();
            remote.write_all(b"\r\n+CSQ: 24,99\r\n").await.unwrap();
            remote.write_all(b"+CMTI: \"SM\",9\r\n").await.unwrap();
            remote.write_all(b"OK\r\n").await.unwrap();
            remote
        });

        let response = at.exec("AT+CSQ", ExecOptions::default()).await.unwrap();
        assert!(response.contains("+CSQ: 24,99"));
        assert!(response.contains("+CMTI"));
        assert!(response.ends_with("OK\n"));
        // Consumed into the response, not delivered as an indication.
        assert!(cmti.try_recv().is_err());
        modem.await.unwrap();
    }

    #[tokio::test]
    async fn open_and_close_are_idempotent() {
        let (mut at, _cmti) = transport();
        let mut events = at.subscribe();
        let (local, _remote) = duplex(64);

        at.open_stream(local);
        let (second, _remote2) = duplex(64);
        at.open_stream(second);
        at.close().await;
        at.close().await;

        let mut opens = 0;
        let mut closes = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                ModemEvent::PortOpen => opens += 1,
                ModemEvent::PortClose => closes += 1,
                _ => {}
            }
        }
        assert_eq!(opens, 1);
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn out_of_range_timeout_is_validation_error() {
        let (mut at, _cmti) = transport();
        let (local, _remote) = duplex(64);
        at.open_stream(local);
        let options = ExecOptions::default().with_timeout(Duration::from_secs(90));
        assert!(matches!(
            at.exec("AT", options).await,
            Err(SmsError::Validation(_))
        ));
    }
}
