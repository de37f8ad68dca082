// ABOUTME: Small operator console: issue AT commands over a serial port and watch notifications
// ABOUTME: Exercises the transport layer directly; no PDU codec is required

use argh::FromArgs;
use at_sms::{AtTransport, ExecOptions, ModemConfig, ModemEvent};
use std::error::Error;
use std::time::Duration;

/// Issue AT commands to a cellular modem and watch unsolicited result codes.
#[derive(FromArgs)]
struct Args {
    /// serial device path, e.g. /dev/ttyUSB0
    #[argh(option, short = 'd')]
    device: String,

    /// baud rate (default 115200)
    #[argh(option, short = 'b', default = "115200")]
    baud: u32,

    /// per-command timeout in milliseconds (default 10000)
    #[argh(option, default = "10000")]
    timeout_ms: u64,

    /// AT command to issue; repeatable, executed in order
    #[argh(option, short = 'c')]
    command: Vec<String>,

    /// after the commands, keep the port open and print notifications
    #[argh(switch, short = 'w')]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "at_sms=info".into()),
        )
        .init();

    let args: Args = argh::from_env();
    let config = ModemConfig::new(&args.device)
        .with_baud_rate(args.baud)
        .with_command_timeout(Duration::from_millis(args.timeout_ms));

    let (mut transport, _indications) = AtTransport::new(config);
    let mut events = transport.subscribe();
    transport.open().await?;

    for command in &args.command {
        println!("> {command}");
        match transport.exec(command, ExecOptions::default()).await {
            Ok(response) => println!("{}", response.trim()),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    if args.watch {
        println!("watching for notifications, ctrl-c to stop");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ModemEvent::Notification(line)) => println!("{line}"),
                    Ok(_) => {}
                    Err(_) => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    transport.close().await;
    Ok(())
}
