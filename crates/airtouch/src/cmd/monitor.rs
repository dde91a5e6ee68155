use std::net::SocketAddr;

use airtouch::conn::{ConnectionConfig, ConnectionEvent, Subscription};
use airtouch::discovery::resolve_host;
use airtouch::frame::Generation;
use airtouch::Console;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{connection_error, discovery_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_connection_lost, print_message, OutputFormat};

pub async fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let generation = Generation::from(args.generation);
    let host = resolve_host(&args.host)
        .await
        .map_err(|err| discovery_error("invalid host", err))?;
    let port = args.port.unwrap_or_else(|| generation.default_port());

    let console = Console::at(host, generation, port, ConnectionConfig::default());
    let label = SocketAddr::from((host, port)).to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    console
        .connection()
        .subscribe(Subscription::All, move |event: &ConnectionEvent| {
            let _ = tx.send(event.clone());
        });

    if let Err(err) = console.try_init().await {
        console.shutdown().await;
        return Err(connection_error("failed to connect", err));
    }
    info!(console = %label, ?duration, "monitoring console");

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let outcome = loop {
        tokio::select! {
            _ = &mut deadline => break Ok(SUCCESS),
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break Ok(SUCCESS);
            }
            event = rx.recv() => match event {
                Some(ConnectionEvent::Message(message)) => print_message(&label, &message, format),
                Some(ConnectionEvent::ConnectionLost) => {
                    print_connection_lost(&label, format);
                    warn!(console = %label, "gave up reconnecting");
                    break Err(CliError::new(FAILURE, format!("connection to {label} lost")));
                }
                None => break Ok(SUCCESS),
            },
        }
    };

    console.shutdown().await;
    outcome
}
