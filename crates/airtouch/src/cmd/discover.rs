use airtouch::discovery::{resolve_host, ConsoleDiscovery, ConsoleInfo};
use airtouch::{discover, discover_generation};

use crate::cmd::DiscoverArgs;
use crate::exit::{discovery_error, CliResult, SUCCESS};
use crate::output::{print_consoles, OutputFormat};

pub async fn run(args: DiscoverArgs, format: OutputFormat) -> CliResult<i32> {
    let found = match args.generation {
        Some(generation) => {
            let mut config = ConsoleDiscovery::new(generation.into());
            if let Some(port) = args.discovery_port {
                config = config.with_remote_port(port);
            }
            if let Some(port) = args.local_port {
                config = config.with_local_port(port);
            }
            let host = match &args.host {
                Some(host) => Some(
                    resolve_host(host)
                        .await
                        .map_err(|err| discovery_error("invalid host", err))?,
                ),
                None => None,
            };
            discover_generation(config, host)
                .await
                .map_err(|err| discovery_error("discovery failed", err))?
        }
        None => discover(args.host.as_deref())
            .await
            .map_err(|err| discovery_error("discovery failed", err))?
            .iter()
            .map(|console| console.info().clone())
            .collect::<Vec<ConsoleInfo>>(),
    };

    tracing::info!(found = found.len(), "discovery finished");
    print_consoles(&found, format);
    Ok(SUCCESS)
}
