use airtouch::discovery::{AIRTOUCH4_DISCOVERY_PORT, AIRTOUCH5_DISCOVERY_PORT};
use airtouch::frame::Generation;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("airtouch {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: airtouch");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("AIRTOUCH_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("AIRTOUCH_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    for generation in Generation::ALL {
        let discovery_port = match generation {
            Generation::AirTouch4 => AIRTOUCH4_DISCOVERY_PORT,
            Generation::AirTouch5 => AIRTOUCH5_DISCOVERY_PORT,
        };
        println!(
            "{}: tcp={} discovery=udp/{}",
            generation.to_string().to_lowercase(),
            generation.default_port(),
            discovery_port
        );
    }

    Ok(SUCCESS)
}
