//! desk-io - command line front end for the desk controller
//!
//! ```text
//! desk-io [--config <path>] <command> [arg]
//! ```
//!
//! The desk is woken before every command. Ctrl-C stops motion (after the
//! settle delay) and ends `monitor`.

use crossbeam_channel::{Receiver, select};
use desk_io::relay::{RelayPair, SysfsPin};
use desk_io::transport::SerialTransport;
use desk_io::{AppConfig, DeskCommand, DeskController, Error, Height, Result, SeekOutcome};
use std::env;
use std::process;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/desk-io.toml";

enum CliCommand {
    /// Any table command, run through `DeskController::execute`
    Table(String),
    Height,
    Goto(Height),
    Monitor,
}

/// Split arguments into the config path and the positional arguments.
///
/// Supports `--config <path>` and `-c <path>` anywhere on the line.
fn parse_args(args: &[String]) -> (String, Vec<String>) {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut positional = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = iter.next() {
                config_path = path.clone();
            }
        } else {
            positional.push(arg.clone());
        }
    }

    (config_path, positional)
}

fn parse_command(positional: &[String]) -> Option<CliCommand> {
    let name = positional.first()?;
    match name.as_str() {
        "height" => Some(CliCommand::Height),
        "monitor" => Some(CliCommand::Monitor),
        "goto" => {
            let value: f32 = positional.get(1)?.parse().ok()?;
            Height::from_units(value).map(CliCommand::Goto)
        }
        other => other
            .parse::<DeskCommand>()
            .ok()
            .map(|_| CliCommand::Table(other.to_string())),
    }
}

fn usage() -> ! {
    let table: Vec<&str> = DeskCommand::ALL.iter().map(|cmd| cmd.name()).collect();
    eprintln!("Usage: desk-io [--config <path>] <command> [arg]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  height        read the current height (wakes a sleeping desk)");
    eprintln!("  goto <h>      move to height <h>");
    eprintln!("  monitor       print height changes until Ctrl-C");
    eprintln!("  {}", table.join(", "));
    process::exit(1);
}

fn open_controller(
    config: &AppConfig,
    on_height: impl Fn(Height) + Send + Sync + 'static,
) -> Result<DeskController> {
    let transport = SerialTransport::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.read_timeout(),
    )?;

    let relay_1 = SysfsPin::for_line(&config.relays.sysfs_root, config.relays.relay_1)?;
    let relay_2 = SysfsPin::for_line(&config.relays.sysfs_root, config.relays.relay_2)?;
    log::info!(
        "Relays on GPIO {} and {}",
        config.relays.relay_1,
        config.relays.relay_2
    );

    DeskController::new(
        Box::new(transport),
        Box::new(RelayPair::new(relay_1, relay_2)),
        config,
        on_height,
    )
}

fn run(
    controller: &DeskController,
    command: CliCommand,
    heights: Receiver<Height>,
    stop: Receiver<()>,
) -> Result<()> {
    match command {
        CliCommand::Table(name) => controller.execute(&name),
        CliCommand::Height => {
            let height = match controller.current_height() {
                Some(height) => height,
                None => controller.probe_height_while_idle()?,
            };
            println!("{}", height);
            Ok(())
        }
        CliCommand::Goto(target) => match controller.seek(target)? {
            SeekOutcome::Reached(height) => {
                println!("{}", height);
                Ok(())
            }
            SeekOutcome::Cancelled => {
                log::warn!("Seek to {} cancelled", target);
                Ok(())
            }
        },
        CliCommand::Monitor => loop {
            select! {
                recv(heights) -> height => match height {
                    Ok(height) => println!("{}", height),
                    Err(_) => return Ok(()),
                },
                recv(stop) -> _ => return Ok(()),
            }
        },
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let (config_path, positional) = parse_args(&args);
    let Some(command) = parse_command(&positional) else {
        usage();
    };

    let config = AppConfig::load_or_default(&config_path)?;

    // RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    log::info!("desk-io v{} (config {})", env!("CARGO_PKG_VERSION"), config_path);

    let (height_tx, height_rx) = crossbeam_channel::unbounded();
    let controller = Arc::new(open_controller(&config, move |height| {
        let _ = height_tx.send(height);
    })?);

    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    let handler_controller = Arc::clone(&controller);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        handler_controller.request_stop();
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    controller.wake()?;
    let result = run(&controller, command, height_rx, stop_rx);
    if let Err(e) = &result {
        log::error!("{}", e);
    }

    controller.shutdown()?;
    result
}
