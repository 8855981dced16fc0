//! Pacer Link CLI
//!
//! Read presets from a Nektar Pacer over sysex, decode .syx files, and save
//! received dumps. The protocol work happens in the library; this binary
//! only parses flags, wires ports to a session, and prints tables.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use pacer_link::addressing::{to_address, to_index, PresetAddress, PresetIndex};
use pacer_link::config::{AppConfig, DeviceProfile};
use pacer_link::midi::{format_hex, MessageKind};
use pacer_link::ports::{self, MidirTransport};
use pacer_link::session::{timestamped_syx_name, DeviceSession};
use pacer_link::store::PresetSnapshot;
use pacer_link::sysex::is_protocol_frame;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pacer Link - exchange presets with a Nektar Pacer foot controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pacer-link.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Decode a .syx file instead of talking to a device
    #[arg(long, value_name = "FILE")]
    decode: Option<PathBuf>,

    /// Read one preset, by index or address (e.g. 5, A5, CUR)
    #[arg(long, value_name = "PRESET")]
    preset: Option<String>,

    /// Read a single object within --preset (e.g. 0x0D)
    #[arg(long, value_name = "ID", requires = "preset")]
    object: Option<String>,

    /// Read all presets (the default action when connected)
    #[arg(long, conflicts_with = "preset")]
    all: bool,

    /// Print inbound MIDI traffic until Ctrl+C
    #[arg(long)]
    monitor: bool,

    /// Save the received raw dump (default: timestamped .syx name)
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    save: Option<PathBuf>,

    /// Print the decoded snapshot as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports_formatted()?;
        return Ok(());
    }

    let config = load_config(&args.config).await?;

    if args.monitor {
        return run_monitor(&config).await;
    }

    let session = Arc::new(DeviceSession::new(config.device.clone()));

    // Offline path: decode a file through the same pipeline
    if let Some(path) = &args.decode {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let merged = session.ingest_buffer(&data)?;
        info!("{} frames merged from {}", merged, path.display());
        return report(&session, &args).await;
    }

    // Device path: wire both ports, then run the requested read
    let _input = ports::connect_input(session.clone(), &config.midi.input_port)?;
    let transport = MidirTransport::connect(&config.midi.output_port)?;
    session.set_transport(Arc::new(transport));

    if let Some(target) = &args.preset {
        let index = parse_preset(session.profile(), target)?;
        if let Some(object) = &args.object {
            session.read_preset_object(index, parse_object(object)?).await?;
        } else {
            session.read_preset(index).await?;
        }
    } else {
        if !args.all {
            info!("no --preset given, reading all presets");
        }
        // a full read starts from a clean snapshot
        session.clear();
        session.read_all_presets().await?;
    }

    report(&session, &args).await
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn load_config(path: &str) -> Result<AppConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let config = AppConfig::load(path).await?;
        info!("Configuration loaded from {}", path);
        Ok(config)
    } else {
        info!("No config file at {}, using built-in Pacer defaults", path);
        Ok(AppConfig::default())
    }
}

/// Accept a linear index or a device address like "B3"
fn parse_preset(profile: &DeviceProfile, value: &str) -> Result<PresetIndex> {
    if let Ok(index) = value.parse::<PresetIndex>() {
        to_address(profile, index)?; // range check only
        return Ok(index);
    }
    let address: PresetAddress = value.parse()?;
    Ok(to_index(profile, address)?)
}

/// Accept "0x0D" or plain decimal
fn parse_object(value: &str) -> Result<u8> {
    let id = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).with_context(|| format!("not an object id: '{}'", value))?
    } else {
        value.parse()
            .with_context(|| format!("not an object id: '{}'", value))?
    };
    Ok(id)
}

async fn report(session: &DeviceSession, args: &Args) -> Result<()> {
    let snapshot = session.snapshot();

    if args.json {
        println!("{}", session.export_json()?);
    } else {
        print_presets(session.profile(), &snapshot);
    }

    if let Some(path) = &args.save {
        let path = if path.as_os_str().is_empty() {
            PathBuf::from(timestamped_syx_name("pacer-dump"))
        } else {
            path.clone()
        };
        tokio::fs::write(&path, snapshot.raw())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{} {} ({} bytes)",
            "saved".green(),
            path.display(),
            snapshot.raw().len()
        );
    }

    Ok(())
}

fn print_presets(profile: &DeviceProfile, snapshot: &PresetSnapshot) {
    println!("\n{}", format!("=== {} ===", profile.name).bold().cyan());

    if snapshot.presets().is_empty() {
        println!("  {}", "no presets decoded".dimmed());
        return;
    }

    for index in 0..=profile.preset_count {
        let Ok(address) = to_address(profile, index) else {
            continue;
        };
        let label = format!("{:>3}  {:<4}", index, address.to_string());
        match snapshot.preset(index) {
            Some(record) => {
                let name = record.name.as_deref().unwrap_or("-");
                let detail = match &record.data {
                    Some(data) => format_hex(data).dimmed(),
                    None => format!("{} object(s)", record.objects.len()).dimmed(),
                };
                println!("  {} {:<16} {}", label.white(), name.bright_white(), detail);
            }
            None => println!("  {} {}", label.white(), "no data".dimmed()),
        }
    }
    println!();
}

fn list_ports_formatted() -> Result<()> {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let inputs = ports::discover_input_ports()?;
    println!("\n{}", "Input Ports:".bold());
    if inputs.is_empty() {
        println!("  {}", "No input ports found".dimmed());
    } else {
        for port in &inputs {
            println!("  [{}] {}", port.index, port.name);
        }
    }

    let outputs = ports::discover_output_ports()?;
    println!("\n{}", "Output Ports:".bold());
    if outputs.is_empty() {
        println!("  {}", "No output ports found".dimmed());
    } else {
        for port in &outputs {
            println!("  [{}] {}", port.index, port.name);
        }
    }

    // the Pacer announces itself in its port names
    if let (Some(input), Some(output)) = (
        ports::match_port(&inputs, "PACER"),
        ports::match_port(&outputs, "PACER"),
    ) {
        println!("\n{}", "Auto-detected Pacer:".bold().bright_green());
        println!("  Input:  {}", input.name.bright_white());
        println!("  Output: {}", output.name.bright_white());
    }

    println!();
    Ok(())
}

async fn run_monitor(config: &AppConfig) -> Result<()> {
    let profile = config.device.clone();
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(1024);

    let _conn = ports::connect_input_raw(&config.midi.input_port, move |data| {
        let _ = tx.try_send(data.to_vec());
    })?;

    println!("{}", "Monitoring MIDI traffic... Ctrl+C to exit".green());
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(data) => print_message(&profile, &data),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    println!("\n{}", "Monitor stopped".yellow());
    Ok(())
}

fn print_message(profile: &DeviceProfile, data: &[u8]) {
    let kind = MessageKind::of(data);
    let hex = if is_protocol_frame(profile, data) {
        format_hex(data).bright_magenta()
    } else {
        format_hex(data).bright_black()
    };
    println!("{:>14} | {}", kind.to_string().white(), hex);
}
