//! Command line front end for the OmniPower telegram decoder
//!
//! Telegrams come in as hex strings, either on the command line or
//! from a file with one frame per line. Decoded measurements leave as
//! a JSON array. Set `RUST_LOG=debug` to watch the pipeline work.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};

use omnipower_rs::logging::{init_logger, log_info, log_warn};
use omnipower_rs::util::hex::{decode_hex, encode_hex};
use omnipower_rs::wmbus::manufacturer::get_manufacturer_name;
use omnipower_rs::{AesKey, MeasurementLog, MeasurementSink, MeterError, OmniPower, WMBusFrame};

#[derive(Parser)]
#[command(name = "omnipower-cli")]
#[command(about = "Decode Kamstrup OmniPower wM-Bus telegrams", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt and decode telegrams, writing the measurement log as JSON
    Decode {
        /// Meter key as 32 hex characters
        #[arg(short, long)]
        key: String,

        /// Telegram frames as hex strings
        telegrams: Vec<String>,

        /// Read additional telegrams from a file, one hex string per line
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the JSON log to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the header fields of a telegram without decrypting it
    Identify {
        /// Telegram frame as a hex string
        telegram: String,
    },
}

fn main() -> Result<(), MeterError> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            key,
            telegrams,
            input,
            output,
            pretty,
        } => decode_command(&key, telegrams, input, output, pretty),
        Commands::Identify { telegram } => identify_command(&telegram),
    }
}

fn decode_command(
    key: &str,
    telegrams: Vec<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), MeterError> {
    let key = AesKey::from_hex(key)?;
    let meter = OmniPower::with_key(key);

    let mut lines = telegrams;
    if let Some(path) = input {
        let content = fs::read_to_string(path)?;
        lines.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    let mut log = MeasurementLog::new();
    let mut last_error: Option<MeterError> = None;

    for line in &lines {
        let result = decode_hex(line)
            .map_err(MeterError::from)
            .and_then(|bytes| {
                meter
                    .process_telegram(&bytes, Utc::now())
                    .map_err(MeterError::from)
            });
        match result {
            Ok(measurement) => {
                log_info(&format!(
                    "decoded telegram from {} with {} value blocks",
                    measurement.address_hex(),
                    measurement.blocks.len()
                ));
                log.append(measurement);
            }
            // a single bad capture should not kill the whole run
            Err(err) => {
                log_warn(&format!("skipping telegram: {err}"));
                last_error = Some(err);
            }
        }
    }

    if log.is_empty() {
        if let Some(err) = last_error {
            return Err(err);
        }
        log_warn("no telegrams given");
    }

    let json = if pretty {
        log.to_json_pretty()?
    } else {
        log.to_json()?
    };
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn identify_command(telegram: &str) -> Result<(), MeterError> {
    let bytes = decode_hex(telegram)?;
    let frame = WMBusFrame::parse(&bytes)?;
    let header = frame.header();

    println!(
        "manufacturer: {} ({})",
        header.manufacturer_code(),
        get_manufacturer_name(header.manufacturer_id)
    );
    println!("address:      {:08X}", header.device_address);
    println!("version:      0x{:02x}", header.version);
    println!("device type:  0x{:02x}", header.device_type);
    println!("CI field:     0x{:02x}", header.ci_field);
    println!("access nr:    {}", header.access_counter);
    println!(
        "session:      mode {}, time {}, nr {}",
        header.sn_encryption_mode(),
        header.sn_time(),
        header.sn_session()
    );
    println!(
        "ciphertext:   {} bytes ({})",
        frame.ciphertext().len(),
        encode_hex(frame.ciphertext())
    );
    Ok(())
}
