//! amfwire - AMF0/AMF3 message inspector
//!
//! Decodes remoting messages to JSON, encodes JSON back to messages and
//! inspects single values.

mod commands;

use amfwire_protocol::{CodecConfig, CodecContext};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amfwire")]
#[command(about = "Inspect and build AMF0/AMF3 remoting messages")]
#[command(version)]
struct Cli {
    /// YAML codec configuration
    #[arg(short, long, env = "AMFWIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a message file to JSON
    Decode {
        /// Message file
        file: PathBuf,

        /// The file holds hex text instead of raw bytes
        #[arg(long)]
        hex: bool,
    },

    /// Encode a JSON message description
    Encode {
        /// Message JSON (or @file.json to read from file)
        json: String,

        /// Write the message bytes to this file instead of printing hex
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a single hex-encoded value
    Value {
        /// Marker set the value starts in
        #[arg(short, long, value_enum, default_value = "amf3")]
        encoding: EncodingArg,

        /// Value bytes as hex
        hex: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncodingArg {
    Amf0,
    Amf3,
}

fn load_config(path: Option<&PathBuf>) -> Result<CodecConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(CodecConfig::from_env());
    };
    let mut config = CodecConfig::from_file(path)?;
    config.apply_env_overrides();
    config.validate()?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    let context = CodecContext::init(config);

    match commands::execute(&context, cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
