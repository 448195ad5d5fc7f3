//! RDD CLI
//!
//! Encode and decode DeviceDriver extension messages from the command line.

use clap::{Parser, Subcommand};
use rdd::protocol::{
    armor, decode_query, decode_response, encode_query, encode_query_body, unarmor,
    DEVICE_QUERY, DEVICE_RESPONSE,
};
use rdd::{ActionCode, DeviceQuery, RddError, StatusCode};
use tracing_subscriber::{fmt, EnvFilter};

/// RDD CLI
#[derive(Parser, Debug)]
#[command(name = "rdd-cli")]
#[command(about = "Inspect remote DeviceDriver query/response messages")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode an OPEN query
    EncodeOpen {
        /// Device unit name, e.g. "/dev/tempsensor0"
        unit: String,

        /// Open flags (decimal or 0x-prefixed hex)
        #[arg(short, long, default_value = "0", value_parser = parse_u16)]
        flags: u16,
    },

    /// Encode a READ, WRITE or CLOSE query
    EncodeQuery {
        #[command(subcommand)]
        query: QueryArgs,
    },

    /// Decode a DEVICE_RESPONSE payload
    DecodeResponse {
        /// Payload as base64 text, or hex with --hex
        payload: String,

        /// Treat the payload as hex-encoded bytes
        #[arg(long)]
        hex: bool,
    },

    /// Decode a DEVICE_QUERY payload
    DecodeQuery {
        /// Payload as base64 text, or hex with --hex
        payload: String,

        /// Treat the payload as hex-encoded bytes
        #[arg(long)]
        hex: bool,
    },

    /// Look up a status by name or value
    Status {
        /// Symbolic name (EPERM) or value (-1); omit to list all
        code: Option<String>,
    },

    /// List the action codes
    Actions,
}

#[derive(Subcommand, Debug)]
enum QueryArgs {
    /// READ from a register
    Read {
        #[arg(long)]
        handle: u16,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        register: i16,
        #[arg(long)]
        count: u16,
    },

    /// WRITE hex-encoded data to a register
    Write {
        #[arg(long)]
        handle: u16,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        register: i16,
        #[arg(long)]
        data: String,
    },

    /// CLOSE a handle
    Close {
        #[arg(long)]
        handle: u16,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rdd=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> rdd::Result<()> {
    match command {
        Commands::EncodeOpen { unit, flags } => print_query(&DeviceQuery::open(unit, flags)),
        Commands::EncodeQuery { query } => {
            let query = match query {
                QueryArgs::Read {
                    handle,
                    register,
                    count,
                } => DeviceQuery::Read {
                    handle,
                    register,
                    count,
                },
                QueryArgs::Write {
                    handle,
                    register,
                    data,
                } => DeviceQuery::Write {
                    handle,
                    register,
                    data: parse_hex(&data)?,
                },
                QueryArgs::Close { handle } => DeviceQuery::Close { handle },
            };
            print_query(&query)
        }
        Commands::DecodeResponse { payload, hex } => {
            let bytes = payload_bytes(&payload, hex, DEVICE_RESPONSE)?;
            let response = decode_response(&bytes)?;
            println!("action:               {}", response.action);
            println!("handle:               {}", response.handle);
            println!("register:             {}", response.register);
            println!("requested byte count: {}", response.requested_byte_count);
            println!("status:               {}", response.status_code());
            if !response.data.is_empty() {
                println!("data:                 {}", hex::encode(&response.data));
            }
            Ok(())
        }
        Commands::DecodeQuery { payload, hex } => {
            let bytes = payload_bytes(&payload, hex, DEVICE_QUERY)?;
            println!("{:?}", decode_query(&bytes)?);
            Ok(())
        }
        Commands::Status { code: Some(code) } => {
            let status = match code.parse::<i16>() {
                Ok(value) => StatusCode::from_value(value)
                    .ok_or_else(|| RddError::UnknownStatus(code.clone()))?,
                Err(_) => StatusCode::lookup(&code)?,
            };
            println!("{}", status);
            Ok(())
        }
        Commands::Status { code: None } => {
            for status in StatusCode::all() {
                println!("{:>5}  {:<16} {}", status.value, status.name, status.message);
            }
            Ok(())
        }
        Commands::Actions => {
            for action in ActionCode::ALL {
                println!("{}  {}", action as u8, action);
            }
            Ok(())
        }
    }
}

fn print_query(query: &DeviceQuery) -> rdd::Result<()> {
    let body = encode_query_body(query)?;
    let message = encode_query(query)?;
    println!("body:    {}", hex::encode(&body));
    println!("armored: {}", String::from_utf8_lossy(&armor(&body)));
    println!("message: {}", hex::encode(&message));
    Ok(())
}

/// Payload bytes as the transport would deliver them (command byte stripped)
fn payload_bytes(input: &str, is_hex: bool, command: u8) -> rdd::Result<Vec<u8>> {
    let mut bytes = if is_hex {
        parse_hex(input)?
    } else {
        input.trim().as_bytes().to_vec()
    };
    // Accept a full message too
    if is_hex && bytes.first() == Some(&command) && unarmor(&bytes).is_err() {
        bytes.remove(0);
    }
    Ok(bytes)
}

fn parse_hex(input: &str) -> rdd::Result<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(cleaned.trim_start_matches("0x"))
        .map_err(|e| RddError::Config(format!("invalid hex '{}': {}", input, e)))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => input.parse::<u16>(),
    }
    .map_err(|e| format!("invalid u16 '{}': {}", input, e))
}
