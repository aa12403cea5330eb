//! Command-line tool for offline SCP03 computations
//!
//! Derives keys, encrypts and decrypts channel data, and replays a handshake
//! transcript without a card attached.

use clap::{Parser, Subcommand};
use scp03::{
    ChannelConfig, Direction, SecurityLevel, Session, StaticKeys,
    constants::{DEFAULT_KEY_VERSION, KEY_LENGTH},
    encryption, kdf,
};

/// Hex-decoded argument, parsed as a single value
type HexBytes = Vec<u8>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the SCP03 KDF
    Kdf {
        /// KDF key (hex, 16 bytes)
        #[arg(short, long, value_parser = parse_hex)]
        key: HexBytes,

        /// Derivation constant (hex byte, e.g. 04 for S-ENC)
        #[arg(short, long, value_parser = parse_byte)]
        constant: u8,

        /// Output length in bits
        #[arg(short, long, default_value_t = 128)]
        bits: u16,

        /// Host challenge (hex, 8 bytes)
        #[arg(long, value_parser = parse_hex)]
        host_challenge: HexBytes,

        /// Card challenge (hex, 8 bytes)
        #[arg(long, value_parser = parse_hex)]
        card_challenge: HexBytes,
    },

    /// Encrypt a data field with S-ENC
    Encrypt {
        #[command(flatten)]
        args: CipherArgs,
    },

    /// Decrypt a data field with S-ENC
    Decrypt {
        #[command(flatten)]
        args: CipherArgs,
    },

    /// Replay a handshake and print the APDUs the host sends
    Handshake {
        /// Host challenge (hex, 8 bytes)
        #[arg(long, value_parser = parse_hex)]
        host_challenge: HexBytes,

        /// Raw INITIALIZE UPDATE response including status word (hex)
        #[arg(short, long, value_parser = parse_hex)]
        response: HexBytes,

        /// Static keys (hex): one key for all three, or ENC|MAC|DEK.
        /// Defaults to the well-known test keys.
        #[arg(short, long, value_parser = parse_hex)]
        keys: Option<HexBytes>,

        /// Key version number for INITIALIZE UPDATE
        #[arg(long, value_parser = parse_byte, default_value = "00")]
        kvn: u8,

        /// Security level (hex byte)
        #[arg(short, long, value_parser = parse_byte, default_value = "33")]
        level: u8,
    },
}

#[derive(clap::Args)]
struct CipherArgs {
    /// S-ENC key (hex, 16 bytes)
    #[arg(short, long, value_parser = parse_hex)]
    key: HexBytes,

    /// Encryption counter
    #[arg(short, long)]
    counter: u32,

    /// Data (hex)
    #[arg(short, long, value_parser = parse_hex)]
    data: HexBytes,

    /// Use the response ICV instead of the command ICV
    #[arg(long)]
    response: bool,
}

impl CipherArgs {
    const fn direction(&self) -> Direction {
        if self.response {
            Direction::Response
        } else {
            Direction::Command
        }
    }
}

fn parse_hex(input: &str) -> Result<HexBytes, hex::FromHexError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(cleaned)
}

fn parse_byte(input: &str) -> Result<u8, std::num::ParseIntError> {
    let digits = input.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16)
}

fn static_keys(keys: Option<HexBytes>) -> scp03::Result<StaticKeys> {
    match keys {
        None => Ok(StaticKeys::default_keys()),
        Some(key) if key.len() == KEY_LENGTH => {
            StaticKeys::new(&key, &key, &key, DEFAULT_KEY_VERSION)
        }
        Some(keys) if keys.len() == 3 * KEY_LENGTH => {
            let (enc, rest) = keys.split_at(KEY_LENGTH);
            let (mac, dek) = rest.split_at(KEY_LENGTH);
            StaticKeys::new(enc, mac, dek, DEFAULT_KEY_VERSION)
        }
        Some(keys) => Err(scp03::Error::InvalidKeyLength(keys.len())),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the tracing logger with env_format and ansi
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Kdf {
            key,
            constant,
            bits,
            host_challenge,
            card_challenge,
        } => {
            let output = kdf::derive(constant, bits, &key, &host_challenge, &card_challenge)?;
            println!("{}", hex::encode_upper(output.as_slice()));
        }
        Commands::Encrypt { args } => {
            let ciphertext =
                encryption::encrypt_for(args.direction(), &args.data, &args.key, args.counter)?;
            println!("{}", hex::encode_upper(ciphertext));
        }
        Commands::Decrypt { args } => {
            let plaintext =
                encryption::decrypt_for(args.direction(), &args.data, &args.key, args.counter)?;
            println!("{}", hex::encode_upper(plaintext.as_slice()));
        }
        Commands::Handshake {
            host_challenge,
            response,
            keys,
            kvn,
            level,
        } => {
            let keys = static_keys(keys)?;
            let config = ChannelConfig::new()
                .with_key_version_number(kvn)
                .with_security_level(SecurityLevel::new(level)?);
            let mut session = Session::with_config(config);

            let initialize_update = session.build_initialize_update(kvn, &host_challenge)?;
            println!(
                "INITIALIZE UPDATE:     {}",
                hex::encode_upper(initialize_update.to_command().to_bytes())
            );

            session.load_initialize_update_response(&response, &keys)?;
            if let Some(key_info) = session.key_info() {
                println!("Key information:       {}", hex::encode_upper(key_info));
            }

            let external_authenticate = session.build_external_authenticate()?;
            println!(
                "EXTERNAL AUTHENTICATE: {}",
                hex::encode_upper(external_authenticate.to_command().to_bytes())
            );
        }
    }

    Ok(())
}
