//! CLI tool for ldap_dn_converter
//!
//! Provides utilities for:
//! - Resolving a name, DN, GUID or SID to the DN of a directory entry
//! - Printing the search filter a lookup would use, without searching
//! - Extracting the friendly value from a DN
//! - Encoding and decoding objectGUID / objectSid values

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ldap_dn_converter::config::DEFAULT_CONFIG_PATH;
use ldap_dn_converter::escape::{escape_filter_value, hex_escape, unescape_filter_value};
use ldap_dn_converter::identifier::{
    encode_guid_to_bytes, encode_sid_to_bytes, guid_from_bytes, sid_from_bytes,
};
use ldap_dn_converter::{
    classify, dn, AttributeConverter, Config, ConvertValueToDn, Identifier, LdapDirectory,
    SearchFilter,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// dn_convert_tool - convert between DNs and friendly attribute values
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a name, DN, GUID or SID to a DN by searching the directory
    Resolve {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Logical attribute whose options are used
        #[arg(short, long)]
        attribute: String,
        value: String,
    },
    /// Print the search filter `resolve` would send
    Filter {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Logical attribute whose options are used
        #[arg(short, long)]
        attribute: String,
        value: String,
    },
    /// Print the unescaped value of the first RDN of a DN
    Name { dn: String },
    /// Print which identifier form a value is recognized as
    Classify { value: String },
    /// Hex-escape text for use in a search filter
    Escape { text: String },
    /// Encode a GUID as an escaped objectGUID filter value
    EncodeGuid { guid: String },
    /// Encode a SID as an escaped objectSid filter value
    EncodeSid { sid: String },
    /// Decode an objectGUID value (plain or `\xx` escaped hex)
    DecodeGuid { hex: String },
    /// Decode an objectSid value (plain or `\xx` escaped hex)
    DecodeSid { hex: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dn_convert_tool=info".parse()?),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Resolve {
            config,
            attribute,
            value,
        } => resolve(&config, &attribute, &value),
        Command::Filter {
            config,
            attribute,
            value,
        } => print_filter(&config, &attribute, &value),
        Command::Name { dn } => {
            println!("{}", dn::first_rdn_value(&dn)?);
            Ok(())
        }
        Command::Classify { value } => {
            match classify(&value) {
                Identifier::ObjectGuid { bytes, .. } => println!("guid {}", hex_escape(&bytes)),
                Identifier::ObjectSid { bytes, .. } => println!("sid {}", hex_escape(&bytes)),
                identifier => println!("{}", identifier.kind()),
            }
            Ok(())
        }
        Command::Escape { text } => {
            println!("{}", escape_filter_value(&text));
            Ok(())
        }
        Command::EncodeGuid { guid } => {
            println!("{}", hex_escape(&encode_guid_to_bytes(&guid)?));
            Ok(())
        }
        Command::EncodeSid { sid } => {
            println!("{}", hex_escape(&encode_sid_to_bytes(&sid)?));
            Ok(())
        }
        Command::DecodeGuid { hex } => {
            println!("{}", guid_from_bytes(&decode_hex(&hex)?)?);
            Ok(())
        }
        Command::DecodeSid { hex } => {
            println!("{}", sid_from_bytes(&decode_hex(&hex)?)?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from(path).with_context(|| format!("failed to load config: {:?}", path))
}

fn resolve(config_path: &Path, attribute: &str, value: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let ldap = config.ldap()?.clone();
    let password = config
        .load_ldap_password()
        .with_context(|| format!("failed to read bind password: {}", ldap.bind_password_file))?;

    debug!(server = %ldap.server, directory_type = ldap.directory_type.as_str(), "connecting");

    let converter = ConvertValueToDn::new(
        LdapDirectory::new(ldap, password),
        attribute,
        config.attributes.clone(),
    )
    .with_identifier_attributes(config.identifier_attributes());

    let dn = converter
        .to_ldap(value)
        .with_context(|| format!("failed to resolve '{}' for attribute '{}'", value, attribute))?;
    println!("{}", dn);
    Ok(())
}

fn print_filter(config_path: &Path, attribute: &str, value: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(options) = config.attributes.get(attribute) else {
        bail!("no options configured for attribute '{}'", attribute);
    };
    if value.trim().is_empty() {
        bail!("value cannot be empty");
    }

    let identifiers = config.identifier_attributes();
    let filter = SearchFilter::for_identifier(&classify(value), options, &identifiers)?;
    println!("{}", filter);
    Ok(())
}

/// Accept `d31c13a1...` as well as `\d3\1c\13\a1...`
fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    if input.contains('\\') {
        Ok(unescape_filter_value(input)?)
    } else {
        let input = input.strip_prefix("0x").unwrap_or(input);
        hex::decode(input).context("invalid hex")
    }
}
