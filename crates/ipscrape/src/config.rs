use asn_origin::{Asn, InvalidAsn};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the number of addresses a single run may expand to.
/// Everything short of the whole address space (`0.0.0.0/0`) is allowed.
pub const DEFAULT_MAX_ADDRESSES: u64 = u32::MAX as u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("--{0} is required")]
    MissingArgument(&'static str),
    #[error("{input:?} is not a valid IPv4 address: {reason}")]
    InvalidIp { input: String, reason: String },
    #[error(transparent)]
    InvalidAsn(#[from] InvalidAsn),
}

/// Validates the two mandatory inputs of a run
pub fn parse_target(ip: Option<&str>, asn: Option<&str>) -> Result<(Ipv4Addr, Asn), UsageError> {
    let ip = ip.ok_or(UsageError::MissingArgument("ip"))?;
    let asn = asn.ok_or(UsageError::MissingArgument("asn"))?;

    let seed_ip = ip.trim().parse::<Ipv4Addr>().map_err(|err| UsageError::InvalidIp {
        input: ip.to_string(),
        reason: format!("{err}"),
    })?;
    let asn = asn.parse::<Asn>()?;

    Ok((seed_ip, asn))
}

/// The files produced by a run, all named after the ASN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub storage_dir: PathBuf,
    /// Routes exactly as the registry returned them
    pub dirty_cidr: PathBuf,
    /// Scratch input handed to the normalizer
    pub cache: PathBuf,
    pub cidr: PathBuf,
    pub ip: PathBuf,
}

impl OutputPaths {
    pub fn new(storage_dir: &Path, asn: Asn) -> Self {
        Self {
            storage_dir: storage_dir.to_path_buf(),
            dirty_cidr: storage_dir.join(format!("{asn}-CIDR-DIRTY.txt")),
            cache: storage_dir.join(".cache"),
            cidr: storage_dir.join(format!("{asn}-CIDR.txt")),
            ip: storage_dir.join(format!("{asn}-IP.txt")),
        }
    }
}

/// An external program that reads CIDR lines on stdin and writes the
/// cleaned CIDR lines to stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub asn: Asn,
    pub seed_ip: Ipv4Addr,
    /// Print every progress line instead of overwriting the previous one
    pub verbose: bool,
    pub paths: OutputPaths,
    pub whois_server: String,
    pub whois_connect_timeout: Option<Duration>,
    /// When unset, blocks are aggregated in-process
    pub cleaner: Option<CleanerCommand>,
    pub max_addresses: u64,
}

impl Config {
    /// A configuration with default settings that stores its
    /// output under `storage_dir`
    pub fn new(asn: Asn, seed_ip: Ipv4Addr, storage_dir: &Path) -> Self {
        Self {
            asn,
            seed_ip,
            verbose: false,
            paths: OutputPaths::new(storage_dir, asn),
            whois_server: asn_origin::DEFAULT_WHOIS_SERVER.to_string(),
            whois_connect_timeout: None,
            cleaner: None,
            max_addresses: DEFAULT_MAX_ADDRESSES,
        }
    }
}
