use anyhow::Context;
use asn_origin::WhoisClient;
use clap::Parser;
use ipscrape::config::{parse_target, DEFAULT_MAX_ADDRESSES};
use ipscrape::logging::{DiagnosticFormat, LoggingConfig};
use ipscrape::{normalize, CleanerCommand, Config, Pipeline, TerminalProgress, UsageError};
use std::path::PathBuf;
use std::time::Duration;

const USAGE: &str = "Usage: ipscrape --ip 192.xx --asn ASxx";

/// Expand an autonomous system into every IPv4 address it originates.
///
/// The route list, the cleaned block list and the sorted address list
/// are written to the storage directory, named after the ASN.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Opt {
    /// Increase output verbosity; progress lines are no longer
    /// overwritten in place
    #[arg(long)]
    verbose: bool,

    /// Seed IPv4 address for the whois context, eg: --ip 112.215.101.72
    #[arg(long)]
    ip: Option<String>,

    /// The autonomous system to expand, eg: --asn AS24203
    #[arg(long)]
    asn: Option<String>,

    /// Directory that receives the output files.
    /// You may set IPSCRAPE_STORAGE in the environment to specify
    /// this without explicitly using --storage-dir.
    /// If not specified, ./storage will be assumed.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// host:port of the whois server to query.
    /// You may set IPSCRAPE_WHOIS_SERVER in the environment instead.
    /// If not specified, whois.radb.net:43 will be assumed.
    #[arg(long)]
    whois_server: Option<String>,

    /// Give up connecting to the whois server after this many seconds.
    /// By default there is no limit.
    #[arg(long)]
    whois_connect_timeout_seconds: Option<u64>,

    /// Program used to clean up the CIDR list. It receives the list on
    /// stdin and must print the cleaned list to stdout, one block per
    /// line. Without it, blocks are aggregated in-process.
    #[arg(long)]
    cleaner: Option<PathBuf>,

    /// Argument to pass to the cleaner program; may be repeated
    #[arg(long = "cleaner-arg", allow_hyphen_values = true)]
    cleaner_args: Vec<String>,

    /// Refuse to expand more than this many addresses
    #[arg(long, default_value_t = DEFAULT_MAX_ADDRESSES)]
    max_addresses: u64,

    /// Format of the diagnostic log written to stderr.
    /// The IPSCRAPE_LOG environment variable controls the filter.
    #[arg(long, value_enum, default_value = "compact")]
    diag_format: DiagnosticFormat,
}

impl Opt {
    fn into_config(self) -> Result<Config, UsageError> {
        let (seed_ip, asn) = parse_target(self.ip.as_deref(), self.asn.as_deref())?;

        let storage_dir = self
            .storage_dir
            .or_else(|| std::env::var_os("IPSCRAPE_STORAGE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("storage"));

        let mut config = Config::new(asn, seed_ip, &storage_dir);
        config.verbose = self.verbose;
        config.max_addresses = self.max_addresses;
        config.whois_connect_timeout = self.whois_connect_timeout_seconds.map(Duration::from_secs);
        if let Some(server) = self
            .whois_server
            .or_else(|| std::env::var("IPSCRAPE_WHOIS_SERVER").ok())
        {
            config.whois_server = server;
        }
        config.cleaner = self.cleaner.map(|program| CleanerCommand {
            program,
            args: self.cleaner_args,
        });

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opts = Opt::parse();

    LoggingConfig {
        filter_env_var: "IPSCRAPE_LOG",
        default_filter: "ipscrape=info,asn_origin=info",
        diag_format: opts.diag_format,
    }
    .init()?;

    let config = match opts.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{USAGE}\n{err}");
            std::process::exit(1);
        }
    };

    let mut lookup = WhoisClient::new(config.whois_server.clone());
    if let Some(timeout) = config.whois_connect_timeout {
        lookup = lookup.with_connect_timeout(timeout);
    }
    let normalizer = normalize::from_config(&config);
    let progress = TerminalProgress::new(config.verbose);

    let summary = Pipeline::new(&config, &lookup, normalizer.as_ref(), &progress)
        .run()
        .await
        .with_context(|| format!("expanding {}", config.asn))?;

    tracing::info!(
        "{}: {} routes, {} blocks, {} addresses written to {}",
        config.asn,
        summary.routes,
        summary.blocks,
        summary.addresses,
        config.paths.ip.display()
    );

    Ok(())
}
