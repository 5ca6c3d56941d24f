//! Expands an autonomous system into every IPv4 address it originates.
//!
//! The work happens in three sequential stages, each persisting its result
//! into the storage directory:
//!
//! 1. [resolve]: ask the routing registry for the ASN's routes,
//!    written to `<ASN>-CIDR-DIRTY.txt`
//! 2. [normalize]: clean up the block list, written to `<ASN>-CIDR.txt`
//! 3. [expand]: enumerate, deduplicate and sort the addresses,
//!    written to `<ASN>-IP.txt`
use std::path::PathBuf;
use thiserror::Error;

pub mod config;
pub mod expand;
pub mod logging;
pub mod normalize;
mod output;
pub mod pipeline;
pub mod progress;
pub mod resolve;

pub use asn_origin::LookupError;
pub use config::{CleanerCommand, Config, OutputPaths, UsageError};
pub use expand::{AddressExpander, ExpandError};
pub use normalize::{AggregateNormalizer, ExternalNormalizer, NormalizationError, Normalizer};
pub use pipeline::{Pipeline, PipelineSummary};
pub use progress::{NullProgress, ProgressSink, TerminalProgress};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
