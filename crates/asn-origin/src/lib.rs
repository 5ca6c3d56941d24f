//! Resolves the network blocks an autonomous system originates by asking
//! an Internet Routing Registry over the whois protocol.
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

mod asn;
mod rpsl;
mod whois;

pub use asn::{Asn, InvalidAsn};
pub use rpsl::{parse_origin_response, OriginRoute, RouteFamily};
pub use whois::{WhoisClient, DEFAULT_WHOIS_SERVER};

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("failed to connect to whois server {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {timeout:?} connecting to whois server {server}")]
    ConnectTimeout { server: String, timeout: Duration },
    #[error("error talking to whois server {server}: {source}")]
    Io {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("whois server returned an error: {message}")]
    Server { message: String },
    #[error("registry returned malformed route {route:?}: {source}")]
    Malformed {
        route: String,
        #[source]
        source: cidr_set::ParseError,
    },
}

/// Something that can list the routes originated by an ASN.
///
/// `seed_ip` identifies the registry context the caller is interested in;
/// implementations that query a global registry may ignore it.
#[async_trait]
pub trait OriginLookup: Send + Sync {
    async fn origin_routes(
        &self,
        asn: Asn,
        seed_ip: Ipv4Addr,
    ) -> Result<Vec<OriginRoute>, LookupError>;
}
