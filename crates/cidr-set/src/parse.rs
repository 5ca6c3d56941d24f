use cidr::{Ipv4Cidr, Ipv4Inet};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{input} is not a valid IPv4 CIDR: {reason}")]
    Invalid { input: String, reason: String },
    #[error("{input} is an IPv6 block; only IPv4 is supported")]
    Ipv6 { input: String },
}

/// Parses `address/prefix-length` (or a bare address, meaning `/32`)
/// into the network that contains it.
///
/// The `cidr` crate rejects blocks that have host bits set, which is a
/// little too strict for data scraped from registries: `10.0.0.2/30` is
/// accepted here and yields `10.0.0.0/30`.
pub fn parse_ipv4_cidr(s: &str) -> Result<Ipv4Cidr, ParseError> {
    let s = s.trim();
    if s.contains(':') {
        return Err(ParseError::Ipv6 {
            input: s.to_string(),
        });
    }

    if !s.contains('/') {
        let addr = s.parse::<Ipv4Addr>().map_err(|err| ParseError::Invalid {
            input: s.to_string(),
            reason: format!("{err}"),
        })?;
        return Ok(Ipv4Cidr::new_host(addr));
    }

    let inet = s.parse::<Ipv4Inet>().map_err(|err| ParseError::Invalid {
        input: s.to_string(),
        reason: format!("{err}"),
    })?;
    Ok(inet.network())
}

/// Renders a block as `a.b.c.d/len`, including for `/32`, which the
/// `Display` impl of `Ipv4Cidr` would print as a bare address.
pub fn format_cidr(cidr: &Ipv4Cidr) -> String {
    format!("{}/{}", cidr.first_address(), cidr.network_length())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_network() {
        let cidr = parse_ipv4_cidr("10.0.0.0/30").unwrap();
        assert_eq!(cidr.first_address(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.last_address(), Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(format_cidr(&cidr), "10.0.0.0/30");
    }

    #[test]
    fn parse_clears_host_bits() {
        let cidr = parse_ipv4_cidr(" 10.0.0.2/30\n").unwrap();
        assert_eq!(format_cidr(&cidr), "10.0.0.0/30");
    }

    #[test]
    fn parse_bare_address() {
        let cidr = parse_ipv4_cidr("192.168.1.5").unwrap();
        assert_eq!(format_cidr(&cidr), "192.168.1.5/32");
    }

    #[test]
    fn parse_errors() {
        let err = parse_ipv4_cidr("10.0.0.0/abc").unwrap_err().to_string();
        assert!(
            err.starts_with("10.0.0.0/abc is not a valid IPv4 CIDR: "),
            "{err}"
        );
        assert!(parse_ipv4_cidr("10.0.0.0/33").is_err());
        assert!(parse_ipv4_cidr("300.0.0.0/8").is_err());
        assert!(parse_ipv4_cidr("").is_err());
        assert_eq!(
            parse_ipv4_cidr("2001:db8::/32").unwrap_err(),
            ParseError::Ipv6 {
                input: "2001:db8::/32".to_string()
            }
        );
    }
}
