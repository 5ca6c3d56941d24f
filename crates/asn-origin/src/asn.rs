use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// An autonomous system number.
///
/// Parsed from `AS24203`, `as24203` or plain `24203` and always displayed
/// in the `AS24203` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Asn(u32);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0:?} is not a valid ASN; expected something like AS24203")]
pub struct InvalidAsn(pub String);

impl Asn {
    pub fn new(number: u32) -> Self {
        Self(number)
    }
}

impl FromStr for Asn {
    type Err = InvalidAsn;

    fn from_str(s: &str) -> Result<Self, InvalidAsn> {
        let trimmed = s.trim();
        let digits = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("as") => &trimmed[2..],
            _ => trimmed,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidAsn(s.to_string()));
        }
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| InvalidAsn(s.to_string()))
    }
}

impl Display for Asn {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "AS{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        for input in ["AS24203", "as24203", "24203", " As24203 "] {
            let asn: Asn = input.parse().unwrap();
            assert_eq!(asn, Asn::new(24203), "{input}");
            assert_eq!(asn.to_string(), "AS24203");
        }
        assert_eq!("AS4294967295".parse::<Asn>().unwrap(), Asn::new(u32::MAX));
    }

    #[test]
    fn parse_invalid() {
        for input in ["", "AS", "ASX", "AS-1", "AS12a", "AS4294967296", "ASN24203"] {
            assert!(input.parse::<Asn>().is_err(), "{input}");
        }
        k9::assert_equal!(
            "ASX".parse::<Asn>().unwrap_err().to_string(),
            "\"ASX\" is not a valid ASN; expected something like AS24203"
        );
    }
}
