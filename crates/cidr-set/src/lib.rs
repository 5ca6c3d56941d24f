pub use cidr::Ipv4Cidr;

mod parse;
mod set;

pub use parse::{format_cidr, parse_ipv4_cidr, ParseError};
pub use set::{Addresses, CidrSet, Iter};
