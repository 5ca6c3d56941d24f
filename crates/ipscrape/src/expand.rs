use crate::config::DEFAULT_MAX_ADDRESSES;
use cidr_set::{parse_ipv4_cidr, CidrSet, ParseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("expanding would produce {count} addresses, more than the limit of {limit}")]
    TooManyAddresses { count: u64, limit: u64 },
}

/// Turns a list of CIDR blocks into every address they contain.
///
/// Network and broadcast addresses are included, addresses shared by
/// overlapping blocks appear once, and the result is in ascending
/// numeric order (`9.9.9.9` before `9.9.9.10`).
pub struct AddressExpander {
    max_addresses: u64,
}

impl Default for AddressExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressExpander {
    pub fn new() -> Self {
        Self {
            max_addresses: DEFAULT_MAX_ADDRESSES,
        }
    }

    pub fn with_max_addresses(mut self, max_addresses: u64) -> Self {
        self.max_addresses = max_addresses;
        self
    }

    /// All blocks are parsed before anything is expanded, so a single
    /// malformed block fails the whole expansion.
    ///
    /// The addresses are produced lazily by [CidrSet::addresses] on the
    /// returned set, which holds the blocks as disjoint networks.
    pub fn expand<S: AsRef<str>>(&self, blocks: &[S]) -> Result<CidrSet, ExpandError> {
        let set = blocks
            .iter()
            .map(|block| parse_ipv4_cidr(block.as_ref()))
            .collect::<Result<CidrSet, ParseError>>()?;

        let count = set.address_count();
        if count > self.max_addresses {
            return Err(ExpandError::TooManyAddresses {
                count,
                limit: self.max_addresses,
            });
        }

        tracing::debug!(
            "{} blocks cover {} disjoint networks and {count} addresses",
            blocks.len(),
            set.iter().count()
        );
        Ok(set)
    }
}
