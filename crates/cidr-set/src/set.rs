// The prefix tree used here follows the radix tree layout of
// rust-bitstring-trees, Copyright (c) 2017 Stefan Bühler, used under the
// terms of its MIT License. It is specialized to IPv4 keys held as u32 and
// to set semantics, so sibling prefixes are always merged.
use cidr::{InetAddressIterator, Ipv4Cidr};
use std::fmt::Debug;
use std::net::Ipv4Addr;

/// A network prefix with all host bits clear
#[derive(Clone, Copy, PartialEq, Eq)]
struct Prefix {
    bits: u32,
    len: u8,
}

impl Prefix {
    fn new(bits: u32, len: u8) -> Self {
        Self {
            bits: bits & Self::mask(len),
            len,
        }
    }

    fn mask(len: u8) -> u32 {
        if len == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(len))
        }
    }

    /// The bit that follows the first `index` bits; `index` must be < 32
    fn bit(&self, index: u8) -> bool {
        (self.bits >> (31 - u32::from(index))) & 1 == 1
    }

    fn shared_prefix_len(&self, other: &Prefix) -> u8 {
        let common = (self.bits ^ other.bits).leading_zeros() as u8;
        common.min(self.len).min(other.len)
    }

    fn clip(&self, len: u8) -> Self {
        Self::new(self.bits, len.min(self.len))
    }

    fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.len))
    }

    fn to_cidr(self) -> Ipv4Cidr {
        Ipv4Cidr::new(Ipv4Addr::from(self.bits), self.len)
            .expect("prefix host bits are always clear")
    }
}

impl From<&Ipv4Cidr> for Prefix {
    fn from(cidr: &Ipv4Cidr) -> Self {
        Self::new(u32::from(cidr.first_address()), cidr.network_length())
    }
}

#[derive(Clone)]
enum Node {
    Leaf(Prefix),
    Inner {
        prefix: Prefix,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn prefix(&self) -> &Prefix {
        match self {
            Node::Leaf(prefix) => prefix,
            Node::Inner { prefix, .. } => prefix,
        }
    }

    /// Joins two subtrees that first differ at bit `shared_len`
    fn join(shared_len: u8, a: Node, b: Node) -> Node {
        let prefix = a.prefix().clip(shared_len);
        let (left, right) = if a.prefix().bit(shared_len) {
            (b, a)
        } else {
            (a, b)
        };
        Node::Inner {
            prefix,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn insert(&mut self, key: Prefix) {
        let own = *self.prefix();
        let shared_len = own.shared_prefix_len(&key);

        if shared_len == key.len {
            // key equals or covers this whole subtree
            *self = Node::Leaf(key);
        } else if shared_len < own.len {
            // two sibling halves make up their parent
            if let Node::Leaf(_) = self {
                if own.len == shared_len + 1 && key.len == shared_len + 1 {
                    *self = Node::Leaf(own.clip(shared_len));
                    return;
                }
            }
            let existing = std::mem::replace(self, Node::Leaf(own));
            *self = Node::join(shared_len, existing, Node::Leaf(key));
        } else {
            match self {
                // already covered
                Node::Leaf(_) => return,
                Node::Inner { left, right, .. } => {
                    if key.bit(own.len) {
                        right.insert(key);
                    } else {
                        left.insert(key);
                    }
                }
            }
            self.compress();
        }
    }

    /// Collapse an inner node whose children are exactly its two halves
    fn compress(&mut self) {
        let merged = match self {
            Node::Inner {
                prefix,
                left,
                right,
            } => match (left.as_ref(), right.as_ref()) {
                (Node::Leaf(l), Node::Leaf(r))
                    if l.len == prefix.len + 1 && r.len == prefix.len + 1 =>
                {
                    Some(*prefix)
                }
                _ => None,
            },
            Node::Leaf(_) => None,
        };
        if let Some(prefix) = merged {
            *self = Node::Leaf(prefix);
        }
    }
}

/// A set of IPv4 networks.
///
/// Networks covered by a broader member are absorbed into it and two
/// adjacent halves of the same parent are merged into that parent, so the
/// members are always disjoint and as coarse as possible.
#[derive(Clone, Default)]
pub struct CidrSet {
    root: Option<Node>,
}

impl CidrSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cidr: &Ipv4Cidr) {
        let key = Prefix::from(cidr);
        match &mut self.root {
            None => self.root = Some(Node::Leaf(key)),
            Some(node) => node.insert(key),
        }
    }

    /// Number of distinct addresses covered by the set
    pub fn address_count(&self) -> u64 {
        self.leaves().map(|prefix| prefix.size()).sum()
    }

    /// Iterate the member networks in ascending address order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.root.iter().collect(),
        }
    }

    /// Iterate every covered address in ascending order.
    ///
    /// Addresses are produced lazily, one member network at a time.
    pub fn addresses(&self) -> Addresses<'_> {
        Addresses {
            leaves: self.leaves(),
            current: None,
            remaining: self.address_count(),
        }
    }

    fn leaves(&self) -> LeafIter<'_> {
        LeafIter {
            stack: self.root.iter().collect(),
        }
    }
}

struct LeafIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = Prefix;

    fn next(&mut self) -> Option<Prefix> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf(prefix) => return Some(*prefix),
                Node::Inner { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}

/// Iterates the networks of a `CidrSet` in ascending order
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Ipv4Cidr;

    fn next(&mut self) -> Option<Ipv4Cidr> {
        let mut leaves = LeafIter {
            stack: std::mem::take(&mut self.stack),
        };
        let next = leaves.next();
        self.stack = leaves.stack;
        next.map(Prefix::to_cidr)
    }
}

/// Iterates the addresses of a `CidrSet` in ascending order
pub struct Addresses<'a> {
    leaves: LeafIter<'a>,
    current: Option<InetAddressIterator<Ipv4Addr>>,
    remaining: u64,
}

impl<'a> Iterator for Addresses<'a> {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        loop {
            if let Some(addr) = self.current.as_mut().and_then(|iter| iter.next()) {
                self.remaining -= 1;
                return Some(addr);
            }
            self.current = Some(self.leaves.next()?.to_cidr().iter().addresses());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<'a> ExactSizeIterator for Addresses<'a> {}

impl Debug for CidrSet {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_list()
            .entries(self.iter().map(|cidr| crate::format_cidr(&cidr)))
            .finish()
    }
}

impl FromIterator<Ipv4Cidr> for CidrSet {
    fn from_iter<I: IntoIterator<Item = Ipv4Cidr>>(iter: I) -> Self {
        let mut set = CidrSet::new();
        for cidr in iter {
            set.insert(&cidr);
        }
        set
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{format_cidr, parse_ipv4_cidr};

    fn make_set(entries: &[&str]) -> CidrSet {
        entries
            .iter()
            .map(|s| parse_ipv4_cidr(s).unwrap())
            .collect()
    }

    fn members(set: &CidrSet) -> Vec<String> {
        set.iter().map(|cidr| format_cidr(&cidr)).collect()
    }

    #[test]
    fn empty() {
        let set = CidrSet::new();
        assert_eq!(set.iter().count(), 0);
        assert_eq!(set.address_count(), 0);
        assert_eq!(set.addresses().len(), 0);
        assert_eq!(set.addresses().next(), None);
    }

    #[test]
    fn covered_entries_are_absorbed() {
        let set = make_set(&[
            "192.168.1.24/32",
            "192.168.1.0/24",
            // This entry is overlapped by the preceding entry
            "192.168.1.128/26",
            "10.0.7.0/24",
            "10.0.3.0/24",
        ]);
        k9::assert_equal!(
            members(&set),
            vec!["10.0.3.0/24", "10.0.7.0/24", "192.168.1.0/24"]
        );
        assert_eq!(set.address_count(), 768);
    }

    #[test]
    fn siblings_merge() {
        let set = make_set(&["10.0.0.128/25", "10.0.0.0/25"]);
        k9::assert_equal!(members(&set), vec!["10.0.0.0/24"]);

        // merging cascades up through several levels
        let set = make_set(&[
            "10.0.0.0/26",
            "10.0.0.192/26",
            "10.0.0.64/26",
            "10.0.1.0/24",
            "10.0.0.128/26",
        ]);
        k9::assert_equal!(members(&set), vec!["10.0.0.0/23"]);
    }

    #[test]
    fn adjacent_but_not_siblings() {
        // 10.0.1.0/24 and 10.0.2.0/24 are adjacent but do not form a /23
        let set = make_set(&["10.0.2.0/24", "10.0.1.0/24"]);
        k9::assert_equal!(members(&set), vec!["10.0.1.0/24", "10.0.2.0/24"]);
    }

    #[test]
    fn addresses_are_ordered_and_distinct() {
        let set = make_set(&["10.0.0.8/31", "10.0.0.0/30", "10.0.0.2/31"]);
        let mut iter = set.addresses();
        assert_eq!(iter.len(), 6);
        iter.next();
        assert_eq!(iter.len(), 5);

        let addrs: Vec<String> = set.addresses().map(|a| a.to_string()).collect();
        k9::assert_equal!(
            addrs,
            vec!["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.8", "10.0.0.9"]
        );
    }

    #[test]
    fn whole_space() {
        let set = make_set(&["1.2.3.0/24", "0.0.0.0/0"]);
        k9::assert_equal!(members(&set), vec!["0.0.0.0/0"]);
        assert_eq!(set.address_count(), 1u64 << 32);
        assert_eq!(set.addresses().next(), Some(Ipv4Addr::new(0, 0, 0, 0)));
    }

    #[test]
    fn debug_lists_members() {
        let set = make_set(&["10.0.0.1"]);
        assert_eq!(format!("{set:?}"), r#"["10.0.0.1/32"]"#);
    }
}
