// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IPv4 network arithmetic used by the subnet allocator.
//!
//! [`Ipv4Network`] is a masked `address/prefix` pair. The allocator only needs
//! a handful of operations on it: splitting a block into equal parts, finding
//! the parent of a block, and checking containment/overlap.

use crate::errors::{ReconcileError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation, always stored with host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Network {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Network {
    /// Create a network, masking the address to the prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the prefix length exceeds 32.
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(ReconcileError::invalid_config(format!(
                "prefix length {prefix_len} exceeds 32"
            )));
        }

        Ok(Self {
            address: Ipv4Addr::from(u32::from(address) & mask(prefix_len)),
            prefix_len,
        })
    }

    /// Network address.
    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Prefix length.
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses in the block.
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    fn first(&self) -> u32 {
        u32::from(self.address)
    }

    fn last(&self) -> u32 {
        self.first() | !mask(self.prefix_len)
    }

    /// Whether `other` lies entirely within this network.
    #[must_use]
    pub fn contains(&self, other: &Ipv4Network) -> bool {
        other.prefix_len >= self.prefix_len
            && (other.first() & mask(self.prefix_len)) == self.first()
    }

    /// Whether the two networks share at least one address.
    #[must_use]
    pub fn overlaps(&self, other: &Ipv4Network) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Split the network into `parts` equally sized blocks, in address order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `parts` is not a power of two or the block is
    /// too small to be split that many times.
    pub fn split(&self, parts: usize) -> Result<Vec<Ipv4Network>> {
        if parts == 0 || !parts.is_power_of_two() {
            return Err(ReconcileError::invalid_config(format!(
                "cannot split {self} into {parts} parts: not a power of two"
            )));
        }

        let extra_bits = parts.trailing_zeros();
        let new_prefix = u32::from(self.prefix_len) + extra_bits;
        if new_prefix > 32 {
            return Err(ReconcileError::invalid_config(format!(
                "cannot split {self} into {parts} parts: block too small"
            )));
        }

        // new_prefix <= 32 was checked above
        #[allow(clippy::cast_possible_truncation)]
        let new_prefix = new_prefix as u8;
        let step = 1u64 << (32 - u32::from(new_prefix));

        (0..parts as u64)
            .map(|index| {
                // first() + index * step stays within the original block
                #[allow(clippy::cast_possible_truncation)]
                let start = (u64::from(self.first()) + index * step) as u32;
                Ipv4Network::new(Ipv4Addr::from(start), new_prefix)
            })
            .collect()
    }

    /// Split the network into its lower and upper halves.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a `/32`.
    pub fn halves(&self) -> Result<(Ipv4Network, Ipv4Network)> {
        let blocks = self.split(2)?;
        Ok((blocks[0], blocks[1]))
    }

    /// The enclosing block one bit shorter than this one.
    ///
    /// For a public subnet this is the block its private sibling was carved from.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for `/0`, which has no parent.
    pub fn parent(&self) -> Result<Ipv4Network> {
        if self.prefix_len == 0 {
            return Err(ReconcileError::invalid_config(format!(
                "{self} has no parent network"
            )));
        }
        Ipv4Network::new(self.address, self.prefix_len - 1)
    }

    /// The other half of this block's parent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for `/0`.
    pub fn sibling(&self) -> Result<Ipv4Network> {
        let (lower, upper) = self.parent()?.halves()?;
        Ok(if lower == *self { upper } else { lower })
    }
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Network {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        let Some((addr_str, prefix_str)) = s.trim().split_once('/') else {
            return Err(ReconcileError::invalid_config(format!(
                "missing '/' in CIDR '{s}'"
            )));
        };

        let address = Ipv4Addr::from_str(addr_str).map_err(|_| {
            ReconcileError::invalid_config(format!("invalid IPv4 address in CIDR '{s}'"))
        })?;
        let prefix_len = prefix_str.parse::<u8>().map_err(|_| {
            ReconcileError::invalid_config(format!("invalid prefix length in CIDR '{s}'"))
        })?;

        Ipv4Network::new(address, prefix_len)
    }
}

impl Serialize for Ipv4Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "ipam_tests.rs"]
mod ipam_tests;
