//! Wallet address to display-name resolution.
//!
//! Names come from two layers: a built-in table shipped with the config and
//! an override table persisted in a [`KeyValueStore`]. Overrides win. The
//! mapping is for display only and must never be used to decide who may vote.

use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::types::Address;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Store key holding the override table as a JSON object
pub const OVERRIDES_KEY: &str = "addressNameMap";

/// Faculty names of the local development accounts
pub fn default_faculty_names() -> BTreeMap<Address, String> {
    [
        ("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266", "Deployer"),
        ("0x70997970C51812dc3A010C7d01b50e0d17dc79C8", "Fakultet 1"),
        ("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC", "Fakultet 2"),
        ("0x90F79bf6EB2c4f870365E785982E1f101E93b906", "Fakultet 3"),
        ("0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65", "Fakultet 4"),
        ("0x9965507D1a55bcC2695C58ba16FB37d819B0A4dc", "Fakultet 5"),
        ("0x976EA74026E726554dB657fA54763abd0C3a0aa9", "Fakultet 6"),
    ]
    .into_iter()
    .map(|(address, name)| (address.to_string(), name.to_string()))
    .collect()
}

/// Shorten an address to its first six and last four characters
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Layered address-name table
#[derive(Debug, Clone)]
pub struct AddressBook<S> {
    builtin: BTreeMap<Address, String>,
    store: S,
}

impl<S: KeyValueStore> AddressBook<S> {
    /// Create a book over a built-in table and an override store
    pub fn new(builtin: BTreeMap<Address, String>, store: S) -> Self {
        Self { builtin, store }
    }

    /// Create a book with [`default_faculty_names`] as the built-in layer
    pub fn with_default_names(store: S) -> Self {
        Self::new(default_faculty_names(), store)
    }

    /// Display name for `address`, or its truncated form when unknown.
    ///
    /// Addresses match ignoring letter case, and an override shadows the
    /// built-in name whatever spelling either was stored under.
    pub fn resolve_name(&self, address: &str) -> String {
        let overrides = self.overrides();
        lookup(&overrides, address)
            .or_else(|| lookup(&self.builtin, address))
            .cloned()
            .unwrap_or_else(|| truncate_address(address))
    }

    /// Insert or update an override; later lookups see it immediately.
    ///
    /// An address already known under another letter case keeps that
    /// spelling, so one wallet never holds two entries.
    pub fn register_override(&mut self, address: &str, name: &str) -> Result<()> {
        let mut overrides = self.overrides();
        let key = known_key(&overrides, address)
            .or_else(|| known_key(&self.builtin, address))
            .unwrap_or_else(|| address.to_string());
        overrides.retain(|known, _| !known.eq_ignore_ascii_case(address));
        overrides.insert(key, name.to_string());
        self.store
            .set(OVERRIDES_KEY, serde_json::to_string(&overrides)?)?;

        info!("Updated display name: {} -> {}", address, name);
        Ok(())
    }

    /// Merged table, overrides taking precedence
    pub fn names(&self) -> BTreeMap<Address, String> {
        let overrides = self.overrides();
        let mut merged: BTreeMap<Address, String> = self
            .builtin
            .iter()
            .filter(|(address, _)| known_key(&overrides, address).is_none())
            .map(|(address, name)| (address.clone(), name.clone()))
            .collect();
        merged.extend(overrides);
        merged
    }

    /// The override layer alone.
    ///
    /// Unreadable or corrupt persisted state is logged and treated as empty.
    pub fn overrides(&self) -> BTreeMap<Address, String> {
        let raw = match self.store.get(OVERRIDES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read name overrides: {}", e);
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt name overrides: {}", e);
            BTreeMap::new()
        })
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Entry for `address`, exact spelling first
fn lookup<'a>(table: &'a BTreeMap<Address, String>, address: &str) -> Option<&'a String> {
    table.get(address).or_else(|| {
        table
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(address))
            .map(|(_, name)| name)
    })
}

/// Stored spelling of `address` in `table`
fn known_key(table: &BTreeMap<Address, String>, address: &str) -> Option<Address> {
    if table.contains_key(address) {
        return Some(address.to_string());
    }
    table
        .keys()
        .find(|known| known.eq_ignore_ascii_case(address))
        .cloned()
}
