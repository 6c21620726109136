//! Optional token allowlist that narrows which records are in scope.
//!
//! The raw input is a comma-separated address list. It is parsed on first
//! use and the result is frozen for the lifetime of the value. Malformed
//! entries are dropped; if nothing valid remains, the allowlist is absent
//! and every address is allowed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use alloy::primitives::Address;
use serde::{Serialize, Serializer};

/// Length of a `0x`-prefixed hex address.
const ADDRESS_LEN: usize = 42;

/// A lazily parsed, memoized set of allowed token addresses.
#[derive(Clone, Default)]
pub struct ContentAllowlist {
    raw: Option<String>,
    parsed: OnceLock<Option<BTreeSet<Address>>>,
}

impl ContentAllowlist {
    /// Wrap raw input without parsing it.
    #[must_use]
    pub fn new(raw: Option<String>) -> Self {
        Self {
            raw,
            parsed: OnceLock::new(),
        }
    }

    /// An allowlist that allows everything.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Force parsing now. Call once before sharing the value across
    /// workers so no worker pays for the first parse.
    pub fn initialize(&self) {
        let _ = self.entries();
    }

    /// The parsed entries, or `None` when no allowlist is in effect.
    pub fn entries(&self) -> Option<&BTreeSet<Address>> {
        self.parsed
            .get_or_init(|| parse(self.raw.as_deref()))
            .as_ref()
    }

    /// Returns `true` if an allowlist restricts the dataset.
    pub fn is_restricted(&self) -> bool {
        self.entries().is_some()
    }

    /// Returns `true` if `candidate` is in scope. Case-insensitive.
    ///
    /// A malformed candidate is only allowed when no allowlist is in effect.
    pub fn is_allowed(&self, candidate: &str) -> bool {
        match self.entries() {
            None => true,
            Some(set) => parse_entry(candidate).is_some_and(|a| set.contains(&a)),
        }
    }

    /// Typed variant of [`Self::is_allowed`].
    pub fn is_address_allowed(&self, address: Address) -> bool {
        self.entries().is_none_or(|set| set.contains(&address))
    }
}

impl fmt::Debug for ContentAllowlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ContentAllowlist");
        match self.parsed.get() {
            None => s.field("state", &"unparsed"),
            Some(None) => s.field("state", &"open"),
            Some(Some(set)) => s.field("entries", &set.len()),
        }
        .finish()
    }
}

impl Serialize for ContentAllowlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            restricted: bool,
            entries: Vec<&'a Address>,
        }
        let entries = self.entries();
        View {
            restricted: entries.is_some(),
            entries: entries.map(|set| set.iter().collect()).unwrap_or_default(),
        }
        .serialize(serializer)
    }
}

/// Parse one entry: `0x` prefix, 42 characters, valid hex.
fn parse_entry(s: &str) -> Option<Address> {
    let s = s.trim().to_ascii_lowercase();
    if s.len() != ADDRESS_LEN || !s.starts_with("0x") {
        return None;
    }
    s.parse().ok()
}

fn parse(raw: Option<&str>) -> Option<BTreeSet<Address>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let mut set = BTreeSet::new();
    for item in raw.split(',') {
        match parse_entry(item) {
            Some(address) => {
                set.insert(address);
            }
            None if item.trim().is_empty() => {}
            None => tracing::debug!(entry = item.trim(), "ignoring malformed allowlist entry"),
        }
    }

    if set.is_empty() {
        tracing::info!("allowlist has no valid entries, not restricting");
        return None;
    }
    tracing::info!(entries = set.len(), "allowlist in effect");
    Some(set)
}
