use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::models::TrackedItem;

/// Truncated SHA-256 over an item's identity, display and classification fields.
pub type Fingerprint = u64;

pub type FingerprintSet = HashMap<String, Fingerprint>;

/// Hash each item. Activity counters never take part, so a set that only
/// accumulated time fingerprints identically.
pub fn fingerprint(items: &[TrackedItem]) -> FingerprintSet {
    items
        .iter()
        .map(|item| (item.id.clone(), fingerprint_item(item)))
        .collect()
}

pub fn fingerprint_item(item: &TrackedItem) -> Fingerprint {
    let mut hasher = Sha256::new();
    for field in [
        item.id.as_str(),
        item.title.as_str(),
        item.locator.as_str(),
        item.app_name.as_str(),
        item.category.as_str(),
    ] {
        hasher.update(field.as_bytes());
        // Separator keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update([0u8]);
    }
    hasher.update([u8::from(item.work_related)]);

    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Remembers the last fingerprint set it was shown.
#[derive(Debug, Default)]
pub struct ChangeFingerprinter {
    last_seen: Option<FingerprintSet>,
}

impl ChangeFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against the previous set and remember `new` as the baseline.
    /// The very first set counts as a change unless it is empty.
    pub fn has_changed(&mut self, new: FingerprintSet) -> bool {
        let changed = match &self.last_seen {
            Some(previous) => previous != &new,
            None => !new.is_empty(),
        };
        self.last_seen = Some(new);
        changed
    }

    pub fn observe(&mut self, items: &[TrackedItem]) -> bool {
        self.has_changed(fingerprint(items))
    }

    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}
