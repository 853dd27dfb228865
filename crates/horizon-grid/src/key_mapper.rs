//! Stable client-facing keys for items.
//!
//! The [`KeyMapper`] assigns one [`ItemKey`] per item identity. Keys live in a
//! generational arena: a slot freed by [`KeyMapper::reclaim`] may be reused,
//! but the reused key carries a new version, so a token the client still
//! holds for the old item never resolves to the new one.
//!
//! # Release Protocol
//!
//! Items leaving the window are not dropped at once. The communicator marks
//! them with [`KeyMapper::release_deferred`] under the id of the update that
//! removed them, and frees them with [`KeyMapper::reclaim`] once the client
//! has confirmed that update. Until then the key keeps resolving, and an item
//! that re-enters the window gets its old key back.
//!
//! # Identity Contract
//!
//! The identity function must be deterministic. If it returns a different id
//! for a row that is already mapped, the mapper treats it as a new row and
//! the behavior of keys and selection for that row is undefined.

use std::collections::HashMap;
use std::fmt;

use horizon_grid_core::logging::targets;
use serde::{Serialize, Serializer};
use slotmap::{Key, KeyData, SlotMap, new_key_type};

use crate::data::{IdentityFn, Item, ItemId};

new_key_type! {
    /// An opaque key identifying one active item to the client.
    pub struct ItemKey;
}

impl ItemKey {
    /// Convert the key to a raw u64 value (slot index and version).
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create a key from a raw u64 value.
    ///
    /// This does not check whether the key is mapped.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(KeyData::from_ffi(raw))
    }

    /// The token sent to the client.
    pub fn token(self) -> String {
        self.as_raw().to_string()
    }

    /// Parses a client token. Returns `None` if it is not a number.
    pub fn from_token(token: &str) -> Option<Self> {
        token.parse::<u64>().ok().map(Self::from_raw)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

impl Serialize for ItemKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct KeyEntry<T, I> {
    id: I,
    /// Latest instance seen for this identity.
    item: T,
    /// Update id under which the key was released, if pending reclaim.
    released_at: Option<u64>,
}

/// Maps item identities to stable keys.
pub struct KeyMapper<T, I> {
    entries: SlotMap<ItemKey, KeyEntry<T, I>>,
    by_id: HashMap<I, ItemKey>,
    identity: IdentityFn<T, I>,
}

impl<T: Item, I: ItemId> KeyMapper<T, I> {
    /// Creates an empty mapper using `identity`.
    pub fn new(identity: IdentityFn<T, I>) -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_id: HashMap::new(),
            identity,
        }
    }

    /// Replaces the identity function.
    ///
    /// Existing mappings keep the ids computed by the old function; callers
    /// swapping sources retire them first with [`retire_all`](Self::retire_all).
    pub fn set_identity(&mut self, identity: IdentityFn<T, I>) {
        self.identity = identity;
    }

    /// Computes the identity of `item`.
    pub fn id_of(&self, item: &T) -> I {
        (self.identity)(item)
    }

    /// Returns the key for `item`, creating one if its identity is unmapped.
    ///
    /// The stored instance is replaced by `item`, and a pending release for
    /// the identity is cancelled.
    pub fn key_for(&mut self, item: &T) -> ItemKey {
        let id = self.id_of(item);
        if let Some(&key) = self.by_id.get(&id)
            && let Some(entry) = self.entries.get_mut(key)
        {
            entry.item = item.clone();
            if entry.released_at.take().is_some() {
                tracing::trace!(target: targets::KEYS, key = %key, "revived released key");
            }
            return key;
        }

        let key = self.entries.insert(KeyEntry {
            id: id.clone(),
            item: item.clone(),
            released_at: None,
        });
        tracing::trace!(target: targets::KEYS, key = %key, ?id, "assigned key");
        self.by_id.insert(id, key);
        key
    }

    /// Returns the item mapped to `key`, if the key is still mapped.
    pub fn item_for(&self, key: ItemKey) -> Option<&T> {
        self.entries.get(key).map(|entry| &entry.item)
    }

    /// Returns the identity mapped to `key`.
    pub fn id_for(&self, key: ItemKey) -> Option<&I> {
        self.entries.get(key).map(|entry| &entry.id)
    }

    /// Returns `true` if `key` is still mapped.
    pub fn contains_key(&self, key: ItemKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the key of `item` without creating one.
    pub fn existing_key(&self, item: &T) -> Option<ItemKey> {
        self.key_of_id(&self.id_of(item))
    }

    /// Returns the key mapped to the identity `id`.
    pub fn key_of_id(&self, id: &I) -> Option<ItemKey> {
        self.by_id.get(id).copied()
    }

    /// Replaces the stored instance for `item`'s identity.
    ///
    /// Returns the key if the identity is mapped.
    pub fn refresh(&mut self, item: &T) -> Option<ItemKey> {
        let key = self.existing_key(item)?;
        let entry = self.entries.get_mut(key)?;
        entry.item = item.clone();
        Some(key)
    }

    /// Removes the mapping for `item` immediately.
    pub fn release(&mut self, item: &T) -> bool {
        let id = self.id_of(item);
        match self.by_id.remove(&id) {
            Some(key) => self.entries.remove(key).is_some(),
            None => false,
        }
    }

    /// Removes every mapping immediately.
    pub fn release_all(&mut self) {
        self.entries.clear();
        self.by_id.clear();
    }

    /// Marks the key of `id` for reclaim once `update_id` is confirmed.
    pub fn release_deferred(&mut self, id: &I, update_id: u64) -> bool {
        let Some(entry) = self
            .by_id
            .get(id)
            .and_then(|&key| self.entries.get_mut(key))
        else {
            return false;
        };
        entry.released_at = Some(update_id);
        true
    }

    /// Defers every key under `update_id` and forgets all identities.
    ///
    /// Outstanding keys keep resolving until reclaimed, but items fetched
    /// afterwards always receive fresh keys.
    pub fn retire_all(&mut self, update_id: u64) {
        for (_, entry) in self.entries.iter_mut() {
            entry.released_at.get_or_insert(update_id);
        }
        self.by_id.clear();
    }

    /// Frees every key released under an update id up to `confirmed`.
    ///
    /// Returns the number of freed keys.
    pub fn reclaim(&mut self, confirmed: u64) -> usize {
        let by_id = &mut self.by_id;
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let expired = entry.released_at.is_some_and(|update| update <= confirmed);
            if expired && by_id.get(&entry.id) == Some(&key) {
                by_id.remove(&entry.id);
            }
            !expired
        });
        let freed = before - self.entries.len();
        if freed > 0 {
            tracing::debug!(target: targets::KEYS, freed, confirmed, "reclaimed keys");
        }
        freed
    }

    /// Number of keys not pending release.
    pub fn active_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.released_at.is_none())
            .count()
    }

    /// Number of keys waiting for reclaim.
    pub fn pending_release_count(&self) -> usize {
        self.entries.len() - self.active_count()
    }
}
