//! String-keyed table
//!
//! One table type backs the three string-keyed maps in the runtime: the
//! heap's interning set, class method tables, and instance field tables.
//! Keys are interned strings, so equality is handle identity; the stored
//! content hash only drives bucket placement, plus the one lookup that runs
//! *before* a string has an identity (`find_string`, the interning probe).
//!
//! Open addressing with linear probing and tombstones, grown at 3/4 load.
//! Callers supply the key's hash alongside the handle; the table never
//! touches the heap itself.

use tern_core::{StringHandle, Value};

/// The sdbm hash, 32-bit wrap-around.
///
/// This exact recurrence is a contract: the interning table stores these
/// hashes and `find_string` compares against them, so every producer of a
/// string hash must agree byte for byte.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in bytes {
        hash = (byte as u32)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

#[derive(Clone, Debug)]
enum Entry {
    Empty,
    /// Deleted slot; probe sequences continue through it.
    Tombstone,
    Full {
        key: StringHandle,
        hash: u32,
        value: Value,
    },
}

/// Open-addressing map from interned string to Value.
#[derive(Clone, Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    /// Full + tombstone slots; drives growth.
    used: usize,
    /// Full slots only.
    live: usize,
}

impl Table {
    pub fn new() -> Table {
        Table::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocated bucket count.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Look up `key`. `hash` must be the key's content hash.
    pub fn get(&self, key: StringHandle, hash: u32) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let mut index = hash as usize & (self.entries.len() - 1);
        loop {
            match &self.entries[index] {
                Entry::Empty => return None,
                Entry::Tombstone => {}
                Entry::Full { key: k, value, .. } => {
                    if *k == key {
                        return Some(*value);
                    }
                }
            }
            index = (index + 1) & (self.entries.len() - 1);
        }
    }

    /// Insert or overwrite. Returns true when the key was not present.
    pub fn set(&mut self, key: StringHandle, hash: u32, value: Value) -> bool {
        if (self.used + 1) * 4 > self.entries.len() * 3 {
            self.grow();
        }
        let index = self.find_slot(key, hash);
        match &self.entries[index] {
            Entry::Full { .. } => {
                self.entries[index] = Entry::Full { key, hash, value };
                false
            }
            reused => {
                // A tombstone was already counted in `used`.
                if matches!(reused, Entry::Empty) {
                    self.used += 1;
                }
                self.live += 1;
                self.entries[index] = Entry::Full { key, hash, value };
                true
            }
        }
    }

    /// Remove `key`, leaving a tombstone. Returns true when it was present.
    pub fn delete(&mut self, key: StringHandle, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let mut index = hash as usize & (self.entries.len() - 1);
        loop {
            match &self.entries[index] {
                Entry::Empty => return false,
                Entry::Tombstone => {}
                Entry::Full { key: k, .. } => {
                    if *k == key {
                        self.entries[index] = Entry::Tombstone;
                        self.live -= 1;
                        return true;
                    }
                }
            }
            index = (index + 1) & (self.entries.len() - 1);
        }
    }

    /// Content lookup for interning: find the entry whose key has exactly
    /// these bytes. `resolve` maps a key handle to its byte content; this
    /// is the only operation that compares bytes instead of handles.
    pub fn find_string<'a, F>(&self, bytes: &[u8], hash: u32, mut resolve: F) -> Option<StringHandle>
    where
        F: FnMut(StringHandle) -> &'a [u8],
    {
        if self.entries.is_empty() {
            return None;
        }
        let mut index = hash as usize & (self.entries.len() - 1);
        loop {
            match &self.entries[index] {
                Entry::Empty => return None,
                Entry::Tombstone => {}
                Entry::Full { key, hash: h, .. } => {
                    if *h == hash && resolve(*key) == bytes {
                        return Some(*key);
                    }
                }
            }
            index = (index + 1) & (self.entries.len() - 1);
        }
    }

    /// Live entries, in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (StringHandle, Value)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Full { key, value, .. } => Some((*key, *value)),
            _ => None,
        })
    }

    /// Slot where `key` lives, or the slot to insert it into (the first
    /// tombstone on the probe path, else the terminating empty slot).
    fn find_slot(&self, key: StringHandle, hash: u32) -> usize {
        let mut index = hash as usize & (self.entries.len() - 1);
        let mut tombstone = None;
        loop {
            match &self.entries[index] {
                Entry::Empty => return tombstone.unwrap_or(index),
                Entry::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Entry::Full { key: k, .. } => {
                    if *k == key {
                        return index;
                    }
                }
            }
            index = (index + 1) & (self.entries.len() - 1);
        }
    }

    /// Double the bucket array (min 8) and re-seat live entries. Tombstones
    /// are dropped here, which resets `used` to the live count.
    fn grow(&mut self) {
        let capacity = (self.entries.len() * 2).max(8);
        let old = std::mem::replace(&mut self.entries, vec![Entry::Empty; capacity]);
        self.used = self.live;
        for entry in old {
            if let Entry::Full { key, hash, value } = entry {
                let mut index = hash as usize & (capacity - 1);
                while let Entry::Full { .. } = self.entries[index] {
                    index = (index + 1) & (capacity - 1);
                }
                self.entries[index] = Entry::Full { key, hash, value };
            }
        }
    }
}
