use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::DefaultHasher;
use crate::probe::{Direction, Located, Probing};
use crate::slot::{Layout, SlotBuffer, MAX_SLOTS};
use crate::traits::KeyHasher;
use arrayvec::ArrayVec;

/// Longest key or value a slot can describe with its one length byte.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Owned copy of a key or value taken out of the map.
pub type Bytes = ArrayVec<u8, MAX_FIELD_LEN>;

fn copied(bytes: &[u8]) -> Bytes {
    bytes.iter().copied().collect()
}

enum Inserted {
    Vacant,
    Replaced(Bytes),
}

/// No slot within bounds could take the entry, the buffer has to grow.
struct ProbeExhausted;

fn insert_into(
    buffer: &mut SlotBuffer,
    probing: Probing,
    key: &[u8],
    value: &[u8],
    hash: u32,
) -> std::result::Result<Inserted, ProbeExhausted> {
    let capacity = buffer.slots();
    let home = probing.home(hash, capacity);
    if buffer.is_occupied(home) && buffer.hash_tag(home) != hash {
        buffer.mark_squatted(home);
    }
    match probing.locate(buffer, key, hash, false) {
        Located::Vacant(slot) => {
            buffer.write_entry(slot, key, value, hash);
            Ok(Inserted::Vacant)
        }
        Located::Found { slot, .. } => {
            let previous = copied(buffer.value(slot));
            buffer.write_value(slot, value);
            Ok(Inserted::Replaced(previous))
        }
        Located::ChainEnd(tail) => {
            let direction = Direction::from_home(home, capacity);
            let slot = probing
                .beyond(tail, direction, capacity)
                .find(|&index| !buffer.is_occupied(index))
                .ok_or(ProbeExhausted)?;
            buffer.write_entry(slot, key, value, hash);
            buffer.write_chain_next(tail, Some(slot));
            Ok(Inserted::Vacant)
        }
        Located::Missing => Err(ProbeExhausted),
    }
}

fn grown(slots: usize) -> usize {
    match slots.checked_mul(2) {
        Some(slots) if slots <= MAX_SLOTS => slots,
        _ => panic!("the hash table overflows"),
    }
}

/// Summary of slot usage, see [`LightMap::diagnostics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diagnostics {
    pub total_slots: usize,
    pub empty_slots: usize,
    /// `empty_slots / total_slots`
    pub empty_ratio: f64,
    pub len: usize,
    /// Size of the slot buffer
    pub buffer_bytes: usize,
}

/// A hash map of bounded-length byte strings, stored in a single buffer of
/// fixed-length slots.
///
/// Collisions between different hashes are resolved by stepping through the
/// buffer with a fixed stride. Keys sharing a full 32-bit hash are linked
/// through a chain pointer stored in the slot. The map doubles its buffer
/// when the load factor is exceeded or a probe walk runs off either end.
pub struct LightMap<H = DefaultHasher> {
    buffer: SlotBuffer,
    len: usize,
    load_factor: f64,
    probing: Probing,
    hasher: H,
}

impl LightMap {
    /// Map with the default slot count, load factor and probe step.
    pub fn new(key_capacity: usize, value_capacity: usize) -> Result<Self> {
        Config::new(key_capacity, value_capacity).build()
    }

    pub fn with_capacity(key_capacity: usize, value_capacity: usize, slots: usize) -> Result<Self> {
        Config::new(key_capacity, value_capacity)
            .initial_slots(slots)
            .build()
    }
}

impl<H: KeyHasher> LightMap<H> {
    pub(crate) fn from_config(config: &Config, hasher: H) -> Self {
        Self {
            buffer: SlotBuffer::new(
                Layout::new(config.key_capacity, config.value_capacity),
                config.initial_slots,
            ),
            len: 0,
            load_factor: config.load_factor,
            probing: Probing {
                step: config.probe_step,
                policy: config.home_policy,
            },
            hasher,
        }
    }

    fn check(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let layout = self.buffer.layout();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if key.len() > layout.key_capacity() {
            return Err(Error::OversizeKey {
                len: key.len(),
                capacity: layout.key_capacity(),
            });
        }
        if value.len() > layout.value_capacity() {
            return Err(Error::OversizeValue {
                len: value.len(),
                capacity: layout.value_capacity(),
            });
        }
        Ok(())
    }

    /// Inserts or overwrites `key`, returning the value it replaced.
    ///
    /// Fails without touching the map if `key` is empty or either input is
    /// longer than its configured capacity.
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<Option<Bytes>> {
        let (key, value) = (key.as_ref(), value.as_ref());
        if let Err(error) = self.check(key, value) {
            log::debug!("rejected put: {error}");
            return Err(error);
        }
        if self.len as f64 > self.buffer.slots() as f64 * self.load_factor {
            self.rehash();
        }
        let hash = self.hasher.hash_key(key);
        loop {
            match insert_into(&mut self.buffer, self.probing, key, value, hash) {
                Ok(Inserted::Vacant) => {
                    self.len += 1;
                    return Ok(None);
                }
                Ok(Inserted::Replaced(previous)) => return Ok(Some(previous)),
                Err(ProbeExhausted) => self.rehash(),
            }
        }
    }

    /// Copies every pair into the map, stopping at the first rejected one.
    pub fn put_all<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Replays every entry into buffers of twice the slot count until one
    /// takes them all.
    fn rehash(&mut self) {
        let mut slots = self.buffer.slots();
        'grow: loop {
            slots = grown(slots);
            let mut fresh = SlotBuffer::new(self.buffer.layout(), slots);
            let mut len = 0;
            for index in 0..self.buffer.slots() {
                if !self.buffer.is_occupied(index) {
                    continue;
                }
                let (key, value) = (self.buffer.key(index), self.buffer.value(index));
                match insert_into(&mut fresh, self.probing, key, value, self.buffer.hash_tag(index)) {
                    Ok(Inserted::Vacant) => len += 1,
                    Ok(Inserted::Replaced(_)) => {}
                    Err(ProbeExhausted) => {
                        log::trace!("replay into {slots} slots exhausted a probe, growing again");
                        continue 'grow;
                    }
                }
            }
            log::trace!(
                "rehashed {len} entries from {} to {slots} slots",
                self.buffer.slots()
            );
            self.buffer = fresh;
            self.len = len;
            return;
        }
    }

    fn find(&self, key: &[u8]) -> Located {
        if key.is_empty() || key.len() > self.buffer.layout().key_capacity() {
            return Located::Missing;
        }
        let hash = self.hasher.hash_key(key);
        self.probing.locate(&self.buffer, key, hash, true)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&[u8]> {
        match self.find(key.as_ref()) {
            Located::Found { slot, .. } => Some(self.buffer.value(slot)),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        matches!(self.find(key.as_ref()), Located::Found { .. })
    }

    /// Scans every slot.
    pub fn contains_value(&self, value: impl AsRef<[u8]>) -> bool {
        let value = value.as_ref();
        self.values().any(|stored| stored == value)
    }

    /// Removes `key`, returning its value.
    ///
    /// A removed chain member is replaced by its successor, and the slot left
    /// empty is refilled by any entry whose probe path crossed it, so every
    /// remaining key stays reachable.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Bytes> {
        let Located::Found { slot, prev } = self.find(key.as_ref()) else {
            return None;
        };
        let removed = copied(self.buffer.value(slot));
        let hole = match self.buffer.chain_next(slot) {
            Some(next) => {
                self.buffer.move_entry(next, slot);
                next
            }
            None => {
                if let Some(prev) = prev {
                    self.buffer.write_chain_next(prev, None);
                }
                self.buffer.mark_empty(slot);
                slot
            }
        };
        self.backfill(hole);
        self.len -= 1;
        Some(removed)
    }

    fn backfill(&mut self, mut hole: usize) {
        while let Some(slot) = self.backfill_candidate(hole) {
            self.buffer.move_entry(slot, hole);
            hole = slot;
        }
    }

    /// Path heads can only sit behind `hole` on an unbroken run of occupied
    /// slots, so each direction is scanned up to its first empty slot.
    fn backfill_candidate(&self, hole: usize) -> Option<usize> {
        let capacity = self.buffer.slots();
        [Direction::Forward, Direction::Backward]
            .into_iter()
            .find_map(|direction| {
                self.probing
                    .beyond(hole, direction, capacity)
                    .take_while(|&slot| self.buffer.is_occupied(slot))
                    .find(|&slot| self.probing.crosses(&self.buffer, slot, hole))
            })
    }

    /// Empties every slot in place. Capacity and configuration are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots in the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.slots()
    }

    pub fn key_capacity(&self) -> usize {
        self.buffer.layout().key_capacity()
    }

    pub fn value_capacity(&self) -> usize {
        self.buffer.layout().value_capacity()
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn probe_step(&self) -> usize {
        self.probing.step
    }

    /// Bytes per slot.
    pub fn slot_len(&self) -> usize {
        self.buffer.layout().slot_len()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let total_slots = self.buffer.slots();
        let empty_slots = (0..total_slots)
            .filter(|&index| !self.buffer.is_occupied(index))
            .count();
        Diagnostics {
            total_slots,
            empty_slots,
            empty_ratio: empty_slots as f64 / total_slots as f64,
            len: self.len,
            buffer_bytes: self.buffer.byte_len(),
        }
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        (0..self.buffer.slots())
            .filter(|&index| self.buffer.is_occupied(index))
            .map(|index| (self.buffer.key(index), self.buffer.value(index)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<H: KeyHasher> std::fmt::Debug for LightMap<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::HomePolicy;
    use test_log::test;

    fn first_byte(key: &[u8]) -> u32 {
        key[0] as u32
    }

    fn fixed<const HASH: u32>(_: &[u8]) -> u32 {
        HASH
    }

    #[test]
    fn scenario_twenty_entries() -> Result<()> {
        let mut map = Config::new(8, 13).initial_slots(16).build()?;
        for i in 0..20 {
            assert_eq!(map.put(i.to_string(), format!("value{i}"))?, None);
        }
        assert!(map.capacity() > 16);
        assert_eq!(map.len(), 20);
        assert_eq!(map.get("7"), Some(&b"value7"[..]));
        for i in 0..20 {
            assert_eq!(map.get(i.to_string()), Some(format!("value{i}").as_bytes()));
        }
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        let mut map = LightMap::new(8, 8)?;
        assert!(map.is_empty());
        assert_eq!(map.put("key", "value")?, None);
        assert_eq!(map.get("key"), Some(&b"value"[..]));
        assert!(map.contains_key("key"));
        assert_eq!(map.remove("key").as_deref(), Some(&b"value"[..]));
        assert_eq!(map.get("key"), None);
        assert_eq!(map.remove("key"), None);
        assert!(map.is_empty());
        Ok(())
    }

    #[test]
    fn overwrite_returns_previous() -> Result<()> {
        let mut map = LightMap::new(8, 8)?;
        map.put("k", "v1")?;
        assert_eq!(map.put("k", "v2")?.as_deref(), Some(&b"v1"[..]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some(&b"v2"[..]));
        Ok(())
    }

    #[test]
    fn empty_value() -> Result<()> {
        let mut map = LightMap::new(4, 4)?;
        map.put("k", "")?;
        assert_eq!(map.get("k"), Some(&b""[..]));
        assert!(map.contains_value(""));
        Ok(())
    }

    #[test]
    fn oversize_rejected() -> Result<()> {
        let mut map = LightMap::new(4, 4)?;
        map.put("a", "b")?;
        assert_eq!(
            map.put("12345", "v"),
            Err(Error::OversizeKey { len: 5, capacity: 4 })
        );
        assert_eq!(
            map.put("a", "12345"),
            Err(Error::OversizeValue { len: 5, capacity: 4 })
        );
        assert_eq!(map.put("", "v"), Err(Error::EmptyKey));
        assert_eq!(map.len(), 1);
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.get("a"), Some(&b"b"[..]));
        assert_eq!(map.get("12345"), None);
        Ok(())
    }

    #[test]
    fn growth_preserves_content() -> Result<()> {
        let mut map = LightMap::new(8, 13)?;
        for i in 0..1000 {
            map.put(i.to_string(), format!("value{i}"))?;
        }
        for i in (0..1000).step_by(3) {
            map.put(i.to_string(), format!("again{i}"))?;
        }
        assert_eq!(map.len(), 1000);
        assert!(map.capacity() as f64 * map.load_factor() >= 999.0);
        for i in 0..1000 {
            let expected = if i % 3 == 0 {
                format!("again{i}")
            } else {
                format!("value{i}")
            };
            assert_eq!(map.get(i.to_string()), Some(expected.as_bytes()));
        }
        Ok(())
    }

    #[test]
    fn rehash_keeps_len() -> Result<()> {
        let mut map = LightMap::new(8, 8)?;
        for i in 0..13 {
            map.put(i.to_string(), "v")?;
        }
        let before = map.capacity();
        map.rehash();
        assert!(map.capacity() >= before * 2);
        assert_eq!(map.len(), 13);
        Ok(())
    }

    #[test]
    fn true_collisions() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(fixed::<7>)?;
        map.put("a", "1")?;
        map.put("b", "2")?;
        map.put("c", "3")?;
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a"), Some(&b"1"[..]));
        assert_eq!(map.get("b"), Some(&b"2"[..]));
        assert_eq!(map.get("c"), Some(&b"3"[..]));
        assert_eq!(map.get("d"), None);

        assert_eq!(map.remove("a").as_deref(), Some(&b"1"[..]));
        assert_eq!(map.get("a"), None);
        assert_eq!(map.get("b"), Some(&b"2"[..]));
        assert_eq!(map.get("c"), Some(&b"3"[..]));

        assert_eq!(map.remove("c").as_deref(), Some(&b"3"[..]));
        assert_eq!(map.get("b"), Some(&b"2"[..]));
        assert_eq!(map.get("c"), None);

        map.put("a", "4")?;
        assert_eq!(map.get("a"), Some(&b"4"[..]));
        assert_eq!(map.get("b"), Some(&b"2"[..]));
        assert_eq!(map.len(), 2);
        Ok(())
    }

    #[test]
    fn chain_head_removal_pulls_successor() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(fixed::<7>)?;
        map.put("a", "1")?;
        map.put("b", "2")?;
        assert_eq!(map.buffer.chain_next(7), Some(12));

        map.remove("a");
        assert_eq!(map.buffer.key(7), b"b");
        assert_eq!(map.buffer.chain_next(7), None);
        assert!(!map.buffer.is_occupied(12));
        Ok(())
    }

    #[test]
    fn chain_tail_removal_unlinks() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(fixed::<7>)?;
        map.put("a", "1")?;
        map.put("b", "2")?;
        map.remove("b");
        assert_eq!(map.buffer.chain_next(7), None);
        assert_eq!(map.get("a"), Some(&b"1"[..]));
        map.put("c", "3")?;
        assert_eq!(map.buffer.chain_next(7), Some(12));
        assert_eq!(map.get("c"), Some(&b"3"[..]));
        Ok(())
    }

    #[test]
    fn chain_link_to_slot_zero() -> Result<()> {
        // home 10 lies in the back half, the chain walks 10 -> 5 -> 0
        let mut map = Config::new(8, 8).build_with_hasher(fixed::<10>)?;
        map.put("a", "1")?;
        map.put("b", "2")?;
        map.put("c", "3")?;
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.buffer.chain_next(10), Some(5));
        assert_eq!(map.buffer.chain_next(5), Some(0));
        assert_eq!(map.buffer.chain_next(0), None);
        assert_eq!(map.get("c"), Some(&b"3"[..]));
        Ok(())
    }

    #[test]
    fn repeated_growth_for_long_chains() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(fixed::<0>)?;
        for i in 0..10 {
            map.put(i.to_string(), "v")?;
        }
        // the chain occupies 0, 5, 10, .., 45
        assert_eq!(map.capacity(), 64);
        assert_eq!(map.len(), 10);
        for i in 0..10 {
            assert!(map.contains_key(i.to_string()));
        }
        Ok(())
    }

    #[test]
    fn negative_lookup_stops_at_home() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(first_byte)?;
        map.put([3, b'x'], "v")?;

        // home 4 is empty
        map.buffer.reset_visits();
        assert_eq!(map.get([4u8]), None);
        assert_eq!(map.buffer.visits(), 1);

        // hash 19 homes at 3, which holds hash 3 and was never squatted
        map.buffer.reset_visits();
        assert_eq!(map.get([19, b'y']), None);
        assert_eq!(map.buffer.visits(), 1);

        map.put([19, b'y'], "w")?;
        assert!(map.buffer.is_squatted(3));
        map.buffer.reset_visits();
        assert_eq!(map.get([19, b'z']), None);
        assert_eq!(map.buffer.visits(), 2);
        assert_eq!(map.get([19, b'y']), Some(&b"w"[..]));
        Ok(())
    }

    #[test]
    fn removal_backfills_probe_path() -> Result<()> {
        let mut map = Config::new(8, 8).build_with_hasher(first_byte)?;
        // all three home at 3, walking 3 -> 8 -> 13
        map.put([3u8], "a")?;
        map.put([19u8], "b")?;
        map.put([35u8], "c")?;
        assert_eq!(map.buffer.key(13), [35u8]);

        assert_eq!(map.remove([19u8]).as_deref(), Some(&b"b"[..]));
        assert_eq!(map.buffer.key(8), [35u8]);
        assert!(!map.buffer.is_occupied(13));
        assert_eq!(map.get([35u8]), Some(&b"c"[..]));
        assert_eq!(map.get([3u8]), Some(&b"a"[..]));

        map.remove([3u8]);
        assert_eq!(map.get([35u8]), Some(&b"c"[..]));
        assert_eq!(map.len(), 1);
        Ok(())
    }

    #[test]
    fn clear_in_place() -> Result<()> {
        let mut map = LightMap::new(8, 13)?;
        for i in 0..20 {
            map.put(i.to_string(), format!("value{i}"))?;
        }
        let capacity = map.capacity();
        map.clear();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        for i in 0..20 {
            assert_eq!(map.get(i.to_string()), None);
        }
        assert_eq!(map.iter().count(), 0);
        map.put("1", "again")?;
        assert_eq!(map.get("1"), Some(&b"again"[..]));
        Ok(())
    }

    #[test]
    fn diagnostics_count_empty_slots() -> Result<()> {
        let mut map = LightMap::new(8, 13)?;
        let fresh = map.diagnostics();
        assert_eq!(fresh.total_slots, 16);
        assert_eq!(fresh.empty_slots, 16);
        assert_eq!(fresh.empty_ratio, 1.0);
        assert_eq!(fresh.buffer_bytes, 16 * map.slot_len());

        map.put_all([("a", "1"), ("b", "2"), ("c", "3")])?;
        let used = map.diagnostics();
        assert_eq!(used.empty_slots, used.total_slots - 3);
        assert_eq!(used.len, 3);
        Ok(())
    }

    #[test]
    fn put_all_stops_at_rejection() -> Result<()> {
        let mut map = LightMap::new(2, 2)?;
        let result = map.put_all([("a", "1"), ("bbb", "2"), ("c", "3")]);
        assert!(matches!(result, Err(Error::OversizeKey { .. })));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("c"));
        Ok(())
    }

    #[test]
    fn views_scan_occupied_slots() -> Result<()> {
        let mut map = LightMap::new(8, 8)?;
        map.put_all([("x", "1"), ("y", "2"), ("z", "3")])?;
        let mut keys = map.keys().map(<[u8]>::to_vec).collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, [b"x".to_vec(), b"y".to_vec(), b"z".to_vec()]);
        let mut values = map.values().map(<[u8]>::to_vec).collect::<Vec<_>>();
        values.sort();
        assert_eq!(values, [b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        assert!(map.contains_value("2"));
        assert!(!map.contains_value("4"));
        let debug = format!("{map:?}");
        assert!(debug.starts_with('{') && debug.ends_with('}'));
        assert_eq!(debug.matches(':').count(), 3);
        Ok(())
    }

    #[test]
    fn legacy_home_policy() -> Result<()> {
        let mut map = Config::new(8, 13)
            .home_policy(HomePolicy::Legacy)
            .build()?;
        for i in 0..500 {
            map.put(i.to_string(), format!("value{i}"))?;
        }
        for i in 0..500 {
            assert_eq!(map.get(i.to_string()), Some(format!("value{i}").as_bytes()));
        }
        Ok(())
    }
}
