#[cfg(test)]
use std::cell::Cell;

/// Raw chain pointer meaning "no next slot". The buffer is zero-filled, so
/// every fresh slot starts without a successor.
const LINK_NONE: u32 = 0;

/// Raw chain pointer standing in for index 0, which would otherwise read as
/// [`LINK_NONE`].
const LINK_ZERO: u32 = !0;

/// Largest slot count whose indices all have a chain pointer encoding.
pub(crate) const MAX_SLOTS: usize = LINK_ZERO as usize;

fn encode_link(next: Option<usize>) -> u32 {
    match next {
        None => LINK_NONE,
        Some(0) => LINK_ZERO,
        Some(index) => {
            debug_assert!(index < MAX_SLOTS);
            index as u32
        }
    }
}

fn decode_link(raw: u32) -> Option<usize> {
    match raw {
        LINK_NONE => None,
        LINK_ZERO => Some(0),
        index => Some(index as usize),
    }
}

/// Field offsets of one slot:
///
/// ```text
/// | key len | key .. | value len | value .. | squatter | hash tag (le) | chain (le) |
/// |    1    |   k    |     1     |    v     |    1     |       4       |     4      |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    key_capacity: usize,
    value_capacity: usize,
}

impl Layout {
    pub(crate) const fn new(key_capacity: usize, value_capacity: usize) -> Self {
        Self {
            key_capacity,
            value_capacity,
        }
    }
    pub(crate) const fn key_capacity(self) -> usize {
        self.key_capacity
    }
    pub(crate) const fn value_capacity(self) -> usize {
        self.value_capacity
    }
    const fn key_at(self) -> usize {
        1
    }
    const fn value_len_at(self) -> usize {
        1 + self.key_capacity
    }
    const fn value_at(self) -> usize {
        2 + self.key_capacity
    }
    const fn squatter_at(self) -> usize {
        2 + self.key_capacity + self.value_capacity
    }
    const fn hash_at(self) -> usize {
        3 + self.key_capacity + self.value_capacity
    }
    const fn chain_at(self) -> usize {
        7 + self.key_capacity + self.value_capacity
    }
    pub(crate) const fn slot_len(self) -> usize {
        11 + self.key_capacity + self.value_capacity
    }
}

/// A zero-filled byte region cut into fixed-length slots.
///
/// Nothing here checks lengths against the layout, callers validate input
/// before it reaches the buffer. A slot whose key length byte is 0 is empty
/// and every other field of it is stale.
pub(crate) struct SlotBuffer {
    layout: Layout,
    slots: usize,
    bytes: Box<[u8]>,
    #[cfg(test)]
    visits: Cell<usize>,
}

impl SlotBuffer {
    pub(crate) fn new(layout: Layout, slots: usize) -> Self {
        Self {
            layout,
            slots,
            bytes: vec![0u8; layout.slot_len() * slots].into_boxed_slice(),
            #[cfg(test)]
            visits: Cell::new(0),
        }
    }
    pub(crate) fn slots(&self) -> usize {
        self.slots
    }
    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }
    pub(crate) fn byte_len(&self) -> usize {
        self.bytes.len()
    }
    #[inline(always)]
    fn slot(&self, index: usize) -> &[u8] {
        let len = self.layout.slot_len();
        &self.bytes[index * len..(index + 1) * len]
    }
    #[inline(always)]
    fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        let len = self.layout.slot_len();
        &mut self.bytes[index * len..(index + 1) * len]
    }
    #[inline(always)]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        #[cfg(test)]
        self.visits.set(self.visits.get() + 1);
        self.slot(index)[0] != 0
    }
    pub(crate) fn key(&self, index: usize) -> &[u8] {
        let slot = self.slot(index);
        let at = self.layout.key_at();
        &slot[at..at + slot[0] as usize]
    }
    pub(crate) fn write_key(&mut self, index: usize, key: &[u8]) {
        debug_assert!(!key.is_empty() && key.len() <= self.layout.key_capacity());
        let at = self.layout.key_at();
        let slot = self.slot_mut(index);
        slot[at..at + key.len()].copy_from_slice(key);
        slot[0] = key.len() as u8;
    }
    pub(crate) fn value(&self, index: usize) -> &[u8] {
        let slot = self.slot(index);
        let len = slot[self.layout.value_len_at()] as usize;
        let at = self.layout.value_at();
        &slot[at..at + len]
    }
    pub(crate) fn write_value(&mut self, index: usize, value: &[u8]) {
        debug_assert!(value.len() <= self.layout.value_capacity());
        let (len_at, at) = (self.layout.value_len_at(), self.layout.value_at());
        let slot = self.slot_mut(index);
        slot[at..at + value.len()].copy_from_slice(value);
        slot[len_at] = value.len() as u8;
    }
    pub(crate) fn hash_tag(&self, index: usize) -> u32 {
        let at = self.layout.hash_at();
        let slot = self.slot(index);
        u32::from_le_bytes([slot[at], slot[at + 1], slot[at + 2], slot[at + 3]])
    }
    pub(crate) fn write_hash_tag(&mut self, index: usize, hash: u32) {
        let at = self.layout.hash_at();
        self.slot_mut(index)[at..at + 4].copy_from_slice(&hash.to_le_bytes());
    }
    pub(crate) fn chain_next(&self, index: usize) -> Option<usize> {
        let at = self.layout.chain_at();
        let slot = self.slot(index);
        decode_link(u32::from_le_bytes([
            slot[at],
            slot[at + 1],
            slot[at + 2],
            slot[at + 3],
        ]))
    }
    pub(crate) fn write_chain_next(&mut self, index: usize, next: Option<usize>) {
        let at = self.layout.chain_at();
        self.slot_mut(index)[at..at + 4].copy_from_slice(&encode_link(next).to_le_bytes());
    }
    pub(crate) fn is_squatted(&self, index: usize) -> bool {
        self.slot(index)[self.layout.squatter_at()] != 0
    }
    pub(crate) fn mark_squatted(&mut self, index: usize) {
        let at = self.layout.squatter_at();
        self.slot_mut(index)[at] = 1;
    }
    /// Zeroes both length bytes. The rest of the slot is left as it was.
    pub(crate) fn mark_empty(&mut self, index: usize) {
        let value_len_at = self.layout.value_len_at();
        let slot = self.slot_mut(index);
        slot[0] = 0;
        slot[value_len_at] = 0;
    }
    /// Fills an empty slot. The key length byte is written last.
    pub(crate) fn write_entry(&mut self, index: usize, key: &[u8], value: &[u8], hash: u32) {
        self.write_value(index, value);
        self.write_hash_tag(index, hash);
        self.write_chain_next(index, None);
        self.write_key(index, key);
    }
    /// Moves the record of `from` into the empty slot `to`, chain pointer
    /// included. Squatter flags stay with their slot positions.
    pub(crate) fn move_entry(&mut self, from: usize, to: usize) {
        let len = self.layout.slot_len();
        let (src, dst) = (from * len, to * len);
        let record = self.layout.squatter_at();
        self.bytes.copy_within(src..src + record, dst);
        let tail = self.layout.hash_at();
        self.bytes.copy_within(src + tail..src + len, dst + tail);
        self.mark_empty(from);
    }
    pub(crate) fn clear(&mut self) {
        self.bytes.fill(0);
    }
    #[cfg(test)]
    pub(crate) fn visits(&self) -> usize {
        self.visits.get()
    }
    #[cfg(test)]
    pub(crate) fn reset_visits(&self) {
        self.visits.set(0);
    }
}
