use crate::slot::SlotBuffer;

/// How a 32-bit hash is reduced to a home slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HomePolicy {
    /// `hash % capacity` on the unsigned hash.
    #[default]
    Modulo,

    /// Signed remainder of the hash read as an `i32`, with a negative
    /// remainder replaced by its bitwise complement. Not a uniform modulo,
    /// kept for bit-for-bit compatible home placement with older tables.
    Legacy,
}

impl HomePolicy {
    #[inline(always)]
    pub(crate) fn home(self, hash: u32, capacity: usize) -> usize {
        match self {
            Self::Modulo => hash as usize % capacity,
            Self::Legacy => {
                let rem = hash as i32 as i64 % capacity as i64;
                if rem < 0 {
                    !rem as usize
                } else {
                    rem as usize
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Homes in the back half probe towards the front.
    #[inline(always)]
    pub(crate) fn from_home(home: usize, capacity: usize) -> Self {
        if home > capacity / 2 {
            Self::Backward
        } else {
            Self::Forward
        }
    }
}

/// `start, start ± step, start ± 2 * step, ...` until either end of the buffer.
pub(crate) struct ProbeSeq {
    next: Option<usize>,
    step: usize,
    direction: Direction,
    capacity: usize,
}

impl Iterator for ProbeSeq {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = match self.direction {
            Direction::Forward => current
                .checked_add(self.step)
                .filter(|&index| index < self.capacity),
            Direction::Backward => current.checked_sub(self.step),
        };
        Some(current)
    }
}

/// Result of walking a key's probe path and hash chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Located {
    /// The key is stored at `slot`. `prev` is the chain member linking to it.
    Found { slot: usize, prev: Option<usize> },

    /// First empty slot on the path, no slot before it holds this hash.
    Vacant(usize),

    /// The chain for this hash ends at this slot without the key.
    ChainEnd(usize),

    /// The walk left the buffer, or the home slot's squatter flag ruled the
    /// key out.
    Missing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Probing {
    pub(crate) step: usize,
    pub(crate) policy: HomePolicy,
}

impl Probing {
    #[inline(always)]
    pub(crate) fn home(self, hash: u32, capacity: usize) -> usize {
        self.policy.home(hash, capacity)
    }

    /// The probe path of a hash, starting at its home slot.
    pub(crate) fn path(self, hash: u32, capacity: usize) -> ProbeSeq {
        let home = self.home(hash, capacity);
        self.seq(home, Direction::from_home(home, capacity), capacity)
    }

    pub(crate) fn seq(self, start: usize, direction: Direction, capacity: usize) -> ProbeSeq {
        ProbeSeq {
            next: Some(start).filter(|&start| start < capacity),
            step: self.step,
            direction,
            capacity,
        }
    }

    /// Slots after `start` in `direction`, `start` excluded.
    pub(crate) fn beyond(self, start: usize, direction: Direction, capacity: usize) -> ProbeSeq {
        let mut seq = self.seq(start, direction, capacity);
        seq.next();
        seq
    }

    /// Walks the path of `hash` and, once a slot carrying `hash` is reached,
    /// its chain. Inserts pass `fast_negative = false`; they must never stop
    /// at the home slot's squatter flag.
    pub(crate) fn locate(
        self,
        buffer: &SlotBuffer,
        key: &[u8],
        hash: u32,
        fast_negative: bool,
    ) -> Located {
        for (n, index) in self.path(hash, buffer.slots()).enumerate() {
            if !buffer.is_occupied(index) {
                return Located::Vacant(index);
            }
            if buffer.hash_tag(index) == hash {
                return follow_chain(buffer, index, key);
            }
            // only the home slot's flag speaks for this hash
            if fast_negative && n == 0 && !buffer.is_squatted(index) {
                return Located::Missing;
            }
        }
        Located::Missing
    }

    /// Whether the entry at `slot` heads its hash's chain and its path
    /// crosses the empty slot `hole` before reaching `slot`.
    pub(crate) fn crosses(self, buffer: &SlotBuffer, slot: usize, hole: usize) -> bool {
        let hash = buffer.hash_tag(slot);
        let mut crossed = false;
        for index in self.path(hash, buffer.slots()) {
            if index == slot {
                return crossed;
            }
            if index == hole {
                crossed = true;
            } else if !buffer.is_occupied(index) || buffer.hash_tag(index) == hash {
                return false;
            }
        }
        false
    }
}

fn follow_chain(buffer: &SlotBuffer, head: usize, key: &[u8]) -> Located {
    let (mut prev, mut slot) = (None, head);
    loop {
        if buffer.key(slot) == key {
            return Located::Found { slot, prev };
        }
        match buffer.chain_next(slot) {
            Some(next) => {
                debug_assert_eq!(buffer.hash_tag(next), buffer.hash_tag(head));
                prev = Some(slot);
                slot = next;
            }
            None => return Located::ChainEnd(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Layout;
    use test_log::test;

    const PROBING: Probing = Probing {
        step: 5,
        policy: HomePolicy::Modulo,
    };

    #[test]
    fn modulo_home() {
        assert_eq!(HomePolicy::Modulo.home(35, 16), 3);
        assert_eq!(HomePolicy::Modulo.home(u32::MAX, 16), 15);
    }

    #[test]
    fn legacy_home_complements_negative_remainder() {
        assert_eq!(HomePolicy::Legacy.home(35, 16), 3);
        // -1 % 16 == -1, !-1 == 0
        assert_eq!(HomePolicy::Legacy.home(u32::MAX, 16), 0);
        // -2147483645 % 16 == -13, !-13 == 12
        assert_eq!(HomePolicy::Legacy.home(0x8000_0003, 16), 12);
        for hash in [u32::MAX, 0x8000_0000, 0xdead_beef, 1, 0] {
            assert!(HomePolicy::Legacy.home(hash, 17) < 17);
        }
    }

    #[test]
    fn direction_splits_at_half() {
        assert_eq!(Direction::from_home(0, 16), Direction::Forward);
        assert_eq!(Direction::from_home(8, 16), Direction::Forward);
        assert_eq!(Direction::from_home(9, 16), Direction::Backward);
    }

    #[test]
    fn probe_seq_stays_in_bounds() {
        let forward = PROBING.path(3, 16).collect::<Vec<_>>();
        assert_eq!(forward, [3, 8, 13]);
        let backward = PROBING.path(12, 16).collect::<Vec<_>>();
        assert_eq!(backward, [12, 7, 2]);
        let beyond = PROBING
            .beyond(2, Direction::Forward, 16)
            .collect::<Vec<_>>();
        assert_eq!(beyond, [7, 12]);
        assert_eq!(PROBING.beyond(15, Direction::Forward, 16).next(), None);
    }

    #[test]
    fn locate_walks_path_then_chain() {
        let mut buffer = SlotBuffer::new(Layout::new(4, 4), 16);
        assert_eq!(PROBING.locate(&buffer, b"a", 3, true), Located::Vacant(3));

        buffer.write_entry(3, b"x", b"", 19);
        assert_eq!(PROBING.locate(&buffer, b"a", 3, true), Located::Missing);
        assert_eq!(PROBING.locate(&buffer, b"a", 3, false), Located::Vacant(8));

        buffer.mark_squatted(3);
        buffer.write_entry(8, b"a", b"", 3);
        buffer.write_entry(13, b"b", b"", 3);
        buffer.write_chain_next(8, Some(13));
        assert_eq!(
            PROBING.locate(&buffer, b"a", 3, true),
            Located::Found { slot: 8, prev: None }
        );
        assert_eq!(
            PROBING.locate(&buffer, b"b", 3, true),
            Located::Found {
                slot: 13,
                prev: Some(8)
            }
        );
        assert_eq!(PROBING.locate(&buffer, b"c", 3, true), Located::ChainEnd(13));
    }

    #[test]
    fn crosses_only_for_path_heads() {
        let mut buffer = SlotBuffer::new(Layout::new(4, 4), 16);
        buffer.write_entry(3, b"x", b"", 3);
        buffer.write_entry(13, b"y", b"", 19);
        // 19 homes at 3, path 3 -> 8 -> 13
        assert!(PROBING.crosses(&buffer, 13, 8));
        assert!(!PROBING.crosses(&buffer, 13, 2));

        // a second entry of hash 3 sits behind its chain head
        buffer.write_entry(8, b"z", b"", 3);
        buffer.write_entry(13, b"y", b"", 3);
        assert!(!PROBING.crosses(&buffer, 13, 8));
    }
}
