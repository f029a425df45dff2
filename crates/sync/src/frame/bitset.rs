pub const MAX_ENTITIES: usize = 2048;
pub const MAX_PLAYERS: usize = 32;

/// Larger than any valid entity index; terminates cursor iteration.
pub const ENTITY_SENTINEL: u32 = 9999;

const WORD_BITS: usize = 64;
const WORDS: usize = MAX_ENTITIES / WORD_BITS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityBitSet {
    words: [u64; WORDS],
}

impl Default for EntityBitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityBitSet {
    pub fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    #[inline]
    pub fn set(&mut self, index: u32) {
        let index = index as usize;
        assert!(index < MAX_ENTITIES, "entity index {} out of range", index);
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    #[inline]
    pub fn unset(&mut self, index: u32) {
        let index = index as usize;
        assert!(index < MAX_ENTITIES, "entity index {} out of range", index);
        self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
    }

    #[inline]
    pub fn get(&self, index: u32) -> bool {
        let index = index as usize;
        if index >= MAX_ENTITIES {
            return false;
        }
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Next set bit at or after `start`, or `None` past the last one.
    pub fn next_set_at_or_after(&self, start: u32) -> Option<u32> {
        let start = start as usize;
        if start >= MAX_ENTITIES {
            return None;
        }

        let mut word_index = start / WORD_BITS;
        let mut word = self.words[word_index] & (!0u64 << (start % WORD_BITS));

        loop {
            if word != 0 {
                return Some((word_index * WORD_BITS + word.trailing_zeros() as usize) as u32);
            }
            word_index += 1;
            if word_index >= WORDS {
                return None;
            }
            word = self.words[word_index];
        }
    }

    pub fn ones(&self) -> impl Iterator<Item = u32> + '_ {
        let mut next = self.next_set_at_or_after(0);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.next_set_at_or_after(current + 1);
            Some(current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_idempotent() {
        let mut bits = EntityBitSet::new();
        bits.set(7);
        let once = bits.clone();
        bits.set(7);
        assert_eq!(bits, once);
        assert_eq!(bits.count_ones(), 1);
    }

    #[test]
    fn next_set_scans_across_words() {
        let mut bits = EntityBitSet::new();
        bits.set(3);
        bits.set(63);
        bits.set(64);
        bits.set(2047);

        assert_eq!(bits.next_set_at_or_after(0), Some(3));
        assert_eq!(bits.next_set_at_or_after(4), Some(63));
        assert_eq!(bits.next_set_at_or_after(64), Some(64));
        assert_eq!(bits.next_set_at_or_after(65), Some(2047));
        assert_eq!(bits.next_set_at_or_after(2047), Some(2047));
        assert_eq!(bits.next_set_at_or_after(2048), None);
    }

    #[test]
    fn ones_visits_in_ascending_order() {
        let mut bits = EntityBitSet::new();
        for index in [100, 5, 1999, 64] {
            bits.set(index);
        }
        let visited: Vec<u32> = bits.ones().collect();
        assert_eq!(visited, vec![5, 64, 100, 1999]);
    }

    #[test]
    fn unset_clears_a_single_bit() {
        let mut bits = EntityBitSet::new();
        bits.set(10);
        bits.set(11);
        bits.unset(10);
        assert!(!bits.get(10));
        assert!(bits.get(11));
    }
}
