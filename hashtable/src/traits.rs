/// Maps key bytes to the 32-bit hash stored in a slot's hash tag.
///
/// Implementations must be deterministic: equal byte strings always hash
/// identically for the lifetime of a map.
pub trait KeyHasher {
    fn hash_key(&self, key: &[u8]) -> u32;
}

impl<F: Fn(&[u8]) -> u32> KeyHasher for F {
    #[inline(always)]
    fn hash_key(&self, key: &[u8]) -> u32 {
        self(key)
    }
}
