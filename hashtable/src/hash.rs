use crate::traits::KeyHasher;

const CRC_SEED: u32 = u32::MAX;

/// CRC32-C over little-endian words where SSE4.2 is available, fixed-key
/// aHash folded to 32 bits elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHasher;

impl KeyHasher for DefaultHasher {
    #[inline(always)]
    fn hash_key(&self, key: &[u8]) -> u32 {
        cfg_if::cfg_if! {
            if #[cfg(all(target_arch = "x86_64", target_feature = "sse4.2"))] {
                use std::arch::x86_64::_mm_crc32_u64;
                let mut hasher = unsafe { _mm_crc32_u64(CRC_SEED as u64, key.len() as u64) };
                for chunk in key.chunks(8) {
                    hasher = unsafe { _mm_crc32_u64(hasher, read_le(chunk)) };
                }
                hasher as u32
            } else {
                use std::hash::Hasher;
                let mut hasher = ahash::AHasher::default();
                hasher.write_u32(CRC_SEED);
                hasher.write(key);
                let hash = hasher.finish();
                (hash >> 32) as u32 ^ hash as u32
            }
        }
    }
}

/// Packs up to 8 bytes into a word, first byte lowest.
#[inline(always)]
#[cfg_attr(
    not(all(target_arch = "x86_64", target_feature = "sse4.2")),
    allow(dead_code)
)]
fn read_le(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    let mut word = [0u8; 8];
    word[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(word)
}
