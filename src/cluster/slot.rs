//! Redis Cluster slot calculation.
//!
//! Redis Cluster maps every key to one of 16384 slots using CRC-16/XMODEM
//! (polynomial 0x1021, zero init, no reflection, no final XOR) masked to
//! 14 bits.

use crc::{Crc, CRC_16_XMODEM};

/// Number of hash slots in Redis Cluster.
pub const SLOT_COUNT: u16 = 16384;

/// Mask keeping the low 14 bits of the checksum.
const SLOT_MASK: u16 = SLOT_COUNT - 1;

/// CRC-16/XMODEM algorithm used by Redis (table-driven, byte at a time).
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Computes the CRC-16/XMODEM checksum of `data`.
///
/// # Examples
///
/// ```
/// use slotgate::cluster::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x31C3);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Calculates the Redis Cluster slot for a given key.
///
/// If the key contains a non-empty `{...}` section, only the bytes between
/// the first `{` and the next `}` are hashed (hash tags). Any byte sequence,
/// including the empty key, hashes to a slot in `0..16384`.
///
/// # Examples
///
/// ```
/// use slotgate::cluster::key_slot;
///
/// assert_eq!(key_slot(b"{user1000}.following"), key_slot(b"{user1000}.followers"));
/// assert_eq!(key_slot(b"prefix{tag}suffix"), key_slot(b"tag"));
/// ```
pub fn key_slot(key: &[u8]) -> u16 {
    crc16(hash_tag(key)) & SLOT_MASK
}

/// Returns the part of `key` that is hashed.
///
/// - `{user1000}.following` → `user1000`
/// - `foo{bar}{baz}` → `bar` (first pair only)
/// - `foo{}bar`, `foo{bar`, `foo` → the whole key
fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(start) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    match key[start + 1..].iter().position(|&b| b == b'}') {
        Some(len) if len > 0 => &key[start + 1..start + 1 + len],
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_reference_vector() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(b""), 0);
    }

    #[test]
    fn test_key_slot_known_values() {
        // Values reported by CLUSTER KEYSLOT on a real server.
        assert_eq!(key_slot(b"foo"), 12182);
        assert_eq!(key_slot(b"bar"), 5061);
        assert_eq!(key_slot(b"hello"), 866);
    }

    #[test]
    fn test_key_slot_without_braces_is_masked_crc() {
        for key in [&b"mykey"[..], b"user:1000", b"a", b"", b"}only"] {
            assert_eq!(key_slot(key), crc16(key) & 0x3FFF);
        }
    }

    #[test]
    fn test_key_slot_with_hash_tag() {
        let slot1 = key_slot(b"{user1000}.following");
        let slot2 = key_slot(b"{user1000}.followers");
        let slot3 = key_slot(b"{user1000}.posts");

        assert_eq!(slot1, slot2);
        assert_eq!(slot2, slot3);
        assert_eq!(slot1, key_slot(b"user1000"));
    }

    #[test]
    fn test_hash_tag_simple() {
        assert_eq!(hash_tag(b"foo{bar}"), b"bar");
        assert_eq!(hash_tag(b"{user1000}.following"), b"user1000");
        assert_eq!(hash_tag(b"prefix{tag}suffix"), b"tag");
    }

    #[test]
    fn test_hash_tag_empty_uses_whole_key() {
        assert_eq!(hash_tag(b"foo{}bar"), b"foo{}bar");
        assert_eq!(hash_tag(b"{}"), b"{}");
        // The first `{` decides; a later non-empty pair does not count.
        assert_eq!(hash_tag(b"foo{}{bar}"), b"foo{}{bar}");
    }

    #[test]
    fn test_hash_tag_first_pair_wins() {
        assert_eq!(hash_tag(b"foo{bar}{baz}"), b"bar");
        assert_eq!(hash_tag(b"{a}{b}{c}"), b"a");
        assert_eq!(hash_tag(b"foo{{bar}}"), b"{bar");
    }

    #[test]
    fn test_hash_tag_unmatched() {
        assert_eq!(hash_tag(b"foo{bar"), b"foo{bar");
        assert_eq!(hash_tag(b"foo}bar"), b"foo}bar");
        assert_eq!(hash_tag(b"{"), b"{");
        assert_eq!(hash_tag(b"}"), b"}");
    }

    #[test]
    fn test_key_slot_always_in_range() {
        let samples: [&[u8]; 8] = [
            b"",
            b"{",
            b"{}",
            b"}{",
            b"{{}}",
            &[0xff, 0x00, 0x7b, 0x7d],
            "用户1000".as_bytes(),
            b"key:1:value",
        ];
        for key in samples {
            assert!(key_slot(key) < SLOT_COUNT);
        }

        let long_key = vec![b'a'; 10000];
        assert!(key_slot(&long_key) < SLOT_COUNT);
    }

    #[test]
    fn test_key_slot_distribution() {
        let mut slots = std::collections::HashSet::new();
        for i in 0..100 {
            let key = format!("key{}", i);
            slots.insert(key_slot(key.as_bytes()));
        }
        assert!(slots.len() >= 50, "Keys should distribute across slots");
    }
}
