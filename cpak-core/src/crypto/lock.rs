//! Device-lock key material and the CSEC security chunk.
//!
//! The constants below are opaque data tables recovered from instrument
//! firmware; they must stay bit-for-bit identical.

use crate::chunk::writer::{build_chunk, build_container_chunk, concat};
use crate::crypto::descbc::{KEY_DUALSEAL, KEY_FOATFKIO, encrypt_des_cbc, encrypt_tdes_cbc};
use crate::crypto::pad::add_padding;
use crate::error::{PackError, Result};

/// Seeds the XOR tail when the identity string is shorter than 16 bytes.
pub const XOR_SEED: [u8; 16] = [
    0x0f, 0x62, 0xbe, 0x39, 0xd1, 0x70, 0xc7, 0xf4, 0x1a, 0x85, 0x2d, 0x5c, 0x96, 0xe8, 0x4b, 0xa3,
];

/// Expands a 16-byte derived key to a 24-byte 3DES key: 3 rounds of 8
/// output bytes, each the XOR of two indexed source bytes.
pub const EXPANSION_TABLE: [u8; 48] = [
    0x07, 0x0c, 0x0e, 0x0a, 0x0b, 0x0d, 0x00, 0x01, 0x06, 0x02, 0x0f, 0x03, 0x09, 0x04, 0x08, 0x05,
    0x00, 0x0f, 0x02, 0x08, 0x06, 0x09, 0x01, 0x0a, 0x0e, 0x0c, 0x0b, 0x03, 0x04, 0x05, 0x07, 0x0d,
    0x07, 0x05, 0x0c, 0x04, 0x0f, 0x0d, 0x01, 0x09, 0x08, 0x0a, 0x00, 0x03, 0x0b, 0x06, 0x0e, 0x02,
];

/// Standard CSEC ciphertext (80 bytes) for packs that are not device-locked.
/// Decrypts on hardware to a generic non-device-bound authentication record.
pub const CSEC_STANDARD: [u8; 80] = [
    0x5a, 0x51, 0x7c, 0x40, 0x5f, 0x44, 0x7c, 0x02, 0x90, 0x3b, 0xcc, 0x5e, 0x1d, 0x69, 0xdc, 0xf8,
    0x52, 0x2f, 0xe8, 0x75, 0xd0, 0xed, 0x7f, 0x97, 0xf3, 0xef, 0x1e, 0x23, 0x6e, 0x4f, 0x9d, 0x80,
    0x29, 0x87, 0x42, 0x89, 0xad, 0xdc, 0xc3, 0xc2, 0x23, 0xff, 0xa3, 0x65, 0x55, 0xc2, 0x5d, 0xaf,
    0xf4, 0x93, 0x11, 0x96, 0xf1, 0x4d, 0xa7, 0xd9, 0x12, 0xe6, 0x07, 0xee, 0x15, 0xc0, 0x45, 0x24,
    0x26, 0x58, 0x5c, 0x1f, 0xb4, 0x50, 0x56, 0xe7, 0x54, 0xbc, 0xe9, 0x49, 0xf6, 0xda, 0xf0, 0x55,
];

/// Derive the 16-byte device key from the instrument's identity string.
///
/// Identities of 16+ bytes XOR-fold a zero-padded 128-byte buffer down to
/// 16 bytes; shorter identities are copied and the tail is filled from
/// [`XOR_SEED`] mixed with the identity cycled. An empty identity cannot
/// key a device lock and is a hard error.
pub fn derive_key(full_id: &str) -> Result<[u8; 16]> {
    let src = full_id.as_bytes();
    if src.is_empty() {
        return Err(PackError::EmptyIdentity);
    }
    let len = src.len().min(128);

    let mut buf = [0u8; 128];
    buf[..len].copy_from_slice(&src[..len]);

    let mut out = [0u8; 16];
    if len >= 16 {
        for i in 0..16 {
            let mut val = 0u8;
            for chunk in 0..8 {
                val ^= buf[chunk * 16 + i];
            }
            out[i] = val;
        }
    } else {
        out[..len].copy_from_slice(&src[..len]);
        for j in 0..16 - len {
            out[len + j] = XOR_SEED[len + j] ^ src[j % len];
        }
    }
    Ok(out)
}

/// Expand a derived 16-byte key to the 24-byte 3DES key.
pub fn expand_key(key16: &[u8; 16]) -> [u8; 24] {
    let mut out = [0u8; 24];
    for r in 0..3 {
        for j in 0..8 {
            let a = EXPANSION_TABLE[2 * j + 16 * r] as usize;
            let b = EXPANSION_TABLE[2 * j + 1 + 16 * r] as usize;
            out[r * 8 + j] = key16[a] ^ key16[b];
        }
    }
    out
}

/// Build the 80-byte device-locked CSEC ciphertext for `full_id`.
///
/// Plaintext layout: `ABCF{00 01}` + `ABEI(AIRI + AIVF)`, where AIRI is the
/// DES-CBC("dualseal") encryption of 16 random bytes (Yamaha-padded to 24)
/// and AIVF is the 3DES-EDE-CBC encryption, under the expanded device key,
/// of `second[j] = key[j] + first[15 - j] (mod 256)`. The reversed index on
/// `first` is firmware behavior, not a transposition. The framed plaintext
/// is padded and DES-CBC encrypted under "Foatfkio".
pub fn locked_csec(full_id: &str) -> Result<Vec<u8>> {
    let key_slot = derive_key(full_id)?;

    let mut first = [0u8; 16];
    getrandom::getrandom(&mut first).map_err(|e| PackError::Crypto(format!("rng failure: {e}")))?;

    let mut second = [0u8; 16];
    for j in 0..16 {
        second[j] = key_slot[j].wrapping_add(first[15 - j]);
    }

    let airi = encrypt_des_cbc(&add_padding(&first), &KEY_DUALSEAL)?;
    let aivf = encrypt_tdes_cbc(&second, &expand_key(&key_slot))?;

    let abcf = build_chunk(b"ABCF", &[0x00, 0x01]);
    let airi_chunk = build_chunk(b"AIRI", &airi);
    let aivf_chunk = build_chunk(b"AIVF", &aivf);
    let abei = build_container_chunk(b"ABEI", &[airi_chunk, aivf_chunk]);
    let plaintext = concat(&[abcf, abei]);

    encrypt_des_cbc(&add_padding(&plaintext), &KEY_FOATFKIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::descbc::decrypt_des_cbc;
    use crate::crypto::pad::remove_padding;

    #[test]
    fn derive_key_is_deterministic_and_sixteen_bytes() {
        for id in ["G", "short", "exactly-16-bytes", "a-rather-long-instrument-identity"] {
            let a = derive_key(id).unwrap();
            let b = derive_key(id).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.len(), 16);
        }
    }

    #[test]
    fn derive_key_distinguishes_identities() {
        let a = derive_key("E1GC3617273").unwrap();
        let b = derive_key("E1GC3617274").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn derive_key_rejects_empty_identity() {
        assert!(matches!(derive_key(""), Err(PackError::EmptyIdentity)));
    }

    #[test]
    fn derive_key_short_path_uses_seed_tail() {
        let id = "AB";
        let out = derive_key(id).unwrap();
        assert_eq!(&out[..2], id.as_bytes());
        for j in 0..14 {
            assert_eq!(out[2 + j], XOR_SEED[2 + j] ^ id.as_bytes()[j % 2]);
        }
    }

    #[test]
    fn derive_key_long_path_folds_strided_chunks() {
        // 32-byte identity: out[i] = byte[i] ^ byte[16 + i], rest of the
        // 128-byte buffer is zero.
        let id = "0123456789abcdefFEDCBA9876543210";
        let out = derive_key(id).unwrap();
        let src = id.as_bytes();
        for i in 0..16 {
            assert_eq!(out[i], src[i] ^ src[16 + i]);
        }
    }

    #[test]
    fn derive_key_truncates_past_128_bytes() {
        let long: String = "x".repeat(200);
        let trunc: String = "x".repeat(128);
        assert_eq!(derive_key(&long).unwrap(), derive_key(&trunc).unwrap());
    }

    #[test]
    fn expand_key_matches_table_definition() {
        let mut key16 = [0u8; 16];
        for (i, b) in key16.iter_mut().enumerate() {
            *b = (i as u8) * 7 + 3;
        }
        let out = expand_key(&key16);
        for r in 0..3 {
            for j in 0..8 {
                let a = EXPANSION_TABLE[2 * j + 16 * r] as usize;
                let b = EXPANSION_TABLE[2 * j + 1 + 16 * r] as usize;
                assert_eq!(out[r * 8 + j], key16[a] ^ key16[b]);
            }
        }
    }

    #[test]
    fn locked_csec_is_eighty_bytes() {
        let csec = locked_csec("E1GC3617273").unwrap();
        assert_eq!(csec.len(), 80);
    }

    #[test]
    fn locked_csec_varies_per_call() {
        // Random first_data makes every CSEC unique, even for one identity.
        let a = locked_csec("E1GC3617273").unwrap();
        let b = locked_csec("E1GC3617273").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn locked_csec_plaintext_is_framed() {
        let csec = locked_csec("E1GC3617273").unwrap();
        let plain = decrypt_des_cbc(&csec, &KEY_FOATFKIO).unwrap();
        let plain = remove_padding(&plain);
        // ABCF(2 bytes) then ABEI holding AIRI(24) + AIVF(16).
        assert_eq!(&plain[..4], b"ABCF");
        assert_eq!(&plain[8..10], &[0x00, 0x01]);
        assert_eq!(&plain[10..14], b"ABEI");
        assert_eq!(&plain[18..22], b"AIRI");
        assert_eq!(
            u32::from_be_bytes(plain[22..26].try_into().unwrap()),
            24
        );
        assert_eq!(&plain[50..54], b"AIVF");
        assert_eq!(
            u32::from_be_bytes(plain[54..58].try_into().unwrap()),
            16
        );
        assert_eq!(plain.len(), 74);
    }
}
