//! DES-CBC and 3DES-EDE-CBC as the Pack format uses them: fixed ASCII keys
//! run through the firmware's MSB parity fold, always a zero IV, and the
//! format's own padding (so the cipher layer is strictly `NoPadding`).
//!
//! This replicates fixed legacy device behavior; interoperability requires
//! bit-exact reproduction, so nothing here is to be modernized.

use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use des::{Des, TdesEde3};

use crate::error::{PackError, Result};

/// Payload and CSEC key (ASCII "Foatfkio"), before parity adjustment.
pub const KEY_FOATFKIO: [u8; 8] = *b"Foatfkio";

/// AIRI key (ASCII "dualseal"), before parity adjustment.
pub const KEY_DUALSEAL: [u8; 8] = *b"dualseal";

const ZERO_IV: [u8; 8] = [0u8; 8];

type DesCbcEnc = cbc::Encryptor<Des>;
type DesCbcDec = cbc::Decryptor<Des>;
type Tdes3CbcEnc = cbc::Encryptor<TdesEde3>;

/// Firmware MSB parity fold: bits 0-6 are key material, bit 7 is set so the
/// byte has odd parity. The cascading shift-XOR sequence must stay exactly
/// as-is; a "close" key decrypts to garbage without erroring.
pub fn msb_parity<const N: usize>(raw: &[u8; N]) -> [u8; N] {
    let mut out = [0u8; N];
    for (o, &r) in out.iter_mut().zip(raw.iter()) {
        let b = r & 0x7f;
        let mut t = b;
        t ^= t << 4;
        t ^= t << 2;
        t ^= t << 1;
        *o = b | (!t & 0x80);
    }
    out
}

fn alignment_err(len: usize) -> PackError {
    PackError::Crypto(format!("cipher input not a multiple of 8 bytes: {len}"))
}

/// DES-CBC encrypt under `raw_key` (parity-adjusted here) with a zero IV.
/// `data` must already be Yamaha-padded to a multiple of 8 bytes.
pub fn encrypt_des_cbc(data: &[u8], raw_key: &[u8; 8]) -> Result<Vec<u8>> {
    let key = msb_parity(raw_key);
    let mut buf = data.to_vec();
    DesCbcEnc::new(&key.into(), &ZERO_IV.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
        .map_err(|_| alignment_err(data.len()))?;
    Ok(buf)
}

/// DES-CBC decrypt under `raw_key` (parity-adjusted here) with a zero IV.
/// Padding is not interpreted; callers strip it with [`crate::crypto::pad`].
pub fn decrypt_des_cbc(data: &[u8], raw_key: &[u8; 8]) -> Result<Vec<u8>> {
    let key = msb_parity(raw_key);
    let mut buf = data.to_vec();
    DesCbcDec::new(&key.into(), &ZERO_IV.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| alignment_err(data.len()))?;
    Ok(buf)
}

/// 3DES-EDE-CBC encrypt with a zero IV. `key24` is the expanded device key;
/// each 8-byte subkey is parity-adjusted independently before use.
pub fn encrypt_tdes_cbc(data: &[u8], key24: &[u8; 24]) -> Result<Vec<u8>> {
    let mut key = [0u8; 24];
    for i in 0..3 {
        let sub: [u8; 8] = key24[i * 8..(i + 1) * 8].try_into().unwrap();
        key[i * 8..(i + 1) * 8].copy_from_slice(&msb_parity(&sub));
    }
    let mut buf = data.to_vec();
    Tdes3CbcEnc::new(&key.into(), &ZERO_IV.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
        .map_err(|_| alignment_err(data.len()))?;
    Ok(buf)
}
