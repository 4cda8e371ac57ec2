//! Yamaha block padding.
//!
//! The final padding byte encodes how many bytes of the last 8-byte block
//! are genuine data (0 = the whole last block is padding). Padding always
//! adds 1-8 bytes, so padded output is a strict superset of the input.

/// Pad `data` to a multiple of 8 bytes. Invariants: output length is a
/// multiple of 8, strictly greater than the input length, and the last
/// byte equals `data.len() % 8`.
pub fn add_padding(data: &[u8]) -> Vec<u8> {
    let remainder = data.len() % 8;
    let pad_len = if remainder == 0 { 8 } else { 8 - remainder };
    let mut padded = vec![0u8; data.len() + pad_len];
    padded[..data.len()].copy_from_slice(data);
    let last = padded.len() - 1;
    padded[last] = remainder as u8;
    padded
}

/// Inverse of [`add_padding`]. The last byte gives the genuine-byte count
/// of the final block; values >= 8 cannot come from this padder and are
/// passed through untouched rather than treated as an error.
pub fn remove_padding(data: &[u8]) -> &[u8] {
    if data.len() < 8 {
        return data;
    }
    let remainder = data[data.len() - 1] as usize;
    if remainder < 8 {
        &data[..data.len() - 8 + remainder]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_invariants_hold_for_all_small_lengths() {
        for len in 0..=64usize {
            let data = vec![0xabu8; len];
            let padded = add_padding(&data);
            assert_eq!(padded.len() % 8, 0, "len {len}");
            assert!(padded.len() > data.len(), "len {len}");
            let added = padded.len() - data.len();
            assert!((1..=8).contains(&added), "len {len}");
            assert_eq!(padded[padded.len() - 1], (len % 8) as u8, "len {len}");
        }
    }

    #[test]
    fn removal_inverts_addition_for_every_remainder() {
        for len in 0..=16usize {
            let data: Vec<u8> = (0..len as u8).collect();
            let padded = add_padding(&data);
            assert_eq!(remove_padding(&padded), &data[..], "len {len}");
        }
    }

    #[test]
    fn nonconformant_trailing_byte_passes_through() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 0xff];
        assert_eq!(remove_padding(&data), &data[..]);
    }

    #[test]
    fn short_buffers_pass_through() {
        let data = [1u8, 2, 3];
        assert_eq!(remove_padding(&data), &data[..]);
    }
}
