//! Encrypted CPI assembly and dissection.
//!
//! Output layout: `XPIH` (plaintext model-lock header), `CSEC` (80-byte
//! encrypted security chunk), then the DES-CBC ciphertext of the pack
//! payload with no enclosing chunk frame — consuming firmware treats
//! everything after CSEC as ciphertext by convention.

use crate::chunk::writer::{build_chunk, build_text_chunk, concat};
use crate::crypto::descbc::{KEY_FOATFKIO, encrypt_des_cbc};
use crate::crypto::lock::{CSEC_STANDARD, locked_csec};
use crate::crypto::pad::add_padding;
use crate::domain::PpfData;
use crate::error::{PackError, Result};
use crate::formats::ppi::{blob_chunk, select_blobs};

/// Declared payload length of the CSEC chunk in every CPI.
pub const CSEC_LEN: usize = 80;

/// Build the plaintext `XPIH` header. The `XMDL` chunk (raw model-name
/// bytes, no NUL here) is followed by 4-byte alignment padding before
/// `XPID`; device firmware fails to parse the header without it.
fn xpih_chunk(model_name: &str, pack_install_id: u32) -> Vec<u8> {
    let xmdl = build_chunk(b"XMDL", model_name.as_bytes());
    let align = vec![0u8; (4 - xmdl.len() % 4) % 4];
    let xpid = build_chunk(b"XPID", &pack_install_id.to_be_bytes());
    build_chunk(b"XPIH", &concat(&[xmdl, align, xpid]))
}

/// Build an encrypted CPI from parsed pack data.
///
/// With a `full_id` the CSEC is device-locked to that instrument; without
/// one the fixed standard CSEC is emitted. Payload encryption is the same
/// either way. An empty `full_id` is a hard error — device locking was
/// requested but there is no identity to derive a key from.
pub fn build_encrypted_cpi(
    pack: &PpfData,
    model_name: &str,
    pack_install_id: u32,
    selected: Option<&[usize]>,
    full_id: Option<&str>,
) -> Result<Vec<u8>> {
    let xpih = xpih_chunk(model_name, pack_install_id);

    let csec_data = match full_id {
        Some(id) => locked_csec(id)?,
        None => CSEC_STANDARD.to_vec(),
    };
    let csec = build_chunk(b"CSEC", &csec_data);

    let mut payload_parts = vec![
        build_text_chunk(b"EUID", &pack.uid),
        build_text_chunk(b"ETIT", &pack.title),
    ];
    for blob in select_blobs(pack, selected) {
        payload_parts.push(blob_chunk(blob));
    }

    let payload = encrypt_des_cbc(&add_padding(&concat(&payload_parts)), &KEY_FOATFKIO)?;

    Ok(concat(&[xpih, csec, payload]))
}

/// The three sections of an encrypted CPI, borrowed from the source buffer.
#[derive(Debug, Clone, Copy)]
pub struct CpiSections<'a> {
    /// XPIH payload (XMDL + alignment + XPID).
    pub xpih: &'a [u8],
    /// CSEC ciphertext, normally 80 bytes.
    pub csec: &'a [u8],
    /// Raw DES-CBC ciphertext tail.
    pub payload: &'a [u8],
}

fn framed_chunk<'a>(buf: &'a [u8], pos: usize, tag: &[u8; 4]) -> Result<(&'a [u8], usize)> {
    let tag_str = String::from_utf8_lossy(tag);
    if buf.len() < pos + 8 || &buf[pos..pos + 4] != tag {
        return Err(PackError::Format(format!(
            "expected {tag_str} chunk at offset {pos}"
        )));
    }
    let size = u32::from_be_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
    let data_start = pos + 8;
    let data_end = data_start.saturating_add(size);
    if data_end > buf.len() {
        return Err(PackError::Format(format!(
            "{tag_str} chunk overruns buffer: {size} bytes declared at offset {pos}"
        )));
    }
    Ok((&buf[data_start..data_end], data_end))
}

/// Split a CPI into its sections by strict offset walking.
///
/// The tolerant scanner is deliberately not used here: the ciphertext tail
/// can contain accidental tag bytes, so XPIH and CSEC are located by their
/// declared lengths alone.
pub fn split_cpi(buf: &[u8]) -> Result<CpiSections<'_>> {
    let (xpih, pos) = framed_chunk(buf, 0, b"XPIH")?;
    let (csec, pos) = framed_chunk(buf, pos, b"CSEC")?;
    Ok(CpiSections {
        xpih,
        csec,
        payload: &buf[pos..],
    })
}
