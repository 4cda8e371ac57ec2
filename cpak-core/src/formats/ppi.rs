//! Plaintext pack writer: PPI (no model lock) or an unencrypted CPI-shaped
//! stream (with the XPIH model-lock header). Exists as the building block
//! for the encrypted path and for non-locked distribution.

use crate::chunk::writer::{build_chunk, build_container_chunk, build_text_chunk, concat};
use crate::domain::{PpfBlobEntry, PpfData};

/// One `BLOB` container: EUID/ETIT/EEXT, optional EICO, raw FBIN.
pub(crate) fn blob_chunk(blob: &PpfBlobEntry) -> Vec<u8> {
    let mut parts = vec![
        build_text_chunk(b"EUID", &blob.uid),
        build_text_chunk(b"ETIT", &blob.title),
        build_text_chunk(b"EEXT", &blob.extension),
    ];
    if let Some(icon) = &blob.icon_code {
        parts.push(build_text_chunk(b"EICO", icon));
    }
    parts.push(build_chunk(b"FBIN", &blob.binary_data));
    build_container_chunk(b"BLOB", &parts)
}

/// Blobs filtered to `selected` indices (source order preserved), or all.
pub(crate) fn select_blobs<'a>(
    pack: &'a PpfData,
    selected: Option<&[usize]>,
) -> Vec<&'a PpfBlobEntry> {
    match selected {
        Some(indices) => pack
            .blobs
            .iter()
            .enumerate()
            .filter(|(i, _)| indices.contains(i))
            .map(|(_, b)| b)
            .collect(),
        None => pack.blobs.iter().collect(),
    }
}

/// Serialize pack data back into chunk form, unencrypted.
///
/// With `include_header` and a non-empty model name, the stream is prefixed
/// with an `XPIH` container (NUL-terminated `XMDL` text chunk + `XPID`
/// install id); unlike the encrypted path there is no alignment padding
/// between the two.
pub fn build_ppi(
    pack: &PpfData,
    model_name: &str,
    pack_install_id: u32,
    selected: Option<&[usize]>,
    include_header: bool,
) -> Vec<u8> {
    let mut parts = Vec::new();

    if include_header && !model_name.is_empty() {
        let xmdl = build_text_chunk(b"XMDL", model_name);
        let xpid = build_chunk(b"XPID", &pack_install_id.to_be_bytes());
        parts.push(build_container_chunk(b"XPIH", &[xmdl, xpid]));
    }

    parts.push(build_text_chunk(b"EUID", &pack.uid));
    parts.push(build_text_chunk(b"ETIT", &pack.title));

    for blob in select_blobs(pack, selected) {
        parts.push(blob_chunk(blob));
    }

    concat(&parts)
}
