//! PPF (Pack Project File) parsing: a chunk stream after an 8-byte
//! file header.

use crate::chunk::reader::{RawChunk, read_chunks, read_sub_chunks};
use crate::domain::{PpfBlobEntry, PpfData};

/// Bytes before the chunk stream begins in a PPF file.
pub const PPF_HEADER_LEN: usize = 8;

/// Parse a PPF buffer (chunk scan starts after the 8-byte header).
pub fn parse_ppf(buf: &[u8]) -> PpfData {
    parse_pack_chunks(buf, PPF_HEADER_LEN)
}

/// Parse a headerless pack chunk stream, e.g. a decrypted CPI payload.
pub fn parse_payload(buf: &[u8]) -> PpfData {
    parse_pack_chunks(buf, 0)
}

fn parse_pack_chunks(buf: &[u8], start: usize) -> PpfData {
    let mut data = PpfData::default();

    for chunk in read_chunks(buf, start, None) {
        match &chunk.id {
            // A top-level XPIH means a CPI is being re-parsed; its model
            // lock header carries no pack content.
            b"XPIH" => continue,
            b"EUID" if data.uid.is_empty() => data.uid = chunk.text(),
            b"ETIT" if data.title.is_empty() => data.title = chunk.text(),
            b"BLOB" => data.blobs.push(parse_blob(&chunk)),
            _ => {}
        }
    }

    data
}

fn parse_blob(chunk: &RawChunk<'_>) -> PpfBlobEntry {
    let mut entry = PpfBlobEntry {
        uid: String::new(),
        title: String::new(),
        extension: String::new(),
        icon_code: None,
        binary_data: Vec::new(),
    };

    for sub in read_sub_chunks(chunk) {
        match &sub.id {
            b"EUID" => entry.uid = sub.text(),
            b"ETIT" => entry.title = sub.text(),
            b"EEXT" => entry.extension = sub.text(),
            b"EICO" => entry.icon_code = Some(sub.text()),
            b"FBIN" => entry.binary_data = sub.data.to_vec(),
            _ => {}
        }
    }

    entry
}
