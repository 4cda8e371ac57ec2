//! Tolerant forward-scanning reader for the Pack TLV chunk format.
//!
//! A chunk is a 4-byte ASCII tag, a big-endian u32 payload length, then the
//! payload. Real-world files carry non-chunk padding bytes between some
//! sections (notably inside `XPIH`), so the reader scans forward for the
//! next recognized tag instead of assuming chunks are exactly adjacent.

/// Tags this stack recognizes. Anything else is skipped byte-by-byte.
pub const KNOWN_TAGS: [[u8; 4]; 11] = [
    *b"XPFH", *b"XPIH", *b"XMDL", *b"XPID", *b"EUID", *b"ETIT", *b"BLOB", *b"EEXT", *b"EICO",
    *b"FBIN", *b"CSEC",
];

/// A borrowed view of one chunk inside its parent buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub id: [u8; 4],
    /// Declared payload length. `data` may be shorter if the declared
    /// length overruns the enclosing bound.
    pub size: u32,
    pub data: &'a [u8],
    pub offset: usize,
}

impl RawChunk<'_> {
    /// Payload decoded as UTF-8 text with all NUL bytes stripped.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.data).replace('\0', "")
    }
}

fn is_known_tag(buf: &[u8], pos: usize) -> bool {
    pos + 4 <= buf.len() && KNOWN_TAGS.iter().any(|t| &buf[pos..pos + 4] == t)
}

fn skip_to_next_tag(buf: &[u8], mut pos: usize, end: usize) -> usize {
    while pos < end {
        if is_known_tag(buf, pos) {
            return pos;
        }
        pos += 1;
    }
    pos
}

/// Scan `buf[start..end)` for chunks. Stops when fewer than 8 bytes remain
/// or no known tag is found; never fails on malformed trailing bytes.
pub fn read_chunks(buf: &[u8], start: usize, end: Option<usize>) -> Vec<RawChunk<'_>> {
    let end = end.unwrap_or(buf.len()).min(buf.len());
    let mut chunks = Vec::new();
    let mut pos = start;

    while pos + 8 <= end {
        pos = skip_to_next_tag(buf, pos, end);
        if pos + 8 > end {
            break;
        }

        let id: [u8; 4] = buf[pos..pos + 4].try_into().unwrap();
        let size = u32::from_be_bytes(buf[pos + 4..pos + 8].try_into().unwrap());
        let data_start = pos + 8;
        // Clamp to the container end rather than erroring on a bad length.
        let data_end = data_start.saturating_add(size as usize).min(end);

        chunks.push(RawChunk {
            id,
            size,
            data: &buf[data_start..data_end],
            offset: pos,
        });
        pos = data_end;
    }

    chunks
}

/// Scan a container chunk's payload for nested chunks.
pub fn read_sub_chunks<'a>(chunk: &RawChunk<'a>) -> Vec<RawChunk<'a>> {
    read_chunks(chunk.data, 0, None)
}
