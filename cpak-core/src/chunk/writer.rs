//! Chunk emission. Write is byte-exact: tag + big-endian u32 length +
//! payload, no alignment padding of its own.

/// Flat concatenation of pre-built byte sequences.
pub fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for p in parts {
        out.extend_from_slice(p);
    }
    out
}

pub fn build_chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Wrap pre-built child chunks as one container chunk.
pub fn build_container_chunk(tag: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    build_chunk(tag, &concat(children))
}

/// UTF-8 encode `text` plus a trailing NUL; the NUL is part of the declared
/// length, so readers strip NULs rather than assuming a terminator position.
pub fn build_text_chunk(tag: &[u8; 4], text: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text.as_bytes());
    payload.push(0);
    build_chunk(tag, &payload)
}
