//! N27 instrument identity files: a fixed-offset record, not chunk-based.
//!
//! The layout is loosely versioned across firmware revisions, so every
//! field degrades to an empty/zero default when the buffer is too short;
//! partial data is still useful.

use crate::domain::InstrumentInfo;

const NAME_OFF: usize = 0;
const NAME_LEN: usize = 64;
const SERIAL_OFF: usize = 64;
const SERIAL_LEN: usize = 24;
const FULL_ID_OFF: usize = 88;
const FULL_ID_LEN: usize = 32;
const WAVE_UNITS_OFF: usize = 0x78;
const PARAM_UNITS_OFF: usize = 0x80;
const CAPACITY_END: usize = 0x84;

/// Read ASCII up to the first NUL within a fixed-width window.
fn read_cstr(buf: &[u8], offset: usize, max_len: usize) -> String {
    let window = &buf[offset..buf.len().min(offset + max_len)];
    let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    String::from_utf8_lossy(&window[..end]).into_owned()
}

fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Parse an .n27 buffer. Capacities are stored as counts of 1024-byte
/// units and returned in bytes.
pub fn parse_n27(buf: &[u8], file_name: &str) -> InstrumentInfo {
    let name = read_cstr(buf, NAME_OFF, NAME_LEN);
    let serial = if buf.len() >= SERIAL_OFF + SERIAL_LEN {
        read_cstr(buf, SERIAL_OFF, SERIAL_LEN)
    } else {
        String::new()
    };
    let full_id = if buf.len() >= FULL_ID_OFF + FULL_ID_LEN {
        read_cstr(buf, FULL_ID_OFF, FULL_ID_LEN)
    } else {
        String::new()
    };

    let (wave_capacity, param_capacity) = if buf.len() >= CAPACITY_END {
        (
            read_u32_be(buf, WAVE_UNITS_OFF) as u64 * 1024,
            read_u32_be(buf, PARAM_UNITS_OFF) as u64 * 1024,
        )
    } else {
        (0, 0)
    };

    InstrumentInfo {
        name,
        file_name: file_name.to_string(),
        serial,
        full_id,
        wave_capacity,
        param_capacity,
    }
}
