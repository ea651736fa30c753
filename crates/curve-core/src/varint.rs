//! Unsigned LEB128 varints, as used by the run table of legacy attributed strings.

/// Encode a value as an unsigned LEB128 varint.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
    buf
}

/// Decode one varint starting at `offset`.
///
/// Returns the value and the offset just past it, or `None` when the buffer
/// ends before the terminating byte or the value does not fit in 64 bits.
pub fn decode_varint(data: &[u8], offset: usize) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    let mut pos = offset;

    loop {
        let byte = *data.get(pos)?;
        pos += 1;

        if shift >= 64 {
            return None;
        }
        value |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Some((value, pos));
        }
        shift += 7;
    }
}
