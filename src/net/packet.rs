use std::fmt;

/// Value returned by every read that runs past the end of the buffer.
pub const INVALID: i32 = -1;

const HEADER_LEN: usize = 2;

/// Inbound message. The two-byte message id is consumed on construction;
/// the remaining fields are read in the fixed order of the message type.
///
/// A read whose span does not fit yields [`INVALID`] and parks the cursor
/// one past the end, so every later read on the same reader fails too.
/// Callers check [`PacketReader::is_valid`] once after a batch of reads.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    id: i32,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = Self { data, pos: 0, id: INVALID };
        reader.id = reader.read_u16_be();
        reader
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_valid(&self) -> bool {
        self.pos <= self.data.len()
    }

    pub fn read_u8(&mut self) -> i32 {
        match self.take(1) {
            Some(bytes) => i32::from(bytes[0]),
            None => INVALID,
        }
    }

    pub fn read_u16_be(&mut self) -> i32 {
        match self.take(2) {
            Some(bytes) => i32::from(u16::from_be_bytes([bytes[0], bytes[1]])),
            None => INVALID,
        }
    }

    /// Four-byte field, reinterpreted as signed like the wire format does.
    pub fn read_u32_be(&mut self) -> i32 {
        match self.take(4) {
            Some(bytes) => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            None => INVALID,
        }
    }

    /// Length-prefixed string (two-byte count).
    pub fn read_string(&mut self) -> String {
        let len = self.read_u16_be();
        if len < 0 {
            self.poison();
            return String::new();
        }
        self.read_string_fixed(len as usize)
    }

    /// String occupying exactly `len` bytes. The value stops at the first NUL
    /// but the cursor always advances by `len` to keep the framing.
    pub fn read_string_fixed(&mut self, len: usize) -> String {
        let Some(bytes) = self.take(len) else {
            return String::new();
        };
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        if end > self.data.len() {
            self.poison();
            return None;
        }
        let start = self.pos;
        self.pos = end;
        Some(&self.data[start..end])
    }

    fn poison(&mut self) {
        self.pos = self.data.len() + 1;
    }
}

impl fmt::Display for PacketReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} ({} B)", self.id, self.data.len())
    }
}

/// Outbound message, built by appending fields in the per-type order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketWriter {
    data: Vec<u8>,
}

impl PacketWriter {
    pub fn new(id: u16) -> Self {
        let mut writer = Self {
            data: Vec::with_capacity(16),
        };
        writer.write_u16_be(id);
        writer
    }

    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.data[0], self.data[1]])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once anything was appended after the message id.
    pub fn has_payload(&self) -> bool {
        self.data.len() > HEADER_LEN
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(usize::from(u16::MAX));
        self.write_u16_be(len as u16);
        self.data.extend_from_slice(&bytes[..len]);
    }

    /// Writes exactly `len` bytes: truncated, or padded with NULs.
    pub fn write_string_fixed(&mut self, value: &str, len: usize) {
        let bytes = value.as_bytes();
        let kept = bytes.len().min(len);
        self.data.extend_from_slice(&bytes[..kept]);
        self.data.resize(self.data.len() + (len - kept), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (*state >> 32) as u32
    }

    #[test]
    fn fields_roundtrip_in_order() {
        let mut writer = PacketWriter::new(0x0280);
        writer.write_u16_be(12);
        writer.write_u8(1);
        writer.write_u16_be(150);
        writer.write_u16_be(65535);
        writer.write_u32_be(0xdead_beef);
        writer.write_string("Ayla");
        writer.write_string_fixed("abc", 6);

        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.id(), 0x0280);
        assert_eq!(reader.read_u16_be(), 12);
        assert_eq!(reader.read_u8(), 1);
        assert_eq!(reader.read_u16_be(), 150);
        assert_eq!(reader.read_u16_be(), 65535);
        assert_eq!(reader.read_u32_be(), 0xdead_beef_u32 as i32);
        assert_eq!(reader.read_string(), "Ayla");
        assert_eq!(reader.read_string_fixed(6), "abc");
        assert!(reader.is_valid());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_buffer_yields_sentinel_for_every_later_field() {
        let mut writer = PacketWriter::new(0x0200);
        writer.write_u8(4);
        writer.write_u16_be(17);
        writer.write_u8(0);
        writer.write_u16_be(150);
        writer.write_u16_be(150);
        let full = writer.into_vec();

        for cut in 0..full.len() {
            let mut reader = PacketReader::new(&full[..cut]);
            let values = [
                reader.read_u8(),
                reader.read_u16_be(),
                reader.read_u8(),
                reader.read_u16_be(),
                reader.read_u16_be(),
            ];
            let fitting = [3usize, 5, 6, 8, 10];
            let mut failed = cut < 2;
            for (value, end) in values.iter().zip(fitting) {
                if failed || end > cut {
                    failed = true;
                    assert_eq!(*value, INVALID, "cut at {cut}");
                }
            }
            assert!(!reader.is_valid());
        }
    }

    #[test]
    fn short_read_poisons_cursor_even_for_smaller_fields() {
        let data = [0x01, 0x00, 0x05];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_u16_be(), INVALID);
        assert_eq!(reader.position(), data.len() + 1);
        assert_eq!(reader.read_u8(), INVALID);
        assert_eq!(reader.read_string_fixed(0), "");
        assert!(!reader.is_valid());
    }

    #[test]
    fn string_stops_at_nul_but_keeps_framing() {
        let mut writer = PacketWriter::new(0x02c1);
        writer.write_u16_be(6);
        writer.write_string_fixed("hi", 6);
        writer.write_u8(0x42);
        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_string(), "hi");
        assert_eq!(reader.read_u8(), 0x42);
        assert!(reader.is_valid());
    }

    #[test]
    fn oversized_string_length_poisons_reader() {
        let mut writer = PacketWriter::new(0x02c1);
        writer.write_u16_be(40);
        writer.write_string_fixed("short", 5);
        let mut reader = PacketReader::new(writer.as_slice());
        assert_eq!(reader.read_string(), "");
        assert_eq!(reader.read_u8(), INVALID);
        assert!(!reader.is_valid());
    }

    #[test]
    fn random_strings_roundtrip() {
        let mut state = 0x1234_5678_9abc_def0;
        for _ in 0..64 {
            let len = (lcg_next(&mut state) % 200) as usize;
            let text: String = (0..len)
                .map(|_| char::from(b'a' + (lcg_next(&mut state) % 26) as u8))
                .collect();
            let mut writer = PacketWriter::new(1);
            writer.write_string(&text);
            let mut reader = PacketReader::new(writer.as_slice());
            assert_eq!(reader.read_string(), text);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn writer_tracks_payload() {
        let mut writer = PacketWriter::new(0x0310);
        assert!(!writer.has_payload());
        writer.write_u16_be(3);
        assert!(writer.has_payload());
        assert_eq!(writer.id(), 0x0310);
    }

    #[test]
    fn display_shows_id_and_length() {
        let data = [0x02, 0x01, 0x00, 0x07];
        let reader = PacketReader::new(&data);
        assert_eq!(reader.to_string(), "0x0201 (4 B)");
    }
}
