//! Network-byte-order (big-endian) writer and reader.
//!
//! Beacon packets are small, fixed-layout binary blobs. Instead of pulling
//! in a serialization framework we write fields one by one into a bounded
//! buffer and read them back in the same order.
//!
//! Both sides carry a single sticky **overflow** flag:
//!
//! - [`NboWriter`] refuses any write that would push the buffer past its
//!   limit. Once set, every later write is ignored.
//! - [`NboReader`] sets the flag when a read runs past the end of the
//!   buffer or a length prefix is negative or too large. Once set, every
//!   later read returns the type's default.
//!
//! This keeps decoding code linear: read every field, then check
//! [`NboReader::has_overflow`] once at the end.
//!
//! Strings are an `i32` byte length followed by UTF-8 bytes. Blobs are a
//! `u32` length followed by raw bytes.

use crate::ProtocolError;

/// Largest beacon packet we ever build or accept.
pub const MAX_PACKET_SIZE: usize = 512;

/// Types that can write themselves into an [`NboWriter`].
pub trait WireEncode {
    fn encode(&self, w: &mut NboWriter);
}

/// Types that can read themselves out of an [`NboReader`].
///
/// Decoding never fails outright. On malformed input the reader's overflow
/// flag is raised and the returned value is partially defaulted; the caller
/// decides whether that poisons the whole message.
pub trait WireDecode: Sized {
    fn decode(r: &mut NboReader<'_>) -> Self;
}

// ---------------------------------------------------------------------------
// NboWriter
// ---------------------------------------------------------------------------

/// A bounded big-endian byte writer.
#[derive(Debug, Clone)]
pub struct NboWriter {
    buf: Vec<u8>,
    limit: usize,
    overflow: bool,
}

impl Default for NboWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl NboWriter {
    /// Creates a writer limited to [`MAX_PACKET_SIZE`] bytes.
    pub fn new() -> Self {
        Self::with_limit(MAX_PACKET_SIZE)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit.min(MAX_PACKET_SIZE)),
            limit,
            overflow: false,
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        if self.overflow {
            return;
        }
        if self.buf.len() + bytes.len() > self.limit {
            self.overflow = true;
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.put(&[v]);
        self
    }

    /// Booleans travel as a single `0`/`1` byte.
    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(u8::from(v))
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.put(&v.to_be_bytes());
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.put(&v.to_be_bytes());
        self
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.put(&v.to_be_bytes());
        self
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.put(&v.to_be_bytes());
        self
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.put(&v.to_be_bytes());
        self
    }

    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.put(&v.to_bits().to_be_bytes());
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.put(&v.to_bits().to_be_bytes());
        self
    }

    /// Writes an `i32` byte length followed by the UTF-8 bytes.
    pub fn write_str(&mut self, v: &str) -> &mut Self {
        match i32::try_from(v.len()) {
            Ok(len) => {
                self.write_i32(len);
                self.put(v.as_bytes());
            }
            Err(_) => self.overflow = true,
        }
        self
    }

    /// Writes a `u32` byte length followed by the raw bytes.
    pub fn write_blob(&mut self, v: &[u8]) -> &mut Self {
        match u32::try_from(v.len()) {
            Ok(len) => {
                self.write_u32(len);
                self.put(v);
            }
            Err(_) => self.overflow = true,
        }
        self
    }

    /// Appends raw bytes with no length prefix.
    pub fn write_raw(&mut self, v: &[u8]) -> &mut Self {
        self.put(v);
        self
    }

    pub fn write<T: WireEncode + ?Sized>(&mut self, v: &T) -> &mut Self {
        v.encode(self);
        self
    }

    pub fn has_overflow(&self) -> bool {
        self.overflow
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finishes the packet.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Overflow`] if any write was refused. A
    /// truncated packet is never handed to the network.
    pub fn finish(self) -> Result<Vec<u8>, ProtocolError> {
        if self.overflow {
            return Err(ProtocolError::Overflow { limit: self.limit });
        }
        Ok(self.buf)
    }
}

// ---------------------------------------------------------------------------
// NboReader
// ---------------------------------------------------------------------------

/// A big-endian reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct NboReader<'a> {
    buf: &'a [u8],
    pos: usize,
    overflow: bool,
}

impl<'a> NboReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            overflow: false,
        }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.overflow {
            return None;
        }
        match self.pos.checked_add(n) {
            Some(end) if end <= self.buf.len() => {
                let out = &self.buf[self.pos..end];
                self.pos = end;
                Some(out)
            }
            _ => {
                self.overflow = true;
                None
            }
        }
    }

    fn take_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(bytes) = self.take(N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    pub fn read_u8(&mut self) -> u8 {
        self.take_array::<1>()[0]
    }

    /// Any non-zero byte reads as `true`.
    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    pub fn read_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take_array())
    }

    pub fn read_i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take_array())
    }

    pub fn read_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take_array())
    }

    pub fn read_i64(&mut self) -> i64 {
        i64::from_be_bytes(self.take_array())
    }

    pub fn read_u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take_array())
    }

    pub fn read_f32(&mut self) -> f32 {
        f32::from_bits(self.read_u32())
    }

    pub fn read_f64(&mut self) -> f64 {
        f64::from_bits(self.read_u64())
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// A negative length, a length past the end of the buffer, or invalid
    /// UTF-8 raises the overflow flag and yields an empty string.
    pub fn read_string(&mut self) -> String {
        let len = self.read_i32();
        let Ok(len) = usize::try_from(len) else {
            self.overflow = true;
            return String::new();
        };
        match self.take(len).map(std::str::from_utf8) {
            Some(Ok(s)) => s.to_owned(),
            Some(Err(_)) => {
                self.overflow = true;
                String::new()
            }
            None => String::new(),
        }
    }

    pub fn read_blob(&mut self) -> Vec<u8> {
        let len = self.read_u32() as usize;
        self.take(len).map(<[u8]>::to_vec).unwrap_or_default()
    }

    pub fn read<T: WireDecode>(&mut self) -> T {
        T::decode(self)
    }

    pub fn has_overflow(&self) -> bool {
        self.overflow
    }

    /// Raises the overflow flag without consuming anything.
    pub fn poison(&mut self) {
        self.overflow = true;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_big_endian_layout() {
        let mut w = NboWriter::new();
        w.write_u16(0x0102).write_i32(-2).write_u64(1);
        assert_eq!(
            w.as_bytes(),
            &[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_writer_string_has_i32_length_prefix() {
        let mut w = NboWriter::new();
        w.write_str("hi");
        assert_eq!(w.as_bytes(), &[0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_writer_overflow_is_sticky() {
        let mut w = NboWriter::with_limit(4);
        w.write_u32(7);
        assert!(!w.has_overflow());

        w.write_u8(1);
        assert!(w.has_overflow());
        assert_eq!(w.len(), 4, "refused write must not land partially");

        assert!(matches!(
            w.finish(),
            Err(ProtocolError::Overflow { limit: 4 })
        ));
    }

    #[test]
    fn test_writer_refused_write_blocks_later_small_writes() {
        let mut w = NboWriter::with_limit(3);
        w.write_u32(1);
        w.write_u8(1);
        assert!(w.is_empty());
        assert!(w.has_overflow());
    }

    #[test]
    fn test_reader_reads_fields_in_order() {
        let mut w = NboWriter::new();
        w.write_u8(9)
            .write_bool(true)
            .write_i64(-5)
            .write_f32(1.5)
            .write_f64(-0.25)
            .write_str("lobby")
            .write_blob(&[1, 2, 3]);
        let bytes = w.finish().unwrap();

        let mut r = NboReader::new(&bytes);
        assert_eq!(r.read_u8(), 9);
        assert!(r.read_bool());
        assert_eq!(r.read_i64(), -5);
        assert_eq!(r.read_f32(), 1.5);
        assert_eq!(r.read_f64(), -0.25);
        assert_eq!(r.read_string(), "lobby");
        assert_eq!(r.read_blob(), vec![1, 2, 3]);
        assert!(!r.has_overflow());
        assert!(r.remaining().is_empty());
    }

    #[test]
    fn test_reader_past_end_sets_overflow_and_defaults() {
        let mut r = NboReader::new(&[0, 1]);
        assert_eq!(r.read_u32(), 0);
        assert!(r.has_overflow());
        // Sticky: the two bytes that are there are not handed out.
        assert_eq!(r.read_u8(), 0);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_reader_negative_string_length_sets_overflow() {
        let bytes = (-1i32).to_be_bytes();
        let mut r = NboReader::new(&bytes);
        assert_eq!(r.read_string(), "");
        assert!(r.has_overflow());
    }

    #[test]
    fn test_reader_string_length_past_end_sets_overflow() {
        let mut w = NboWriter::new();
        w.write_i32(50).write_raw(b"short");
        let bytes = w.finish().unwrap();

        let mut r = NboReader::new(&bytes);
        assert_eq!(r.read_string(), "");
        assert!(r.has_overflow());
    }

    #[test]
    fn test_reader_invalid_utf8_sets_overflow() {
        let mut w = NboWriter::new();
        w.write_i32(2).write_raw(&[0xC3, 0x28]);
        let bytes = w.finish().unwrap();

        let mut r = NboReader::new(&bytes);
        assert_eq!(r.read_string(), "");
        assert!(r.has_overflow());
    }
}
