/// Append-only little-endian byte sink for finished vertex data.
#[derive(Default, Debug)]
pub struct BufferWriter {
    bytes: Vec<u8>,
}

impl BufferWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}
