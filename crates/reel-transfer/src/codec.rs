//! Length-prefixed frame codec.
//!
//! Wire layout of one frame (integers big-endian):
//!
//! ```text
//! u32 header_len | header JSON {"filename", "hash"} | u32 data_len | data
//! ```
//!
//! An upload is a concatenation of frames in a single request body.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use reel_models::{Frame, FrameHeader};

use crate::error::{TransferError, TransferResult};

/// Maximum encoded header size.
pub const MAX_HEADER_LEN: usize = 4 * 1024;

/// Maximum payload bytes carried by one frame.
pub const MAX_CHUNK_LEN: usize = 8 * 1024 * 1024;

/// Chunk size used by producers when streaming a file.
pub const DEFAULT_CHUNK_LEN: usize = 64 * 1024;

const LEN_PREFIX: usize = 4;

/// Encode a frame into its wire representation.
pub fn encode_frame(frame: &Frame) -> TransferResult<Bytes> {
    let header = serde_json::to_vec(&frame.header())?;
    if header.len() > MAX_HEADER_LEN {
        return Err(TransferError::HeaderTooLarge {
            len: header.len(),
            max: MAX_HEADER_LEN,
        });
    }
    if frame.data.len() > MAX_CHUNK_LEN {
        return Err(TransferError::ChunkTooLarge {
            len: frame.data.len(),
            max: MAX_CHUNK_LEN,
        });
    }

    let mut buf = BytesMut::with_capacity(LEN_PREFIX * 2 + header.len() + frame.data.len());
    buf.put_u32(header.len() as u32);
    buf.put_slice(&header);
    buf.put_u32(frame.data.len() as u32);
    buf.put_slice(&frame.data);
    Ok(buf.freeze())
}

/// Incremental decoder for a stream of frames.
///
/// Input may arrive split at arbitrary byte boundaries.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes received but not yet consumed by a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> TransferResult<Option<Frame>> {
        if self.buf.len() < LEN_PREFIX {
            return Ok(None);
        }

        let header_len = (&self.buf[..LEN_PREFIX]).get_u32() as usize;
        if header_len > MAX_HEADER_LEN {
            return Err(TransferError::HeaderTooLarge {
                len: header_len,
                max: MAX_HEADER_LEN,
            });
        }

        let data_len_at = LEN_PREFIX + header_len;
        if self.buf.len() < data_len_at + LEN_PREFIX {
            return Ok(None);
        }

        let data_len = (&self.buf[data_len_at..data_len_at + LEN_PREFIX]).get_u32() as usize;
        if data_len > MAX_CHUNK_LEN {
            return Err(TransferError::ChunkTooLarge {
                len: data_len,
                max: MAX_CHUNK_LEN,
            });
        }

        let frame_len = data_len_at + LEN_PREFIX + data_len;
        if self.buf.len() < frame_len {
            return Ok(None);
        }

        let mut raw = self.buf.split_to(frame_len);
        raw.advance(LEN_PREFIX);
        let header_bytes = raw.split_to(header_len);
        raw.advance(LEN_PREFIX);

        let header: FrameHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| TransferError::InvalidHeader(e.to_string()))?;

        Ok(Some(Frame {
            filename: header.filename,
            hash: header.hash,
            data: raw.freeze(),
        }))
    }

    /// Signal end of input. Leftover bytes mean the last frame was cut short.
    pub fn finish(self) -> TransferResult<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(TransferError::TruncatedFrame {
                remaining: self.buf.len(),
            })
        }
    }
}
