//! Server-side reassembly of an upload stream.

use bytes::{Bytes, BytesMut};
use reel_models::{is_safe_filename, Fingerprint, Frame};

use crate::error::{TransferError, TransferResult};

/// A fully received upload, ready for admission.
#[derive(Debug, Clone)]
pub struct AssembledUpload {
    pub filename: String,
    pub fingerprint: Fingerprint,
    pub payload: Bytes,
    pub frames: usize,
}

/// Collects frames of one upload stream.
///
/// The filename and fingerprint of the first frame are pinned; every later
/// frame must repeat them exactly.
#[derive(Debug, Default)]
pub struct UploadAssembler {
    pinned: Option<(String, Fingerprint)>,
    payload: BytesMut,
    frames: usize,
}

impl UploadAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next frame of the stream.
    pub fn push(&mut self, frame: Frame) -> TransferResult<()> {
        match &self.pinned {
            None => {
                if !is_safe_filename(&frame.filename) {
                    return Err(TransferError::InvalidFilename(frame.filename));
                }
                self.pinned = Some((frame.filename, frame.hash));
            }
            Some((filename, hash)) => {
                if *filename != frame.filename {
                    return Err(TransferError::FrameMismatch { field: "filename" });
                }
                if *hash != frame.hash {
                    return Err(TransferError::FrameMismatch { field: "hash" });
                }
            }
        }

        self.payload.extend_from_slice(&frame.data);
        self.frames += 1;
        Ok(())
    }

    /// Filename pinned by the first frame, if any frame has arrived.
    pub fn filename(&self) -> Option<&str> {
        self.pinned.as_ref().map(|(name, _)| name.as_str())
    }

    /// Bytes accumulated so far.
    pub fn received_bytes(&self) -> usize {
        self.payload.len()
    }

    /// Close the stream.
    pub fn finish(self) -> TransferResult<AssembledUpload> {
        let (filename, fingerprint) = self.pinned.ok_or(TransferError::EmptyStream)?;
        Ok(AssembledUpload {
            filename,
            fingerprint,
            payload: self.payload.freeze(),
            frames: self.frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, hash: Fingerprint, data: &'static [u8]) -> Frame {
        Frame::new(name, hash, Bytes::from_static(data))
    }

    #[test]
    fn test_assembles_payload_in_order() {
        let hash = Fingerprint::of(b"abcdef");
        let mut assembler = UploadAssembler::new();
        assembler.push(frame("a.mp4", hash, b"abc")).unwrap();
        assembler.push(frame("a.mp4", hash, b"def")).unwrap();
        assert_eq!(assembler.filename(), Some("a.mp4"));
        assert_eq!(assembler.received_bytes(), 6);

        let upload = assembler.finish().unwrap();
        assert_eq!(upload.payload.as_ref(), b"abcdef");
        assert_eq!(upload.fingerprint, hash);
        assert_eq!(upload.frames, 2);
    }

    #[test]
    fn test_trusts_pinned_hash_without_recomputing() {
        // The payload does not hash to the pinned value; the assembler does not care.
        let claimed = Fingerprint::of(b"something else");
        let mut assembler = UploadAssembler::new();
        assembler.push(frame("a.mp4", claimed, b"abc")).unwrap();
        assert_eq!(assembler.finish().unwrap().fingerprint, claimed);
    }

    #[test]
    fn test_rejects_changed_filename() {
        let hash = Fingerprint::of(b"x");
        let mut assembler = UploadAssembler::new();
        assembler.push(frame("a.mp4", hash, b"1")).unwrap();
        let err = assembler.push(frame("b.mp4", hash, b"2")).unwrap_err();
        assert!(matches!(err, TransferError::FrameMismatch { field: "filename" }));
    }

    #[test]
    fn test_rejects_changed_hash() {
        let mut assembler = UploadAssembler::new();
        assembler
            .push(frame("a.mp4", Fingerprint::of(b"x"), b"1"))
            .unwrap();
        let err = assembler
            .push(frame("a.mp4", Fingerprint::of(b"y"), b"2"))
            .unwrap_err();
        assert!(matches!(err, TransferError::FrameMismatch { field: "hash" }));
    }

    #[test]
    fn test_rejects_path_traversal() {
        let mut assembler = UploadAssembler::new();
        let err = assembler
            .push(frame("../escape.mp4", Fingerprint::of(b"x"), b"1"))
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidFilename(_)));
    }

    #[test]
    fn test_empty_stream() {
        assert!(matches!(
            UploadAssembler::new().finish(),
            Err(TransferError::EmptyStream)
        ));
    }
}
