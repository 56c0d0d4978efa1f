//! # Decoder Boundary
//!
//! The barcode decoding algorithm is an opaque capability plugged in
//! through [`Decoder`]. This module only fixes what the pipeline sees:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decoder result                          pipeline sees                 │
//! │  ──────────────                          ─────────────                 │
//! │  Ok(Some("4006381333931"))          ──►  Some("4006381333931")         │
//! │  Ok(Some(""))                       ──►  None   (no detection)         │
//! │  Ok(None)                           ──►  None   (no detection)         │
//! │  Err(DecodeError)                   ──►  None   (logged at trace)      │
//! │  panic                              ──►  None   (logged at debug)      │
//! │  frame without image data           ──►  None   (decoder not called)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::frame::Frame;

/// Turns a frame into at most one barcode value.
///
/// Implementations must not keep state between frames that affects the
/// result.
pub trait Decoder: Send + 'static {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError>;
}

impl<F> Decoder for F
where
    F: Fn(&Frame) -> Result<Option<String>, DecodeError> + Send + 'static,
{
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
        self(frame)
    }
}

/// Picks the value a multi-result decoder reports: the first one found.
///
/// An empty first value counts as no detection; later values are not
/// consulted.
pub fn first_value<I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    values.into_iter().next().filter(|value| !value.is_empty())
}

/// Runs `decoder` on `frame`, folding every failure into "no detection".
pub fn decode_frame(decoder: &dyn Decoder, frame: &Frame) -> Option<String> {
    if frame.pixels().is_none() {
        trace!("Frame has no image data, skipping decode");
        return None;
    }

    match catch_unwind(AssertUnwindSafe(|| decoder.decode(frame))) {
        Ok(Ok(value)) => value.filter(|v| !v.is_empty()),
        Ok(Err(e)) => {
            trace!(error = %e, "Decode failed");
            None
        }
        Err(_) => {
            debug!("Decoder panicked, frame treated as no detection");
            None
        }
    }
}

// =============================================================================
// Payload Decoder
// =============================================================================

/// Decoder for synthetic frames whose pixel buffer is UTF-8 text with one
/// code per line, as produced by test rigs and the `replay` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadDecoder;

impl Decoder for PayloadDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
        let pixels = frame
            .pixels()
            .ok_or_else(|| DecodeError::UnreadableFrame("no image data".into()))?;
        let text = std::str::from_utf8(pixels)
            .map_err(|e| DecodeError::UnreadableFrame(e.to_string()))?;

        Ok(first_value(text.lines().map(|line| line.trim().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rotation;

    fn text_frame(text: &str) -> Frame {
        Frame::new(text.as_bytes().to_vec(), 1, 1, Rotation::Deg0)
    }

    #[test]
    fn test_first_value() {
        assert_eq!(
            first_value(vec!["a".to_string(), "b".to_string()]),
            Some("a".to_string())
        );
        assert_eq!(first_value(vec![String::new(), "b".to_string()]), None);
        assert_eq!(first_value(Vec::<String>::new()), None);
    }

    #[test]
    fn test_payload_decoder_takes_first_line() {
        let frame = text_frame("4006381333931\n5901234123457\n");
        assert_eq!(
            decode_frame(&PayloadDecoder, &frame),
            Some("4006381333931".to_string())
        );
    }

    #[test]
    fn test_empty_result_is_no_detection() {
        let decoder = |_: &Frame| -> Result<Option<String>, DecodeError> { Ok(Some(String::new())) };
        assert_eq!(decode_frame(&decoder, &text_frame("x")), None);
        assert_eq!(decode_frame(&PayloadDecoder, &text_frame("")), None);
    }

    #[test]
    fn test_errors_are_swallowed() {
        let invalid_utf8 = Frame::new(vec![0xff, 0xfe], 1, 1, Rotation::Deg0);
        assert_eq!(decode_frame(&PayloadDecoder, &invalid_utf8), None);

        let failing = |_: &Frame| -> Result<Option<String>, DecodeError> {
            Err(DecodeError::DecoderFailed("model not loaded".into()))
        };
        assert_eq!(decode_frame(&failing, &text_frame("x")), None);
    }

    #[test]
    fn test_panics_are_swallowed() {
        let panicking = |_: &Frame| -> Result<Option<String>, DecodeError> { panic!("boom") };
        assert_eq!(decode_frame(&panicking, &text_frame("x")), None);
    }

    #[test]
    fn test_frame_without_image_skips_decoder() {
        let decoder = |_: &Frame| -> Result<Option<String>, DecodeError> {
            panic!("must not be called")
        };
        let frame = Frame::without_image(1, 1, Rotation::Deg0);
        assert_eq!(decode_frame(&decoder, &frame), None);
    }
}
