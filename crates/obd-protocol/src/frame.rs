//! Multi-Frame Response Demultiplexing
//!
//! With headers enabled the adapter prints each ISO-TP consecutive frame as
//! the responding ECU address followed by the frame sequence digit, then the
//! frame payload. Frames are delimited by locating those markers.

use crate::error::DecodeError;
use std::fmt;

/// ECU address + frame index literal that opens a sub-frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameMarker(pub &'static str);

impl FrameMarker {
    /// Marker text as it appears in the response
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Marker length in characters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty marker
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Frame payload with its marker stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSegment<'a> {
    pub marker: FrameMarker,
    pub data: &'a str,
}

impl<'a> FrameSegment<'a> {
    /// True when the marker is not followed by any data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte at `index`, reading hex-character pairs from the segment start
    pub fn byte(&self, index: usize) -> Result<u8, DecodeError> {
        let text = self.byte_text(index)?;
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(self.malformed(index, text));
        }
        u8::from_str_radix(text, 16).map_err(|_| self.malformed(index, text))
    }

    /// Raw two-character text at byte `index`
    pub fn byte_text(&self, index: usize) -> Result<&'a str, DecodeError> {
        let start = index * 2;
        self.data
            .get(start..start + 2)
            .ok_or(DecodeError::SegmentTooShort {
                marker: self.marker.as_str(),
                offset: index,
            })
    }

    /// Big-endian unsigned integer over `count` bytes starting at `index`
    pub fn uint_be(&self, index: usize, count: usize) -> Result<u32, DecodeError> {
        (index..index + count).try_fold(0u32, |acc, i| Ok((acc << 8) | self.byte(i)? as u32))
    }

    fn malformed(&self, index: usize, text: &str) -> DecodeError {
        DecodeError::MalformedHex {
            marker: self.marker.as_str(),
            offset: index,
            text: text.to_string(),
        }
    }
}

/// Extent of the final frame, which has no closing marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalFrame {
    /// Last marker only closes the previous frame
    Closing,
    /// Fixed window of this many characters, marker included
    Window(usize),
}

/// Split `response` into per-marker segments
///
/// Each marker is searched for from the end of the previous one, taking the
/// first occurrence. A missing marker yields `MissingMarker` and no segments
/// at all. With `FinalFrame::Closing`, N markers produce N-1 segments; with a
/// window they produce N, the last one clipped to the end of the response.
pub fn demux<'a>(
    response: &'a str,
    markers: &[FrameMarker],
    last: FinalFrame,
) -> Result<Vec<FrameSegment<'a>>, DecodeError> {
    let mut starts = Vec::with_capacity(markers.len());
    let mut cursor = 0;
    for marker in markers {
        let found = response
            .get(cursor..)
            .and_then(|rest| rest.find(marker.as_str()))
            .ok_or(DecodeError::MissingMarker(marker.as_str()))?;
        let start = cursor + found;
        starts.push(start);
        cursor = start + marker.len();
    }

    let mut segments: Vec<FrameSegment<'a>> = markers
        .windows(2)
        .zip(starts.windows(2))
        .map(|(pair, bounds)| FrameSegment {
            marker: pair[0],
            data: &response[bounds[0] + pair[0].len()..bounds[1]],
        })
        .collect();

    if let (FinalFrame::Window(width), Some(marker), Some(&start)) =
        (last, markers.last(), starts.last())
    {
        let data_start = start + marker.len();
        let end = (start + width).clamp(data_start, response.len());
        segments.push(FrameSegment {
            marker: *marker,
            data: response.get(data_start..end).unwrap_or(""),
        });
    }

    Ok(segments)
}
