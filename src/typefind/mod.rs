//! Initial media type detection
//!
//! The container is recognised from the first bytes of the input; the
//! elementary streams inside it are read with symphonia.

pub mod symphonia;

pub use self::symphonia::scan_streams;

use crate::core::{Caps, Structure, Value};
use crate::error::{AutoplugError, AutoplugResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes read from the head of a file for sniffing
const SNIFF_LEN: usize = 4096;

/// Result of type finding on one input
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Type of the whole input, as produced by the source pad
    pub caps: Caps,
    /// Elementary streams found inside, in track order
    pub streams: Vec<Caps>,
}

impl MediaInfo {
    /// Detection result for an input known only by its type
    pub fn new(caps: Caps) -> Self {
        MediaInfo {
            caps,
            streams: Vec::new(),
        }
    }

    /// Add an elementary stream
    pub fn with_stream(mut self, caps: Caps) -> Self {
        self.streams.push(caps);
        self
    }
}

/// Detect the container or stream type from a file's leading bytes
pub fn sniff(data: &[u8]) -> Option<Caps> {
    if data.starts_with(b"OggS") {
        return Some(Caps::new_simple("application/ogg"));
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") {
        return match &data[8..12] {
            b"WAVE" => Some(Caps::new_simple("audio/x-wav")),
            b"AVI " => Some(Caps::new_simple("video/x-msvideo")),
            _ => None,
        };
    }
    if data.starts_with(b"fLaC") {
        return Some(Caps::from_structures(vec![
            Structure::new("audio/x-flac").with_field("framed", Value::Bool(false)),
        ]));
    }
    if data.starts_with(b"ID3") {
        return Some(Caps::new_simple("application/x-id3"));
    }
    if data.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]) {
        let webm = data.windows(4).any(|w| w == b"webm");
        return Some(Caps::new_simple(if webm { "video/webm" } else { "video/x-matroska" }));
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        let media_type = match &data[8..12] {
            b"M4A " | b"M4B " => "audio/x-m4a",
            b"3gp4" | b"3gp5" | b"3gp6" => "application/x-3gp",
            _ => "video/quicktime",
        };
        return Some(Caps::new_simple(media_type));
    }
    sniff_mpeg_audio(data)
}

/// ADTS AAC or MPEG-1/2 audio frame sync
fn sniff_mpeg_audio(data: &[u8]) -> Option<Caps> {
    let [first, second, ..] = *data else {
        return None;
    };
    if first != 0xff || second & 0xe0 != 0xe0 {
        return None;
    }

    let layer_bits = (second >> 1) & 0x03;
    if layer_bits == 0 {
        // ADTS: 12 sync bits, ID bit selects MPEG-2 or MPEG-4
        if second & 0xf0 != 0xf0 {
            return None;
        }
        let version = if second & 0x08 == 0 { 4 } else { 2 };
        return Some(Caps::from_structures(vec![
            Structure::new("audio/mpeg")
                .with_field("mpegversion", Value::Int(version))
                .with_field("stream-format", Value::Str("adts".to_string()))
                .with_field("framed", Value::Bool(false)),
        ]));
    }

    // reserved version
    if (second >> 3) & 0x03 == 0x01 {
        return None;
    }
    let layer = 4 - i64::from(layer_bits);
    Some(Caps::from_structures(vec![
        Structure::new("audio/mpeg")
            .with_field("mpegversion", Value::Int(1))
            .with_field("layer", Value::Int(layer))
            .with_field("parsed", Value::Bool(false)),
    ]))
}

/// Detect the type of a file and the streams it carries
pub fn type_find_file<P: AsRef<Path>>(path: P) -> AutoplugResult<MediaInfo> {
    let path = path.as_ref();

    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;

    let sniffed = sniff(&head);
    let streams = match scan_streams(path) {
        Ok(streams) => streams,
        Err(e) => {
            log::debug!("Stream scan of {} failed: {}", path.display(), e);
            Vec::new()
        }
    };

    let caps = match sniffed {
        Some(caps) => caps,
        None => streams
            .first()
            .cloned()
            .ok_or_else(|| AutoplugError::TypeNotFound(path.display().to_string()))?,
    };
    log::debug!(
        "{} has type {} with {} stream(s)",
        path.display(),
        caps,
        streams.len()
    );

    Ok(MediaInfo { caps, streams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MediaKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn media_type(data: &[u8]) -> Option<String> {
        sniff(data).and_then(|c| c.media_type().map(str::to_owned))
    }

    #[test]
    fn test_sniff_containers() {
        assert_eq!(media_type(b"OggS\0\x02rest").as_deref(), Some("application/ogg"));
        assert_eq!(media_type(b"RIFF\x24\0\0\0WAVEfmt ").as_deref(), Some("audio/x-wav"));
        assert_eq!(media_type(b"RIFF\x24\0\0\0AVI LIST").as_deref(), Some("video/x-msvideo"));
        assert_eq!(media_type(b"fLaC\0\0\0\x22").as_deref(), Some("audio/x-flac"));
        assert_eq!(media_type(b"ID3\x04\0\0").as_deref(), Some("application/x-id3"));
        assert_eq!(
            media_type(b"\x1a\x45\xdf\xa3\x9f\x42\x82\x84webm").as_deref(),
            Some("video/webm")
        );
        assert_eq!(
            media_type(b"\x1a\x45\xdf\xa3\x9f\x42\x82\x88matroska").as_deref(),
            Some("video/x-matroska")
        );
        assert_eq!(media_type(b"\0\0\0\x20ftypM4A \0\0").as_deref(), Some("audio/x-m4a"));
        assert_eq!(media_type(b"\0\0\0\x20ftypisom\0\0").as_deref(), Some("video/quicktime"));
    }

    #[test]
    fn test_sniff_mpeg_audio() {
        let mp3 = sniff(&[0xff, 0xfb, 0x90, 0x64]).unwrap();
        assert_eq!(
            mp3.to_string(),
            "audio/mpeg, mpegversion=(int)1, layer=(int)3, parsed=(boolean)false"
        );
        let mp2 = sniff(&[0xff, 0xfd, 0x90, 0x64]).unwrap();
        assert_eq!(mp2.structures()[0].get("layer"), Some(&Value::Int(2)));

        let adts = sniff(&[0xff, 0xf1, 0x50, 0x80]).unwrap();
        assert_eq!(adts.structures()[0].get("mpegversion"), Some(&Value::Int(4)));
        assert_eq!(adts.kind(), MediaKind::Audio);
    }

    #[test]
    fn test_sniff_unknown() {
        assert!(sniff(b"").is_none());
        assert!(sniff(b"hello world").is_none());
        assert!(sniff(b"RIFF\0\0\0\0XXXX").is_none());
        assert!(sniff(&[0xff]).is_none());
    }

    #[test]
    fn test_type_find_file_uses_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"OggS\0\x02\0\0\0\0\0\0\0\0").unwrap();

        let media = type_find_file(file.path()).unwrap();
        assert_eq!(media.caps, Caps::new_simple("application/ogg"));
        assert!(media.streams.is_empty());
    }

    #[test]
    fn test_type_find_file_unknown() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not media").unwrap();

        assert!(matches!(
            type_find_file(file.path()),
            Err(AutoplugError::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_type_find_missing_file() {
        assert!(matches!(
            type_find_file("/nonexistent/file.ogg"),
            Err(AutoplugError::Io(_))
        ));
    }
}
