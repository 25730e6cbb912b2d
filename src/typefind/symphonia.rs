use crate::core::{Caps, Structure, Value};
use crate::error::AutoplugResult;
use std::fs::File;
use std::path::Path;
use symphonia::core::codecs::{self, CodecParameters, CodecType};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Read the elementary streams of a file with Symphonia.
///
/// Tracks whose codec has no caps equivalent are skipped.
pub fn scan_streams<P: AsRef<Path>>(path: P) -> AutoplugResult<Vec<Caps>> {
    let path = path.as_ref();

    let file = Box::new(File::open(path)?);
    let mss = MediaSourceStream::new(file, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let opened = symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)?;

    let streams = opened
        .format
        .tracks()
        .iter()
        .filter_map(|track| {
            let caps = codec_caps(&track.codec_params);
            if caps.is_none() {
                log::debug!(
                    "Track {} of {} has unmapped codec {:?}",
                    track.id,
                    path.display(),
                    track.codec_params.codec
                );
            }
            caps
        })
        .collect();

    Ok(streams)
}

/// Caps for a Symphonia codec, with `rate` and `channels` when known
pub fn codec_caps(params: &CodecParameters) -> Option<Caps> {
    let mut structure = codec_structure(params.codec)?;

    if let Some(rate) = params.sample_rate {
        structure.set("rate", Value::Int(i64::from(rate)));
    }
    if let Some(channels) = params.channels {
        structure.set("channels", Value::Int(channels.count() as i64));
    }
    Some(Caps::from_structures(vec![structure]))
}

fn codec_structure(codec: CodecType) -> Option<Structure> {
    let mpeg = |layer: i64| {
        Structure::new("audio/mpeg")
            .with_field("mpegversion", Value::Int(1))
            .with_field("layer", Value::Int(layer))
    };
    let raw = |format: &str| {
        Structure::new("audio/x-raw")
            .with_field("format", Value::Str(format.to_string()))
            .with_field("layout", Value::Str("interleaved".to_string()))
    };

    let structure = match codec {
        codecs::CODEC_TYPE_MP3 => mpeg(3),
        codecs::CODEC_TYPE_MP2 => mpeg(2),
        codecs::CODEC_TYPE_MP1 => mpeg(1),
        codecs::CODEC_TYPE_AAC => Structure::new("audio/mpeg").with_field("mpegversion", Value::Int(4)),
        codecs::CODEC_TYPE_FLAC => Structure::new("audio/x-flac"),
        codecs::CODEC_TYPE_VORBIS => Structure::new("audio/x-vorbis"),
        codecs::CODEC_TYPE_OPUS => Structure::new("audio/x-opus"),
        codecs::CODEC_TYPE_PCM_ALAW => Structure::new("audio/x-alaw"),
        codecs::CODEC_TYPE_PCM_MULAW => Structure::new("audio/x-mulaw"),
        codecs::CODEC_TYPE_PCM_U8 => raw("U8"),
        codecs::CODEC_TYPE_PCM_S16LE => raw("S16LE"),
        codecs::CODEC_TYPE_PCM_S16BE => raw("S16BE"),
        codecs::CODEC_TYPE_PCM_S24LE => raw("S24LE"),
        codecs::CODEC_TYPE_PCM_S32LE => raw("S32LE"),
        codecs::CODEC_TYPE_PCM_F32LE => raw("F32LE"),
        codecs::CODEC_TYPE_PCM_F64LE => raw("F64LE"),
        _ => return None,
    };
    Some(structure)
}
