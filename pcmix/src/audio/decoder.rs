//! Audio decoder using symphonia
//!
//! Decodes container formats (WAV, MP3, FLAC, AAC, Vorbis) into a
//! [`PcmStream`] in the codec's native sample encoding. No conversion happens
//! here; the normalizer decides how to reach the canonical format.

use crate::audio::accumulator::ByteAccumulator;
use crate::audio::types::PcmStream;
use crate::error::{Error, Result};
use pcmix_common::{PcmFormat, SampleEncoding};
use std::io::Read;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Decoder for compressed and container audio.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an audio file.
    ///
    /// The file extension is passed to the format probe as a hint.
    ///
    /// # Errors
    /// - `ResourceNotFound` if the file does not exist
    /// - `UnsupportedFormat` if no format reader or codec accepts the data
    pub fn decode_file(path: &Path) -> Result<PcmStream> {
        debug!("Decoding file: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::ResourceNotFound(path.display().to_string())
            }
            _ => Error::Io(e),
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::decode_source(Box::new(file), hint)
    }

    /// Decode from an arbitrary byte stream (no extension hint).
    pub fn decode_reader(reader: Box<dyn Read + Send + Sync>) -> Result<PcmStream> {
        Self::decode_source(Box::new(ReadOnlySource::new(reader)), Hint::new())
    }

    fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<PcmStream> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::UnsupportedFormat("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        let mut format: Option<PcmFormat> = None;
        let mut acc = ByteAccumulator::new();

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
            };

            let packet_format = native_format(&decoded);
            match format {
                None => {
                    debug!("Native format: [{}]", packet_format);
                    format = Some(packet_format);
                }
                Some(f) if f != packet_format => {
                    warn!("Skipping packet with changed format [{}]", packet_format);
                    continue;
                }
                Some(_) => {}
            }

            append_interleaved(&decoded, &mut acc);
        }

        let format = match format {
            Some(f) => f,
            None => fallback_format(&codec_params)?,
        };

        let bytes = acc.finish();
        debug!(
            "Decoded {} frames",
            bytes.len() / format.frame_size().max(1)
        );

        Ok(PcmStream::from_bytes(format, bytes))
    }
}

/// Format of an empty stream, taken from the codec parameters
fn fallback_format(
    params: &symphonia::core::codecs::CodecParameters,
) -> Result<PcmFormat> {
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| Error::UnsupportedFormat("Sample rate not found".to_string()))?;
    let channels = params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| Error::UnsupportedFormat("Channel count not found".to_string()))?;
    let bits = params.bits_per_sample.unwrap_or(16) as u16;
    Ok(PcmFormat::signed(sample_rate, bits, channels))
}

/// Describe a decoded buffer in its native encoding
fn native_format(buf: &AudioBufferRef<'_>) -> PcmFormat {
    let spec = buf.spec();
    let (bits_per_sample, encoding) = match buf {
        AudioBufferRef::U8(_) => (8, SampleEncoding::Unsigned),
        AudioBufferRef::S8(_) => (8, SampleEncoding::Signed),
        AudioBufferRef::U16(_) => (16, SampleEncoding::Unsigned),
        AudioBufferRef::S16(_) => (16, SampleEncoding::Signed),
        AudioBufferRef::U24(_) => (24, SampleEncoding::Unsigned),
        AudioBufferRef::S24(_) => (24, SampleEncoding::Signed),
        AudioBufferRef::U32(_) => (32, SampleEncoding::Unsigned),
        AudioBufferRef::S32(_) => (32, SampleEncoding::Signed),
        AudioBufferRef::F32(_) => (32, SampleEncoding::Float),
        AudioBufferRef::F64(_) => (64, SampleEncoding::Float),
    };
    PcmFormat {
        sample_rate: spec.rate,
        bits_per_sample,
        channels: spec.channels.count() as u16,
        encoding,
        big_endian: false,
    }
}

/// Append a planar buffer to the accumulator as interleaved little-endian
fn append_interleaved(buf: &AudioBufferRef<'_>, acc: &mut ByteAccumulator) {
    match buf {
        AudioBufferRef::U8(b) => write_planar(&**b, acc, |s, a| a.push(s)),
        AudioBufferRef::S8(b) => write_planar(&**b, acc, |s, a| a.push(s as u8)),
        AudioBufferRef::U16(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
        AudioBufferRef::S16(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
        AudioBufferRef::U24(b) => {
            write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.inner().to_le_bytes()[..3]))
        }
        AudioBufferRef::S24(b) => {
            write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.inner().to_le_bytes()[..3]))
        }
        AudioBufferRef::U32(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
        AudioBufferRef::S32(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
        AudioBufferRef::F32(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
        AudioBufferRef::F64(b) => write_planar(&**b, acc, |s, a| a.extend_from_slice(&s.to_le_bytes())),
    }
}

fn write_planar<S, F>(buf: &AudioBuffer<S>, acc: &mut ByteAccumulator, write: F)
where
    S: Sample,
    F: Fn(S, &mut ByteAccumulator),
{
    let channels = buf.spec().channels.count();
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            write(buf.chan(ch)[frame], acc);
        }
    }
}
