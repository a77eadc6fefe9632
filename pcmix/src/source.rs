//! Audio source locators
//!
//! A [`Source`] names where audio comes from. Everything except an
//! already-decoded [`PcmStream`] is handed to the decoder first; the result
//! always goes through the normalizer.

use crate::audio::decoder::SimpleDecoder;
use crate::audio::normalizer::normalize;
use crate::audio::types::{CanonicalPcm, PcmStream};
use crate::error::{Error, Result};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Where to load audio from
pub enum Source {
    /// Resource name resolved against the configured resource root
    Name(String),
    /// Path on the local filesystem
    File(PathBuf),
    /// URL; only `file://` is supported
    Url(String),
    /// Encoded audio bytes from any stream
    Reader(Box<dyn Read + Send + Sync>),
    /// Audio that is already decoded
    Pcm(PcmStream),
}

impl Source {
    pub fn name(name: impl Into<String>) -> Self {
        Source::Name(name.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Source::Url(url.into())
    }

    pub fn reader(reader: impl Read + Send + Sync + 'static) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Decode (when needed) and normalize to canonical stereo.
    ///
    /// # Errors
    /// - `ResourceNotFound` if a name, file or URL does not resolve
    /// - any error from decoding or normalization
    pub fn load(self, resource_root: &Path) -> Result<CanonicalPcm> {
        debug!("Loading audio from {:?}", self);
        let stream = match self {
            Source::Name(name) => {
                let path = resolve_name(resource_root, &name)?;
                SimpleDecoder::decode_file(&path)?
            }
            Source::File(path) => {
                if !path.is_file() {
                    return Err(Error::ResourceNotFound(path.display().to_string()));
                }
                SimpleDecoder::decode_file(&path)?
            }
            Source::Url(url) => {
                let path = url_to_path(&url)?;
                SimpleDecoder::decode_file(&path)?
            }
            Source::Reader(reader) => SimpleDecoder::decode_reader(reader)?,
            Source::Pcm(stream) => stream,
        };
        normalize(stream)
    }
}

/// Strings are resource names, not paths
impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::Name(name.to_string())
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Source::Name(name)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::File(path.to_path_buf())
    }
}

impl From<PcmStream> for Source {
    fn from(stream: PcmStream) -> Self {
        Source::Pcm(stream)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Name(name) => write!(f, "Name({})", name),
            Source::File(path) => write!(f, "File({})", path.display()),
            Source::Url(url) => write!(f, "Url({})", url),
            Source::Reader(_) => write!(f, "Reader"),
            Source::Pcm(stream) => write!(f, "Pcm({})", stream.format()),
        }
    }
}

/// Resolve a resource name to an existing file under `root`
fn resolve_name(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = name.trim_start_matches('/');
    if relative.is_empty() {
        return Err(Error::InvalidArgument("Empty resource name".to_string()));
    }
    let path = root.join(relative);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ResourceNotFound(name.to_string()))
    }
}

/// Local file behind a `file:` URL (percent-encoding and a `localhost`
/// host are accepted)
fn url_to_path(url: &str) -> Result<PathBuf> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::ResourceNotFound(format!("Invalid URL {}: {}", url, e)))?;
    if parsed.scheme() != "file" {
        return Err(Error::ResourceNotFound(format!("Unsupported URL: {}", url)));
    }
    let path = parsed
        .to_file_path()
        .map_err(|()| Error::ResourceNotFound(format!("Not a local file URL: {}", url)))?;
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ResourceNotFound(url.to_string()))
    }
}
