//! Ingestion: candidate files from the picker or a drop, image sources and
//! their decoding into bitmaps.

use base64::Engine as _;
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::color::Color;
use crate::{Error, Result};

/// A file offered by the file picker or by a drag-and-drop.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`. May be empty.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), media_type: media_type.into(), bytes }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { media_type: media_type_for(path).to_string(), name, bytes })
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Guess a media type from a file extension. Unknown extensions map to
/// `application/octet-stream` so they are filtered out on ingestion.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Keep only entries whose declared media type starts with `image/`.
/// Everything else is skipped without an error.
pub fn accept_images(files: Vec<CandidateFile>) -> Vec<ImageSource> {
    files
        .into_iter()
        .filter_map(|f| {
            if f.is_image() {
                Some(ImageSource::from(f))
            } else {
                log::debug!("skipping non-image file {:?} ({})", f.name, f.media_type);
                None
            }
        })
        .collect()
}

/// The displayable source of an image item. Bytes are shared so the source can
/// be handed to decode tasks without copying.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub media_type: String,
    bytes: Arc<[u8]>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), media_type: media_type.into(), bytes: bytes.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `data:` URL of the source, as a file reader would hand it to an `<img>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Short content fingerprint (first 12 hex digits of the SHA-256).
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex::encode(&digest[..6])
    }
}

impl From<CandidateFile> for ImageSource {
    fn from(f: CandidateFile) -> Self {
        Self::new(f.name, f.media_type, f.bytes)
    }
}

/// A fully decoded RGBA bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    rgba: Vec<u8>,
}

impl Bitmap {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(Error::DecodeError(format!(
                "bitmap {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// A bitmap filled with one opaque color.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let rgba = [color.r, color.g, color.b, 255].repeat(width as usize * height as usize);
        Self { width, height, rgba }
    }

    pub fn is_empty(&self) -> bool {
        self.rgba.is_empty()
    }

    /// Pixels as `[r, g, b, a]` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.rgba.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba[i..i + 4].copy_from_slice(&rgba);
    }
}

/// Turns an image source into a bitmap. One-shot and asynchronous; the
/// returned future must not borrow the decoder.
pub trait Decoder: Send + Sync {
    fn decode(&self, source: &ImageSource) -> BoxFuture<'static, Result<Bitmap>>;
}

/// Decoder backed by the `image` crate. Decoding runs on the blocking pool.
#[cfg(feature = "decode")]
#[derive(Debug, Default, Clone)]
pub struct ImageDecoder;

#[cfg(feature = "decode")]
impl ImageDecoder {
    pub fn new() -> Self {
        ImageDecoder
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Bitmap> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Bitmap::from_rgba(width, height, img.into_raw())
    }
}

#[cfg(feature = "decode")]
impl Decoder for ImageDecoder {
    fn decode(&self, source: &ImageSource) -> BoxFuture<'static, Result<Bitmap>> {
        let bytes = Arc::clone(&source.bytes);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || ImageDecoder::decode_bytes(&bytes))
                .await
                .map_err(|e| Error::DecodeError(format!("decode task failed: {}", e)))?
        })
    }
}
