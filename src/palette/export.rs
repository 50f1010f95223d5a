//! Palette export as a standalone SVG document.

use base64::Engine as _;
use std::fmt::Write as _;

use super::Palette;
use crate::platform::DownloadSink;
use crate::Result;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const PALETTE_FILENAME: &str = "palette.svg";
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// One `swatch`×`swatch` rect per color, left to right, no gaps, no stroke.
/// Total size is `swatch * len` by `swatch`.
pub fn to_vector_document(palette: &Palette, swatch: u32) -> Vec<u8> {
    let width = swatch as usize * palette.len();
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="{}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        SVG_NS, width, swatch, width, swatch
    );
    for (i, color) in palette.colors().iter().enumerate() {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="0" width="{}" height="{}" fill="{}"/>"#,
            i * swatch as usize,
            swatch,
            swatch,
            color.to_hex()
        );
    }
    svg.push_str("</svg>");
    svg.into_bytes()
}

/// A transient download handle over an in-memory document. It must be
/// released once the sink has been triggered.
#[derive(Debug)]
pub struct DownloadHandle {
    pub filename: String,
    pub media_type: String,
    url: Option<String>,
    bytes: Vec<u8>,
}

impl DownloadHandle {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = media_type.into();
        let url = format!(
            "data:{};base64,{}",
            media_type,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        Self { filename: filename.into(), media_type, url: Some(url), bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The URL the handle exposes while it is live.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.url.is_none()
    }

    pub fn release(&mut self) {
        self.url = None;
    }
}

/// Offer a document for download: build the handle, trigger the sink, then
/// release the handle whether or not the sink succeeded.
pub fn offer_download(sink: &dyn DownloadSink, filename: &str, media_type: &str, bytes: Vec<u8>) -> Result<()> {
    let mut handle = DownloadHandle::new(filename, media_type, bytes);
    let res = sink.trigger(&handle);
    handle.release();
    log::debug!("released download handle for {}", filename);
    res
}
