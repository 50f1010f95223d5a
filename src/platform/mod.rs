//! Platform surface: clipboard and file downloads
//!
//! These are the side-effecting services the board talks to. Each comes as a
//! trait plus an in-memory implementation that records what it was asked to
//! do, which is what tests and the headless CLI use.

pub mod clipboard;
pub mod download;

pub use clipboard::{Clipboard, MemoryClipboard};
pub use download::{DirectorySink, DownloadSink, MemorySink};
