//! Board controller: the single owner of the board.
//!
//! User actions are methods on [`BoardController`]. Every asynchronous piece
//! of work (decoding, quantization, clipboard writes, acknowledgment and
//! settle timers) runs as a spawned task that posts one [`BoardEvent`] back on
//! the controller's channel; [`BoardController::step`] applies them one at a
//! time. A stage is only spawned from the completion of the stage before it,
//! so each image goes decode → quantize → present → relayout in order, while
//! different images complete independently.
//!
//! Every public operation and every applied event ends with one layout flush,
//! leaving the tracked set and the board consistent before control returns.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::board::Board;
use crate::color::Color;
use crate::coordinator::LayoutCoordinator;
use crate::ingest::{accept_images, Bitmap, CandidateFile, Decoder, ImageSource};
use crate::item::{BoardItem, ImageItem, ItemId, ItemRegion, ItemState};
use crate::palette::export::{offer_download, SVG_MEDIA_TYPE};
use crate::palette::{to_vector_document, Palette, Quantizer, PALETTE_FILENAME};
use crate::platform::{Clipboard, DownloadSink};
use crate::rendering::{render_board_svg, Geometry, MasonryEngine, Rect};
use crate::{BoardConfig, Error, Result};

/// The services a controller is built from.
pub struct Collaborators {
    pub decoder: Arc<dyn Decoder>,
    pub quantizer: Arc<dyn Quantizer>,
    pub clipboard: Arc<dyn Clipboard>,
    pub downloads: Arc<dyn DownloadSink>,
    pub masonry: Box<dyn MasonryEngine>,
}

impl Collaborators {
    #[cfg(feature = "decode")]
    pub fn defaults(config: &BoardConfig) -> Self {
        Self {
            decoder: Arc::new(crate::ingest::ImageDecoder::new()),
            quantizer: Arc::new(crate::palette::MedianCut::new(config.sample_step)),
            clipboard: Arc::new(crate::platform::MemoryClipboard::new()),
            downloads: Arc::new(crate::platform::MemorySink::new()),
            masonry: Box::new(crate::rendering::ColumnMasonry::new(
                config.container_width,
                config.column_width,
                config.gutter,
            )),
        }
    }
}

/// Completion of one asynchronous operation.
enum BoardEvent {
    Decoded { id: ItemId, result: Result<Bitmap> },
    Quantized { id: ItemId, result: Result<Vec<Color>> },
    Copied { id: ItemId, row: usize, result: Result<()> },
    AckExpired { id: ItemId, row: usize, generation: u64 },
    Settled { id: ItemId, transition: u64 },
}

/// Which completion a call to [`BoardController::step`] applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoded(ItemId),
    Quantized(ItemId),
    Copied(ItemId, usize),
    AckExpired(ItemId, usize),
    Settled(ItemId),
}

/// Outcome of routing a click to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// The region's handler consumed the click; nothing else sees it.
    Handled,
    /// The region has no handler for this click.
    Ignored,
}

/// Regions of the full-size overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRegion {
    Background,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Char(char),
}

pub struct BoardController {
    config: BoardConfig,
    board: Board,
    layout: LayoutCoordinator,
    decoder: Arc<dyn Decoder>,
    quantizer: Arc<dyn Quantizer>,
    clipboard: Arc<dyn Clipboard>,
    downloads: Arc<dyn DownloadSink>,
    lightbox: Option<ItemId>,
    events_tx: UnboundedSender<BoardEvent>,
    events_rx: UnboundedReceiver<BoardEvent>,
    in_flight: usize,
}

impl BoardController {
    pub fn with_collaborators(config: BoardConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            board: Board::new(),
            layout: LayoutCoordinator::new(collaborators.masonry),
            decoder: collaborators.decoder,
            quantizer: collaborators.quantizer,
            clipboard: collaborators.clipboard,
            downloads: collaborators.downloads,
            lightbox: None,
            events_tx,
            events_rx,
            in_flight: 0,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn layout(&self) -> &LayoutCoordinator {
        &self.layout
    }

    pub fn geometry(&self) -> &Geometry {
        self.layout.geometry()
    }

    pub fn item(&self, id: ItemId) -> Option<&BoardItem> {
        self.board.get(id)
    }

    pub fn image(&self, id: ItemId) -> Option<&ImageItem> {
        self.board.get(id).and_then(BoardItem::as_image)
    }

    /// Operations still running in the background.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run one stage in the background. If the work panics, `lost` builds
    /// the event reported in its place so the stage is still accounted for.
    fn spawn_stage<F, L>(&mut self, work: F, lost: L)
    where
        F: Future<Output = BoardEvent> + Send + 'static,
        L: FnOnce(String) -> BoardEvent + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match tokio::spawn(work).await {
                Ok(event) => event,
                Err(e) => {
                    log::error!("background stage failed: {}", e);
                    lost(e.to_string())
                }
            };
            let _ = tx.send(event);
        });
    }

    fn flush(&mut self) {
        self.layout.flush(&self.board, &self.config);
    }

    fn image_mut(&mut self, id: ItemId) -> Result<&mut ImageItem> {
        self.board
            .get_mut(id)
            .ok_or(Error::UnknownItem(id))?
            .as_image_mut()
            .ok_or(Error::NoPalette(id))
    }

    // --- ingestion ---

    /// Add the image files of a picker selection. Each accepted file becomes
    /// an item at the front of the board immediately; its palette arrives
    /// later. Must be called inside a tokio runtime.
    pub fn upload(&mut self, files: Vec<CandidateFile>) -> Vec<ItemId> {
        let sources = accept_images(files);
        let ids: Vec<ItemId> = sources.into_iter().map(|s| self.create_image(s)).collect();
        self.flush();
        ids
    }

    /// Add the image files of a drag-and-drop. Same path as [`Self::upload`].
    pub fn drop_files(&mut self, files: Vec<CandidateFile>) -> Vec<ItemId> {
        log::debug!("drop of {} file(s)", files.len());
        self.upload(files)
    }

    fn create_image(&mut self, source: ImageSource) -> ItemId {
        let id = self.board.prepend_image(source.clone());
        self.layout.note_prepended(id);
        self.layout.request_relayout();
        if let Some(item) = self.board.get_mut(id) {
            item.set_state(ItemState::Decoding);
        }
        log::info!("image {} created from {:?} ({})", id, source.name, source.fingerprint());

        let decode = self.decoder.decode(&source);
        self.spawn_stage(
            async move { BoardEvent::Decoded { id, result: decode.await } },
            move |e| BoardEvent::Decoded { id, result: Err(Error::DecodeError(format!("decode task failed: {}", e))) },
        );
        id
    }

    // --- notes ---

    pub fn add_note(&mut self) -> ItemId {
        let id = self.board.prepend_note(&self.config);
        self.layout.note_prepended(id);
        self.layout.request_relayout();
        self.flush();
        log::info!("note {} created", id);
        id
    }

    /// Replace a note's text. The note re-measures itself and the board is
    /// laid out again. Returns the new height.
    pub fn edit_note(&mut self, id: ItemId, text: impl Into<String>) -> Result<u32> {
        let note = self
            .board
            .get_mut(id)
            .ok_or(Error::UnknownItem(id))?
            .as_note_mut()
            .ok_or_else(|| Error::Other(format!("board item {} is not a note", id)))?;
        let height = note.set_text(text.into(), &self.config);
        self.layout.request_relayout();
        self.flush();
        Ok(height)
    }

    // --- deletion ---

    /// Remove an item from the board and from layout tracking together.
    /// Late completions for it are discarded.
    pub fn delete(&mut self, id: ItemId) -> Result<()> {
        let mut item = self.board.remove(id).ok_or(Error::UnknownItem(id))?;
        item.set_state(ItemState::Deleted);
        if !self.layout.note_removed(id) {
            log::error!("deleted item {} was not tracked", id);
        }
        if self.lightbox == Some(id) {
            self.lightbox = None;
        }
        self.layout.request_relayout();
        self.flush();
        log::info!("item {} deleted", id);
        Ok(())
    }

    // --- click routing ---

    /// Route a click on an item region to that region's handler. Delete and
    /// palette regions never fall through to the body.
    pub fn click(&mut self, id: ItemId, region: ItemRegion) -> Result<Routed> {
        let item = self.board.get(id).ok_or(Error::UnknownItem(id))?;
        let image = item.as_image();
        let is_image = image.is_some();
        let has_palette = image.is_some_and(|i| i.palette.is_some());
        let expanded = image.is_some_and(ImageItem::is_expanded);
        match region {
            ItemRegion::DeleteButton => {
                self.delete(id)?;
                Ok(Routed::Handled)
            }
            ItemRegion::PaletteContainer if has_palette => {
                self.toggle_palette(id)?;
                Ok(Routed::Handled)
            }
            // Detailed rows are only reachable while the list is shown.
            ItemRegion::PaletteRow(row) if expanded => {
                self.copy_color(id, row)?;
                Ok(Routed::Handled)
            }
            ItemRegion::Body if is_image => {
                self.lightbox = Some(id);
                Ok(Routed::Handled)
            }
            _ => Ok(Routed::Ignored),
        }
    }

    // --- palette presentation ---

    /// Switch between compact and detailed views. The relayout waits for the
    /// size transition to settle.
    pub fn toggle_palette(&mut self, id: ItemId) -> Result<bool> {
        let settle_after = self.config.expand_transition_ms;
        let item = self.image_mut(id)?;
        let view = item.view.as_mut().ok_or(Error::NoPalette(id))?;
        let transition = view.toggle();
        let expanded = view.is_expanded();

        if settle_after == 0 {
            if view.settle(transition) {
                self.layout.request_relayout();
            }
            self.flush();
        } else {
            self.spawn_stage(
                async move {
                    tokio::time::sleep(Duration::from_millis(settle_after)).await;
                    BoardEvent::Settled { id, transition }
                },
                move |_| BoardEvent::Settled { id, transition },
            );
        }
        Ok(expanded)
    }

    /// Copy a detailed row's hex to the clipboard. The acknowledgment appears
    /// once the write succeeds.
    pub fn copy_color(&mut self, id: ItemId, row: usize) -> Result<String> {
        let item = self.image_mut(id)?;
        let palette = item.palette.as_ref().ok_or(Error::NoPalette(id))?;
        let color = palette
            .get(row)
            .ok_or_else(|| Error::Other(format!("palette row {} out of range for {}", row, id)))?;
        let hex = color.to_hex();
        let write = self.clipboard.write_text(hex.clone());
        self.spawn_stage(
            async move { BoardEvent::Copied { id, row, result: write.await } },
            move |e| BoardEvent::Copied { id, row, result: Err(Error::ClipboardError(e)) },
        );
        Ok(hex)
    }

    /// Export an item's palette as `palette.svg` through the download sink.
    pub fn download_palette(&mut self, id: ItemId) -> Result<()> {
        let swatch = self.config.swatch_size;
        let item = self.image_mut(id)?;
        let palette = item.palette.as_ref().ok_or(Error::NoPalette(id))?;
        let doc = to_vector_document(palette, swatch);
        offer_download(self.downloads.as_ref(), PALETTE_FILENAME, SVG_MEDIA_TYPE, doc)
    }

    // --- lightbox ---

    /// The image currently shown full size, if any.
    pub fn lightbox(&self) -> Option<&ImageSource> {
        self.lightbox.and_then(|id| self.image(id)).map(|img| &img.source)
    }

    pub fn lightbox_item(&self) -> Option<ItemId> {
        self.lightbox
    }

    pub fn click_overlay(&mut self, region: OverlayRegion) -> Routed {
        match (region, self.lightbox) {
            (OverlayRegion::Background, Some(_)) => {
                self.lightbox = None;
                Routed::Handled
            }
            _ => Routed::Ignored,
        }
    }

    pub fn press_key(&mut self, key: Key) -> Routed {
        match (key, self.lightbox) {
            (Key::Escape, Some(_)) => {
                self.lightbox = None;
                Routed::Handled
            }
            _ => Routed::Ignored,
        }
    }

    // --- event processing ---

    /// Wait for the next completion and apply it. Returns `None` when nothing
    /// is in flight.
    pub async fn step(&mut self) -> Option<Stage> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.in_flight -= 1;
        let stage = self.apply(event);
        self.flush();
        Some(stage)
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.step().await.is_some() {}
    }

    fn apply(&mut self, event: BoardEvent) -> Stage {
        match event {
            BoardEvent::Decoded { id, result } => {
                self.on_decoded(id, result);
                Stage::Decoded(id)
            }
            BoardEvent::Quantized { id, result } => {
                self.on_quantized(id, result);
                Stage::Quantized(id)
            }
            BoardEvent::Copied { id, row, result } => {
                self.on_copied(id, row, result);
                Stage::Copied(id, row)
            }
            BoardEvent::AckExpired { id, row, generation } => {
                if let Some(view) = self.image_mut(id).ok().and_then(|i| i.view.as_mut()) {
                    view.expire(row, generation);
                }
                Stage::AckExpired(id, row)
            }
            BoardEvent::Settled { id, transition } => {
                let settled = self
                    .image_mut(id)
                    .ok()
                    .and_then(|i| i.view.as_mut())
                    .is_some_and(|v| v.settle(transition));
                if settled {
                    self.layout.request_relayout();
                }
                Stage::Settled(id)
            }
        }
    }

    fn on_decoded(&mut self, id: ItemId, result: Result<Bitmap>) {
        let Ok(item) = self.image_mut(id) else {
            log::debug!("dropping decode result for removed item {}", id);
            return;
        };
        match result {
            Ok(bitmap) => {
                // The natural size is known now; the palette row follows later.
                item.decoded(&bitmap);
                self.layout.request_relayout();
                let quantizer = Arc::clone(&self.quantizer);
                let count = self.config.palette_size;
                self.spawn_stage(
                    async move {
                        let result = tokio::task::spawn_blocking(move || quantizer.quantize(&bitmap, count))
                            .await
                            .unwrap_or_else(|e| Err(Error::QuantizeError(format!("quantize task failed: {}", e))));
                        BoardEvent::Quantized { id, result }
                    },
                    move |e| BoardEvent::Quantized { id, result: Err(Error::QuantizeError(e)) },
                );
            }
            Err(e) => {
                log::warn!("could not decode {:?} for {}: {}", item.source.name, id, e);
                item.state = ItemState::Failed;
                self.layout.request_relayout();
            }
        }
    }

    fn on_quantized(&mut self, id: ItemId, result: Result<Vec<Color>>) {
        let size = self.config.palette_size;
        let Ok(item) = self.image_mut(id) else {
            log::debug!("dropping palette for removed item {}", id);
            return;
        };
        match result.and_then(|colors| Palette::from_colors(colors, size)) {
            Ok(palette) => {
                log::debug!("palette for {}: {}", id, palette.hex_strings().join(" "));
                item.attach_palette(palette);
            }
            Err(e) => log::warn!("no palette for {}: {}", id, e),
        }
        item.state = ItemState::Ready;
        self.layout.request_relayout();
    }

    fn on_copied(&mut self, id: ItemId, row: usize, result: Result<()>) {
        if let Err(e) = result {
            log::debug!("copy from {} row {} failed: {}", id, row, e);
            return;
        }
        let ack_ms = self.config.copy_ack_ms;
        let Some(generation) = self
            .image_mut(id)
            .ok()
            .and_then(|i| i.view.as_mut())
            .and_then(|v| v.acknowledge(row))
        else {
            return;
        };
        self.spawn_stage(
            async move {
                tokio::time::sleep(Duration::from_millis(ack_ms)).await;
                BoardEvent::AckExpired { id, row, generation }
            },
            move |_| BoardEvent::AckExpired { id, row, generation },
        );
    }

    // --- output ---

    /// SVG rendering of the board at its current geometry.
    pub fn render_svg(&self) -> String {
        render_board_svg(&self.board, self.layout.geometry(), &self.config)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let geometry = self.layout.geometry();
        let items = self
            .board
            .iter()
            .map(|item| {
                let rect = geometry.rect_of(item.id());
                match item {
                    BoardItem::Image(img) => ItemSnapshot {
                        id: img.id,
                        kind: "image",
                        state: img.state,
                        name: Some(img.source.name.clone()),
                        text: None,
                        palette: img.palette.as_ref().map(Palette::hex_strings),
                        expanded: img.is_expanded(),
                        rect,
                    },
                    BoardItem::Note(note) => ItemSnapshot {
                        id: note.id,
                        kind: "note",
                        state: note.state,
                        name: None,
                        text: Some(note.text.clone()),
                        palette: None,
                        expanded: false,
                        rect,
                    },
                }
            })
            .collect();
        BoardSnapshot { width: geometry.width, height: geometry.height, items }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub kind: &'static str,
    pub state: ItemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
    pub expanded: bool,
    pub rect: Option<Rect>,
}

/// Serializable summary of the board and its layout.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub width: u32,
    pub height: u32,
    pub items: Vec<ItemSnapshot>,
}
