//! End-to-end board scenarios driven through the controller

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use moodboard::platform::{MemoryClipboard, MemorySink};
use moodboard::rendering::ColumnMasonry;
use moodboard::{
    Bitmap, BoardConfig, BoardController, CandidateFile, Collaborators, Color, Decoder, Error, ImageSource,
    ItemId, ItemRegion, ItemState, Key, MedianCut, OverlayRegion, Quantizer, Routed, Stage,
};

const RED: Color = Color::new(255, 0, 0);
const TEAL: Color = Color::new(0, 128, 128);

/// Decodes every source named in `colors` to a solid 10x10 bitmap of that
/// color. Sources with a gate wait until the gate is released; unknown names
/// fail to decode.
#[derive(Default)]
struct ScriptedDecoder {
    colors: HashMap<String, Color>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl ScriptedDecoder {
    fn with(mut self, name: &str, color: Color) -> Self {
        self.colors.insert(name.to_string(), color);
        self
    }

    fn gate(&self, name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(name.to_string(), rx);
        tx
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, source: &ImageSource) -> BoxFuture<'static, moodboard::Result<Bitmap>> {
        let gate = self.gates.lock().unwrap().remove(&source.name);
        let color = self.colors.get(&source.name).copied();
        let name = source.name.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            color
                .map(|c| Bitmap::solid(10, 10, c))
                .ok_or_else(|| Error::DecodeError(format!("{} is corrupt", name)))
        })
    }
}

struct FailingQuantizer;

impl Quantizer for FailingQuantizer {
    fn quantize(&self, _bitmap: &Bitmap, _count: usize) -> moodboard::Result<Vec<Color>> {
        Err(Error::QuantizeError("pixel access blocked".to_string()))
    }
}

struct Harness {
    board: BoardController,
    clipboard: MemoryClipboard,
    downloads: MemorySink,
}

fn harness_with(decoder: Arc<dyn Decoder>, quantizer: Arc<dyn Quantizer>, clipboard: MemoryClipboard) -> Harness {
    let config = BoardConfig::default();
    let downloads = MemorySink::new();
    let collaborators = Collaborators {
        decoder,
        quantizer,
        clipboard: Arc::new(clipboard.clone()),
        downloads: Arc::new(downloads.clone()),
        masonry: Box::new(ColumnMasonry::new(config.container_width, config.column_width, config.gutter)),
    };
    let board = BoardController::with_collaborators(config, collaborators).expect("valid config");
    Harness { board, clipboard, downloads }
}

fn harness(decoder: ScriptedDecoder) -> Harness {
    harness_with(Arc::new(decoder), Arc::new(MedianCut::default()), MemoryClipboard::new())
}

fn png(name: &str) -> CandidateFile {
    CandidateFile::new(name, "image/png", name.as_bytes().to_vec())
}

async fn red_image(h: &mut Harness) -> ItemId {
    let ids = h.board.upload(vec![png("red.png")]);
    h.board.settle().await;
    ids[0]
}

#[tokio::test]
async fn red_image_exports_five_red_swatches() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;

    let img = h.board.image(id).unwrap();
    assert_eq!(img.state, ItemState::Ready);
    let palette = img.palette.as_ref().expect("palette computed");
    assert_eq!(palette.len(), 5);
    assert_eq!(palette.get(0), Some(RED));

    h.board.download_palette(id).unwrap();
    let downloads = h.downloads.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].filename, "palette.svg");
    let svg = String::from_utf8(downloads[0].bytes.clone()).unwrap();
    assert!(svg.contains(r#"width="500" height="100""#));
    assert_eq!(svg.matches("<rect").count(), 5);
    let first_fill = svg.split("fill=\"").nth(1).and_then(|s| s.split('"').next()).unwrap();
    assert_eq!(first_fill, RED.to_hex());
}

#[tokio::test]
async fn items_keep_creation_order_whatever_finishes_first() {
    let decoder = ScriptedDecoder::default().with("a.png", TEAL).with("b.png", RED);
    let release_a = decoder.gate("a.png");
    let release_b = decoder.gate("b.png");
    let mut h = harness(decoder);

    let ids = h.board.drop_files(vec![png("a.png"), png("b.png")]);
    let (a, b) = (ids[0], ids[1]);
    // Each item is prepended as it is created.
    assert_eq!(h.board.board().ids(), vec![b, a]);
    assert_eq!(h.board.layout().tracked(), &[b, a]);

    release_b.send(()).unwrap();
    assert_eq!(h.board.step().await, Some(Stage::Decoded(b)));
    assert_eq!(h.board.step().await, Some(Stage::Quantized(b)));
    assert!(h.board.image(b).unwrap().palette.is_some());
    assert_eq!(h.board.image(a).unwrap().state, ItemState::Decoding);

    release_a.send(()).unwrap();
    h.board.settle().await;
    assert_eq!(h.board.board().ids(), vec![b, a]);
    assert_eq!(h.board.image(a).unwrap().palette.as_ref().unwrap().get(0), Some(TEAL));
    let order: Vec<_> = h.board.geometry().placements.iter().map(|p| p.id).collect();
    assert_eq!(order, vec![b, a]);
}

#[tokio::test]
async fn one_bad_file_does_not_stop_the_batch() {
    let mut h = harness(ScriptedDecoder::default().with("good.png", RED));
    let ids = h.board.upload(vec![
        png("broken.png"),
        CandidateFile::new("notes.txt", "text/plain", b"hello".to_vec()),
        png("good.png"),
    ]);
    assert_eq!(ids.len(), 2, "non-image input is skipped");
    h.board.settle().await;

    assert_eq!(h.board.image(ids[0]).unwrap().state, ItemState::Failed);
    assert!(h.board.image(ids[1]).unwrap().palette.is_some());
    assert_eq!(h.board.layout().tracked().len(), 2);
}

#[tokio::test]
async fn quantizer_failure_leaves_item_usable() {
    let mut h = harness_with(
        Arc::new(ScriptedDecoder::default().with("red.png", RED)),
        Arc::new(FailingQuantizer),
        MemoryClipboard::new(),
    );
    let id = red_image(&mut h).await;

    let img = h.board.image(id).unwrap();
    assert_eq!(img.state, ItemState::Ready);
    assert!(img.palette.is_none());
    assert!(h.board.geometry().rect_of(id).unwrap().height > 0);
    assert!(matches!(h.board.download_palette(id), Err(Error::NoPalette(_))));

    assert_eq!(h.board.click(id, ItemRegion::PaletteContainer).unwrap(), Routed::Ignored);
    assert_eq!(h.board.click(id, ItemRegion::Body).unwrap(), Routed::Handled);
    assert_eq!(h.board.lightbox_item(), Some(id));
    h.board.click(id, ItemRegion::DeleteButton).unwrap();
    assert!(h.board.board().is_empty());
}

#[tokio::test]
async fn deleting_during_quantization_drops_the_late_palette() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let ids = h.board.upload(vec![png("red.png")]);
    let id = ids[0];

    assert_eq!(h.board.step().await, Some(Stage::Decoded(id)));
    assert_eq!(h.board.image(id).unwrap().state, ItemState::PaletteComputing);
    h.board.delete(id).unwrap();
    let relayouts = h.board.layout().relayout_count();

    assert_eq!(h.board.step().await, Some(Stage::Quantized(id)));
    assert!(h.board.item(id).is_none());
    assert!(h.board.layout().tracked().is_empty());
    assert_eq!(h.board.layout().relayout_count(), relayouts);
    assert_eq!(h.board.in_flight(), 0);
    assert!(matches!(h.board.delete(id), Err(Error::UnknownItem(_))));
}

#[tokio::test]
async fn tracked_set_is_creations_minus_deletions() {
    let mut h = harness(ScriptedDecoder::default().with("a.png", RED).with("b.png", TEAL));
    let mut ids = h.board.upload(vec![png("a.png"), png("b.png")]);
    for _ in 0..4 {
        ids.push(h.board.add_note());
    }
    h.board.settle().await;

    let deleted = [ids[0], ids[3], ids[5]];
    for id in deleted {
        h.board.delete(id).unwrap();
    }
    assert_eq!(h.board.layout().tracked().len(), ids.len() - deleted.len());
    assert_eq!(h.board.board().len(), ids.len() - deleted.len());
    for id in deleted {
        assert!(h.board.item(id).is_none());
        assert!(h.board.geometry().rect_of(id).is_none());
    }
    assert_eq!(h.board.geometry().placements.len(), 3);
}

#[tokio::test]
async fn typing_a_long_note_grows_it_and_relays_out() {
    let mut h = harness(ScriptedDecoder::default());
    let id = h.board.add_note();
    let initial = h.board.geometry().rect_of(id).unwrap().height;
    let before = h.board.layout().relayout_count();

    let height = h.board.edit_note(id, "a".repeat(500)).unwrap();
    assert!(height > initial);
    assert_eq!(h.board.layout().relayout_count(), before + 1);
    assert_eq!(h.board.geometry().rect_of(id).unwrap().height, height);
}

#[tokio::test]
async fn relayout_waits_for_the_expand_transition() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    let collapsed = h.board.geometry().rect_of(id).unwrap().height;
    let before = h.board.layout().relayout_count();

    assert_eq!(h.board.click(id, ItemRegion::PaletteContainer).unwrap(), Routed::Handled);
    assert!(h.board.image(id).unwrap().is_expanded());
    assert_eq!(h.board.layout().relayout_count(), before, "no relayout mid-transition");
    assert_eq!(h.board.lightbox_item(), None, "palette clicks never open the lightbox");

    assert_eq!(h.board.step().await, Some(Stage::Settled(id)));
    assert_eq!(h.board.layout().relayout_count(), before + 1);
    assert!(h.board.geometry().rect_of(id).unwrap().height > collapsed);
}

#[tokio::test]
async fn superseded_transition_settles_once() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    let collapsed = h.board.geometry().rect_of(id).unwrap().height;
    let before = h.board.layout().relayout_count();

    h.board.toggle_palette(id).unwrap();
    h.board.toggle_palette(id).unwrap();
    h.board.settle().await;
    assert_eq!(h.board.layout().relayout_count(), before + 1);
    assert_eq!(h.board.geometry().rect_of(id).unwrap().height, collapsed);
}

#[tokio::test(start_paused = true)]
async fn second_copy_restarts_the_acknowledgment_timer() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    h.board.toggle_palette(id).unwrap();
    h.board.settle().await;

    let start = Instant::now();
    assert_eq!(h.board.click(id, ItemRegion::PaletteRow(0)).unwrap(), Routed::Handled);
    assert_eq!(h.board.step().await, Some(Stage::Copied(id, 0)));
    assert!(h.board.image(id).unwrap().view.as_ref().unwrap().is_acknowledged(0));

    tokio::time::sleep(Duration::from_secs(1)).await;
    h.board.click(id, ItemRegion::PaletteRow(0)).unwrap();
    assert_eq!(h.board.step().await, Some(Stage::Copied(id, 0)));

    // The first copy's timer fires but no longer owns the acknowledgment.
    assert_eq!(h.board.step().await, Some(Stage::AckExpired(id, 0)));
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(h.board.image(id).unwrap().view.as_ref().unwrap().is_acknowledged(0));

    assert_eq!(h.board.step().await, Some(Stage::AckExpired(id, 0)));
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(!h.board.image(id).unwrap().view.as_ref().unwrap().is_acknowledged(0));

    assert_eq!(h.clipboard.writes(), vec!["#FF0000".to_string(), "#FF0000".to_string()]);
}

#[tokio::test]
async fn collapsing_keeps_a_running_acknowledgment() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    h.board.toggle_palette(id).unwrap();
    h.board.settle().await;

    h.board.copy_color(id, 2).unwrap();
    assert_eq!(h.board.step().await, Some(Stage::Copied(id, 2)));
    h.board.toggle_palette(id).unwrap();
    assert!(h.board.image(id).unwrap().view.as_ref().unwrap().is_acknowledged(2));
    assert_eq!(h.clipboard.contents().as_deref(), Some("#FF0000"));
}

#[tokio::test]
async fn denied_clipboard_shows_no_acknowledgment() {
    let mut h = harness_with(
        Arc::new(ScriptedDecoder::default().with("red.png", RED)),
        Arc::new(MedianCut::default()),
        MemoryClipboard::denied(),
    );
    let id = red_image(&mut h).await;
    h.board.toggle_palette(id).unwrap();
    h.board.settle().await;

    h.board.copy_color(id, 0).unwrap();
    assert_eq!(h.board.step().await, Some(Stage::Copied(id, 0)));
    assert!(!h.board.image(id).unwrap().view.as_ref().unwrap().is_acknowledged(0));
    assert_eq!(h.board.in_flight(), 0, "no acknowledgment timer was started");
    assert!(h.clipboard.writes().is_empty());
}

#[tokio::test]
async fn lightbox_routing() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    let note = h.board.add_note();

    assert_eq!(h.board.click(note, ItemRegion::Body).unwrap(), Routed::Ignored);
    assert_eq!(h.board.click(id, ItemRegion::PaletteRow(0)).unwrap(), Routed::Ignored);
    assert_eq!(h.board.lightbox_item(), None);

    assert_eq!(h.board.click(id, ItemRegion::Body).unwrap(), Routed::Handled);
    assert_eq!(h.board.lightbox().unwrap().name, "red.png");
    assert_eq!(h.board.click_overlay(OverlayRegion::Image), Routed::Ignored);
    assert_eq!(h.board.press_key(Key::Char('x')), Routed::Ignored);
    assert_eq!(h.board.press_key(Key::Escape), Routed::Handled);
    assert_eq!(h.board.lightbox_item(), None);

    h.board.click(id, ItemRegion::Body).unwrap();
    assert_eq!(h.board.click_overlay(OverlayRegion::Background), Routed::Handled);
    assert_eq!(h.board.lightbox_item(), None);

    h.board.click(id, ItemRegion::Body).unwrap();
    h.board.click(id, ItemRegion::DeleteButton).unwrap();
    assert_eq!(h.board.lightbox_item(), None, "deleting the shown item closes the overlay");
}

#[tokio::test]
async fn snapshot_lists_items_with_placements() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = red_image(&mut h).await;
    let note = h.board.add_note();
    h.board.edit_note(note, "palette ideas").unwrap();

    let snap = h.board.snapshot();
    assert_eq!(snap.items.len(), 2);
    assert_eq!(snap.items[0].id, note);
    assert_eq!(snap.items[1].id, id);
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["items"][1]["palette"][0], "#FF0000");
    assert_eq!(json["items"][0]["text"], "palette ideas");
    assert!(h.board.render_svg().contains("palette ideas"));
}

#[tokio::test]
async fn decoded_size_is_laid_out_before_the_palette_arrives() {
    let mut h = harness(ScriptedDecoder::default().with("red.png", RED));
    let id = h.board.upload(vec![png("red.png")])[0];
    assert_eq!(h.board.geometry().rect_of(id).unwrap().height, 0);

    assert_eq!(h.board.step().await, Some(Stage::Decoded(id)));
    assert!(h.board.image(id).unwrap().palette.is_none());
    let expected = h.board.item(id).unwrap().box_size(h.board.config()).height;
    assert_eq!(expected, 240);
    assert_eq!(h.board.geometry().rect_of(id).unwrap().height, expected);

    h.board.settle().await;
    let expected = h.board.item(id).unwrap().box_size(h.board.config()).height;
    assert_eq!(h.board.geometry().rect_of(id).unwrap().height, expected);
}

struct PanickingDecoder;

impl Decoder for PanickingDecoder {
    fn decode(&self, _source: &ImageSource) -> BoxFuture<'static, moodboard::Result<Bitmap>> {
        Box::pin(async { panic!("decoder crashed") })
    }
}

#[tokio::test]
async fn panicking_decoder_fails_the_item_and_settles() {
    let mut h = harness_with(Arc::new(PanickingDecoder), Arc::new(MedianCut::default()), MemoryClipboard::new());
    let id = h.board.upload(vec![png("red.png")])[0];

    tokio::time::timeout(Duration::from_secs(5), h.board.settle())
        .await
        .expect("settle returns after a panicked stage");
    assert_eq!(h.board.in_flight(), 0);
    assert_eq!(h.board.image(id).unwrap().state, ItemState::Failed);
    h.board.delete(id).unwrap();
    assert!(h.board.board().is_empty());
}
