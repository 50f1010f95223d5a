use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moodboard::platform::{DirectorySink, MemoryClipboard};
use moodboard::rendering::ColumnMasonry;
use moodboard::{BoardConfig, BoardController, CandidateFile, Collaborators, MedianCut};

#[derive(Parser)]
#[command(name = "moodboard", about = "Extract palettes and lay out moodboards headlessly")]
struct Cli {
    /// JSON file overriding board settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write one palette.svg per image, each in its own subdirectory
    Palette {
        images: Vec<PathBuf>,
        #[arg(long, default_value = "palettes")]
        out_dir: PathBuf,
    },
    /// Lay out images and notes and render the board
    Board {
        images: Vec<PathBuf>,
        /// Add a note with this text (repeatable)
        #[arg(long = "note")]
        notes: Vec<String>,
        /// Expand every palette before rendering
        #[arg(long)]
        expanded: bool,
        #[arg(long, default_value = "board.svg")]
        out: PathBuf,
        /// Print a JSON snapshot of the board to stdout
        #[arg(long)]
        json: bool,
    },
}

fn controller(config: BoardConfig, downloads: &Path) -> anyhow::Result<BoardController> {
    let collaborators = Collaborators {
        decoder: Arc::new(moodboard::ingest::ImageDecoder::new()),
        quantizer: Arc::new(MedianCut::new(config.sample_step)),
        clipboard: Arc::new(MemoryClipboard::new()),
        downloads: Arc::new(DirectorySink::new(downloads)),
        masonry: Box::new(ColumnMasonry::new(config.container_width, config.column_width, config.gutter)),
    };
    Ok(BoardController::with_collaborators(config, collaborators)?)
}

fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<CandidateFile>> {
    paths
        .iter()
        .map(|p| CandidateFile::from_path(p).with_context(|| format!("reading {}", p.display())))
        .collect()
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => BoardConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => BoardConfig::default(),
    };

    match cli.command {
        Command::Palette { images, out_dir } => {
            if images.is_empty() {
                bail!("no images given");
            }
            for path in &images {
                let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                let mut board = controller(config.clone(), &out_dir.join(&stem))?;
                let ids = board.upload(read_files(std::slice::from_ref(path))?);
                board.settle().await;
                match ids.first() {
                    Some(&id) => match board.download_palette(id) {
                        Ok(()) => println!("{}: {}", path.display(), palette_line(&board, id)),
                        Err(e) => eprintln!("{}: {}", path.display(), e),
                    },
                    None => eprintln!("{}: not an image, skipped", path.display()),
                }
            }
        }
        Command::Board { images, notes, expanded, out, json } => {
            let mut board = controller(config, Path::new("."))?;
            let ids = board.upload(read_files(&images)?);
            for text in notes {
                let id = board.add_note();
                board.edit_note(id, text)?;
            }
            board.settle().await;
            if expanded {
                for id in ids {
                    if board.image(id).is_some_and(|i| i.palette.is_some()) {
                        board.toggle_palette(id)?;
                    }
                }
                board.settle().await;
            }
            std::fs::write(&out, board.render_svg()).with_context(|| format!("writing {}", out.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board.snapshot())?);
            } else {
                eprintln!("wrote {}", out.display());
            }
        }
    }
    Ok(())
}

fn palette_line(board: &BoardController, id: moodboard::ItemId) -> String {
    board
        .image(id)
        .and_then(|i| i.palette.as_ref())
        .map(|p| p.hex_strings().join(" "))
        .unwrap_or_default()
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("moodboard: {:#}", e);
        std::process::exit(1);
    }
}
