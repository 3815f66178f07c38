//! Download a region of an Our World of Pixels canvas to PNG files
//!
//! Run with: cargo run --bin download-canvas -- <start x> <start y> <end x> <end y> <canvas name>

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use owop_client::{CanvasRegion, DirectoryStore, DownloadConfig, Downloader, ResumeScan};

#[derive(Parser)]
#[command(name = "download-canvas")]
#[command(about = "Downloads a rectangular canvas region as PNG images, resuming interrupted runs")]
struct Args {
    /// Left edge of the region, in canvas pixels (inclusive)
    start_x: i32,

    /// Top edge of the region (inclusive)
    start_y: i32,

    /// Right edge of the region (inclusive)
    end_x: i32,

    /// Bottom edge of the region (inclusive)
    end_y: i32,

    /// Canvas name, e.g. "main"
    canvas: String,

    #[arg(long, default_value = owop_client::DEFAULT_HOST)]
    host: String,

    /// Stop the resume scan at the first fully downloaded tile column
    /// instead of advancing to the next one
    #[arg(long)]
    faithful_resume: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("owop_client=info".parse().unwrap()),
        )
        .init();

    if let Err(err) = run(Args::parse()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> owop_client::Result<()> {
    let region = CanvasRegion::new(args.start_x, args.start_y, args.end_x + 1, args.end_y + 1)?;

    let mut split = false;
    if region.width() > 5000 || region.height() > 5000 {
        let chunks = region.chunk_grid().len();
        println!(
            "The resulting image exceeds 5000 pixels in one dimension ({}x{}).\n\
             This can take a while and use a lot of memory. Rough download time: {} s.",
            region.width(),
            region.height(),
            chunks / 1000
        );
        if !prompt_yes("Download anyway?") {
            return Ok(());
        }
        split = prompt_yes("Split into 4096x4096 tiles (recommended)?");
    }

    let store = DirectoryStore::open(&args.canvas, region.px0, region.py0)?;
    let dir = store.root().to_path_buf();

    let mut config = DownloadConfig::new(args.canvas.clone(), region);
    config.host = args.host;
    config.split = split;
    if args.faithful_resume {
        config.resume_scan = ResumeScan::Faithful;
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupted, shutting down");
            let _ = cancel_tx.send(true);
        }
    });

    let mut downloader = Downloader::new(config, store);
    downloader.run(cancel_rx).await?;
    info!("images saved under {}", dir.display());

    if split && prompt_yes("Merge downloaded tiles into one image?") {
        let merged = downloader.merge_tiles()?;
        let out = format!(
            "{}_{}x{}_{}_{}.png",
            args.canvas,
            region.width(),
            region.height(),
            region.px0,
            region.py0
        );
        merged.save(&out)?;
        println!("merged image saved to {out}");
    }

    println!("Done!");
    Ok(())
}

fn prompt_yes(question: &str) -> bool {
    use std::io::Write as _;

    print!("{question} [Y/n] ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    !matches!(line.trim().to_lowercase().as_str(), "n" | "no")
}
