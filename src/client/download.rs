use std::collections::HashSet;
use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::canvas::{CanvasRegion, ChunkGrid, CoverageMap, ImageStore, Raster, TILE_SIZE};
use crate::codec::DecodedChunk;
use crate::error::{Error, Result};
use crate::protocol::{frame, FrameHandler, Session, SessionConfig};

pub const DEFAULT_HOST: &str = "ourworldofpixels.com";

/// How the resume scan walks the tile grid when a fully downloaded column is
/// hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeScan {
    /// Move on to the next column.
    #[default]
    AdvanceColumns,
    /// Give up the scan at the first fully downloaded column. The
    /// orchestrator then falls back to per-tile presence checks from the
    /// start of the region.
    Faithful,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Server host name, or a full base URL (anything containing `://`, used
    /// verbatim; plain hosts get `wss://`).
    pub host: String,
    pub canvas: String,
    pub region: CanvasRegion,
    /// Split the region into tiles of at most `TILE_SIZE` per side.
    pub split: bool,
    /// After a split download, merge all stored tiles into one image.
    pub merge: bool,
    pub resume_scan: ResumeScan,
    /// Pause between consecutive chunk requests.
    pub request_delay: Duration,
    /// Pause between full passes over the chunk grid.
    pub pass_delay: Duration,
    pub reconnect_delay: Duration,
}

impl DownloadConfig {
    pub fn new(canvas: impl Into<String>, region: CanvasRegion) -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            canvas: canvas.into(),
            region,
            split: false,
            merge: false,
            resume_scan: ResumeScan::default(),
            request_delay: Duration::from_millis(1),
            pass_delay: Duration::from_millis(500),
            reconnect_delay: Duration::from_secs(1),
        }
    }

    fn session_config(&self) -> SessionConfig {
        let url = if self.host.contains("://") {
            format!("{}/{}", self.host, self.canvas)
        } else {
            format!("wss://{}/{}", self.host, self.canvas)
        };
        let mut config = SessionConfig::new(url, self.canvas.clone());
        config.reconnect_delay = self.reconnect_delay;
        config
    }
}

/// Everything mutated while one tile downloads. Owned by the session's
/// receive handler; the requester only reads coverage through the lock.
struct TileJob {
    grid: ChunkGrid,
    coverage: CoverageMap,
    raster: Raster,
}

impl TileJob {
    fn new(region: CanvasRegion) -> Self {
        let grid = region.chunk_grid();
        Self {
            grid,
            coverage: CoverageMap::for_grid(&grid),
            raster: Raster::new(&region),
        }
    }

    fn print_progress(&self) {
        let total = self.coverage.total();
        if total == 0 {
            return;
        }
        let done = self.coverage.completed();
        let percent = done as f64 * 100.0 / total as f64;
        eprint!("\rLoaded {done} of {total} chunks ({percent:.2}% complete)");
        let _ = std::io::stderr().flush();
    }
}

type JobSlot = Arc<Mutex<Option<TileJob>>>;

/// Session frame handler: parses chunk frames, decodes and blits them into
/// the active tile, and marks coverage.
struct Assembler {
    job: JobSlot,
}

impl FrameHandler for Assembler {
    fn on_frame(&mut self, data: &[u8], joined: bool) {
        if !joined {
            return;
        }
        let chunk = match frame::parse_chunk_frame(data) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return,
            Err(err) => {
                warn!("dropping malformed frame: {err}");
                return;
            }
        };
        let mut guard = self.job.lock().unwrap();
        let Some(job) = guard.as_mut() else { return };
        // Chunks outside the active tile's grid are stale traffic.
        let Some((rx, ry)) = job.grid.relative(chunk.cx, chunk.cy) else {
            return;
        };
        // Duplicate or late delivery for a finished cell is a no-op.
        if !job.coverage.is_pending(rx, ry) {
            return;
        }
        match DecodedChunk::decode(chunk.cx, chunk.cy, chunk.payload) {
            Ok(decoded) => {
                job.raster.blit_chunk(&decoded);
                job.coverage.mark_done(rx, ry);
                job.print_progress();
            }
            Err(err) => {
                // Left pending; the next request pass fetches it again.
                warn!(cx = chunk.cx, cy = chunk.cy, "chunk decode failed: {err}");
            }
        }
    }
}

/// First tile, scanning x outer / y inner, whose key is missing from the
/// store. `None` when the scan finds nothing to resume.
pub fn find_resume_point(
    region: &CanvasRegion,
    present: &HashSet<(i32, i32)>,
    scan: ResumeScan,
) -> Option<(i32, i32)> {
    let mut x = region.px0;
    while x < region.px1 {
        let mut y = region.py0;
        while y < region.py1 {
            if !present.contains(&(x, y)) {
                return Some((x, y));
            }
            y += TILE_SIZE;
        }
        match scan {
            ResumeScan::AdvanceColumns => x += TILE_SIZE,
            ResumeScan::Faithful => return None,
        }
    }
    None
}

/// Top-level driver: owns the session, the per-tile download cycle, resume,
/// and the optional merge.
pub struct Downloader<S: ImageStore> {
    config: DownloadConfig,
    store: S,
}

impl<S: ImageStore> Downloader<S> {
    pub fn new(config: DownloadConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the download to completion. Returns the merged image when merging
    /// was requested, `None` otherwise. Cancellation aborts with
    /// `Error::Cancelled`.
    pub async fn run(&mut self, mut cancel: watch::Receiver<bool>) -> Result<Option<RgbaImage>> {
        let job: JobSlot = Arc::new(Mutex::new(None));
        let session = Session::spawn(self.config.session_config(), Assembler { job: job.clone() });
        let result = self.run_inner(&session, &job, &mut cancel).await;
        session.shutdown().await;
        result
    }

    async fn run_inner(
        &mut self,
        session: &Session,
        job: &JobSlot,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<RgbaImage>> {
        if !self.config.split {
            let region = self.config.region;
            let image = self.download_tile(session, job, region, cancel).await?;
            self.store.save(region.px0, region.py0, &image)?;
            return Ok(None);
        }

        let tiles = self.config.region.tiles();
        let present: HashSet<(i32, i32)> = self.store.keys()?.into_iter().collect();
        let start = match find_resume_point(&self.config.region, &present, self.config.resume_scan) {
            Some(root) => {
                if !present.is_empty() {
                    info!(x = root.0, y = root.1, "resuming download");
                }
                tiles
                    .iter()
                    .position(|t| (t.px0, t.py0) == root)
                    .unwrap_or(0)
            }
            None if present.is_empty() => 0,
            None => {
                info!("resume scan found no starting tile, checking tiles individually");
                0
            }
        };

        for tile in &tiles[start..] {
            if self.store.contains(tile.px0, tile.py0) {
                debug!(x = tile.px0, y = tile.py0, "tile already downloaded");
                continue;
            }
            info!(
                x0 = tile.px0,
                y0 = tile.py0,
                x1 = tile.px1,
                y1 = tile.py1,
                "downloading tile"
            );
            let image = self.download_tile(session, job, *tile, cancel).await?;
            self.store.save(tile.px0, tile.py0, &image)?;
            info!(x = tile.px0, y = tile.py0, "tile saved");
        }

        if !self.config.merge {
            return Ok(None);
        }
        self.merge_tiles().map(Some)
    }

    /// One full protocol/assembly cycle for a tile region.
    async fn download_tile(
        &self,
        session: &Session,
        job: &JobSlot,
        region: CanvasRegion,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<RgbaImage> {
        let grid = region.chunk_grid();
        info!(chunks = grid.len(), cols = grid.cols, rows = grid.rows, "requesting chunks");
        *job.lock().unwrap() = Some(TileJob::new(region));

        loop {
            if *cancel.borrow() {
                return Err(Error::Cancelled);
            }
            if job.lock().unwrap().as_ref().is_some_and(|j| j.coverage.all_done()) {
                break;
            }
            for (cx, cy) in grid.cells() {
                let (rx, ry) = grid.relative(cx, cy).expect("cell from this grid");
                if !job
                    .lock()
                    .unwrap()
                    .as_ref()
                    .is_some_and(|j| j.coverage.is_pending(rx, ry))
                {
                    continue;
                }
                wait_joined(session, cancel).await?;
                if let Err(err) = session.send(frame::chunk_request(cx, cy)) {
                    // Transient: the cell stays pending and is retried on the
                    // next pass.
                    warn!(cx, cy, "chunk request failed: {err}");
                }
                sleep(self.config.request_delay, cancel).await?;
            }
            // Requested chunks may still be in flight.
            sleep(self.config.pass_delay, cancel).await?;
        }

        eprintln!();
        let finished = job.lock().unwrap().take().expect("active tile job");
        Ok(finished.raster.into_image())
    }

    /// Paste every stored tile into one region-sized image.
    pub fn merge_tiles(&self) -> Result<RgbaImage> {
        let region = self.config.region;
        let mut merged = RgbaImage::new(region.width(), region.height());
        let mut keys = self.store.keys()?;
        keys.sort();
        let total = keys.len();
        for (done, (x, y)) in keys.into_iter().enumerate() {
            let tile = self.store.load(x, y)?;
            image::imageops::replace(
                &mut merged,
                &tile,
                (x - region.px0) as i64,
                (y - region.py0) as i64,
            );
            info!("merged tile {} of {}", done + 1, total);
        }
        Ok(merged)
    }
}

/// Resolves once the cancel channel reads true; never resolves if the sender
/// is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn wait_joined(session: &Session, cancel: &mut watch::Receiver<bool>) -> Result<()> {
    tokio::select! {
        _ = session.wait_joined() => Ok(()),
        _ = cancelled(cancel) => Err(Error::Cancelled),
    }
}

async fn sleep(delay: Duration, cancel: &mut watch::Receiver<bool>) -> Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = cancelled(cancel) => Err(Error::Cancelled),
    }
}
