pub mod coverage;
pub mod raster;
pub mod region;
pub mod store;

pub use coverage::CoverageMap;
pub use raster::Raster;
pub use region::{CanvasRegion, ChunkGrid, TILE_SIZE};
pub use store::{DirectoryStore, ImageStore, MemoryStore};
