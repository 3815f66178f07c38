use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::Result;

/// Store of completed tile images keyed by tile root pixel coordinate.
/// Presence of a key means the tile finished downloading; the resume scan is
/// built on that.
pub trait ImageStore {
    fn keys(&self) -> Result<Vec<(i32, i32)>>;
    fn contains(&self, x: i32, y: i32) -> bool;
    fn save(&mut self, x: i32, y: i32, image: &RgbaImage) -> Result<()>;
    fn load(&self, x: i32, y: i32) -> Result<RgbaImage>;
}

/// Directory-backed store: one `<x>_<y>.png` per tile under
/// `<canvas>_<px0>_<py0>/`. Files that do not match that shape are ignored
/// when listing.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Standard directory for a download, created if missing.
    pub fn open(canvas: &str, px0: i32, py0: i32) -> Result<Self> {
        Self::at(PathBuf::from(format!("{canvas}_{px0}_{py0}")))
    }

    pub fn at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tile_path(&self, x: i32, y: i32) -> PathBuf {
        self.root.join(format!("{x}_{y}.png"))
    }
}

impl ImageStore for DirectoryStore {
    fn keys(&self) -> Result<Vec<(i32, i32)>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".png") else { continue };
            let Some((x, y)) = stem.split_once('_') else { continue };
            let (Ok(x), Ok(y)) = (x.parse(), y.parse()) else { continue };
            keys.push((x, y));
        }
        Ok(keys)
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.tile_path(x, y).exists()
    }

    fn save(&mut self, x: i32, y: i32, image: &RgbaImage) -> Result<()> {
        image.save(self.tile_path(x, y))?;
        Ok(())
    }

    fn load(&self, x: i32, y: i32) -> Result<RgbaImage> {
        Ok(image::open(self.tile_path(x, y))?.to_rgba8())
    }
}

/// In-memory store, useful for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    tiles: HashMap<(i32, i32), RgbaImage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageStore for MemoryStore {
    fn keys(&self) -> Result<Vec<(i32, i32)>> {
        Ok(self.tiles.keys().copied().collect())
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.tiles.contains_key(&(x, y))
    }

    fn save(&mut self, x: i32, y: i32, image: &RgbaImage) -> Result<()> {
        self.tiles.insert((x, y), image.clone());
        Ok(())
    }

    fn load(&self, x: i32, y: i32) -> Result<RgbaImage> {
        self.tiles
            .get(&(x, y))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("tile {x}_{y}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(!store.contains(0, 0));
        store.save(0, 4096, &RgbaImage::new(4, 4)).unwrap();
        assert!(store.contains(0, 4096));
        assert_eq!(store.load(0, 4096).unwrap().dimensions(), (4, 4));
        assert!(store.load(1, 1).is_err());
        assert_eq!(store.keys().unwrap(), vec![(0, 4096)]);
    }

    #[test]
    fn test_directory_store_listing() {
        let dir = std::env::temp_dir().join(format!(
            "owop-store-test-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        let mut store = DirectoryStore::at(dir.clone()).unwrap();

        store.save(0, 0, &RgbaImage::new(2, 2)).unwrap();
        store.save(-4096, 4096, &RgbaImage::new(2, 2)).unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").unwrap();
        fs::write(dir.join("bad_name_extra.png"), b"ignored").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec![(-4096, 4096), (0, 0)]);
        assert!(store.contains(0, 0));
        assert!(!store.contains(7, 7));
        assert_eq!(store.load(0, 0).unwrap().dimensions(), (2, 2));

        fs::remove_dir_all(&dir).unwrap();
    }
}
