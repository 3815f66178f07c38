use image::{Rgba, RgbaImage};

use crate::codec::{DecodedChunk, CHUNK_SIZE};
use super::region::CanvasRegion;

/// Owned pixel buffer for one tile, addressed by canvas-absolute coordinates.
/// Chunk pixels landing outside the tile bounds are dropped.
pub struct Raster {
    root_x: i32,
    root_y: i32,
    image: RgbaImage,
}

impl Raster {
    pub fn new(region: &CanvasRegion) -> Self {
        Self {
            root_x: region.px0,
            root_y: region.py0,
            image: RgbaImage::new(region.width(), region.height()),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Write a decoded chunk at its canvas position, clipping at the tile
    /// edges.
    pub fn blit_chunk(&mut self, chunk: &DecodedChunk) {
        let base_x = chunk.cx * CHUNK_SIZE - self.root_x;
        let base_y = chunk.cy * CHUNK_SIZE - self.root_y;
        let mut idx = 0;
        for py in 0..CHUNK_SIZE {
            for px in 0..CHUNK_SIZE {
                let rgb = &chunk.pixels[idx..idx + 3];
                idx += 3;
                self.put_pixel(base_x + px, base_y + py, rgb[0], rgb[1], rgb[2]);
            }
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, Rgba([r, g, b, 255]));
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CHUNK_BYTES;

    fn uniform_chunk(cx: i32, cy: i32, color: [u8; 3]) -> DecodedChunk {
        DecodedChunk {
            cx,
            cy,
            pixels: color.iter().copied().cycle().take(CHUNK_BYTES).collect(),
        }
    }

    #[test]
    fn test_chunk_placement() {
        let mut raster = Raster::new(&CanvasRegion::new(0, 0, 32, 32).unwrap());
        raster.blit_chunk(&uniform_chunk(1, 0, [9, 8, 7]));
        assert_eq!(raster.pixel(16, 0), [9, 8, 7, 255]);
        assert_eq!(raster.pixel(31, 15), [9, 8, 7, 255]);
        // Untouched quadrants keep the transparent initial value.
        assert_eq!(raster.pixel(15, 0), [0, 0, 0, 0]);
        assert_eq!(raster.pixel(16, 16), [0, 0, 0, 0]);
    }

    #[test]
    fn test_chunk_clipping() {
        // 20x20 tile: chunk (1,1) only covers x,y in [16,20).
        let mut raster = Raster::new(&CanvasRegion::new(0, 0, 20, 20).unwrap());
        raster.blit_chunk(&uniform_chunk(1, 1, [1, 2, 3]));
        assert_eq!(raster.pixel(16, 16), [1, 2, 3, 255]);
        assert_eq!(raster.pixel(19, 19), [1, 2, 3, 255]);
        assert_eq!(raster.pixel(15, 16), [0, 0, 0, 0]);
    }

    #[test]
    fn test_unaligned_tile_root() {
        // Tile rooted mid-chunk: chunk (0,0) spills left of the tile and is
        // clipped there.
        let mut raster = Raster::new(&CanvasRegion::new(8, 8, 24, 24).unwrap());
        raster.blit_chunk(&uniform_chunk(0, 0, [5, 5, 5]));
        assert_eq!(raster.pixel(0, 0), [5, 5, 5, 255]); // canvas (8,8)
        assert_eq!(raster.pixel(7, 7), [5, 5, 5, 255]); // canvas (15,15)
        assert_eq!(raster.pixel(8, 8), [0, 0, 0, 0]);   // canvas (16,16), chunk (1,1)
    }

    #[test]
    fn test_negative_coordinates() {
        let mut raster = Raster::new(&CanvasRegion::new(-16, -16, 0, 0).unwrap());
        raster.blit_chunk(&uniform_chunk(-1, -1, [4, 4, 4]));
        assert_eq!(raster.pixel(0, 0), [4, 4, 4, 255]);
        assert_eq!(raster.pixel(15, 15), [4, 4, 4, 255]);
    }
}
