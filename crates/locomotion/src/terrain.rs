//! Terrain query resource.
//!
//! Steering and physics treat terrain as read-only: ground height, water
//! height, structure height, and a per-cell legal-surface mask. The demo map
//! is generated procedurally; tests build flat maps and poke cells directly.

use bevy::prelude::*;
use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

use crate::config::PATHFIND_CELL_SIZE;
use crate::surfaces::SurfaceMask;

const DEFAULT_CELLS: usize = 64;

/// Sentinel for "no water in this cell".
const NO_WATER: f32 = f32::NEG_INFINITY;

/// Height scale for generated maps, world units.
const GEN_HEIGHT_SCALE: f32 = 60.0;
/// Generated cells with noise below this become water.
const GEN_WATER_THRESHOLD: f32 = -0.25;
/// Height delta to a neighbor above which a generated cell is a cliff.
const GEN_CLIFF_DELTA: f32 = 12.0;

#[derive(Resource, Clone)]
pub struct TerrainMap {
    width: usize,
    depth: usize,
    cell_size: f32,
    heights: Vec<f32>,
    water: Vec<f32>,
    structures: Vec<f32>,
    masks: Vec<SurfaceMask>,
}

impl Default for TerrainMap {
    fn default() -> Self {
        Self::flat(DEFAULT_CELLS, DEFAULT_CELLS, 0.0, SurfaceMask::ALL)
    }
}

impl TerrainMap {
    /// A uniform map: every cell at `height`, no water, `mask` legal everywhere.
    pub fn flat(width: usize, depth: usize, height: f32, mask: SurfaceMask) -> Self {
        let n = width * depth;
        Self {
            width,
            depth,
            cell_size: PATHFIND_CELL_SIZE,
            heights: vec![height; n],
            water: vec![NO_WATER; n],
            structures: vec![0.0; n],
            masks: vec![mask; n],
        }
    }

    /// Procedural rolling-hills map with water basins and cliff faces.
    pub fn generate(seed: i32, width: usize, depth: usize) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_frequency(Some(0.03));

        let mut map = Self::flat(width, depth, 0.0, SurfaceMask::NONE);
        for y in 0..depth {
            for x in 0..width {
                let n = noise.get_noise_2d(x as f32, y as f32);
                let i = y * width + x;
                map.heights[i] = (n.max(GEN_WATER_THRESHOLD) - GEN_WATER_THRESHOLD)
                    * GEN_HEIGHT_SCALE;
                if n < GEN_WATER_THRESHOLD {
                    map.water[i] = 0.5;
                    map.masks[i] = SurfaceMask::WATER | SurfaceMask::AIR;
                } else {
                    map.masks[i] = SurfaceMask::GROUND | SurfaceMask::AIR;
                }
            }
        }
        // Cliff pass: steep edges lose GROUND and gain CLIFF.
        for y in 0..depth {
            for x in 0..width {
                let i = y * width + x;
                let h = map.heights[i];
                let mut steep = false;
                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx < width && ny < depth {
                        let nh = map.heights[ny * width + nx];
                        if (nh - h).abs() > GEN_CLIFF_DELTA {
                            steep = true;
                        }
                    }
                }
                if steep && map.water[i] == NO_WATER {
                    map.masks[i] = SurfaceMask::CLIFF | SurfaceMask::AIR;
                }
            }
        }
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn world_extent(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size,
            self.depth as f32 * self.cell_size,
        )
    }

    fn index_at(&self, x: f32, y: f32) -> usize {
        let cx = ((x / self.cell_size).floor() as isize).clamp(0, self.width as isize - 1);
        let cy = ((y / self.cell_size).floor() as isize).clamp(0, self.depth as isize - 1);
        cy as usize * self.width + cx as usize
    }

    pub fn ground_height(&self, x: f32, y: f32) -> f32 {
        self.heights[self.index_at(x, y)]
    }

    pub fn water_height(&self, x: f32, y: f32) -> Option<f32> {
        let w = self.water[self.index_at(x, y)];
        (w != NO_WATER).then_some(w)
    }

    /// Height of the highest walkable layer: water surface where present,
    /// ground otherwise.
    pub fn layer_height(&self, x: f32, y: f32) -> f32 {
        let ground = self.ground_height(x, y);
        match self.water_height(x, y) {
            Some(w) => w.max(ground),
            None => ground,
        }
    }

    /// Ground height, or the roof of a structure occupying the cell if taller.
    pub fn ground_or_structure_height(&self, x: f32, y: f32) -> f32 {
        let i = self.index_at(x, y);
        self.heights[i].max(self.structures[i])
    }

    pub fn is_underwater(&self, x: f32, y: f32) -> bool {
        match self.water_height(x, y) {
            Some(w) => w > self.ground_height(x, y),
            None => false,
        }
    }

    /// Whether a locomotor restricted to `surfaces` may occupy this position.
    pub fn valid_movement_terrain(&self, surfaces: SurfaceMask, pos: Vec3) -> bool {
        self.masks[self.index_at(pos.x, pos.y)].intersects(surfaces)
    }

    // -- test/editor mutators ------------------------------------------------

    pub fn set_cell_height(&mut self, cx: usize, cy: usize, height: f32) {
        let i = cy * self.width + cx;
        self.heights[i] = height;
    }

    pub fn set_cell_water(&mut self, cx: usize, cy: usize, water: Option<f32>) {
        let i = cy * self.width + cx;
        self.water[i] = water.unwrap_or(NO_WATER);
    }

    pub fn set_cell_structure(&mut self, cx: usize, cy: usize, roof: f32) {
        let i = cy * self.width + cx;
        self.structures[i] = roof;
    }

    pub fn set_cell_mask(&mut self, cx: usize, cy: usize, mask: SurfaceMask) {
        let i = cy * self.width + cx;
        self.masks[i] = mask;
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_queries() {
        let map = TerrainMap::flat(8, 8, 5.0, SurfaceMask::GROUND);
        assert_eq!(map.ground_height(15.0, 15.0), 5.0);
        assert_eq!(map.water_height(15.0, 15.0), None);
        assert!(!map.is_underwater(15.0, 15.0));
        assert!(map.valid_movement_terrain(SurfaceMask::GROUND, Vec3::new(15.0, 15.0, 0.0)));
        assert!(!map.valid_movement_terrain(SurfaceMask::AIR, Vec3::new(15.0, 15.0, 0.0)));
    }

    #[test]
    fn test_out_of_bounds_clamps_to_border() {
        let mut map = TerrainMap::flat(4, 4, 0.0, SurfaceMask::GROUND);
        map.set_cell_height(3, 3, 9.0);
        assert_eq!(map.ground_height(1e6, 1e6), 9.0);
        assert_eq!(map.ground_height(-1e6, -1e6), 0.0);
    }

    #[test]
    fn test_water_and_layer_height() {
        let mut map = TerrainMap::flat(4, 4, 2.0, SurfaceMask::GROUND);
        map.set_cell_water(1, 1, Some(6.0));
        let (x, y) = (1.5 * PATHFIND_CELL_SIZE, 1.5 * PATHFIND_CELL_SIZE);
        assert!(map.is_underwater(x, y));
        assert_eq!(map.layer_height(x, y), 6.0);
        assert_eq!(map.layer_height(35.0, 35.0), 2.0);
    }

    #[test]
    fn test_structure_height() {
        let mut map = TerrainMap::flat(4, 4, 2.0, SurfaceMask::GROUND);
        map.set_cell_structure(0, 0, 14.0);
        assert_eq!(map.ground_or_structure_height(1.0, 1.0), 14.0);
        assert_eq!(map.ground_or_structure_height(35.0, 1.0), 2.0);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = TerrainMap::generate(7, 32, 32);
        let b = TerrainMap::generate(7, 32, 32);
        assert_eq!(a.heights, b.heights);
        let c = TerrainMap::generate(8, 32, 32);
        assert_ne!(a.heights, c.heights);
    }
}
