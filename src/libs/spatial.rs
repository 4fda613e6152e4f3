//! Radius queries over atom coordinates.

use crate::libs::structure::Atom;
use fxhash::FxHashMap;
use itertools::iproduct;

/// Finds atoms near a point. Indices refer to the atom slice the index was
/// built from.
pub trait SpatialIndex {
    fn query(&self, point: [f64; 3], radius: f64) -> Vec<usize>;
}

/// Uniform grid of cubic cells holding atom indices.
///
/// Queries with a radius up to the cell size only visit the 27 cells around
/// the query point; larger radii widen the search accordingly.
#[derive(Debug)]
pub struct NeighborSearch {
    cell_size: f64,
    cells: FxHashMap<(i64, i64, i64), Vec<usize>>,
    positions: Vec<[f64; 3]>,
}

impl NeighborSearch {
    /// Indexes the atoms accepted by `filter`; rejected atoms are never
    /// returned by [`SpatialIndex::query`].
    ///
    /// # Panics
    ///
    /// Panics if `cell_size <= 0.0`.
    pub fn new<F>(atoms: &[Atom], cell_size: f64, filter: F) -> Self
    where
        F: Fn(&Atom) -> bool,
    {
        assert!(cell_size > 0.0, "Cell size must be positive");
        let mut grid = Self {
            cell_size,
            cells: FxHashMap::default(),
            positions: atoms.iter().map(|a| a.coord).collect(),
        };
        for (idx, atom) in atoms.iter().enumerate() {
            if filter(atom) {
                let cell = grid.cell_coords(atom.coord);
                grid.cells.entry(cell).or_default().push(idx);
            }
        }
        grid
    }

    fn cell_coords(&self, pos: [f64; 3]) -> (i64, i64, i64) {
        (
            (pos[0] / self.cell_size).floor() as i64,
            (pos[1] / self.cell_size).floor() as i64,
            (pos[2] / self.cell_size).floor() as i64,
        )
    }
}

impl SpatialIndex for NeighborSearch {
    fn query(&self, point: [f64; 3], radius: f64) -> Vec<usize> {
        let radius_sq = radius * radius;
        let reach = (radius / self.cell_size).ceil().max(1.0) as i64;
        let (cx, cy, cz) = self.cell_coords(point);

        let mut results = Vec::new();
        for (dx, dy, dz) in iproduct!(-reach..=reach, -reach..=reach, -reach..=reach) {
            if let Some(indices) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                for &idx in indices {
                    let pos = self.positions[idx];
                    let dist_sq = (pos[0] - point[0]).powi(2)
                        + (pos[1] - point[1]).powi(2)
                        + (pos[2] - point[2]).powi(2);
                    if dist_sq <= radius_sq {
                        results.push(idx);
                    }
                }
            }
        }

        results.sort_unstable();
        results
    }
}
