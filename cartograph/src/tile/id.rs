//! Tile addressing: the (z, x, y) coordinate identifying one tile of a
//! source's Web-Mercator grid.

use serde::{Deserialize, Serialize};

/// Coordinate of one tile in a source's grid. Total order is `(z, x, y)`
/// ascending, per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId {
    /// Zoom level.
    pub z: u32,
    /// Column, wrapped into `[0, 2^z)`.
    pub x: i64,
    /// Row.
    pub y: i64,
}

impl TileId {
    /// Creates a tile id, wrapping `x` into `[0, 2^z)` (the grid wraps
    /// horizontally around the antimeridian; `y` does not wrap).
    pub fn new(z: u32, x: i64, y: i64) -> Self {
        Self {
            z,
            x: wrap_x(x, z),
            y,
        }
    }

    /// The tile one zoom level up (`z - 1`) that contains this one, if any.
    pub fn parent(&self) -> Option<TileId> {
        if self.z == 0 {
            return None;
        }
        Some(TileId::new(self.z - 1, self.x.div_euclid(2), self.y.div_euclid(2)))
    }

    /// The four tiles one zoom level down (`z + 1`) contained within this one.
    pub fn children(&self) -> [TileId; 4] {
        let z = self.z + 1;
        let x = self.x * 2;
        let y = self.y * 2;
        [
            TileId::new(z, x, y),
            TileId::new(z, x + 1, y),
            TileId::new(z, x, y + 1),
            TileId::new(z, x + 1, y + 1),
        ]
    }
}

fn wrap_x(x: i64, z: u32) -> i64 {
    let width = 1i64 << z;
    x.rem_euclid(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_wraps_around_the_grid_width() {
        assert_eq!(TileId::new(2, -1, 0).x, 3);
        assert_eq!(TileId::new(2, 4, 0).x, 0);
    }

    #[test]
    fn parent_halves_coordinates_at_one_lower_zoom() {
        let tile = TileId::new(3, 5, 2);
        assert_eq!(tile.parent(), Some(TileId::new(2, 2, 1)));
    }

    #[test]
    fn root_tile_has_no_parent() {
        assert_eq!(TileId::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn children_cover_the_tile_at_one_higher_zoom() {
        let tile = TileId::new(2, 2, 1);
        let children = tile.children();
        for child in children {
            assert_eq!(child.parent(), Some(tile));
        }
    }

    #[test]
    fn total_order_is_z_then_x_then_y() {
        assert!(TileId::new(1, 0, 0) < TileId::new(2, 0, 0));
        assert!(TileId::new(2, 0, 0) < TileId::new(2, 1, 0));
        assert!(TileId::new(2, 1, 0) < TileId::new(2, 1, 1));
    }
}
