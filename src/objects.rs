//! Single-axis snap queries for scripted objects.

use glam::IVec2;

use crate::probe::{depth, depth_sign, set_depth};
use crate::tiles::TileMap;
use crate::types::*;

/// Strictly inside the stage, excluding the zero row and column.
fn on_stage(map: &TileMap, p: IVec2) -> bool {
    let size = map.layout.pixel_size();
    p.x > 0 && p.y > 0 && p.x < size.x && p.y < size.y
}

/// Test the one tile under `entity + offset`; if the probe point has sunk
/// past the `probe` surface, move the entity so the point rests on it.
pub fn object_collision(map: &TileMap, plane: usize, probe: CollisionMode, entity: &mut Entity, offset: IVec2) -> bool {
    let p = entity.whole_position() + offset;
    if !on_stage(map, p) {
        return false;
    }
    let Some(hit) = map.surface_at(plane, probe, p) else {
        return false;
    };
    if depth_sign(probe) * (depth(probe, p) - hit.coord) <= 0 {
        return false;
    }
    set_depth(probe, &mut entity.position, whole_to_fixed(hit.coord - depth(probe, offset)));
    true
}

/// Search the tile before, at and after `entity + offset` and stick the
/// probe point to the first surface found, if it lies within one tile.
/// Also turns the entity to the surface angle.
pub fn object_grip(map: &TileMap, plane: usize, probe: CollisionMode, entity: &mut Entity, offset: IVec2) -> bool {
    let p = entity.whole_position() + offset;
    let step = probe.down() * TILE_SIZE;
    let found = [p - step, p, p + step]
        .into_iter()
        .filter(|&q| on_stage(map, q))
        .find_map(|q| map.surface_at(plane, probe, q));
    let Some(hit) = found else {
        return false;
    };
    if (hit.coord - depth(probe, p)).abs() >= TILE_SIZE {
        return false;
    }
    set_depth(probe, &mut entity.position, whole_to_fixed(hit.coord - depth(probe, offset)));
    entity.rotation = hit.angle << 1;
    true
}
