use glam::IVec2;

use crate::api::SurfaceProbeApi;
use crate::tiles::{SurfaceHit, TileMap};
use crate::types::*;

/// Signed direction a probe of this orientation looks along its axis.
#[inline]
pub(crate) fn depth_sign(probe: CollisionMode) -> i32 {
    let d = probe.down();
    d.x + d.y
}

/// Component of `v` along the probe's depth axis.
#[inline]
pub(crate) fn depth(probe: CollisionMode, v: IVec2) -> i32 {
    if probe.is_wall() { v.x } else { v.y }
}

#[inline]
pub(crate) fn set_depth(probe: CollisionMode, v: &mut IVec2, value: i32) {
    if probe.is_wall() {
        v.x = value;
    } else {
        v.y = value;
    }
}

impl TileMap {
    /// Surfaces seen from whole pixel `p` in the tile behind, the tile
    /// containing, and the tile ahead of `p` along the probe direction.
    fn scan(&self, plane: usize, probe: CollisionMode, p: IVec2) -> [Option<SurfaceHit>; 3] {
        let step = probe.down() * TILE_SIZE;
        [
            self.surface_at(plane, probe, p - step),
            self.surface_at(plane, probe, p),
            self.surface_at(plane, probe, p + step),
        ]
    }
}

impl SurfaceProbeApi for TileMap {
    fn surface_collision(&self, plane: usize, probe: CollisionMode, sensor: &mut Sensor) {
        sensor.collided = false;
        let start = to_whole(sensor.pos);
        let p = depth(probe, start);
        let d = depth_sign(probe);

        let crossed = self
            .scan(plane, probe, start)
            .into_iter()
            .flatten()
            .find(|hit| d * (p - hit.coord) > 0);
        let Some(hit) = crossed else { return };
        if (hit.coord - p).abs() > TILE_SIZE - 1 {
            return;
        }
        set_depth(probe, &mut sensor.pos, whole_to_fixed(hit.coord));
        sensor.angle = hit.angle;
        sensor.collided = true;
    }

    fn find_surface(&self, plane: usize, probe: CollisionMode, sensor: &mut Sensor) {
        sensor.collided = false;
        let start = *sensor;
        let p = depth(probe, to_whole(start.pos));

        for hit in self.scan(plane, probe, to_whole(start.pos)).into_iter().flatten() {
            if angle_distance(hit.angle, start.angle) > 0x20 {
                // a sudden slope change ends the search outright
                return;
            }
            if (hit.coord - p).abs() > TILE_SIZE - 2 {
                continue;
            }
            set_depth(probe, &mut sensor.pos, whole_to_fixed(hit.coord));
            sensor.angle = hit.angle;
            sensor.collided = true;
            return;
        }
    }
}
