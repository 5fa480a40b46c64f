//! Airborne resolution: up to six sensors swept through the frame's
//! velocity in sub-steps short enough that no tile can be skipped.

use glam::IVec2;
use tracing::{debug, trace};

use crate::api::SurfaceProbeApi;
use crate::tiles::TileMap;
use crate::trig::arc_tan;
use crate::types::*;

/// Sensor slots used while airborne.
const RIGHT: usize = 0;
const LEFT: usize = 1;
const FLOOR: [usize; 2] = [2, 3];
const ROOF: [usize; 2] = [4, 5];

const LANDING_NUDGE: i32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Probe {
    Off,
    Probing,
    Hit,
}

impl Probe {
    fn when(active: bool) -> Self {
        if active { Self::Probing } else { Self::Off }
    }
}

/// Number of sub-steps for a frame's velocity: one per started 8 px of the
/// dominant axis.
pub fn air_substeps(velocity: IVec2) -> i32 {
    (velocity.x.abs().max(velocity.y.abs()) >> 19) + 1
}

pub fn process_air_collision(map: &TileMap, hitbox: &Hitbox, cfg: &CollisionConfig, player: &mut Player) -> StepOutcome {
    let bounds = hitbox.rect(0);
    let feet = hitbox.rect(1);
    let plane = player.collision_plane;
    let pos = player.position;
    let v = player.velocity;

    let mut sensors: SensorSet = Default::default();
    let fx = |off: i32| pos.x + whole_to_fixed(off);
    sensors[RIGHT] = Sensor::at(IVec2::new(fx(bounds.right), pos.y), player.angle);
    sensors[LEFT] = Sensor::at(IVec2::new(fx(bounds.left - 1), pos.y), player.angle);
    let floor_y = pos.y + whole_to_fixed(bounds.bottom);
    let roof_y = pos.y + whole_to_fixed(bounds.top - 1);
    sensors[FLOOR[0]] = Sensor::at(IVec2::new(fx(feet.left), floor_y), player.angle);
    sensors[FLOOR[1]] = Sensor::at(IVec2::new(fx(feet.right), floor_y), player.angle);
    sensors[ROOF[0]] = Sensor::at(IVec2::new(fx(feet.left), roof_y), player.angle);
    sensors[ROOF[1]] = Sensor::at(IVec2::new(fx(feet.right), roof_y), player.angle);

    let mut right = Probe::when(v.x >= 0);
    let mut left = Probe::when(v.x <= 0);
    let floor = Probe::when(v.y >= 0);
    let mut roof = Probe::when(v.y < 0);

    let steps = air_substeps(v);
    let mut step = v / steps;
    let last = v - step * (steps - 1);
    let mut new_x = None;
    let mut landed = false;
    let mut bonked = false;

    for i in 0..steps {
        if i == steps - 1 {
            step.y = last.y;
            if new_x.is_none() {
                step.x = last.x;
            }
        }
        // a floor or roof hit ends vertical travel; the walls keep sweeping
        if landed || bonked {
            if right != Probe::Probing && left != Probe::Probing {
                break;
            }
            step.y = 0;
        }
        for s in sensors.iter_mut() {
            s.pos += step;
        }

        for (slot, probe, phase) in [
            (RIGHT, CollisionMode::RWall, &mut right),
            (LEFT, CollisionMode::LWall, &mut left),
        ] {
            if *phase != Probe::Probing {
                continue;
            }
            map.surface_collision(plane, probe, &mut sensors[slot]);
            if !sensors[slot].collided {
                continue;
            }
            *phase = Probe::Hit;
            let wall_x = fixed_to_whole(sensors[slot].pos.x);
            let x = if probe == CollisionMode::RWall {
                wall_x - bounds.right
            } else {
                wall_x - bounds.left + 1
            };
            trace!(?probe, x, "air wall hit");
            new_x = Some(whole_to_fixed(x));
            player.velocity.x = 0;
            player.speed = 0;
            step.x = 0;
            let narrow = [whole_to_fixed(x + bounds.left + 1), whole_to_fixed(x + bounds.right - 2)];
            for (k, nx) in narrow.into_iter().enumerate() {
                sensors[FLOOR[k]].pos.x = nx;
                sensors[ROOF[k]].pos.x = nx;
            }
            roof = Probe::Off;
        }

        if landed || bonked {
            continue;
        }
        if floor == Probe::Probing {
            for slot in FLOOR {
                map.floor_collision(plane, &mut sensors[slot]);
                landed |= sensors[slot].collided;
            }
        }
        if roof == Probe::Probing {
            for slot in ROOF {
                map.roof_collision(plane, &mut sensors[slot]);
                bonked |= sensors[slot].collided;
            }
        }
    }

    player.position.x = match new_x {
        Some(x) => x,
        None => pos.x + player.velocity.x,
    };

    if landed {
        land(&sensors, bounds, cfg, player)
    } else if bonked {
        hit_roof(&sensors, bounds, player)
    } else {
        player.position.y = pos.y + player.velocity.y;
        StepOutcome::Airborne
    }
}

/// Pick the landing sensor: highest surface, then the flatter angle.
fn landing_sensor(sensors: &SensorSet) -> Sensor {
    let [a, b] = FLOOR.map(|i| sensors[i]);
    match (a.collided, b.collided) {
        (true, false) => a,
        (false, true) => b,
        _ => {
            let key = |s: &Sensor| (fixed_to_whole(s.pos.y), angle_distance(s.angle, 0));
            if key(&b) < key(&a) { b } else { a }
        }
    }
}

fn land(sensors: &SensorSet, bounds: Rect, cfg: &CollisionConfig, player: &mut Player) -> StepOutcome {
    let ground = landing_sensor(sensors);
    let angle = wrap_angle(ground.angle);
    player.position.y = whole_to_fixed(fixed_to_whole(ground.pos.y) - bounds.bottom);
    player.angle = angle;
    player.rotation = angle << 1;
    player.gravity = Gravity::Attached;

    player.collision_mode = if angle > 0xA0 && angle < 0xDE {
        player.position.x -= whole_to_fixed(LANDING_NUDGE);
        CollisionMode::LWall
    } else if angle > 0x22 && angle < 0x60 {
        player.position.x += whole_to_fixed(LANDING_NUDGE);
        CollisionMode::RWall
    } else {
        CollisionMode::Floor
    };
    if angle < 0x20 || angle > 0xE0 {
        player.control_lock = 0;
    }

    let (vx, vy) = (player.velocity.x, player.velocity.y);
    let boost = vy + vy / 12;
    let speed = if angle < 0x80 {
        if angle < 0x10 {
            vx
        } else if angle < 0x20 {
            if vx.abs() <= (vy >> 1).abs() { -(boost >> 1) } else { vx }
        } else if vx.abs() <= vy.abs() {
            -boost
        } else {
            vx
        }
    } else if angle > 0xF0 {
        vx
    } else if angle > 0xE0 {
        if vx.abs() <= (vy >> 1).abs() { boost >> 1 } else { vx }
    } else if vx.abs() <= vy.abs() {
        boost
    } else {
        vx
    };
    player.speed = speed.clamp(-cfg.max_landing_speed, cfg.max_landing_speed);
    player.velocity.y = 0;

    debug!(mode = ?player.collision_mode, angle, speed = player.speed, "landed");
    StepOutcome::Landed
}

fn hit_roof(sensors: &SensorSet, bounds: Rect, player: &mut Player) -> StepOutcome {
    let [a, b] = ROOF.map(|i| sensors[i]);
    let ceiling = match (a.collided, b.collided) {
        (true, false) => a,
        (false, true) => b,
        _ if fixed_to_whole(b.pos.y) > fixed_to_whole(a.pos.y) => b,
        _ => a,
    };
    player.position.y = whole_to_fixed(fixed_to_whole(ceiling.pos.y) - bounds.top + 1);

    let (vx, vy) = (player.velocity.x, player.velocity.y);
    let surface = wrap_angle(ceiling.angle);
    let travel = arc_tan(vx, -vy);

    let attach = if surface > 0x40 && surface < 0x62 && travel > 0x20 && travel < 0x42 {
        let speed = if surface > 0x60 { -vy >> 1 } else { -vy };
        Some((CollisionMode::RWall, speed, LANDING_NUDGE))
    } else if surface > 0x9E && surface < 0xC0 && travel > 0x3E && travel < 0x60 {
        let speed = if surface < 0xA0 { vy >> 1 } else { vy };
        Some((CollisionMode::LWall, speed, -LANDING_NUDGE))
    } else {
        None
    };

    match attach {
        Some((mode, speed, nudge)) => {
            player.position += IVec2::new(whole_to_fixed(nudge), whole_to_fixed(-2));
            player.collision_mode = mode;
            player.gravity = Gravity::Attached;
            player.angle = surface;
            player.rotation = surface << 1;
            player.speed = speed;
            debug!(?mode, angle = surface, speed, "caught ceiling");
            StepOutcome::AttachedToWall
        }
        None => {
            if vy < 0 {
                player.velocity.y = 0;
            }
            trace!(angle = surface, "hit roof");
            StepOutcome::HitRoof
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{ChunkTile, CollisionMask, Flip, PackedAngles, Solidity};

    fn stage(tiles: &[(i32, i32, u16)], masks: Vec<CollisionMask>) -> TileMap {
        let mut m = TileMap::with_unique_chunks(2, 2, masks).unwrap();
        for &(tx, ty, idx) in tiles {
            m.set_tile(tx, ty, ChunkTile::new(idx, Flip::None, Solidity::All)).unwrap();
        }
        m
    }

    fn basic_masks() -> Vec<CollisionMask> {
        vec![CollisionMask::empty(), CollisionMask::solid()]
    }

    fn falling(x: i32, y: i32, v: IVec2) -> (Player, Hitbox) {
        let mut p = Player::new(x, y, HitboxRef::default());
        p.velocity = v;
        (p, Hitbox::upright(9, 19))
    }

    #[test]
    fn test_substep_formula() {
        for vx in (-0x300000..0x300000).step_by(0x7FFF) {
            for vy in [0, 0x7FFFF, 0x80000, -0x180001] {
                let v = IVec2::new(vx, vy);
                let steps = air_substeps(v);
                assert_eq!(steps, (vx.abs().max(vy.abs()) >> 19) + 1);
                // no step is longer than half a tile, give or take the remainder
                let step = v / steps;
                let last = v - step * (steps - 1);
                assert!(step.x.abs() <= 0x80000 && last.x.abs() <= 0x80000 + steps);
                assert!(step.y.abs() <= 0x80000 && last.y.abs() <= 0x80000 + steps);
            }
        }
    }

    #[test]
    fn test_free_fall_integrates() {
        let m = stage(&[], basic_masks());
        let (mut p, hb) = falling(100, 40, IVec2::new(0x18000, 0x28000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::Airborne);
        assert_eq!(p.position, IVec2::new(whole_to_fixed(100) + 0x18000, whole_to_fixed(40) + 0x28000));
        assert_eq!(p.gravity, Gravity::Airborne);
    }

    #[test]
    fn test_thin_wall_is_never_skipped() {
        // a one-tile column at tx = 10 (x 160..176)
        let tiles: Vec<_> = (0..16).map(|ty| (10, ty, 1)).collect();
        let m = stage(&tiles, basic_masks());
        for vx in (0x10000..0x300000).step_by(0x3333) {
            for start in 120..140 {
                let (mut p, hb) = falling(start, 100, IVec2::new(vx, 0));
                if start + 9 + fixed_to_whole(vx) <= 160 {
                    continue;
                }
                process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
                assert_eq!(p.position.x, whole_to_fixed(160 - 9), "vx={vx:#x} start={start}");
                assert_eq!(p.velocity.x, 0);
            }
        }
    }

    #[test]
    fn test_landing_still_meets_wall_in_same_frame() {
        // floor row at y = 128, a one-tile wall at x = 128..144 standing on it
        let mut tiles: Vec<_> = (0..16).map(|tx| (tx, 8, 1)).collect();
        tiles.extend((0..8).map(|ty| (8, ty, 1)));
        let m = stage(&tiles, basic_masks());
        let (mut p, hb) = falling(100, 108, IVec2::new(0x280000, 0x80000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::Landed);
        assert_eq!(p.position, IVec2::new(whole_to_fixed(128 - 9), whole_to_fixed(128 - 19)));
        assert_eq!((p.velocity.x, p.speed), (0, 0));
    }

    #[test]
    fn test_wall_hit_disables_roof_probe() {
        let tiles = [(10, 6, 1), (10, 5, 1), (9, 4, 1)];
        let m = stage(&tiles, basic_masks());
        let (mut p, hb) = falling(150, 100, IVec2::new(0x40000, -0x40000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::Airborne);
        assert_eq!(p.position, IVec2::new(whole_to_fixed(151), whole_to_fixed(96)));
        assert_eq!(p.velocity, IVec2::new(0, -0x40000));
    }

    #[test]
    fn test_landing_speed_bands() {
        let steep = |angle: u8| {
            let mut rows = [0u16; 16];
            rows[8..].fill(0xFFFF);
            CollisionMask::from_pixels(rows, PackedAngles::new(angle, 0x40, 0xC0, 0x80))
        };
        let cfg = CollisionConfig::default();
        let vy = 0x60000;
        let case = |angle: u8, vx: i32| {
            let m = stage(&[(6, 6, 1)], vec![CollisionMask::empty(), steep(angle)]);
            let (mut p, hb) = falling(100, 96 + 8 - 19 - 2, IVec2::new(vx, vy));
            let out = process_air_collision(&m, &hb, &cfg, &mut p);
            assert_eq!(out, StepOutcome::Landed, "angle {angle:#x}");
            p
        };
        let boost = vy + vy / 12;
        assert_eq!(case(0x08, 0x12345).speed, 0x12345);
        assert_eq!(case(0x18, 0x10000).speed, -(boost >> 1));
        assert_eq!(case(0x18, 0x50000).speed, 0x50000);
        assert_eq!(case(0x30, 0x10000).speed, -boost);
        assert_eq!(case(0xE8, 0x10000).speed, boost >> 1);
        assert_eq!(case(0xD0, -0x10000).speed, boost);
        assert_eq!(case(0xF8, -0x7000).speed, -0x7000);

        let p = case(0x30, 0);
        assert_eq!(p.collision_mode, CollisionMode::RWall);
        assert_eq!(p.position.x, whole_to_fixed(104));
        let p = case(0xC8, 0);
        assert_eq!(p.collision_mode, CollisionMode::LWall);
        assert_eq!(p.position.x, whole_to_fixed(96));
        assert_eq!(p.rotation, 0xC8 << 1);
        assert_eq!(p.velocity.y, 0);
    }

    #[test]
    fn test_landing_speed_is_clamped() {
        let m = stage(&[(6, 6, 1)], vec![CollisionMask::empty(), {
            let mut m = CollisionMask::solid();
            m.angles = PackedAngles::new(0x30, 0x40, 0xC0, 0x80);
            m
        }]);
        let (mut p, hb) = falling(100, 96 - 19 - 4, IVec2::new(0, 0x1F0000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::Landed);
        assert_eq!(p.speed, -whole_to_fixed(0x18));
    }

    #[test]
    fn test_flat_ceiling_stops_rise() {
        let m = stage(&[(6, 2, 1)], basic_masks());
        let (mut p, hb) = falling(100, 70, IVec2::new(0x8000, -0x60000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::HitRoof);
        assert_eq!(out.check_result(), 2);
        assert_eq!(p.position.y, whole_to_fixed(47 + 19 + 1));
        assert_eq!(p.velocity.y, 0);
        assert_eq!(p.gravity, Gravity::Airborne);
    }

    #[test]
    fn test_steep_ceiling_attaches_to_wall() {
        let mut roof = CollisionMask::solid();
        roof.angles = PackedAngles::new(0x00, 0x40, 0xC0, 0x50);
        let m = stage(&[(6, 2, 1)], vec![CollisionMask::empty(), roof]);
        // moving up and to the right at about 0x2A
        let (mut p, hb) = falling(98, 70, IVec2::new(0x30000, -0x50000));
        let out = process_air_collision(&m, &hb, &CollisionConfig::default(), &mut p);
        assert_eq!(out, StepOutcome::AttachedToWall);
        assert_eq!(p.collision_mode, CollisionMode::RWall);
        assert_eq!(p.gravity, Gravity::Attached);
        assert_eq!(p.angle, 0x50);
        assert_eq!(p.speed, 0x50000);
        assert_eq!(p.position.y, whole_to_fixed(47 + 19 + 1 - 2));
    }
}
