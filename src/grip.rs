//! Attached motion: the entity follows whichever of the four surfaces its
//! collision mode names, re-deriving its angle every 16 px of travel.

use glam::IVec2;
use tracing::debug;

use crate::api::SurfaceProbeApi;
use crate::probe::{depth, depth_sign, set_depth};
use crate::tiles::TileMap;
use crate::trig::surface_step;
use crate::types::*;

/// Surface sensors: trailing side, centre, leading side of the footprint.
pub const SURFACE: [usize; 3] = [0, 1, 2];
/// Looks for an obstacle ahead of the body.
pub const WALL: usize = 3;
/// Tracks the entity position itself.
pub const REFERENCE: usize = 4;

const WALL_SENSOR_DEPTH: i32 = 4;

/// Offset from the entity to its body edge along the unit axis `dir`.
/// Edges on the negative side sit one pixel outside the body.
pub(crate) fn edge(rect: Rect, dir: IVec2) -> i32 {
    match (dir.x, dir.y) {
        (1, _) => rect.right,
        (-1, _) => rect.left - 1,
        (_, 1) => rect.bottom,
        _ => rect.top - 1,
    }
}

/// Collision mode after a grip pass ending at `angle`. The bands overlap
/// so a surface sitting on a boundary does not flip the mode every frame.
pub fn next_mode(mode: CollisionMode, angle: i32) -> CollisionMode {
    use CollisionMode::*;
    match mode {
        Floor if angle > 0x80 && angle < 0xDE => LWall,
        Floor if angle > 0x22 && angle < 0x80 => RWall,
        RWall if angle < 0x1E => Floor,
        RWall if angle > 0x62 => Roof,
        Roof if angle < 0x5E => RWall,
        Roof if angle > 0xA2 => LWall,
        LWall if angle < 0x9E => Roof,
        LWall if angle > 0xE2 => Floor,
        m => m,
    }
}

/// Lay out the grip sensors around `reference` for `mode`.
pub fn set_path_grip_sensors(
    hitbox: &Hitbox,
    mode: CollisionMode,
    reference: IVec2,
    angle: i32,
    speed: i32,
    sensors: &mut SensorSet,
) {
    let bounds = hitbox.rect(mode.hitbox_slot());
    let feet = hitbox.rect(mode.hitbox_slot() + 1);
    let down = mode.down();

    let base = reference + down.abs() * whole_to_fixed(edge(bounds, down));
    let (lo, hi) = if mode.is_wall() {
        (feet.top - 1, feet.bottom)
    } else {
        (feet.left - 1, feet.right)
    };
    let across = IVec2::new(down.y.abs(), down.x.abs());
    sensors[SURFACE[0]] = Sensor::at(base + across * whole_to_fixed(lo), angle);
    sensors[SURFACE[1]] = Sensor::at(base, angle);
    sensors[SURFACE[2]] = Sensor::at(base + across * whole_to_fixed(hi), angle);

    let ahead = mode.forward() * if speed > 0 { 1 } else { -1 };
    let wall = reference + down * whole_to_fixed(WALL_SENSOR_DEPTH) + ahead.abs() * whole_to_fixed(edge(bounds, ahead));
    sensors[WALL] = Sensor::at(wall, angle);
    sensors[REFERENCE] = Sensor::at(reference, angle);
    sensors[5] = Sensor::default();
}

pub fn process_path_grip(map: &TileMap, hitbox: &Hitbox, cfg: &CollisionConfig, player: &mut Player) -> StepOutcome {
    let mode = player.collision_mode;
    let plane = player.collision_plane;
    let start = player.position;
    let speed = player.speed;
    let sign = if speed < 0 { -1 } else { 1 };
    let bounds = hitbox.rect(mode.hitbox_slot());
    let ahead = if speed == 0 { None } else { CollisionMode::facing(mode.forward() * sign) };

    let chunks = speed.abs() >> 20;
    let remainder = speed.abs() & 0xFFFFF;

    let mut angle = player.angle;
    let mut reference = start;
    let mut sensors: SensorSet = Default::default();
    set_path_grip_sensors(hitbox, mode, reference, angle, speed, &mut sensors);

    let mut gripped = [false; 3];
    let mut wall: Option<(CollisionMode, i32)> = None;

    for i in 0..=chunks {
        let magnitude = if i < chunks { whole_to_fixed(TILE_SIZE) } else { remainder };
        let (dx, dy) = surface_step(angle, magnitude);
        let mut step = IVec2::new(dx, dy) * sign;

        if let Some(probe) = ahead.filter(|_| wall.is_none()) {
            let s = &mut sensors[WALL];
            s.pos += step;
            map.surface_collision(plane, probe, s);
            if s.collided {
                let face = depth(probe, to_whole(s.pos));
                wall = Some((probe, whole_to_fixed(face - edge(bounds, probe.down()))));
                set_depth(probe, &mut step, 0);
            }
        }

        reference += step;
        for k in SURFACE {
            sensors[k].pos += step;
            map.find_surface(plane, mode, &mut sensors[k]);
        }
        gripped = SURFACE.map(|k| sensors[k].collided);

        let nearest = SURFACE
            .into_iter()
            .map(|k| sensors[k])
            .filter(|s| s.collided)
            .min_by_key(|s| {
                (
                    depth_sign(mode) * depth(mode, to_whole(s.pos)),
                    angle_distance(s.angle, mode.base_angle()),
                )
            });
        let Some(ground) = nearest else { break };

        let surface = depth(mode, to_whole(ground.pos));
        set_depth(mode, &mut reference, whole_to_fixed(surface - edge(bounds, mode.down())));
        angle = wrap_angle(ground.angle);
        set_path_grip_sensors(hitbox, mode, reference, angle, speed, &mut sensors);

        if wall.is_some() {
            break;
        }
    }

    let mut outcome = if gripped.iter().any(|&g| g) {
        let next = next_mode(mode, angle);
        if next != mode {
            debug!(from = ?mode, to = ?next, angle, "collision mode change");
        }
        player.position = reference;
        player.angle = angle;
        player.rotation = angle << 1;
        player.collision_mode = next;
        player.flailing = gripped;
        StepOutcome::Gripping
    } else {
        let (vx, vy) = surface_step(angle, speed);
        let limit = cfg.max_detach_y_velocity;
        player.velocity = IVec2::new(vx, vy.clamp(-limit, limit));
        player.position = start + player.velocity;
        leave_surface(player);
        debug!(angle, speed, "detached");
        StepOutcome::Detached
    };

    match wall {
        Some((probe, coord)) => {
            set_depth(probe, &mut player.position, coord);
            player.speed = 0;
            player.velocity.x = 0;
            let held = match probe {
                CollisionMode::RWall => player.input.contains(InputFlags::RIGHT),
                CollisionMode::LWall => player.input.contains(InputFlags::LEFT),
                _ => false,
            };
            player.pushing = if held { (player.pushing + 1).min(2) } else { 0 };
        }
        None => player.pushing = 0,
    }

    if outcome == StepOutcome::Gripping {
        if player.collision_mode == CollisionMode::Floor {
            player.velocity.y = 0;
        } else if player.speed.abs() < cfg.wall_stick_speed && player.control_lock == 0 {
            let (vx, vy) = surface_step(player.angle, player.speed);
            player.velocity = IVec2::new(vx, vy);
            leave_surface(player);
            player.control_lock = cfg.slip_control_lock;
            debug!(speed = vx, "slipped off surface");
            outcome = StepOutcome::Slipped;
        }
    }
    outcome
}

/// Drop back to ballistic motion, keeping the horizontal velocity as speed.
fn leave_surface(player: &mut Player) {
    player.collision_mode = CollisionMode::Floor;
    player.angle = 0;
    player.rotation = 0;
    player.gravity = Gravity::Airborne;
    player.speed = player.velocity.x;
}
