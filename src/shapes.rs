//! Player-versus-box queries used by interactive objects. Boxes are whole
//! world pixels; the player is resolved with its floor hitbox (slot 0).

use glam::IVec2;
use tracing::trace;

use crate::types::*;

/// Fixed-point copy of a whole-pixel box.
fn to_fixed_rect(r: Rect) -> Rect {
    Rect::new(
        whole_to_fixed(r.left),
        whole_to_fixed(r.top),
        whole_to_fixed(r.right),
        whole_to_fixed(r.bottom),
    )
}

/// Horizontal motion used to pick the resolution axis: the X velocity, or
/// the surface speed while running on a floor or ceiling with no X velocity.
fn horizontal_motion(player: &Player) -> i32 {
    let mode = player.collision_mode;
    if player.velocity.x != 0 || mode.is_wall() {
        player.velocity.x
    } else {
        player.speed * mode.forward().x
    }
}

/// Put the player down on a surface at fixed-point `top`.
fn stand_on(player: &mut Player, body: Rect, top: i32, feet: [bool; 3]) {
    player.position.y = top - whole_to_fixed(body.bottom);
    if player.gravity == Gravity::Airborne {
        player.speed = player.velocity.x;
    }
    player.gravity = Gravity::Attached;
    player.collision_mode = CollisionMode::Floor;
    player.velocity.y = 0;
    player.angle = 0;
    player.rotation = 0;
    player.control_lock = 0;
    player.flailing = feet;
}

pub fn touch_collision(hitbox: &Hitbox, player: &Player, bounds: Rect) -> bool {
    hitbox.rect(0).offset(player.whole_position()).overlaps(&bounds)
}

/// Solid box with side sensors at the body's full height.
pub fn box_collision(hitbox: &Hitbox, player: &mut Player, bounds: Rect) -> BoxResult {
    resolve_box(hitbox, player, bounds, 0)
}

/// Solid box with side sensors pulled 2 px in from the body's top and bottom.
pub fn box_collision2(hitbox: &Hitbox, player: &mut Player, bounds: Rect) -> BoxResult {
    resolve_box(hitbox, player, bounds, 2)
}

/// Resolve the dominant axis of motion first, then the other one, so a
/// player running along the top of a box is still held up by it.
fn resolve_box(hitbox: &Hitbox, player: &mut Player, bounds: Rect, inset: i32) -> BoxResult {
    let body = hitbox.rect(0);
    let b = to_fixed_rect(bounds);
    let result = if horizontal_motion(player).abs() <= player.velocity.y.abs() {
        resolve_vertical(player, body, b).or_else(|| resolve_horizontal(player, body, b, inset))
    } else {
        resolve_horizontal(player, body, b, inset).or_else(|| resolve_vertical(player, body, b))
    };
    result.unwrap_or(BoxResult::None)
}

/// Feet on the top face while falling, head on the underside while rising.
/// `b` is in 16.16.
fn resolve_vertical(player: &mut Player, body: Rect, b: Rect) -> Option<BoxResult> {
    let pos = player.position;
    let vy = player.velocity.y;
    let xs = [body.left + 2, 0, body.right - 2].map(|o| pos.x + whole_to_fixed(o));
    let within = |x: i32| x > b.left && x < b.right;

    if vy >= 0 {
        let y = pos.y + whole_to_fixed(body.bottom);
        let feet = xs.map(|x| within(x) && y >= b.top && y - vy <= b.top);
        if !feet.contains(&true) {
            return None;
        }
        stand_on(player, body, b.top, feet);
        return Some(BoxResult::Top);
    }

    let y = pos.y + whole_to_fixed(body.top);
    if !xs.iter().any(|&x| within(x) && y <= b.bottom && y - vy >= b.bottom) {
        return None;
    }
    if player.gravity == Gravity::Airborne {
        player.position.y = b.bottom - whole_to_fixed(body.top);
    }
    player.velocity.y = 0;
    Some(BoxResult::Bottom)
}

/// Side faces, sampled `inset` px in from the body's top and bottom.
fn resolve_horizontal(player: &mut Player, body: Rect, b: Rect, inset: i32) -> Option<BoxResult> {
    let h = horizontal_motion(player);
    if h == 0 {
        return None;
    }
    let pos = player.position;
    let beside = [body.top + inset, body.bottom - inset]
        .map(|o| pos.y + whole_to_fixed(o))
        .iter()
        .any(|&y| y > b.top && y < b.bottom);
    if !beside {
        return None;
    }

    let result = if h > 0 {
        let x = pos.x + whole_to_fixed(body.right);
        if !(x >= b.left && x - h <= b.left) {
            return None;
        }
        player.position.x = b.left - whole_to_fixed(body.right);
        BoxResult::Left
    } else {
        let x = pos.x + whole_to_fixed(body.left);
        if !(x <= b.right && x - h >= b.right) {
            return None;
        }
        player.position.x = b.right - whole_to_fixed(body.left);
        BoxResult::Right
    };

    player.velocity.x = 0;
    player.speed = 0;
    let facing_in = matches!(
        (result, player.direction),
        (BoxResult::Left, Facing::Right) | (BoxResult::Right, Facing::Left)
    );
    if facing_in {
        player.pushing = (player.pushing + 1).min(2);
    }
    trace!(?result, x = player.position.x, "pushed out of box");
    Some(result)
}

/// One-way platform: catches the player's feet from above, never from the
/// sides or below.
pub fn platform_collision(hitbox: &Hitbox, player: &mut Player, bounds: Rect) -> bool {
    if player.velocity.y < 0 {
        return false;
    }
    let body = hitbox.rect(0);
    let b = to_fixed_rect(bounds);
    let pos = player.position;
    let y = pos.y + whole_to_fixed(body.bottom);
    let feet = [body.left + 1, 0, body.right].map(|o| {
        let x = pos.x + whole_to_fixed(o);
        x > b.left && x < b.right && y > b.top - whole_to_fixed(2) && y < b.bottom
    });
    if !feet.contains(&true) {
        return false;
    }
    stand_on(player, body, b.top, feet);
    true
}

/// Move a box given relative to its owner's (16.16) position into world
/// pixels.
pub fn world_box(owner: IVec2, rect: Rect) -> Rect {
    rect.offset(to_whole(owner))
}
