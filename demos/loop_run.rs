use loopgrip::trig::arc_tan;
use loopgrip::*;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const CENTER: i32 = 200;
const RADIUS: i32 = 120;
const THICKNESS: i32 = 20;

/// A closed loop: solid between `RADIUS` and `RADIUS + THICKNESS` around
/// `(CENTER, CENTER)`, each tile angled along the circle.
fn loop_stage() -> Result<TileMap, CollisionError> {
    let (inner, outer) = (4 * RADIUS * RADIUS, 4 * (RADIUS + THICKNESS) * (RADIUS + THICKNESS));
    let mut masks = vec![CollisionMask::empty()];
    let mut placed = Vec::new();
    for ty in 0..24 {
        for tx in 0..24 {
            let mut rows = [0u16; 16];
            for (y, row) in rows.iter_mut().enumerate() {
                for x in 0..16 {
                    let dx = 2 * (tx * 16 + x) + 1 - 2 * CENTER;
                    let dy = 2 * (ty * 16 + y as i32) + 1 - 2 * CENTER;
                    if (inner..=outer).contains(&(dx * dx + dy * dy)) {
                        *row |= 0x8000 >> x;
                    }
                }
            }
            if rows.iter().any(|&bits| bits != 0) {
                let a = arc_tan(2 * (ty * 16 + 8 - CENTER), 2 * (tx * 16 + 8 - CENTER)) as u8;
                masks.push(CollisionMask::from_pixels(rows, PackedAngles::new(a, a, a, a)));
                placed.push((tx, ty, masks.len() as u16 - 1));
            }
        }
    }
    let mut map = TileMap::with_unique_chunks(3, 3, masks)?;
    for (tx, ty, idx) in placed {
        map.set_tile(tx, ty, ChunkTile::new(idx, Flip::None, Solidity::All))?;
    }
    Ok(map)
}

fn main() -> Result<(), CollisionError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let world = CollisionWorld::from_map(loop_stage()?, vec![Hitbox::upright(9, 19)], CollisionConfig::default());
    let mut scene = Scene::new(&world.cfg);
    let mut p = Player::new(CENTER, CENTER + RADIUS - 19, HitboxRef::default());
    p.gravity = Gravity::Attached;
    p.speed = 0x60000;
    let id = scene.add_player(p);

    let frames = 100_000;
    let mut last = (StepOutcome::Gripping, CollisionMode::Floor);
    let t0 = Instant::now();
    for frame in 0..frames {
        scene.begin_frame();
        let out = world.process_player_collision(&mut scene, id)?;
        let p = scene.player(id)?;
        let now = (out, p.collision_mode);
        if now != last && frame < 600 {
            println!(
                "frame={frame:4} outcome={out:?} mode={:?} angle={:#04x} pos={:?}",
                p.collision_mode,
                p.angle,
                p.whole_position()
            );
        }
        last = now;
        if p.gravity == Gravity::Airborne {
            println!("fell off the loop at frame {frame}");
            break;
        }
    }
    let dt = t0.elapsed().as_secs_f64();
    println!("loop_run: frames={} secs={:.3} throughput={:.0} frames/s", frames, dt, frames as f64 / dt);
    Ok(())
}
