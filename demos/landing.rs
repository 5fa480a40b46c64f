use glam::IVec2;
use loopgrip::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), CollisionError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // 4x2 chunks: a floor at y=192 with a raised block in the middle
    let solid = ChunkTile::new(1, Flip::None, Solidity::All);
    let mut map = TileMap::with_unique_chunks(4, 2, vec![CollisionMask::empty(), CollisionMask::solid()])?;
    for tx in 0..32 {
        map.set_tile(tx, 12, solid)?;
    }
    for ty in 9..12 {
        map.set_tile(16, ty, solid)?;
    }
    let world = CollisionWorld::from_map(map, vec![Hitbox::upright(9, 19)], CollisionConfig::default());

    let mut scene = Scene::new(&world.cfg);
    let mut p = Player::new(200, 40, HitboxRef::default());
    p.velocity = IVec2::new(0x18000, 0);
    let id = scene.add_player(p);

    for frame in 0..90 {
        scene.begin_frame();
        let p = scene.player_mut(id)?;
        if p.gravity == Gravity::Airborne {
            p.velocity.y += 0x3800;
        }
        let out = world.process_player_collision(&mut scene, id)?;
        let p = scene.player(id)?;
        if out != StepOutcome::Airborne || frame % 10 == 0 {
            println!(
                "frame={frame:3} outcome={out:?} pos={:?} mode={:?} check={}",
                p.whole_position(),
                p.collision_mode,
                scene.check_result
            );
        }
    }
    Ok(())
}
