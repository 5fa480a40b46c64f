use glam::IVec2;
use tracing::trace;

use crate::air;
use crate::api::CollisionWorldApi;
use crate::debug::{DebugHitbox, DebugHitboxKind, DebugHitboxList, HitboxOwner};
use crate::error::CollisionError;
use crate::grip;
use crate::objects;
use crate::shapes;
use crate::tiles::{Chunk, CollisionMask, StageLayout, TileMap};
use crate::types::*;

/// Read-only stage resource: tile collision data, the hitbox table and
/// resolver tunables. Built once per stage load.
pub struct CollisionWorld {
    pub map: TileMap,
    pub hitboxes: Vec<Hitbox>,
    pub cfg: CollisionConfig,
}

/// Mutable per-stage state the resolvers work on: the entity and player
/// arenas, the script result channel and this frame's debug boxes.
pub struct Scene {
    pub players: Vec<Player>,
    pub entities: Vec<Entity>,
    /// Player the shape queries resolve against.
    pub active_player: PlayerId,
    /// Result of the last script query.
    pub check_result: i32,
    debug: DebugHitboxList,
}

impl Scene {
    pub fn new(cfg: &CollisionConfig) -> Self {
        Self {
            players: Vec::new(),
            entities: Vec::new(),
            active_player: PlayerId(0),
            check_result: 0,
            debug: DebugHitboxList::new(cfg.debug_hitbox_capacity),
        }
    }

    /// Begin a new frame. Clears the debug boxes and the result channel.
    pub fn begin_frame(&mut self) {
        self.debug.clear();
        self.check_result = 0;
    }

    pub fn add_player(&mut self, player: Player) -> PlayerId {
        self.players.push(player);
        PlayerId(self.players.len() as u32 - 1)
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() as u32 - 1)
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, CollisionError> {
        self.players.get(id.0 as usize).ok_or(CollisionError::UnknownPlayer(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, CollisionError> {
        self.players.get_mut(id.0 as usize).ok_or(CollisionError::UnknownPlayer(id))
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, CollisionError> {
        self.entities.get(id.0 as usize).ok_or(CollisionError::UnknownEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, CollisionError> {
        self.entities.get_mut(id.0 as usize).ok_or(CollisionError::UnknownEntity(id))
    }

    /// Boxes recorded by shape queries since the last [`Self::begin_frame`].
    pub fn debug_hitboxes(&self) -> &[DebugHitbox] {
        self.debug.entries()
    }
}

impl CollisionWorld {
    /// Validate stage data and build the world.
    pub fn new(
        layout: StageLayout,
        chunks: Vec<Chunk>,
        masks: [Vec<CollisionMask>; PLANE_COUNT],
        hitboxes: Vec<Hitbox>,
        cfg: CollisionConfig,
    ) -> Result<Self, CollisionError> {
        let map = TileMap::new(layout, chunks, masks)?;
        Ok(Self::from_map(map, hitboxes, cfg))
    }

    pub fn from_map(map: TileMap, hitboxes: Vec<Hitbox>, cfg: CollisionConfig) -> Self {
        Self { map, hitboxes, cfg }
    }

    pub fn hitbox(&self, r: HitboxRef) -> Result<&Hitbox, CollisionError> {
        self.hitboxes
            .get(r.index())
            .ok_or(CollisionError::MissingHitbox { index: r.index() })
    }

    fn check_plane(plane: usize) -> Result<(), CollisionError> {
        if plane < PLANE_COUNT { Ok(()) } else { Err(CollisionError::InvalidPlane(plane)) }
    }

    fn object_query(
        &self,
        scene: &mut Scene,
        entity: EntityId,
        offset: IVec2,
        plane: usize,
        probe: CollisionMode,
        grip: bool,
    ) -> Result<bool, CollisionError> {
        Self::check_plane(plane)?;
        let e = scene.entity_mut(entity)?;
        let hit = if grip {
            objects::object_grip(&self.map, plane, probe, e, offset)
        } else {
            objects::object_collision(&self.map, plane, probe, e, offset)
        };
        scene.check_result = hit as i32;
        Ok(hit)
    }

    /// Resolve a shape query against the active player and record both
    /// boxes when debug output is on.
    fn shape_query<R: Copy>(
        &self,
        scene: &mut Scene,
        entity: EntityId,
        bounds: Rect,
        kind: DebugHitboxKind,
        query: impl FnOnce(&Hitbox, &mut Player, Rect) -> R,
        sides: impl FnOnce(R) -> CollisionSides,
    ) -> Result<R, CollisionError> {
        let owner = scene.entity(entity)?.position;
        let pid = scene.active_player;
        let hitbox = self.hitbox(scene.player(pid)?.hitbox)?;
        let player = scene.player_mut(pid)?;
        let result = query(hitbox, player, shapes::world_box(owner, bounds));

        if self.cfg.debug_hitboxes {
            let body = hitbox.rect(0);
            let at = player.whole_position();
            if let Some(i) = scene.debug.record(kind, HitboxOwner::Entity(entity), to_whole(owner), bounds) {
                scene.debug.mark(i, sides(result));
            }
            scene.debug.record(kind, HitboxOwner::Player(pid), at, body);
        }
        Ok(result)
    }
}

impl CollisionWorldApi for CollisionWorld {
    fn process_player_collision(&self, scene: &mut Scene, player: PlayerId) -> Result<StepOutcome, CollisionError> {
        let p = scene.player_mut(player)?;
        let airborne = p.gravity == Gravity::Airborne;
        let outcome = if airborne {
            self.process_air_collision(p)?
        } else {
            self.process_path_grip(p)?
        };
        if airborne {
            scene.check_result = outcome.check_result();
        }
        trace!(?player, ?outcome, "player collision");
        Ok(outcome)
    }

    fn process_air_collision(&self, player: &mut Player) -> Result<StepOutcome, CollisionError> {
        Self::check_plane(player.collision_plane)?;
        let hitbox = self.hitbox(player.hitbox)?;
        Ok(air::process_air_collision(&self.map, hitbox, &self.cfg, player))
    }

    fn process_path_grip(&self, player: &mut Player) -> Result<StepOutcome, CollisionError> {
        Self::check_plane(player.collision_plane)?;
        let hitbox = self.hitbox(player.hitbox)?;
        Ok(grip::process_path_grip(&self.map, hitbox, &self.cfg, player))
    }

    fn object_floor_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::Floor, false)
    }

    fn object_lwall_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::LWall, false)
    }

    fn object_roof_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::Roof, false)
    }

    fn object_rwall_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::RWall, false)
    }

    fn object_floor_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::Floor, true)
    }

    fn object_lwall_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::LWall, true)
    }

    fn object_roof_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::Roof, true)
    }

    fn object_rwall_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError> {
        self.object_query(scene, entity, offset, plane, CollisionMode::RWall, true)
    }

    fn touch_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<bool, CollisionError> {
        let hit = self.shape_query(
            scene,
            entity,
            bounds,
            DebugHitboxKind::Touch,
            |hb, p, b| shapes::touch_collision(hb, p, b),
            |_| CollisionSides::empty(),
        )?;
        scene.check_result = hit as i32;
        Ok(hit)
    }

    fn box_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<BoxResult, CollisionError> {
        let result = self.shape_query(scene, entity, bounds, DebugHitboxKind::Box, shapes::box_collision, BoxResult::sides)?;
        scene.check_result = result.code();
        Ok(result)
    }

    fn box_collision2(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<BoxResult, CollisionError> {
        let result = self.shape_query(scene, entity, bounds, DebugHitboxKind::Box, shapes::box_collision2, BoxResult::sides)?;
        scene.check_result = result.code();
        Ok(result)
    }

    fn platform_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<bool, CollisionError> {
        let hit = self.shape_query(
            scene,
            entity,
            bounds,
            DebugHitboxKind::Platform,
            shapes::platform_collision,
            |hit| if hit { CollisionSides::TOP } else { CollisionSides::empty() },
        )?;
        scene.check_result = hit as i32;
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{ChunkTile, Flip, PackedAngles, Solidity};
    use crate::trig::arc_tan;

    const SOLID: u16 = 1;
    const RAMP: u16 = 2;

    fn cfg() -> CollisionConfig {
        CollisionConfig { debug_hitboxes: true, ..Default::default() }
    }

    /// 45° ramp rising to the right, floor angle 0x20.
    fn ramp_mask() -> CollisionMask {
        let mut rows = [0u16; 16];
        for (y, row) in rows.iter_mut().enumerate() {
            *row = 0xFFFF >> (15 - y);
        }
        CollisionMask::from_pixels(rows, PackedAngles::new(0x20, 0x40, 0xC0, 0x80))
    }

    /// 256×256 stage built from `(tx, ty, mask)` tiles.
    fn world(tiles: impl IntoIterator<Item = (i32, i32, u16)>) -> CollisionWorld {
        let masks = vec![CollisionMask::empty(), CollisionMask::solid(), ramp_mask()];
        let mut map = TileMap::with_unique_chunks(2, 2, masks).unwrap();
        for (tx, ty, idx) in tiles {
            map.set_tile(tx, ty, ChunkTile::new(idx, Flip::None, Solidity::All)).unwrap();
        }
        CollisionWorld::from_map(map, vec![Hitbox::upright(9, 19)], cfg())
    }

    fn flat_floor() -> impl Iterator<Item = (i32, i32, u16)> {
        (0..16).map(|tx| (tx, 8, SOLID))
    }

    /// Closed ring, solid between radius `r` and `r + 20` around `(cx, cy)`,
    /// on a 3×3 chunk stage. Every tile carries the circle's angle at its
    /// centre on all four faces.
    fn ring_world(cx: i32, cy: i32, r: i32) -> CollisionWorld {
        let (inner, outer) = (4 * r * r, 4 * (r + 20) * (r + 20));
        let mut masks = vec![CollisionMask::empty()];
        let mut placed = Vec::new();
        for ty in 0..24 {
            for tx in 0..24 {
                let mut rows = [0u16; 16];
                for (y, row) in rows.iter_mut().enumerate() {
                    for x in 0..16 {
                        let dx = 2 * (tx * 16 + x) + 1 - 2 * cx;
                        let dy = 2 * (ty * 16 + y as i32) + 1 - 2 * cy;
                        if (inner..=outer).contains(&(dx * dx + dy * dy)) {
                            *row |= 0x8000 >> x;
                        }
                    }
                }
                if rows.iter().all(|&bits| bits == 0) {
                    continue;
                }
                let a = arc_tan(2 * (ty * 16 + 8 - cy), 2 * (tx * 16 + 8 - cx)) as u8;
                masks.push(CollisionMask::from_pixels(rows, PackedAngles::new(a, a, a, a)));
                placed.push((tx, ty, masks.len() as u16 - 1));
            }
        }
        let mut map = TileMap::with_unique_chunks(3, 3, masks).unwrap();
        for (tx, ty, idx) in placed {
            map.set_tile(tx, ty, ChunkTile::new(idx, Flip::None, Solidity::All)).unwrap();
        }
        CollisionWorld::from_map(map, vec![Hitbox::upright(9, 19)], cfg())
    }

    fn scene_with(player: Player) -> (Scene, PlayerId) {
        let mut scene = Scene::new(&cfg());
        let id = scene.add_player(player);
        (scene, id)
    }

    #[test]
    fn test_flat_ground_landing() {
        let w = world(flat_floor());
        let mut p = Player::new(100, 106, HitboxRef::default());
        p.velocity = IVec2::new(0, 0x50000);
        let (mut scene, id) = scene_with(p);
        scene.begin_frame();
        let out = w.process_player_collision(&mut scene, id).unwrap();
        assert_eq!(out, StepOutcome::Landed);
        assert_eq!(scene.check_result, 1);
        let p = scene.player(id).unwrap();
        assert_eq!(p.angle, 0);
        assert_eq!(p.gravity, Gravity::Attached);
        assert_eq!(p.collision_mode, CollisionMode::Floor);
        assert_eq!(p.position.y, whole_to_fixed(128 - 19));
    }

    #[test]
    fn test_slope_entry_keeps_floor_mode() {
        // continuous 45° slope on y = 223 - x, filled underneath
        let mut tiles = Vec::new();
        for tx in 4..10 {
            let ty = 13 - tx;
            tiles.push((tx, ty, RAMP));
            tiles.extend((ty + 1..16).map(|fill| (tx, fill, SOLID)));
        }
        let w = world(tiles);
        let mut p = Player::new(100, 93, HitboxRef::default());
        p.velocity = IVec2::new(0, 0x40000);
        let (mut scene, id) = scene_with(p);

        assert_eq!(w.process_player_collision(&mut scene, id).unwrap(), StepOutcome::Landed);
        {
            let p = scene.player(id).unwrap();
            assert_eq!(p.angle, 0x20);
            assert_eq!(p.collision_mode, CollisionMode::Floor);
            assert_eq!(p.position.y, whole_to_fixed(114 - 19));
            assert!(p.speed < 0, "lands sliding down the slope");
        }

        assert_eq!(w.process_player_collision(&mut scene, id).unwrap(), StepOutcome::Gripping);
        let p = scene.player(id).unwrap();
        assert_eq!(p.collision_mode, CollisionMode::Floor);
        assert_eq!(p.angle, 0x20);
        assert_eq!(p.gravity, Gravity::Attached);
        assert_eq!(p.position.y, whole_to_fixed(118 - 19));
    }

    #[test]
    fn test_full_loop_cycles_every_mode() {
        // ring of radius 120 around (200, 200): the inner floor sits at y = 320
        let w = ring_world(200, 200, 120);
        for speed in [0x30000, 0x40000, 0x80000] {
            let mut p = Player::new(200, 320 - 19, HitboxRef::default());
            p.gravity = Gravity::Attached;
            p.speed = speed;
            let (mut scene, id) = scene_with(p);

            let mut modes = Vec::new();
            for _ in 0..400 {
                let before = scene.player(id).unwrap().collision_mode;
                let out = w.process_player_collision(&mut scene, id).unwrap();
                let p = scene.player(id).unwrap();
                assert_eq!(out, StepOutcome::Gripping, "speed {speed:#x} after {modes:?}");
                assert_eq!(p.gravity, Gravity::Attached);
                assert_eq!(p.speed, speed);
                if p.collision_mode != before {
                    modes.push(p.collision_mode);
                }
                if modes.len() == 4 {
                    break;
                }
            }
            use CollisionMode::*;
            assert_eq!(modes, [RWall, Roof, LWall, Floor], "speed {speed:#x}");
        }
    }

    #[test]
    fn test_wall_push() {
        let wall = (0..8).map(|ty| (8, ty, SOLID));
        let w = world(flat_floor().chain(wall));
        let mut p = Player::new(117, 109, HitboxRef::default());
        p.gravity = Gravity::Attached;
        p.input = InputFlags::RIGHT;
        let (mut scene, id) = scene_with(p);

        for expected in [1, 2, 2] {
            scene.begin_frame();
            let p = scene.player_mut(id).unwrap();
            p.speed = 0x40000;
            p.velocity.x = 0x40000;
            w.process_player_collision(&mut scene, id).unwrap();
            let p = scene.player(id).unwrap();
            assert_eq!(p.velocity.x, 0);
            assert_eq!(p.speed, 0);
            assert_eq!(p.pushing, expected);
            assert_eq!(p.position.x, whole_to_fixed(128 - 9));
        }
    }

    #[test]
    fn test_platform_one_way() {
        let w = world([]);
        let mut p = Player::new(100, 102, HitboxRef::default());
        p.velocity = IVec2::new(0, -0x10000);
        let (mut scene, _) = scene_with(p);
        let platform = scene.add_entity(Entity::new(100, 124));
        let bounds = Rect::new(-20, -4, 20, 4);

        scene.check_result = 7;
        assert!(!w.platform_collision(&mut scene, platform, bounds).unwrap());
        assert_eq!(scene.check_result, 0);

        scene.players[0].velocity.y = 0x20000;
        assert!(w.platform_collision(&mut scene, platform, bounds).unwrap());
        assert_eq!(scene.check_result, 1);
        assert_eq!(scene.players[0].position.y, whole_to_fixed(101));
    }

    #[test]
    fn test_exactly_one_resolver_per_frame() {
        let floor = (0..9).map(|tx| (tx, 8, SOLID));
        let w = world(floor);
        let mut p = Player::new(60, 80, HitboxRef::default());
        p.input = InputFlags::RIGHT;
        let (mut scene, id) = scene_with(p);

        let mut saw_landing = false;
        let mut saw_detach = false;
        for _ in 0..120 {
            scene.begin_frame();
            let p = scene.player_mut(id).unwrap();
            let airborne = p.gravity == Gravity::Airborne;
            if airborne {
                p.velocity.y += 0x3800;
            } else {
                p.speed = (p.speed + 0xC00).min(0x60000);
            }
            let out = w.process_player_collision(&mut scene, id).unwrap();
            let air_outcome = matches!(
                out,
                StepOutcome::Airborne | StepOutcome::Landed | StepOutcome::HitRoof | StepOutcome::AttachedToWall
            );
            assert_eq!(air_outcome, airborne, "{out:?}");
            saw_landing |= out == StepOutcome::Landed;
            saw_detach |= out == StepOutcome::Detached;
            let p = scene.player(id).unwrap();
            assert!((0..256).contains(&p.angle));
        }
        assert!(saw_landing && saw_detach);
    }

    #[test]
    fn test_box_collision_records_debug_boxes() {
        let w = world([]);
        let mut p = Player::new(100, 103, HitboxRef::default());
        p.velocity = IVec2::new(0, 0x30000);
        let (mut scene, id) = scene_with(p);
        let block = scene.add_entity(Entity::new(100, 128));
        let bounds = Rect::new(-20, -8, 20, 8);

        scene.begin_frame();
        assert_eq!(w.box_collision(&mut scene, block, bounds).unwrap(), BoxResult::Top);
        assert_eq!(scene.check_result, 1);
        assert_eq!(w.box_collision(&mut scene, block, bounds).unwrap(), BoxResult::Top);

        let boxes = scene.debug_hitboxes();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].owner, HitboxOwner::Entity(block));
        assert_eq!(boxes[0].sides, CollisionSides::TOP);
        assert_eq!(boxes[0].position, IVec2::new(100, 128));
        assert_eq!(boxes[1].owner, HitboxOwner::Player(id));

        scene.begin_frame();
        assert!(scene.debug_hitboxes().is_empty());
    }

    #[test]
    fn test_touch_and_object_queries_set_check_result() {
        let w = world([(4, 4, SOLID)]);
        let (mut scene, _) = scene_with(Player::new(100, 100, HitboxRef::default()));
        let e = scene.add_entity(Entity::new(70, 60));
        assert!(!w.touch_collision(&mut scene, e, Rect::new(-4, -4, 4, 4)).unwrap());
        assert_eq!(scene.check_result, 0);
        assert!(w.touch_collision(&mut scene, e, Rect::new(20, 20, 40, 40)).unwrap());
        assert_eq!(scene.check_result, 1);

        assert!(w.object_floor_collision(&mut scene, e, IVec2::new(0, 8), 0).unwrap());
        assert_eq!(scene.check_result, 1);
        assert_eq!(scene.entity(e).unwrap().position.y, whole_to_fixed(56));
        assert!(!w.object_roof_grip(&mut scene, e, IVec2::new(0, -30), 1).unwrap());
        assert_eq!(scene.check_result, 0);
    }

    #[test]
    fn test_bad_references_are_errors() {
        let w = world([]);
        let mut p = Player::new(10, 10, HitboxRef::new(0, 5));
        let (mut scene, id) = scene_with(p.clone());
        assert!(matches!(
            w.process_player_collision(&mut scene, id),
            Err(CollisionError::MissingHitbox { index: 5 })
        ));
        assert!(matches!(
            w.process_player_collision(&mut scene, PlayerId(9)),
            Err(CollisionError::UnknownPlayer(PlayerId(9)))
        ));
        assert!(matches!(
            w.object_floor_grip(&mut scene, EntityId(3), IVec2::ZERO, 0),
            Err(CollisionError::UnknownEntity(EntityId(3)))
        ));
        let e = scene.add_entity(Entity::new(5, 5));
        assert!(matches!(
            w.object_floor_collision(&mut scene, e, IVec2::ZERO, 2),
            Err(CollisionError::InvalidPlane(2))
        ));
        p.hitbox = HitboxRef::default();
        p.collision_plane = 4;
        assert!(matches!(w.process_air_collision(&mut p), Err(CollisionError::InvalidPlane(4))));
    }

    #[test]
    fn test_world_new_validates_stage() {
        let layout = StageLayout { width: 1, height: 1, chunks: vec![2] };
        let masks = [vec![CollisionMask::empty()], vec![CollisionMask::empty()]];
        let err = CollisionWorld::new(layout, vec![Chunk::default()], masks, vec![], CollisionConfig::default());
        assert!(matches!(err, Err(CollisionError::ChunkOutOfRange { chunk: 2, count: 1 })));
    }
}
