use glam::IVec2;

use crate::error::CollisionError;
use crate::types::*;
use crate::world::Scene;

/// Tile surface searches. All coordinates are 16.16; a miss leaves
/// `collided == false` and the sensor position untouched.
pub trait SurfaceProbeApi {
    /// Strict search: accepts only a surface the sensor has already crossed.
    /// Used while airborne.
    fn surface_collision(&self, plane: usize, probe: CollisionMode, sensor: &mut Sensor);

    /// Relaxed search used while gripping: takes the nearest surface within
    /// reach as long as its angle is continuous with the sensor's.
    fn find_surface(&self, plane: usize, probe: CollisionMode, sensor: &mut Sensor);

    // --- Strict, one per orientation ----------------------------------------

    fn floor_collision(&self, plane: usize, sensor: &mut Sensor) {
        self.surface_collision(plane, CollisionMode::Floor, sensor)
    }

    fn lwall_collision(&self, plane: usize, sensor: &mut Sensor) {
        self.surface_collision(plane, CollisionMode::LWall, sensor)
    }

    fn roof_collision(&self, plane: usize, sensor: &mut Sensor) {
        self.surface_collision(plane, CollisionMode::Roof, sensor)
    }

    fn rwall_collision(&self, plane: usize, sensor: &mut Sensor) {
        self.surface_collision(plane, CollisionMode::RWall, sensor)
    }

    // --- Relaxed, one per orientation ---------------------------------------

    fn find_floor_position(&self, plane: usize, sensor: &mut Sensor) {
        self.find_surface(plane, CollisionMode::Floor, sensor)
    }

    fn find_lwall_position(&self, plane: usize, sensor: &mut Sensor) {
        self.find_surface(plane, CollisionMode::LWall, sensor)
    }

    fn find_roof_position(&self, plane: usize, sensor: &mut Sensor) {
        self.find_surface(plane, CollisionMode::Roof, sensor)
    }

    fn find_rwall_position(&self, plane: usize, sensor: &mut Sensor) {
        self.find_surface(plane, CollisionMode::RWall, sensor)
    }
}

/// Per-frame resolvers and script-facing queries over a [`Scene`].
///
/// Object and shape queries act on behalf of a scripted entity and write
/// their result into `scene.check_result` as well as returning it. Shape
/// queries resolve against `scene.active_player`. Boxes are whole pixels
/// relative to the calling entity.
pub trait CollisionWorldApi {
    // --- Player resolution --------------------------------------------------

    /// Run exactly one resolver for the player, chosen by its `gravity`.
    fn process_player_collision(&self, scene: &mut Scene, player: PlayerId) -> Result<StepOutcome, CollisionError>;

    /// Sub-stepped airborne resolution.
    fn process_air_collision(&self, player: &mut Player) -> Result<StepOutcome, CollisionError>;

    /// Surface-following resolution with collision-mode switching.
    fn process_path_grip(&self, player: &mut Player) -> Result<StepOutcome, CollisionError>;

    // --- Entity queries -----------------------------------------------------

    fn object_floor_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_lwall_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_roof_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_rwall_collision(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;

    fn object_floor_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_lwall_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_roof_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;
    fn object_rwall_grip(&self, scene: &mut Scene, entity: EntityId, offset: IVec2, plane: usize) -> Result<bool, CollisionError>;

    // --- Shape queries ------------------------------------------------------

    /// Overlap between the entity's box and the active player's body.
    fn touch_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<bool, CollisionError>;

    /// Push the active player out of a solid box.
    fn box_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<BoxResult, CollisionError>;

    /// [`Self::box_collision`] with side sensors inset from the body's ends.
    fn box_collision2(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<BoxResult, CollisionError>;

    /// One-way platform: only catches the player from above.
    fn platform_collision(&self, scene: &mut Scene, entity: EntityId, bounds: Rect) -> Result<bool, CollisionError>;
}
