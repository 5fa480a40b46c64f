use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::CollisionError;

/// Edge length of one collision tile in pixels.
pub const TILE_SIZE: i32 = 16;
/// Edge length of one layout chunk in pixels (8×8 tiles).
pub const CHUNK_SIZE: i32 = 128;
/// Tiles along one edge of a chunk.
pub const CHUNK_TILES: i32 = CHUNK_SIZE / TILE_SIZE;
/// Number of independent collision planes (path A / path B).
pub const PLANE_COUNT: usize = 2;
/// Scratch sensors used by one resolver pass.
pub const SENSOR_COUNT: usize = 6;
/// Heights at or beyond this magnitude mean "no surface in this column/row".
pub const NO_SURFACE: i32 = 0x40;

#[inline]
pub const fn whole_to_fixed(v: i32) -> i32 {
    v << 16
}

#[inline]
pub const fn fixed_to_whole(v: i32) -> i32 {
    v >> 16
}

/// Fixed-point vector truncated to whole pixels.
#[inline]
pub fn to_whole(v: IVec2) -> IVec2 {
    IVec2::new(v.x >> 16, v.y >> 16)
}

/// Whole-pixel vector promoted to 16.16.
#[inline]
pub fn to_fixed(v: IVec2) -> IVec2 {
    IVec2::new(v.x << 16, v.y << 16)
}

/// Normalize any byte-angle arithmetic result into `[0, 256)`.
#[inline]
pub const fn wrap_angle(a: i32) -> i32 {
    a & 0xFF
}

/// Shortest circular distance between two byte angles (0..=128).
#[inline]
pub fn angle_distance(a: i32, b: i32) -> i32 {
    let d = (a - b).rem_euclid(256);
    d.min(256 - d)
}

/// Which of the four tile surfaces an entity adheres to. Also names the
/// orientation of a surface probe.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollisionMode {
    /// Surface below (+Y); angle ≈ 0x00.
    #[default]
    Floor = 0,
    /// Surface to the left (−X); angle ≈ 0xC0.
    LWall = 1,
    /// Surface above (−Y); angle ≈ 0x80.
    Roof = 2,
    /// Surface to the right (+X); angle ≈ 0x40.
    RWall = 3,
}

impl CollisionMode {
    pub const ALL: [CollisionMode; 4] = [Self::Floor, Self::LWall, Self::Roof, Self::RWall];

    /// First of the two hitbox slots used while in this mode.
    pub const fn hitbox_slot(self) -> usize {
        self as usize * 2
    }

    /// Angle of a flat surface of this kind.
    pub const fn base_angle(self) -> i32 {
        match self {
            Self::Floor => 0x00,
            Self::RWall => 0x40,
            Self::Roof => 0x80,
            Self::LWall => 0xC0,
        }
    }

    /// Unit vector pointing from the entity toward the surface.
    pub const fn down(self) -> IVec2 {
        match self {
            Self::Floor => IVec2::new(0, 1),
            Self::RWall => IVec2::new(1, 0),
            Self::Roof => IVec2::new(0, -1),
            Self::LWall => IVec2::new(-1, 0),
        }
    }

    /// Unit vector of travel for positive `speed` on a flat surface of this kind.
    pub const fn forward(self) -> IVec2 {
        match self {
            Self::Floor => IVec2::new(1, 0),
            Self::RWall => IVec2::new(0, -1),
            Self::Roof => IVec2::new(-1, 0),
            Self::LWall => IVec2::new(0, 1),
        }
    }

    /// The surface kind met when probing along the unit axis `dir`.
    pub fn facing(dir: IVec2) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.down() == dir)
    }

    /// True when probes of this kind measure along X.
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::LWall | Self::RWall)
    }
}

/// Attachment state; selects which resolver runs for a frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Gravity {
    /// Gripping a surface (classic value 0).
    #[default]
    Attached = 0,
    /// Ballistic motion (classic value 1).
    Airborne = 1,
}

/// Which way the sprite faces.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

bitflags! {
    /// Directional input held this frame.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct InputFlags: u8 {
        const LEFT  = 1 << 0;
        const RIGHT = 1 << 1;
    }
}

bitflags! {
    /// Sides of a box a query resolved against (bit `n-1` for box result `n`).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CollisionSides: u8 {
        const TOP    = 1 << 0;
        const LEFT   = 1 << 1;
        const RIGHT  = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

/// A single probe point (16.16) with the surface angle it last resolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sensor {
    pub pos: IVec2,
    pub angle: i32,
    pub collided: bool,
}

impl Sensor {
    pub fn at(pos: IVec2, angle: i32) -> Self {
        Self { pos, angle, collided: false }
    }
}

/// Per-call scratch for one resolver pass. Lives on the caller's stack.
pub type SensorSet = [Sensor; SENSOR_COUNT];

/// Signed pixel rectangle. Used both for hitbox offsets (relative to an
/// entity) and for world-space script boxes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn offset(self, by: IVec2) -> Self {
        Self::new(self.left + by.x, self.top + by.y, self.right + by.x, self.bottom + by.y)
    }

    /// Open-interval overlap test.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right > other.left && self.left < other.right && self.bottom > other.top && self.top < other.bottom
    }
}

/// Eight directional hitbox variants: slots (0,1) floor, (2,3) left wall,
/// (4,5) roof, (6,7) right wall. The first slot of a pair bounds the body,
/// the second places the surface sensors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Hitbox {
    pub left: [i8; 8],
    pub top: [i8; 8],
    pub right: [i8; 8],
    pub bottom: [i8; 8],
}

impl Hitbox {
    /// The same rectangle in every slot.
    pub fn uniform(rect: Rect) -> Self {
        Self {
            left: [rect.left as i8; 8],
            top: [rect.top as i8; 8],
            right: [rect.right as i8; 8],
            bottom: [rect.bottom as i8; 8],
        }
    }

    /// A `2*half_w` × `2*half_h` body, laid on its side for the wall modes.
    pub fn upright(half_w: i8, half_h: i8) -> Self {
        let mut hb = Self::default();
        for mode in CollisionMode::ALL {
            let (w, h) = if mode.is_wall() { (half_h, half_w) } else { (half_w, half_h) };
            for slot in [mode.hitbox_slot(), mode.hitbox_slot() + 1] {
                hb.left[slot] = -w;
                hb.top[slot] = -h;
                hb.right[slot] = w;
                hb.bottom[slot] = h;
            }
        }
        hb
    }

    pub fn rect(&self, slot: usize) -> Rect {
        Rect::new(
            self.left[slot] as i32,
            self.top[slot] as i32,
            self.right[slot] as i32,
            self.bottom[slot] as i32,
        )
    }
}

/// Hitbox address: animation file's hitbox-list offset plus the current
/// frame's hitbox id.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HitboxRef {
    pub list_offset: u16,
    pub hitbox_id: u8,
}

impl HitboxRef {
    pub const fn new(list_offset: u16, hitbox_id: u8) -> Self {
        Self { list_offset, hitbox_id }
    }

    pub const fn index(self) -> usize {
        self.list_offset as usize + self.hitbox_id as usize
    }
}

/// Handle of a scripted object in a [`crate::world::Scene`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

/// Handle of a controllable character in a [`crate::world::Scene`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u32);

/// Kinematic state of a controllable character. Owned by the caller; the
/// resolvers mutate it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Player {
    /// 16.16 world position.
    pub position: IVec2,
    /// 16.16 per-frame velocity while airborne.
    pub velocity: IVec2,
    /// Signed 16.16 speed along the current surface.
    pub speed: i32,
    /// Surface angle, always in `[0, 256)`.
    pub angle: i32,
    /// Sprite rotation, `angle << 1`.
    pub rotation: i32,
    pub collision_mode: CollisionMode,
    /// Collision plane (path) index, 0 or 1.
    pub collision_plane: usize,
    pub gravity: Gravity,
    /// Frames left during which steering is locked out.
    pub control_lock: i32,
    /// 0..=2, grows while held against a wall.
    pub pushing: i32,
    /// Which of the three surface sensors touched ground on the last grip.
    pub flailing: [bool; 3],
    pub direction: Facing,
    pub input: InputFlags,
    pub hitbox: HitboxRef,
}

impl Player {
    /// Airborne player at a whole-pixel position.
    pub fn new(x: i32, y: i32, hitbox: HitboxRef) -> Self {
        Self {
            position: IVec2::new(whole_to_fixed(x), whole_to_fixed(y)),
            gravity: Gravity::Airborne,
            hitbox,
            ..Default::default()
        }
    }

    pub fn whole_position(&self) -> IVec2 {
        to_whole(self.position)
    }
}

/// A scripted object. Only the fields the tile queries touch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entity {
    /// 16.16 world position.
    pub position: IVec2,
    pub rotation: i32,
    pub direction: Facing,
}

impl Entity {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            position: IVec2::new(whole_to_fixed(x), whole_to_fixed(y)),
            ..Default::default()
        }
    }

    pub fn whole_position(&self) -> IVec2 {
        to_whole(self.position)
    }
}

/// What a per-frame resolver did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still in the air; position integrated (possibly clamped by a wall).
    Airborne,
    /// Touched down on a floor-probe surface.
    Landed,
    /// Bonked a ceiling without attaching.
    HitRoof,
    /// Caught a steep ceiling and now runs along a wall.
    AttachedToWall,
    /// Stayed on the surface.
    Gripping,
    /// Ran out of surface and became airborne.
    Detached,
    /// Too slow for a wall/ceiling: dropped with a control lock.
    Slipped,
}

impl StepOutcome {
    /// Value mirrored into the script `check_result` channel.
    pub const fn check_result(self) -> i32 {
        match self {
            Self::Landed => 1,
            Self::HitRoof | Self::AttachedToWall => 2,
            _ => 0,
        }
    }
}

/// Result code of `BoxCollision`/`BoxCollision2`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BoxResult {
    #[default]
    None = 0,
    /// Landed on top.
    Top = 1,
    /// Pushed out to the left.
    Left = 2,
    /// Pushed out to the right.
    Right = 3,
    /// Hit the underside.
    Bottom = 4,
}

impl BoxResult {
    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn sides(self) -> CollisionSides {
        match self {
            Self::None => CollisionSides::empty(),
            Self::Top => CollisionSides::TOP,
            Self::Left => CollisionSides::LEFT,
            Self::Right => CollisionSides::RIGHT,
            Self::Bottom => CollisionSides::BOTTOM,
        }
    }
}

/// Tunables for the resolvers. Defaults reproduce the classic constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Record script query boxes for the renderer.
    pub debug_hitboxes: bool,
    /// Maximum debug records per frame; extra are dropped.
    pub debug_hitbox_capacity: usize,
    /// Minimum |speed| that keeps an entity on a wall or ceiling.
    pub wall_stick_speed: i32,
    /// Control lock applied when sliding off a wall.
    pub slip_control_lock: i32,
    /// Clamp for |speed| derived on landing.
    pub max_landing_speed: i32,
    /// Clamp for |YVelocity| when leaving a surface.
    pub max_detach_y_velocity: i32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            debug_hitboxes: false,
            debug_hitbox_capacity: 0x400,
            wall_stick_speed: 0x28000,
            slip_control_lock: 30,
            max_landing_speed: whole_to_fixed(0x18),
            max_detach_y_velocity: whole_to_fixed(0x10),
        }
    }
}

impl CollisionConfig {
    /// Parse a (possibly partial) JSON config; missing keys keep their defaults.
    pub fn from_json(src: &str) -> Result<Self, CollisionError> {
        Ok(serde_json::from_str(src)?)
    }
}
