//! loopgrip: tile-grid sensor collision for 2D platformers. Entities probe
//! per-tile height masks with point sensors, stick to slopes, walls and
//! ceilings, and query script boxes. All positions are 16.16 fixed point.

pub mod types;
pub mod error;
pub mod trig;
pub mod tiles;
pub mod api;
pub mod probe;
pub mod air;
pub mod grip;
pub mod objects;
pub mod shapes;
pub mod debug;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::CollisionError;
pub use crate::tiles::{Chunk, ChunkTile, CollisionMask, Flip, PackedAngles, Solidity, StageLayout, TileMap};
pub use crate::debug::{DebugHitbox, DebugHitboxKind, HitboxOwner};
pub use crate::world::{CollisionWorld, Scene};
