use thiserror::Error;

use crate::types::{EntityId, PlayerId};

/// Errors raised for malformed stage data or dangling handles. A probe that
/// simply finds no surface is never an error.
#[derive(Debug, Error)]
pub enum CollisionError {
    #[error("layout is {width}x{height} chunks but holds {len} entries")]
    LayoutSize { width: usize, height: usize, len: usize },

    #[error("layout references chunk {chunk} but only {count} are defined")]
    ChunkOutOfRange { chunk: usize, count: usize },

    #[error("chunk tile {tile} uses mask {index} but the mask table has {count} entries")]
    TileIndexOutOfRange { tile: usize, index: usize, count: usize },

    #[error("hitbox {index} is not in the hitbox list")]
    MissingHitbox { index: usize },

    #[error("collision plane {0} does not exist")]
    InvalidPlane(usize),

    #[error("no entity with id {0:?}")]
    UnknownEntity(EntityId),

    #[error("no player with id {0:?}")]
    UnknownPlayer(PlayerId),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
