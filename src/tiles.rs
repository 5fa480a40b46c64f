//! Stage collision data: per-tile height masks, chunk metadata and the
//! layout grid, plus the one routine that turns a pixel into a surface.

use glam::IVec2;

use crate::error::CollisionError;
use crate::types::*;

/// Tiles in one chunk.
pub const TILES_PER_CHUNK: usize = (CHUNK_TILES * CHUNK_TILES) as usize;

/// Four byte angles packed into one word: byte 0 floor, byte 1 left-wall
/// face, byte 2 right-wall face, byte 3 roof.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedAngles(pub u32);

impl PackedAngles {
    /// Angles of an unsloped square block.
    pub const SQUARE: PackedAngles = PackedAngles::new(0x00, 0x40, 0xC0, 0x80);

    pub const fn new(floor: u8, left_wall: u8, right_wall: u8, roof: u8) -> Self {
        Self(floor as u32 | (left_wall as u32) << 8 | (right_wall as u32) << 16 | (roof as u32) << 24)
    }

    pub const fn floor(self) -> i32 {
        (self.0 & 0xFF) as i32
    }

    pub const fn left_wall(self) -> i32 {
        (self.0 >> 8 & 0xFF) as i32
    }

    pub const fn right_wall(self) -> i32 {
        (self.0 >> 16 & 0xFF) as i32
    }

    pub const fn roof(self) -> i32 {
        (self.0 >> 24 & 0xFF) as i32
    }

    pub const fn face(self, face: Face) -> i32 {
        match face {
            Face::Floor => self.floor(),
            Face::LeftWall => self.left_wall(),
            Face::RightWall => self.right_wall(),
            Face::Roof => self.roof(),
        }
    }
}

/// One of the four faces a mask describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// Top of the solid; met moving down.
    Floor,
    /// Left side of the solid; met moving right.
    LeftWall,
    /// Right side of the solid; met moving left.
    RightWall,
    /// Underside of the solid; met moving up.
    Roof,
}

impl Face {
    /// Face a probe of the given orientation lands on.
    pub const fn probed_by(mode: CollisionMode) -> Self {
        match mode {
            CollisionMode::Floor => Self::Floor,
            CollisionMode::RWall => Self::LeftWall,
            CollisionMode::Roof => Self::Roof,
            CollisionMode::LWall => Self::RightWall,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Floor => Self::Roof,
            Self::Roof => Self::Floor,
            Self::LeftWall => Self::RightWall,
            Self::RightWall => Self::LeftWall,
        }
    }
}

/// Signed surface heights for one 16×16 tile shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionMask {
    /// Topmost solid row per column.
    pub floor: [i8; 16],
    /// Leftmost solid column per row.
    pub left_wall: [i8; 16],
    /// Rightmost solid column per row.
    pub right_wall: [i8; 16],
    /// Bottom-most solid row per column.
    pub roof: [i8; 16],
    pub angles: PackedAngles,
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl CollisionMask {
    /// No surface on any face.
    pub fn empty() -> Self {
        let none = NO_SURFACE as i8;
        Self {
            floor: [none; 16],
            left_wall: [none; 16],
            right_wall: [-none; 16],
            roof: [-none; 16],
            angles: PackedAngles::default(),
        }
    }

    /// Full 16×16 block.
    pub fn solid() -> Self {
        Self::from_pixels([0xFFFF; 16], PackedAngles::SQUARE)
    }

    /// Derive the four height arrays from a solidity bitmap. `rows[y]` bit
    /// `15 - x` marks pixel `(x, y)` solid.
    pub fn from_pixels(rows: [u16; 16], angles: PackedAngles) -> Self {
        let mut mask = Self { angles, ..Self::empty() };
        let solid = |x: usize, y: usize| rows[y] & (0x8000 >> x) != 0;
        for i in 0..16 {
            if let Some(y) = (0..16).find(|&y| solid(i, y)) {
                mask.floor[i] = y as i8;
            }
            if let Some(y) = (0..16).rev().find(|&y| solid(i, y)) {
                mask.roof[i] = y as i8;
            }
            if let Some(x) = (0..16).find(|&x| solid(x, i)) {
                mask.left_wall[i] = x as i8;
            }
            if let Some(x) = (0..16).rev().find(|&x| solid(x, i)) {
                mask.right_wall[i] = x as i8;
            }
        }
        mask
    }

    pub fn heights(&self, face: Face) -> &[i8; 16] {
        match face {
            Face::Floor => &self.floor,
            Face::LeftWall => &self.left_wall,
            Face::RightWall => &self.right_wall,
            Face::Roof => &self.roof,
        }
    }

    /// In-tile surface coordinate of `face` at column/row `index`, or `None`
    /// when the stored height is a no-surface marker.
    pub fn surface(&self, face: Face, index: usize) -> Option<i32> {
        let h = *self.heights(face).get(index)? as i32;
        if h.abs() >= NO_SURFACE { None } else { Some(h) }
    }
}

/// Orientation override of a placed tile.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flip {
    #[default]
    None = 0,
    X = 1,
    Y = 2,
    XY = 3,
}

impl Flip {
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::X),
            2 => Some(Self::Y),
            3 => Some(Self::XY),
            _ => None,
        }
    }

    pub const fn flips_x(self) -> bool {
        matches!(self, Self::X | Self::XY)
    }

    pub const fn flips_y(self) -> bool {
        matches!(self, Self::Y | Self::XY)
    }

    /// Mirror a surface angle the way the tile is mirrored.
    pub const fn transform_angle(self, angle: i32) -> i32 {
        wrap_angle(match self {
            Self::None => angle,
            Self::X => 0x100 - angle,
            Self::Y => 0x180 - angle,
            Self::XY => 0x100 - wrap_angle(0x180 - angle),
        })
    }
}

/// Which probe orientations a placed tile blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Solidity {
    #[default]
    All = 0,
    /// One-way platform: only floor probes.
    Top = 1,
    /// Everything but floor probes.
    Lrb = 2,
    None = 3,
}

impl Solidity {
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::All),
            1 => Some(Self::Top),
            2 => Some(Self::Lrb),
            3 => Some(Self::None),
            _ => None,
        }
    }

    pub const fn blocks(self, probe: CollisionMode) -> bool {
        match self {
            Self::All => true,
            Self::Top => matches!(probe, CollisionMode::Floor),
            Self::Lrb => !matches!(probe, CollisionMode::Floor),
            Self::None => false,
        }
    }
}

/// Tile placement inside a chunk. Flip and solidity are kept raw and decoded
/// on access so unknown values read as "nothing here".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkTile {
    pub tile_index: u16,
    pub flip: u8,
    pub visual_plane: u8,
    pub solidity: [u8; PLANE_COUNT],
}

impl Default for ChunkTile {
    fn default() -> Self {
        Self::AIR
    }
}

impl ChunkTile {
    pub const AIR: ChunkTile = ChunkTile {
        tile_index: 0,
        flip: Flip::None as u8,
        visual_plane: 0,
        solidity: [Solidity::None as u8; PLANE_COUNT],
    };

    /// Same solidity on both planes.
    pub const fn new(tile_index: u16, flip: Flip, solidity: Solidity) -> Self {
        Self {
            tile_index,
            flip: flip as u8,
            visual_plane: 0,
            solidity: [solidity as u8; PLANE_COUNT],
        }
    }

    pub const fn flip(&self) -> Option<Flip> {
        Flip::from_raw(self.flip)
    }

    pub fn solidity(&self, plane: usize) -> Option<Solidity> {
        Solidity::from_raw(*self.solidity.get(plane)?)
    }
}

/// 8×8 tiles, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub tiles: [ChunkTile; TILES_PER_CHUNK],
}

impl Default for Chunk {
    fn default() -> Self {
        Self { tiles: [ChunkTile::AIR; TILES_PER_CHUNK] }
    }
}

/// Chunk indices for the collision layer, row-major, in 128 px units.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageLayout {
    pub width: usize,
    pub height: usize,
    pub chunks: Vec<u16>,
}

impl StageLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, chunks: vec![0; width * height] }
    }

    pub fn get(&self, cx: usize, cy: usize) -> Option<u16> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        self.chunks.get(cx + cy * self.width).copied()
    }

    pub fn set(&mut self, cx: usize, cy: usize, chunk: u16) {
        if cx < self.width && cy < self.height {
            self.chunks[cx + cy * self.width] = chunk;
        }
    }

    pub fn pixel_size(&self) -> IVec2 {
        IVec2::new(self.width as i32 * CHUNK_SIZE, self.height as i32 * CHUNK_SIZE)
    }
}

/// A resolved tile location. Computed, never stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileAddress {
    pub chunk: usize,
    /// Tile slot inside the chunk, `tile_x + tile_y * 8`.
    pub tile: usize,
    /// Whole-pixel top-left corner of the tile.
    pub origin: IVec2,
}

/// A surface found by [`TileMap::surface_at`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceHit {
    /// Absolute pixel coordinate along the probe axis (Y for floor/roof,
    /// X for walls).
    pub coord: i32,
    /// Flip-corrected byte angle in `[0, 256)`.
    pub angle: i32,
}

/// Read-only tile collision resource for one stage.
#[derive(Clone, Debug)]
pub struct TileMap {
    pub layout: StageLayout,
    pub chunks: Vec<Chunk>,
    pub masks: [Vec<CollisionMask>; PLANE_COUNT],
}

impl TileMap {
    /// Validate and assemble stage data.
    pub fn new(
        layout: StageLayout,
        chunks: Vec<Chunk>,
        masks: [Vec<CollisionMask>; PLANE_COUNT],
    ) -> Result<Self, CollisionError> {
        if layout.chunks.len() != layout.width * layout.height {
            return Err(CollisionError::LayoutSize {
                width: layout.width,
                height: layout.height,
                len: layout.chunks.len(),
            });
        }
        if let Some(&bad) = layout.chunks.iter().find(|&&c| c as usize >= chunks.len()) {
            return Err(CollisionError::ChunkOutOfRange { chunk: bad as usize, count: chunks.len() });
        }
        for (ci, chunk) in chunks.iter().enumerate() {
            for (ti, tile) in chunk.tiles.iter().enumerate() {
                for plane in &masks {
                    if tile.tile_index as usize >= plane.len() {
                        return Err(CollisionError::TileIndexOutOfRange {
                            tile: ci * TILES_PER_CHUNK + ti,
                            index: tile.tile_index as usize,
                            count: plane.len(),
                        });
                    }
                }
            }
        }
        Ok(Self { layout, chunks, masks })
    }

    /// Stage where every layout cell owns a private, initially empty chunk,
    /// sharing one mask table across both planes. Mask 0 should be empty.
    pub fn with_unique_chunks(width: usize, height: usize, masks: Vec<CollisionMask>) -> Result<Self, CollisionError> {
        let mut layout = StageLayout::new(width, height);
        for i in 0..width * height {
            layout.chunks[i] = i as u16;
        }
        let chunks = vec![Chunk::default(); width * height];
        Self::new(layout, chunks, [masks.clone(), masks])
    }

    /// Overwrite the tile at whole-tile coordinates `(tx, ty)`.
    pub fn set_tile(&mut self, tx: i32, ty: i32, tile: ChunkTile) -> Result<(), CollisionError> {
        let addr = self
            .address(IVec2::new(tx * TILE_SIZE, ty * TILE_SIZE))
            .ok_or(CollisionError::LayoutSize {
                width: self.layout.width,
                height: self.layout.height,
                len: self.layout.chunks.len(),
            })?;
        for plane in &self.masks {
            if tile.tile_index as usize >= plane.len() {
                return Err(CollisionError::TileIndexOutOfRange {
                    tile: addr.chunk * TILES_PER_CHUNK + addr.tile,
                    index: tile.tile_index as usize,
                    count: plane.len(),
                });
            }
        }
        self.chunks[addr.chunk].tiles[addr.tile] = tile;
        Ok(())
    }

    /// Resolve a whole-pixel point to its tile, or `None` off the stage.
    pub fn address(&self, p: IVec2) -> Option<TileAddress> {
        if p.x < 0 || p.y < 0 {
            return None;
        }
        let (cx, cy) = ((p.x / CHUNK_SIZE) as usize, (p.y / CHUNK_SIZE) as usize);
        let chunk = self.layout.get(cx, cy)? as usize;
        let tx = (p.x % CHUNK_SIZE) / TILE_SIZE;
        let ty = (p.y % CHUNK_SIZE) / TILE_SIZE;
        Some(TileAddress {
            chunk,
            tile: (tx + ty * CHUNK_TILES) as usize,
            origin: IVec2::new(p.x - p.x % TILE_SIZE, p.y - p.y % TILE_SIZE),
        })
    }

    pub fn tile(&self, addr: TileAddress) -> Option<&ChunkTile> {
        self.chunks.get(addr.chunk)?.tiles.get(addr.tile)
    }

    pub fn mask(&self, plane: usize, tile_index: u16) -> Option<&CollisionMask> {
        self.masks.get(plane)?.get(tile_index as usize)
    }

    /// The surface a `probe`-oriented sensor at whole pixel `p` sees inside
    /// the tile containing `p`, with flips applied. `None` when the tile is
    /// off-stage, not solid for this probe, or has no surface at that
    /// column/row.
    pub fn surface_at(&self, plane: usize, probe: CollisionMode, p: IVec2) -> Option<SurfaceHit> {
        let addr = self.address(p)?;
        let tile = self.tile(addr)?;
        if !tile.solidity(plane)?.blocks(probe) {
            return None;
        }
        let flip = tile.flip()?;
        let mask = self.mask(plane, tile.tile_index)?;
        let local = p - addr.origin;

        let (along, depth_flipped, index_flipped, base) = if probe.is_wall() {
            (local.y, flip.flips_x(), flip.flips_y(), addr.origin.x)
        } else {
            (local.x, flip.flips_y(), flip.flips_x(), addr.origin.y)
        };
        let index = if index_flipped { TILE_SIZE - 1 - along } else { along };
        let face = if depth_flipped {
            Face::probed_by(probe).opposite()
        } else {
            Face::probed_by(probe)
        };
        let h = mask.surface(face, index as usize)?;
        let h = if depth_flipped { TILE_SIZE - 1 - h } else { h };
        Some(SurfaceHit {
            coord: base + h,
            angle: flip.transform_angle(mask.angles.face(face)),
        })
    }
}
