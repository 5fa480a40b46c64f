//! Byte-angle trigonometry tables shared by both resolvers.

use std::f64::consts::PI;
use std::sync::LazyLock;

struct Tables {
    sin: [i32; 256],
    cos: [i32; 256],
}

static TABLES: LazyLock<Tables> = LazyLock::new(|| {
    let mut sin = [0; 256];
    let mut cos = [0; 256];
    for i in 0..256 {
        let rad = i as f64 * PI / 128.0;
        sin[i] = (rad.sin() * 256.0) as i32;
        cos[i] = (rad.cos() * 256.0) as i32;
    }
    Tables { sin, cos }
});

/// `sin(angle) * 256`, truncated toward zero.
#[inline]
pub fn sin256(angle: i32) -> i32 {
    TABLES.sin[(angle & 0xFF) as usize]
}

/// `cos(angle) * 256`, truncated toward zero.
#[inline]
pub fn cos256(angle: i32) -> i32 {
    TABLES.cos[(angle & 0xFF) as usize]
}

/// Byte angle of the vector `(x, y)` measured counter-clockwise from +X
/// (`y` up). Returns 0 for the zero vector.
pub fn arc_tan(x: i32, y: i32) -> i32 {
    if x == 0 && y == 0 {
        return 0;
    }
    let a = (y as f64).atan2(x as f64) * 128.0 / PI;
    (a.round() as i32) & 0xFF
}

/// Unit-speed displacement `(cos, -sin)` on screen (Y down) scaled by
/// `magnitude` (16.16), as used to move along a surface.
#[inline]
pub fn surface_step(angle: i32, magnitude: i32) -> (i32, i32) {
    (
        ((cos256(angle) as i64 * magnitude as i64) >> 8) as i32,
        ((-sin256(angle) as i64 * magnitude as i64) >> 8) as i32,
    )
}
