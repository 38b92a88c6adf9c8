//! Row-major 4x4 transforms and the Y-up to Z-up world conversion.
//!
//! Matrices are indexed `m[row][col]`; translation lives in column 3.
//! Helper composition follows the column-vector convention, so
//! `mul(a, b)` applies `b` first.

use std::f32::consts::FRAC_PI_2;

pub type Mat4 = [[f32; 4]; 4];

pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

pub fn translation(v: [f32; 3]) -> Mat4 {
    let mut m = IDENTITY;
    m[0][3] = v[0];
    m[1][3] = v[1];
    m[2][3] = v[2];
    m
}

/// Right-handed rotation of `angle` radians about +X.
pub fn rotation_x(angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, c, -s, 0.0],
        [0.0, s, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Post-multiply `m` by a translation (translation applied in `m`'s local frame).
pub fn translate(m: &Mat4, v: [f32; 3]) -> Mat4 {
    mul(m, &translation(v))
}

pub fn translation_of(m: &Mat4) -> [f32; 3] {
    [m[0][3], m[1][3], m[2][3]]
}

/// Lift the runtime's row-major 3x4 pose matrix to a full 4x4 transform.
pub fn from_device_matrix34(m: &[[f32; 4]; 3]) -> Mat4 {
    [m[0], m[1], m[2], [0.0, 0.0, 0.0, 1.0]]
}

/// Convert a tracking-space (Y-up) transform into the Z-up world convention.
///
/// The translation is moved out, the +90 degree X rotation is applied, and the
/// translation is re-applied in the rotated frame. The net result is
/// `rotation_x(pi/2) * transform`: orientation and position are both carried
/// into Z-up, so a point one metre above the origin ends up at +Z.
///
/// Not idempotent: every application adds another quarter turn.
pub fn to_z_up(transform: &Mat4) -> Mat4 {
    let root = rotation_x(FRAC_PI_2);
    let offset = translation_of(transform);
    let centred = translate(transform, [-offset[0], -offset[1], -offset[2]]);
    translate(&mul(&root, &centred), offset)
}
