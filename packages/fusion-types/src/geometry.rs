//! geometry.rs — homogeneous transforms and pinhole intrinsics
//!
//! Every frame change in the fusion chain goes through [`Transform`]. The matrix
//! is stored row-major and acts on column vectors, so composition reads
//! right-to-left: `world_from_rig.compose(&rig_from_sensor)` first applies
//! `rig_from_sensor`, then `world_from_rig`.

use serde::{Deserialize, Serialize};

// ── Transform ────────────────────────────────────────────────────────────────

/// Immutable 4×4 homogeneous transform (row-major, column-vector convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub const fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    /// Rigid transform from a 3×3 rotation (row-major) and a translation.
    pub fn from_rotation_translation(r: [[f64; 3]; 3], t: [f64; 3]) -> Self {
        Self {
            m: [
                [r[0][0], r[0][1], r[0][2], t[0]],
                [r[1][0], r[1][1], r[1][2], t[1]],
                [r[2][0], r[2][1], r[2][2], t[2]],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::from_rotation_translation(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [x, y, z],
        )
    }

    /// Rotation about the sensor's Y axis (yaw for a forward-looking camera).
    pub fn rotation_y(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_rotation_translation(
            [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
            [0.0, 0.0, 0.0],
        )
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.m
    }

    /// `self ∘ other`: the result applies `other` first, then `self`.
    pub fn compose(&self, other: &Transform) -> Transform {
        let mut out = [[0.0f64; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Transform { m: out }
    }

    /// Inverse of a rigid transform: `[Rᵀ | -Rᵀt]`.
    ///
    /// Only valid for rotation + translation matrices (poses, extrinsics).
    pub fn inverse_rigid(&self) -> Transform {
        let m = &self.m;
        let mut r_t = [[0.0f64; 3]; 3];
        for (i, row) in r_t.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = m[j][i];
            }
        }
        let t = [m[0][3], m[1][3], m[2][3]];
        let neg_rt_t = [
            -(r_t[0][0] * t[0] + r_t[0][1] * t[1] + r_t[0][2] * t[2]),
            -(r_t[1][0] * t[0] + r_t[1][1] * t[1] + r_t[1][2] * t[2]),
            -(r_t[2][0] * t[0] + r_t[2][1] * t[1] + r_t[2][2] * t[2]),
        ];
        Transform::from_rotation_translation(r_t, neg_rt_t)
    }

    /// Apply to a 3D point (w = 1), returning the homogeneous result `[x, y, z, w]`.
    #[inline]
    pub fn apply(&self, p: [f64; 3]) -> [f64; 4] {
        let m = &self.m;
        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2] + m[0][3],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2] + m[1][3],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2] + m[2][3],
            m[3][0] * p[0] + m[3][1] * p[1] + m[3][2] * p[2] + m[3][3],
        ]
    }

    /// The head tracker zeroes the pose when tracking is lost.
    pub fn is_valid_pose(&self) -> bool {
        self.m[3][3] != 0.0
    }
}

// ── Intrinsics ───────────────────────────────────────────────────────────────

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Unit focal length, principal point at the origin.
    pub const fn identity() -> Self {
        Self::new(1.0, 1.0, 0.0, 0.0)
    }

    /// Color camera intrinsics as reported per frame (autofocus moves both).
    pub fn from_focal_principal(focal_length: [f64; 2], principal_point: [f64; 2]) -> Self {
        Self::new(focal_length[0], focal_length[1], principal_point[0], principal_point[1])
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite() && self.fy.is_finite() && self.fx != 0.0 && self.fy != 0.0
    }

    /// Camera → image as a homogeneous transform. The third output row carries
    /// the camera-space depth, so dividing x and y by it yields pixels.
    pub fn camera_to_image(&self) -> Transform {
        Transform::from_rows([
            [self.fx, 0.0, self.cx, 0.0],
            [0.0, self.fy, self.cy, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Normalized image-plane coordinates of pixel position `(u, v)`.
    pub fn unproject(&self, u: f64, v: f64) -> [f64; 2] {
        [(u - self.cx) / self.fx, (v - self.cy) / self.fy]
    }
}
