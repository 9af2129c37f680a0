//! calibration.rs — per-sensor calibration and the derived depth ray grid
//!
//! A calibration folder holds one JSON record per sensor:
//!
//! ```text
//! calibration/
//!   depth.json   { width, height, intrinsics {fx,fy,cx,cy}, extrinsics [[..4]; 4], scale, alias }
//!   color.json   { width, height, extrinsics [[..4]; 4] }
//! ```
//!
//! `extrinsics` map sensor → rig. `scale` converts raw depth units to meters
//! (`metric = raw * scale`); `alias` is the largest raw value the sensor encodes.

use std::path::Path;

use serde::Deserialize;

use crate::error::FusionError;
use crate::geometry::{Intrinsics, Transform};

// ── Files ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct DepthCalibrationFile {
    width: usize,
    height: usize,
    intrinsics: Intrinsics,
    extrinsics: Transform,
    scale: f64,
    alias: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct ColorCalibrationFile {
    width: usize,
    height: usize,
    #[serde(default)]
    extrinsics: Transform,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, FusionError> {
    let text = std::fs::read_to_string(path).map_err(|source| FusionError::CalibrationIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| FusionError::CalibrationParse {
        path: path.to_path_buf(),
        source,
    })
}

// ── Depth calibration ────────────────────────────────────────────────────────

/// Depth sensor calibration. Immutable once built; `uv2xy` is derived from the
/// intrinsics and resolution at construction.
#[derive(Debug, Clone)]
pub struct Calibration {
    width: usize,
    height: usize,
    intrinsics: Intrinsics,
    extrinsics: Transform,
    scale: f64,
    alias: u16,
    uv2xy: Vec<[f64; 2]>,
}

impl Calibration {
    pub fn new(
        width: usize,
        height: usize,
        intrinsics: Intrinsics,
        extrinsics: Transform,
        scale: f64,
        alias: u16,
    ) -> Result<Self, FusionError> {
        if width < 2 || height < 2 {
            return Err(FusionError::InvalidCalibration(format!(
                "depth resolution {width}x{height} has no cells"
            )));
        }
        if !intrinsics.is_valid() {
            return Err(FusionError::InvalidCalibration(format!(
                "degenerate focal length ({}, {})",
                intrinsics.fx, intrinsics.fy
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(FusionError::InvalidCalibration(format!("depth scale {scale}")));
        }

        let mut uv2xy = Vec::with_capacity(width * height);
        for v in 0..height {
            for u in 0..width {
                uv2xy.push(intrinsics.unproject(u as f64, v as f64));
            }
        }

        Ok(Self { width, height, intrinsics, extrinsics, scale, alias, uv2xy })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Depth sensor → depth rig.
    pub fn extrinsics(&self) -> &Transform {
        &self.extrinsics
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn alias(&self) -> u16 {
        self.alias
    }

    /// Farthest representable distance in meters.
    pub fn max_depth(&self) -> f64 {
        self.alias as f64 * self.scale
    }

    /// Image-plane `(x, y)` of pixel `(u, v)`.
    pub fn uv2xy(&self, u: usize, v: usize) -> [f64; 2] {
        self.uv2xy[v * self.width + u]
    }

    pub fn ray_grid(&self) -> RayGrid {
        RayGrid::from_calibration(self)
    }
}

// ── Ray grid ─────────────────────────────────────────────────────────────────

/// Unit rays through the two opposite corners of every depth cell.
///
/// Cell `(u, v)` spans pixel `(u, v)` to `(u + 1, v + 1)`, so the grid is one
/// smaller than the depth image in each direction. Projecting both corners gives
/// each cell a footprint in the color image instead of a single point.
#[derive(Debug, Clone)]
pub struct RayGrid {
    cols: usize,
    rows: usize,
    origin: Vec<[f64; 3]>,
    diagonal: Vec<[f64; 3]>,
}

fn unit_ray(xy: [f64; 2]) -> [f64; 3] {
    let norm = (xy[0] * xy[0] + xy[1] * xy[1] + 1.0).sqrt();
    [xy[0] / norm, xy[1] / norm, 1.0 / norm]
}

impl RayGrid {
    fn from_calibration(cal: &Calibration) -> Self {
        let cols = cal.width - 1;
        let rows = cal.height - 1;
        let mut origin = Vec::with_capacity(cols * rows);
        let mut diagonal = Vec::with_capacity(cols * rows);
        for v in 0..rows {
            for u in 0..cols {
                origin.push(unit_ray(cal.uv2xy(u, v)));
                diagonal.push(unit_ray(cal.uv2xy(u + 1, v + 1)));
            }
        }
        Self { cols, rows, origin, diagonal }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `(origin, diagonal)` rays of cell `(u, v)`.
    #[inline]
    pub fn rays(&self, u: usize, v: usize) -> ([f64; 3], [f64; 3]) {
        let i = v * self.cols + u;
        (self.origin[i], self.diagonal[i])
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Color camera calibration. Intrinsics are per frame (autofocus).
#[derive(Debug, Clone)]
pub struct ColorCalibration {
    pub width: usize,
    pub height: usize,
    /// Color sensor → color rig.
    pub extrinsics: Transform,
}

/// Everything the reprojector needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    pub depth: Calibration,
    pub color: ColorCalibration,
}

impl CalibrationStore {
    pub fn load(dir: &Path) -> Result<Self, FusionError> {
        let d: DepthCalibrationFile = read_json(&dir.join("depth.json"))?;
        let c: ColorCalibrationFile = read_json(&dir.join("color.json"))?;
        if c.width == 0 || c.height == 0 {
            return Err(FusionError::InvalidCalibration(format!(
                "color resolution {}x{}",
                c.width, c.height
            )));
        }
        Ok(Self {
            depth: Calibration::new(d.width, d.height, d.intrinsics, d.extrinsics, d.scale, d.alias)?,
            color: ColorCalibration {
                width: c.width,
                height: c.height,
                extrinsics: c.extrinsics,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_calibration(w: usize, h: usize) -> Calibration {
        Calibration::new(w, h, Intrinsics::identity(), Transform::identity(), 0.001, 4090).unwrap()
    }

    #[test]
    fn ray_grid_is_one_cell_smaller_than_image() {
        let grid = identity_calibration(4, 3).ray_grid();
        assert_eq!((grid.cols(), grid.rows()), (3, 2));
    }

    #[test]
    fn rays_are_unit_length_and_span_the_cell() {
        let grid = identity_calibration(4, 3).ray_grid();
        let (o, d) = grid.rays(0, 0);
        assert_eq!(o, [0.0, 0.0, 1.0]);
        let s = 1.0 / 3f64.sqrt();
        assert!((d[0] - s).abs() < 1e-12 && (d[1] - s).abs() < 1e-12 && (d[2] - s).abs() < 1e-12);

        let (o, _) = grid.rays(2, 1);
        let len = (o[0] * o[0] + o[1] * o[1] + o[2] * o[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-12);
        // pixel (2, 1) with identity intrinsics sits at x/z = 2, y/z = 1
        assert!((o[0] / o[2] - 2.0).abs() < 1e-12 && (o[1] / o[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn max_depth_uses_alias_and_scale() {
        let cal = identity_calibration(2, 2);
        assert!((cal.max_depth() - 4.09).abs() < 1e-9);
    }

    #[test]
    fn degenerate_calibrations_are_rejected() {
        let zero_focal = Intrinsics::new(0.0, 1.0, 0.0, 0.0);
        assert!(Calibration::new(4, 4, zero_focal, Transform::identity(), 0.001, 1).is_err());
        assert!(Calibration::new(1, 4, Intrinsics::identity(), Transform::identity(), 0.001, 1).is_err());
        assert!(Calibration::new(4, 4, Intrinsics::identity(), Transform::identity(), 0.0, 1).is_err());
    }

    #[test]
    fn store_loads_calibration_folder() {
        let dir = std::env::temp_dir().join(format!("fusion-cal-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("depth.json"),
            r#"{"width":8,"height":6,"intrinsics":{"fx":4,"fy":4,"cx":4,"cy":3},
                "extrinsics":[[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]],
                "scale":0.001,"alias":1055}"#,
        )
        .unwrap();
        std::fs::write(dir.join("color.json"), r#"{"width":32,"height":18}"#).unwrap();

        let store = CalibrationStore::load(&dir).unwrap();
        assert_eq!(store.depth.width(), 8);
        assert_eq!(store.color.extrinsics, Transform::identity());
        assert_eq!(store.depth.uv2xy(4, 3), [0.0, 0.0]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_folder_reports_path() {
        let err = CalibrationStore::load(Path::new("/nonexistent/calibration")).unwrap_err();
        assert!(err.to_string().contains("depth.json"));
    }
}
