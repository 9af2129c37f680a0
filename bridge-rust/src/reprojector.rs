//! reprojector.rs — depth → color image alignment
//!
//! Each depth cell is lifted to 3D along its two corner rays, carried through
//!
//! ```text
//! depth sensor → depth rig → world → color rig → color sensor → color image
//! ```
//!
//! and rasterized as the rectangle spanned by the projected corners. Cells
//! behind the color camera, or whose rectangle leaves the image, are dropped
//! whole; footprints are never clipped.

use serde::Deserialize;
use thiserror::Error;

use fusion_types::frame::{ColorFrame, DepthFrame};
use fusion_types::{CalibrationStore, RayGrid, Transform};

/// What to do where two footprints overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterPolicy {
    /// Later cells overwrite earlier ones.
    #[default]
    Overwrite,
    /// Keep the smallest depth per pixel.
    Nearest,
}

#[derive(Debug, Error, PartialEq)]
pub enum ReprojectError {
    #[error("depth frame is {actual_w}x{actual_h}, calibration expects {expected_w}x{expected_h}")]
    DepthResolution {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },
    #[error("color frame intrinsics are degenerate (fx={fx}, fy={fy})")]
    ColorIntrinsics { fx: f64, fy: f64 },
}

/// Metric depth per color pixel; 0 means unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDepthMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl AlignedDepthMap {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0.0; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> f32 {
        self.data[v * self.width + u]
    }

    /// Fraction of pixels with a known depth.
    pub fn coverage(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|d| **d > 0.0).count() as f64 / self.data.len() as f64
    }

    /// Smallest known depth, if any.
    pub fn nearest(&self) -> Option<f32> {
        self.data.iter().copied().filter(|d| *d > 0.0).reduce(f32::min)
    }

    fn fill(&mut self, u0: usize, v0: usize, u1: usize, v1: usize, z: f32, policy: RasterPolicy) {
        // a rotated cell can project with its diagonal left of or above its origin
        if u1 <= u0 {
            return;
        }
        for v in v0..v1 {
            let row = &mut self.data[v * self.width + u0..v * self.width + u1];
            match policy {
                RasterPolicy::Overwrite => row.fill(z),
                RasterPolicy::Nearest => {
                    for px in row {
                        if *px == 0.0 || z < *px {
                            *px = z;
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprojectionStats {
    /// Cells with a non-zero raw sample.
    pub valid_cells: usize,
    pub behind_camera: usize,
    pub out_of_bounds: usize,
    pub drawn: usize,
}

pub struct Reprojector {
    rays: RayGrid,
    depth_extrinsics: Transform,
    /// Color rig → color sensor.
    color_from_rig: Transform,
    scale: f64,
    depth_width: usize,
    depth_height: usize,
    color_width: usize,
    color_height: usize,
    policy: RasterPolicy,
}

impl Reprojector {
    pub fn new(calibration: &CalibrationStore, policy: RasterPolicy) -> Self {
        let depth = &calibration.depth;
        Self {
            rays: depth.ray_grid(),
            depth_extrinsics: *depth.extrinsics(),
            color_from_rig: calibration.color.extrinsics.inverse_rigid(),
            scale: depth.scale(),
            depth_width: depth.width(),
            depth_height: depth.height(),
            color_width: calibration.color.width,
            color_height: calibration.color.height,
            policy,
        }
    }

    /// Depth sensor → color image for this frame pair. Rebuilt every call: the
    /// poses move and the color intrinsics follow autofocus.
    fn depth_to_color_image(&self, depth: &DepthFrame, color: &ColorFrame) -> Transform {
        color
            .payload
            .intrinsics
            .camera_to_image()
            .compose(&self.color_from_rig)
            .compose(&color.pose.inverse_rigid())
            .compose(&depth.pose)
            .compose(&self.depth_extrinsics)
    }

    pub fn reproject(
        &self,
        depth: &DepthFrame,
        color: &ColorFrame,
    ) -> Result<(AlignedDepthMap, ReprojectionStats), ReprojectError> {
        let image = &depth.payload;
        if image.width() != self.depth_width || image.height() != self.depth_height {
            return Err(ReprojectError::DepthResolution {
                expected_w: self.depth_width,
                expected_h: self.depth_height,
                actual_w: image.width(),
                actual_h: image.height(),
            });
        }
        let k = &color.payload.intrinsics;
        if !k.is_valid() {
            return Err(ReprojectError::ColorIntrinsics { fx: k.fx, fy: k.fy });
        }

        let chain = self.depth_to_color_image(depth, color);
        let (w, h) = (self.color_width as i64, self.color_height as i64);
        let mut map = AlignedDepthMap::zeros(self.color_width, self.color_height);
        let mut stats = ReprojectionStats::default();

        for v in 0..self.rays.rows() {
            for u in 0..self.rays.cols() {
                let raw = image.get(u, v);
                if raw == 0 {
                    continue;
                }
                stats.valid_cells += 1;
                let metric = raw as f64 * self.scale;

                let (ray_o, ray_d) = self.rays.rays(u, v);
                let ho = chain.apply([ray_o[0] * metric, ray_o[1] * metric, ray_o[2] * metric]);
                let hd = chain.apply([ray_d[0] * metric, ray_d[1] * metric, ray_d[2] * metric]);
                // also rejects NaN
                if !(ho[2] > 0.0 && hd[2] > 0.0) {
                    stats.behind_camera += 1;
                    continue;
                }

                // integer casts truncate toward zero
                let u0 = (ho[0] / ho[2]) as i64;
                let v0 = (ho[1] / ho[2]) as i64;
                let u1 = (hd[0] / hd[2] + 1.0) as i64;
                let v1 = (hd[1] / hd[2] + 1.0) as i64;

                let origin_inside = (0..w).contains(&u0) && (0..h).contains(&v0);
                let diagonal_inside = (1..=w).contains(&u1) && (1..=h).contains(&v1);
                if !(origin_inside && diagonal_inside) {
                    stats.out_of_bounds += 1;
                    continue;
                }

                map.fill(u0 as usize, v0 as usize, u1 as usize, v1 as usize, ho[2] as f32, self.policy);
                stats.drawn += 1;
            }
        }

        Ok((map, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_types::{
        Calibration, CameraFrame, ColorCalibration, ColorImage, ColorPayload, DepthImage, Intrinsics,
    };

    fn store(depth_w: usize, depth_h: usize, color_w: usize, color_h: usize) -> CalibrationStore {
        CalibrationStore {
            depth: Calibration::new(
                depth_w,
                depth_h,
                Intrinsics::identity(),
                Transform::identity(),
                0.001,
                4000,
            )
            .unwrap(),
            color: ColorCalibration {
                width: color_w,
                height: color_h,
                extrinsics: Transform::identity(),
            },
        }
    }

    fn depth_with(w: usize, h: usize, cells: &[(usize, usize, u16)]) -> DepthFrame {
        let mut data = vec![0u16; w * h];
        for &(u, v, raw) in cells {
            data[v * w + u] = raw;
        }
        CameraFrame::new(0, Transform::identity(), DepthImage::new(w, h, data).unwrap())
    }

    fn color_at(pose: Transform, w: usize, h: usize) -> ColorFrame {
        let payload = ColorPayload {
            image: ColorImage::filled(w, h, [0, 0, 0]),
            intrinsics: Intrinsics::identity(),
        };
        CameraFrame::new(0, pose, payload)
    }

    fn nonzero(map: &AlignedDepthMap) -> Vec<(usize, usize, f32)> {
        let mut out = Vec::new();
        for v in 0..map.height() {
            for u in 0..map.width() {
                if map.get(u, v) != 0.0 {
                    out.push((u, v, map.get(u, v)));
                }
            }
        }
        out
    }

    #[test]
    fn single_cell_fills_its_footprint_with_metric_depth() {
        let r = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Overwrite);
        let depth = depth_with(4, 4, &[(0, 0, 1000)]);
        let (map, stats) = r.reproject(&depth, &color_at(Transform::identity(), 8, 8)).unwrap();

        // origin ray (0,0,1) lands on pixel (0,0); diagonal ray through (1,1) on (1,1) + 1
        let hits = nonzero(&map);
        assert_eq!(hits.len(), 4, "{hits:?}");
        for (u, v, z) in hits {
            assert!(u < 2 && v < 2);
            assert!((z - 1.0).abs() < 1e-6);
        }
        assert_eq!(stats, ReprojectionStats { valid_cells: 1, behind_camera: 0, out_of_bounds: 0, drawn: 1 });
    }

    #[test]
    fn empty_depth_yields_all_zero_map() {
        let r = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Overwrite);
        let (map, stats) = r
            .reproject(&depth_with(4, 4, &[]), &color_at(Transform::identity(), 8, 8))
            .unwrap();
        assert!(map.values().iter().all(|z| *z == 0.0));
        assert_eq!(map.nearest(), None);
        assert_eq!(stats.valid_cells, 0);
    }

    #[test]
    fn footprints_leaving_the_image_are_dropped_not_clipped() {
        let r = Reprojector::new(&store(8, 8, 2, 2), RasterPolicy::Overwrite);
        // (1,0): origin pixel (1,0) is inside, diagonal (2,1)+1 = (3,2) is not
        // (5,5): origin already outside
        let depth = depth_with(8, 8, &[(1, 0, 1000), (5, 5, 1000)]);
        let (map, stats) = r.reproject(&depth, &color_at(Transform::identity(), 2, 2)).unwrap();
        assert!(nonzero(&map).is_empty());
        assert_eq!(stats.out_of_bounds, 2);
        assert_eq!(stats.drawn, 0);
    }

    #[test]
    fn footprint_ending_on_the_image_edge_is_kept() {
        let r = Reprojector::new(&store(8, 8, 2, 2), RasterPolicy::Overwrite);
        // diagonal (1,1) + 1 lands exactly on (W, H)
        let depth = depth_with(8, 8, &[(0, 0, 1000)]);
        let (map, stats) = r.reproject(&depth, &color_at(Transform::identity(), 2, 2)).unwrap();
        assert_eq!(stats.drawn, 1);
        assert_eq!(stats.out_of_bounds, 0);
        assert!(map.values().iter().all(|z| (z - 1.0).abs() < 1e-6), "{:?}", map.values());
    }

    #[test]
    fn origin_on_the_image_edge_is_dropped() {
        let r = Reprojector::new(&store(8, 8, 2, 2), RasterPolicy::Overwrite);
        // origins at u = W and at v = H
        let depth = depth_with(8, 8, &[(2, 0, 1000), (0, 2, 1000)]);
        let (map, stats) = r.reproject(&depth, &color_at(Transform::identity(), 2, 2)).unwrap();
        assert!(nonzero(&map).is_empty());
        assert_eq!(stats.out_of_bounds, 2);
        assert_eq!(stats.drawn, 0);
    }

    #[test]
    fn cells_behind_color_camera_are_dropped() {
        let r = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Overwrite);
        let depth = depth_with(4, 4, &[(0, 0, 1000)]);
        // color rig sits 5 m ahead of the depth sensor, so the point is 4 m behind it
        let color = color_at(Transform::translation(0.0, 0.0, 5.0), 8, 8);
        let (map, stats) = r.reproject(&depth, &color).unwrap();
        assert!(nonzero(&map).is_empty());
        assert_eq!(stats.behind_camera, 1);
    }

    #[test]
    fn overlap_policy_decides_winner() {
        let color = color_at(Transform::identity(), 8, 8);

        // (0,0) at 1.0 m and (1,1) at 0.5 m: the second footprint covers pixel (1,1)
        let both = depth_with(4, 4, &[(0, 0, 1000), (1, 1, 500)]);
        let over = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Overwrite);
        let (m, _) = over.reproject(&both, &color).unwrap();
        let shared = m.get(1, 1);
        assert!(shared > 0.0 && shared < 1.0, "later cell overwrites: {shared}");

        let deep_last = depth_with(4, 4, &[(0, 0, 400), (1, 1, 3000)]);
        let (m, _) = over.reproject(&deep_last, &color).unwrap();
        assert!(m.get(1, 1) > 1.0, "overwrite ignores depth order");

        let nearest = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Nearest);
        let (m, _) = nearest.reproject(&deep_last, &color).unwrap();
        assert!((m.get(1, 1) - 0.4).abs() < 1e-6, "nearest keeps the closer cell");
    }

    #[test]
    fn reprojection_is_bit_identical_across_runs() {
        let r = Reprojector::new(&store(6, 6, 16, 16), RasterPolicy::Overwrite);
        let depth = depth_with(6, 6, &[(0, 0, 1234), (1, 2, 2345), (3, 1, 999), (2, 2, 1500)]);
        let color = color_at(Transform::translation(0.01, -0.02, -0.5), 16, 16);
        let (a, sa) = r.reproject(&depth, &color).unwrap();
        let (b, sb) = r.reproject(&depth, &color).unwrap();
        let bits = |m: &AlignedDepthMap| m.values().iter().map(|z| z.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(sa, sb);
    }

    #[test]
    fn rejects_mismatched_depth_resolution() {
        let r = Reprojector::new(&store(4, 4, 8, 8), RasterPolicy::Overwrite);
        let err = r
            .reproject(&depth_with(5, 4, &[]), &color_at(Transform::identity(), 8, 8))
            .unwrap_err();
        assert!(matches!(err, ReprojectError::DepthResolution { actual_w: 5, .. }));
    }
}
