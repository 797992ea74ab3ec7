//! Weighted kernel density contours in pixel space.
//!
//! Points are splatted onto a padded grid of `2^k` pixel cells, smoothed with
//! three passes of a box blur per axis, and traced at "nice" thresholds.

use crate::config::DensityConfig;
use crate::contours::contour;
use geo::{Coord, MapCoords, MultiPolygon};
use rayon::prelude::*;
use serde::{Serialize, Serializer};

const BLUR_PASSES: usize = 3;

#[derive(Debug, Clone)]
pub struct Contour {
    /// Density at the threshold, in weight per square pixel.
    pub value: f64,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DensitySurface {
    pub contours: Vec<Contour>,
}

impl DensitySurface {
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let features = self
            .contours
            .iter()
            .map(|c| {
                let mut properties = serde_json::Map::new();
                properties.insert("value".to_string(), serde_json::json!(c.value));
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&c.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl Serialize for DensitySurface {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_geojson().serialize(s)
    }
}

#[derive(Debug, Clone)]
pub struct DensityEstimator {
    /// log2 of the cell size in pixels
    k: u32,
    /// blur radius in pixels
    radius: f64,
    /// padding around the viewport, in pixels
    pad: f64,
    width: usize,
    height: usize,
    thresholds: usize,
    weighted: bool,
}

impl DensityEstimator {
    pub fn new(config: &DensityConfig, size: [f64; 2]) -> Self {
        let bandwidth = config.bandwidth.max(0.0);
        let radius = ((4.0 * bandwidth * bandwidth + 1.0).sqrt() - 1.0) / 2.0;
        let k = config.cell_size.max(1.0).log2().floor() as u32;
        let pad = radius * 3.0;

        Self {
            k,
            radius,
            pad,
            width: ((size[0].max(0.0) + pad * 2.0) as usize) >> k,
            height: ((size[1].max(0.0) + pad * 2.0) as usize) >> k,
            thresholds: config.thresholds,
            weighted: config.weighted,
        }
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn cell(&self) -> f64 {
        (1u64 << self.k) as f64
    }

    /// Splats `(pixel, weight)` samples bilinearly and blurs the result.
    pub fn grid(&self, samples: &[([f64; 2], f64)]) -> Vec<f64> {
        let (n, m) = (self.width, self.height);
        let mut values = vec![0.0; n * m];
        let inv = 1.0 / self.cell();

        let mut add = |x: usize, y: usize, v: f64| {
            if x < n && y < m {
                values[x + y * n] += v;
            }
        };

        for &([px, py], w) in samples {
            let w = if self.weighted { w } else { 1.0 };
            let xi = (px + self.pad) * inv;
            let yi = (py + self.pad) * inv;
            if w == 0.0 || !(xi >= 0.0 && xi < n as f64 && yi >= 0.0 && yi < m as f64) {
                continue;
            }

            let x0 = xi.floor();
            let y0 = yi.floor();
            let xt = xi - x0 - 0.5;
            let yt = yi - y0 - 0.5;
            let (x0, y0) = (x0 as usize, y0 as usize);

            add(x0, y0, (1.0 - xt) * (1.0 - yt) * w);
            add(x0 + 1, y0, xt * (1.0 - yt) * w);
            add(x0 + 1, y0 + 1, xt * yt * w);
            add(x0, y0 + 1, (1.0 - xt) * yt * w);
        }

        blur(&mut values, n, m, self.radius * inv);
        values
    }

    /// Recomputes the whole surface; an empty sample set yields no contours.
    pub fn estimate(&self, samples: &[([f64; 2], f64)]) -> DensitySurface {
        if samples.is_empty() || self.thresholds == 0 || self.width == 0 || self.height == 0 {
            return DensitySurface::default();
        }

        let values = self.grid(samples);
        let area = self.cell() * self.cell();
        let max = values.iter().copied().fold(0.0, f64::max);

        let cell = self.cell();
        let pad = self.pad;
        let contours = nice_ticks(max / area, self.thresholds)
            .into_par_iter()
            .filter_map(|value| {
                let geometry = contour(&values, self.width, self.height, value * area);
                if geometry.0.is_empty() {
                    return None;
                }
                let geometry = geometry.map_coords(|c| Coord {
                    x: c.x * cell - pad,
                    y: c.y * cell - pad,
                });
                Some(Contour { value, geometry })
            })
            .collect();

        DensitySurface { contours }
    }
}

/// Evenly spaced thresholds in `(0, stop]` on a 1-2-5 step, never more than `count`.
pub fn nice_ticks(stop: f64, count: usize) -> Vec<f64> {
    if count == 0 || !(stop > 0.0) || !stop.is_finite() {
        return Vec::new();
    }

    let raw = stop / count as f64;
    let base = 10f64.powf(raw.log10().floor());
    let error = raw / base;
    let factor = if error <= 1.0 {
        1.0
    } else if error <= 2.0 {
        2.0
    } else if error <= 5.0 {
        5.0
    } else {
        10.0
    };
    let step = factor * base;
    let n = ((stop / step).floor() as usize).min(count);
    if n == 0 {
        return vec![stop];
    }

    (1..=n).map(|i| i as f64 * step).collect()
}

fn blur(values: &mut [f64], width: usize, height: usize, radius: f64) {
    if radius <= 0.0 || width == 0 || height == 0 {
        return;
    }

    blur_rows(values, width, radius);

    let mut columns = transpose(values, width, height);
    blur_rows(&mut columns, height, radius);
    values.copy_from_slice(&transpose(&columns, height, width));
}

fn blur_rows(values: &mut [f64], width: usize, radius: f64) {
    values.par_chunks_mut(width).for_each(|row| {
        let mut scratch = vec![0.0; row.len()];
        for _ in 0..BLUR_PASSES {
            blur_line(row, &mut scratch, radius);
            row.copy_from_slice(&scratch);
        }
    });
}

/// Fractional box blur with clamped edges: the window covers `radius` on each
/// side, the outermost samples weighted by the fractional part.
fn blur_line(src: &[f64], dst: &mut [f64], radius: f64) {
    let len = src.len() as isize;
    let r0 = radius.floor() as isize;
    let t = radius - r0 as f64;
    let w = 2.0 * radius + 1.0;
    let at = |i: isize| src[i.clamp(0, len - 1) as usize];

    let mut sum: f64 = (-r0..=r0).map(at).sum();
    for i in 0..len {
        dst[i as usize] = (sum + t * (at(i - r0 - 1) + at(i + r0 + 1))) / w;
        sum += at(i + r0 + 1) - at(i - r0);
    }
}

fn transpose(values: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    for y in 0..height {
        for x in 0..width {
            out[y + x * height] = values[x + y * width];
        }
    }
    out
}
