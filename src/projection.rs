use crate::config::ProjectionConfig;
use geo::Point;
use std::f64::consts::FRAC_PI_4;

/// Maps geographic coordinates to screen pixels.
pub trait Projection {
    fn project(&self, lon: f64, lat: f64) -> [f64; 2];

    fn project_point(&self, point: &Point<f64>) -> [f64; 2] {
        self.project(point.x(), point.y())
    }
}

/// Spherical Web Mercator centred on a fixed coordinate, with `scale` pixels per radian.
#[derive(Debug, Clone)]
pub struct Mercator {
    scale: f64,
    translate: [f64; 2],
    origin: [f64; 2],
}

impl Mercator {
    pub fn new(center: [f64; 2], scale: f64, translate: [f64; 2]) -> Self {
        Self {
            scale,
            translate,
            origin: raw(center[0], center[1]),
        }
    }

    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self::new(
            config.center,
            config.scale,
            [config.width / 2.0, config.height / 2.0],
        )
    }
}

fn raw(lon: f64, lat: f64) -> [f64; 2] {
    let lambda = lon.to_radians();
    let phi = lat.to_radians();
    [lambda, (FRAC_PI_4 + phi / 2.0).tan().ln()]
}

impl Projection for Mercator {
    fn project(&self, lon: f64, lat: f64) -> [f64; 2] {
        let [x, y] = raw(lon, lat);
        [
            self.translate[0] + self.scale * (x - self.origin[0]),
            self.translate[1] - self.scale * (y - self.origin[1]),
        ]
    }
}
