//! Force-directed nudging of projected points so overlapping markers separate
//! while staying near their true position.

use crate::config::DeclutterConfig;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::f64::consts::TAU;

const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.4;
const DISTANCE_MIN2: f64 = 1.0;
const JIGGLE: f64 = 1e-6;

type Node = GeomWithData<[f64; 2], usize>;

struct Simulation<'a> {
    anchors: &'a [[f64; 2]],
    config: &'a DeclutterConfig,
    positions: Vec<[f64; 2]>,
    velocities: Vec<[f64; 2]>,
    alpha: f64,
    alpha_decay: f64,
}

/// Fixed, index-derived offset used when two nodes coincide exactly.
fn jiggle(i: usize, j: usize) -> [f64; 2] {
    let angle = (i as f64 * 0.618_033_988_75 + j as f64 * 0.381_966_011_25).fract() * TAU;
    [JIGGLE * angle.cos(), JIGGLE * angle.sin()]
}

impl Simulation<'_> {
    fn tick(&mut self) {
        self.alpha += -self.alpha * self.alpha_decay;
        self.anchor();
        self.collide();
        self.charge();

        let keep = 1.0 - VELOCITY_DECAY;
        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            v[0] *= keep;
            v[1] *= keep;
            p[0] += v[0];
            p[1] += v[1];
        }
    }

    fn anchor(&mut self) {
        let k = self.config.anchor_strength * self.alpha;
        for ((p, v), a) in self
            .positions
            .iter()
            .zip(self.velocities.iter_mut())
            .zip(self.anchors)
        {
            v[0] += (a[0] - p[0]) * k;
            v[1] += (a[1] - p[1]) * k;
        }
    }

    fn collide(&mut self) {
        let radius = self.config.collide_radius;
        if radius <= 0.0 {
            return;
        }
        let reach = 2.0 * radius;

        let predicted: Vec<[f64; 2]> = self
            .positions
            .iter()
            .zip(&self.velocities)
            .map(|(p, v)| [p[0] + v[0], p[1] + v[1]])
            .collect();
        let tree = RTree::bulk_load(
            predicted
                .iter()
                .enumerate()
                .map(|(i, p)| Node::new(*p, i))
                .collect(),
        );

        for i in 0..predicted.len() {
            let [xi, yi] = predicted[i];
            for other in tree.locate_within_distance([xi, yi], reach * reach) {
                let j = other.data;
                if j <= i {
                    continue;
                }
                let [xj, yj] = predicted[j];
                let (mut dx, mut dy) = (xi - xj, yi - yj);
                if dx == 0.0 && dy == 0.0 {
                    [dx, dy] = jiggle(i, j);
                }
                let l = (dx * dx + dy * dy).sqrt();
                if l >= reach {
                    continue;
                }
                // equal radii: each node takes half of the correction
                let push = (reach - l) / l * self.config.collide_strength * 0.5;
                self.velocities[i][0] += dx * push;
                self.velocities[i][1] += dy * push;
                self.velocities[j][0] -= dx * push;
                self.velocities[j][1] -= dy * push;
            }
        }
    }

    /// Pairwise many-body force; positive strength attracts.
    fn charge(&mut self) {
        let k = self.config.charge_strength * self.alpha;
        if k == 0.0 {
            return;
        }

        let positions = &self.positions;
        let deltas: Vec<[f64; 2]> = (0..positions.len())
            .into_par_iter()
            .map(|i| {
                let [xi, yi] = positions[i];
                let mut dv = [0.0, 0.0];
                for (j, &[xj, yj]) in positions.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let (mut dx, mut dy) = (xj - xi, yj - yi);
                    if dx == 0.0 && dy == 0.0 {
                        [dx, dy] = jiggle(i, j);
                    }
                    let mut l = dx * dx + dy * dy;
                    if l < DISTANCE_MIN2 {
                        l = (DISTANCE_MIN2 * l).sqrt();
                    }
                    dv[0] += dx * k / l;
                    dv[1] += dy * k / l;
                }
                dv
            })
            .collect();

        for (v, dv) in self.velocities.iter_mut().zip(deltas) {
            v[0] += dv[0];
            v[1] += dv[1];
        }
    }
}

/// Runs the layout from the anchor positions and returns one pixel position per anchor.
pub fn declutter(anchors: &[[f64; 2]], config: &DeclutterConfig) -> Vec<[f64; 2]> {
    let mut sim = Simulation {
        anchors,
        config,
        positions: anchors.to_vec(),
        velocities: vec![[0.0, 0.0]; anchors.len()],
        alpha: 1.0,
        alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
    };

    for _ in 0..config.iterations {
        sim.tick();
    }

    tracing::debug!("Decluttered {} points over {} ticks", anchors.len(), config.iterations);
    sim.positions
}
