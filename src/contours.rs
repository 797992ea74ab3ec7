//! Marching squares over a row-major grid of non-negative values.
//!
//! Value `(x, y)` sits at grid coordinate `(x + 0.5, y + 0.5)`. Everything
//! outside the grid counts as zero, so every ring closes.

use geo::{Area, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use std::collections::HashMap;

/// Crossing points never land exactly on a lattice point, so distinct rings never touch.
const EDGE_MARGIN: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeKey {
    x: isize,
    y: isize,
    horizontal: bool,
}

struct Lattice<'a> {
    values: &'a [f64],
    width: usize,
    height: usize,
    threshold: f64,
}

impl Lattice<'_> {
    fn value(&self, x: isize, y: isize) -> f64 {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            0.0
        } else {
            self.values[x as usize + y as usize * self.width]
        }
    }

    fn above(&self, x: isize, y: isize) -> bool {
        self.value(x, y) >= self.threshold
    }

    fn crossing(&self, edge: EdgeKey) -> Coord<f64> {
        let (bx, by) = if edge.horizontal {
            (edge.x + 1, edge.y)
        } else {
            (edge.x, edge.y + 1)
        };
        let va = self.value(edge.x, edge.y);
        let vb = self.value(bx, by);
        let t = if vb == va {
            0.5
        } else {
            ((self.threshold - va) / (vb - va)).clamp(EDGE_MARGIN, 1.0 - EDGE_MARGIN)
        };

        let x = edge.x as f64 + 0.5;
        let y = edge.y as f64 + 0.5;
        if edge.horizontal {
            Coord { x: x + t, y }
        } else {
            Coord { x, y: y + t }
        }
    }

    fn segments(&self) -> Vec<(EdgeKey, EdgeKey)> {
        let mut segments = Vec::new();
        let edge = |x, y, horizontal| EdgeKey { x, y, horizontal };

        for y in -1..self.height as isize {
            for x in -1..self.width as isize {
                let case = (self.above(x, y) as u8) << 3
                    | (self.above(x + 1, y) as u8) << 2
                    | (self.above(x + 1, y + 1) as u8) << 1
                    | self.above(x, y + 1) as u8;

                let top = edge(x, y, true);
                let bottom = edge(x, y + 1, true);
                let left = edge(x, y, false);
                let right = edge(x + 1, y, false);

                match case {
                    0 | 15 => {}
                    1 | 14 => segments.push((left, bottom)),
                    2 | 13 => segments.push((bottom, right)),
                    3 | 12 => segments.push((left, right)),
                    4 | 11 => segments.push((top, right)),
                    6 | 9 => segments.push((top, bottom)),
                    7 | 8 => segments.push((top, left)),
                    // saddles: keep the two above corners apart
                    5 => {
                        segments.push((top, right));
                        segments.push((left, bottom));
                    }
                    10 => {
                        segments.push((top, left));
                        segments.push((bottom, right));
                    }
                    _ => unreachable!(),
                }
            }
        }

        segments
    }
}

fn stitch(segments: &[(EdgeKey, EdgeKey)]) -> Vec<Vec<EdgeKey>> {
    let mut incident: HashMap<EdgeKey, Vec<usize>> = HashMap::with_capacity(segments.len() * 2);
    for (i, (a, b)) in segments.iter().enumerate() {
        incident.entry(*a).or_default().push(i);
        incident.entry(*b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut rings = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let (first, mut current) = segments[start];
        let mut ring = vec![first, current];

        while current != first {
            let next = incident
                .get(&current)
                .and_then(|candidates| candidates.iter().copied().find(|&s| !used[s]));
            let Some(next) = next else { break };
            used[next] = true;

            let (a, b) = segments[next];
            current = if a == current { b } else { a };
            ring.push(current);
        }

        if ring.len() >= 4 && current == first {
            rings.push(ring);
        }
    }

    rings
}

/// Region where `values >= threshold`, in grid coordinates.
pub fn contour(values: &[f64], width: usize, height: usize, threshold: f64) -> MultiPolygon<f64> {
    if threshold <= 0.0 || values.len() != width * height {
        return MultiPolygon::new(vec![]);
    }

    let lattice = Lattice {
        values,
        width,
        height,
        threshold,
    };

    let rings: Vec<LineString<f64>> = stitch(&lattice.segments())
        .into_iter()
        .map(|keys| keys.into_iter().map(|k| lattice.crossing(k)).collect())
        .collect();

    assemble(rings)
}

/// Rings nested an even number of times are shells; the others are holes of
/// their innermost container.
fn assemble(rings: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    let outlines: Vec<Polygon<f64>> = rings
        .iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();
    let areas: Vec<f64> = outlines.iter().map(|p| p.unsigned_area()).collect();

    let parents: Vec<(usize, Option<usize>)> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let probe = Point::from(ring.0[0]);
            let containers: Vec<usize> = (0..outlines.len())
                .filter(|&j| j != i && outlines[j].contains(&probe))
                .collect();
            let innermost = containers
                .iter()
                .copied()
                .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
            (containers.len(), innermost)
        })
        .collect();

    let mut shells: Vec<(usize, Polygon<f64>)> = Vec::new();
    let mut holes: Vec<(usize, LineString<f64>)> = Vec::new();

    for (i, ring) in rings.into_iter().enumerate() {
        match parents[i] {
            (depth, Some(parent)) if depth % 2 == 1 => holes.push((parent, ring)),
            _ => shells.push((i, Polygon::new(ring, vec![]))),
        }
    }

    for (parent, hole) in holes {
        if let Some((_, shell)) = shells.iter_mut().find(|(i, _)| *i == parent) {
            shell.interiors_push(hole);
        }
    }

    MultiPolygon::new(shells.into_iter().map(|(_, p)| p).collect())
}
