use crate::types::SampledPoint;
use chrono::NaiveDateTime;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;

type Marker = GeomWithData<[f64; 2], usize>;

/// What the tooltip collaborator shows for a hovered point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverInfo {
    pub index: usize,
    pub region_name: String,
    pub value: f64,
    pub sensor_value: f64,
    pub timestamp: NaiveDateTime,
    pub position: [f64; 2],
}

pub struct HoverIndex {
    tree: RTree<Marker>,
    positions: Vec<[f64; 2]>,
}

impl HoverIndex {
    pub fn build(positions: &[[f64; 2]]) -> Self {
        let markers = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Marker::new(*p, i))
            .collect();
        Self {
            tree: RTree::bulk_load(markers),
            positions: positions.to_vec(),
        }
    }

    /// Nearest marker within `radius` pixels of `(x, y)` whose point is visible.
    pub fn pick(&self, x: f64, y: f64, radius: f64, visible: &[bool]) -> Option<usize> {
        let r2 = radius * radius;
        self.tree
            .nearest_neighbor_iter_with_distance_2(&[x, y])
            .take_while(|(_, d2)| *d2 <= r2)
            .map(|(marker, _)| marker.data)
            .find(|&i| visible.get(i).copied().unwrap_or(false))
    }

    pub fn describe(&self, index: usize, points: &[SampledPoint]) -> Option<HoverInfo> {
        let point = points.get(index)?;
        let position = *self.positions.get(index)?;

        Some(HoverInfo {
            index,
            region_name: point.region_name.clone(),
            value: point.value,
            sensor_value: point.sensor_value,
            timestamp: point.timestamp,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_nearest_visible_within_radius() {
        let index = HoverIndex::build(&[[0.0, 0.0], [5.0, 0.0], [40.0, 40.0]]);
        let all = [true, true, true];

        assert_eq!(index.pick(1.0, 0.0, 12.0, &all), Some(0));
        assert_eq!(index.pick(4.0, 0.0, 12.0, &all), Some(1));
        assert_eq!(index.pick(20.0, 20.0, 12.0, &all), None);

        // hidden points are skipped in favour of the next one in range
        assert_eq!(index.pick(1.0, 0.0, 12.0, &[false, true, true]), Some(1));
        assert_eq!(index.pick(1.0, 0.0, 3.0, &[false, true, true]), None);
    }
}
