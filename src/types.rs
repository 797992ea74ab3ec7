use chrono::{NaiveDateTime, Timelike};
use geo::{MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 1440;
pub const LAST_MINUTE: u16 = MINUTES_PER_DAY - 1;

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub bounds: Rect<f64>,
}

/// How candidate coordinates are spread over a region's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasRule {
    #[default]
    Default,
    SouthWeighted,
    NorthWeighted,
    WestNorthWeighted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampledPoint {
    pub region_name: String,
    #[serde(serialize_with = "serialize_point")]
    pub coordinates: Point<f64>,
    pub value: f64,
    pub timestamp: NaiveDateTime,
    pub sensor_value: f64,
}

impl SampledPoint {
    pub fn minute_of_day(&self) -> u16 {
        (self.timestamp.hour() * 60 + self.timestamp.minute()) as u16
    }
}

fn serialize_point<S: serde::Serializer>(point: &Point<f64>, s: S) -> Result<S::Ok, S::Error> {
    [point.x(), point.y()].serialize(s)
}
