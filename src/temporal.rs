//! Synthetic time tags, the minute cursor and the visibility predicate.

use crate::types::{SampledPoint, LAST_MINUTE, MINUTES_PER_DAY};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use geo::Point;
use rand::Rng;

/// Source of "now" for the live cap on today's cursor.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that always reads the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn minute_of_day(at: NaiveDateTime) -> u16 {
    (at.hour() * 60 + at.minute()) as u16
}

/// Attaches a uniform minute of `day`, a reading and a sensor weight to a sampled coordinate.
pub fn tag<R: Rng>(
    region_name: &str,
    coordinates: Point<f64>,
    day: NaiveDate,
    rng: &mut R,
) -> SampledPoint {
    let minute = ((rng.gen::<f64>() * MINUTES_PER_DAY as f64).floor() as i64).min(LAST_MINUTE as i64);
    let value = rng.gen::<f64>() * 100.0;
    let sensor_value = rng.gen::<f64>() * 100.0;

    SampledPoint {
        region_name: region_name.to_string(),
        coordinates,
        value,
        timestamp: day.and_time(NaiveTime::MIN) + Duration::minutes(minute),
        sensor_value,
    }
}

pub fn visible(point: &SampledPoint, cursor: u16) -> bool {
    point.minute_of_day() <= cursor
}

/// Highest cursor allowed on `date`: the current minute for today, the end of day otherwise.
pub fn cursor_cap(date: NaiveDate, now: NaiveDateTime) -> u16 {
    if date == now.date() {
        minute_of_day(now)
    } else {
        LAST_MINUTE
    }
}

pub fn clamp_cursor(requested: i64, cap: u16) -> u16 {
    requested.clamp(0, cap.min(LAST_MINUTE) as i64) as u16
}

/// Owns the tagged points and the cursor that filters them.
pub struct TemporalIndex {
    points: Vec<SampledPoint>,
    date: NaiveDate,
    cursor: u16,
    enabled: bool,
    clock: Box<dyn Clock>,
}

impl TemporalIndex {
    pub fn new(points: Vec<SampledPoint>, date: NaiveDate, enabled: bool, clock: Box<dyn Clock>) -> Self {
        let mut index = Self {
            points,
            date,
            cursor: 0,
            enabled,
            clock,
        };
        index.select_date(date);
        index.cursor = index.cap();
        index
    }

    pub fn points(&self) -> &[SampledPoint] {
        &self.points
    }

    /// Swaps in a freshly generated point set; the cursor and date are kept.
    pub fn replace_points(&mut self, points: Vec<SampledPoint>) {
        self.points = points;
    }

    pub fn cursor(&self) -> u16 {
        self.cursor
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_filtering(&self) -> bool {
        self.enabled
    }

    pub fn cap(&self) -> u16 {
        cursor_cap(self.date, self.clock.now())
    }

    /// Moves the cursor to `minute`, clamped into the range allowed today.
    pub fn scrub(&mut self, minute: i64) -> u16 {
        self.cursor = clamp_cursor(minute, self.cap());
        self.cursor
    }

    /// Switches the active date. Dates after today fall back to today; the
    /// cursor is re-clamped under the new cap.
    pub fn select_date(&mut self, date: NaiveDate) -> NaiveDate {
        let today = self.clock.now().date();
        self.date = date.min(today);
        self.cursor = clamp_cursor(self.cursor as i64, self.cap());
        self.date
    }

    pub fn is_visible(&self, point: &SampledPoint) -> bool {
        !self.enabled || visible(point, self.cursor)
    }

    pub fn visibility(&self) -> Vec<bool> {
        self.points.iter().map(|p| self.is_visible(p)).collect()
    }

    pub fn visible_points(&self) -> impl Iterator<Item = &SampledPoint> + '_ {
        self.points.iter().filter(move |p| self.is_visible(p))
    }
}
