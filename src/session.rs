//! The single owner of all mutable demo state. Every stimulus, whether user
//! input or an autoplay tick, goes through [`Session::handle`] one at a time.

use crate::config::AppConfig;
use crate::declutter::declutter;
use crate::density::{DensityEstimator, DensitySurface};
use crate::hover::{HoverIndex, HoverInfo};
use crate::playback::{Autoplay, Playback, PlaybackState, Tick};
use crate::projection::Projection;
use crate::temporal::{Clock, TemporalIndex};
use crate::types::SampledPoint;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    SelectDate(NaiveDate),
    Scrub(i64),
    TogglePlayback,
    Tick(Tick),
    Hover { x: f64, y: f64 },
}

impl From<Tick> for Event {
    fn from(tick: Tick) -> Self {
        Event::Tick(tick)
    }
}

/// Everything a renderer needs for one cursor position.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub revision: u64,
    pub date: NaiveDate,
    pub cursor: u16,
    pub playback: PlaybackState,
    pub visible_count: usize,
    pub visible: Vec<bool>,
    pub surface: DensitySurface,
}

#[derive(Debug)]
pub enum Outcome {
    Frame(Frame),
    Hover(Option<HoverInfo>),
    Ignored,
}

/// Keeps only the newest frame. A frame older than the one already held is
/// discarded.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Option<Frame>,
}

impl FrameSlot {
    pub fn publish(&mut self, frame: Frame) -> bool {
        if let Some(current) = &self.latest {
            if frame.revision <= current.revision {
                tracing::debug!(
                    "Dropping stale frame {} (holding {})",
                    frame.revision,
                    current.revision
                );
                return false;
            }
        }
        self.latest = Some(frame);
        true
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }
}

pub struct Session {
    config: AppConfig,
    projection: Box<dyn Projection>,
    estimator: DensityEstimator,
    index: TemporalIndex,
    playback: Playback,
    autoplay: Option<Autoplay<Event>>,
    anchors: Vec<[f64; 2]>,
    placed: Vec<[f64; 2]>,
    hover: HoverIndex,
    revision: u64,
    frames: FrameSlot,
}

impl Session {
    pub fn new(
        config: AppConfig,
        points: Vec<SampledPoint>,
        projection: Box<dyn Projection>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let date = config.temporal.day.unwrap_or_else(|| clock.now().date());
        let estimator = DensityEstimator::new(
            &config.density,
            [config.projection.width, config.projection.height],
        );
        let playback = Playback::new(config.playback.step_minutes);

        let mut session = Self {
            index: TemporalIndex::new(Vec::new(), date, config.temporal.enabled, clock),
            config,
            projection,
            estimator,
            playback,
            autoplay: None,
            anchors: Vec::new(),
            placed: Vec::new(),
            hover: HoverIndex::build(&[]),
            revision: 0,
            frames: FrameSlot::default(),
        };
        session.load_points(points);
        session
    }

    /// Lets the session drive its own autoplay timer, delivering ticks to `events`.
    pub fn with_autoplay(mut self, events: UnboundedSender<Event>) -> Self {
        let period = Duration::from_millis(self.config.playback.tick_interval_ms.max(1));
        self.autoplay = Some(Autoplay::new(period, events));
        self
    }

    fn load_points(&mut self, points: Vec<SampledPoint>) {
        self.anchors = points
            .iter()
            .map(|p| self.projection.project_point(&p.coordinates))
            .collect();
        self.placed = declutter(&self.anchors, &self.config.declutter);
        self.hover = HoverIndex::build(&self.placed);
        self.index.replace_points(points);
    }

    /// Replaces the whole point set, e.g. after boundaries reload, and recomputes.
    pub fn reload(&mut self, points: Vec<SampledPoint>) -> Frame {
        self.stop_playback();
        self.load_points(points);
        self.recompute()
    }

    pub fn points(&self) -> &[SampledPoint] {
        self.index.points()
    }

    /// Decluttered marker positions, one per point.
    pub fn placed(&self) -> &[[f64; 2]] {
        &self.placed
    }

    pub fn cursor(&self) -> u16 {
        self.index.cursor()
    }

    pub fn date(&self) -> NaiveDate {
        self.index.date()
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frames.latest()
    }

    pub fn handle(&mut self, event: Event) -> Outcome {
        match event {
            Event::SelectDate(date) => {
                self.stop_playback();
                let chosen = self.index.select_date(date);
                tracing::info!("Date set to {}", chosen);
                Outcome::Frame(self.recompute())
            }
            Event::Scrub(minute) => {
                self.stop_playback();
                self.index.scrub(minute);
                Outcome::Frame(self.recompute())
            }
            Event::TogglePlayback => {
                match self.playback.toggle(&mut self.index) {
                    PlaybackState::Playing => {
                        let generation = self.playback.generation();
                        if let Some(autoplay) = self.autoplay.as_mut() {
                            autoplay.start(generation);
                        }
                    }
                    PlaybackState::Stopped => self.stop_timer(),
                }
                Outcome::Frame(self.recompute())
            }
            Event::Tick(tick) => match self.playback.advance(tick, &mut self.index) {
                Some(_) => {
                    if self.playback.state() == PlaybackState::Stopped {
                        self.stop_timer();
                    }
                    Outcome::Frame(self.recompute())
                }
                None => Outcome::Ignored,
            },
            Event::Hover { x, y } => {
                let visible = self.index.visibility();
                let info = self
                    .hover
                    .pick(x, y, self.config.hover.radius, &visible)
                    .and_then(|i| self.hover.describe(i, self.index.points()));
                Outcome::Hover(info)
            }
        }
    }

    fn stop_playback(&mut self) {
        self.playback.stop();
        self.stop_timer();
    }

    fn stop_timer(&mut self) {
        if let Some(autoplay) = self.autoplay.as_mut() {
            autoplay.stop();
        }
    }

    /// Filters by the current cursor and rebuilds the density surface from scratch.
    pub fn recompute(&mut self) -> Frame {
        self.revision += 1;

        let visible = self.index.visibility();
        let samples: Vec<([f64; 2], f64)> = self
            .index
            .points()
            .iter()
            .zip(&self.anchors)
            .zip(&visible)
            .filter(|(_, shown)| **shown)
            .map(|((point, anchor), _)| (*anchor, point.sensor_value))
            .collect();

        let surface = self.estimator.estimate(&samples);
        tracing::debug!(
            "Frame {}: cursor {} shows {} points, {} contours",
            self.revision,
            self.index.cursor(),
            samples.len(),
            surface.len()
        );

        let frame = Frame {
            revision: self.revision,
            date: self.index.date(),
            cursor: self.index.cursor(),
            playback: self.playback.state(),
            visible_count: samples.len(),
            visible,
            surface,
        };
        self.frames.publish(frame.clone());
        frame
    }
}
