//! Autoplay for the time cursor: a pure two-state machine plus the single
//! repeating timer that feeds it ticks.

use crate::temporal::TemporalIndex;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// A timer tick stamped with the run that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

#[derive(Debug)]
pub struct Playback {
    state: PlaybackState,
    step: u16,
    generation: u64,
}

impl Playback {
    pub fn new(step_minutes: u16) -> Self {
        Self {
            state: PlaybackState::Stopped,
            step: step_minutes.max(1),
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rewinds the cursor to midnight and starts a new run. Any tick from an
    /// earlier run is stale from here on.
    pub fn start(&mut self, index: &mut TemporalIndex) -> u64 {
        self.generation += 1;
        index.scrub(0);
        self.state = PlaybackState::Playing;
        self.generation
    }

    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            self.generation += 1;
        }
        self.state = PlaybackState::Stopped;
    }

    pub fn toggle(&mut self, index: &mut TemporalIndex) -> PlaybackState {
        match self.state {
            PlaybackState::Stopped => {
                self.start(index);
            }
            PlaybackState::Playing => self.stop(),
        }
        self.state
    }

    pub fn accepts(&self, tick: Tick) -> bool {
        self.state == PlaybackState::Playing && tick.generation == self.generation
    }

    /// Advances the cursor one step for a current tick. Reaching the cap
    /// stops playback with the cursor sitting exactly on the cap.
    pub fn advance(&mut self, tick: Tick, index: &mut TemporalIndex) -> Option<u16> {
        if !self.accepts(tick) {
            return None;
        }

        let cap = index.cap();
        let cursor = index.scrub(index.cursor() as i64 + self.step as i64);
        if cursor >= cap {
            tracing::debug!("Playback reached cap {}", cap);
            self.stop();
        }
        Some(cursor)
    }
}

/// Single-slot repeating timer. Starting replaces whatever run was active.
pub struct Autoplay<E> {
    period: Duration,
    events: UnboundedSender<E>,
    task: Option<JoinHandle<()>>,
}

impl<E> Autoplay<E>
where
    E: From<Tick> + Send + 'static,
{
    pub fn new(period: Duration, events: UnboundedSender<E>) -> Self {
        Self {
            period,
            events,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn start(&mut self, generation: u64) {
        self.stop();

        let period = self.period;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if events.send(E::from(Tick { generation })).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<E> Drop for Autoplay<E> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::FixedClock;
    use crate::types::LAST_MINUTE;
    use chrono::{NaiveDate, NaiveTime};

    fn index_for(date: NaiveDate, now: (u32, u32)) -> TemporalIndex {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let clock = FixedClock(today.and_time(NaiveTime::from_hms_opt(now.0, now.1, 0).unwrap()));
        TemporalIndex::new(vec![], date, true, Box::new(clock))
    }

    #[test]
    fn toggle_resets_cursor_and_plays() {
        let mut index = index_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), (12, 0));
        index.scrub(900);
        let mut playback = Playback::new(10);

        assert_eq!(playback.toggle(&mut index), PlaybackState::Playing);
        assert_eq!(index.cursor(), 0);
        assert_eq!(playback.toggle(&mut index), PlaybackState::Stopped);
    }

    #[test]
    fn past_date_plays_to_end_of_day_without_overshoot() {
        let mut index = index_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), (12, 0));
        let mut playback = Playback::new(10);
        let generation = playback.start(&mut index);
        let tick = Tick { generation };

        let mut previous = index.cursor();
        let mut ticks = 0;
        while playback.state() == PlaybackState::Playing {
            let cursor = playback.advance(tick, &mut index).unwrap();
            assert!(cursor > previous);
            if cursor < LAST_MINUTE {
                assert_eq!(cursor, previous + 10);
            }
            previous = cursor;
            ticks += 1;
        }

        assert_eq!(index.cursor(), LAST_MINUTE);
        assert_eq!(ticks, 144);
        assert_eq!(playback.advance(tick, &mut index), None);
    }

    #[test]
    fn today_stops_at_the_live_cap() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let mut index = index_for(today, (1, 5));
        let mut playback = Playback::new(30);
        let tick = Tick {
            generation: playback.start(&mut index),
        };

        assert_eq!(playback.advance(tick, &mut index), Some(30));
        assert_eq!(playback.advance(tick, &mut index), Some(60));
        assert_eq!(playback.advance(tick, &mut index), Some(65));
        assert_eq!(playback.state(), PlaybackState::Stopped);
    }

    #[test]
    fn ticks_from_an_earlier_run_are_ignored() {
        let mut index = index_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), (12, 0));
        let mut playback = Playback::new(10);
        let first = Tick {
            generation: playback.start(&mut index),
        };
        playback.stop();
        assert_eq!(playback.advance(first, &mut index), None);

        let second = Tick {
            generation: playback.start(&mut index),
        };
        assert!(!playback.accepts(first));
        assert_eq!(playback.advance(second, &mut index), Some(10));
    }

    #[derive(Debug, PartialEq)]
    struct Ev(Tick);

    impl From<Tick> for Ev {
        fn from(tick: Tick) -> Self {
            Ev(tick)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_running_timer() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut autoplay: Autoplay<Ev> = Autoplay::new(Duration::from_millis(100), tx);

        autoplay.start(1);
        autoplay.start(2);
        tokio::time::sleep(Duration::from_millis(350)).await;

        let mut seen = Vec::new();
        while let Ok(Ev(tick)) = rx.try_recv() {
            seen.push(tick.generation);
        }
        assert_eq!(seen, vec![2, 2, 2]);

        autoplay.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
        assert!(!autoplay.is_running());
    }
}
