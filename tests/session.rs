use borough_heat::config::AppConfig;
use borough_heat::density::DensitySurface;
use borough_heat::playback::{PlaybackState, Tick};
use borough_heat::projection::Mercator;
use borough_heat::session::{Event, Frame, FrameSlot, Outcome, Session};
use borough_heat::temporal::FixedClock;
use borough_heat::types::{SampledPoint, LAST_MINUTE};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use geo::Point;
use pretty_assertions::assert_eq;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn past() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn now() -> NaiveDateTime {
    today().and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
}

/// A small canvas and a coarse grid keep every recompute cheap.
fn config(day: Option<NaiveDate>) -> AppConfig {
    let mut config = AppConfig::default();
    config.temporal.day = day;
    config.projection.width = 320.0;
    config.projection.height = 200.0;
    config.projection.scale = 60_000.0;
    config.density.bandwidth = 20.0;
    config.density.cell_size = 4.0;
    config
}

fn point(day: NaiveDate, minute: i64, lon: f64, lat: f64, sensor_value: f64) -> SampledPoint {
    SampledPoint {
        region_name: "Queens".to_string(),
        coordinates: Point::new(lon, lat),
        value: 50.0,
        timestamp: day.and_time(NaiveTime::MIN) + Duration::minutes(minute),
        sensor_value,
    }
}

/// 120 points on a 12 x 10 lattice around the map centre, stamped 5, 17, 29 ... 1433.
fn lattice(day: NaiveDate) -> Vec<SampledPoint> {
    (0..120)
        .map(|i| {
            let lon = -73.98 + ((i % 12) as f64 - 5.5) * 0.01;
            let lat = 40.75 + ((i / 12) as f64 - 4.5) * 0.008;
            point(day, 5 + 12 * i, lon, lat, 1.0 + (i % 5) as f64)
        })
        .collect()
}

fn session(day: Option<NaiveDate>, points: Vec<SampledPoint>) -> Session {
    let config = config(day);
    let projection = Mercator::from_config(&config.projection);
    Session::new(config, points, Box::new(projection), Box::new(FixedClock(now())))
}

fn expect_frame(outcome: Outcome) -> Frame {
    match outcome {
        Outcome::Frame(frame) => frame,
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn noon_on_a_past_day_shows_the_morning() {
    let points = lattice(past());
    let mut session = session(Some(past()), points.clone());

    let frame = expect_frame(session.handle(Event::Scrub(720)));

    assert_eq!(frame.cursor, 720);
    assert_eq!(frame.date, past());
    let expected: Vec<bool> = points.iter().map(|p| p.minute_of_day() <= 720).collect();
    assert_eq!(frame.visible, expected);
    assert_eq!(frame.visible_count, 60);
    assert!(!frame.surface.is_empty());
    assert!(frame.surface.len() <= 25);
}

#[test]
fn end_of_day_shows_everything() {
    let mut session = session(Some(past()), lattice(past()));

    let frame = expect_frame(session.handle(Event::Scrub(5000)));

    assert_eq!(frame.cursor, LAST_MINUTE);
    assert_eq!(frame.visible_count, 120);
    assert!(frame.visible.iter().all(|v| *v));
}

#[test]
fn nothing_visible_means_no_contours() {
    let mut session = session(Some(past()), lattice(past()));

    let frame = expect_frame(session.handle(Event::Scrub(-30)));

    assert_eq!(frame.cursor, 0);
    assert_eq!(frame.visible_count, 0);
    assert!(frame.surface.is_empty());
}

#[test]
fn today_starts_at_the_live_minute_and_refuses_the_future() {
    let mut session = session(None, lattice(today()));
    assert_eq!(session.date(), today());
    assert_eq!(session.cursor(), 570);

    let frame = expect_frame(session.handle(Event::Scrub(1000)));
    assert_eq!(frame.cursor, 570);

    let frame = expect_frame(session.handle(Event::SelectDate(today().succ_opt().unwrap())));
    assert_eq!(frame.date, today());

    let frame = expect_frame(session.handle(Event::SelectDate(past())));
    assert_eq!(frame.date, past());
    assert_eq!(frame.cursor, 570);
}

#[test]
fn hover_only_reports_visible_points() {
    let points = vec![
        point(past(), 100, -74.00, 40.75, 1.0),
        point(past(), 1000, -73.95, 40.75, 1.0),
    ];
    let mut session = session(Some(past()), points);
    session.handle(Event::Scrub(500));
    let [shown, hidden] = [session.placed()[0], session.placed()[1]];

    match session.handle(Event::Hover {
        x: shown[0],
        y: shown[1],
    }) {
        Outcome::Hover(Some(info)) => {
            assert_eq!(info.index, 0);
            assert_eq!(info.region_name, "Queens");
            assert_eq!(info.position, shown);
        }
        other => panic!("expected hover info, got {other:?}"),
    }

    assert!(matches!(
        session.handle(Event::Hover {
            x: hidden[0],
            y: hidden[1]
        }),
        Outcome::Hover(None)
    ));
}

#[test]
fn stale_ticks_are_ignored() {
    let mut session = session(Some(past()), lattice(past()));
    session.handle(Event::Scrub(300));

    // stopped: nothing is accepted
    assert!(matches!(
        session.handle(Event::Tick(Tick { generation: 0 })),
        Outcome::Ignored
    ));

    let frame = expect_frame(session.handle(Event::TogglePlayback));
    assert_eq!(frame.playback, PlaybackState::Playing);
    assert_eq!(frame.cursor, 0);

    // scrubbing stops playback, so the run's ticks no longer count
    let frame = expect_frame(session.handle(Event::Scrub(300)));
    assert_eq!(frame.playback, PlaybackState::Stopped);
    for generation in 0..4 {
        assert!(matches!(
            session.handle(Event::Tick(Tick { generation })),
            Outcome::Ignored
        ));
    }
    assert_eq!(session.cursor(), 300);
}

#[test]
fn frame_revisions_only_move_forward() {
    let mut session = session(Some(past()), lattice(past()));
    assert!(session.frame().is_none());

    let first = expect_frame(session.handle(Event::Scrub(100)));
    let second = expect_frame(session.handle(Event::Scrub(200)));
    assert!(second.revision > first.revision);
    assert_eq!(session.frame().map(|f| f.cursor), Some(200));

    let mut slot = FrameSlot::default();
    assert!(slot.publish(second.clone()));
    assert!(!slot.publish(first));
    assert!(!slot.publish(Frame {
        surface: DensitySurface::default(),
        ..second.clone()
    }));
    assert_eq!(slot.latest().map(|f| f.revision), Some(second.revision));
}

#[test]
fn reload_replaces_points_and_stops_playback() {
    let mut session = session(Some(past()), lattice(past()));
    session.handle(Event::TogglePlayback);
    assert_eq!(session.playback(), PlaybackState::Playing);

    let frame = session.reload(lattice(past()).into_iter().take(10).collect());

    assert_eq!(session.playback(), PlaybackState::Stopped);
    assert_eq!(session.points().len(), 10);
    assert_eq!(session.placed().len(), 10);
    assert_eq!(frame.visible.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn autoplay_runs_a_past_day_to_its_last_minute() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = session(Some(past()), lattice(past())).with_autoplay(tx);

    let frame = expect_frame(session.handle(Event::TogglePlayback));
    assert_eq!(frame.cursor, 0);

    let mut cursors = Vec::new();
    while let Some(event) = rx.recv().await {
        let frame = expect_frame(session.handle(event));
        cursors.push(frame.cursor);
        if frame.playback == PlaybackState::Stopped {
            break;
        }
    }

    assert_eq!(cursors.len(), 144);
    assert_eq!(cursors.first(), Some(&10));
    assert_eq!(cursors.last(), Some(&LAST_MINUTE));
    assert!(cursors.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(session.playback(), PlaybackState::Stopped);

    // the timer was cancelled with the run
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
}
