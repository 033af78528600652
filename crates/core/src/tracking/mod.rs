//! Live tracking of one trip.
//!
//! A [`TrackingSession`] resolves the trip's road path once, then recomputes
//! the simulated bus position on a fixed period and publishes every result
//! through a `watch` channel. Recomputation stops at arrival, on
//! [`TrackingSession::stop`], or when the session is dropped.

mod map;

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::NaiveDateTime;
use fleetguard_transit::{
    Geocoder, PositionSnapshot, RouteService, TransitError, Trip, TripEstimator, TripProgress,
    TripSchedule, TripTracker,
};
use geo::Point;
use tokio::sync::watch;

use crate::config::TrackingConfig;
use crate::error::{CoreError, Result};
use crate::task::PeriodicTask;

pub use map::MapFocus;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// What to track, as received from a trip listing or a deep link. Any of the
/// schedule fields may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingRequest {
    pub origin: String,
    pub destination: String,
    pub date: Option<String>,
    pub departure_clock: Option<String>,
    pub arrival_clock: Option<String>,
}

impl TrackingRequest {
    pub fn schedule(&self) -> Result<TripSchedule> {
        let missing = |field: &str| {
            CoreError::Transit(TransitError::InvalidSchedule(format!("missing {field}")))
        };

        if self.origin.trim().is_empty() {
            return Err(missing("origin"));
        }
        if self.destination.trim().is_empty() {
            return Err(missing("destination"));
        }
        let date = self.date.as_deref().ok_or_else(|| missing("date"))?;
        let departure = self
            .departure_clock
            .as_deref()
            .ok_or_else(|| missing("departure time"))?;
        let arrival = self
            .arrival_clock
            .as_deref()
            .ok_or_else(|| missing("arrival time"))?;

        Ok(TripSchedule::from_service_day(
            self.origin.trim(),
            self.destination.trim(),
            date,
            departure,
            arrival,
        )?)
    }
}

impl From<&Trip> for TrackingRequest {
    fn from(trip: &Trip) -> Self {
        Self {
            origin: trip.origin.to_string(),
            destination: trip.destination.to_string(),
            date: Some(trip.date.format("%Y-%m-%d").to_string()),
            departure_clock: Some(trip.departure_clock.format("%H:%M:%S").to_string()),
            arrival_clock: Some(trip.arrival_clock.format("%H:%M:%S").to_string()),
        }
    }
}

/// Position report published to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingSnapshot {
    pub taken_at: NaiveDateTime,
    pub position: Point,
    pub traveled_km: f64,
    pub remaining_km: f64,
    pub arrived: bool,
    pub estimated_arrival: NaiveDateTime,
    pub velocity_kmh: f64,
    pub status: TripProgress,
}

impl TrackingSnapshot {
    fn new(taken_at: NaiveDateTime, snapshot: PositionSnapshot) -> Self {
        Self {
            taken_at,
            status: snapshot.progress(),
            position: snapshot.position,
            traveled_km: snapshot.traveled_km,
            remaining_km: snapshot.remaining_km,
            arrived: snapshot.arrived,
            estimated_arrival: snapshot.estimated_arrival,
            velocity_kmh: snapshot.velocity_kmh,
        }
    }
}

pub struct TrackingSession {
    schedule: TripSchedule,
    origin: Point,
    destination: Point,
    estimator: TripEstimator,
    snapshots: watch::Receiver<TrackingSnapshot>,
    task: Option<PeriodicTask>,
    recenter_zoom: u8,
}

impl TrackingSession {
    /// Resolve the route and start recomputing positions.
    ///
    /// Fails without starting a timer when the config or schedule is invalid,
    /// or either city or the road path between them cannot be found.
    pub async fn start(
        request: &TrackingRequest,
        geocoder: &dyn Geocoder,
        router: &dyn RouteService,
        clock: Arc<dyn Clock>,
        config: &TrackingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let schedule = request.schedule()?;

        let (origin, destination) = futures_util::try_join!(
            geocoder.geocode(&schedule.origin),
            geocoder.geocode(&schedule.destination),
        )?;
        let origin = origin.ok_or_else(|| {
            CoreError::RouteUnavailable(format!("could not locate {}", schedule.origin))
        })?;
        let destination = destination.ok_or_else(|| {
            CoreError::RouteUnavailable(format!("could not locate {}", schedule.destination))
        })?;

        let lookup = router.route(origin, destination).await?.ok_or_else(|| {
            CoreError::RouteUnavailable(format!(
                "no road path from {} to {}",
                schedule.origin, schedule.destination
            ))
        })?;

        let estimator =
            TripEstimator::for_schedule(Arc::new(lookup.path), &schedule, config.max_speed_kmh)?;
        let mut tracker = TripTracker::new(estimator.clone());

        let now = clock.now();
        let initial = tracker
            .tick(now)
            .map(|s| TrackingSnapshot::new(now, s))
            .ok_or_else(|| CoreError::RouteUnavailable("route has no points".into()))?;

        tracing::info!(
            origin = %schedule.origin,
            destination = %schedule.destination,
            distance_km = estimator.route().total_km(),
            velocity_kmh = estimator.velocity_kmh(),
            eta = %estimator.estimated_arrival(),
            "tracking started"
        );

        let arrived = initial.arrived;
        let (tx, rx) = watch::channel(initial);
        let task = (!arrived).then(|| {
            PeriodicTask::spawn("trip-tracking", config.tick_interval(), move || {
                let now = clock.now();
                let Some(snapshot) = tracker.tick(now) else {
                    return ControlFlow::Break(());
                };
                let arrived = snapshot.arrived;
                tx.send_replace(TrackingSnapshot::new(now, snapshot));

                if arrived {
                    tracing::info!("trip arrived, tracking stopped");
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        });

        Ok(Self {
            schedule,
            origin,
            destination,
            estimator,
            snapshots: rx,
            task,
            recenter_zoom: config.recenter_zoom,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> TrackingSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Map focus on the bus at its latest position.
    pub fn recenter(&self) -> MapFocus {
        MapFocus {
            center: self.snapshots.borrow().position,
            zoom: self.recenter_zoom,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
            tracing::debug!("tracking stopped");
        }
    }

    pub fn schedule(&self) -> &TripSchedule {
        &self.schedule
    }

    pub fn estimator(&self) -> &TripEstimator {
        &self.estimator
    }

    pub fn endpoints(&self) -> (Point, Point) {
        (self.origin, self.destination)
    }

    /// Route, trails, endpoints and bus marker for the latest snapshot.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        map::trip_features(self, &self.latest())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::NaiveDate;
    use fleetguard_transit::{RouteLookup, RoutePath};
    use futures_util::FutureExt;

    use super::*;

    pub(super) struct ManualClock(Mutex<NaiveDateTime>);

    impl ManualClock {
        pub(super) fn at(now: NaiveDateTime) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        fn set(&self, now: NaiveDateTime) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    pub(super) struct FakeGeocoder {
        places: HashMap<&'static str, Point>,
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        pub(super) fn new() -> Self {
            Self {
                places: HashMap::from([
                    ("Origen", Point::new(0.0, 0.0)),
                    ("Destino", Point::new(1.0, 0.0)),
                ]),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Geocoder for FakeGeocoder {
        fn geocode<'a>(
            &'a self,
            place: &'a str,
        ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<Point>>> + Send + 'a>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let found = self.places.get(place).copied();
            async move { Ok(found) }.boxed()
        }
    }

    /// Straight line with a midpoint; about 111 km along the equator.
    pub(super) struct StraightRouter;

    impl RouteService for StraightRouter {
        fn route<'a>(
            &'a self,
            origin: Point,
            destination: Point,
        ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<RouteLookup>>> + Send + 'a>>
        {
            let mid = Point::new(
                (origin.x() + destination.x()) / 2.0,
                (origin.y() + destination.y()) / 2.0,
            );
            let path = RoutePath::new(vec![origin, mid, destination]);
            async move {
                Ok(Some(RouteLookup {
                    distance_km: path.total_km(),
                    path,
                    duration: chrono::Duration::hours(2),
                }))
            }
            .boxed()
        }
    }

    struct OfflineGeocoder;

    impl Geocoder for OfflineGeocoder {
        fn geocode<'a>(
            &'a self,
            _place: &'a str,
        ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<Point>>> + Send + 'a>>
        {
            async { Err(TransitError::Network("connection refused".into())) }.boxed()
        }
    }

    struct NoRouter;

    impl RouteService for NoRouter {
        fn route<'a>(
            &'a self,
            _origin: Point,
            _destination: Point,
        ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<RouteLookup>>> + Send + 'a>>
        {
            async { Ok(None) }.boxed()
        }
    }

    pub(super) fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    pub(super) fn request() -> TrackingRequest {
        TrackingRequest {
            origin: "Origen".into(),
            destination: "Destino".into(),
            date: Some("2024-09-02".into()),
            departure_clock: Some("10:00".into()),
            arrival_clock: Some("12:00".into()),
        }
    }

    #[test]
    fn test_request_missing_fields() {
        let mut req = request();
        req.arrival_clock = None;
        assert!(matches!(
            req.schedule(),
            Err(CoreError::Transit(TransitError::InvalidSchedule(_)))
        ));

        let mut req = request();
        req.date = Some("02/09/2024".into());
        assert!(req.schedule().is_err());
    }

    #[test]
    fn test_request_from_trip_crossing_midnight() {
        let trip = Trip {
            id: "5".into(),
            origin: "Origen".into(),
            destination: "Destino".into(),
            date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            departure_clock: chrono::NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            arrival_clock: chrono::NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            total_seats: 40,
            available_seats: 10,
            status: "PROGRAMADO".into(),
        };

        let schedule = TrackingRequest::from(&trip).schedule().unwrap();
        assert_eq!(schedule.arrival(), trip.arrival());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_follows_clock_until_arrival() {
        let clock = ManualClock::at(at(9, 0));
        let mut session = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &StraightRouter,
            clock.clone(),
            &TrackingConfig::default(),
        )
        .await
        .unwrap();

        let first = session.latest();
        assert_eq!(first.status, TripProgress::NotDeparted);
        assert_eq!(first.position, Point::new(0.0, 0.0));
        assert_eq!(first.traveled_km, 0.0);
        assert!(session.is_running());

        let mut updates = session.subscribe();
        clock.set(at(11, 0));
        tokio::time::sleep(Duration::from_secs(9)).await;
        updates.changed().await.unwrap();

        let halfway = updates.borrow_and_update().clone();
        assert!(matches!(halfway.status, TripProgress::EnRoute { .. }));
        assert!((halfway.position.x() - 0.5).abs() < 1e-6);

        clock.set(at(12, 30));
        tokio::time::sleep(Duration::from_secs(8)).await;

        let last = session.latest();
        assert!(last.arrived);
        assert_eq!(last.position, Point::new(1.0, 0.0));
        assert_eq!(last.remaining_km, 0.0);
        assert!(!session.is_running());

        session.stop();
        assert!(!session.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrived_trip_starts_no_timer() {
        let session = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &StraightRouter,
            ManualClock::at(at(15, 0)),
            &TrackingConfig::default(),
        )
        .await
        .unwrap();

        assert!(session.latest().arrived);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_unknown_city_is_route_unavailable() {
        let mut req = request();
        req.destination = "Atlantis".into();

        let result = TrackingSession::start(
            &req,
            &FakeGeocoder::new(),
            &StraightRouter,
            ManualClock::at(at(9, 0)),
            &TrackingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(CoreError::RouteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_route_is_route_unavailable() {
        let result = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &NoRouter,
            ManualClock::at(at(9, 0)),
            &TrackingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(CoreError::RouteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_offline_geocoder_is_connectivity_error() {
        let err = TrackingSession::start(
            &request(),
            &OfflineGeocoder,
            &StraightRouter,
            ManualClock::at(at(9, 0)),
            &TrackingConfig::default(),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, CoreError::Transit(TransitError::Network(_))));
        assert!(err.to_string().starts_with("Connectivity error"));
    }

    #[tokio::test]
    async fn test_invalid_schedule_skips_lookups() {
        let mut req = request();
        req.arrival_clock = Some("10:00".into());
        let geocoder = FakeGeocoder::new();

        let result = TrackingSession::start(
            &req,
            &geocoder,
            &StraightRouter,
            ManualClock::at(at(9, 0)),
            &TrackingConfig::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(CoreError::Transit(TransitError::InvalidSchedule(_)))
        ));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_snapshot() {
        let clock = ManualClock::at(at(10, 30));
        let mut session = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &StraightRouter,
            clock.clone(),
            &TrackingConfig::default(),
        )
        .await
        .unwrap();
        let mut updates = session.subscribe();
        let before = updates.borrow_and_update().clone();

        session.stop();
        assert!(!session.is_running());

        clock.set(at(11, 30));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(session.latest(), before);
        assert!(updates.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_session_ends_updates() {
        let clock = ManualClock::at(at(10, 30));
        let session = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &StraightRouter,
            clock.clone(),
            &TrackingConfig::default(),
        )
        .await
        .unwrap();
        let mut updates = session.subscribe();
        let before = updates.borrow_and_update().clone();

        drop(session);
        clock.set(at(11, 30));
        tokio::time::sleep(Duration::from_secs(60)).await;

        let closed = tokio::time::timeout(Duration::from_secs(1), updates.changed()).await;
        assert!(matches!(closed, Ok(Err(_))));
        assert_eq!(*updates.borrow(), before);
    }

    #[tokio::test]
    async fn test_zero_tick_interval_is_rejected() {
        let geocoder = FakeGeocoder::new();
        let config = TrackingConfig {
            tick_interval_secs: 0,
            ..TrackingConfig::default()
        };

        let result = TrackingSession::start(
            &request(),
            &geocoder,
            &StraightRouter,
            ManualClock::at(at(9, 0)),
            &config,
        )
        .await;

        assert!(matches!(result, Err(CoreError::Configuration(_))));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recenter_on_bus() {
        let session = TrackingSession::start(
            &request(),
            &FakeGeocoder::new(),
            &StraightRouter,
            ManualClock::at(at(11, 0)),
            &TrackingConfig::default(),
        )
        .await
        .unwrap();

        let focus = session.recenter();
        assert_eq!(focus.zoom, 14);
        assert_eq!(focus.center, session.latest().position);
        assert_eq!(session.endpoints().1, Point::new(1.0, 0.0));
    }
}
