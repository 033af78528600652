//! Simulated bus position along a route.
//!
//! The bus is assumed to leave on time and travel at a constant speed: the
//! speed the schedule implies, capped at a maximum. When the cap kicks in the
//! estimated arrival slips past the scheduled one.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use geo::Point;

use crate::models::schedule::TripSchedule;
use crate::models::types::{Result, TransitError};
use crate::tracking::route::RoutePath;

/// Fraction of the route below which the bus still counts as arriving.
pub const ARRIVAL_TOLERANCE: f64 = 0.001;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TripProgress {
    NotDeparted,
    EnRoute { traveled_km: f64 },
    Arrived,
}

/// Read-only view of the simulated trip at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub position: Point,
    pub traveled_km: f64,
    pub remaining_km: f64,
    pub arrived: bool,
    pub departed: bool,
    pub estimated_arrival: NaiveDateTime,
    pub velocity_kmh: f64,
}

impl PositionSnapshot {
    pub fn progress(&self) -> TripProgress {
        if self.arrived {
            TripProgress::Arrived
        } else if !self.departed {
            TripProgress::NotDeparted
        } else {
            TripProgress::EnRoute {
                traveled_km: self.traveled_km,
            }
        }
    }
}

/// Velocity and ETA derived once per tracking session.
#[derive(Clone, Debug)]
pub struct TripEstimator {
    route: Arc<RoutePath>,
    departure: NaiveDateTime,
    scheduled_arrival: NaiveDateTime,
    estimated_arrival: NaiveDateTime,
    velocity_kmh: f64,
}

impl TripEstimator {
    /// Returns `Err` if arrival is not after departure or the speed cap is not
    /// a positive finite number.
    pub fn new(
        route: Arc<RoutePath>,
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
        max_speed_kmh: f64,
    ) -> Result<Self> {
        if arrival <= departure {
            return Err(TransitError::InvalidSchedule(format!(
                "arrival {arrival} is not after departure {departure}"
            )));
        }
        if !max_speed_kmh.is_finite() || max_speed_kmh <= 0.0 {
            return Err(TransitError::InvalidData(format!(
                "maximum speed must be positive, got {max_speed_kmh}"
            )));
        }

        let total_km = route.total_km();
        let planned_hours = (arrival - departure).num_milliseconds() as f64 / MS_PER_HOUR;
        let required_kmh = total_km / planned_hours;
        let velocity_kmh = required_kmh.min(max_speed_kmh);

        let estimated_arrival = if velocity_kmh > 0.0 {
            let effective_ms = (total_km / velocity_kmh * MS_PER_HOUR).round();
            // `as i64` saturates, so out-of-range values fail in the checked add.
            Duration::try_milliseconds(effective_ms as i64)
                .and_then(|travel| departure.checked_add_signed(travel))
                .ok_or_else(|| {
                    TransitError::InvalidData(format!(
                        "{total_km:.1} km at {velocity_kmh} km/h never arrives"
                    ))
                })?
        } else {
            departure
        };

        Ok(Self {
            route,
            departure,
            scheduled_arrival: arrival,
            estimated_arrival,
            velocity_kmh,
        })
    }

    pub fn for_schedule(
        route: Arc<RoutePath>,
        schedule: &TripSchedule,
        max_speed_kmh: f64,
    ) -> Result<Self> {
        Self::new(route, schedule.departure(), schedule.arrival(), max_speed_kmh)
    }

    pub fn route(&self) -> &RoutePath {
        &self.route
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    pub fn scheduled_arrival(&self) -> NaiveDateTime {
        self.scheduled_arrival
    }

    pub fn estimated_arrival(&self) -> NaiveDateTime {
        self.estimated_arrival
    }

    pub fn velocity_kmh(&self) -> f64 {
        self.velocity_kmh
    }

    /// Pure function of `now`; `None` only when the route has no points.
    pub fn snapshot_at(&self, now: NaiveDateTime) -> Option<PositionSnapshot> {
        let first = self.route.first()?;
        let last = self.route.last()?;
        let total_km = self.route.total_km();

        let elapsed = now - self.departure;
        if elapsed <= Duration::zero() {
            return Some(self.snapshot(first, 0.0, total_km, false, false));
        }

        let elapsed_hours = elapsed.num_milliseconds() as f64 / MS_PER_HOUR;
        let traveled_km = (self.velocity_kmh * elapsed_hours).min(total_km);

        if traveled_km >= total_km * (1.0 - ARRIVAL_TOLERANCE) {
            return Some(self.snapshot(last, total_km, 0.0, true, true));
        }

        let position = self.route.point_at(traveled_km)?;
        Some(self.snapshot(position, traveled_km, total_km - traveled_km, false, true))
    }

    fn snapshot(
        &self,
        position: Point,
        traveled_km: f64,
        remaining_km: f64,
        arrived: bool,
        departed: bool,
    ) -> PositionSnapshot {
        PositionSnapshot {
            position,
            traveled_km,
            remaining_km,
            arrived,
            departed,
            estimated_arrival: self.estimated_arrival,
            velocity_kmh: self.velocity_kmh,
        }
    }
}

/// Stateful wrapper that latches the arrived snapshot.
///
/// Once a tick reports arrival every later tick returns the same snapshot;
/// build a new tracker to follow another trip.
#[derive(Clone, Debug)]
pub struct TripTracker {
    estimator: TripEstimator,
    terminal: Option<PositionSnapshot>,
}

impl TripTracker {
    pub fn new(estimator: TripEstimator) -> Self {
        Self {
            estimator,
            terminal: None,
        }
    }

    pub fn estimator(&self) -> &TripEstimator {
        &self.estimator
    }

    pub fn is_arrived(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> Option<PositionSnapshot> {
        if let Some(terminal) = &self.terminal {
            return Some(terminal.clone());
        }

        let snapshot = self.estimator.snapshot_at(now)?;
        if snapshot.arrived {
            self.terminal = Some(snapshot.clone());
        }
        Some(snapshot)
    }
}
