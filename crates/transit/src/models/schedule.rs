//! Scheduled departure/arrival of a trip.
//!
//! The backend reports a service date plus clock times for departure and
//! arrival. An arrival clock earlier than the departure clock means the trip
//! crosses midnight and arrives on the following day.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::types::{Result, TransitError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` service date.
pub fn parse_service_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| TransitError::InvalidSchedule(format!("bad date {value:?}: {e}")))
}

/// Parse an `HH:MM` or `HH:MM:SS` clock time.
pub fn parse_clock(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| TransitError::InvalidSchedule(format!("bad clock time {value:?}: {e}")))
}

/// Combine a departure date and arrival clock, rolling over to the next day
/// when the arrival clock is earlier than the departure clock.
pub fn arrival_on_service_day(
    date: NaiveDate,
    departure_clock: NaiveTime,
    arrival_clock: NaiveTime,
) -> Result<NaiveDateTime> {
    let arrival_date = if arrival_clock < departure_clock {
        date.succ_opt()
            .ok_or_else(|| TransitError::InvalidSchedule(format!("no day after {date}")))?
    } else {
        date
    };
    Ok(arrival_date.and_time(arrival_clock))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripSchedule {
    pub origin: Arc<str>,
    pub destination: Arc<str>,
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
}

impl TripSchedule {
    /// Build a schedule from absolute timestamps.
    ///
    /// Returns `Err` unless arrival is strictly after departure.
    pub fn new(
        origin: impl Into<Arc<str>>,
        destination: impl Into<Arc<str>>,
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
    ) -> Result<Self> {
        if arrival <= departure {
            return Err(TransitError::InvalidSchedule(format!(
                "arrival {arrival} is not after departure {departure}"
            )));
        }

        Ok(Self {
            origin: origin.into(),
            destination: destination.into(),
            departure,
            arrival,
        })
    }

    /// Build a schedule from the strings the backend returns for a trip.
    pub fn from_service_day(
        origin: impl Into<Arc<str>>,
        destination: impl Into<Arc<str>>,
        date: &str,
        departure_clock: &str,
        arrival_clock: &str,
    ) -> Result<Self> {
        let date = parse_service_date(date)?;
        let departure_clock = parse_clock(departure_clock)?;
        let arrival_clock = parse_clock(arrival_clock)?;

        let departure = date.and_time(departure_clock);
        let arrival = arrival_on_service_day(date, departure_clock, arrival_clock)?;

        Self::new(origin, destination, departure, arrival)
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    pub fn arrival(&self) -> NaiveDateTime {
        self.arrival
    }

    pub fn planned_duration(&self) -> Duration {
        self.arrival - self.departure
    }

    pub fn has_started(&self, now: NaiveDateTime) -> bool {
        now > self.departure
    }

    pub fn has_ended(&self, now: NaiveDateTime) -> bool {
        now > self.arrival
    }
}
