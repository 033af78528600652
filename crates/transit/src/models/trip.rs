//! Trips as returned by a search.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::identifiers::TripIdentifier;
use crate::models::schedule::{arrival_on_service_day, TripSchedule};
use crate::models::types::{Availability, Result};

/// Share of free seats under which a trip is flagged as nearly full.
const FEW_SEATS_RATIO: f64 = 0.30;

#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    pub id: TripIdentifier,
    pub origin: Arc<str>,
    pub destination: Arc<str>,
    pub date: NaiveDate,
    pub departure_clock: NaiveTime,
    pub arrival_clock: NaiveTime,
    pub total_seats: u32,
    pub available_seats: u32,
    /// Backend status string, passed through untouched.
    pub status: Arc<str>,
}

impl Trip {
    pub fn departure(&self) -> NaiveDateTime {
        self.date.and_time(self.departure_clock)
    }

    pub fn arrival(&self) -> NaiveDateTime {
        arrival_on_service_day(self.date, self.departure_clock, self.arrival_clock)
            .unwrap_or_else(|_| self.date.and_time(self.arrival_clock))
    }

    pub fn schedule(&self) -> Result<TripSchedule> {
        TripSchedule::new(
            self.origin.clone(),
            self.destination.clone(),
            self.departure(),
            self.arrival(),
        )
    }

    /// Sold out wins over every time-based state, then finished, then running.
    pub fn availability(&self, now: NaiveDateTime) -> Availability {
        if self.available_seats == 0 {
            return Availability::SoldOut;
        }
        if now > self.arrival() {
            return Availability::Finished;
        }
        if now > self.departure() {
            return Availability::InProgress;
        }

        let ratio = if self.total_seats == 0 {
            0.0
        } else {
            self.available_seats as f64 / self.total_seats as f64
        };
        if ratio < FEW_SEATS_RATIO {
            Availability::FewSeats
        } else {
            Availability::Available
        }
    }

    /// A trip can still be booked while it is running, as long as seats remain.
    pub fn is_bookable(&self, now: NaiveDateTime) -> bool {
        self.available_seats > 0 && now <= self.arrival()
    }
}

/// Order search results by departure clock, earliest first.
pub fn sort_by_departure(trips: &mut [Trip]) {
    trips.sort_by_key(|t| t.departure_clock);
}
