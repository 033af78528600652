//! Reservations held by a passenger and requests to create new ones.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::identifiers::{ReservationIdentifier, TripIdentifier};
use crate::models::types::{ReservationStatus, Result, TransitError};

#[derive(Clone, Debug, PartialEq)]
pub struct Reservation {
    pub id: ReservationIdentifier,
    pub date: NaiveDate,
    pub departure_clock: NaiveTime,
    pub origin: Arc<str>,
    pub destination: Arc<str>,
    pub seat_count: u32,
    /// Names of the passengers travelling with the account holder.
    pub companions: Vec<Arc<str>>,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn departure(&self) -> NaiveDateTime {
        self.date.and_time(self.departure_clock)
    }

    /// Only active reservations whose bus has not left yet can be cancelled.
    pub fn is_cancelable(&self, now: NaiveDateTime) -> bool {
        self.status == ReservationStatus::Active && now < self.departure()
    }
}

/// Active reservations first, soonest departure first; the rest follow with
/// the most recent trip first.
pub fn sort_reservations(reservations: &mut [Reservation]) {
    reservations.sort_by(|a, b| {
        let a_active = a.status == ReservationStatus::Active;
        let b_active = b.status == ReservationStatus::Active;

        match (a_active, b_active) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => a.departure().cmp(&b.departure()),
            (false, false) => b.departure().cmp(&a.departure()),
        }
    });
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Companion {
    pub name: String,
    pub identification: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationRequest {
    pub trip_id: TripIdentifier,
    pub seats: u32,
    pub companions: Vec<Companion>,
}

impl ReservationRequest {
    /// Check the request against the seats the trip still has.
    ///
    /// The account holder occupies one seat; every other seat needs a named,
    /// identified companion.
    pub fn validate(&self, available_seats: u32) -> Result<()> {
        if self.trip_id.is_blank() {
            return Err(TransitError::InvalidReservation("missing trip id".into()));
        }
        if self.seats < 1 {
            return Err(TransitError::InvalidReservation(
                "at least one seat must be reserved".into(),
            ));
        }
        if self.seats > available_seats {
            return Err(TransitError::InvalidReservation(format!(
                "{} seats requested but only {} available",
                self.seats, available_seats
            )));
        }

        let expected = (self.seats - 1) as usize;
        if self.companions.len() != expected {
            return Err(TransitError::InvalidReservation(format!(
                "{} seats need {} companions, got {}",
                self.seats,
                expected,
                self.companions.len()
            )));
        }

        for (i, companion) in self.companions.iter().enumerate() {
            if companion.name.trim().is_empty() {
                return Err(TransitError::InvalidReservation(format!(
                    "companion {} has no name",
                    i + 1
                )));
            }
            if companion.identification.trim().is_empty() {
                return Err(TransitError::InvalidReservation(format!(
                    "companion {} has no identification",
                    i + 1
                )));
            }
        }

        Ok(())
    }
}
