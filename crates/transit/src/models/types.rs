//! Core enums and the crate error type.

use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle of a reservation as reported by the backend
/// (`ACTIVA`, `COMPLETADA`, `CANCELADA`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    Active,
    Completed,
    Cancelled,
    /// Any status string this client does not know about, kept verbatim.
    Other(String),
}

impl ReservationStatus {
    pub fn from_api(value: &str) -> Self {
        match value {
            "ACTIVA" => Self::Active,
            "COMPLETADA" => Self::Completed,
            "CANCELADA" => Self::Cancelled,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_api(&self) -> &str {
        match self {
            Self::Active => "ACTIVA",
            Self::Completed => "COMPLETADA",
            Self::Cancelled => "CANCELADA",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api())
    }
}

/// How a trip is presented in search results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Availability {
    Available,
    /// Fewer than 30% of the seats are still free.
    FewSeats,
    SoldOut,
    InProgress,
    Finished,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::FewSeats => "few seats left",
            Self::SoldOut => "sold out",
            Self::InProgress => "in progress",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    /// Arrival is not after departure once the midnight adjustment is applied,
    /// or a date/clock field could not be parsed.
    #[error("Invalid schedule data: {0}")]
    InvalidSchedule(String),

    #[error("Route unavailable: {0}")]
    RouteUnavailable(String),

    #[error("Invalid reservation request: {0}")]
    InvalidReservation(String),

    /// A pluggable fetcher (geocoder, router) failed to reach its service.
    #[error("Connectivity error: {0}")]
    Network(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_status_from_api() {
        assert_eq!(ReservationStatus::from_api("ACTIVA"), ReservationStatus::Active);
        assert_eq!(ReservationStatus::from_api("CANCELADA"), ReservationStatus::Cancelled);
        assert_eq!(
            ReservationStatus::from_api("EN_REVISION"),
            ReservationStatus::Other("EN_REVISION".into())
        );
    }

    #[test]
    fn test_reservation_status_round_trips_unknown_values() {
        let status = ReservationStatus::from_api("PENDIENTE");
        assert_eq!(status.as_api(), "PENDIENTE");
        assert_eq!(ReservationStatus::Completed.to_string(), "COMPLETADA");
    }
}
