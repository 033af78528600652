//! Plain-text rendering of listings and tracking updates.

use chrono::NaiveDateTime;
use fleetguard_core::tracking::TrackingSnapshot;
use fleetguard_core::transit::{Reservation, Trip, TripProgress, TripSchedule};

pub fn print_trips(trips: &[Trip], now: NaiveDateTime) {
    println!(
        "{:<8} {:<16} {:<16} {:>5} {:>5} {:>9}  {}",
        "ID", "FROM", "TO", "DEP", "ARR", "SEATS", "STATUS"
    );
    for trip in trips {
        println!(
            "{:<8} {:<16} {:<16} {:>5} {:>5} {:>4}/{:<4}  {}",
            trip.id.as_str(),
            trip.origin,
            trip.destination,
            trip.departure_clock.format("%H:%M"),
            trip.arrival_clock.format("%H:%M"),
            trip.available_seats,
            trip.total_seats,
            trip.availability(now)
        );
    }
}

pub fn print_reservations(reservations: &[Reservation], now: NaiveDateTime) {
    for r in reservations {
        let cancel_hint = if r.is_cancelable(now) { "  (cancelable)" } else { "" };
        println!(
            "{}  {} -> {}  {}  seats: {}  {}{}",
            r.id,
            r.origin,
            r.destination,
            r.departure().format("%Y-%m-%d %H:%M"),
            r.seat_count,
            r.status,
            cancel_hint
        );
        if !r.companions.is_empty() {
            println!("    with {}", r.companions.join(", "));
        }
    }
}

pub fn status_line(schedule: &TripSchedule, snapshot: &TrackingSnapshot) -> String {
    let eta = snapshot.estimated_arrival.format("%H:%M");
    match snapshot.status {
        TripProgress::NotDeparted => format!(
            "Waiting for departure at {} from {} (ETA {eta})",
            schedule.departure().format("%H:%M"),
            schedule.origin
        ),
        TripProgress::EnRoute { traveled_km } => format!(
            "{:.5}, {:.5}  {traveled_km:.1} km traveled, {:.1} km to {} at {:.0} km/h (ETA {eta})",
            snapshot.position.y(),
            snapshot.position.x(),
            snapshot.remaining_km,
            schedule.destination,
            snapshot.velocity_kmh
        ),
        TripProgress::Arrived => format!("Arrived at {}", schedule.destination),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use fleetguard_core::transit::geo::Point;

    use super::*;

    #[test]
    fn test_status_line() {
        let schedule =
            TripSchedule::from_service_day("Cali", "Pasto", "2024-03-01", "08:00", "16:00").unwrap();
        let eta = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap();
        let mut snapshot = TrackingSnapshot {
            taken_at: eta,
            position: Point::new(-76.5, 3.4),
            traveled_km: 0.0,
            remaining_km: 380.0,
            arrived: false,
            estimated_arrival: eta,
            velocity_kmh: 47.5,
            status: TripProgress::NotDeparted,
        };
        assert_eq!(
            status_line(&schedule, &snapshot),
            "Waiting for departure at 08:00 from Cali (ETA 16:00)"
        );

        snapshot.status = TripProgress::EnRoute { traveled_km: 12.34 };
        assert!(status_line(&schedule, &snapshot).contains("12.3 km traveled"));

        snapshot.status = TripProgress::Arrived;
        assert_eq!(status_line(&schedule, &snapshot), "Arrived at Pasto");
    }
}
