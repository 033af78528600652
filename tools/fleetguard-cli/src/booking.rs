use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};
use clap::Args;
use fleetguard_core::transit::{Companion, ReservationIdentifier, ReservationRequest, TripIdentifier};

use crate::App;
use crate::output::{print_reservations, print_trips};

#[derive(Args, Debug)]
pub struct ReserveArgs {
    /// Trip id as shown by `search`
    #[arg(long)]
    trip: String,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long, default_value_t = 1)]
    seats: u32,
    /// Extra passenger as NAME:ID, once per additional seat
    #[arg(long = "companion", value_parser = parse_companion)]
    companions: Vec<Companion>,
}

fn parse_companion(value: &str) -> std::result::Result<Companion, String> {
    let (name, identification) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:ID, got {value:?}"))?;
    Ok(Companion {
        name: name.trim().to_owned(),
        identification: identification.trim().to_owned(),
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn search(app: &App, from: &str, to: &str, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(today);
    let trips = app
        .api
        .search_trips(from, to, date)
        .await
        .context("Trip search failed")?;

    if trips.is_empty() {
        println!("No trips from {from} to {to} on {date}");
        return Ok(());
    }
    print_trips(&trips, Local::now().naive_local());
    Ok(())
}

pub async fn cities(app: &App) -> Result<()> {
    for city in app.api.list_cities().await.context("Could not list cities")? {
        println!("{city}");
    }
    Ok(())
}

pub async fn reservations(app: &App) -> Result<()> {
    let session = app.require_session().await?;
    let reservations = app
        .api
        .my_reservations(&session)
        .await
        .context("Could not load reservations")?;

    if reservations.is_empty() {
        println!("No reservations yet");
        return Ok(());
    }
    print_reservations(&reservations, Local::now().naive_local());
    Ok(())
}

pub async fn reserve(app: &App, args: ReserveArgs) -> Result<()> {
    let session = app.require_session().await?;
    let trip_id = TripIdentifier::new(args.trip.trim());

    let trip = app
        .api
        .search_trips(&args.from, &args.to, args.date)
        .await
        .context("Could not look up the trip")?
        .into_iter()
        .find(|t| t.id == trip_id)
        .ok_or_else(|| anyhow!("Trip {trip_id} not found from {} to {} on {}", args.from, args.to, args.date))?;

    let now = Local::now().naive_local();
    if !trip.is_bookable(now) {
        bail!("Trip {trip_id} can no longer be booked ({})", trip.availability(now));
    }

    let request = ReservationRequest {
        trip_id,
        seats: args.seats,
        companions: args.companions,
    };
    let receipt = app
        .api
        .create_reservation(&session, &request, trip.available_seats)
        .await
        .context("Reservation failed")?;

    println!("Reservation {} confirmed", receipt.code);
    println!(
        "  {} -> {}, departs {}",
        receipt.origin,
        receipt.destination,
        receipt.departure.format("%Y-%m-%d %H:%M")
    );
    if let Some(arrival) = receipt.arrival {
        println!("  arrives {}", arrival.format("%Y-%m-%d %H:%M"));
    }
    println!("  seats: {}", receipt.seat_count);
    Ok(())
}

pub async fn cancel(app: &App, reservation: &str, reason: Option<&str>) -> Result<()> {
    let session = app.require_session().await?;
    let id = ReservationIdentifier::new(reservation.trim());

    // Refuse locally when the listing already shows it cannot be cancelled.
    let now = Local::now().naive_local();
    if let Some(existing) = app
        .api
        .my_reservations(&session)
        .await
        .context("Could not load reservations")?
        .into_iter()
        .find(|r| r.id == id)
    {
        if !existing.is_cancelable(now) {
            bail!("Reservation {id} can no longer be cancelled ({})", existing.status);
        }
    }

    let receipt = app
        .api
        .cancel_reservation(&session, &id, reason)
        .await
        .context("Cancellation failed")?;
    println!(
        "{}",
        receipt.message.as_deref().unwrap_or("Reservation cancelled")
    );
    Ok(())
}

pub async fn rate(app: &App, reservation: &str, score: u8, comment: Option<&str>) -> Result<()> {
    let session = app.require_session().await?;
    let id = ReservationIdentifier::new(reservation.trim());

    let message = app
        .api
        .rate_trip(&session, &id, score, comment)
        .await
        .context("Rating failed")?;
    println!("{}", message.as_deref().unwrap_or("Thanks for rating your trip"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_companion() {
        let companion = parse_companion("María José: 10203040").unwrap();
        assert_eq!(companion.name, "María José");
        assert_eq!(companion.identification, "10203040");

        assert!(parse_companion("no separator").is_err());
    }
}
