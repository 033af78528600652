//! Wire shapes of the booking backend. Field names follow the backend schema.

use fleetguard_transit::models::schedule::{parse_clock, parse_service_date};
use fleetguard_transit::{
    PassengerIdentifier, Reservation, ReservationIdentifier, ReservationStatus, TransitError,
    Trip, TripIdentifier,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TripDto {
    pub id: IdValue,
    pub origen: String,
    pub destino: String,
    pub fecha: String,
    pub hora_salida: String,
    pub hora_llegada: String,
    pub cupos_totales: u32,
    pub cupos_disponibles: u32,
    #[serde(default)]
    pub estado: Option<String>,
}

/// Ids come back as strings from some resolvers and as numbers from others.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub(crate) enum IdValue {
    Text(String),
    Number(i64),
}

impl IdValue {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

impl TryFrom<TripDto> for Trip {
    type Error = TransitError;

    fn try_from(dto: TripDto) -> Result<Self, Self::Error> {
        Ok(Trip {
            id: TripIdentifier::new(dto.id.into_string()),
            origin: dto.origen.into(),
            destination: dto.destino.into(),
            date: parse_service_date(&dto.fecha)?,
            departure_clock: parse_clock(&dto.hora_salida)?,
            arrival_clock: parse_clock(&dto.hora_llegada)?,
            total_seats: dto.cupos_totales,
            available_seats: dto.cupos_disponibles,
            status: dto.estado.unwrap_or_default().into(),
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TripSummaryDto {
    pub fecha: String,
    pub hora_salida: String,
    pub origen: String,
    pub destino: String,
    #[serde(default)]
    pub hora_llegada: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct CompanionNameDto {
    pub nombre: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReservationDto {
    pub id: IdValue,
    pub viaje: TripSummaryDto,
    pub cantidad_asientos: u32,
    #[serde(default)]
    pub pasajeros_adicionales: Vec<CompanionNameDto>,
    pub estado: String,
}

impl TryFrom<ReservationDto> for Reservation {
    type Error = TransitError;

    fn try_from(dto: ReservationDto) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: ReservationIdentifier::new(dto.id.into_string()),
            date: parse_service_date(&dto.viaje.fecha)?,
            departure_clock: parse_clock(&dto.viaje.hora_salida)?,
            origin: dto.viaje.origen.into(),
            destination: dto.viaje.destino.into(),
            seat_count: dto.cantidad_asientos,
            companions: dto
                .pasajeros_adicionales
                .into_iter()
                .map(|c| c.nombre.into())
                .collect(),
            status: ReservationStatus::from_api(&dto.estado),
        })
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct PassengerDto {
    pub id: IdValue,
    pub nombre: String,
    pub apellido: String,
}

impl PassengerDto {
    pub fn id(&self) -> PassengerIdentifier {
        PassengerIdentifier::new(self.id.clone().into_string())
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct PassengerNameDto {
    pub nombre: String,
    pub apellido: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookedReservationDto {
    #[serde(default)]
    pub fecha_reserva: Option<String>,
    pub codigo_reserva: String,
    #[serde(default)]
    pub pasajero: Option<PassengerNameDto>,
    pub viaje: TripSummaryDto,
    pub cantidad_asientos: u32,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct RegisteredPassengerDto {
    pub id: IdValue,
    pub username: String,
    pub email: String,
}

/// `{success, message, ...}` payload shared by every mutation.
#[derive(Deserialize, Debug)]
pub(crate) struct MutationResult<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchInput<'a> {
    pub origen: &'a str,
    pub destino: &'a str,
    pub fecha: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct CompanionInput<'a> {
    pub nombre: &'a str,
    pub identificacion: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReservationInput<'a> {
    pub viaje_id: i64,
    pub cantidad_asientos: u32,
    pub adicionales: Vec<CompanionInput<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterInput<'a> {
    pub nombre: &'a str,
    pub apellido: &'a str,
    pub telefono: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    pub identificacion: &'a str,
}
