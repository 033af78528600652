//! Typed booking operations on top of [`GraphQlClient`].

use chrono::{NaiveDate, NaiveDateTime};
use fleetguard_transit::models::schedule::{arrival_on_service_day, parse_clock, parse_service_date};
use fleetguard_transit::{
    PassengerIdentifier, Reservation, ReservationIdentifier, ReservationRequest,
    ReservationStatus, TransitError, Trip, sort_by_departure, sort_reservations,
};
use serde::Deserialize;
use serde_json::json;

use super::GraphQlClient;
use super::validate::{self, invalid};
use super::dto::{
    BookedReservationDto, CompanionInput, MutationResult, PassengerDto, RegisterInput,
    RegisteredPassengerDto, ReservationDto, ReservationInput, SearchInput, TripDto,
    TripSummaryDto,
};
use crate::error::{CoreError, Result};
use crate::session::{AuthSession, PassengerProfile};

const SEARCH_TRIPS: &str = r#"
query BuscarViajes($input: BuscarViajesInput!) {
  buscarViajes(input: $input) {
    id
    origen
    destino
    fecha
    horaSalida
    horaLlegada
    cuposTotales
    cuposDisponibles
    estado
  }
}"#;

const LIST_CITIES: &str = r#"
query BuscarCiudades {
  buscarCiudades
}"#;

const MY_RESERVATIONS: &str = r#"
query MisReservas($pasajeroId: ID!) {
  misReservas(pasajeroId: $pasajeroId) {
    id
    viaje {
      fecha
      horaSalida
      origen
      destino
    }
    cantidadAsientos
    pasajerosAdicionales {
      nombre
    }
    estado
  }
}"#;

const CREATE_RESERVATION: &str = r#"
mutation CrearReserva($input: CrearReservaInput!, $pasajeroId: ID!) {
  crearReserva(input: $input, pasajeroId: $pasajeroId) {
    success
    message
    reserva {
      fechaReserva
      codigoReserva
      pasajero {
        nombre
        apellido
      }
      viaje {
        origen
        destino
        fecha
        horaSalida
        horaLlegada
      }
      cantidadAsientos
    }
  }
}"#;

const CANCEL_RESERVATION: &str = r#"
mutation CancelarReserva($reservaId: ID!, $pasajeroId: ID!) {
  cancelarReserva(reservaId: $reservaId, pasajeroId: $pasajeroId) {
    success
    message
    reserva {
      codigoReserva
      cantidadAsientos
      viaje {
        origen
        destino
        horaSalida
        fecha
      }
      estado
    }
  }
}"#;

const RATE_TRIP: &str = r#"
mutation CalificarViaje($input: CalificarViajeInput!, $pasajeroId: ID!) {
  calificarViaje(input: $input, pasajeroId: $pasajeroId) {
    success
    message
  }
}"#;

const LOGIN: &str = r#"
mutation Login($input: LoginInput!) {
  login(input: $input) {
    success
    message
    token
    pasajero {
      id
      nombre
      apellido
    }
  }
}"#;

const REGISTER: &str = r#"
mutation RegisterPasajero($input: RegisterPasajeroInput!) {
  registerPasajero(input: $input) {
    success
    message
    pasajero {
      id
      username
      email
    }
  }
}"#;

const SEND_PASSWORD_RESET: &str = r#"
mutation SendResetPassword($email: String!) {
  sendPasswordReset(email: $email)
}"#;

const RESET_PASSWORD: &str = r#"
mutation ResetPassword($input: ResetPasswordInput!) {
  resetPassword(input: $input) {
    success
    message
  }
}"#;

/// Confirmation returned after booking seats.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservationReceipt {
    pub code: String,
    pub booked_on: Option<String>,
    pub passenger_name: Option<String>,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: Option<NaiveDateTime>,
    pub seat_count: u32,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CancellationReceipt {
    pub message: Option<String>,
    pub code: Option<String>,
    pub seat_count: Option<u32>,
    pub status: Option<ReservationStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub id: PassengerIdentifier,
    pub username: String,
    pub email: String,
    pub message: Option<String>,
}

/// Sign-up form for a new passenger account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub identification: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("phone", &self.phone),
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("identification", &self.identification),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(invalid(format!("{field} is required")));
        }
        for (field, value) in [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("username", &self.username),
            ("identification", &self.identification),
        ] {
            validate::name_length(field, value)?;
        }
        validate::phone(self.phone.trim())?;
        validate::email(self.email.trim())?;
        validate::password(&self.password)?;
        if self.password != self.password_confirm {
            return Err(invalid("passwords do not match".into()));
        }
        Ok(())
    }
}

/// Turn a `success: false` mutation result into [`CoreError::Rejected`].
fn accepted<T>(operation: &str, result: MutationResult<T>) -> Result<(T, Option<String>)> {
    if result.success {
        Ok((result.payload, result.message))
    } else {
        let message = result
            .message
            .unwrap_or_else(|| format!("{operation} was not accepted"));
        tracing::info!(operation, "mutation rejected: {message}");
        Err(CoreError::Rejected(message))
    }
}

fn summary_departure(viaje: &TripSummaryDto) -> Result<NaiveDateTime> {
    let date = parse_service_date(&viaje.fecha)?;
    Ok(date.and_time(parse_clock(&viaje.hora_salida)?))
}

impl GraphQlClient {
    /// Trips between two cities on a service day, earliest departure first.
    pub async fn search_trips(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<Vec<Trip>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            buscar_viajes: Option<Vec<TripDto>>,
        }

        let input = SearchInput {
            origen: origin,
            destino: destination,
            fecha: date.format("%Y-%m-%d").to_string(),
        };
        let data: Data = self
            .execute("BuscarViajes", SEARCH_TRIPS, &json!({ "input": input }), None)
            .await?;

        let mut trips = data
            .buscar_viajes
            .unwrap_or_default()
            .into_iter()
            .map(Trip::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        sort_by_departure(&mut trips);

        tracing::debug!(origin, destination, %date, count = trips.len(), "trip search");
        Ok(trips)
    }

    pub async fn list_cities(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            buscar_ciudades: Option<Vec<String>>,
        }

        let data: Data = self
            .execute("BuscarCiudades", LIST_CITIES, &json!({}), None)
            .await?;
        Ok(data.buscar_ciudades.unwrap_or_default())
    }

    /// Reservations of the signed-in passenger, active ones first.
    pub async fn my_reservations(&self, session: &AuthSession) -> Result<Vec<Reservation>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            mis_reservas: Option<Vec<ReservationDto>>,
        }

        let variables = json!({ "pasajeroId": session.passenger().id.as_str() });
        let data: Data = self
            .execute("MisReservas", MY_RESERVATIONS, &variables, Some(session))
            .await?;

        let mut reservations = data
            .mis_reservas
            .unwrap_or_default()
            .into_iter()
            .map(Reservation::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        sort_reservations(&mut reservations);
        Ok(reservations)
    }

    /// Book seats on a trip. The request is validated against
    /// `available_seats` before anything is sent.
    pub async fn create_reservation(
        &self,
        session: &AuthSession,
        request: &ReservationRequest,
        available_seats: u32,
    ) -> Result<ReservationReceipt> {
        #[derive(Deserialize)]
        struct Payload {
            reserva: Option<BookedReservationDto>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            crear_reserva: MutationResult<Payload>,
        }

        request.validate(available_seats)?;
        let viaje_id = request.trip_id.as_str().trim().parse::<i64>().map_err(|_| {
            TransitError::InvalidReservation(format!("trip id {} is not numeric", request.trip_id))
        })?;

        let input = ReservationInput {
            viaje_id,
            cantidad_asientos: request.seats,
            adicionales: request
                .companions
                .iter()
                .map(|c| CompanionInput {
                    nombre: c.name.trim(),
                    identificacion: c.identification.trim(),
                })
                .collect(),
        };
        let variables = json!({
            "input": input,
            "pasajeroId": session.passenger().id.as_str(),
        });

        let data: Data = self
            .execute("CrearReserva", CREATE_RESERVATION, &variables, Some(session))
            .await?;
        let (payload, message) = accepted("crearReserva", data.crear_reserva)?;
        let booked = payload.reserva.ok_or_else(|| {
            CoreError::MalformedResponse("reservation accepted without details".into())
        })?;

        let date = parse_service_date(&booked.viaje.fecha)?;
        let departure_clock = parse_clock(&booked.viaje.hora_salida)?;
        let arrival = match booked.viaje.hora_llegada.as_deref() {
            Some(clock) => Some(arrival_on_service_day(date, departure_clock, parse_clock(clock)?)?),
            None => None,
        };

        tracing::info!(trip = %request.trip_id, seats = request.seats, code = %booked.codigo_reserva, "reservation created");
        Ok(ReservationReceipt {
            code: booked.codigo_reserva,
            booked_on: booked.fecha_reserva,
            passenger_name: booked
                .pasajero
                .map(|p| format!("{} {}", p.nombre, p.apellido)),
            origin: booked.viaje.origen,
            destination: booked.viaje.destino,
            departure: date.and_time(departure_clock),
            arrival,
            seat_count: booked.cantidad_asientos,
            message,
        })
    }

    /// Cancel one of the passenger's reservations. A blank `reason` is sent as
    /// an empty string.
    pub async fn cancel_reservation(
        &self,
        session: &AuthSession,
        reservation: &ReservationIdentifier,
        reason: Option<&str>,
    ) -> Result<CancellationReceipt> {
        #[derive(Deserialize)]
        struct Payload {
            reserva: Option<BookedReservationDto>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            cancelar_reserva: MutationResult<Payload>,
        }

        if reservation.is_blank() {
            return Err(TransitError::InvalidReservation("missing reservation id".into()).into());
        }
        let reason = reason.map(str::trim).unwrap_or_default();
        validate::cancel_reason(reason)?;

        let variables = json!({
            "reservaId": reservation.as_str(),
            "pasajeroId": session.passenger().id.as_str(),
            "motivoCancelacion": reason,
        });
        let data: Data = self
            .execute("CancelarReserva", CANCEL_RESERVATION, &variables, Some(session))
            .await?;
        let (payload, message) = accepted("cancelarReserva", data.cancelar_reserva)?;

        if let Some(viaje) = payload.reserva.as_ref().map(|r| &r.viaje) {
            tracing::info!(reservation = %reservation, departure = ?summary_departure(viaje).ok(), "reservation cancelled");
        }
        Ok(CancellationReceipt {
            message,
            code: payload.reserva.as_ref().map(|r| r.codigo_reserva.clone()),
            seat_count: payload.reserva.as_ref().map(|r| r.cantidad_asientos),
            status: payload
                .reserva
                .and_then(|r| r.estado)
                .map(|s| ReservationStatus::from_api(&s)),
        })
    }

    /// Rate a completed trip from 1 to 5 stars.
    pub async fn rate_trip(
        &self,
        session: &AuthSession,
        reservation: &ReservationIdentifier,
        score: u8,
        comment: Option<&str>,
    ) -> Result<Option<String>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            calificar_viaje: MutationResult<serde_json::Value>,
        }

        if !(1..=5).contains(&score) {
            return Err(invalid(format!("score must be between 1 and 5, got {score}")));
        }

        let variables = json!({
            "input": {
                "reservaId": reservation.as_str(),
                "puntuacion": score,
                "comentario": comment.map(str::trim).unwrap_or_default(),
            },
            "pasajeroId": session.passenger().id.as_str(),
        });
        let data: Data = self
            .execute("CalificarViaje", RATE_TRIP, &variables, Some(session))
            .await?;
        let (_, message) = accepted("calificarViaje", data.calificar_viaje)?;
        Ok(message)
    }

    /// Exchange credentials for a token. The returned session is not stored;
    /// see [`AuthSession::sign_in`].
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        #[derive(Deserialize)]
        struct Payload {
            token: Option<String>,
            pasajero: Option<PassengerDto>,
        }
        #[derive(Deserialize)]
        struct Data {
            login: MutationResult<Payload>,
        }

        if username.trim().is_empty() || password.is_empty() {
            return Err(invalid("username and password are required".into()));
        }

        let variables = json!({ "input": { "username": username.trim(), "password": password } });
        let data: Data = self.execute("Login", LOGIN, &variables, None).await?;
        let (payload, _) = accepted("login", data.login)?;

        match (payload.token, payload.pasajero) {
            (Some(token), Some(pasajero)) if !token.is_empty() => {
                let profile = PassengerProfile {
                    id: pasajero.id(),
                    first_name: pasajero.nombre,
                    last_name: pasajero.apellido,
                };
                tracing::info!(passenger = %profile.id, "signed in");
                Ok(AuthSession::new(token, profile))
            }
            _ => Err(CoreError::MalformedResponse(
                "login succeeded without token or passenger".into(),
            )),
        }
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration> {
        #[derive(Deserialize)]
        struct Payload {
            pasajero: Option<RegisteredPassengerDto>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            register_pasajero: MutationResult<Payload>,
        }

        form.validate()?;
        let input = RegisterInput {
            nombre: form.first_name.trim(),
            apellido: form.last_name.trim(),
            telefono: form.phone.trim(),
            username: form.username.trim(),
            email: form.email.trim(),
            password: &form.password,
            password_confirm: &form.password_confirm,
            identificacion: form.identification.trim(),
        };

        let data: Data = self
            .execute("RegisterPasajero", REGISTER, &json!({ "input": input }), None)
            .await?;
        let (payload, message) = accepted("registerPasajero", data.register_pasajero)?;
        let pasajero = payload.pasajero.ok_or_else(|| {
            CoreError::MalformedResponse("registration accepted without passenger".into())
        })?;

        Ok(Registration {
            id: PassengerIdentifier::new(pasajero.id.into_string()),
            username: pasajero.username,
            email: pasajero.email,
            message,
        })
    }

    /// Ask the backend to email a reset link. Returns the backend's answer,
    /// which may be a message or a bare flag.
    pub async fn send_password_reset(&self, email: &str) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            send_password_reset: serde_json::Value,
        }

        validate::email(email.trim())?;
        let data: Data = self
            .execute(
                "SendResetPassword",
                SEND_PASSWORD_RESET,
                &json!({ "email": email.trim() }),
                None,
            )
            .await?;

        if data.send_password_reset == serde_json::Value::Bool(false) {
            return Err(CoreError::Rejected("password reset was not sent".into()));
        }
        Ok(data.send_password_reset)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            reset_password: MutationResult<serde_json::Value>,
        }

        if token.trim().is_empty() {
            return Err(invalid("reset token is required".into()));
        }
        validate::password(new_password)?;

        let variables = json!({ "input": { "token": token.trim(), "newPassword": new_password } });
        let data: Data = self
            .execute("ResetPassword", RESET_PASSWORD, &variables, None)
            .await?;
        let (_, message) = accepted("resetPassword", data.reset_password)?;
        Ok(message)
    }
}
