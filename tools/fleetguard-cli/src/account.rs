use anyhow::{Context, Result};
use clap::Args;
use fleetguard_core::api::RegistrationForm;
use fleetguard_core::session::AuthSession;

use crate::App;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    /// International format, e.g. +573001234567
    #[arg(long)]
    phone: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    /// National id document number
    #[arg(long)]
    identification: String,
    #[arg(long, env = "FLEETGUARD_PASSWORD")]
    password: String,
    #[arg(long, env = "FLEETGUARD_PASSWORD_CONFIRM")]
    password_confirm: String,
}

impl From<RegisterArgs> for RegistrationForm {
    fn from(args: RegisterArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
            username: args.username,
            email: args.email,
            password: args.password,
            password_confirm: args.password_confirm,
            identification: args.identification,
        }
    }
}

pub async fn login(app: &App, username: &str, password: &str) -> Result<()> {
    let session = app.api.login(username, password).await.context("Login failed")?;
    session
        .sign_in(app.store.as_ref())
        .await
        .context("Failed to store session")?;

    println!("Welcome, {}", session.passenger().full_name());
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    AuthSession::sign_out(app.store.as_ref())
        .await
        .context("Failed to clear session")?;
    println!("Signed out");
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    let form = RegistrationForm::from(args);
    let registration = app.api.register(&form).await.context("Registration failed")?;

    println!(
        "Account {} created for {} (passenger {})",
        registration.username, registration.email, registration.id
    );
    if let Some(message) = registration.message {
        println!("{message}");
    }
    Ok(())
}

pub async fn forgot_password(app: &App, email: &str) -> Result<()> {
    let answer = app
        .api
        .send_password_reset(email)
        .await
        .context("Could not request a password reset")?;

    match answer.as_str() {
        Some(message) => println!("{message}"),
        None => println!("If {email} belongs to an account, a reset link is on its way"),
    }
    Ok(())
}

pub async fn reset_password(app: &App, token: &str, new_password: &str) -> Result<()> {
    let message = app
        .api
        .reset_password(token, new_password)
        .await
        .context("Password reset failed")?;
    println!("{}", message.as_deref().unwrap_or("Password updated"));
    Ok(())
}
