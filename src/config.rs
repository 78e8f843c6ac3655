//! Application configuration loaded from environment variables (and `.env`).
//!
//! Rocket's own settings (address, port, limits) are left to its figment and
//! the usual `ROCKET_*` variables.

use crate::utils::error::{AppError, AppResult};
use std::env;
use std::str::FromStr;

/// JWT settings shared with the request guards through managed state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

/// Booking flow settings.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// How long a seat selection stays held for its user.
    pub seat_hold_minutes: i64,
    /// Upper bound on seats in one selection.
    pub max_seats_per_booking: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Admin account created at start-up when it does not exist yet.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    /// A random password is generated (and logged once) when unset.
    pub password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let jwt_secret = required(&lookup, "JWT_SECRET")?;

        let bootstrap_admin = lookup("BOOTSTRAP_ADMIN_USERNAME")
            .filter(|name| !name.trim().is_empty())
            .map(|username| BootstrapAdmin {
                username,
                password: lookup("BOOTSTRAP_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            });
        if let Some(admin) = &bootstrap_admin {
            check_bootstrap_admin(admin)?;
        }

        Ok(AppConfig {
            database_url,
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiration_hours: parsed(&lookup, "JWT_EXPIRATION_HOURS", 24)?,
            },
            booking: BookingConfig {
                seat_hold_minutes: parsed(&lookup, "SEAT_HOLD_MINUTES", 10)?,
                max_seats_per_booking: parsed(&lookup, "MAX_SEATS_PER_BOOKING", 8)?,
            },
            bootstrap_admin,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::ConfigError(format!("{} must be set", key)))
}

// Same bounds as user registration, so start-up fails with a readable message
fn check_bootstrap_admin(admin: &BootstrapAdmin) -> AppResult<()> {
    let name_len = admin.username.chars().count();
    if !(3..=64).contains(&name_len) {
        return Err(AppError::ConfigError(
            "BOOTSTRAP_ADMIN_USERNAME must be 3 to 64 characters".into(),
        ));
    }
    if let Some(password) = &admin.password {
        let password_len = password.chars().count();
        if !(8..=72).contains(&password_len) {
            return Err(AppError::ConfigError(
                "BOOTSTRAP_ADMIN_PASSWORD must be 8 to 72 characters".into(),
            ));
        }
    }
    Ok(())
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://root@localhost/tickets"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.auth.jwt_expiration_hours, 24);
        assert_eq!(config.booking.seat_hold_minutes, 10);
        assert_eq!(config.booking.max_seats_per_booking, 8);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "mysql://root@localhost/tickets",
        )]))
        .unwrap_err();

        assert_eq!(err.to_string(), "Configuration error: JWT_SECRET must be set");
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://root@localhost/tickets"),
            ("JWT_SECRET", "secret"),
            ("SEAT_HOLD_MINUTES", "ten"),
        ]))
        .unwrap_err();

        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn reads_bootstrap_admin() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://root@localhost/tickets"),
            ("JWT_SECRET", "secret"),
            ("BOOTSTRAP_ADMIN_USERNAME", "root_admin"),
        ]))
        .unwrap();

        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.username, "root_admin");
        assert!(admin.password.is_none());
    }

    #[test]
    fn short_bootstrap_password_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://root@localhost/tickets"),
            ("JWT_SECRET", "secret"),
            ("BOOTSTRAP_ADMIN_USERNAME", "root_admin"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "short"),
        ]))
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: BOOTSTRAP_ADMIN_PASSWORD must be 8 to 72 characters"
        );
    }

    #[test]
    fn short_bootstrap_username_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://root@localhost/tickets"),
            ("JWT_SECRET", "secret"),
            ("BOOTSTRAP_ADMIN_USERNAME", "ab"),
        ]))
        .unwrap_err();

        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
