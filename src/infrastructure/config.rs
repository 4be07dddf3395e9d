use crate::domain::value_objects::MatchSettings;

/// Service configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `sqlite:` URL; unset keeps matches in memory
    pub database_url: Option<String>,
    /// 0 disables the turn timer
    pub turn_timeout_secs: u64,
    /// 0 disables the match timer
    pub match_duration_secs: u64,
    pub bot_think_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            database_url: None,
            turn_timeout_secs: 30,
            match_duration_secs: 15 * 60,
            bot_think_ms: 800,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                // Ensure path has sqlite: prefix
                if url.starts_with("sqlite:") {
                    url
                } else {
                    format!("sqlite:{}", url)
                }
            });

        Self {
            port: env_or("PORT", defaults.port),
            database_url,
            turn_timeout_secs: env_or("TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            match_duration_secs: env_or("MATCH_DURATION_SECS", defaults.match_duration_secs),
            bot_think_ms: env_or("BOT_THINK_MS", defaults.bot_think_ms),
        }
    }

    /// Settings for a new match using the configured timers
    pub fn match_settings(&self, hand_size: Option<u8>) -> MatchSettings {
        let secs_to_ms = |secs: u64| (secs > 0).then(|| secs as i64 * 1000);

        MatchSettings {
            turn_timeout_ms: secs_to_ms(self.turn_timeout_secs),
            match_duration_ms: secs_to_ms(self.match_duration_secs),
            bot_think_ms: self.bot_think_ms,
            ..hand_size.map(MatchSettings::new).unwrap_or_default()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, value);
            default
        }),
        Err(_) => default,
    }
}
