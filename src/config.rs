use std::time::Duration;
use tracing::warn;

/// Tunables for the namespace loader and language session.
///
/// Every knob has a production default matching the site's shipped behavior;
/// `from_env` overrides individual values from `LOCALE_*` environment
/// variables. Unparseable values fall back to the default with a warning
/// rather than failing startup.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Attempts per in-flight load operation (including the first one)
    pub max_retries: u32,

    /// Timeout for a single resource fetch
    pub fetch_timeout: Duration,

    /// Hard ceiling on one `load` call, wrapping retries and fallbacks
    pub load_ceiling: Duration,

    /// Base delay between attempts within one operation (doubles per attempt)
    pub retry_base_delay: Duration,

    /// Cap on the between-attempt delay
    pub retry_max_delay: Duration,

    /// Ceiling on the route batch load inside `ensure_language`
    pub ensure_timeout: Duration,

    /// How often the stuck-entry sweep runs
    pub sweep_period: Duration,

    /// Age past which an in-flight entry is considered stuck and evicted
    pub inflight_max_age: Duration,

    /// Consecutive failures before the cross-call circuit breaker engages
    pub backoff_threshold: u32,

    /// Base cross-call backoff window (doubles per failure past the threshold)
    pub backoff_base: Duration,

    /// Cap on the cross-call backoff window
    pub backoff_max: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            fetch_timeout: Duration::from_secs(10),
            load_ceiling: Duration::from_secs(15),
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(3),
            ensure_timeout: Duration::from_secs(5),
            sweep_period: Duration::from_secs(60),
            inflight_max_age: Duration::from_secs(30),
            backoff_threshold: 3,
            backoff_base: Duration::from_secs(60),
            backoff_max: Duration::from_secs(300),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_retries: env_u32("LOCALE_MAX_RETRIES", defaults.max_retries),
            fetch_timeout: env_duration_ms("LOCALE_FETCH_TIMEOUT_MS", defaults.fetch_timeout),
            load_ceiling: env_duration_ms("LOCALE_LOAD_CEILING_MS", defaults.load_ceiling),
            retry_base_delay: env_duration_ms(
                "LOCALE_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay,
            ),
            retry_max_delay: env_duration_ms("LOCALE_RETRY_MAX_DELAY_MS", defaults.retry_max_delay),
            ensure_timeout: env_duration_ms("LOCALE_ENSURE_TIMEOUT_MS", defaults.ensure_timeout),
            sweep_period: env_duration_ms("LOCALE_SWEEP_PERIOD_MS", defaults.sweep_period),
            inflight_max_age: env_duration_ms(
                "LOCALE_INFLIGHT_MAX_AGE_MS",
                defaults.inflight_max_age,
            ),
            backoff_threshold: env_u32("LOCALE_BACKOFF_THRESHOLD", defaults.backoff_threshold),
            backoff_base: env_duration_ms("LOCALE_BACKOFF_BASE_MS", defaults.backoff_base),
            backoff_max: env_duration_ms("LOCALE_BACKOFF_MAX_MS", defaults.backoff_max),
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{}: invalid value '{}', using default {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    "{}: invalid value '{}', using default {:?}",
                    name, raw, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
