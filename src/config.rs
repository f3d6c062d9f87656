use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    /// Base URL of the gateway REST API. Overridable so tests can point the
    /// client at a local mock server.
    pub razorpay_api_url: String,
    pub gateway_timeout: Duration,
    /// How long a PENDING order may hold reserved stock before the sweeper
    /// cancels it and returns the units to inventory.
    pub reservation_ttl: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;
        let razorpay_key_id = env::var("RAZORPAY_KEY_ID")?;
        let razorpay_key_secret = env::var("RAZORPAY_KEY_SECRET")?;
        let razorpay_api_url = env::var("RAZORPAY_API_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
        let gateway_timeout = Duration::from_secs(
            env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        );
        let reservation_ttl = Duration::from_secs(
            env::var("RESERVATION_TTL_MINS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15)
                * 60,
        );
        let cookie_secure = env::var("COOKIE_SECURE")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_api_url,
            gateway_timeout,
            reservation_ttl,
            cookie_secure,
        })
    }
}
