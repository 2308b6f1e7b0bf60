use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub google_places_api_key: String,
    pub google_places_base_url: String,
    pub ai_search_url: String,
    pub ai_search_api_key: String,
    pub placeholder_image_url: String,
    pub places_radius_meters: u32,
    pub registry_search_radius_km: f64,
    pub geolocation_timeout_secs: u64,
    pub geolocation_max_retries: u32,
    pub adapter_timeout_secs: u64,
    pub booking_timeout_secs: u64,
    pub booking_reason_max_chars: usize,
    pub dedupe_enabled: bool,
    /// Search sessions and booking drafts untouched for this long are dropped.
    pub idle_ttl_secs: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            google_places_api_key: String::new(),
            google_places_base_url: "https://maps.googleapis.com".to_string(),
            ai_search_url: String::new(),
            ai_search_api_key: String::new(),
            placeholder_image_url: "/images/clinic-placeholder.png".to_string(),
            places_radius_meters: 5000,
            registry_search_radius_km: 50.0,
            geolocation_timeout_secs: 30,
            geolocation_max_retries: 0,
            adapter_timeout_secs: 15,
            booking_timeout_secs: 20,
            booking_reason_max_chars: 500,
            dedupe_enabled: false,
            idle_ttl_secs: 1800,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            google_places_api_key: env::var("GOOGLE_PLACES_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("GOOGLE_PLACES_API_KEY not set, places search disabled");
                    String::new()
                }),
            google_places_base_url: env::var("GOOGLE_PLACES_BASE_URL")
                .unwrap_or(defaults.google_places_base_url),
            ai_search_url: env::var("AI_SEARCH_URL")
                .unwrap_or_else(|_| {
                    warn!("AI_SEARCH_URL not set, area search disabled");
                    String::new()
                }),
            ai_search_api_key: env::var("AI_SEARCH_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("AI_SEARCH_API_KEY not set, using empty value");
                    String::new()
                }),
            placeholder_image_url: env::var("PLACEHOLDER_IMAGE_URL")
                .unwrap_or(defaults.placeholder_image_url),
            places_radius_meters: parse_or("PLACES_RADIUS_METERS", defaults.places_radius_meters),
            registry_search_radius_km: parse_or("REGISTRY_SEARCH_RADIUS_KM", defaults.registry_search_radius_km),
            geolocation_timeout_secs: parse_or("GEOLOCATION_TIMEOUT_SECS", defaults.geolocation_timeout_secs),
            geolocation_max_retries: parse_or("GEOLOCATION_MAX_RETRIES", defaults.geolocation_max_retries),
            adapter_timeout_secs: parse_or("ADAPTER_TIMEOUT_SECS", defaults.adapter_timeout_secs),
            booking_timeout_secs: parse_or("BOOKING_TIMEOUT_SECS", defaults.booking_timeout_secs),
            booking_reason_max_chars: parse_or("BOOKING_REASON_MAX_CHARS", defaults.booking_reason_max_chars),
            dedupe_enabled: parse_or("DISCOVERY_DEDUPE_ENABLED", defaults.dedupe_enabled),
            idle_ttl_secs: parse_or("IDLE_TTL_SECS", defaults.idle_ttl_secs),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_places_configured(&self) -> bool {
        !self.google_places_api_key.is_empty() && !self.google_places_base_url.is_empty()
    }

    pub fn is_ai_search_configured(&self) -> bool {
        !self.ai_search_url.is_empty()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
