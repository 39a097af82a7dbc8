//! Process-wide configuration loaded from the environment.
//!
//! Payment credentials are mandatory: the process refuses to start without
//! them rather than discovering the gap on the first billing mutation.

use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the StayRate process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the (external) transport layer binds to.
    pub port: u16,

    /// Frontend origin, used in payment-provider redirect URLs.
    pub frontend_url: String,

    /// PostgreSQL connection string.
    pub database_url: String,

    /// Fallback IANA timezone for tenants without an explicit one.
    pub default_timezone: String,

    /// AI pricing provider credentials and limits.
    pub ai: AiConfig,

    /// Payment provider credentials. Mandatory.
    pub stripe: StripeConfig,

    /// Auto-pricing scheduler tuning.
    pub scheduler: SchedulerConfig,
}

/// AI pricing provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenAI-compatible API key, preferred when present.
    pub openai_api_key: Option<String>,

    /// Perplexity API key, used when no OpenAI key is configured.
    pub perplexity_api_key: Option<String>,

    /// Per-request deadline for completion calls.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Attempt cap for the bounded exponential backoff on 429/5xx.
    pub max_attempts: u32,
}

impl AiConfig {
    /// Whether any AI provider is configured at all.
    pub fn is_configured(&self) -> bool {
        self.openai_api_key.is_some() || self.perplexity_api_key.is_some()
    }
}

/// Payment provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Price id billed per parent unit.
    pub price_parent_id: String,
    /// Price id billed per child unit.
    pub price_child_id: String,
    pub product_parent_id: Option<String>,
    pub product_child_id: Option<String>,
}

/// Auto-pricing scheduler tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum tenants processed concurrently per tick.
    pub max_concurrency: usize,

    /// Deadline for a single property's calendar generation.
    #[serde(with = "duration_secs")]
    pub per_property_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_property_timeout: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests inject maps instead of mutating the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let stripe_secret = lookup("STRIPE_SECRET_KEY")
            .ok_or_else(|| CoreError::Fatal("STRIPE_SECRET_KEY is not set".into()))?;
        let webhook_secret = lookup("STRIPE_WEBHOOK_SECRET")
            .ok_or_else(|| CoreError::Fatal("STRIPE_WEBHOOK_SECRET is not set".into()))?;
        // The parent price id historically shipped under a "_PRINCIPAL_" name.
        let price_parent_id = lookup("STRIPE_PRICE_PARENT_ID")
            .or_else(|| lookup("STRIPE_PRICE_PRINCIPAL_ID"))
            .ok_or_else(|| {
                CoreError::Fatal("STRIPE_PRICE_PARENT_ID / STRIPE_PRICE_PRINCIPAL_ID is not set".into())
            })?;
        let price_child_id = lookup("STRIPE_PRICE_CHILD_ID")
            .ok_or_else(|| CoreError::Fatal("STRIPE_PRICE_CHILD_ID is not set".into()))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| CoreError::Fatal(format!("PORT is not a valid port: {raw}")))?,
            None => 3000,
        };

        Ok(Self {
            port,
            frontend_url: lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".into()),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgresql://localhost/stayrate".into()),
            default_timezone: lookup("DEFAULT_TIMEZONE").unwrap_or_else(|| "Europe/Paris".into()),
            ai: AiConfig {
                openai_api_key: lookup("OPENAI_API_KEY"),
                perplexity_api_key: lookup("PERPLEXITY_API_KEY"),
                request_timeout: Duration::from_secs(120),
                max_attempts: 4,
            },
            stripe: StripeConfig {
                secret_key: stripe_secret,
                webhook_secret,
                price_parent_id,
                price_child_id,
                product_parent_id: lookup("STRIPE_PRODUCT_PARENT_ID"),
                product_child_id: lookup("STRIPE_PRODUCT_CHILD_ID"),
            },
            scheduler: SchedulerConfig::default(),
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("STRIPE_PRICE_PARENT_ID", "price_parent"),
            ("STRIPE_PRICE_CHILD_ID", "price_child"),
            ("OPENAI_API_KEY", "sk-ai"),
            ("PORT", "8080"),
        ])
    }

    #[test]
    fn loads_complete_configuration() {
        let vars = full_env();
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.stripe.price_parent_id, "price_parent");
        assert!(config.ai.is_configured());
    }

    #[test]
    fn missing_stripe_credentials_are_fatal() {
        let mut vars = full_env();
        vars.remove("STRIPE_SECRET_KEY");
        let err = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CoreError::Fatal(_)));
    }

    #[test]
    fn principal_price_alias_is_accepted() {
        let mut vars = full_env();
        vars.remove("STRIPE_PRICE_PARENT_ID");
        vars.insert("STRIPE_PRICE_PRINCIPAL_ID".into(), "price_main".into());
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.stripe.price_parent_id, "price_main");
    }

    #[test]
    fn invalid_port_is_fatal() {
        let mut vars = full_env();
        vars.insert("PORT".into(), "not-a-port".into());
        let err = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CoreError::Fatal(_)));
    }
}
