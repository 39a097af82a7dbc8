//! AI pricing fallback.
//!
//! One JSON-only completion per property describing the listing and its
//! constraints, expecting `{audit_metadata, calendar[180]}` back. The payload
//! is validated strictly and never repaired; anything nonconforming sends the
//! builder to the deterministic backstop. Transport retries use bounded
//! exponential backoff with jitter on 429/5xx and stop hard on 401.

use crate::calendar::DayPrice;
use crate::{PricingError, PricingResult};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stayrate_core::{AiConfig, DateRange};
use stayrate_store::Property;
use tracing::{debug, warn};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const PERPLEXITY_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const PERPLEXITY_MODEL: &str = "sonar";

/// Chat-completions client for the pricing prompt.
pub struct AiPricingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Expected top-level payload.
#[derive(Debug, Deserialize)]
struct AiCalendarPayload {
    #[serde(default)]
    #[allow(dead_code)]
    audit_metadata: Option<serde_json::Value>,
    calendar: Vec<AiCalendarDay>,
}

#[derive(Debug, Deserialize)]
struct AiCalendarDay {
    date: NaiveDate,
    /// Base currency units.
    final_suggested_price: f64,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    demand_level: Option<String>,
}

impl AiPricingClient {
    /// Build a client from configuration; OpenAI is preferred, Perplexity is
    /// the alternative. `None` when no provider is configured.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let (endpoint, model, api_key) = if let Some(key) = &config.openai_api_key {
            (OPENAI_ENDPOINT, OPENAI_MODEL, key.clone())
        } else if let Some(key) = &config.perplexity_api_key {
            (PERPLEXITY_ENDPOINT, PERPLEXITY_MODEL, key.clone())
        } else {
            return None;
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .ok()?;

        Some(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Generate the 180-day calendar for a property.
    pub async fn generate_calendar(
        &self,
        property: &Property,
        today: NaiveDate,
    ) -> PricingResult<Vec<DayPrice>> {
        let window = DateRange::pricing_window(today);
        let content = self.complete(&pricing_prompt(property, window)).await?;
        let payload: AiCalendarPayload = serde_json::from_str(&content)
            .map_err(|e| PricingError::AiPayload(format!("not valid calendar JSON: {e}")))?;
        validate_calendar(payload.calendar, window)
    }

    async fn complete(&self, prompt: &str) -> PricingResult<String> {
        let request = ChatRequest {
            model: self.model.as_str(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a short-term rental revenue manager. Respond with a single \
                              JSON object and nothing else."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: ChatResponse = response.json().await.map_err(|e| {
                            PricingError::AiPayload(format!("completion envelope: {e}"))
                        })?;
                        let content = parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .ok_or_else(|| {
                                PricingError::AiPayload("completion had no choices".into())
                            })?;
                        return Ok(content);
                    }
                    if status.as_u16() == 401 {
                        return Err(PricingError::AiProvider(
                            "authentication rejected (401)".into(),
                        ));
                    }
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt >= self.max_attempts {
                        let body = response.text().await.unwrap_or_default();
                        return Err(PricingError::AiProvider(format!("{status}: {body}")));
                    }
                    warn!(%status, attempt, "ai provider throttled, backing off");
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        return Err(PricingError::AiProvider(e.to_string()));
                    }
                    warn!(error = %e, attempt, "ai request failed, backing off");
                }
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

/// Exponential backoff with jitter: 1s, 2s, 4s... plus up to 500ms noise.
fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(1 << attempt.min(5));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..500));
    base + jitter
}

/// The single prompt describing the property and the expected schema.
fn pricing_prompt(property: &Property, window: DateRange) -> String {
    let ceiling = match property.ceiling_price {
        Some(ceiling) => format!("{:.2}", ceiling as f64 / 100.0),
        None => "none".to_string(),
    };
    format!(
        "Price this short-term rental for every night from {from} to {to} (180 nights).\n\
         Property: {ptype} in {city}, {country}; sleeps {capacity}; {surface} m2; amenities: {amenities}.\n\
         Strategy: {strategy}. Base price {base:.2}, floor {floor:.2}, ceiling {ceiling}.\n\
         Minimum stay {min_stay} nights. Weekend markup {weekend}%. \
         Weekly discount {weekly}%, monthly discount {monthly}%.\n\
         Prices are per night in the property's currency, whole amounts preferred, \
         favour endings in 5, 9 or 0 and avoid round numbers like 100.\n\
         Respond with JSON matching exactly:\n\
         {{\"audit_metadata\": {{...}}, \"calendar\": [{{\"date\": \"YYYY-MM-DD\", \
         \"final_suggested_price\": 123.0, \"reasoning\": \"...\", \"demand_level\": \"low|medium|high\"}}]}}\n\
         The calendar must contain exactly 180 entries, one per consecutive date.",
        from = window.from,
        to = window.to,
        ptype = property.property_type,
        city = property.city,
        country = property.country,
        capacity = property.capacity,
        surface = property.surface,
        amenities = property.amenities.join(", "),
        strategy = property.strategy,
        base = property.base_price as f64 / 100.0,
        floor = property.floor_price as f64 / 100.0,
        ceiling = ceiling,
        min_stay = property.min_stay,
        weekend = property.weekend_markup_percent.unwrap_or(0.0),
        weekly = property.weekly_discount_percent.unwrap_or(0.0),
        monthly = property.monthly_discount_percent.unwrap_or(0.0),
    )
}

/// Enforce the 180-entry contract: consecutive dates covering the window,
/// finite positive prices. Anything else rejects the payload wholesale.
fn validate_calendar(
    calendar: Vec<AiCalendarDay>,
    window: DateRange,
) -> PricingResult<Vec<DayPrice>> {
    if calendar.len() != 180 {
        return Err(PricingError::AiPayload(format!(
            "expected 180 calendar entries, got {}",
            calendar.len()
        )));
    }

    let mut days = Vec::with_capacity(180);
    for (index, entry) in calendar.into_iter().enumerate() {
        let expected = window.from + chrono::Duration::days(index as i64);
        if entry.date != expected {
            return Err(PricingError::AiPayload(format!(
                "entry {index} has date {}, expected {expected}",
                entry.date
            )));
        }
        if !entry.final_suggested_price.is_finite() || entry.final_suggested_price <= 0.0 {
            return Err(PricingError::AiPayload(format!(
                "entry {index} has invalid price {}",
                entry.final_suggested_price
            )));
        }
        let demand_spike = entry
            .demand_level
            .as_deref()
            .is_some_and(|level| level.eq_ignore_ascii_case("high"));
        days.push(DayPrice {
            date: entry.date,
            price: (entry.final_suggested_price * 100.0).round() as i64,
            reason: entry
                .reasoning
                .unwrap_or_else(|| "ai suggestion".to_string()),
            demand_spike,
        });
    }

    debug!(days = days.len(), "ai calendar validated");
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateRange {
        DateRange::pricing_window("2025-07-01".parse().unwrap())
    }

    fn full_calendar() -> Vec<AiCalendarDay> {
        window()
            .days()
            .map(|date| AiCalendarDay {
                date,
                final_suggested_price: 125.0,
                reasoning: Some("steady season".into()),
                demand_level: Some("medium".into()),
            })
            .collect()
    }

    #[test]
    fn accepts_a_conforming_calendar() {
        let days = validate_calendar(full_calendar(), window()).unwrap();
        assert_eq!(days.len(), 180);
        assert_eq!(days[0].price, 12500);
        assert!(!days[0].demand_spike);
    }

    #[test]
    fn rejects_wrong_length() {
        let mut calendar = full_calendar();
        calendar.pop();
        assert!(matches!(
            validate_calendar(calendar, window()),
            Err(PricingError::AiPayload(_))
        ));
    }

    #[test]
    fn rejects_date_gaps() {
        let mut calendar = full_calendar();
        calendar[5].date = calendar[6].date;
        assert!(matches!(
            validate_calendar(calendar, window()),
            Err(PricingError::AiPayload(_))
        ));
    }

    #[test]
    fn rejects_non_finite_prices() {
        let mut calendar = full_calendar();
        calendar[0].final_suggested_price = f64::NAN;
        assert!(validate_calendar(calendar, window()).is_err());

        let mut calendar = full_calendar();
        calendar[3].final_suggested_price = -12.0;
        assert!(validate_calendar(calendar, window()).is_err());
    }

    #[test]
    fn high_demand_level_marks_a_spike() {
        let mut calendar = full_calendar();
        calendar[10].demand_level = Some("HIGH".into());
        let days = validate_calendar(calendar, window()).unwrap();
        assert!(days[10].demand_spike);
    }

    #[test]
    fn payload_parse_is_strict_json() {
        let raw = r#"{"audit_metadata": {}, "calendar": "not-a-list"}"#;
        assert!(serde_json::from_str::<AiCalendarPayload>(raw).is_err());
    }
}
