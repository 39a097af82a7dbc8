//! Per-tenant eligibility predicate for the hourly tick.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use stayrate_store::Tenant;
use tracing::warn;

/// Two instants falling in the same UTC wall-clock hour.
fn same_utc_hour(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive() && a.hour() == b.hour()
}

/// Local hour of `now` in the tenant's scheduling timezone; UTC when the
/// stored timezone fails to parse.
pub fn local_hour(tenant: &Tenant, now: DateTime<Utc>) -> u32 {
    match tenant.scheduling_timezone().parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).hour(),
        Err(_) => {
            warn!(
                tenant = %tenant.id,
                timezone = tenant.scheduling_timezone(),
                "invalid tenant timezone, evaluating midnight in UTC"
            );
            now.hour()
        }
    }
}

/// Local civil date of `now` in the tenant's scheduling timezone.
pub fn local_today(tenant: &Tenant, now: DateTime<Utc>) -> chrono::NaiveDate {
    match tenant.scheduling_timezone().parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => now.date_naive(),
    }
}

/// Whether the tick at `now` should process the tenant.
///
/// Enabled, no attempt yet this UTC hour, and either local midnight or a
/// failed previous run at least one hour old. The one-attempt-per-hour gate
/// is what makes a rerun after success a no-op.
pub fn is_eligible(tenant: &Tenant, now: DateTime<Utc>) -> bool {
    if !tenant.auto_pricing.enabled {
        return false;
    }

    if let Some(last_attempt) = tenant.auto_pricing.last_attempt {
        if same_utc_hour(last_attempt, now) {
            return false;
        }
    }

    if local_hour(tenant, now) == 0 {
        return true;
    }

    if tenant.auto_pricing.failed_attempts > 0 {
        if let Some(last_attempt) = tenant.auto_pricing.last_attempt {
            return now - last_attempt >= Duration::hours(1);
        }
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stayrate_store::AutoPricing;
    use std::collections::HashMap;
    use stayrate_core::{Role, SubscriptionStatus};
    use uuid::Uuid;

    fn tenant(auto_pricing: AutoPricing) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            email: "host@example.com".into(),
            role: Role::Admin,
            team_id: None,
            timezone: "Europe/Paris".into(),
            language: "fr".into(),
            currency: "EUR".into(),
            subscription_status: SubscriptionStatus::Active,
            subscription_id: None,
            customer_id: None,
            access_disabled: false,
            banned: false,
            payment_failed: false,
            pms_sync_enabled: false,
            pms_sync_stopped_reason: None,
            auto_pricing,
            revenue_targets: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn disabled_is_never_eligible() {
        let t = tenant(AutoPricing::default());
        // 22:00 UTC in July is midnight in Paris (UTC+2).
        assert!(!is_eligible(&t, utc(2025, 7, 1, 22, 0)));
    }

    #[test]
    fn eligible_at_local_midnight() {
        let t = tenant(AutoPricing {
            enabled: true,
            ..AutoPricing::default()
        });
        assert!(is_eligible(&t, utc(2025, 7, 1, 22, 0)));
        // Midnight UTC is 02:00 in Paris: not midnight locally.
        assert!(!is_eligible(&t, utc(2025, 7, 1, 0, 0)));
    }

    #[test]
    fn explicit_auto_pricing_timezone_wins() {
        let t = tenant(AutoPricing {
            enabled: true,
            timezone: Some("America/New_York".into()),
            ..AutoPricing::default()
        });
        // 04:00 UTC in July is midnight in New York (UTC-4).
        assert!(is_eligible(&t, utc(2025, 7, 1, 4, 0)));
        assert!(!is_eligible(&t, utc(2025, 7, 1, 22, 0)));
    }

    #[test]
    fn rerun_within_the_same_hour_after_success_is_a_noop() {
        let midnight = utc(2025, 7, 1, 22, 0);
        let t = tenant(AutoPricing {
            enabled: true,
            last_attempt: Some(midnight),
            last_successful_run: Some(midnight),
            ..AutoPricing::default()
        });
        assert!(!is_eligible(&t, utc(2025, 7, 1, 22, 40)));
        // Next day's midnight fires again.
        assert!(is_eligible(&t, utc(2025, 7, 2, 22, 0)));
    }

    #[test]
    fn failed_run_retries_after_an_hour() {
        let attempt = utc(2025, 7, 1, 22, 5);
        let t = tenant(AutoPricing {
            enabled: true,
            last_attempt: Some(attempt),
            failed_attempts: 2,
            ..AutoPricing::default()
        });
        // 55 minutes later: too soon.
        assert!(!is_eligible(&t, utc(2025, 7, 1, 23, 0)));
        // Two hours later, outside local midnight: retry window open.
        assert!(is_eligible(&t, utc(2025, 7, 2, 0, 10)));
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let t = tenant(AutoPricing {
            enabled: true,
            timezone: Some("Mars/Olympus".into()),
            ..AutoPricing::default()
        });
        assert!(is_eligible(&t, utc(2025, 7, 1, 0, 30)));
        assert!(!is_eligible(&t, utc(2025, 7, 1, 12, 0)));
    }
}
