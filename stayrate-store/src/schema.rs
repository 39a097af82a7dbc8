//! Schema bootstrap executed at startup.

use crate::{Store, StoreResult};
use tracing::debug;

/// Idempotent DDL covering every StayRate table.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tenants (
    id UUID PRIMARY KEY,
    email VARCHAR NOT NULL UNIQUE,
    role VARCHAR NOT NULL DEFAULT 'admin',
    team_id UUID,
    timezone VARCHAR NOT NULL DEFAULT 'Europe/Paris',
    language VARCHAR NOT NULL DEFAULT 'fr',
    currency VARCHAR(3) NOT NULL DEFAULT 'EUR',
    subscription_status VARCHAR NOT NULL DEFAULT 'none',
    subscription_id VARCHAR,
    customer_id VARCHAR,
    access_disabled BOOLEAN NOT NULL DEFAULT FALSE,
    banned BOOLEAN NOT NULL DEFAULT FALSE,
    payment_failed BOOLEAN NOT NULL DEFAULT FALSE,
    pms_sync_enabled BOOLEAN NOT NULL DEFAULT FALSE,
    pms_sync_stopped_reason VARCHAR,
    auto_pricing_enabled BOOLEAN NOT NULL DEFAULT FALSE,
    auto_pricing_timezone VARCHAR,
    auto_pricing_last_attempt TIMESTAMPTZ,
    auto_pricing_last_successful_run TIMESTAMPTZ,
    auto_pricing_failed_attempts INTEGER NOT NULL DEFAULT 0,
    revenue_targets JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_tenants_team_id ON tenants(team_id);
CREATE INDEX IF NOT EXISTS idx_tenants_customer_id ON tenants(customer_id);

CREATE TABLE IF NOT EXISTS properties (
    id UUID PRIMARY KEY,
    team_id UUID NOT NULL,
    owner_id UUID NOT NULL,
    address VARCHAR NOT NULL,
    city VARCHAR NOT NULL,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    country VARCHAR NOT NULL,
    property_type VARCHAR NOT NULL,
    capacity INTEGER NOT NULL,
    surface DOUBLE PRECISION NOT NULL,
    amenities JSONB NOT NULL DEFAULT '[]',
    strategy VARCHAR NOT NULL DEFAULT 'Équilibré',
    floor_price BIGINT NOT NULL,
    base_price BIGINT NOT NULL,
    ceiling_price BIGINT,
    min_stay INTEGER NOT NULL DEFAULT 1,
    max_stay INTEGER,
    weekly_discount_percent DOUBLE PRECISION,
    monthly_discount_percent DOUBLE PRECISION,
    weekend_markup_percent DOUBLE PRECISION,
    status VARCHAR NOT NULL DEFAULT 'active',
    pms_id VARCHAR,
    pms_type VARCHAR,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_properties_team_id ON properties(team_id);
CREATE INDEX IF NOT EXISTS idx_properties_owner_id ON properties(owner_id);
CREATE INDEX IF NOT EXISTS idx_properties_pms_id ON properties(pms_id);

CREATE TABLE IF NOT EXISTS property_groups (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    name VARCHAR NOT NULL,
    sync_prices BOOLEAN NOT NULL DEFAULT FALSE,
    main_property_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_property_groups_owner_id ON property_groups(owner_id);

CREATE TABLE IF NOT EXISTS group_properties (
    group_id UUID NOT NULL REFERENCES property_groups(id) ON DELETE CASCADE,
    property_id UUID NOT NULL,
    PRIMARY KEY (group_id, property_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_group_properties_property
ON group_properties(property_id);

CREATE TABLE IF NOT EXISTS price_overrides (
    property_id UUID NOT NULL,
    date DATE NOT NULL,
    price BIGINT NOT NULL,
    is_locked BOOLEAN NOT NULL DEFAULT FALSE,
    reason TEXT NOT NULL DEFAULT '',
    updated_by VARCHAR NOT NULL DEFAULT '',
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (property_id, date)
);

CREATE TABLE IF NOT EXISTS bookings (
    id UUID PRIMARY KEY,
    property_id UUID NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    price_per_night BIGINT,
    revenue BIGINT,
    channel VARCHAR NOT NULL DEFAULT 'direct',
    guest_name VARCHAR,
    status VARCHAR NOT NULL DEFAULT 'confirmé',
    pms_booking_id VARCHAR,
    pricing_method VARCHAR NOT NULL DEFAULT 'manuelle',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_bookings_property_id ON bookings(property_id);
CREATE INDEX IF NOT EXISTS idx_bookings_dates ON bookings(start_date, end_date);
CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_pms_mirror
ON bookings(property_id, pms_booking_id) WHERE pms_booking_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS integrations (
    user_id UUID NOT NULL,
    kind VARCHAR NOT NULL,
    credentials JSONB NOT NULL,
    connected_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_sync TIMESTAMPTZ,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, kind)
);

CREATE TABLE IF NOT EXISTS property_logs (
    id BIGSERIAL PRIMARY KEY,
    property_id UUID NOT NULL,
    user_id UUID NOT NULL,
    user_email VARCHAR NOT NULL,
    action VARCHAR NOT NULL,
    changes JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_property_logs_property_id ON property_logs(property_id);

CREATE TABLE IF NOT EXISTS system_cache (
    key VARCHAR PRIMARY KEY,
    data JSONB NOT NULL,
    language VARCHAR,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS used_listing_ids (
    listing_id VARCHAR PRIMARY KEY,
    user_id UUID NOT NULL,
    source VARCHAR NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS webhook_events (
    event_id VARCHAR PRIMARY KEY,
    event_type VARCHAR NOT NULL,
    processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

impl Store {
    /// Create every table and index if missing. Safe to run on every boot.
    pub async fn initialize_schema(&self) -> StoreResult<()> {
        debug!("initializing store schema");
        sqlx::raw_sql(SCHEMA_SQL).execute(self.pool()).await?;
        Ok(())
    }
}
