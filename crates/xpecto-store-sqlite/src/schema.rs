//! SQL schema for the Xpecto SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id       TEXT PRIMARY KEY,
    google_id         TEXT UNIQUE,              -- NULL for local-only accounts
    email             TEXT NOT NULL UNIQUE,     -- lower-cased
    name              TEXT NOT NULL,
    avatar            TEXT,
    role              TEXT NOT NULL DEFAULT 'user',
    password_hash     TEXT,                     -- argon2 PHC string
    secondary_email   TEXT,
    organization_name TEXT,
    phone             TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    CHECK (role IN ('user', 'admin'))
);

-- Registrations are never deleted. Tier and amount are never updated.
CREATE TABLE IF NOT EXISTS registrations (
    registration_id  TEXT PRIMARY KEY,
    owner_id         TEXT NOT NULL REFERENCES identities(identity_id),
    name             TEXT NOT NULL,
    email            TEXT NOT NULL,
    phone            TEXT NOT NULL,
    organization     TEXT NOT NULL,
    tier             TEXT NOT NULL,
    amount           INTEGER NOT NULL,
    payment_status   TEXT NOT NULL DEFAULT 'pending',
    payment_verified INTEGER NOT NULL DEFAULT 0,
    transaction_id   TEXT,
    notes            TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    CHECK (tier IN ('early_bird', 'regular')),
    CHECK (payment_status IN ('pending', 'completed', 'failed'))
);

-- At most one pending-or-completed registration per owner.
CREATE UNIQUE INDEX IF NOT EXISTS registrations_one_active_idx
    ON registrations(owner_id)
    WHERE payment_status IN ('pending', 'completed');

CREATE INDEX IF NOT EXISTS registrations_owner_idx
    ON registrations(owner_id, created_at);

-- Generic document storage for catalog entities.
CREATE TABLE IF NOT EXISTS catalog (
    kind       TEXT NOT NULL,   -- Entity::KIND
    entity_id  TEXT NOT NULL,
    body_json  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (kind, entity_id)
);

PRAGMA user_version = 1;
";
