//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations exactly; Diesel uses them for
//! compile-time query validation and type-safe SQL generation. Regenerate
//! with `diesel print-schema` when migrations change.

diesel::table! {
    /// User accounts table.
    ///
    /// Owned by the CRUD layer; the core reads it for authentication and
    /// writes only `status` and `last_active_at`.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Login email address, unique.
        email -> Varchar,
        /// Optional profile display name.
        username -> Nullable<Varchar>,
        /// Whether the account has authored works.
        is_author -> Bool,
        /// Whether the account holds administrative rights.
        is_admin -> Bool,
        /// Moderation status: NORMAL, SUSPENDED, or BANNED.
        status -> Varchar,
        /// Last observed activity, maintained by the activity consumer.
        last_active_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Processed-event records backing the idempotency guard.
    ///
    /// The primary key on `idempotency_key` is what makes concurrent
    /// duplicate inserts resolve to a unique violation instead of a second
    /// row.
    processed_events (idempotency_key) {
        /// Globally unique key for the logical operation.
        idempotency_key -> Varchar,
        /// Event type label, e.g. UserActivity.
        event_type -> Varchar,
        /// Which service processed the event.
        service_name -> Varchar,
        /// Optional opaque payload kept for debugging.
        payload -> Nullable<Jsonb>,
        /// When processing completed.
        processed_at -> Timestamptz,
    }
}
