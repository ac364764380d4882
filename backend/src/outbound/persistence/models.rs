//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{processed_events, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub is_author: bool,
    pub is_admin: bool,
    pub status: String,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Insertable struct for recording processed events.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = processed_events)]
pub(crate) struct NewProcessedEventRow<'a> {
    pub idempotency_key: &'a str,
    pub event_type: &'a str,
    pub service_name: &'a str,
    pub payload: Option<&'a serde_json::Value>,
    pub processed_at: DateTime<Utc>,
}
