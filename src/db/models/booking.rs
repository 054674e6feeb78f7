//! Appointment bookings. Append-only, readable by the booking client only.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub client_id: i64,
    /// Not checked against the directory
    pub therapist_id: i64,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub therapist_id: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

impl Booking {
    /// Record a booking for `client_id`. No conflict detection. Returns the new id.
    pub async fn create(
        db: &SqlitePool,
        client_id: i64,
        req: &CreateBookingRequest,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO bookings (client_id, therapist_id, date, time) VALUES (?, ?, ?, ?)",
        )
        .bind(client_id)
        .bind(req.therapist_id)
        .bind(&req.date)
        .bind(&req.time)
        .execute(db)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Bookings owned by `client_id`, in insertion order
    pub async fn list_for_client(db: &SqlitePool, client_id: i64) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, client_id, therapist_id, date, time FROM bookings WHERE client_id = ? ORDER BY id",
        )
        .bind(client_id)
        .fetch_all(db)
        .await
    }
}
