//! User accounts, roles and subscription tiers.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::therapist::TherapistProfile;

/// Account roles. Every permission decision is keyed on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    /// Books appointments
    Client,
    /// Owns a directory profile, can upgrade their subscription
    Therapist,
    /// Approves therapists
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Therapist => "therapist",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "therapist" => Ok(Role::Therapist),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Subscription tier. `basic -> premium` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Premium,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub role: Role,
    pub sub_tier: SubscriptionTier,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

impl User {
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, password, role, sub_tier FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, password, role, sub_tier FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Insert a user and, for therapists, their placeholder profile.
    ///
    /// Both rows are written in one transaction, so a therapist account never
    /// exists without its profile. A duplicate email surfaces as the store's
    /// unique-constraint error. Returns the new user id.
    pub async fn create(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = db.begin().await?;

        let id = sqlx::query("INSERT INTO users (email, password, role) VALUES (?, ?, ?)")
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        if role == Role::Therapist {
            TherapistProfile::insert_placeholder(&mut *tx, id).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Set the tier to premium. Returns the number of rows matched.
    pub async fn upgrade_subscription(db: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET sub_tier = ? WHERE id = ?")
            .bind(SubscriptionTier::Premium)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_role(db: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}
