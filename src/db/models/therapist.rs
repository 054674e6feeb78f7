//! Therapist directory: public profiles, discovery filters and verification.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// Display name given to a profile created at registration
pub const PLACEHOLDER_NAME: &str = "Nuevo Terapeuta";

/// Query values that mean "do not filter on this field"
const ALL_SENTINELS: &[&str] = &["Todos", "Todas", ""];

/// How a therapist sees clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    Online,
    Presencial,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Online => "Online",
            Modality::Presencial => "Presencial",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TherapistProfile {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    /// `Online`, `Presencial`, or empty until the therapist edits the profile
    pub modality: String,
    pub seguro: String,
    pub price: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub verified: bool,
}

/// Raw `GET /therapists` query string
#[derive(Debug, Default, Deserialize)]
pub struct TherapistQuery {
    pub seguro: Option<String>,
    pub modality: Option<String>,
    pub specialty: Option<String>,
    pub verified: Option<String>,
    pub id: Option<String>,
}

/// Parsed directory filter. `None` fields are not filtered on.
#[derive(Debug, Clone, PartialEq)]
pub struct TherapistFilter {
    pub seguro: Option<String>,
    pub modality: Option<String>,
    pub specialty: Option<String>,
    pub verified: Option<bool>,
    pub id: Option<i64>,
}

impl Default for TherapistFilter {
    /// Public discovery: verified profiles only
    fn default() -> Self {
        Self {
            seguro: None,
            modality: None,
            specialty: None,
            verified: Some(true),
            id: None,
        }
    }
}

fn is_sentinel(value: &str) -> bool {
    ALL_SENTINELS.contains(&value.trim())
}

fn text_filter(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_sentinel(v))
}

fn parse_verified(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("Invalid value for 'verified': {}", value)),
    }
}

impl TryFrom<TherapistQuery> for TherapistFilter {
    type Error = String;

    fn try_from(query: TherapistQuery) -> Result<Self, Self::Error> {
        // Omitted `verified` keeps the public default; an explicit sentinel lifts it.
        let verified = match query.verified {
            None => Some(true),
            Some(v) if is_sentinel(&v) => None,
            Some(v) => Some(parse_verified(&v)?),
        };

        let id = match text_filter(query.id) {
            None => None,
            Some(v) => Some(
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| format!("Invalid value for 'id': {}", v))?,
            ),
        };

        Ok(Self {
            seguro: text_filter(query.seguro),
            modality: text_filter(query.modality),
            specialty: text_filter(query.specialty),
            verified,
            id,
        })
    }
}

/// Fields a therapist may change on their own profile
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    pub modality: Modality,
    #[serde(default)]
    pub seguro: String,
    #[serde(default)]
    pub price: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub therapist_id: i64,
}

const PROFILE_COLUMNS: &str =
    "id, name, specialty, modality, seguro, price, location_lat, location_lng, verified";

impl TherapistProfile {
    /// Insert the empty, unverified profile that accompanies a therapist account
    pub async fn insert_placeholder(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO therapists (id, name, specialty, modality, seguro, price, location_lat, location_lng, verified)
            VALUES (?, ?, '', '', '', '', 0, 0, 0)
            "#,
        )
        .bind(id)
        .bind(PLACEHOLDER_NAME)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<TherapistProfile>, sqlx::Error> {
        let sql = format!("SELECT {} FROM therapists WHERE id = ?", PROFILE_COLUMNS);
        let profile = sqlx::query_as(&sql).bind(id).fetch_optional(db).await?;
        Ok(profile)
    }

    /// List profiles matching every set field of the filter, ordered by id
    pub async fn list(db: &SqlitePool, filter: &TherapistFilter) -> Result<Vec<TherapistProfile>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM therapists WHERE 1 = 1", PROFILE_COLUMNS));

        if let Some(verified) = filter.verified {
            query.push(" AND verified = ").push_bind(verified);
        }
        if let Some(seguro) = &filter.seguro {
            query.push(" AND seguro = ").push_bind(seguro.clone());
        }
        if let Some(modality) = &filter.modality {
            query.push(" AND modality = ").push_bind(modality.clone());
        }
        if let Some(specialty) = &filter.specialty {
            query.push(" AND specialty = ").push_bind(specialty.clone());
        }
        if let Some(id) = filter.id {
            query.push(" AND id = ").push_bind(id);
        }
        query.push(" ORDER BY id");

        let profiles = query.build_query_as().fetch_all(db).await?;
        Ok(profiles)
    }

    /// Overwrite the editable fields. Returns the number of rows matched.
    pub async fn update_profile(
        db: &SqlitePool,
        id: i64,
        update: &UpdateProfileRequest,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE therapists
            SET name = ?, specialty = ?, modality = ?, seguro = ?, price = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.specialty)
        .bind(update.modality.as_str())
        .bind(&update.seguro)
        .bind(&update.price)
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark a profile verified. Approving twice matches the row again.
    pub async fn approve(db: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE therapists SET verified = 1 WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM therapists")
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}
