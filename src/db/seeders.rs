//! Demo data for a fresh directory.

use anyhow::{anyhow, Result};
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::hash_password;

/// Demo directory entries:
/// (email, name, specialty, modality, seguro, price, lat, lng)
const DEMO_THERAPISTS: &[(&str, &str, &str, &str, &str, &str, f64, f64)] = &[
    (
        "jorge.gutierrez@demo.terapia",
        "Jorge Gutierrez",
        "Ansiedad",
        "Online",
        "IPS",
        "Gs. 200.000",
        -25.2637,
        -57.5759,
    ),
    (
        "ana.lopez@demo.terapia",
        "Ana López",
        "Depresión",
        "Presencial",
        "Privado",
        "Gs. 180.000",
        -25.2805,
        -57.6359,
    ),
    (
        "carlos.perez@demo.terapia",
        "Carlos Pérez",
        "Parejas",
        "Online",
        "Sin seguro",
        "Gs. 150.000",
        -25.3,
        -57.6,
    ),
];

/// Seed the verified demo therapists when the directory is empty.
///
/// Each profile gets a therapist account with a random password nobody knows,
/// keeping profile ids equal to their owner's user id.
pub async fn seed_demo_therapists(pool: &SqlitePool) -> Result<usize> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM therapists")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "Therapist directory not empty, skipping demo data");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for &(email, name, specialty, modality, seguro, price, lat, lng) in DEMO_THERAPISTS {
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        let password_hash = hash_password(&hex::encode(secret))
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

        let id = sqlx::query("INSERT INTO users (email, password, role) VALUES (?, ?, 'therapist')")
            .bind(email)
            .bind(&password_hash)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO therapists (id, name, specialty, modality, seguro, price, location_lat, location_lng, verified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(specialty)
        .bind(modality)
        .bind(seguro)
        .bind(price)
        .bind(lat)
        .bind(lng)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Seeded {} demo therapists", DEMO_THERAPISTS.len());
    Ok(DEMO_THERAPISTS.len())
}
