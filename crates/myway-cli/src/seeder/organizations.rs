//! Organization seeding.

use fake::Fake;
use fake::faker::address::en::CityName;
use myway_models::OrgId;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::SEED_EMAIL_DOMAIN;
use super::models::OrgSeed;

/// Organization names are unique, so each carries its index.
pub fn generate_organizations(count: usize, run_tag: &str) -> Vec<OrgSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let city: String = CityName().fake();
            OrgSeed {
                name: format!("{} Academy {}-{}", city, run_tag, i + 1),
            }
        })
        .collect()
}

pub async fn seed_organizations(
    db: &PgPool,
    count: usize,
    run_tag: &str,
) -> Result<Vec<OrgId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} organizations...", count);

    let orgs = generate_organizations(count, run_tag);
    let mut tx = db.begin().await?;

    const BATCH_SIZE: usize = 500;
    let mut all_ids = Vec::with_capacity(orgs.len());
    for chunk in orgs.chunks(BATCH_SIZE) {
        all_ids.extend(insert_organizations_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} organizations in {:?}",
        all_ids.len(),
        start_time.elapsed()
    );

    Ok(all_ids)
}

async fn insert_organizations_chunk(
    tx: &mut Transaction<'_, Postgres>,
    orgs: &[OrgSeed],
) -> Result<Vec<OrgId>, Box<dyn std::error::Error>> {
    if orgs.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=orgs.len()).map(|i| format!("(${})", i)).collect();
    let query = format!(
        "INSERT INTO organizations (name) VALUES {} RETURNING id",
        placeholders.join(", ")
    );

    let mut q = sqlx::query_scalar(&query);
    for org in orgs {
        q = q.bind(&org.name);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

/// Deletes organizations whose members are all seeded users. Courses and
/// everything under them cascade.
pub async fn clear_organizations(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded organizations...");

    let seeded_pattern = format!("%@{}", SEED_EMAIL_DOMAIN);
    let result = sqlx::query(
        r#"DELETE FROM organizations o
           WHERE EXISTS (
               SELECT 1 FROM org_memberships om
               JOIN users u ON u.id = om.user_id
               WHERE om.org_id = o.id AND u.email LIKE $1
           )
           AND NOT EXISTS (
               SELECT 1 FROM org_memberships om
               JOIN users u ON u.id = om.user_id
               WHERE om.org_id = o.id AND u.email NOT LIKE $1
           )"#,
    )
    .bind(&seeded_pattern)
    .execute(db)
    .await?
    .rows_affected();

    println!(
        "   ✓ Deleted {} organizations in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}
