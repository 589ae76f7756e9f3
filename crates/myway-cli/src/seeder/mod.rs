//! Fake-data seeding for local development.

mod courses;
mod models;
mod organizations;
mod users;

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sqlx::PgPool;

pub use models::{CoursesPerOrg, MembersPerOrg, SeedConfig};

/// Every seeded user's email ends with this domain.
pub const SEED_EMAIL_DOMAIN: &str = "seed.myway.test";

/// Password shared by all seeded accounts.
pub const SEED_PASSWORD: &str = "password123";

/// Seeds organizations, members, courses with modules, materials and
/// assignments, and enrollments.
pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("\n🌱 Seeding MyWay database");
    println!(
        "   {} organizations, {} users each, {} courses each\n",
        config.num_orgs,
        config.total_users_per_org(),
        config.courses_per_org.count
    );

    let password_hash = myway_core::hash_password(SEED_PASSWORD)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;
    let run_tag = run_tag();

    let org_ids = organizations::seed_organizations(db, config.num_orgs, &run_tag).await?;
    let members =
        users::seed_members(db, &org_ids, &config.members_per_org, &password_hash, &run_tag)
            .await?;
    courses::seed_courses(db, &members, &config.courses_per_org).await?;

    println!("\n✅ Seeding complete in {:?}", start_time.elapsed());
    println!("   All seeded accounts use the password '{}'", SEED_PASSWORD);

    Ok(())
}

/// Removes seeded organizations (with their courses) and then seeded users.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("\n🧹 Clearing seeded data");

    organizations::clear_organizations(db).await?;
    users::clear_users(db).await?;

    println!("\n✅ Cleared in {:?}", start_time.elapsed());
    Ok(())
}

/// Distinguishes repeated seed runs so unique names never collide.
fn run_tag() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{:x}", secs % 0xfffff)
}
