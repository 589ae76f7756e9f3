//! User and membership seeding.
//!
//! Each seeded user belongs to exactly one organization. Emails use the
//! seed domain so `clear-seed` can find them again.

use fake::Fake;
use fake::faker::name::en::*;
use myway_models::{OrgId, OrgRole, UserId};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::SEED_EMAIL_DOMAIN;
use super::models::{MembersPerOrg, UserSeed};

/// One organizer plus the configured teachers and students per organization.
pub fn generate_members(
    org_ids: &[OrgId],
    members: &MembersPerOrg,
    password_hash: &str,
    run_tag: &str,
) -> Vec<UserSeed> {
    org_ids
        .par_iter()
        .enumerate()
        .flat_map(|(org_idx, &org_id)| {
            let roles = std::iter::once(OrgRole::Organizer)
                .chain(std::iter::repeat_n(OrgRole::Teacher, members.teachers))
                .chain(std::iter::repeat_n(OrgRole::Student, members.students));

            roles
                .enumerate()
                .map(|(user_idx, role)| {
                    generate_user(org_id, role, org_idx, user_idx, password_hash, run_tag)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn generate_user(
    org_id: OrgId,
    role: OrgRole,
    org_idx: usize,
    user_idx: usize,
    password_hash: &str,
    run_tag: &str,
) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    let email = format!(
        "{}.{}+{}{}{}@{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        role.as_str().to_lowercase(),
        run_tag,
        org_idx * 10_000 + user_idx,
        SEED_EMAIL_DOMAIN
    );

    UserSeed {
        display_name: format!("{} {}", first_name, last_name),
        email,
        password_hash: password_hash.to_string(),
        org_id,
        role,
    }
}

/// Seeds users and their memberships; returns `(user, org, role)` triples.
pub async fn seed_members(
    db: &PgPool,
    org_ids: &[OrgId],
    members: &MembersPerOrg,
    password_hash: &str,
    run_tag: &str,
) -> Result<Vec<(UserId, OrgId, OrgRole)>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let users = generate_members(org_ids, members, password_hash, run_tag);
    println!(
        "👥 Seeding {} users (1 organizer, {} teachers, {} students per organization)...",
        users.len(),
        members.teachers,
        members.students
    );

    let mut tx = db.begin().await?;

    // 3 params per user
    const BATCH_SIZE: usize = 1000;
    let mut seeded = Vec::with_capacity(users.len());

    for chunk in users.chunks(BATCH_SIZE) {
        let ids = insert_users_chunk(&mut tx, chunk).await?;
        seeded.extend(
            ids.into_iter()
                .zip(chunk.iter())
                .map(|(id, user)| (id, user.org_id, user.role)),
        );
    }

    for chunk in seeded.chunks(BATCH_SIZE) {
        insert_memberships_chunk(&mut tx, chunk).await?;
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} users with memberships in {:?}",
        seeded.len(),
        start_time.elapsed()
    );

    Ok(seeded)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO users (display_name, email, password_hash) VALUES ");

    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let param_idx = i * 3;
        query.push_str(&format!(
            "(${}, ${}, ${})",
            param_idx + 1,
            param_idx + 2,
            param_idx + 3
        ));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q
            .bind(&user.display_name)
            .bind(&user.email)
            .bind(&user.password_hash);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

async fn insert_memberships_chunk(
    tx: &mut Transaction<'_, Postgres>,
    memberships: &[(UserId, OrgId, OrgRole)],
) -> Result<(), Box<dyn std::error::Error>> {
    if memberships.is_empty() {
        return Ok(());
    }

    let mut query = String::from("INSERT INTO org_memberships (user_id, org_id, role) VALUES ");

    for i in 0..memberships.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let param_idx = i * 3;
        query.push_str(&format!(
            "(${}, ${}, ${})",
            param_idx + 1,
            param_idx + 2,
            param_idx + 3
        ));
    }

    query.push_str(" ON CONFLICT (user_id, org_id) DO NOTHING");

    let mut q = sqlx::query(&query);
    for (user_id, org_id, role) in memberships {
        q = q.bind(user_id).bind(org_id).bind(role);
    }

    q.execute(&mut **tx).await?;
    Ok(())
}

/// Deletes every user on the seed domain.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let result = sqlx::query("DELETE FROM users WHERE email LIKE $1")
        .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_each_org_gets_one_organizer() {
        let orgs = vec![OrgId::from(Uuid::new_v4()), OrgId::from(Uuid::new_v4())];
        let members = MembersPerOrg {
            teachers: 2,
            students: 5,
        };

        let users = generate_members(&orgs, &members, "hash", "t1");

        assert_eq!(users.len(), 16);
        for org_id in &orgs {
            let organizers = users
                .iter()
                .filter(|u| u.org_id == *org_id && u.role == OrgRole::Organizer)
                .count();
            assert_eq!(organizers, 1);
        }
        assert!(users.iter().all(|u| u.email.ends_with(SEED_EMAIL_DOMAIN)));
    }
}
