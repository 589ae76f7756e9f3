//! Course, module, material, assignment and enrollment seeding.

use std::collections::HashMap;

use fake::Fake;
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use myway_models::{CourseId, ModuleId, OrgId, OrgRole, UserId};
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{CourseSeed, CoursesPerOrg};

const SUBJECTS: [&str; 8] = [
    "Biology",
    "Chemistry",
    "Physics",
    "Mathematics",
    "History",
    "Literature",
    "Economics",
    "Computer Science",
];

/// Courses are authored round-robin by the organization's staff.
pub fn generate_courses(
    staff_by_org: &HashMap<OrgId, Vec<UserId>>,
    courses_per_org: usize,
) -> Vec<CourseSeed> {
    staff_by_org
        .par_iter()
        .filter(|(_, staff)| !staff.is_empty())
        .flat_map(|(&org_id, staff)| {
            (0..courses_per_org)
                .map(|i| {
                    let subject = SUBJECTS[i % SUBJECTS.len()];
                    let prefix: String = subject.chars().take(3).collect();
                    CourseSeed {
                        org_id,
                        code: format!("{}{}", prefix.to_uppercase(), 101 + i),
                        title: format!("{} {}", subject, 101 + i),
                        description: Sentence(6..12).fake(),
                        created_by: staff[i % staff.len()],
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Seeds courses (each with modules, one document material per module and
/// one assignment) and enrolls every student of the owning organization.
/// Returns the number of courses created.
pub async fn seed_courses(
    db: &PgPool,
    members: &[(UserId, OrgId, OrgRole)],
    courses: &CoursesPerOrg,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let mut staff_by_org: HashMap<OrgId, Vec<UserId>> = HashMap::new();
    let mut students_by_org: HashMap<OrgId, Vec<UserId>> = HashMap::new();
    for &(user_id, org_id, role) in members {
        let bucket = if OrgRole::STAFF.contains(&role) {
            &mut staff_by_org
        } else {
            &mut students_by_org
        };
        bucket.entry(org_id).or_default().push(user_id);
    }

    let seeds = generate_courses(&staff_by_org, courses.count);
    println!(
        "📘 Seeding {} courses ({} modules each)...",
        seeds.len(),
        courses.modules_per_course
    );

    let mut tx = db.begin().await?;
    let mut enrollments = 0usize;

    for seed in &seeds {
        let course_id = insert_course(&mut tx, seed).await?;
        insert_modules(&mut tx, course_id, courses.modules_per_course).await?;
        insert_assignment(&mut tx, course_id, seed.created_by).await?;

        if let Some(students) = students_by_org.get(&seed.org_id) {
            enrollments += enroll_students(&mut tx, course_id, students).await?;
        }
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} courses and {} enrollments in {:?}",
        seeds.len(),
        enrollments,
        start_time.elapsed()
    );

    Ok(seeds.len())
}

async fn insert_course(
    tx: &mut Transaction<'_, Postgres>,
    seed: &CourseSeed,
) -> Result<CourseId, Box<dyn std::error::Error>> {
    let id = sqlx::query_scalar::<_, CourseId>(
        r#"INSERT INTO courses (org_id, code, title, description, created_by)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(seed.org_id)
    .bind(&seed.code)
    .bind(&seed.title)
    .bind(&seed.description)
    .bind(seed.created_by)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

async fn insert_modules(
    tx: &mut Transaction<'_, Postgres>,
    course_id: CourseId,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    for position in 0..count {
        let topic: String = Word().fake();
        let module_id = sqlx::query_scalar::<_, ModuleId>(
            r#"INSERT INTO course_modules (course_id, title, position)
               VALUES ($1, $2, $3)
               RETURNING id"#,
        )
        .bind(course_id)
        .bind(format!("Unit {}: {}", position + 1, topic))
        .bind(position as i32)
        .fetch_one(&mut **tx)
        .await?;

        let content: String = Paragraph(4..8).fake();
        sqlx::query(
            r#"INSERT INTO materials (module_id, course_id, title, material_type, content, status)
               VALUES ($1, $2, $3, 'document', $4, 'ready')"#,
        )
        .bind(module_id)
        .bind(course_id)
        .bind(format!("{} reading", topic))
        .bind(content)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn insert_assignment(
    tx: &mut Transaction<'_, Postgres>,
    course_id: CourseId,
    created_by: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let instructions: String = Sentence(8..16).fake();
    sqlx::query(
        r#"INSERT INTO assignments (course_id, title, instructions, due_date, max_points, created_by)
           VALUES ($1, 'Problem set 1', $2, NOW() + INTERVAL '14 days', 100, $3)"#,
    )
    .bind(course_id)
    .bind(instructions)
    .bind(created_by)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn enroll_students(
    tx: &mut Transaction<'_, Postgres>,
    course_id: CourseId,
    students: &[UserId],
) -> Result<usize, Box<dyn std::error::Error>> {
    let result = sqlx::query(
        r#"INSERT INTO enrollments (user_id, course_id)
           SELECT user_id, $2 FROM UNNEST($1::uuid[]) AS user_id
           ON CONFLICT (user_id, course_id) DO NOTHING"#,
    )
    .bind(students)
    .bind(course_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn test_course_codes_are_unique_per_org() {
        let org_id = OrgId::from(Uuid::new_v4());
        let staff = vec![UserId::from(Uuid::new_v4()), UserId::from(Uuid::new_v4())];
        let staff_by_org = HashMap::from([(org_id, staff.clone())]);

        let courses = generate_courses(&staff_by_org, 10);

        let codes: HashSet<_> = courses.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes.len(), 10);
        assert!(courses.iter().all(|c| staff.contains(&c.created_by)));
    }

    #[test]
    fn test_orgs_without_staff_get_no_courses() {
        let staff_by_org = HashMap::from([(OrgId::from(Uuid::new_v4()), Vec::new())]);
        assert!(generate_courses(&staff_by_org, 3).is_empty());
    }
}
