use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use myway_cli::seeder::{self, CoursesPerOrg, MembersPerOrg, SeedConfig};
use myway_models::{OrgId, OrgRole, UserId};

#[derive(Parser)]
#[command(name = "myway-cli")]
#[command(about = "MyWay CLI - Administrative tools for MyWay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    CreateUser {
        /// Display name shown to other members
        #[arg(short = 'n', long)]
        display_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create an organization owned by an existing user
    CreateOrg {
        /// Organization name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email of the user who becomes its organizer
        #[arg(short = 'o', long)]
        organizer_email: Option<String>,
    },
    /// Seed the database with fake organizations, members, and courses
    Seed {
        /// Number of organizations to create
        #[arg(short = 'o', long, default_value = "3")]
        orgs: usize,

        /// Number of teachers per organization
        #[arg(long, default_value = "3")]
        teachers: usize,

        /// Number of students per organization
        #[arg(long, default_value = "30")]
        students: usize,

        /// Number of courses per organization
        #[arg(long, default_value = "4")]
        courses: usize,

        /// Number of modules per course
        #[arg(long, default_value = "3")]
        modules: usize,
    },
    /// Clear all seeded data
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateUser {
            display_name,
            email,
            password,
        } => handle_create_user(&pool, display_name, email, password).await,
        Commands::CreateOrg {
            name,
            organizer_email,
        } => handle_create_org(&pool, name, organizer_email).await,
        Commands::Seed {
            orgs,
            teachers,
            students,
            courses,
            modules,
        } => handle_seed(&pool, orgs, teachers, students, courses, modules).await,
        Commands::ClearSeed => handle_clear_seed(&pool).await,
    }
}

async fn handle_create_user(
    pool: &sqlx::postgres::PgPool,
    display_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let display_name = display_name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Display name")
            .interact_text()
            .expect("Failed to read display name")
    });

    let email = email.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Email address")
            .interact_text()
            .expect("Failed to read email")
    });

    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .expect("Failed to read password")
    });

    match create_user(pool, &display_name, &email, &password).await {
        Ok(user_id) => {
            println!("\n✅ User created successfully!");
            println!("   Id: {}", user_id);
            println!("   Email: {}", email.trim().to_lowercase());
            println!("   Name: {}", display_name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating user: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_create_org(
    pool: &sqlx::postgres::PgPool,
    name: Option<String>,
    organizer_email: Option<String>,
) {
    let name = name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Organization name")
            .interact_text()
            .expect("Failed to read organization name")
    });

    let organizer_email = organizer_email.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Organizer email")
            .interact_text()
            .expect("Failed to read organizer email")
    });

    match create_org(pool, &name, &organizer_email).await {
        Ok(org_id) => {
            println!("\n✅ Organization created successfully!");
            println!("   Id: {}", org_id);
            println!("   Name: {}", name.trim());
            println!("   Organizer: {}", organizer_email);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating organization: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed(
    pool: &sqlx::postgres::PgPool,
    orgs: usize,
    teachers: usize,
    students: usize,
    courses: usize,
    modules: usize,
) {
    let config = SeedConfig::new(orgs)
        .with_members(MembersPerOrg { teachers, students })
        .with_courses(CoursesPerOrg {
            count: courses,
            modules_per_course: modules,
        });

    if let Err(e) = seeder::seed_all(pool, config).await {
        eprintln!("\n❌ Error seeding database: {}", e);
        std::process::exit(1);
    }
}

async fn handle_clear_seed(pool: &sqlx::postgres::PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        std::process::exit(1);
    }
}

async fn create_user(
    db: &sqlx::postgres::PgPool,
    display_name: &str,
    email: &str,
    password: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    let hashed_password = myway_core::hash_password(password)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (display_name, email, password_hash)
         VALUES ($1, $2, $3)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(display_name.trim())
    .bind(email.trim().to_lowercase())
    .bind(&hashed_password)
    .fetch_optional(db)
    .await?;

    user_id.ok_or_else(|| "User with this email already exists".into())
}

/// Creates the organization and its organizer membership in one transaction.
async fn create_org(
    db: &sqlx::postgres::PgPool,
    name: &str,
    organizer_email: &str,
) -> Result<OrgId, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    let organizer = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE email = $1")
        .bind(organizer_email.trim().to_lowercase())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or("No user with that email")?;

    let org_id = sqlx::query_scalar::<_, OrgId>(
        "INSERT INTO organizations (name)
         VALUES ($1)
         ON CONFLICT (name) DO NOTHING
         RETURNING id",
    )
    .bind(name.trim())
    .fetch_optional(&mut *tx)
    .await?;

    let org_id = match org_id {
        Some(id) => id,
        None => {
            tx.rollback().await?;
            return Err("Organization with this name already exists".into());
        }
    };

    sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
        .bind(organizer)
        .bind(org_id)
        .bind(OrgRole::Organizer)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(org_id)
}
