//! Administrative command-line entry point for the lmsd engine.

use anyhow::{Context, bail};
use argon2::Argon2;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lmsd::{
    config::AppConfig,
    db::{
        self,
        CourseDraft,
        NewAccount,
        apply_migrations,
        establish_pool,
    },
    models::{PricingType, Role},
    nm::{HttpNmTransport, publish_course},
    users::hash_password,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Database connection string or path (overrides configuration)
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a user together with its role-detail row
    CreateUser {
        email: String,
        username: String,
        password: String,
        /// superadmin, admin, or student
        #[arg(long, default_value = "student")]
        role: String,
        /// Display name recorded on the role-detail row
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Create a course in the catalogue
    CreateCourse {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Price in whole currency units; implies a paid course
        #[arg(long)]
        price: Option<i32>,
    },
    /// Enroll a student (by custom ID) in a course
    Enroll { custom_id: String, course_id: i32 },
    /// Publish a course to the NM platform
    PublishCourse { course_id: i32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load().context("failed to load configuration")?;
    if let Some(database) = cli.database {
        cfg.database = database;
    }

    let pool = establish_pool(&cfg.database)
        .await
        .context("failed to build connection pool")?;
    let mut conn = pool.get().await.context("failed to get db connection")?;
    apply_migrations(&mut conn, &cfg.database)
        .await
        .context("failed to apply migrations")?;

    match cli.command {
        Command::Migrate => {
            info!("migrations applied");
        }
        Command::CreateUser { email, username, password, role, full_name } => {
            let Some(role) = Role::parse(&role) else {
                bail!("unknown role {role:?}; expected superadmin, admin, or student");
            };
            let hashed = hash_password(&Argon2::default(), &password)
                .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
            let (user, detail) = db::create_user(
                &mut conn,
                &NewAccount {
                    email: &email,
                    username: &username,
                    password_hash: &hashed,
                    role,
                    full_name: full_name.as_deref().unwrap_or(&username),
                    mobile_number: None,
                    image_path: None,
                },
            )
            .await?;
            info!(email = %user.email, custom_id = %detail.custom_id, "user created");
        }
        Command::CreateCourse { name, description, price } => {
            let course = db::create_course(
                &mut conn,
                &CourseDraft {
                    course_name: &name,
                    category_id: None,
                    description: description.as_deref(),
                    requirements: None,
                    overview: None,
                    pricing: if price.is_some() { PricingType::Paid } else { PricingType::Free },
                    price_amount: price.unwrap_or(0),
                    course_image: None,
                    course_video: None,
                    created_by: None,
                },
            )
            .await?;
            info!(
                course_id = course.id,
                code = %course.course_unique_code,
                "course created"
            );
        }
        Command::Enroll { custom_id, course_id } => {
            let enrollment = db::enroll(&mut conn, &custom_id, course_id).await?;
            info!(
                custom_id = %enrollment.custom_id,
                course_id = enrollment.course_id,
                deadline = %enrollment.completion_deadline,
                "enrolled"
            );
        }
        Command::PublishCourse { course_id } => {
            let Some(nm_config) = cfg.nm_client_config() else {
                bail!("NM base URL and token must be configured to publish");
            };
            let transport = HttpNmTransport::new(&nm_config)?;
            let ack = publish_course(&mut conn, &transport, course_id).await?;
            info!(course_id, reference_id = %ack.reference_id, "published to NM");
        }
    }
    Ok(())
}
