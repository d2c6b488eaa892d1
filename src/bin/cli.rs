use sqlx::Row;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use dataset_portal::authz::{PermissionAuthority, Role, SessionContext};
use dataset_portal::db::users;
use dataset_portal::navigation::Navigation;
use dataset_portal::utils::normalize_email;

#[derive(Parser, Debug)]
#[command(author, version, about = "dataset-portal admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Print the role table and each role's combined authority
    Roles,
    /// Check whether a role covers the required role(s)
    Check {
        /// Required role(s); all must be covered unless --any is given
        #[arg(long = "required", required = true, num_args = 1..)]
        required: Vec<String>,
        /// Role held by the session; omit for a session without a role
        #[arg(long)]
        role: Option<String>,
        /// Pass when any one required role is covered
        #[arg(long)]
        any: bool,
    },
    /// Print the sidebar as a given session would see it
    Nav {
        /// Role of the signed-in session
        #[arg(long, conflicts_with = "anonymous")]
        role: Option<String>,
        /// Render for a signed-out visitor
        #[arg(long)]
        anonymous: bool,
        /// Navigation JSON to use instead of NAVIGATION_CONFIG / the built-in sidebar
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Assign a role to an existing account (the only way to create admins)
    SetRole {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let authority = PermissionAuthority::new();
    authority.validate()?;

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::Roles => print_roles(&authority),
        Commands::Check { required, role, any } => {
            let actual = role.as_deref();
            let allowed = if any {
                authority.has_any_permission(&required, actual)
            } else {
                required.iter().all(|r| authority.has_permission(r, actual))
            };
            println!("{}", if allowed { "allowed" } else { "denied" });
            if !allowed {
                std::process::exit(1);
            }
        }
        Commands::Nav { role, anonymous, config } => {
            let navigation = match config {
                Some(path) => Navigation::from_path(&path)?,
                None => Navigation::from_env()?,
            };
            let session = match (anonymous, role) {
                (true, _) => SessionContext::anonymous(),
                (false, Some(raw)) => SessionContext::authenticated(raw.parse::<Role>()?),
                (false, None) => SessionContext::authenticated_without_role(),
            };
            let links = navigation.for_session(&authority, session);
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Commands::SetRole { email, role } => {
            let role = role.parse::<Role>()?;
            let pool = get_pool().await?;
            let user = users::find_by_email(&pool, &normalize_email(&email))
                .await?
                .with_context(|| format!("no account for {email}"))?;
            let updated = users::update_role(&pool, user.id, role).await?;
            println!("{} is now {}", updated.email, updated.role);
        }
    }

    Ok(())
}

fn print_roles(authority: &PermissionAuthority) {
    println!("{:<16} {:<6} {:<10} {}", "Role", "Bit", "Combined", "Hierarchy");
    for role in authority.get_all_role_types() {
        println!(
            "{:<16} {:<6} {:<10} {:?}",
            role.as_str(),
            authority.permission_value_of(role),
            format!("{:#05b}", authority.combined_authority(role)),
            authority.hierarchy_of(role)
        );
    }
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() { desc } else { "unknown" };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Try local ./migrations first (when running from repo root). If that
    // doesn't exist (common in containers where CWD differs), fall back to
    // the crate-local migrations folder determined by CARGO_MANIFEST_DIR.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
