use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use entity::users;
use migration::{Migrator, MigratorTrait};
use platform_authn::build_mailer;
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use tracing::info;
use yamdb_server::{AppConfig, AppState, ServeConfig, serve};

#[derive(Parser, Debug)]
#[command(name = "yamdb", version, about = "Review catalog for titles, reviews and comments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Create a user with full admin rights, or promote an existing one.
    CreateAdmin(CreateAdminCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// Roll back everything and re-apply.
    Reset,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[derive(Args, Debug)]
struct CreateAdminCommand {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate(action) => migrate(action).await,
        Command::CreateAdmin(cmd) => create_admin(cmd).await,
    }
}

async fn setup_pool(settings: &DatabaseSettings) -> Result<DbPool> {
    connect(settings).await.context("failed to connect to the database")
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = AppConfig::load()?;
    let pool = setup_pool(&config.database).await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let mailer = build_mailer(&config.mail).context("failed to set up mail delivery")?;
    let state = AppState::new(pool, config, mailer);
    serve(ServeConfig::new(cmd.bind), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        bail!(
            "{} pending migrations detected; run `yamdb migrate up` or pass --allow-dirty",
            pending.len()
        );
    }
    Ok(())
}

async fn migrate(action: MigrateCommand) -> Result<()> {
    let pool = setup_pool(&DatabaseSettings::from_env()).await?;
    match action {
        MigrateCommand::Up => {
            Migrator::up(&pool, None).await?;
            info!("database migrations applied");
        }
        MigrateCommand::Down => {
            Migrator::down(&pool, Some(1)).await?;
            info!("most recent migration rolled back");
        }
        MigrateCommand::Reset => {
            Migrator::reset(&pool).await?;
            Migrator::up(&pool, None).await?;
            info!("database reset and migrations re-applied");
        }
    }
    Ok(())
}

async fn create_admin(cmd: CreateAdminCommand) -> Result<()> {
    let pool = setup_pool(&DatabaseSettings::from_env()).await?;
    ensure_migrations(&pool, false).await?;
    let username = cmd.username.clone();

    let existing = users::Entity::find()
        .filter(users::Column::Username.eq(cmd.username.as_str()))
        .one(&pool)
        .await?;
    let mut active = match existing {
        Some(user) => user.into_active_model(),
        None => users::ActiveModel {
            username: Set(cmd.username.clone()),
            email: Set(cmd.email.clone()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            bio: Set(String::new()),
            is_active: Set(true),
            date_joined: Set(Utc::now().fixed_offset()),
            ..Default::default()
        },
    };
    active.email = Set(cmd.email);
    active.role = Set(users::Role::Admin);
    active.is_staff = Set(true);
    active.is_superuser = Set(true);
    active
        .save(&pool)
        .await
        .context("failed to store admin user")?;
    info!(%username, "admin user ready");
    Ok(())
}
