//! Petstore CLI - account administration
//!
//! Usage:
//!   petstore seed
//!   petstore users list [--limit N] [--offset N]
//!   petstore users activate <email>
//!   petstore users deactivate <email>
//!   petstore config check
//!
//! The store and settings come from the same environment variables the
//! server reads (or the TOML file named by `PETSTORE_CONFIG`).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use petstore_api::auth::{hash_password, validate_password_policy};
use petstore_api::connect_store;
use petstore_core::{AppConfig, CredentialStore, NewUser, Role, RoleSet, User};

#[derive(Parser)]
#[command(name = "petstore")]
#[command(about = "Petstore account administration CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default client and manager accounts
    Seed,
    /// Inspect and manage accounts
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Configuration utilities
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List accounts, oldest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Allow an account to authenticate again
    Activate { email: String },
    /// Refuse every token of an account until reactivated
    Deactivate { email: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate configuration without starting the server
    Check,
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("PETSTORE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petstore_core=warn,petstore_api=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config().context("Failed to load configuration")?;

    match cli.command {
        Commands::Config {
            action: ConfigAction::Check,
        } => {
            config.validate()?;
            println!("Configuration OK (store backend: {:?})", config.database.backend);
        }
        Commands::Seed => {
            let store = connect_store(&config.database).await?;
            seed(store.as_ref()).await?;
        }
        Commands::Users { action } => {
            let store = connect_store(&config.database).await?;
            match action {
                UsersAction::List { limit, offset } => {
                    list_users(store.as_ref(), limit, offset).await?
                }
                UsersAction::Activate { email } => set_active(store.as_ref(), &email, true).await?,
                UsersAction::Deactivate { email } => {
                    set_active(store.as_ref(), &email, false).await?
                }
            }
        }
    }

    Ok(())
}

/// Default accounts: (email, password, first name, last name, roles)
const SEED_ACCOUNTS: &[(&str, &str, &str, &str, &[Role])] = &[
    ("client@example.com", "ClientPassword123", "Client", "Example", &[Role::Client]),
    ("manager@example.com", "ManagerPassword123", "Manager", "Example", &[Role::Manager]),
];

async fn seed(store: &dyn CredentialStore) -> anyhow::Result<()> {
    for &(email, password, first_name, last_name, roles) in SEED_ACCOUNTS {
        if store.find_user_by_email(email).await?.is_some() {
            println!("Skipping {email}: already exists");
            continue;
        }

        if let Err(message) = validate_password_policy(password) {
            bail!("Seed password for {email} is invalid: {message}");
        }

        let user = store
            .create_user(NewUser {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password_hash: hash_password(password)?,
                roles: RoleSet::new(roles.iter().copied())?,
            })
            .await?;

        tracing::info!(user_id = %user.id, roles = %user.roles, "Seeded account");
        println!("Created {} ({}) with roles {}", user.email, user.id, user.roles);
    }
    Ok(())
}

async fn list_users(store: &dyn CredentialStore, limit: i64, offset: i64) -> anyhow::Result<()> {
    let users = store.list_users(limit.clamp(1, 100), offset.max(0)).await?;
    if users.is_empty() {
        println!("No accounts");
        return Ok(());
    }

    println!("{:<36}  {:<32}  {:<16}  ACTIVE", "ID", "EMAIL", "ROLES");
    for user in &users {
        print_user(user);
    }
    Ok(())
}

async fn set_active(store: &dyn CredentialStore, email: &str, is_active: bool) -> anyhow::Result<()> {
    let Some(user) = store.find_user_by_email(email).await? else {
        bail!("No account for {email}");
    };

    let Some(updated) = store.set_user_active(user.id, is_active).await? else {
        bail!("Account {} disappeared during update", user.id);
    };

    tracing::info!(user_id = %updated.id, is_active, "Account status changed");
    print_user(&updated);
    Ok(())
}

fn print_user(user: &User) {
    println!(
        "{:<36}  {:<32}  {:<16}  {}",
        user.id.to_string(),
        user.email,
        user.roles.to_string(),
        user.is_active
    );
}
