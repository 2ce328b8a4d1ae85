use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process;

use ecflow_cli::{init_tracing, run_server, Config};
use ecflow_organizations::{
    MemberCreateInput, MemberRole, OrganizationCreateInput, OrganizationSettings,
    OrganizationStorage, PlanType,
};
use ecflow_storage::init_with_path;

#[derive(Parser)]
#[command(name = "ecflow")]
#[command(about = "Ecflow - engineering change management server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
        #[arg(long, help = "Address to bind (overrides HOST)")]
        host: Option<IpAddr>,
        #[arg(long, help = "SQLite database file (overrides ECFLOW_DATABASE_PATH)")]
        database: Option<PathBuf>,
    },
    /// Apply database migrations and exit
    Migrate {
        #[arg(long, help = "SQLite database file (overrides ECFLOW_DATABASE_PATH)")]
        database: Option<PathBuf>,
    },
    /// Provision organizations and members
    #[command(subcommand)]
    Org(OrgCommands),
}

#[derive(Subcommand)]
enum OrgCommands {
    /// Create an organization
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subdomain: String,
        #[arg(long, value_enum, default_value = "starter")]
        plan: PlanArg,
        #[arg(long, help = "Require change review board approval where requested")]
        enable_crb: bool,
        #[arg(long, help = "SQLite database file (overrides ECFLOW_DATABASE_PATH)")]
        database: Option<PathBuf>,
    },
    /// Add a member to an organization
    AddMember {
        #[arg(long, help = "Organization id")]
        org: String,
        #[arg(long, help = "User id supplied by the identity provider")]
        user: String,
        #[arg(long, value_enum, default_value = "requestor")]
        role: RoleArg,
        #[arg(long)]
        department: Option<String>,
        #[arg(long, help = "SQLite database file (overrides ECFLOW_DATABASE_PATH)")]
        database: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlanArg {
    Starter,
    Professional,
    Enterprise,
}

impl From<PlanArg> for PlanType {
    fn from(plan: PlanArg) -> Self {
        match plan {
            PlanArg::Starter => PlanType::Starter,
            PlanArg::Professional => PlanType::Professional,
            PlanArg::Enterprise => PlanType::Enterprise,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Admin,
    EngineeringManager,
    Engineer,
    Requestor,
    Viewer,
}

impl From<RoleArg> for MemberRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => MemberRole::Admin,
            RoleArg::EngineeringManager => MemberRole::EngineeringManager,
            RoleArg::Engineer => MemberRole::Engineer,
            RoleArg::Requestor => MemberRole::Requestor,
            RoleArg::Viewer => MemberRole::Viewer,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let mut config = Config::from_env().context("Invalid configuration")?;

    match command {
        Commands::Serve {
            port,
            host,
            database,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(database) = database {
                config.database_path = database;
            }
            run_server(config).await?;
        }
        Commands::Migrate { database } => {
            let path = database.unwrap_or(config.database_path);
            init_with_path(Some(path.clone()))
                .await
                .with_context(|| format!("Failed to migrate {}", path.display()))?;
            println!("{} Database migrated at {}", "✓".green(), path.display());
        }
        Commands::Org(org_command) => handle_org_command(org_command, config).await?,
    }

    Ok(())
}

async fn handle_org_command(command: OrgCommands, config: Config) -> anyhow::Result<()> {
    match command {
        OrgCommands::Create {
            name,
            subdomain,
            plan,
            enable_crb,
            database,
        } => {
            let organizations = open_organizations(database, config).await?;
            let settings = OrganizationSettings {
                enable_change_review_board: enable_crb,
                ..Default::default()
            };

            let org = organizations
                .create_organization(OrganizationCreateInput {
                    name,
                    subdomain,
                    plan_type: Some(plan.into()),
                    settings: Some(settings),
                })
                .await
                .context("Failed to create organization")?;

            println!(
                "{} Created organization {} ({})",
                "✓".green(),
                org.name.bold(),
                org.id
            );
        }
        OrgCommands::AddMember {
            org,
            user,
            role,
            department,
            database,
        } => {
            let organizations = open_organizations(database, config).await?;
            organizations
                .get_organization(&org)
                .await
                .with_context(|| format!("Organization {} not found", org))?;

            let member = organizations
                .add_member(
                    &org,
                    MemberCreateInput {
                        user_id: user,
                        role: Some(role.into()),
                        department,
                    },
                )
                .await
                .context("Failed to add member")?;

            println!(
                "{} Added {} to {} as {:?}",
                "✓".green(),
                member.user_id.bold(),
                member.org_id,
                member.role
            );
        }
    }

    Ok(())
}

async fn open_organizations(
    database: Option<PathBuf>,
    config: Config,
) -> anyhow::Result<OrganizationStorage> {
    let path = database.unwrap_or(config.database_path);
    let pool = init_with_path(Some(path.clone()))
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(OrganizationStorage::new(pool))
}
