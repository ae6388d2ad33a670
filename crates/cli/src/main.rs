use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use council_core::auth::grant_admin;
use council_core::config::AppConfig;
use council_core::db;
use council_core::identity::{ensure_user, find_user_by_email, issue_session};
use council_core::media::LocalBlobStore;
use council_core::query::QueryContext;
use council_core::rankings::{RankBadge, load_rankings};
use council_core::schema::AdminRole;
use council_core::seed::{apply_seed, load_seed_file};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "council")]
#[command(about = "Council transparency site backend", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "council.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// Load a YAML fixture into the database
    Seed {
        #[arg(long)]
        file: PathBuf,
    },
    /// Export JSON Schemas for the public records
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Manage admin roles
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Manage sign-in sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Print the member leaderboards
    Rankings {
        /// Rows per leaderboard (default: `listing.top_liked_limit` from config)
        #[arg(long)]
        top: Option<usize>,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files (default: ./schemas)
    Export {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Grant an admin role to a user, creating the user if needed
    Grant {
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Admin)]
        role: RoleArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RoleArg {
    /// Manages site content
    Admin,
    /// Also grants admin roles to others
    #[value(name = "superAdmin")]
    SuperAdmin,
}

impl From<RoleArg> for AdminRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => AdminRole::Admin,
            RoleArg::SuperAdmin => AdminRole::SuperAdmin,
        }
    }
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Issue a bearer token for an existing user
    Issue {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve => council_web::start_server(config).await,
        Commands::Seed { file } => seed(&config, &file),
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Admin { command } => match command {
            AdminCommands::Grant { email, role } => admin_grant(&config, &email, role.into()),
        },
        Commands::Session { command } => match command {
            SessionCommands::Issue { email } => session_issue(&config, &email),
        },
        Commands::Rankings { top } => {
            let top = top.unwrap_or(config.listing.top_liked_limit);
            print_rankings(&config, top)
        }
    }
}

fn seed(config: &AppConfig, file: &Path) -> Result<()> {
    let conn = db::open(&config.database.path)?;
    let fixture = load_seed_file(file)?;
    let report = apply_seed(&conn, &fixture)?;
    println!(
        "Seeded {} members, {} questions ({} responses), {} news, {} slides, {} faqs, {} users",
        report.members,
        report.questions,
        report.responses,
        report.news,
        report.slides,
        report.faqs,
        report.users
    );
    Ok(())
}

fn write_schema<T: schemars::JsonSchema>(out_dir: &Path, name: &str) -> Result<()> {
    let schema = schema_for!(T);
    let json = serde_json::to_string_pretty(&schema)?;
    fs::write(out_dir.join(format!("{name}.schema.json")), json)?;
    Ok(())
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    use council_core::schema::*;

    fs::create_dir_all(&out_dir)?;
    write_schema::<CouncilMember>(&out_dir, "CouncilMember")?;
    write_schema::<EnrichedQuestion>(&out_dir, "EnrichedQuestion")?;
    write_schema::<QuestionDetail>(&out_dir, "QuestionDetail")?;
    write_schema::<QuestionPage>(&out_dir, "QuestionPage")?;
    write_schema::<CursorPage>(&out_dir, "CursorPage")?;
    write_schema::<News>(&out_dir, "News")?;
    write_schema::<SlideshowSlide>(&out_dir, "SlideshowSlide")?;
    write_schema::<FaqGroup>(&out_dir, "FaqGroup")?;
    write_schema::<ContactSubmission>(&out_dir, "ContactSubmission")?;
    write_schema::<LikeState>(&out_dir, "LikeState")?;
    write_schema::<council_core::rankings::Rankings>(&out_dir, "Rankings")?;
    write_schema::<council_core::list_view::QuestionListState>(&out_dir, "QuestionListState")?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

fn admin_grant(config: &AppConfig, email: &str, role: AdminRole) -> Result<()> {
    let conn = db::open(&config.database.path)?;
    ensure_user(&conn, email, None)?;
    let admin = grant_admin(&conn, email, role, None)?;
    println!("Granted {} to {email} (user {})", admin.role, admin.user_id);
    Ok(())
}

fn session_issue(config: &AppConfig, email: &str) -> Result<()> {
    let conn = db::open(&config.database.path)?;
    let user = find_user_by_email(&conn, email)?.with_context(|| format!("no user with email {email}"))?;
    let token = issue_session(&conn, &user.id, config.listing.session_ttl_hours)?;
    println!("{token}");
    Ok(())
}

fn format_day(ms: i64) -> Result<String> {
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)?;
    Ok(at.format(format_description!("[year]-[month]-[day]"))?)
}

fn print_rankings(config: &AppConfig, top: usize) -> Result<()> {
    let conn = db::open(&config.database.path)?;
    let blobs = LocalBlobStore::new(config.storage.public_base_url.clone());
    let rankings = load_rankings(&QueryContext::new(&conn, &blobs, None), top)?;

    println!("Questions: {}", rankings.total_questions);
    println!("\n# Questions asked");
    for (i, member) in rankings.regular.iter().take(top).enumerate() {
        println!("{} {} ({})", RankBadge::for_rank(i + 1), member.name, member.question_count);
    }

    println!("\n# Likes received");
    for (i, member) in rankings.like_leaders.iter().take(top).enumerate() {
        println!("{} {} ({})", RankBadge::for_rank(i + 1), member.name, member.like_total);
    }

    if !rankings.chairpersons.is_empty() {
        println!("\n# Chair");
        for member in &rankings.chairpersons {
            let position = member.position.as_deref().unwrap_or_default();
            println!("{position} {} ({})", member.name, member.question_count);
        }
    }

    println!("\n# Parties");
    for party in &rankings.party_stats {
        println!(
            "{}: {} members, {} questions, {} likes",
            party.party, party.member_count, party.question_count, party.like_total
        );
    }

    println!("\n# Most liked");
    for (i, question) in rankings.top_liked_questions.iter().enumerate() {
        println!(
            "{} {} [{}] {} ({} likes)",
            RankBadge::for_rank(i + 1),
            format_day(question.question.session_date)?,
            question.member_name,
            question.question.title,
            question.like_count
        );
    }
    Ok(())
}
