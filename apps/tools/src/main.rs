use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use shared::domain::{AppearanceLength, Location, Slug};
use storage::{AppearanceTarget, NewAppearance, NewEvent, NewTalk, NewWorkshop, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/site.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateEvent {
        slug: String,
        name: String,
        /// RFC 3339, e.g. 2024-09-12T09:00:00Z
        start_date: DateTime<Utc>,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        country: String,
    },
    CreateTalk {
        slug: String,
        title: String,
        #[arg(long)]
        abstract_file: PathBuf,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        slides: Option<String>,
    },
    CreateWorkshop {
        slug: String,
        title: String,
        #[arg(long)]
        abstract_file: PathBuf,
        #[arg(long)]
        slides: Option<String>,
    },
    #[command(group(ArgGroup::new("target").args(["talk", "workshop"])))]
    AddAppearance {
        event: String,
        date: DateTime<Utc>,
        #[arg(long)]
        talk: Option<String>,
        #[arg(long)]
        workshop: Option<String>,
        /// short, medium or long
        #[arg(long, default_value = "medium")]
        length: AppearanceLength,
        #[arg(long)]
        recording: Option<String>,
    },
}

fn read_abstract(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateEvent {
            slug,
            name,
            start_date,
            city,
            state,
            country,
        } => {
            let event_id = storage
                .create_event(&NewEvent {
                    slug: Slug::new(slug),
                    name,
                    start_date,
                    location: Location {
                        city,
                        state,
                        country,
                    },
                })
                .await?;
            println!("created event_id={}", event_id.0);
        }
        Command::CreateTalk {
            slug,
            title,
            abstract_file,
            tags,
            slides,
        } => {
            let talk_id = storage
                .create_talk(&NewTalk {
                    slug: Slug::new(slug),
                    title,
                    abstract_md: read_abstract(&abstract_file)?,
                    tags,
                    slides,
                })
                .await?;
            println!("created talk_id={}", talk_id.0);
        }
        Command::CreateWorkshop {
            slug,
            title,
            abstract_file,
            slides,
        } => {
            let workshop_id = storage
                .create_workshop(&NewWorkshop {
                    slug: Slug::new(slug),
                    title,
                    abstract_md: read_abstract(&abstract_file)?,
                    slides,
                })
                .await?;
            println!("created workshop_id={}", workshop_id.0);
        }
        Command::AddAppearance {
            event,
            date,
            talk,
            workshop,
            length,
            recording,
        } => {
            let target = match (talk, workshop) {
                (Some(talk), _) => Some(AppearanceTarget::Talk(Slug::new(talk))),
                (None, Some(workshop)) => Some(AppearanceTarget::Workshop(Slug::new(workshop))),
                (None, None) => None,
            };
            let appearance_id = storage
                .add_appearance(&NewAppearance {
                    event: Slug::new(event),
                    target,
                    date,
                    length,
                    recording,
                })
                .await?;
            println!("created appearance_id={}", appearance_id.0);
        }
    }

    Ok(())
}
