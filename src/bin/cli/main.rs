mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flashdeck", about = "Flashcards with error-driven smart review", version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user id (default: `default_user` from config)
    #[arg(long, global = true)]
    user: Option<i64>,

    /// Use the remote card server from config instead of local files
    #[arg(long, global = true)]
    remote: bool,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the card API server
    Serve {
        /// Address to bind (default: from config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create a card
    Add {
        /// Front text
        title: String,
        /// Back text
        description: String,
        /// URL of a front image
        #[arg(long)]
        image_url: Option<String>,
        /// URL of a back image
        #[arg(long)]
        back_image_url: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// List cards
    List {
        /// Only cards that have been missed (smart review pool)
        #[arg(long)]
        errors_only: bool,
        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show both faces of a card
    Show {
        id: i64,
    },

    /// Edit a card's content
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New front image URL ("" clears it)
        #[arg(long)]
        image_url: Option<String>,
        /// New back image URL ("" clears it)
        #[arg(long)]
        back_image_url: Option<String>,
        /// Replace tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a card
    Delete {
        id: i64,
    },

    /// Mark a card reviewed, clearing its error count
    Reviewed {
        id: i64,
    },

    /// List tags with counts
    Tags,

    /// Study cards interactively
    Study {
        /// Smart review: only previously missed cards
        #[arg(long)]
        errors_only: bool,
    },
}

/// Split a comma-separated tag list
fn parse_tags(tags: Option<&str>) -> Option<Vec<String>> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.config.as_deref(), cli.user, cli.remote)?;

    match cli.command {
        Command::Serve { bind } => {
            commands::serve::run(&app, bind.as_deref()).await?;
        }
        Command::Add {
            title,
            description,
            image_url,
            back_image_url,
            tags,
        } => {
            commands::cards::run_add(
                &app,
                title,
                description,
                image_url,
                back_image_url,
                parse_tags(tags.as_deref()).unwrap_or_default(),
                &cli.format,
            )?;
        }
        Command::List { errors_only, tag } => {
            commands::list::run(&app, errors_only, tag.as_deref(), &cli.format, use_color).await?;
        }
        Command::Show { id } => {
            commands::cards::run_show(&app, id, &cli.format, use_color)?;
        }
        Command::Edit {
            id,
            title,
            description,
            image_url,
            back_image_url,
            tags,
        } => {
            commands::cards::run_edit(
                &app,
                id,
                title,
                description,
                image_url,
                back_image_url,
                parse_tags(tags.as_deref()),
                &cli.format,
            )?;
        }
        Command::Delete { id } => {
            commands::cards::run_delete(&app, id)?;
        }
        Command::Reviewed { id } => {
            commands::reviewed::run(&app, id, &cli.format).await?;
        }
        Command::Tags => {
            commands::tags::run(&app, &cli.format)?;
        }
        Command::Study { errors_only } => {
            commands::study::run(&app, errors_only, use_color).await?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
