//! devkit - developer utilities shell
//!
//! Headless front end over the shell runtime: browse and search the catalog,
//! open a tool with some input, and manage favorites and theme. State persists
//! in a JSON file under the data directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use dk_core::{Category, JsonFileStore, ShellConfig, ThemeMode};
use dk_loader::MountOutcome;
use dk_router::MemoryHistory;
use dk_shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "devkit")]
#[command(about = "Developer utilities shell")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Directory for persisted state (overrides DEVKIT_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Tool metadata JSON file (overrides DEVKIT_CATALOG_FILE)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// URL prefix the shell is served under (overrides DEVKIT_BASE_PATH)
    #[arg(long)]
    base_path: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List tools, grouped by category
    List {
        /// Only show one category
        #[arg(short, long)]
        category: Option<Category>,
    },
    /// Search tools by name, description or keyword
    Search { query: String },
    /// Open a tool and print what it renders
    Open {
        id: String,
        /// Input passed to the tool after mounting
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Manage favorite tools
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// Show or change the theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommand>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum FavoritesCommand {
    List,
    Toggle { id: String },
    /// Print favorites as a JSON array
    Export,
    /// Replace favorites from a JSON array file
    Import { path: PathBuf },
    Clear,
}

#[derive(clap::Subcommand, Debug)]
enum ThemeCommand {
    Toggle,
    Set { mode: ThemeMode },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/devkit/environment or .env (if present)
    dk_core::config::load_environment();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warn".parse()?)
                .add_directive("dk_shell=info".parse()?)
                .add_directive("dk_loader=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ShellConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(file) = args.catalog {
        config.catalog_file = Some(file);
    }
    if let Some(base) = args.base_path {
        config.base_path = dk_core::config::normalize_base_path(&base);
    }
    debug!("Configuration: {:?}", config);

    let storage = Arc::new(JsonFileStore::open(config.storage_file()));
    let history = Arc::new(MemoryHistory::new(format!("{}/", config.base_path)));
    let shell = Shell::new(config, storage, history);
    shell.controller.bootstrap().await;

    match args.command {
        Commands::List { category } => {
            for item in shell.controller.nav_items() {
                if category.is_some_and(|c| c != item.category) {
                    continue;
                }
                println!("{}", item.label);
                for tool in &item.tools {
                    let star = if shell.favorites.is_favorite(&tool.id) { "*" } else { " " };
                    println!("  {} {:<20} {}", star, tool.id, tool.description);
                }
            }
        }
        Commands::Search { query } => {
            for tool in shell.controller.search(&query) {
                println!("{:<20} {}", tool.id, tool.name);
            }
        }
        Commands::Open { id, input } => {
            let outcome = shell
                .open_tool(&id)
                .await
                .with_context(|| format!("unknown tool: {}", id))?;
            match outcome {
                Ok(MountOutcome::Mounted) => {
                    if let Some(input) = input {
                        shell.host.send_input(&input)?;
                    }
                }
                Ok(MountOutcome::Stale) => anyhow::bail!("mount of {} was superseded", id),
                Err(e) => return Err(e).with_context(|| format!("failed to open {}", id)),
            }
            println!("{}", shell.view.container().content());
        }
        Commands::Favorites { action } => match action {
            FavoritesCommand::List => {
                for tool in shell.controller.favorite_tools() {
                    println!("{:<20} {}", tool.id, tool.name);
                }
            }
            FavoritesCommand::Toggle { id } => {
                let now = shell.controller.toggle_favorite(&id);
                info!("{} is {} a favorite", id, if now { "now" } else { "no longer" });
            }
            FavoritesCommand::Export => println!("{}", shell.favorites.export_favorites()),
            FavoritesCommand::Import { path } => {
                let data = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let count = shell.favorites.import_favorites(&data)?;
                info!("Imported {} favorites", count);
            }
            FavoritesCommand::Clear => shell.controller.clear_favorites(),
        },
        Commands::Theme { action } => {
            match action {
                None => {}
                Some(ThemeCommand::Toggle) => {
                    shell.controller.toggle_theme();
                }
                Some(ThemeCommand::Set { mode }) => shell.controller.set_theme(mode),
            }
            println!("{}", shell.controller.theme().as_str());
        }
    }

    Ok(())
}
