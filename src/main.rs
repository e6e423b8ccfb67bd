use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use skilldeck_core::config::{Config, resolve_config_path};
use skilldeck_core::lint::lint_skill;
use skilldeck_core::scaffold::create_skill;
use skilldeck_core::{SkillService, ViewMode};
use skilldeck_skills::SkillSource;
use skilldeck_skills::types::FileCategory;

#[derive(Parser)]
#[command(name = "skilldeck", version)]
#[command(about = "Discover, inspect, and hot-reload SKILL.md skills for AI agents")]
struct Cli {
    /// Configuration file path (falls back to SKILLDECK_CONFIG, then .skilldeck/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available skills
    List {
        /// Only skills from this source (global, project)
        #[arg(long)]
        source: Option<SkillSource>,

        /// Keyword matched against name and description
        #[arg(long)]
        filter: Option<String>,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a skill's content, outline, or one section
    View {
        name: String,

        /// Only the heading outline
        #[arg(long, conflicts_with = "section")]
        outline: bool,

        /// Only the section under this heading
        #[arg(long)]
        section: Option<String>,
    },

    /// Check a skill directory for common problems
    Validate { path: PathBuf },

    /// Scaffold a new skill
    Create {
        name: String,

        /// Create under the global root instead of the project root
        #[arg(long)]
        global: bool,
    },

    /// Print a system prompt with the available-skills block injected
    Prompt {
        /// Base prompt to extend
        #[arg(long, default_value = "")]
        base: String,
    },

    /// Suggest the skill that best matches a task description
    Match {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Reload skills on change until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    init_subscriber(&config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;

    match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Create { name, global } => create(&config, &name, global),
        command => run(command, &config).await,
    }
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let service = SkillService::from_config(config)?;
    match command {
        Commands::List {
            source,
            filter,
            json,
        } => {
            if json {
                let skills = service.filter(filter.as_deref(), source);
                println!("{}", serde_json::to_string_pretty(&skills)?);
            } else {
                print!("{}", service.list(filter.as_deref(), source));
            }
        }
        Commands::View {
            name,
            outline,
            section,
        } => view(&service, &name, outline, section)?,
        Commands::Prompt { base } => println!("{}", service.inject_prompt(&base)),
        Commands::Match { query } => match service.suggest(&query.join(" ")) {
            Some(hint) => println!("{hint}"),
            None => println!("No matching skill."),
        },
        Commands::Watch => watch(&service, config).await?,
        Commands::Validate { .. } | Commands::Create { .. } => {}
    }
    Ok(())
}

/// `RUST_LOG` wins, then the configured level, then `info`. Installed before
/// the config is loaded for real so its diagnostics are not lost.
fn init_subscriber(config_path: &Path) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(configured_level(config_path)))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn configured_level(config_path: &Path) -> String {
    Config::load(config_path).map_or_else(|_| "info".to_owned(), |c| c.logging.level)
}

fn view_mode(outline: bool, section: Option<String>) -> ViewMode {
    match (outline, section) {
        (true, _) => ViewMode::Outline,
        (false, Some(heading)) => ViewMode::Section(heading),
        (false, None) => ViewMode::Full,
    }
}

fn view(
    service: &SkillService,
    name: &str,
    outline: bool,
    section: Option<String>,
) -> anyhow::Result<()> {
    let mode = view_mode(outline, section);
    if mode != ViewMode::Full {
        println!("{}", service.view(name, &mode)?);
        return Ok(());
    }

    let skill = service.registry().get(name)?;
    println!("Name: {}", skill.name());
    println!("Source: {}", skill.source);
    println!("Path: {}", skill.path.display());
    println!("Description: {}", skill.description());
    for category in [FileCategory::Script, FileCategory::Reference, FileCategory::Asset] {
        let files: Vec<String> = skill
            .files_of(category)
            .map(|f| f.relative_path.display().to_string())
            .collect();
        if !files.is_empty() {
            println!("{category} files: {}", files.join(", "));
        }
    }
    println!("\nContent:\n--------");
    println!("{}", skill.body().unwrap_or_default());
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let report = lint_skill(path);
    for check in &report.checks {
        println!("{check}");
    }
    if !report.passed() {
        bail!("skill validation failed: {}", path.display());
    }
    println!("\n✓ Skill validation passed");
    Ok(())
}

fn create(config: &Config, name: &str, global: bool) -> anyhow::Result<()> {
    let roots = config.skills.loader_config();
    let base = if global {
        roots.global_dir
    } else {
        roots.project_dir
    };
    let dir = create_skill(&base, name)?;

    println!("Created skill '{name}' at {}", dir.display());
    println!("\nStructure:");
    println!("  {name}/");
    println!("  ├── SKILL.md");
    println!("  ├── scripts/");
    println!("  │   └── example.sh");
    println!("  ├── references/");
    println!("  │   └── additional-docs.md");
    println!("  └── assets/");
    println!("\nNext steps:");
    println!("  1. Edit {} to add your instructions", dir.join("SKILL.md").display());
    println!("  2. Add scripts, references, and assets as needed");
    println!("  3. Check it with: skilldeck validate {}", dir.display());
    Ok(())
}

async fn watch(service: &SkillService, config: &Config) -> anyhow::Result<()> {
    let registry = service.registry();
    registry
        .start_watching(config.skills.watcher_config())
        .context("failed to start skill watcher")?;
    tracing::info!(
        count = registry.count(),
        "watching skill directories, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    registry.stop_watching().await;
    Ok(())
}
