// Headless entry point.
// Fetches one account's repositories and prints the resulting view and insights.

use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use repofetch::state::{FetchState, SortColumn};
use repofetch::{App, Config};

#[derive(Parser)]
#[command(name = "repofetch")]
#[command(version)]
#[command(about = "Fetch and summarize a GitHub user's or organization's repositories")]
struct Cli {
    /// GitHub user or organization name
    name: String,

    /// REST API base URL
    #[arg(long, env = "REPOFETCH_API_BASE")]
    api_base: Option<String>,

    /// Cache lifetime in seconds
    #[arg(long)]
    ttl: Option<u64>,

    /// Keep the cache in memory only
    #[arg(long)]
    no_disk_cache: bool,

    /// Only show repositories whose name contains this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Column to sort by
    #[arg(short, long, value_enum)]
    sort: Option<SortArg>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Number of rows to print
    #[arg(short = 'n', long, default_value_t = 25)]
    top: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Stars,
    Forks,
    Language,
    Description,
    Pushed,
}

impl From<SortArg> for SortColumn {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortColumn::Name,
            SortArg::Stars => SortColumn::Stars,
            SortArg::Forks => SortColumn::Forks,
            SortArg::Language => SortColumn::Language,
            SortArg::Description => SortColumn::Description,
            SortArg::Pushed => SortColumn::PushedAt,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("repofetch=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(base) = &cli.api_base {
        config.api_base = base.trim_end_matches('/').to_string();
    }
    if let Some(ttl) = cli.ttl {
        config.cache_ttl = Duration::from_secs(ttl);
    }
    if !cli.no_disk_cache {
        config = config.with_default_cache_dir();
    }
    if !config.is_authenticated() {
        eprintln!("No GITHUB_PAT set; requests are unauthenticated and rate limited.");
    }

    let mut app = App::new(config).context("Failed to create GitHub client")?;
    app.start_fetch(&cli.name);
    app.run_until_finished().await;

    if let Some(filter) = &cli.filter {
        app.set_filter(filter);
    }
    if let Some(sort) = cli.sort {
        app.sort_by(sort.into());
        if cli.desc {
            app.sort_by(sort.into());
        }
    }

    let state = app.state();
    if let Some(notice) = &state.last_error {
        bail!("{}: {}", notice.title, notice.message);
    }

    print_report(state, cli.top);
    Ok(())
}

fn print_report(state: &FetchState, top: usize) {
    if let Some(profile) = &state.profile {
        println!(
            "{} ({}) {}",
            profile.name.as_deref().unwrap_or(&profile.login),
            profile.login,
            profile.html_url
        );
    }
    println!("{}", state.last_activity_display());
    if let Some(remaining) = state.rate_limit_display() {
        println!("{}", remaining);
    }
    println!();

    println!(
        "{:<40} {:>7} {:>6}  {:<12} {}",
        "Name", "Stars", "Forks", "Language", "Description"
    );
    for repo in state.view.visible_items(&state.records).into_iter().take(top) {
        println!(
            "{:<40} {:>7} {:>6}  {:<12} {}",
            repo.name,
            repo.stars,
            repo.forks,
            repo.language_display(),
            repo.description_display()
        );
    }
    println!("{}", state.view.summary(state.records.len()));

    let Some(insights) = &state.insights else {
        return;
    };
    println!();
    println!(
        "{} repositories, {} stars, {} forks",
        insights.total_repos, insights.total_stars, insights.total_forks
    );
    println!("Top languages:");
    for (language, count) in &insights.top_languages {
        println!("  {:<20} {}", language, count);
    }
    println!("Most starred:");
    for (name, stars) in &insights.top_starred {
        println!("  {:<40} {}", name, stars);
    }
    println!("Pushes per month:");
    for (month, count) in &insights.monthly_pushes {
        println!("  {} {}", month, count);
    }
}
