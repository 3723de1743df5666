use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use afl_match_stats::{
    config::PipelineConfig,
    metrics::MetricsCollector,
    panels::{match_panels, player_panels, MatchPanels, Panel, PlayerPanels},
    remote::{ContentStore, GithubContentStore, LocalContentStore},
    selector::TableView,
    table::{PLAYER_COL, STYLED_COLUMNS},
    types::{AveragingWindow, SeriesPoint, Side},
    Session,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "AFL player stats for the current round", long_about = None)]
struct Cli {
    /// Read from a local checkout of the stats repository instead of GitHub
    #[arg(long)]
    local: Option<PathBuf>,

    /// Override the current round
    #[arg(short, long)]
    round: Option<u32>,

    /// Override the season year
    #[arg(short, long)]
    season: Option<i32>,

    /// Print JSON for a presentation layer
    #[arg(long)]
    json: bool,

    /// Print request metrics to stderr when done (GitHub only)
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Season,
    Last10,
    Last5,
    Last3,
}

impl From<WindowArg> for AveragingWindow {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Season => AveragingWindow::Season,
            WindowArg::Last10 => AveragingWindow::Last10,
            WindowArg::Last5 => AveragingWindow::Last5,
            WindowArg::Last3 => AveragingWindow::Last3,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Home,
    Away,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Home => Side::Home,
            SideArg::Away => Side::Away,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List this round's fixtures and the match folders found for them
    Fixtures,
    /// Show both teams' averages and form for one match folder
    Match {
        #[arg(short, long)]
        folder: String,
        #[arg(short, long, value_enum, default_value_t = WindowArg::Season)]
        window: WindowArg,
    },
    /// Show one player's averages, head-to-head history and season log
    Player {
        #[arg(short, long)]
        folder: String,
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(short, long)]
        player: String,
        #[arg(short, long, value_enum, default_value_t = WindowArg::Season)]
        window: WindowArg,
    },
}

#[derive(Serialize)]
struct FixtureLine<'a> {
    match_id: &'a str,
    header: String,
    folders: Vec<&'a str>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(panel: &Panel<TableView>) {
    match panel {
        Panel::Ready(view) => {
            println!("## {}", view.name);
            println!("{}", view.columns.join("\t"));
            for row in &view.rows {
                println!("{}", row.join("\t"));
            }
        }
        Panel::Empty { message } => println!("(no table: {})", message),
    }
}

fn print_series(title: &str, panel: &Panel<Vec<SeriesPoint>>) {
    println!("## {}", title);
    match panel {
        Panel::Ready(points) => {
            for p in points {
                println!("{}\t{}\t{}\t{}", p.label, p.disposals, p.goals, p.behinds);
            }
        }
        Panel::Empty { message } => println!("({})", message),
    }
}

fn print_match(panels: &MatchPanels) {
    println!("# {}", panels.header);
    println!("{}", panels.window);
    for (label, form) in [("Home form", &panels.home_form), ("Away form", &panels.away_form)] {
        match form {
            Panel::Ready(glyphs) => println!("{}: {}", label, glyphs),
            Panel::Empty { message } => println!("{}: ({})", label, message),
        }
    }
    print_table(&panels.home);
    print_table(&panels.away);
    for skipped in &panels.skipped {
        println!("skipped {}: {}", skipped.file, skipped.reason);
    }
}

fn print_player(panels: &PlayerPanels) {
    println!("# {}", panels.player);
    match &panels.aggregate {
        Panel::Ready(line) => println!(
            "{}: {:.1} disposals, {:.1} goals",
            line.table, line.disposals, line.goals
        ),
        Panel::Empty { message } => println!("({})", message),
    }
    match &panels.history_averages {
        Panel::Ready(avg) => println!(
            "Head to head over {} games: {:.1} disposals, {:.2} goals",
            avg.games, avg.disposals, avg.goals
        ),
        Panel::Empty { message } => println!("({})", message),
    }
    print_series("Head to head", &panels.history_series);
    print_series("This season", &panels.season_series);
}

fn run<S: ContentStore>(cli: &Cli, store: S, config: PipelineConfig) -> Result<()> {
    let mut session = Session::open(store, config).context("Failed to open round")?;

    match &cli.command {
        Commands::Fixtures => {
            let lines: Vec<FixtureLine> = session
                .fixtures()
                .iter()
                .map(|f| FixtureLine {
                    match_id: &f.match_id,
                    header: f.header_display(),
                    folders: session
                        .match_folders()
                        .iter()
                        .filter(|folder| folder.contains(f.match_id.as_str()))
                        .map(String::as_str)
                        .collect(),
                })
                .collect();
            if cli.json {
                print_json(&lines)?;
            } else {
                for line in &lines {
                    println!("{}  [{}]", line.header, line.folders.join(", "));
                }
            }
        }
        Commands::Match { folder, window } => {
            session.select_match(folder)?;
            session.set_window((*window).into())?;
            let mut columns = vec![PLAYER_COL];
            columns.extend_from_slice(STYLED_COLUMNS);
            let panels = match_panels(&mut session, &columns)?;
            if cli.json {
                print_json(&panels)?;
            } else {
                print_match(&panels);
            }
        }
        Commands::Player {
            folder,
            side,
            player,
            window,
        } => {
            session.select_match(folder)?;
            session.set_window((*window).into())?;
            let panels = player_panels(&mut session, (*side).into(), player);
            if cli.json {
                print_json(&panels)?;
            } else {
                print_player(&panels);
            }
        }
    }

    info!("Session finished in state {:?}", session.state());
    Ok(())
}

fn print_metrics(metrics: &MetricsCollector) {
    let m = metrics.snapshot();
    eprintln!(
        "requests: {} ok / {} failed, {} retries, {} bytes, avg {:.0}ms",
        m.successful_requests, m.failed_requests, m.retries, m.bytes_received, m.avg_response_time_ms
    );
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();
    if let Some(round) = cli.round {
        config.season.current_round = round;
    }
    if let Some(season) = cli.season {
        config.season.year = season;
    }

    match &cli.local {
        Some(root) => run(&cli, LocalContentStore::new(root), config),
        None => {
            let store = GithubContentStore::new(&config)?;
            let metrics = store.metrics().clone();
            let result = run(&cli, store, config);
            if cli.metrics {
                print_metrics(&metrics);
            }
            result
        }
    }
}
