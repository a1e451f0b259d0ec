use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use url::Url;

use feedstate::platform::{HeadlessPlatform, NavigationType};
use feedstate::restore::{Always, BackForwardOnly, FeedView};
use feedstate::storage::FileStorage;
use feedstate::util::{strip_control_chars, truncate_to_width};
use feedstate::{Config, FeedEntry, FeedStateContext, FeedStateData, SaveOutcome};

/// Column width for feed keys in `list` output.
const KEY_COLUMN_WIDTH: usize = 48;

/// Get the config directory path (~/.config/feedstate/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedstate"))
}

/// Pick the session directory: `--store`, then config, then the runtime dir
/// (cleared at logout), then the config dir.
fn resolve_store_dir(cli: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    if let Some(dir) = cli.or_else(|| config.store_dir.clone()) {
        return Ok(dir);
    }
    if let Some(runtime) = std::env::var_os("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime).join("feedstate"));
    }
    Ok(get_config_dir()?.join("session"))
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))
}

#[derive(Parser, Debug)]
#[command(name = "feedstate", about = "Inspect and exercise the feed state cache")]
struct Cli {
    /// Session directory holding the store
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Config file (default: ~/.config/feedstate/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// A feed view: route pathname or full URL, plus tab and filters.
#[derive(Args, Debug)]
struct ViewArgs {
    /// Route pathname (e.g. /feed) or a full URL whose query becomes the filters
    target: String,

    /// Tab name
    #[arg(long)]
    tab: Option<String>,

    /// Filter parameter, repeatable
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl ViewArgs {
    fn view(&self) -> FeedView {
        let mut view = match Url::parse(&self.target) {
            Ok(url) => FeedView::from_url(&url, self.tab.as_deref()),
            Err(_) => {
                let mut view = FeedView::new(self.target.as_str());
                view.tab = self.tab.clone();
                view
            }
        };
        for (name, value) in &self.params {
            view.params.insert(name.clone(), value.clone());
        }
        view
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the feed key for a view
    Key(ViewArgs),

    /// List saved feed states
    List,

    /// Print a saved state as JSON without consuming it
    Show(ViewArgs),

    /// Save state for a view
    Save {
        #[command(flatten)]
        view: ViewArgs,

        /// JSON array of entries, or "-" for stdin
        #[arg(long, value_name = "FILE")]
        entries: PathBuf,

        /// Vertical scroll offset
        #[arg(long, default_value_t = 0.0)]
        scroll: f64,

        /// Last loaded page
        #[arg(long)]
        page: Option<u32>,

        /// Whether more pages exist
        #[arg(long)]
        has_more: Option<bool>,

        /// Id of the entry clicked before leaving
        #[arg(long)]
        clicked: Option<String>,
    },

    /// Restore (and consume) the state for a view
    Restore {
        #[command(flatten)]
        view: ViewArgs,

        /// Treat this as a back/forward navigation
        #[arg(long)]
        back_forward: bool,

        /// Restore regardless of navigation type
        #[arg(long, conflicts_with = "back_forward")]
        always: bool,
    },

    /// Remove saved state for a view, or everything
    Clear {
        /// Route pathname or full URL
        #[arg(required_unless_present = "all")]
        target: Option<String>,

        /// Tab name
        #[arg(long)]
        tab: Option<String>,

        /// Filter parameter, repeatable
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Remove every saved state
        #[arg(long, conflicts_with = "target")]
        all: bool,
    },
}

fn read_entries(path: &Path) -> Result<Vec<FeedEntry>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read entries from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read entries file '{}'", path.display()))?
    };
    serde_json::from_str(&raw).context("Entries must be a JSON array")
}

fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let store_dir = resolve_store_dir(cli.store, &config)?;
    let storage = FileStorage::open(&store_dir).with_context(|| {
        format!("Failed to open session store '{}'", store_dir.display())
    })?;
    tracing::debug!(path = %store_dir.display(), "Opened session store");

    let platform = Rc::new(HeadlessPlatform::with_storage(Rc::new(storage)));
    if let Command::Restore {
        back_forward: true, ..
    } = &cli.command
    {
        platform.set_navigation_type(NavigationType::BackForward);
    }
    let mut ctx = FeedStateContext::new(platform, &config);

    let result = run(&ctx, cli.command);
    ctx.teardown();
    result
}

fn run(ctx: &FeedStateContext, command: Command) -> Result<()> {
    match command {
        Command::Key(args) => {
            println!("{}", args.view().key());
        }

        Command::List => {
            let store = ctx.cache().load_store();
            if store.is_empty() {
                println!("No saved feed state.");
                return Ok(());
            }
            println!(
                "{:<width$}  {:>7}  {:>9}  {:>5}  SAVED",
                "KEY",
                "ENTRIES",
                "SCROLL",
                "PAGE",
                width = KEY_COLUMN_WIDTH
            );
            for (key, state) in store.iter() {
                let safe_key = strip_control_chars(key.as_str());
                let cell = truncate_to_width(&safe_key, KEY_COLUMN_WIDTH);
                let saved = state
                    .captured_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let page = state
                    .page
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<width$}  {:>7}  {:>9.0}  {:>5}  {}",
                    cell,
                    state.entries.len(),
                    state.scroll_position,
                    page,
                    saved,
                    width = KEY_COLUMN_WIDTH
                );
            }
        }

        Command::Show(args) => {
            let key = args.view().key();
            match ctx.get_feed_state(&key) {
                Some(state) => {
                    let json = serde_json::to_string_pretty(&state)
                        .context("Failed to format feed state")?;
                    println!("{}", strip_control_chars(&json));
                }
                None => println!("No saved state for {}", strip_control_chars(key.as_str())),
            }
        }

        Command::Save {
            view,
            entries,
            scroll,
            page,
            has_more,
            clicked,
        } => {
            let entries = read_entries(&entries)?;
            let key = view.view().key();
            let data = FeedStateData {
                feed_key: key.clone(),
                entries,
                scroll_position: scroll,
                last_clicked_entry_id: clicked,
                page,
                has_more,
            };

            let _tracking = ctx.cache().track();
            match ctx.save_feed_state(data) {
                SaveOutcome::Saved { evicted } => {
                    println!("Saved {}", strip_control_chars(key.as_str()));
                    for old in evicted {
                        println!("Evicted {}", strip_control_chars(old.as_str()));
                    }
                }
                SaveOutcome::Skipped => println!("Tracking inactive, nothing saved"),
                SaveOutcome::Failed => anyhow::bail!("Failed to save feed state (see log)"),
            }
        }

        Command::Restore { view, always, .. } => {
            let view = view.view();
            let restored = if always {
                ctx.restore_view(&view, &Always)
            } else {
                ctx.restore_view(&view, &BackForwardOnly)
            };
            match restored {
                Some(state) => {
                    let json = serde_json::to_string_pretty(&state)
                        .context("Failed to format feed state")?;
                    println!("{}", strip_control_chars(&json));
                }
                None if !always && !ctx.is_back_navigation() => {
                    println!("Not a back/forward navigation, nothing restored")
                }
                None => println!("Nothing to restore"),
            }
        }

        Command::Clear {
            target,
            tab,
            params,
            all,
        } => {
            if all {
                ctx.cache().clear_all();
                println!("Cleared all feed state");
            } else if let Some(target) = target {
                let key = ViewArgs {
                    target,
                    tab,
                    params,
                }
                .view()
                .key();
                ctx.clear_feed_state(&key);
                println!("Cleared {}", strip_control_chars(key.as_str()));
            } else {
                anyhow::bail!("Specify a view to clear, or --all");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("hub=biology"),
            Ok(("hub".to_string(), "biology".to_string()))
        );
        assert_eq!(
            parse_param("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_view_args_path_and_params() {
        let args = ViewArgs {
            target: "/feed".to_string(),
            tab: Some("popular".to_string()),
            params: vec![("hub".to_string(), "bio".to_string())],
        };
        let view = args.view();
        assert_eq!(
            view,
            FeedView::new("/feed")
                .with_tab("popular")
                .with_param("hub", "bio")
        );
    }

    #[test]
    fn test_view_args_url() {
        let args = ViewArgs {
            target: "https://example.com/fund?status=open".to_string(),
            tab: None,
            params: vec![("sort".to_string(), "new".to_string())],
        };
        let view = args.view();
        assert_eq!(view.pathname, "/fund");
        assert_eq!(view.params.len(), 2);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "feedstate",
            "--store",
            "/tmp/s",
            "save",
            "/feed",
            "--tab",
            "new",
            "--param",
            "hub=bio",
            "--entries",
            "-",
            "--scroll",
            "120",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s")));
        assert!(matches!(cli.command, Command::Save { scroll, .. } if scroll == 120.0));

        let cli = Cli::try_parse_from(["feedstate", "clear", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Clear {
                target: None,
                all: true,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["feedstate", "clear"]).is_err());

        let conflicting = ["feedstate", "restore", "/feed", "--back-forward", "--always"];
        assert!(Cli::try_parse_from(conflicting).is_err());
    }

    #[test]
    fn test_store_dir_prefers_cli() {
        let config = Config {
            store_dir: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(
            resolve_store_dir(Some(PathBuf::from("/from/cli")), &config).unwrap(),
            PathBuf::from("/from/cli")
        );
        assert_eq!(
            resolve_store_dir(None, &config).unwrap(),
            PathBuf::from("/from/config")
        );
    }
}
