//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use brochure_core::{BrochureContext, ProgressReporter};
use brochure_fetcher::PageFetcher;
use brochure_shared::{
    AppConfig, BrochureError, FetchConfig, LinkCandidate, init_config, load_config,
    load_config_from, resolve_api_key,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Brochure: build a company brochure from its website.
#[derive(Parser)]
#[command(
    name = "brochure",
    version,
    about = "Generate a markdown company brochure from a website, streamed as it is written.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.brochure/brochure.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a brochure and stream it to stdout.
    Generate {
        /// Company website (landing page URL).
        url: String,

        /// Company name used in the brochure.
        #[arg(short, long)]
        company: String,

        /// Also write the finished brochure to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Override the configured chat model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show which links the model would follow for a landing page.
    Links {
        /// Landing page URL.
        url: String,

        /// Override the configured chat model.
        #[arg(short, long)]
        model: Option<String>,

        /// Print the selection as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fetch a page and print its cleaned contents (no model call).
    Fetch {
        /// Page URL.
        url: String,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brochure=info",
        1 => "brochure=debug",
        _ => "brochure=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Generate {
            url,
            company,
            out,
            model,
        } => {
            let config = resolve_config(config_path, model)?;
            cmd_generate(&config, &url, &company, out.as_deref()).await
        }
        Command::Links { url, model, json } => {
            let config = resolve_config(config_path, model)?;
            cmd_links(&config, &url, json).await
        }
        Command::Fetch { url, json } => {
            let config = resolve_config(config_path, None)?;
            cmd_fetch(&config, &url, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file and apply flag overrides.
fn resolve_config(path: Option<&Path>, model: Option<String>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(model) = model {
        config.openai.model = model;
    }
    Ok(config)
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!("unsupported URL scheme '{}': expected http or https", parsed.scheme()));
    }
    Ok(parsed)
}

/// Credential validation happens here, once, before any network call.
fn build_context(config: &AppConfig) -> Result<BrochureContext> {
    let api_key = resolve_api_key(config)?;
    Ok(BrochureContext::from_config(config, api_key)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    config: &AppConfig,
    url: &str,
    company: &str,
    out: Option<&Path>,
) -> Result<()> {
    let url = parse_url(url)?;
    let ctx = build_context(config)?;

    info!(url = %url, company, model = %config.openai.model, "generating brochure");

    let progress = Arc::new(CliProgress::new());
    let mut brochure =
        ctx.generate_brochure_with_progress(company, url.as_str(), progress.clone());

    let mut stdout = std::io::stdout();
    let (text, interrupted) = print_brochure(
        &mut stdout,
        &mut brochure,
        tokio::signal::ctrl_c(),
        || progress.finish(),
    )
    .await?;

    drop(brochure);
    progress.finish();

    if interrupted {
        warn!(chars = text.len(), "interrupted; brochure stream closed");
    }

    if let Some(path) = out {
        std::fs::write(path, &text).map_err(|e| BrochureError::io(path, e))?;
        eprintln!("Brochure written to {}", path.display());
    }

    info!(chars = text.len(), "brochure generation finished");
    Ok(())
}

/// Copy brochure values to `out` until the stream ends or `interrupt` fires.
///
/// Returns the final text and whether it was interrupted. `interrupt` is
/// polled as one future for the whole loop, so a signal between items is not lost.
async fn print_brochure<W, S, I>(
    out: &mut W,
    brochure: &mut S,
    interrupt: I,
    mut before_output: impl FnMut(),
) -> Result<(String, bool)>
where
    W: Write,
    S: futures::Stream<Item = brochure_shared::Result<String>> + Unpin,
    I: std::future::Future,
{
    let mut text = String::new();
    let mut interrupted = false;
    tokio::pin!(interrupt);

    loop {
        let item = tokio::select! {
            item = brochure.next() => item,
            _ = &mut interrupt => {
                interrupted = true;
                break;
            }
        };
        let Some(item) = item else {
            break;
        };

        before_output();
        match item {
            Ok(current) => {
                // Each value extends the previous one; print only the new tail.
                out.write_all(current[text.len()..].as_bytes())?;
                out.flush()?;
                text = current;
            }
            Err(e) => {
                if !text.is_empty() {
                    writeln!(out)?;
                }
                return Err(e.into());
            }
        }
    }

    if !text.is_empty() {
        writeln!(out)?;
    }
    Ok((text, interrupted))
}

async fn cmd_links(config: &AppConfig, url: &str, json: bool) -> Result<()> {
    let url = parse_url(url)?;
    let ctx = build_context(config)?;

    let (page, links) = ctx.select_links(url.as_str()).await?;

    if json {
        let body = serde_json::json!({ "links": links });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    println!("  Page:     {}", page.title);
    println!("  Links:    {} found, {} selected", page.outbound_links.len(), links.len());
    println!();
    print_links(&links);
    Ok(())
}

fn print_links(links: &[LinkCandidate]) {
    let width = links.iter().map(|l| l.kind.len()).max().unwrap_or(0);
    for link in links {
        println!("  {:<width$}  {}", link.kind, link.url);
    }
    if !links.is_empty() {
        println!();
    }
}

/// Page fetches need no credential.
async fn cmd_fetch(config: &AppConfig, url: &str, json: bool) -> Result<()> {
    let url = parse_url(url)?;
    let fetcher = PageFetcher::new(&FetchConfig::from(config))?;
    let page = fetcher.fetch(url.as_str()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    print!("{}", page.contents());
    println!("Links:");
    for link in &page.outbound_links {
        println!("{link}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path, None)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    /// Clear the spinner before brochure text reaches the terminal.
    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetched [{current}/{total}] {url}"));
    }

    fn links_selected(&self, links: &[LinkCandidate]) {
        let kinds: Vec<&str> = links.iter().map(|l| l.kind.as_str()).collect();
        self.spinner.set_message(if kinds.is_empty() {
            "No extra pages selected".to_string()
        } else {
            format!("Selected {}", kinds.join(", "))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_with_globals() {
        let cli = Cli::try_parse_from([
            "brochure",
            "-vv",
            "generate",
            "https://acme.test",
            "--company",
            "Acme",
            "--out",
            "acme.md",
            "--log-format",
            "json",
        ])
        .expect("valid args");

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        let Command::Generate {
            url, company, out, model,
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(url, "https://acme.test");
        assert_eq!(company, "Acme");
        assert_eq!(out, Some(PathBuf::from("acme.md")));
        assert!(model.is_none());
    }

    #[test]
    fn generate_requires_company() {
        assert!(Cli::try_parse_from(["brochure", "generate", "https://acme.test"]).is_err());
    }

    #[test]
    fn url_checks() {
        assert!(parse_url("https://acme.test/").is_ok());
        assert!(parse_url("acme.test").is_err());
        assert!(parse_url("ftp://acme.test/").is_err());
    }

    #[tokio::test]
    async fn prints_only_new_tails() {
        let mut brochure = futures::stream::iter(vec![
            Ok("# Acme".to_string()),
            Ok("# Acme\nGreat culture.".to_string()),
        ]);
        let mut out = Vec::new();
        let (text, interrupted) =
            print_brochure(&mut out, &mut brochure, std::future::pending::<()>(), || {})
                .await
                .expect("printed");

        assert!(!interrupted);
        assert_eq!(text, "# Acme\nGreat culture.");
        assert_eq!(String::from_utf8(out).expect("utf8"), "# Acme\nGreat culture.\n");
    }

    #[tokio::test]
    async fn interrupt_between_items_stops_hanging_stream() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let mut brochure = futures::stream::iter(vec![Ok("# Acme".to_string())])
            .chain(futures::stream::pending());
        let mut out = Vec::new();

        // The signal fires after the first item, while no select is running.
        let (text, interrupted) = print_brochure(&mut out, &mut brochure, rx, || {
            if let Some(tx) = tx.take() {
                let _ = tx.send(());
            }
        })
        .await
        .expect("printed");

        assert!(interrupted);
        assert_eq!(text, "# Acme");
        assert_eq!(String::from_utf8(out).expect("utf8"), "# Acme\n");
    }

    #[tokio::test]
    async fn stream_error_is_returned_after_partial_output() {
        let mut brochure = futures::stream::iter(vec![
            Ok("# Acme".to_string()),
            Err(BrochureError::model("connection reset")),
        ]);
        let mut out = Vec::new();
        let result =
            print_brochure(&mut out, &mut brochure, std::future::pending::<()>(), || {}).await;

        assert!(result.is_err());
        assert_eq!(String::from_utf8(out).expect("utf8"), "# Acme\n");
    }

    #[test]
    fn model_flag_overrides_config() {
        let dir = std::env::temp_dir().join(format!("brochure-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("brochure.toml");
        std::fs::write(&path, "[openai]\nmodel = \"gpt-4o\"\n").expect("write config");

        let config = resolve_config(Some(path.as_path()), None).expect("load");
        assert_eq!(config.openai.model, "gpt-4o");
        let config = resolve_config(Some(path.as_path()), Some("gpt-4.1-mini".into())).expect("load");
        assert_eq!(config.openai.model, "gpt-4.1-mini");

        std::fs::remove_dir_all(&dir).ok();
    }
}
