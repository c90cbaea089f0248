//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use shipfiles_core::{BuildReport, ProgressReporter, RuntimeFileLocator, patch_output_dir};
use shipfiles_shared::{AppConfig, PluginConfig, init_config, load_project_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// shipfiles — make standalone builds carry their runtime engine files.
#[derive(Parser)]
#[command(
    name = "shipfiles",
    version,
    about = "Add dynamically loaded runtime files to a build's trace manifests and output.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options shared by commands that locate the runtime files.
#[derive(Args, Debug, Clone)]
pub(crate) struct RuntimeArgs {
    /// Project directory holding shipfiles.toml and node_modules.
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Runtime directory to use instead of package resolution.
    #[arg(long, env = "SHIPFILES_RUNTIME_DIR")]
    pub runtime_dir: Option<String>,

    /// Regex selecting shippable file names.
    #[arg(long)]
    pub pattern: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Patch the trace manifests of an emitted build and copy runtime files into it.
    Patch {
        /// Output root of the emitted build (e.g. .next/standalone/.next).
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Show the runtime directory and the files that would ship.
    List {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Configuration management.
    Config {
        /// Project directory holding shipfiles.toml.
        #[arg(long, default_value = ".", global = true)]
        project: PathBuf,

        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write shipfiles.toml with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "shipfiles=info,shipfiles_core=info",
        1 => "shipfiles=debug,shipfiles_core=debug,shipfiles_shared=debug",
        _ => "shipfiles=trace,shipfiles_core=trace,shipfiles_shared=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
    match cli.command {
        Command::Patch { out, runtime } => cmd_patch(&out, &runtime).await,
        Command::List { runtime } => cmd_list(&runtime).await,
        Command::Config { project, action } => match action {
            ConfigAction::Init => cmd_config_init(&project),
            ConfigAction::Show => cmd_config_show(&project),
        },
    }
}

/// Merge config file values with CLI flags (flags win).
fn resolve_config(args: &RuntimeArgs) -> Result<PluginConfig> {
    let mut config = load_project_config(&args.project)?;
    if let Some(dir) = &args.runtime_dir {
        config.runtime.dir = Some(dir.clone());
    }
    if let Some(pattern) = &args.pattern {
        config.files.pattern = pattern.clone();
    }
    Ok(PluginConfig::from_app(&config, &args.project)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_patch(out: &Path, args: &RuntimeArgs) -> Result<()> {
    if !out.is_dir() {
        return Err(eyre!("output root '{}' is not a directory", out.display()));
    }

    let config = resolve_config(args)?;
    info!(out = %out.display(), pattern = config.pattern.as_str(), "patching build output");

    let reporter = Arc::new(CliProgress::new()?);
    let report = patch_output_dir(&config, out, reporter).await?;

    println!();
    println!("  Build output patched.");
    println!("  Output:    {}", report.output_root.display());
    println!("  Manifests: {}", report.manifests_patched);
    println!("  Copied:    {}", report.files_copied);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_list(args: &RuntimeArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let files = RuntimeFileLocator::from_config(&config)
        .list_shippable_files()
        .await?;

    println!("{}", files.dir().display());
    if files.is_empty() {
        println!("  (no files match {})", config.pattern.as_str());
    }
    for name in files.files() {
        println!("  {name}");
    }
    Ok(())
}

fn cmd_config_init(project: &Path) -> Result<()> {
    let path = init_config(project)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(project: &Path) -> Result<()> {
    let config: AppConfig = load_project_config(project)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn manifest_patched(&self, artifact: &str) {
        self.spinner.set_message(format!("Patched {artifact}"));
    }

    fn file_copied(&self, file: &str) {
        self.spinner.set_message(format!("Copied {file}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clears the spinner when the build fails before `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
