// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use volmirror::{
    config::{ConfigError, KeepList, MatchMode, MirrorConfig},
    mirror::Mirror,
    notify::{Notice, Notifier, WriterNotifier},
    path::default_config_path,
};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use mkdirp::mkdirp;
use std::{fs::write, io::stdout, path::PathBuf, process::exit, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  volmirror [options] <volmirror-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Run(opts) => run_run(opts).await,
            Command::Show(opts) => run_show(opts),
            Command::Init(opts) => run_init(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Replace destination contents with source contents.
    #[command(override_usage = "volmirror run [options]")]
    Run(RunOptions),

    /// Show effective mirror configuration.
    #[command(override_usage = "volmirror show [options]")]
    Show(ShowOptions),

    /// Write new mirror configuration file.
    #[command(override_usage = "volmirror init [options] --source <path> --destination <path>")]
    Init(InitOptions),
}

#[derive(Args, Clone, Debug)]
struct ConfigSource {
    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Assemble configuration from environment variables instead.
    #[arg(long, conflicts_with = "config")]
    pub from_env: bool,
}

impl ConfigSource {
    fn load(&self) -> Result<MirrorConfig> {
        if self.from_env {
            return Ok(MirrorConfig::from_env()?);
        }

        let path = match &self.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };

        Ok(MirrorConfig::load(path)?)
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RunOptions {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ShowOptions {
    #[command(flatten)]
    pub source: ConfigSource,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Path of configuration file to write.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Directory whose contents get copied.
    #[arg(short, long, required = true, value_name = "path")]
    pub source: PathBuf,

    /// Directory whose contents get replaced.
    #[arg(short, long, required = true, value_name = "path")]
    pub destination: PathBuf,

    /// Destination-relative path to leave untouched.
    #[arg(short, long, value_name = "entry")]
    pub keep: Vec<String>,

    /// How keep entries protect paths: "exact" or "descendants".
    #[arg(short, long, value_name = "mode", default_value_t = MatchMode::Exact)]
    pub match_mode: MatchMode,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_run(opts: RunOptions) -> Result<()> {
    let config = opts.source.load()?;

    if !opts.yes {
        let message = format!(
            "replace contents of {:?} with contents of {:?}?",
            config.destination_root.display(),
            config.source_root.display()
        );
        let proceed = Confirm::new(&message)
            .with_default(false)
            .with_help_message("keep files are left untouched")
            .prompt()?;
        if !proceed {
            info!("mirror aborted");
            return Ok(());
        }
    }

    let notifier = WriterNotifier::new(stdout());
    let mirror = Mirror::new(config);
    notifier.notify(&Notice::started(mirror.config()));
    let handle = mirror.request()?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.yellow} {elapsed_precise:.green}  {msg}",
    )?);
    bar.set_message("mirroring...");
    bar.enable_steady_tick(Duration::from_millis(100));
    let outcome = handle.wait().await;
    bar.finish_and_clear();

    notifier.notify(&Notice::Finished(outcome.clone()));
    if let Some(reason) = outcome.reason() {
        bail!("mirror failed: {reason}");
    }

    Ok(())
}

fn run_show(opts: ShowOptions) -> Result<()> {
    let config = opts.source.load()?;
    print!("{config}");

    Ok(())
}

fn run_init(opts: InitOptions) -> Result<()> {
    let path = match opts.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    if path.exists() {
        bail!("configuration file {:?} already exists", path.display());
    }

    if let Some(parent) = path.parent() {
        mkdirp(parent)?;
    }

    let config = MirrorConfig::new(opts.source, opts.destination, KeepList::new(opts.keep))
        .with_match_mode(opts.match_mode);
    write(&path, config.to_string()).map_err(|err| ConfigError::WriteFile {
        source: err,
        path: path.clone(),
    })?;
    info!("wrote configuration to {:?}", path.display());

    Ok(())
}
