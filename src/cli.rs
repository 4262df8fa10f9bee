use anyhow::{Context as _, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use crate::commands::{self, stages::SortKey, Context};
use crate::config::{Config, Overrides, Settings};
use crate::logs::LineLimit;
use crate::monitor::OsLauncher;
use crate::output::Terminal;
use crate::stages::Strategy;

#[derive(Parser)]
#[command(name = "jenkins")]
#[command(author, version, about = "Trigger, monitor and diagnose Jenkins pipeline builds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    connection: Connection,

    /// Config file to read instead of ~/.jenkins.{yaml,yml,toml,json}
    #[arg(long, global = true, env = "JENKINS_CONFIG")]
    config: Option<PathBuf>,

    /// Fetch stage details one at a time instead of in parallel
    #[arg(long, global = true)]
    sequential: bool,

    /// More output; repeat for trace logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone, Default)]
struct Connection {
    #[arg(long, global = true, env = "JENKINS_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "JENKINS_USER")]
    user: Option<String>,

    #[arg(long, global = true, env = "JENKINS_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Pipeline (job) to work on [default: master]
    #[arg(long, global = true, env = "JENKINS_PIPELINE")]
    pipeline: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Average, fastest and slowest time of each stage over successful runs
    Timing {
        /// Only stages whose name contains this text
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Latest build of a product on a branch
    #[command(group(ArgGroup::new("product").required(true).args(["rs", "pra"])))]
    Latest {
        #[arg(long)]
        rs: bool,

        #[arg(long)]
        pra: bool,

        #[arg(short, long, default_value = "master")]
        branch: String,
    },

    /// Trigger a build and monitor it
    Build {
        /// rs, ingredi, pra or bpam
        product: String,
        branch: String,
    },

    /// Deploy a build to a subdomain and monitor the deployment
    Push {
        /// Build number, or rs/pra for that product's latest master build
        target: String,
        subdomain: String,
    },

    /// Failed stages of a build with their logs
    Diagnose {
        build: String,

        /// Show logs of every stage, not just the failed ones
        #[arg(short, long)]
        all: bool,

        /// Lines of log per stage; 0 for all of it
        #[arg(short = 'l', long, default_value_t = 50)]
        max_lines: usize,
    },

    /// Failed stages of a build
    Failed { build: String },

    /// Console log of one stage
    StageLog {
        build: String,
        stage: String,

        /// Only the last N lines
        #[arg(short, long, value_name = "N", default_value_t = 0)]
        tail: usize,

        /// Only the first N lines
        #[arg(short = 'n', long, value_name = "N", default_value_t = 0)]
        head: usize,

        /// Untruncated log from the console page
        #[arg(short, long)]
        full: bool,
    },

    /// Wait for builds to finish
    Monitor {
        #[arg(short, long = "build", required = true)]
        builds: Vec<String>,

        #[arg(long, hide = true)]
        bg: bool,
    },

    /// Current status of builds
    Status {
        #[arg(short, long = "build", required = true)]
        builds: Vec<String>,
    },

    /// Open a build's flow graph in the browser
    Open { build: String },

    /// Recent runs, a build's stages, or a stage's children
    Stages {
        build: Option<String>,

        #[arg(long, requires = "build")]
        stage: Option<String>,

        #[arg(long, value_enum, default_value_t = SortKey::Start)]
        sort: SortKey,

        #[arg(long)]
        asc: bool,

        /// Only rows whose name or status contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Print a table even on a terminal instead of opening the browser
        #[arg(long)]
        plain: bool,
    },
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let (config, source) = Config::load(self.config.as_deref())?;
        match source {
            Some(path) => eprintln!("Using config file {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }

        let settings = config.resolve(Overrides {
            host: self.connection.host.clone(),
            user: self.connection.user.clone(),
            key: self.connection.key.clone(),
            pipeline: self.connection.pipeline.clone(),
        })?;
        Ok(settings)
    }

    fn context(&self, settings: &Settings) -> Result<Context> {
        // The re-executed monitor resolves the same server and credentials.
        let launcher = OsLauncher::default()
            .env("JENKINS_HOST", &settings.host)
            .env("JENKINS_USER", &settings.user)
            .env("JENKINS_KEY", &settings.key);

        let mut ctx = Context::new(settings, Box::new(Terminal), Box::new(launcher), self.verbose)
            .context("Failed to set up the Jenkins client")?;
        if self.sequential {
            ctx.strategy = Strategy::Sequential;
        }
        ctx.config_path = self.config.clone();
        Ok(ctx)
    }

    pub async fn execute(&self) -> Result<()> {
        let settings = self.settings()?;
        let mut ctx = self.context(&settings)?;
        info!("Using pipeline [{}] on [{}]", settings.pipeline, settings.host);

        let default = Commands::Timing {
            filters: Vec::new(),
        };
        let result = match self.command.as_ref().unwrap_or(&default) {
            Commands::Timing { filters } => commands::timing::run(&ctx, filters).await,
            Commands::Latest { rs, branch, .. } => {
                let product = if *rs { "rs" } else { "pra" };
                commands::latest::run(&ctx, product, branch).await
            }
            Commands::Build { product, branch } => {
                commands::build::run(&ctx, product, branch).await
            }
            Commands::Push { target, subdomain } => {
                commands::push::run(&ctx, target, subdomain).await
            }
            Commands::Diagnose {
                build,
                all,
                max_lines,
            } => commands::diagnose::run(&ctx, build, *all, *max_lines).await,
            Commands::Failed { build } => commands::failed::run(&ctx, build).await,
            Commands::StageLog {
                build,
                stage,
                tail,
                head,
                full,
            } => {
                let limit = LineLimit::from_flags(*head, *tail);
                commands::stage_log::run(&ctx, build, stage, limit, *full).await
            }
            Commands::Monitor { builds, bg } => commands::monitor::run(&ctx, builds, *bg).await,
            Commands::Status { builds } => commands::status::run(&ctx, builds).await,
            Commands::Open { build } => commands::open::run(&ctx, build).await,
            Commands::Stages {
                build,
                stage,
                sort,
                asc,
                filter,
                plain,
            } => {
                ctx.interactive = !*plain && console::Term::stdout().is_term();
                let view = commands::stages::View {
                    sort: *sort,
                    ascending: *asc,
                    filter: filter.clone(),
                };
                commands::stages::run(&ctx, build.as_deref(), stage.as_deref(), &view).await
            }
        };

        Ok(result?)
    }
}
