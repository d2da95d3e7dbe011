use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use crate::commands::{CommandRouter, SubprocessLauncher};
use crate::config::Config;
use crate::error::CiPanelError;
use crate::model::PipelineTree;
use crate::{output, view, watch};

#[derive(Parser)]
#[command(name = "cipanel")]
#[command(author, version, about = "CI pipeline activity panel", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CIPANEL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a watch-event stream and render the pipeline tree
    Watch {
        /// NDJSON watch-event file; stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Re-render the tree after every applied event
        #[arg(short, long, default_value_t = false)]
        live: bool,

        /// Print the final tree as JSON items instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Tail a build's log through the external CLI
    Log {
        /// Pipeline name, owner/repo/branch
        pipeline: String,

        #[arg(short, long)]
        build: Option<String>,
    },
    /// Start a pipeline through the external CLI
    Start {
        pipeline: String,
    },
    /// Stop a running build through the external CLI
    Stop {
        pipeline: String,

        #[arg(short, long)]
        build: String,
    },
}

impl Cli {
    async fn execute_watch(
        &self,
        file: &Option<PathBuf>,
        live: bool,
        json: bool,
    ) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let live = live || config.view.live;
        let mut tree = PipelineTree::with_scheme(&config.view.scheme);

        let source = file
            .clone()
            .or_else(|| config.watch.events_file.as_ref().map(PathBuf::from));
        let changes = tree.subscribe();

        let on_change = |tree: &PipelineTree| {
            if live {
                output::print_tree(tree);
            }
        };

        let applied = match source {
            Some(path) => {
                info!("Reading watch events from: {}", path.display());
                let file = tokio::fs::File::open(&path).await?;
                let events = watch::ndjson_events(tokio::io::BufReader::new(file));
                futures::pin_mut!(events);
                watch::drive(&mut tree, events, on_change).await
            }
            None => {
                info!("Reading watch events from stdin");
                let events = watch::ndjson_events(tokio::io::BufReader::new(tokio::io::stdin()));
                futures::pin_mut!(events);
                watch::drive(&mut tree, events, on_change).await
            }
        };

        debug!("Change channel observed revision {}", *changes.borrow());
        info!(
            "Watch stream ended, {applied} events applied (tree revision {})",
            tree.revision()
        );

        if json {
            println!("{}", serde_json::to_string_pretty(&view::snapshot(&tree))?);
        } else {
            output::print_tree(&tree);
        }

        Ok(())
    }

    fn router(&self) -> Result<CommandRouter<SubprocessLauncher>> {
        let config = Config::load(self.config.as_deref())?;
        if config.cli.program.is_empty() {
            return Err(CiPanelError::Config("cli.program must not be empty".to_string()).into());
        }
        Ok(CommandRouter::new(SubprocessLauncher::new(config.cli.program))
            .with_namespace(config.cli.namespace))
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Watch { file, live, json } => self.execute_watch(file, *live, *json).await,
            Commands::Log { pipeline, build } => {
                info!("Opening build log for pipeline: {pipeline}");
                self.router()?.open_build_log(pipeline, build.as_deref())?;
                Ok(())
            }
            Commands::Start { pipeline } => {
                info!("Starting pipeline: {pipeline}");
                self.router()?.start_pipeline(pipeline)?;
                Ok(())
            }
            Commands::Stop { pipeline, build } => {
                info!("Stopping pipeline: {pipeline} build {build}");
                self.router()?.stop_pipeline(pipeline, build)?;
                Ok(())
            }
        }
    }
}
