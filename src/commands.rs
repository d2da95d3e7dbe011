use std::process::Stdio;

use log::info;
use tokio::process::Command;

use crate::error::{CiPanelError, Result};
use crate::model::{BuildNode, NodeRef, PipelineTree};

/// Launches a CLI invocation in a terminal session. The launch is
/// fire-and-forget: completion is never observed by the tree model.
pub trait TerminalLauncher {
    fn launch(&self, title: &str, args: &[String]) -> Result<()>;
}

/// Runs the external pipeline CLI as a detached subprocess.
pub struct SubprocessLauncher {
    program: String,
}

impl SubprocessLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TerminalLauncher for SubprocessLauncher {
    fn launch(&self, title: &str, args: &[String]) -> Result<()> {
        info!("{title}: {} {}", self.program, args.join(" "));

        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CiPanelError::Launch {
                program: self.program.clone(),
                source,
            })?;

        Ok(())
    }
}

/// Maps UI command invocations to tree-node lookups and external CLI
/// invocations. Argument vectors are built here and passed through verbatim;
/// nothing is parsed back.
pub struct CommandRouter<L: TerminalLauncher> {
    launcher: L,
    namespace: Option<String>,
}

impl<L: TerminalLauncher> CommandRouter<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            namespace: None,
        }
    }

    /// Appends `--namespace <ns>` to every invocation when set.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    fn push_namespace(&self, args: &mut Vec<String>) {
        if let Some(namespace) = &self.namespace {
            args.push("--namespace".to_string());
            args.push(namespace.clone());
        }
    }

    /// `get build log <pipeline> [--build <n>]`
    pub fn open_build_log(&self, pipeline: &str, build: Option<&str>) -> Result<()> {
        let mut args = vec![
            "get".to_string(),
            "build".to_string(),
            "log".to_string(),
            pipeline.to_string(),
        ];
        if let Some(build) = build.filter(|b| !b.is_empty()) {
            args.push("--build".to_string());
            args.push(build.to_string());
        }
        self.push_namespace(&mut args);
        self.launcher.launch(&format!("Build log {pipeline}"), &args)
    }

    /// `start pipeline <pipeline>`
    pub fn start_pipeline(&self, pipeline: &str) -> Result<()> {
        let mut args = vec![
            "start".to_string(),
            "pipeline".to_string(),
            pipeline.to_string(),
        ];
        self.push_namespace(&mut args);
        self.launcher.launch(&format!("Start pipeline {pipeline}"), &args)
    }

    /// `stop pipeline <pipeline> --build <n>`
    pub fn stop_pipeline(&self, pipeline: &str, build: &str) -> Result<()> {
        let mut args = vec![
            "stop".to_string(),
            "pipeline".to_string(),
            pipeline.to_string(),
            "--build".to_string(),
            build.to_string(),
        ];
        self.push_namespace(&mut args);
        self.launcher.launch(&format!("Stop pipeline {pipeline}"), &args)
    }

    /// Opens the build log for the build node at `identity`.
    pub fn open_build_log_for(&self, tree: &PipelineTree, identity: &str) -> Result<()> {
        let build = resolve_build(tree, identity)?;
        self.open_build_log(&build.pipeline_name(), Some(build.build_number()))
    }

    /// Starts the pipeline behind the repo or build node at `identity`.
    pub fn start_pipeline_for(&self, tree: &PipelineTree, identity: &str) -> Result<()> {
        match tree.resolve(identity) {
            Some(NodeRef::Build(build)) => self.start_pipeline(&build.pipeline_name()),
            Some(NodeRef::Repo(repo)) => self.start_pipeline(&repo.full_name()),
            _ => Err(CiPanelError::UnknownNode(identity.to_string())),
        }
    }

    /// Stops the running build at `identity`.
    pub fn stop_pipeline_for(&self, tree: &PipelineTree, identity: &str) -> Result<()> {
        let build = resolve_build(tree, identity)?;
        self.stop_pipeline(&build.pipeline_name(), build.build_number())
    }
}

fn resolve_build<'a>(tree: &'a PipelineTree, identity: &str) -> Result<&'a BuildNode> {
    match tree.resolve(identity) {
        Some(NodeRef::Build(build)) => Ok(build),
        _ => Err(CiPanelError::UnknownNode(identity.to_string())),
    }
}
