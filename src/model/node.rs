use std::cmp::Ordering;

use indexmap::IndexMap;
use url::Url;

use super::activity::{ActivitySpec, PipelineActivity};
use super::status::{capitalize, elapsed_time, StatusIcon};

const UNKNOWN_STATUS: &str = "Unknown";
const ELAPSED_PREFIX: &str = ", took ";

/// Context tag attached to each rendered node. The host uses it to decide
/// which commands a node is eligible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContext {
    Owner,
    Repo,
    Build,
    Stage,
    App,
    PullRequest,
    Update,
}

impl NodeContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "pipeline.owner",
            Self::Repo => "pipeline.repo",
            Self::Build => "pipeline.build",
            Self::Stage => "pipeline.stage",
            Self::App => "pipeline.stage.app",
            Self::PullRequest => "pipeline.stage.pullRequest",
            Self::Update => "pipeline.stage.update",
        }
    }
}

/// Capability contract shared by all node variants. Children and parents are
/// navigated through [`NodeRef`] and the tree, so the trait stays object-safe
/// and free of tree back-pointers.
pub trait TreeNode {
    fn label(&self) -> &str;

    /// Hierarchical identity resource, stable across upserts of the same key.
    fn identity(&self) -> &str;

    fn context(&self) -> NodeContext;

    fn tooltip(&self) -> String;

    fn icon(&self) -> Option<StatusIcon> {
        None
    }

    /// Branch nodes render with a collapse affordance; leaves do not.
    fn is_branch(&self) -> bool;
}

/// An organisation (top-level folder) owning repositories.
#[derive(Debug)]
pub struct OwnerNode {
    pub(crate) name: String,
    uri: String,
    pub(crate) repos: IndexMap<String, RepoNode>,
}

impl OwnerNode {
    pub(crate) fn new(base_uri: &str, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            uri: format!("{base_uri}/{name}"),
            repos: IndexMap::new(),
        }
    }

    /// Repositories in lexicographic key order.
    pub fn sorted_repos(&self) -> Vec<&RepoNode> {
        let mut repos: Vec<_> = self.repos.values().collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        repos
    }
}

impl TreeNode for OwnerNode {
    fn label(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> &str {
        &self.uri
    }

    fn context(&self) -> NodeContext {
        NodeContext::Owner
    }

    fn tooltip(&self) -> String {
        self.name.clone()
    }

    fn is_branch(&self) -> bool {
        true
    }
}

/// A repository under an owner, holding its builds keyed by build number.
#[derive(Debug)]
pub struct RepoNode {
    pub(crate) owner: String,
    pub(crate) name: String,
    uri: String,
    pub(crate) builds: IndexMap<String, BuildNode>,
}

impl RepoNode {
    pub(crate) fn new(owner_uri: &str, owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
            uri: format!("{owner_uri}/{name}"),
            builds: IndexMap::new(),
        }
    }

    /// `owner/name`, the pipeline prefix for CLI invocations.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Builds in display order: numeric build numbers descending, then
    /// non-numeric ones.
    pub fn sorted_builds(&self) -> Vec<&BuildNode> {
        let mut builds: Vec<_> = self.builds.values().collect();
        builds.sort_by(|a, b| build_number_order(&a.build, &b.build));
        builds
    }
}

impl TreeNode for RepoNode {
    fn label(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> &str {
        &self.uri
    }

    fn context(&self) -> NodeContext {
        NodeContext::Repo
    }

    fn tooltip(&self) -> String {
        self.full_name()
    }

    fn is_branch(&self) -> bool {
        true
    }
}

/// Display ordering for build numbers: numeric descending, non-numeric last
/// (lexicographic among themselves so the order stays deterministic).
pub(crate) fn build_number_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// One build of a repository. Holds the latest raw activity object and the
/// stage list derived from it.
#[derive(Debug)]
pub struct BuildNode {
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) build: String,
    uri: String,
    activity: PipelineActivity,
    stages: Vec<StageNode>,
}

impl BuildNode {
    pub(crate) fn new(
        repo_uri: &str,
        owner: &str,
        repo: &str,
        build: &str,
        activity: PipelineActivity,
    ) -> Self {
        let uri = format!("{repo_uri}/{build}");
        let stages = derive_stages(&uri, &activity.spec);
        Self {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            build: build.to_owned(),
            uri,
            activity,
            stages,
        }
    }

    /// Replaces the raw object and rebuilds the stage list wholesale. Stages
    /// derived from a previous version never survive this.
    pub(crate) fn update(&mut self, activity: PipelineActivity) {
        self.stages = derive_stages(&self.uri, &activity.spec);
        self.activity = activity;
    }

    pub fn build_number(&self) -> &str {
        &self.build
    }

    pub fn stages(&self) -> &[StageNode] {
        &self.stages
    }

    pub fn status(&self) -> &str {
        self.activity
            .spec
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STATUS)
    }

    /// Pipeline name for CLI invocations (`owner/repo/branch` when known).
    pub fn pipeline_name(&self) -> String {
        self.activity
            .spec
            .pipeline
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}/{}", self.owner, self.repo))
    }
}

impl TreeNode for BuildNode {
    fn label(&self) -> &str {
        &self.build
    }

    fn identity(&self) -> &str {
        &self.uri
    }

    fn context(&self) -> NodeContext {
        NodeContext::Build
    }

    fn tooltip(&self) -> String {
        let spec = &self.activity.spec;
        format!(
            "{}/{} #{}: {}{}",
            self.owner,
            self.repo,
            self.build,
            self.status(),
            elapsed_time(
                ELAPSED_PREFIX,
                spec.started_timestamp.as_deref(),
                spec.completed_timestamp.as_deref(),
            )
        )
    }

    fn icon(&self) -> Option<StatusIcon> {
        StatusIcon::for_status(self.status())
    }

    fn is_branch(&self) -> bool {
        true
    }
}

/// A leaf stage row under a build: a named phase or a synthesized
/// promotion/pull-request/update sub-event.
#[derive(Debug)]
pub struct StageNode {
    name: String,
    uri: String,
    context: NodeContext,
    url: Option<String>,
    status: String,
    started: Option<String>,
    completed: Option<String>,
}

impl StageNode {
    fn new(
        build_uri: &str,
        name: String,
        context: NodeContext,
        url: Option<String>,
        status: Option<&str>,
        started: Option<&str>,
        completed: Option<&str>,
    ) -> Self {
        Self {
            uri: format!("{build_uri}/{name}"),
            name,
            context,
            url: url.filter(|u| !u.is_empty()),
            status: status
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_STATUS)
                .to_owned(),
            started: started.map(str::to_owned),
            completed: completed.map(str::to_owned),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl TreeNode for StageNode {
    fn label(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> &str {
        &self.uri
    }

    fn context(&self) -> NodeContext {
        self.context
    }

    fn tooltip(&self) -> String {
        format!(
            "{}: {}{}",
            self.name,
            self.status,
            elapsed_time(ELAPSED_PREFIX, self.started.as_deref(), self.completed.as_deref())
        )
    }

    fn icon(&self) -> Option<StatusIcon> {
        StatusIcon::for_status(&self.status)
    }

    fn is_branch(&self) -> bool {
        false
    }
}

/// Borrowed reference to any node variant, for uniform tree walks.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Owner(&'a OwnerNode),
    Repo(&'a RepoNode),
    Build(&'a BuildNode),
    Stage(&'a StageNode),
}

impl<'a> NodeRef<'a> {
    pub fn as_node(&self) -> &'a dyn TreeNode {
        match self {
            Self::Owner(node) => *node,
            Self::Repo(node) => *node,
            Self::Build(node) => *node,
            Self::Stage(node) => *node,
        }
    }

    /// Children in display order. Stages keep the order derived from the
    /// latest activity object and are never re-sorted.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self {
            Self::Owner(owner) => owner.sorted_repos().into_iter().map(NodeRef::Repo).collect(),
            Self::Repo(repo) => repo.sorted_builds().into_iter().map(NodeRef::Build).collect(),
            Self::Build(build) => build.stages().iter().map(NodeRef::Stage).collect(),
            Self::Stage(_) => Vec::new(),
        }
    }

    pub fn identity(&self) -> &'a str {
        match self {
            Self::Owner(node) => node.identity(),
            Self::Repo(node) => node.identity(),
            Self::Build(node) => node.identity(),
            Self::Stage(node) => node.identity(),
        }
    }
}

/// Derives the stage rows for a build from its raw step history.
///
/// Emission order per step is: stage, promote, pull request, update, app.
/// That order defines on-screen order and must not change.
fn derive_stages(build_uri: &str, spec: &ActivitySpec) -> Vec<StageNode> {
    let mut stages = Vec::new();

    for step in &spec.steps {
        if let Some(stage) = &step.stage {
            stages.push(StageNode::new(
                build_uri,
                stage.name.clone().unwrap_or_default(),
                NodeContext::Stage,
                None,
                stage.status.as_deref(),
                stage.started_timestamp.as_deref(),
                stage.completed_timestamp.as_deref(),
            ));
        }

        let Some(promote) = &step.promote else {
            continue;
        };

        let environment = capitalize(promote.environment.as_deref().unwrap_or_default());
        let promote_name = format!("Promote to {environment}");
        let app_url = promote
            .application_url
            .as_deref()
            .filter(|u| !u.is_empty());
        let promote_context = if app_url.is_some() {
            NodeContext::App
        } else {
            NodeContext::Stage
        };

        stages.push(StageNode::new(
            build_uri,
            promote_name.clone(),
            promote_context,
            None,
            promote.status.as_deref(),
            promote.started_timestamp.as_deref(),
            promote.completed_timestamp.as_deref(),
        ));

        if let Some(pull_request) = &promote.pull_request {
            let pr_url = pull_request.pull_request_url.as_deref().unwrap_or_default();
            let mut name = format!("{promote_name} Pull Request");
            if let Some(number) = trailing_path_segment(pr_url) {
                name.push_str(&format!(" #{number}"));
            }
            stages.push(StageNode::new(
                build_uri,
                name,
                NodeContext::PullRequest,
                Some(pr_url.to_owned()),
                pull_request.status.as_deref(),
                pull_request.started_timestamp.as_deref(),
                pull_request.completed_timestamp.as_deref(),
            ));
        }

        if let Some(update) = &promote.update {
            // First non-empty URL in the update's status list wins.
            let url = update
                .statuses
                .iter()
                .find_map(|s| s.url.as_deref().filter(|u| !u.is_empty()))
                .map(str::to_owned);
            stages.push(StageNode::new(
                build_uri,
                format!("{promote_name} Update"),
                NodeContext::Update,
                url,
                update.status.as_deref(),
                update.started_timestamp.as_deref(),
                update.completed_timestamp.as_deref(),
            ));
        }

        if let Some(app_url) = app_url {
            stages.push(StageNode::new(
                build_uri,
                format!("App promoted to {environment}"),
                NodeContext::App,
                Some(app_url.to_owned()),
                promote.status.as_deref(),
                promote.started_timestamp.as_deref(),
                promote.completed_timestamp.as_deref(),
            ));
        }
    }

    stages
}

/// Last non-empty path segment of a URL, used as the pull-request number.
fn trailing_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::activity::{
        ActivityStep, GitStatus, PromoteActivityStep, PromotePullRequest, PromoteUpdate,
        StageActivityStep,
    };

    fn stage_step(name: &str, status: &str) -> ActivityStep {
        ActivityStep {
            stage: Some(StageActivityStep {
                name: Some(name.to_string()),
                status: Some(status.to_string()),
                ..StageActivityStep::default()
            }),
            ..ActivityStep::default()
        }
    }

    fn spec_with_steps(steps: Vec<ActivityStep>) -> ActivitySpec {
        ActivitySpec {
            steps,
            ..ActivitySpec::default()
        }
    }

    fn stage_names(stages: &[StageNode]) -> Vec<&str> {
        stages.iter().map(|s| s.label()).collect()
    }

    #[test]
    fn test_plain_stage_steps_in_order() {
        let spec = spec_with_steps(vec![
            stage_step("Build", "Succeeded"),
            stage_step("Test", "Running"),
        ]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);

        assert_eq!(stage_names(&stages), vec!["Build", "Test"]);
        assert_eq!(stages[0].context(), NodeContext::Stage);
        assert_eq!(stages[0].icon(), Some(StatusIcon::Passed));
        assert_eq!(stages[1].icon(), Some(StatusIcon::Running));
    }

    #[test]
    fn test_promote_expansion_order() {
        let spec = spec_with_steps(vec![ActivityStep {
            promote: Some(PromoteActivityStep {
                environment: Some("staging".to_string()),
                application_url: Some("http://x".to_string()),
                pull_request: Some(PromotePullRequest {
                    pull_request_url: Some("http://git/pr/42".to_string()),
                    ..PromotePullRequest::default()
                }),
                ..PromoteActivityStep::default()
            }),
            ..ActivityStep::default()
        }]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);

        assert_eq!(
            stage_names(&stages),
            vec![
                "Promote to Staging",
                "Promote to Staging Pull Request #42",
                "App promoted to Staging",
            ]
        );
        assert_eq!(stages[0].context(), NodeContext::App);
        assert_eq!(stages[1].context(), NodeContext::PullRequest);
        assert_eq!(stages[1].url(), Some("http://git/pr/42"));
        assert_eq!(stages[2].context(), NodeContext::App);
        assert_eq!(stages[2].url(), Some("http://x"));
    }

    #[test]
    fn test_promote_without_app_url_is_generic_stage() {
        let spec = spec_with_steps(vec![ActivityStep {
            promote: Some(PromoteActivityStep {
                environment: Some("production".to_string()),
                ..PromoteActivityStep::default()
            }),
            ..ActivityStep::default()
        }]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);

        assert_eq!(stage_names(&stages), vec!["Promote to Production"]);
        assert_eq!(stages[0].context(), NodeContext::Stage);
        assert_eq!(stages[0].url(), None);
    }

    #[test]
    fn test_pull_request_without_number_suffix() {
        let spec = spec_with_steps(vec![ActivityStep {
            promote: Some(PromoteActivityStep {
                environment: Some("staging".to_string()),
                pull_request: Some(PromotePullRequest::default()),
                ..PromoteActivityStep::default()
            }),
            ..ActivityStep::default()
        }]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);

        assert_eq!(
            stage_names(&stages),
            vec!["Promote to Staging", "Promote to Staging Pull Request"]
        );
    }

    #[test]
    fn test_update_takes_first_non_empty_status_url() {
        let spec = spec_with_steps(vec![ActivityStep {
            promote: Some(PromoteActivityStep {
                environment: Some("staging".to_string()),
                update: Some(PromoteUpdate {
                    statuses: vec![
                        GitStatus {
                            url: Some(String::new()),
                            status: None,
                        },
                        GitStatus {
                            url: Some("http://first".to_string()),
                            status: None,
                        },
                        GitStatus {
                            url: Some("http://second".to_string()),
                            status: None,
                        },
                    ],
                    status: Some("Succeeded".to_string()),
                    ..PromoteUpdate::default()
                }),
                ..PromoteActivityStep::default()
            }),
            ..ActivityStep::default()
        }]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);

        let update = &stages[1];
        assert_eq!(update.label(), "Promote to Staging Update");
        assert_eq!(update.context(), NodeContext::Update);
        assert_eq!(update.url(), Some("http://first"));
        // The update row reports the update record's own status.
        assert_eq!(update.status(), "Succeeded");
    }

    #[test]
    fn test_steps_without_stage_or_promote_are_skipped() {
        let spec = spec_with_steps(vec![ActivityStep::default(), stage_step("Build", "Succeeded")]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);
        assert_eq!(stage_names(&stages), vec!["Build"]);
    }

    #[test]
    fn test_stage_identity_appends_name_to_build_identity() {
        let spec = spec_with_steps(vec![stage_step("Build", "Succeeded")]);
        let stages = derive_stages("cipanel://pipelines/acme/widgets/3", &spec);
        assert_eq!(stages[0].identity(), "cipanel://pipelines/acme/widgets/3/Build");
    }

    #[test]
    fn test_build_number_order() {
        let mut numbers = vec!["3", "1", "10", "abc"];
        numbers.sort_by(|a, b| build_number_order(a, b));
        assert_eq!(numbers, vec!["10", "3", "1", "abc"]);
    }

    #[test]
    fn test_trailing_path_segment() {
        assert_eq!(trailing_path_segment("http://git/pr/42"), Some("42".to_string()));
        assert_eq!(trailing_path_segment("http://git/pr/42/"), Some("42".to_string()));
        assert_eq!(trailing_path_segment("http://git"), None);
        assert_eq!(trailing_path_segment(""), None);
        assert_eq!(trailing_path_segment("not a url"), None);
    }

    #[test]
    fn test_build_tooltip_defaults_to_unknown() {
        let build = BuildNode::new(
            "cipanel://pipelines/acme/widgets",
            "acme",
            "widgets",
            "3",
            PipelineActivity::default(),
        );
        assert_eq!(build.tooltip(), "acme/widgets #3: Unknown");
        assert_eq!(build.icon(), None);
    }
}
