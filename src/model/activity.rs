use serde::{Deserialize, Serialize};

/// A pipeline-activity object as delivered by the cluster watch.
///
/// Mirrors the wire shape of the CRD. Every field below the metadata name is
/// optional: partially populated objects are normal while a build is in
/// flight, so consumers default instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineActivity {
    pub metadata: ActivityMetadata,
    pub spec: ActivitySpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMetadata {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivitySpec {
    /// Build number, kept as a string (the cluster does not guarantee it is
    /// numeric).
    pub build: Option<String>,
    pub git_owner: Option<String>,
    pub git_repository: Option<String>,
    /// Combined pipeline name, `owner/repo/branch`.
    pub pipeline: Option<String>,
    pub status: Option<String>,
    pub started_timestamp: Option<String>,
    pub completed_timestamp: Option<String>,
    pub build_logs_url: Option<String>,
    pub build_url: Option<String>,
    pub git_url: Option<String>,
    pub steps: Vec<ActivityStep>,
}

/// One entry of the activity's step history. A step carries a `stage`
/// sub-record, a `promote` sub-record, or neither (in which case it is
/// skipped during stage derivation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityStep {
    pub stage: Option<StageActivityStep>,
    pub promote: Option<PromoteActivityStep>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageActivityStep {
    pub name: Option<String>,
    pub status: Option<String>,
    pub started_timestamp: Option<String>,
    pub completed_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromoteActivityStep {
    pub environment: Option<String>,
    pub status: Option<String>,
    pub started_timestamp: Option<String>,
    pub completed_timestamp: Option<String>,
    #[serde(rename = "applicationURL")]
    pub application_url: Option<String>,
    pub pull_request: Option<PromotePullRequest>,
    pub update: Option<PromoteUpdate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromotePullRequest {
    #[serde(rename = "pullRequestURL")]
    pub pull_request_url: Option<String>,
    pub status: Option<String>,
    pub started_timestamp: Option<String>,
    pub completed_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromoteUpdate {
    pub statuses: Vec<GitStatus>,
    pub status: Option<String>,
    pub started_timestamp: Option<String>,
    pub completed_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitStatus {
    pub url: Option<String>,
    pub status: Option<String>,
}

/// The (owner, repo, build) key a watch event addresses in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityKey {
    pub owner: String,
    pub repo: String,
    pub build: String,
}

impl ActivityKey {
    /// Derives the tree key from an activity object.
    ///
    /// The build number comes from `spec.build`. Owner and repo come from the
    /// explicit `gitOwner`/`gitRepository` pair when both are non-empty, else
    /// from the first two slash-delimited segments of `spec.pipeline`.
    /// Returns `None` when no complete key can be derived; such objects must
    /// be dropped, never upserted.
    pub fn from_activity(activity: &PipelineActivity) -> Option<Self> {
        let build = non_empty(activity.spec.build.as_deref())?.to_owned();

        let explicit = non_empty(activity.spec.git_owner.as_deref())
            .zip(non_empty(activity.spec.git_repository.as_deref()));

        let (owner, repo) = match explicit {
            Some((owner, repo)) => (owner.to_owned(), repo.to_owned()),
            None => {
                let pipeline = non_empty(activity.spec.pipeline.as_deref())?;
                let mut segments = pipeline.split('/');
                let owner = segments.next().filter(|s| !s.is_empty())?;
                let repo = segments.next().filter(|s| !s.is_empty())?;
                (owner.to_owned(), repo.to_owned())
            }
        };

        Some(Self { owner, repo, build })
    }

    /// Pipeline name used for CLI invocations: the activity's own `pipeline`
    /// field when present, else `owner/repo`.
    pub fn pipeline_name(&self, activity: &PipelineActivity) -> String {
        non_empty(activity.spec.pipeline.as_deref())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}/{}", self.owner, self.repo))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
