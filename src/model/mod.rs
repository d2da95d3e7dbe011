mod activity;
mod node;
mod status;
mod tree;

pub use activity::{
    ActivityKey, ActivityMetadata, ActivitySpec, ActivityStep, GitStatus, PipelineActivity,
    PromoteActivityStep, PromotePullRequest, PromoteUpdate, StageActivityStep,
};
pub use node::{BuildNode, NodeContext, NodeRef, OwnerNode, RepoNode, StageNode, TreeNode};
pub use status::{capitalize, elapsed_time, StatusIcon};
pub use tree::{PipelineTree, IDENTITY_SCHEME};
