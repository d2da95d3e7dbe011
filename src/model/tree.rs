use indexmap::IndexMap;
use log::{debug, warn};
use tokio::sync::watch;

use super::activity::{ActivityKey, PipelineActivity};
use super::node::{BuildNode, NodeRef, OwnerNode, RepoNode, TreeNode};
use crate::watch::{WatchEvent, WatchEventType};

/// Scheme of the identity resources handed to the host UI.
pub const IDENTITY_SCHEME: &str = "cipanel";

/// Aggregate root of the pipeline-activity hierarchy.
///
/// Owns the Owner → Repo → Build → Stage tree and applies the idempotent
/// upsert/delete operations derived from cluster watch events. All mutation
/// runs to completion on the caller's task; the tree holds no locks and
/// expects a single logical mutator (the watch loop).
pub struct PipelineTree {
    base_uri: String,
    owners: IndexMap<String, OwnerNode>,
    revision: u64,
    changes: watch::Sender<u64>,
}

impl Default for PipelineTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTree {
    pub fn new() -> Self {
        Self::with_scheme(IDENTITY_SCHEME)
    }

    pub fn with_scheme(scheme: &str) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            base_uri: format!("{scheme}://pipelines"),
            owners: IndexMap::new(),
            revision: 0,
            changes,
        }
    }

    /// Identity resource of the (implicit) root node.
    pub fn base_identity(&self) -> &str {
        &self.base_uri
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Channel carrying the tree revision, bumped once per applied watch
    /// event. The view layer re-queries `children` when it observes a change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Applies one watch event and emits a single change notification.
    ///
    /// Events without a derivable (owner, repo, build) key are dropped with a
    /// diagnostic and do not notify; returns whether the event was applied.
    pub fn apply(&mut self, event: &WatchEvent) -> bool {
        let Some(key) = ActivityKey::from_activity(&event.object) else {
            warn!(
                "Dropping watch event with no derivable owner/repo/build (object: {:?})",
                event.object.metadata.name
            );
            return false;
        };

        debug!(
            "{:?} event for {} #{}",
            event.event_type,
            key.pipeline_name(&event.object),
            key.build
        );
        match event.event_type {
            WatchEventType::Added | WatchEventType::Modified => {
                self.upsert(&key.owner, &key.repo, &key.build, &event.object);
            }
            WatchEventType::Deleted => self.delete(&key.owner, &key.repo, &key.build),
        }

        self.notify();
        true
    }

    /// Creates any missing Owner/Repo/Build along the path, then replaces the
    /// build's raw object and rebuilds its stage list. No-op when any key
    /// segment is empty. Upserting the same key repeatedly reuses the
    /// existing nodes, so identity resources stay stable.
    pub fn upsert(&mut self, owner: &str, repo: &str, build: &str, activity: &PipelineActivity) {
        if owner.is_empty() || repo.is_empty() || build.is_empty() {
            return;
        }

        let base_uri = self.base_uri.clone();
        let owner_node = self
            .owners
            .entry(owner.to_owned())
            .or_insert_with(|| OwnerNode::new(&base_uri, owner));

        let owner_uri = owner_node.identity().to_owned();
        let repo_node = owner_node
            .repos
            .entry(repo.to_owned())
            .or_insert_with(|| RepoNode::new(&owner_uri, owner, repo));

        let repo_uri = repo_node.identity().to_owned();
        if let Some(existing) = repo_node.builds.get_mut(build) {
            existing.update(activity.clone());
        } else {
            debug!("New build {owner}/{repo} #{build}");
            repo_node.builds.insert(
                build.to_owned(),
                BuildNode::new(&repo_uri, owner, repo, build, activity.clone()),
            );
        }
    }

    /// Removes the build for the exact key, if present.
    ///
    /// Pruning happens at the owner level only: an emptied repo stays in its
    /// owner's map, and the owner is removed from the root once a delete
    /// leaves no builds under any of its repos. Unknown paths are a silent
    /// no-op.
    pub fn delete(&mut self, owner: &str, repo: &str, build: &str) {
        if owner.is_empty() || repo.is_empty() || build.is_empty() {
            return;
        }

        let Some(owner_node) = self.owners.get_mut(owner) else {
            return;
        };
        let Some(repo_node) = owner_node.repos.get_mut(repo) else {
            return;
        };
        if repo_node.builds.shift_remove(build).is_none() {
            return;
        }

        debug!("Removed build {owner}/{repo} #{build}");
        if owner_node.repos.values().all(|r| r.builds.is_empty()) {
            self.owners.shift_remove(owner);
        }
    }

    /// Children of a node in display order, or the sorted top-level owners
    /// when no node is given. Sort order is computed here, never stored.
    pub fn children<'a>(&'a self, node: Option<NodeRef<'a>>) -> Vec<NodeRef<'a>> {
        match node {
            Some(node) => node.children(),
            None => {
                let mut owners: Vec<_> = self.owners.values().collect();
                owners.sort_by(|a, b| a.label().cmp(b.label()));
                owners.into_iter().map(NodeRef::Owner).collect()
            }
        }
    }

    /// Depth-first search for a node by identity resource; first exact match
    /// wins. Unknown identities resolve to `None`.
    pub fn resolve(&self, identity: &str) -> Option<NodeRef<'_>> {
        fn walk<'a>(node: NodeRef<'a>, identity: &str) -> Option<NodeRef<'a>> {
            if node.identity() == identity {
                return Some(node);
            }
            node.children()
                .into_iter()
                .find_map(|child| walk(child, identity))
        }

        self.children(None)
            .into_iter()
            .find_map(|owner| walk(owner, identity))
    }

    fn notify(&mut self) {
        self.revision += 1;
        self.changes.send_replace(self.revision);
    }
}
