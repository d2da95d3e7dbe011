use serde::Serialize;

use crate::model::{NodeRef, PipelineTree, StatusIcon, TreeNode};

/// Command bound to a tree item, invoked by the host when the item is
/// activated.
#[derive(Debug, Clone, Serialize)]
pub struct ItemCommand {
    pub command: String,
    pub title: String,
    pub arguments: Vec<String>,
}

/// Renderable descriptor for one tree node, in the shape the host's
/// tree-data-provider contract expects.
#[derive(Debug, Clone, Serialize)]
pub struct TreeItem {
    pub label: String,
    pub identity: String,
    pub context: &'static str,
    pub tooltip: String,
    pub icon: Option<&'static str>,
    /// Branch items start collapsed on the host side.
    pub collapsible: bool,
    pub command: Option<ItemCommand>,
}

/// Maps a node to its renderable item. Stateless: everything is read from
/// the node, nothing is cached here.
pub fn tree_item(node: NodeRef<'_>) -> TreeItem {
    let inner = node.as_node();
    let command = match node {
        NodeRef::Stage(stage) => stage.url().map(|url| ItemCommand {
            command: "cipanel.openUrl".to_string(),
            title: "Open in Browser".to_string(),
            arguments: vec![url.to_owned()],
        }),
        _ => None,
    };

    TreeItem {
        label: inner.label().to_owned(),
        identity: inner.identity().to_owned(),
        context: inner.context().as_str(),
        tooltip: inner.tooltip(),
        icon: inner.icon().as_ref().map(StatusIcon::asset_key),
        collapsible: inner.is_branch(),
        command,
    }
}

/// Children of the node at `identity` (or the top-level owners when absent),
/// already mapped to renderable items. Unknown identities yield no children.
pub fn children(tree: &PipelineTree, identity: Option<&str>) -> Vec<TreeItem> {
    let nodes = match identity {
        Some(identity) => match tree.resolve(identity) {
            Some(node) => tree.children(Some(node)),
            None => Vec::new(),
        },
        None => tree.children(None),
    };
    nodes.into_iter().map(tree_item).collect()
}

/// Parent item of the node at `identity`, derived by truncating the last
/// identity segment. Owners (and unknown identities) have no parent item.
pub fn parent(tree: &PipelineTree, identity: &str) -> Option<TreeItem> {
    let (parent_identity, _) = identity.rsplit_once('/')?;
    if parent_identity == tree.base_identity() {
        return None;
    }
    tree.resolve(parent_identity).map(tree_item)
}

/// Flattens the whole tree into items in depth-first display order, for
/// serialized snapshots.
pub fn snapshot(tree: &PipelineTree) -> Vec<TreeItem> {
    fn walk(node: NodeRef<'_>, out: &mut Vec<TreeItem>) {
        out.push(tree_item(node));
        for child in node.children() {
            walk(child, out);
        }
    }

    let mut items = Vec::new();
    for owner in tree.children(None) {
        walk(owner, &mut items);
    }
    items
}

/// Placeholder content for synthetic documents under the reserved scheme.
/// Purely a host text-provider shim; the panel itself renders from items.
pub fn document_content(identity: &str) -> String {
    format!("Pipeline activity view: {identity}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActivitySpec, ActivityStep, PipelineActivity, PromoteActivityStep, StageActivityStep,
    };

    fn seeded_tree() -> PipelineTree {
        let mut tree = PipelineTree::new();
        let obj = PipelineActivity {
            spec: ActivitySpec {
                status: Some("Succeeded".to_string()),
                steps: vec![
                    ActivityStep {
                        stage: Some(StageActivityStep {
                            name: Some("Build".to_string()),
                            status: Some("Succeeded".to_string()),
                            ..StageActivityStep::default()
                        }),
                        ..ActivityStep::default()
                    },
                    ActivityStep {
                        promote: Some(PromoteActivityStep {
                            environment: Some("staging".to_string()),
                            application_url: Some("http://app.example".to_string()),
                            ..PromoteActivityStep::default()
                        }),
                        ..ActivityStep::default()
                    },
                ],
                ..ActivitySpec::default()
            },
            ..PipelineActivity::default()
        };
        tree.upsert("acme", "widgets", "3", &obj);
        tree
    }

    #[test]
    fn test_top_level_children_are_owners() {
        let tree = seeded_tree();
        let items = children(&tree, None);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "acme");
        assert_eq!(items[0].context, "pipeline.owner");
        assert_eq!(items[0].identity, "cipanel://pipelines/acme");
        assert!(items[0].collapsible);
        assert!(items[0].command.is_none());
    }

    #[test]
    fn test_build_item_carries_status_icon() {
        let tree = seeded_tree();
        let items = children(&tree, Some("cipanel://pipelines/acme/widgets"));

        assert_eq!(items[0].label, "3");
        assert_eq!(items[0].icon, Some("build-passed"));
        assert!(items[0].tooltip.starts_with("acme/widgets #3: Succeeded"));
    }

    #[test]
    fn test_app_stage_gets_open_url_command() {
        let tree = seeded_tree();
        let items = children(&tree, Some("cipanel://pipelines/acme/widgets/3"));

        let app = items
            .iter()
            .find(|i| i.label == "App promoted to Staging")
            .expect("app stage item");
        assert_eq!(app.context, "pipeline.stage.app");
        assert!(!app.collapsible);
        let command = app.command.as_ref().expect("open-url command");
        assert_eq!(command.command, "cipanel.openUrl");
        assert_eq!(command.arguments, vec!["http://app.example"]);
    }

    #[test]
    fn test_plain_stage_has_no_command() {
        let tree = seeded_tree();
        let items = children(&tree, Some("cipanel://pipelines/acme/widgets/3"));

        let build_stage = items.iter().find(|i| i.label == "Build").unwrap();
        assert!(build_stage.command.is_none());
    }

    #[test]
    fn test_unknown_identity_has_no_children() {
        let tree = seeded_tree();
        assert!(children(&tree, Some("cipanel://pipelines/nope")).is_empty());
    }

    #[test]
    fn test_parent_walks_up_one_level() {
        let tree = seeded_tree();

        let repo = parent(&tree, "cipanel://pipelines/acme/widgets/3").unwrap();
        assert_eq!(repo.label, "widgets");
        let owner = parent(&tree, "cipanel://pipelines/acme/widgets").unwrap();
        assert_eq!(owner.label, "acme");
        assert!(parent(&tree, "cipanel://pipelines/acme").is_none());
    }

    #[test]
    fn test_snapshot_is_depth_first_display_order() {
        let tree = seeded_tree();
        let identities: Vec<_> = snapshot(&tree).into_iter().map(|i| i.identity).collect();

        assert_eq!(identities[0], "cipanel://pipelines/acme");
        assert_eq!(identities[1], "cipanel://pipelines/acme/widgets");
        assert_eq!(identities[2], "cipanel://pipelines/acme/widgets/3");
        assert!(identities[3].starts_with("cipanel://pipelines/acme/widgets/3/"));
    }

    #[test]
    fn test_document_content_is_placeholder() {
        let content = document_content("cipanel://pipelines/acme/widgets/3");
        assert!(content.contains("cipanel://pipelines/acme/widgets/3"));
    }
}
