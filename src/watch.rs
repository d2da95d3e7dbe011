use futures::{Stream, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::model::{PipelineActivity, PipelineTree};

/// Kind of change a watch event reports. The upper-case spellings are what
/// the cluster puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEventType {
    #[serde(alias = "ADDED")]
    Added,
    #[serde(alias = "MODIFIED")]
    Modified,
    #[serde(alias = "DELETED")]
    Deleted,
}

/// One cluster watch event: a change kind plus the full object as of that
/// change. Events are unordered across keys but in-order per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type", alias = "eventType")]
    pub event_type: WatchEventType,
    pub object: PipelineActivity,
}

/// Consumes a watch-event stream serially, applying each event to the tree.
///
/// The event source is injected; this crate never owns the transport.
/// `on_change` runs after each applied mutation (and its change
/// notification), mirroring how the host view re-queries on change. Returns
/// the number of events applied.
pub async fn drive<S, F>(tree: &mut PipelineTree, mut events: S, mut on_change: F) -> u64
where
    S: Stream<Item = WatchEvent> + Unpin,
    F: FnMut(&PipelineTree),
{
    let mut applied = 0;
    while let Some(event) = events.next().await {
        if tree.apply(&event) {
            applied += 1;
            on_change(tree);
        }
    }
    debug!("Watch stream ended after {applied} applied events");
    applied
}

/// Parses one NDJSON line into a watch event.
pub fn parse_event(line: &str) -> crate::error::Result<WatchEvent> {
    Ok(serde_json::from_str(line)?)
}

/// Adapts a newline-delimited JSON reader (file or stdin) into a watch-event
/// stream. Blank lines are skipped; unparseable lines are logged and
/// dropped, read errors end the stream.
pub fn ndjson_events<R>(reader: R) -> impl Stream<Item = WatchEvent>
where
    R: AsyncBufRead + Unpin,
{
    futures::stream::unfold(reader.lines(), |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_event(&line) {
                        Ok(event) => return Some((event, lines)),
                        Err(e) => {
                            warn!("Skipping malformed watch event: {e}");
                        }
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Watch stream read error: {e}");
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeNode;

    fn event_line(event_type: &str, owner: &str, repo: &str, build: &str) -> String {
        format!(
            r#"{{"type": "{event_type}", "object": {{"spec": {{"build": "{build}", "gitOwner": "{owner}", "gitRepository": "{repo}"}}}}}}"#
        )
    }

    #[test]
    fn test_event_type_accepts_wire_spelling() {
        let added: WatchEventType = serde_json::from_str(r#""ADDED""#).unwrap();
        assert_eq!(added, WatchEventType::Added);
        let modified: WatchEventType = serde_json::from_str(r#""Modified""#).unwrap();
        assert_eq!(modified, WatchEventType::Modified);
    }

    #[tokio::test]
    async fn test_drive_applies_events_in_order() {
        let input = [
            event_line("ADDED", "acme", "widgets", "1"),
            event_line("ADDED", "acme", "widgets", "2"),
            event_line("DELETED", "acme", "widgets", "1"),
        ]
        .join("\n");

        let mut tree = PipelineTree::new();
        let events = ndjson_events(tokio::io::BufReader::new(input.as_bytes()));
        futures::pin_mut!(events);

        let mut notifications = 0;
        let applied = drive(&mut tree, events, |_| notifications += 1).await;

        assert_eq!(applied, 3);
        assert_eq!(notifications, 3);
        let owners = tree.children(None);
        let repos = tree.children(Some(owners[0]));
        let builds = tree.children(Some(repos[0]));
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].as_node().label(), "2");
    }

    #[tokio::test]
    async fn test_drive_skips_malformed_lines_and_unkeyed_objects() {
        let input = [
            "not json at all".to_string(),
            String::new(),
            r#"{"type": "ADDED", "object": {"metadata": {"name": "no-key"}}}"#.to_string(),
            event_line("ADDED", "acme", "widgets", "1"),
        ]
        .join("\n");

        let mut tree = PipelineTree::new();
        let events = ndjson_events(tokio::io::BufReader::new(input.as_bytes()));
        futures::pin_mut!(events);

        let applied = drive(&mut tree, events, |_| {}).await;

        assert_eq!(applied, 1);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_ndjson_stream_with_block_on() {
        let input = event_line("ADDED", "acme", "widgets", "5");
        let events = ndjson_events(tokio::io::BufReader::new(input.as_bytes()));
        futures::pin_mut!(events);

        let collected: Vec<WatchEvent> = tokio_test::block_on(events.collect());
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].event_type, WatchEventType::Added);
        assert_eq!(collected[0].object.spec.build.as_deref(), Some("5"));
    }
}
