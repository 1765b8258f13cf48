//! Helpers for the OData node listings served by the product archive.
//!
//! A listing is an Atom feed: every child node is an `entry` whose `link`
//! elements point at the node itself (`title="Node"`) and, for files, at the
//! raw content (`type="application/octet-stream"`).
use roxmltree::{Document, Node};

const NODE_LINK_TITLE: &str = "Node";
const OCTET_STREAM: &str = "application/octet-stream";

/// Join path segments onto `base` the way POSIX paths are joined: a segment
/// that is itself absolute (or a full URL) replaces what came before it.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.to_owned();
    for segment in segments {
        if segment.starts_with('/') || segment.contains("://") {
            url = segment.to_string();
        } else {
            if !url.is_empty() && !url.ends_with('/') {
                url.push('/');
            }
            url.push_str(segment);
        }
    }
    url
}

/// Everything before the last `/` of `url`, without trailing slashes.
pub fn parent_url(url: &str) -> &str {
    match url.rsplit_once('/') {
        Some((head, _)) => {
            let trimmed = head.trim_end_matches('/');
            if trimmed.is_empty() || trimmed.ends_with(':') {
                head
            } else {
                trimmed
            }
        }
        None => "",
    }
}

/// Parsed node listing, borrowed from the response text it came from.
pub struct NodeTree<'input> {
    doc: Document<'input>,
}

impl<'input> NodeTree<'input> {
    pub fn parse(content: &'input str) -> Result<Self, roxmltree::Error> {
        let doc = Document::parse(content)?;
        Ok(Self { doc })
    }

    fn entries(&self) -> impl Iterator<Item = Node<'_, 'input>> {
        self.doc.descendants().filter(|n| n.has_tag_name("entry"))
    }

    /// References of every child node, in listing order. Entries without a
    /// node link are ignored.
    pub fn node_refs(&self) -> Vec<String> {
        self.entries().filter_map(extract_node_ref).collect()
    }

    /// References of every binary file in the listing, in listing order.
    pub fn octet_stream_refs(&self) -> Vec<String> {
        self.entries().flat_map(extract_octet_stream_refs).collect()
    }
}

fn extract_node_ref(entry: Node) -> Option<String> {
    let link = entry
        .descendants()
        .filter(|n| n.has_tag_name("link"))
        .find(|n| n.attribute("title") == Some(NODE_LINK_TITLE))?;
    Some(link.attribute("href")?.to_string())
}

fn extract_octet_stream_refs(entry: Node) -> Vec<String> {
    entry
        .children()
        .filter(|n| n.has_tag_name("link"))
        .filter(|n| n.attribute("type") == Some(OCTET_STREAM))
        .filter_map(|n| n.attribute("href"))
        .map(str::to_string)
        .collect()
}
