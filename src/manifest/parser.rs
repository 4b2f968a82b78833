// ABOUTME: Namespace-aware manifest parser extracting (client_id, address) pairs per node
// ABOUTME: Walks direct children of the root and keeps the first Emulab vnode of each node

use anyhow::{Context, Result};
use quick_xml::NsReader;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::fs;
use std::path::Path;

/// GENI reservation-description namespace holding `<node>` elements.
pub const RSPEC_NS: &[u8] = b"http://www.geni.net/resources/rspec/3";

/// Emulab extension namespace holding `<vnode>` descriptors.
pub const EMULAB_NS: &[u8] = b"http://www.protogeni.net/resources/rspec/ext/emulab/1";

const NODE_TAG: &[u8] = b"node";
const VNODE_TAG: &[u8] = b"vnode";

// Root element sits at depth 1.
const NODE_DEPTH: usize = 2;
const DESCRIPTOR_DEPTH: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub identifier: String, // client_id from the manifest
    pub address: String,    // vnode name plus domain suffix
}

impl NodeRecord {
    pub fn new(identifier: String, host_name: &str, domain_suffix: &str) -> Self {
        Self {
            identifier,
            address: format!("{host_name}{domain_suffix}"),
        }
    }
}

pub fn parse_manifest(path: &Path, domain_suffix: &str) -> Result<Vec<NodeRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    parse_manifest_content(&content, domain_suffix)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// A `<node>` whose end tag has not been seen yet.
struct PendingNode {
    client_id: String,
    host_name: Option<String>,
}

struct NodeCollector<'a> {
    domain_suffix: &'a str,
    pending: Option<PendingNode>,
    records: Vec<NodeRecord>,
}

impl<'a> NodeCollector<'a> {
    fn new(domain_suffix: &'a str) -> Self {
        Self {
            domain_suffix,
            pending: None,
            records: Vec::new(),
        }
    }

    fn open(&mut self, ns: &ResolveResult, e: &BytesStart, depth: usize) -> Result<()> {
        match depth {
            NODE_DEPTH if is_element(ns, e, RSPEC_NS, NODE_TAG) => {
                self.pending = Some(PendingNode {
                    client_id: require_attr(e, b"client_id")?,
                    host_name: None,
                });
            }
            DESCRIPTOR_DEPTH => {
                if let Some(node) = self.pending.as_mut() {
                    // First descriptor wins; later ones are never inspected.
                    if node.host_name.is_none() && is_element(ns, e, EMULAB_NS, VNODE_TAG) {
                        node.host_name = Some(require_attr(e, b"name")?);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, depth: usize) {
        if depth != NODE_DEPTH {
            return;
        }

        if let Some(node) = self.pending.take() {
            match node.host_name {
                Some(host_name) => self.records.push(NodeRecord::new(
                    node.client_id,
                    &host_name,
                    self.domain_suffix,
                )),
                None => {
                    tracing::debug!("Node '{}' has no vnode descriptor, skipping", node.client_id)
                }
            }
        }
    }
}

pub fn parse_manifest_content(content: &str, domain_suffix: &str) -> Result<Vec<NodeRecord>> {
    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut collector = NodeCollector::new(domain_suffix);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .context("Error parsing manifest XML")?;

        match event {
            Event::Start(ref e) => {
                check_element(&ns, e, depth, seen_root)?;
                depth += 1;
                seen_root = true;
                collector.open(&ns, e, depth)?;
            }
            Event::Empty(ref e) => {
                check_element(&ns, e, depth, seen_root)?;
                seen_root = true;
                collector.open(&ns, e, depth + 1)?;
                collector.close(depth + 1);
            }
            Event::End(_) => {
                collector.close(depth);
                depth = depth.saturating_sub(1);
            }
            Event::Text(_) | Event::CData(_) if depth == 0 => {
                anyhow::bail!("Manifest has text outside the root element");
            }
            Event::GeneralRef(ref e) => check_entity(e, depth)?,
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        anyhow::bail!("Manifest has no root element");
    }
    if depth != 0 {
        anyhow::bail!("Manifest ended with {depth} unclosed element(s)");
    }

    Ok(collector.records)
}

/// Reject a second root element and element prefixes with no namespace binding.
fn check_element(
    ns: &ResolveResult,
    e: &BytesStart,
    depth: usize,
    seen_root: bool,
) -> Result<()> {
    if depth == 0 && seen_root {
        anyhow::bail!(
            "Manifest has content after the root element: <{}>",
            String::from_utf8_lossy(e.name().as_ref())
        );
    }
    if let ResolveResult::Unknown(prefix) = ns {
        anyhow::bail!(
            "Unbound namespace prefix '{}' on <{}>",
            String::from_utf8_lossy(prefix),
            String::from_utf8_lossy(e.name().as_ref())
        );
    }
    Ok(())
}

/// Only character references and the predefined XML entities are accepted in text.
fn check_entity(e: &BytesRef, depth: usize) -> Result<()> {
    if depth == 0 {
        anyhow::bail!("Manifest has an entity reference outside the root element");
    }
    let char_ref = e
        .resolve_char_ref()
        .context("Invalid character reference in manifest")?;
    if char_ref.is_some() {
        return Ok(());
    }
    match &**e {
        b"lt" | b"gt" | b"amp" | b"apos" | b"quot" => Ok(()),
        name => anyhow::bail!(
            "Undefined entity '&{};' in manifest",
            String::from_utf8_lossy(name)
        ),
    }
}

fn is_element(ns: &ResolveResult, e: &BytesStart, namespace: &[u8], local: &[u8]) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == namespace)
        && e.local_name().as_ref() == local
}

fn get_attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.context("Invalid attribute in manifest")?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .context("Invalid attribute value in manifest")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn require_attr(e: &BytesStart, name: &[u8]) -> Result<String> {
    get_attr(e, name)?.with_context(|| {
        format!(
            "<{}> is missing required attribute '{}'",
            String::from_utf8_lossy(e.local_name().as_ref()),
            String::from_utf8_lossy(name)
        )
    })
}
