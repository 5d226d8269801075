/*!
 * Dependency analysis between document sections.
 *
 * The model backend is asked once per document which sections semantically
 * depend on which. The returned graph is advisory: it may be malformed,
 * reference unknown sections, or contain cycles. This module never fails
 * because of it — malformed responses degrade to the default document order
 * and cycles are broken deterministically.
 */

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::document::{DependencyEdge, Document};
use crate::providers::{ChatRequest, ModelBackend};

/// System prompt for the dependency-analysis request
const ANALYSIS_SYSTEM_PROMPT: &str = "You are a scientific document analyzer. \
Your task is to identify logical dependencies between sections.";

/// Per-section summary sent to the backend
#[derive(Debug, Serialize)]
struct SectionSummary<'a> {
    id: &'a str,
    title: &'a str,
    level: usize,
    content_preview: String,
}

/// Analyzes dependencies between document sections using the model backend
pub struct DependencyAnalyzer {
    backend: Arc<dyn ModelBackend>,
    /// Retry attempts for an unparseable response
    retries: usize,
}

impl DependencyAnalyzer {
    /// Create an analyzer
    pub fn new(backend: Arc<dyn ModelBackend>, retries: usize) -> Self {
        Self { backend, retries }
    }

    /// Ask the backend for the dependency edges of `document`.
    ///
    /// This is a degraded, non-fatal path end to end: an unusable backend
    /// response after bounded retries yields an empty edge list, which the
    /// ordering below turns into plain document order.
    pub async fn analyze(&self, document: &Document) -> Vec<DependencyEdge> {
        if document.sections.len() <= 1 {
            return Vec::new();
        }

        let prompt = self.build_prompt(document);

        for attempt in 0..=self.retries {
            let request = ChatRequest::new(ANALYSIS_SYSTEM_PROMPT, prompt.clone());
            match self.backend.complete(request).await {
                Ok(response) => match parse_edges(&response, document) {
                    Some(edges) => {
                        debug!("Dependency analysis produced {} edges", edges.len());
                        return break_cycles(edges, document);
                    }
                    None => {
                        warn!(
                            "Unparseable dependency response (attempt {}/{})",
                            attempt + 1,
                            self.retries + 1
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        "Dependency analysis request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.retries + 1,
                        e
                    );
                }
            }
        }

        info!("Dependency analysis degraded to default document order");
        Vec::new()
    }

    /// One summarization prompt covering the whole document
    fn build_prompt(&self, document: &Document) -> String {
        let summaries: Vec<SectionSummary> = document
            .sections
            .iter()
            .map(|s| SectionSummary {
                id: &s.id,
                title: &s.title,
                level: s.level,
                content_preview: s.content.chars().take(500).collect(),
            })
            .collect();
        let sections_json =
            serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"Analyze the structure of a scientific article and determine the logical dependencies between sections.

Section A depends on section B when:
- A uses definitions, theorems, or results introduced in B
- A refers to concepts introduced in B
- A logically builds on material from B

Document sections:
{sections_json}

Return the result as JSON:
{{
  "dependencies": {{
    "section_id": ["dependency_id1", "dependency_id2"]
  }}
}}

Use an empty list for a section without dependencies.
Use only section IDs from the provided list."#
        )
    }
}

/// Attach edges to the document's sections
pub fn assign_dependencies(document: &mut Document, edges: &[DependencyEdge]) {
    let mut by_section: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for edge in edges {
        by_section
            .entry(edge.from.as_str())
            .or_default()
            .insert(edge.to.clone());
    }
    for section in &mut document.sections {
        if let Some(deps) = by_section.remove(section.id.as_str()) {
            section.dependencies = deps;
        }
    }
}

/// Compute the translation order: a topological sort over the dependency DAG
/// where ties are broken by original document order, so the result is total
/// and deterministic for a given input.
pub fn translation_order(document: &Document, edges: &[DependencyEdge]) -> Vec<String> {
    let position: HashMap<&str, usize> = document
        .sections
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    // dependents[to] lists sections that read `to`
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> =
        document.sections.iter().map(|s| (s.id.as_str(), 0)).collect();

    for edge in edges {
        if !position.contains_key(edge.from.as_str()) || !position.contains_key(edge.to.as_str()) {
            continue;
        }
        dependents
            .entry(edge.to.as_str())
            .or_default()
            .push(edge.from.as_str());
        *in_degree.entry(edge.from.as_str()).or_default() += 1;
    }

    // Kahn's algorithm; the ready set is drained in document order
    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    ready.sort_by_key(|id| position[id]);
    let mut ready: VecDeque<&str> = ready.into();

    let mut order = Vec::with_capacity(document.sections.len());
    while let Some(current) = ready.pop_front() {
        order.push(current.to_string());
        let mut unlocked = Vec::new();
        for dependent in dependents.get(current).into_iter().flatten() {
            let degree = in_degree.get_mut(dependent).expect("known section");
            *degree -= 1;
            if *degree == 0 {
                unlocked.push(*dependent);
            }
        }
        unlocked.sort_by_key(|id| position[id]);
        // Merge newly-ready sections keeping the whole queue document-ordered
        for id in unlocked {
            let insert_at = ready
                .iter()
                .position(|queued| position[queued] > position[&id])
                .unwrap_or(ready.len());
            ready.insert(insert_at, id);
        }
    }

    debug_assert_eq!(order.len(), document.sections.len(), "edges must form a DAG");
    order
}

/// Drop every edge that would close a cycle, preferring to keep edges
/// discovered earlier. The result is always a DAG.
pub fn break_cycles(edges: Vec<DependencyEdge>, document: &Document) -> Vec<DependencyEdge> {
    let mut kept: Vec<DependencyEdge> = Vec::with_capacity(edges.len());
    // adjacency over kept edges: from -> its dependencies
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let known: HashSet<&str> = document.sections.iter().map(|s| s.id.as_str()).collect();

    for edge in edges {
        if edge.from == edge.to {
            warn!("Dropping self-dependency on '{}'", edge.from);
            continue;
        }
        if !known.contains(edge.from.as_str()) || !known.contains(edge.to.as_str()) {
            warn!(
                "Dropping edge with unknown section: {} -> {}",
                edge.from, edge.to
            );
            continue;
        }
        if reaches(&adjacency, &edge.to, &edge.from) {
            warn!(
                "Dropping cycle-closing dependency edge: {} -> {}",
                edge.from, edge.to
            );
            continue;
        }
        adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge.to.clone());
        kept.push(edge);
    }

    kept
}

/// DFS reachability over kept edges
fn reaches(adjacency: &HashMap<String, Vec<String>>, from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    let mut stack: Vec<&str> = vec![from];
    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(nexts) = adjacency.get(current) {
            stack.extend(nexts.iter().map(String::as_str));
        }
    }
    false
}

/// Parse the backend's dependency JSON into an edge list.
///
/// Edges are produced in a deterministic discovery order: sections in
/// document order, each section's dependencies in listed order. Returns
/// `None` when the response carries no usable structure.
fn parse_edges(response: &str, document: &Document) -> Option<Vec<DependencyEdge>> {
    let json = extract_json_block(response);
    let value: Value = serde_json::from_str(json.trim()).ok()?;
    let map = value.get("dependencies")?.as_object()?;

    let mut edges = Vec::new();
    for section in &document.sections {
        let Some(listed) = map.get(&section.id).and_then(Value::as_array) else {
            continue;
        };
        for dep in listed {
            if let Some(dep_id) = dep.as_str() {
                edges.push(DependencyEdge {
                    from: section.id.clone(),
                    to: dep_id.to_string(),
                });
            }
        }
    }
    Some(edges)
}

/// Strip a markdown code fence from an untrusted model response
pub fn extract_json_block(response: &str) -> &str {
    if let Some(start) = response.find("```json") {
        let rest = &response[start + 7..];
        match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        }
    } else if let Some(start) = response.find("```") {
        let rest = &response[start + 3..];
        match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        }
    } else {
        response
    }
}
