//! Graph construction: resolves a requested target into nodes and edges,
//! selecting the rule that builds each node.
//!
//! Nodes are memoized by name, so prerequisites shared by several targets
//! resolve to one node and the result is a DAG.  Resolution fails on unknown
//! targets, ambiguous rules, cycles, and runaway pattern expansion.

use crate::fs::FileSystem;
use crate::graph::{Edge, Graph, NodeId, RuleEdge};
use crate::rules::{Match, RuleId, RuleSet};
use crate::trace;
use anyhow::bail;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// How many times one rule may be applied along a single resolution chain.
pub const DEFAULT_MAX_RULE_APPLICATIONS: usize = 3;

/// Outcome of looking for the rule that builds a name.
enum Selection<'n> {
    Rule(RuleId, Match<'n>),
    /// No usable rule.  Carries a rule that matched but was over its
    /// application limit, if any.
    Nothing { exhausted: Option<RuleId> },
}

struct Resolver<'a> {
    rules: &'a RuleSet,
    fs: &'a dyn FileSystem,
    max_applications: usize,
    graph: Graph,
    /// Nodes whose prerequisites are being resolved, outermost first.
    stack: Vec<NodeId>,
    /// Applications of each rule along the current chain.
    applications: FxHashMap<RuleId, usize>,
}

impl<'a> Resolver<'a> {
    /// Find the rule for a name.  Exact rules take precedence over pattern
    /// rules; two candidates within the same tier are an error.
    fn select<'n>(&self, name: &'n str) -> anyhow::Result<Selection<'n>> {
        let mut exhausted = None;
        for meta in [false, true] {
            let mut found: Option<(RuleId, Match<'n>)> = None;
            for (id, rule) in self.rules.rules.iter() {
                if rule.attributes.meta != meta {
                    continue;
                }
                let m = match rule.match_target(name) {
                    Some(m) => m,
                    None => continue,
                };
                if self.applications.get(&id).copied().unwrap_or(0) >= self.max_applications {
                    exhausted = Some(id);
                    continue;
                }
                if let Some((prev, _)) = found {
                    bail!(
                        "ambiguous recipe for {}: rules at {} and {} both match",
                        name,
                        self.rules.rule(prev).location,
                        rule.location
                    );
                }
                found = Some((id, m));
            }
            if let Some((id, m)) = found {
                return Ok(Selection::Rule(id, m));
            }
        }
        Ok(Selection::Nothing { exhausted })
    }

    fn resolve(&mut self, name: &str) -> anyhow::Result<NodeId> {
        if let Some(id) = self.graph.lookup(name) {
            if let Some(pos) = self.stack.iter().position(|&s| s == id) {
                let mut chain: Vec<&str> = self.stack[pos..]
                    .iter()
                    .map(|&s| self.graph.node(s).name.as_str())
                    .collect();
                chain.push(name);
                bail!("dependency cycle: {}", chain.join(" -> "));
            }
            return Ok(id);
        }

        let id = self.graph.add_node(name);
        let (rule_id, m) = match self.select(name)? {
            Selection::Rule(rule_id, m) => (rule_id, m),
            Selection::Nothing { exhausted } => {
                // A file with no rule is a source.
                let mtime = self.fs.stat(name);
                if mtime.exists() {
                    self.graph.node_mut(id).mtime = mtime;
                    return Ok(id);
                }
                if let Some(rule_id) = exhausted {
                    bail!(
                        "rule at {} applied more than {} times while resolving {}",
                        self.rules.rule(rule_id).location,
                        self.max_applications,
                        name
                    );
                }
                bail!("don't know how to make {}", name);
            }
        };

        let rules = self.rules;
        let rule = rules.rule(rule_id);
        let stem = match m {
            Match::Exact => None,
            Match::Stem(stem) => Some(stem.to_owned()),
        };

        self.stack.push(id);
        *self.applications.entry(rule_id).or_default() += 1;
        let prereqs: anyhow::Result<Vec<NodeId>> = rule
            .instantiate_prereqs(m)
            .iter()
            .map(|prereq| self.resolve(prereq))
            .collect();
        *self.applications.entry(rule_id).or_default() -= 1;
        self.stack.pop();
        let prereqs = prereqs?;

        let node = self.graph.node_mut(id);
        node.prereqs
            .push(Edge::Rule(RuleEdge::new(rule_id, rule.attributes, stem)));
        node.prereqs.extend(prereqs.into_iter().map(Edge::Prereq));
        Ok(id)
    }
}

/// Stat every node that has a rule.  Rule-less nodes were already stat'ed
/// during resolution; virtual targets are never backed by a file.
fn probe(graph: &mut Graph, fs: &dyn FileSystem) {
    graph
        .nodes_mut()
        .par_iter_mut()
        .filter(|node| matches!(node.rule_edge(), Some(e) if !e.attributes.is_virtual))
        .for_each(|node| node.mtime = fs.stat(&node.name));
}

/// Resolve `target` into a fresh graph.
pub fn build_graph(
    rules: &RuleSet,
    fs: &dyn FileSystem,
    max_rule_applications: usize,
    target: &str,
) -> anyhow::Result<Graph> {
    let mut resolver = Resolver {
        rules,
        fs,
        max_applications: max_rule_applications,
        graph: Graph::new(),
        stack: Vec::new(),
        applications: FxHashMap::default(),
    };
    let root = trace::scope("resolve", || resolver.resolve(target))?;
    let mut graph = resolver.graph;
    graph.root = root;
    trace::scope("probe", || probe(&mut graph, fs));
    Ok(graph)
}
