//! The build graph: one node per target name, linked by edges that record
//! which rule builds a node and from which prerequisites.
//!
//! The graph's shape is fixed once resolution finishes.  The only state that
//! changes afterwards is each node's status and listener list, which sit
//! behind that node's own mutex, so separate branches of the graph never
//! contend on a shared lock.

use crate::densemap::{self, DenseMap};
use crate::fs::MTime;
use crate::rules::{Attributes, RuleId};
use rustc_hash::FxHashMap;
use std::sync::{mpsc, Mutex, MutexGuard};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(usize);
impl densemap::Index for NodeId {
    fn index(&self) -> usize {
        self.0
    }
}
impl From<usize> for NodeId {
    fn from(u: usize) -> NodeId {
        NodeId(u)
    }
}

/// Build status of a node.  Only ever moves forward:
/// Ready -> Started -> Done or Failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Started,
    Done,
    Failed,
}

impl Status {
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Done | Status::Failed)
    }
}

/// The rule instance chosen to build a node.
#[derive(Debug)]
pub struct RuleEdge {
    pub rule: RuleId,
    pub attributes: Attributes,
    /// The matched stem, for pattern rules.
    pub stem: Option<String>,
    /// Held while deciding which prerequisites to launch, so two entries into
    /// the same node's dispatch can't both launch a prerequisite.
    pub(crate) dispatch: Mutex<()>,
}

impl RuleEdge {
    pub fn new(rule: RuleId, attributes: Attributes, stem: Option<String>) -> Self {
        RuleEdge {
            rule,
            attributes,
            stem,
            dispatch: Mutex::new(()),
        }
    }
}

#[derive(Debug)]
pub enum Edge {
    Rule(RuleEdge),
    Prereq(NodeId),
}

/// The part of a node that changes while building.
#[derive(Debug)]
pub struct NodeState {
    status: Status,
    /// Channels of callers waiting on this node; each gets exactly one status.
    listeners: Vec<mpsc::Sender<Status>>,
}

impl NodeState {
    pub fn status(&self) -> Status {
        self.status
    }

    /// Ready -> Started.  Only the one caller that sees Ready gets true.
    pub fn claim(&mut self) -> bool {
        if self.status != Status::Ready {
            return false;
        }
        self.status = Status::Started;
        true
    }

    /// Register for the node's final status.  Only valid before it settles,
    /// since a settled node sends no further notifications.
    pub fn listen(&mut self, tx: mpsc::Sender<Status>) {
        assert!(
            !self.status.is_settled(),
            "listening on settled node ({:?})",
            self.status
        );
        self.listeners.push(tx);
    }
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub mtime: MTime,
    /// At most one Edge::Rule, plus one Edge::Prereq per prerequisite.
    pub prereqs: Vec<Edge>,
    state: Mutex<NodeState>,
}

impl Node {
    pub fn new(name: String) -> Self {
        Node {
            name,
            mtime: MTime::Missing,
            prereqs: Vec::new(),
            state: Mutex::new(NodeState {
                status: Status::Ready,
                listeners: Vec::new(),
            }),
        }
    }

    pub fn exists(&self) -> bool {
        self.mtime.exists()
    }

    pub fn rule_edge(&self) -> Option<&RuleEdge> {
        self.prereqs.iter().find_map(|e| match e {
            Edge::Rule(r) => Some(r),
            Edge::Prereq(_) => None,
        })
    }

    pub fn prereq_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.prereqs.iter().filter_map(|e| match e {
            Edge::Prereq(id) => Some(*id),
            Edge::Rule(_) => None,
        })
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap()
    }

    /// Publish the final status and wake every listener.
    pub fn finish(&self, status: Status) {
        assert!(status.is_settled(), "finishing with {:?}", status);
        let mut state = self.lock();
        assert_eq!(state.status, Status::Started, "finishing unclaimed node {}", self.name);
        state.status = status;
        for tx in state.listeners.drain(..) {
            // The receiver may be gone if its owner panicked; nobody is left
            // to tell in that case.
            let _ = tx.send(status);
        }
    }
}

/// A resolved graph, rooted at the requested target.
pub struct Graph {
    nodes: DenseMap<NodeId, Node>,
    by_name: FxHashMap<String, NodeId>,
    pub root: NodeId,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

impl Graph {
    pub fn new() -> Graph {
        Graph {
            nodes: DenseMap::default(),
            by_name: FxHashMap::default(),
            root: NodeId(0),
        }
    }

    /// Add a node for a name not yet in the graph.
    pub fn add_node(&mut self, name: &str) -> NodeId {
        assert!(!self.by_name.contains_key(name), "duplicate node {}", name);
        let id = self.nodes.push(Node::new(name.to_owned()));
        self.by_name.insert(name.to_owned(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        self.nodes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn prereq_names(&self, id: NodeId) -> Vec<&str> {
        self.node(id)
            .prereq_ids()
            .map(|p| self.node(p).name.as_str())
            .collect()
    }
}
