//! Build scheduling: builds a node after building, concurrently, whichever
//! of its prerequisites are stale.
//!
//! Every node is built by the one caller that moves it from Ready to Started.
//! Prerequisites are launched on their own threads, and the parent waits on
//! a channel it registered as a listener on each of them.  A failing
//! prerequisite never cancels its siblings: the parent drains every
//! notification before settling.

use crate::fs::FileSystem;
use crate::graph::{Graph, Node, NodeId, RuleEdge, Status};
use crate::progress::Progress;
use crate::resolve::{self, DEFAULT_MAX_RULE_APPLICATIONS};
use crate::rules::RuleSet;
use crate::trace;
use anyhow::anyhow;
use std::num::NonZeroUsize;
use std::sync::{mpsc, Condvar, Mutex, MutexGuard};
use std::thread::Scope;

/// Performs a node's recipe.  The scheduler calls it at most once per node,
/// but concurrently for distinct nodes.
pub trait Executor: Sync {
    fn run(&self, graph: &Graph, id: NodeId, edge: &RuleEdge) -> bool;
}

/// Whether `prereq` must be (re)built before `target`'s recipe runs.
/// Ties count as stale.
pub fn needs_rebuild(target: &Node, prereq: &Node, edge: &RuleEdge) -> bool {
    !prereq.exists()
        || edge.attributes.is_virtual
        || (target.exists() && target.mtime <= prereq.mtime)
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of recipes running at once; None for no limit.
    pub parallelism: Option<NonZeroUsize>,
    pub max_rule_applications: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            parallelism: None,
            max_rule_applications: DEFAULT_MAX_RULE_APPLICATIONS,
        }
    }
}

/// Counts running recipes against a limit.  Only recipes take a slot;
/// threads waiting on prerequisites don't, so waiting can't starve the pool.
struct Jobs {
    limit: usize,
    running: Mutex<usize>,
    cond: Condvar,
}

struct JobSlot<'a> {
    jobs: &'a Jobs,
}

impl Jobs {
    fn new(limit: NonZeroUsize) -> Self {
        Jobs {
            limit: limit.get(),
            running: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    fn acquire(&self) -> JobSlot<'_> {
        let mut running: MutexGuard<usize> = self
            .cond
            .wait_while(self.running.lock().unwrap(), |running| {
                *running >= self.limit
            })
            .unwrap();
        *running += 1;
        JobSlot { jobs: self }
    }
}

impl Drop for JobSlot<'_> {
    fn drop(&mut self) {
        *self.jobs.running.lock().unwrap() -= 1;
        self.jobs.cond.notify_one();
    }
}

/// Publishes a claimed node's status when dropped.  The status starts out as
/// Failed, which is what listeners receive if building the node panics.
struct Settle<'a> {
    node: &'a Node,
    status: Status,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.node.finish(self.status);
    }
}

pub struct Scheduler<'a> {
    graph: &'a Graph,
    executor: &'a dyn Executor,
    progress: &'a dyn Progress,
    jobs: Option<Jobs>,
    /// The first invariant violation found while building.  Once set, no
    /// further recipes start.
    fatal: Mutex<Option<anyhow::Error>>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        graph: &'a Graph,
        executor: &'a dyn Executor,
        progress: &'a dyn Progress,
        parallelism: Option<NonZeroUsize>,
    ) -> Self {
        Scheduler {
            graph,
            executor,
            progress,
            jobs: parallelism.map(Jobs::new),
            fatal: Mutex::new(None),
        }
    }

    /// Build a node and everything it needs, returning its status.
    /// If the node was already claimed, returns without building it again.
    pub fn build(&self, id: NodeId) -> anyhow::Result<Status> {
        std::thread::scope(|scope| self.build_node(scope, id));
        if let Some(err) = self.fatal.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.graph.node(id).status())
    }

    fn build_node<'scope, 'env>(&'env self, scope: &'scope Scope<'scope, 'env>, id: NodeId) {
        if !self.graph.node(id).lock().claim() {
            return;
        }
        self.build_claimed(scope, id);
    }

    /// Build a node this caller has already claimed, then notify its listeners.
    fn build_claimed<'scope, 'env>(&'env self, scope: &'scope Scope<'scope, 'env>, id: NodeId) {
        let mut settle = Settle {
            node: self.graph.node(id),
            status: Status::Failed,
        };
        settle.status = self.run_node(scope, id);
    }

    fn set_fatal(&self, err: anyhow::Error) {
        let mut fatal = self.fatal.lock().unwrap();
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    fn run_node<'scope, 'env>(&'env self, scope: &'scope Scope<'scope, 'env>, id: NodeId) -> Status {
        let node = self.graph.node(id);
        let edge = match node.rule_edge() {
            Some(edge) => edge,
            None => {
                if node.exists() {
                    return Status::Done;
                }
                // Resolution only admits rule-less nodes that exist.
                self.set_fatal(anyhow!("don't know how to make {}", node.name));
                return Status::Failed;
            }
        };

        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        let mut failed = false;
        {
            let _dispatch = edge.dispatch.lock().unwrap();
            for pid in node.prereq_ids() {
                let prereq = self.graph.node(pid);
                if !needs_rebuild(node, prereq, edge) {
                    continue;
                }
                let mut state = prereq.lock();
                match state.status() {
                    Status::Ready => {
                        state.claim();
                        state.listen(tx.clone());
                        pending += 1;
                        scope.spawn(move || self.build_claimed(scope, pid));
                    }
                    Status::Started => {
                        state.listen(tx.clone());
                        pending += 1;
                    }
                    Status::Done => {}
                    Status::Failed => failed = true,
                }
            }
        }
        drop(tx);

        for _ in 0..pending {
            match rx.recv() {
                Ok(Status::Done) => {}
                // Claimed nodes always settle, even when their builder
                // unwinds, so a recv error means a broken invariant.
                _ => failed = true,
            }
        }

        if failed {
            self.progress.node_skipped(&node.name);
            return Status::Failed;
        }
        if self.fatal.lock().unwrap().is_some() {
            return Status::Failed;
        }

        // Start and finish are reported while holding the slot, so with -j
        // the console never shows more recipes running than the limit.
        let _slot = self.jobs.as_ref().map(Jobs::acquire);
        self.progress.node_started(&node.name);
        let ok = trace::span(&node.name, || self.executor.run(self.graph, id, edge));
        let status = if ok { Status::Done } else { Status::Failed };
        self.progress.node_finished(&node.name, status);
        status
    }
}

/// Resolve and build one requested target with a fresh graph.
/// Returns whether the target was built successfully; resolution errors and
/// invariant violations are returned as Err.
pub fn build_target(
    rules: &RuleSet,
    fs: &dyn FileSystem,
    executor: &dyn Executor,
    progress: &dyn Progress,
    options: &Options,
    target: &str,
) -> anyhow::Result<bool> {
    let graph = trace::scope("build_graph", || {
        resolve::build_graph(rules, fs, options.max_rule_applications, target)
    })?;
    let scheduler = Scheduler::new(&graph, executor, progress, options.parallelism);
    let status = trace::scope("schedule", || scheduler.build(graph.root))?;
    Ok(status == Status::Done)
}
