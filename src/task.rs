//! Runs recipes as shell commands.
//!
//! A recipe is handed to the shell verbatim.  The mkfile's variables are
//! exported into its environment, along with `target`, `prereq` and (for
//! pattern rules) `stem`, so recipes refer to them as `$target` etc.

use crate::graph::{Graph, NodeId, RuleEdge};
use crate::progress::Progress;
use crate::rules::RuleSet;
use crate::work::Executor;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::Command;

/// The result of running a recipe.
pub struct TaskResult {
    pub success: bool,
    /// Console output, stdout followed by stderr.
    pub output: Vec<u8>,
}

#[cfg(unix)]
fn shell(recipe: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-e").arg("-c").arg(recipe);
    cmd
}

#[cfg(windows)]
fn shell(recipe: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/c").arg(recipe);
    cmd
}

/// Executes a recipe as a subprocess.
/// Returns an Err() if we failed outside of the process itself.
fn run_task(mut cmd: Command) -> std::io::Result<TaskResult> {
    let out = cmd.output()?;
    let mut output = out.stdout;
    output.extend_from_slice(&out.stderr);

    #[cfg(unix)]
    if let Some(sig) = out.status.signal() {
        let msg = match sig {
            libc::SIGINT => "interrupted\n".to_owned(),
            _ => format!("signal {}\n", sig),
        };
        output.extend_from_slice(msg.as_bytes());
    }

    Ok(TaskResult {
        success: out.status.success(),
        output,
    })
}

pub struct ShellExecutor<'a> {
    rules: &'a RuleSet,
    progress: &'a dyn Progress,
    /// Print recipes without running them.
    dry_run: bool,
}

impl<'a> ShellExecutor<'a> {
    pub fn new(rules: &'a RuleSet, progress: &'a dyn Progress, dry_run: bool) -> Self {
        ShellExecutor {
            rules,
            progress,
            dry_run,
        }
    }

    fn command(&self, graph: &Graph, id: NodeId, edge: &RuleEdge, recipe: &str) -> Command {
        let mut cmd = shell(recipe);
        cmd.envs(self.rules.vars.iter());
        cmd.env("target", &graph.node(id).name);
        cmd.env("prereq", graph.prereq_names(id).join(" "));
        if let Some(stem) = &edge.stem {
            cmd.env("stem", stem);
        }
        cmd
    }
}

impl Executor for ShellExecutor<'_> {
    fn run(&self, graph: &Graph, id: NodeId, edge: &RuleEdge) -> bool {
        let name = &graph.node(id).name;
        let rule = self.rules.rule(edge.rule);
        let recipe = match &rule.recipe {
            // Nothing to do beyond bringing the prerequisites up to date.
            None => return true,
            Some(recipe) => recipe,
        };
        if !edge.attributes.quiet || self.dry_run {
            self.progress.recipe(name, recipe);
        }
        if self.dry_run {
            return true;
        }

        let result = run_task(self.command(graph, id, edge, recipe)).unwrap_or_else(|err| {
            TaskResult {
                success: false,
                output: format!("mk: {}: {}\n", name, err).into_bytes(),
            }
        });
        if !result.output.is_empty() {
            self.progress.output(name, &result.output);
        }
        result.success
    }
}
