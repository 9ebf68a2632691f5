//! The driver: parses the command line, loads the mkfile and builds each
//! requested target in turn.

use crate::fs::RealFileSystem;
use crate::progress::{print_error, ConsoleProgress, Progress};
use crate::resolve::DEFAULT_MAX_RULE_APPLICATIONS;
use crate::task::ShellExecutor;
use crate::{load, terminal, trace, work};
use anyhow::anyhow;
use argh::FromArgs;
use std::num::NonZeroUsize;
use std::path::Path;

#[derive(FromArgs)]
/// mk, a concurrent mkfile-driven build tool
struct Args {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// input mkfile [default=mkfile]
    #[argh(option, short = 'f', default = "String::from(\"mkfile\")")]
    file: String,

    /// print recipes without running them
    #[argh(switch, short = 'n')]
    dry_run: bool,

    /// maximum number of recipes to run at once [default: no limit]
    #[argh(option, short = 'j')]
    jobs: Option<usize>,

    /// maximum applications of one rule while resolving a target [default=3]
    #[argh(option, default = "DEFAULT_MAX_RULE_APPLICATIONS")]
    max_rule_applications: usize,

    /// never color output
    #[argh(switch)]
    no_color: bool,

    /// debugging tools, "-d list" to list
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// targets to build [default: targets of the first non-pattern rule]
    #[argh(positional)]
    targets: Vec<String>,
}

fn run_impl(args: Args, color: bool) -> anyhow::Result<i32> {
    if let Some(debug) = args.debug.as_deref() {
        match debug {
            "list" => {
                println!("debug tools:");
                println!("  trace  generate json performance trace");
                return Ok(1);
            }
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    let parallelism = match args.jobs {
        None => None,
        Some(n) => Some(
            NonZeroUsize::new(n).ok_or_else(|| anyhow!("invalid -j 0: must be at least 1"))?,
        ),
    };

    if let Some(dir) = &args.chdir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    let fs = RealFileSystem::new();
    let rules = trace::scope("load::read", || load::read(&fs, &args.file))?;

    let mut targets = args.targets;
    if targets.is_empty() {
        targets = rules.default_targets();
    }
    let progress = ConsoleProgress::new(color);
    if targets.is_empty() {
        progress.log("mk: nothing to mk");
        return Ok(0);
    }

    let options = work::Options {
        parallelism,
        max_rule_applications: args.max_rule_applications,
    };
    let executor = ShellExecutor::new(&rules, &progress, args.dry_run);

    // Each target gets a graph of its own; nothing is shared between them.
    let mut failed = false;
    for target in &targets {
        if !work::build_target(&rules, &fs, &executor, &progress, &options, target)? {
            failed = true;
        }
    }
    Ok(if failed { 1 } else { 0 })
}

pub fn run() -> i32 {
    let args: Args = argh::from_env();
    let color = !args.no_color && terminal::use_color();
    let code = match run_impl(args, color) {
        Ok(code) => code,
        Err(err) => {
            print_error(&err.to_string(), color);
            1
        }
    };
    // A failure to finish the trace file doesn't change the build result.
    let _ = trace::close();
    code
}
