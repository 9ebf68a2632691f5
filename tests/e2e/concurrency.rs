//! Tests that recipes run concurrently and shared prerequisites run once.

use crate::e2e::*;
#[cfg(unix)]
use std::time::{Duration, Instant};

#[cfg(unix)]
#[test]
fn shared_prereq_runs_once() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "mkfile",
        "top:V: left right
\techo top >> log
left:V: base
\techo left >> log
right:V: base
\techo right >> log
base:V:
\techo base >> log
",
    )?;
    space.run_expect(&mut mk_command(vec!["top"]))?;

    let log = String::from_utf8(space.read("log")?)?;
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "base");
    assert!(lines[1..3].contains(&"left"));
    assert!(lines[1..3].contains(&"right"));
    assert_eq!(lines[3], "top");
    Ok(())
}

#[cfg(unix)]
const SLEEPERS: &str = "
all:V: one two three
one two three:V:
\tsleep 1
";

#[cfg(unix)]
#[test]
fn independent_recipes_overlap() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", SLEEPERS)?;
    let start = Instant::now();
    space.run_expect(&mut mk_command(vec![]))?;
    assert!(start.elapsed() < Duration::from_millis(2500));
    Ok(())
}

#[cfg(unix)]
#[test]
fn jobs_limits_concurrency() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", SLEEPERS)?;
    let start = Instant::now();
    let out = space.run_expect(&mut mk_command(vec!["-j", "1"]))?;
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_output_contains(&out, "finished mking three");
    Ok(())
}

#[test]
fn zero_jobs_rejected() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "all:V:\n")?;
    let out = space.run(&mut mk_command(vec!["-j", "0"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "invalid -j 0");
    Ok(())
}
