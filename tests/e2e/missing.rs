//! Tests for mkfiles that can't be resolved into a build.

use crate::e2e::*;

#[cfg(unix)]
#[test]
fn missing_source() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", BUILD_RULES)?;
    space.write("b.c", "B")?;

    let out = space.run(&mut mk_command(vec!["out"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "mk: don't know how to make a.c");
    // Resolution fails before any recipe runs.
    assert_output_not_contains(&out, "mking");
    assert!(!space.exists("b.o"));
    Ok(())
}

#[test]
fn unknown_target() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "all: \n")?;
    let out = space.run(&mut mk_command(vec!["nope"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "don't know how to make nope");
    Ok(())
}

#[test]
fn cycle() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "a: b\nb: a\n")?;
    let out = space.run(&mut mk_command(vec!["a"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "dependency cycle: a -> b -> a");
    Ok(())
}

#[test]
fn ambiguous_rules() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "x: y\nx: z\n")?;
    let out = space.run(&mut mk_command(vec!["x"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "ambiguous recipe for x");
    assert_stderr_contains(&out, "mkfile:1 and mkfile:2");
    Ok(())
}

#[test]
fn rule_application_bound() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "%.x: %\n")?;

    let out = space.run(&mut mk_command(vec!["f.x.x.x.x"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "rule at mkfile:1 applied more than 3 times while resolving f.x");

    let out = space.run(&mut mk_command(vec!["--max-rule-applications", "5", "f.x.x.x.x"]))?;
    assert_stderr_contains(&out, "don't know how to make f");
    Ok(())
}

#[test]
fn parse_error() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "A = 1\n\nthis line has no colon\n")?;
    let out = space.run(&mut mk_command(vec![]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "expected ':' or '='");
    assert_stderr_contains(&out, "mkfile:3: this line has no colon");
    Ok(())
}

#[test]
fn alternate_file() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("other.mk", "a: b\n")?;
    let out = space.run(&mut mk_command(vec!["-f", "other.mk", "a"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "don't know how to make b");
    Ok(())
}

#[cfg(unix)]
#[test]
fn fatal_error_stops_later_targets() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "a: missing\nb:V:\n\techo made-b\n")?;
    let out = space.run(&mut mk_command(vec!["a", "b"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "don't know how to make missing");
    assert_output_not_contains(&out, "made-b");
    Ok(())
}
