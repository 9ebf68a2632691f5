use crate::e2e::*;

#[test]
fn empty_file() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "# nothing here\n")?;
    let out = space.run_expect(&mut mk_command(vec![]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "mk: nothing to mk\n");
    Ok(())
}

#[test]
fn no_mkfile() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut mk_command(vec![]))?;
    assert!(!out.status.success());
    assert_stderr_contains(&out, "mk: no mkfile found");
    Ok(())
}

#[cfg(unix)]
#[test]
fn compile_and_link() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", BUILD_RULES)?;
    space.write("a.c", "A")?;
    space.write("b.c", "B")?;

    // No target given: the first non-pattern rule's target is built.
    let out = space.run_expect(&mut mk_command(vec![]))?;
    assert_eq!(space.read("out")?, b"AB");
    assert_output_contains(&out, "    cp $stem.c $target\n");
    assert_output_contains(&out, "finished mking a.o");
    assert_output_contains(&out, "finished mking b.o");
    assert_output_contains(&out, "mking out\n    cat $prereq > $target\nfinished mking out\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn up_to_date_prereqs_not_rebuilt() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", BUILD_RULES)?;
    for (name, secs) in [("a.c", 1000), ("b.c", 1000), ("a.o", 2000), ("b.o", 2000), ("out", 3000)] {
        space.write(name, name)?;
        space.set_mtime(name, secs)?;
    }

    let out = space.run_expect(&mut mk_command(vec!["out"]))?;
    assert_output_not_contains(&out, "mking a.o");
    assert_output_not_contains(&out, "mking b.o");
    // The requested target itself is always remade.
    assert_output_contains(&out, "mking out");
    assert_eq!(space.read("out")?, b"a.ob.o");
    Ok(())
}

#[cfg(unix)]
#[test]
fn newer_prereq_rebuilt() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", BUILD_RULES)?;
    for (name, secs) in [("a.c", 1000), ("b.c", 1000), ("a.o", 2000), ("b.o", 4000), ("out", 3000)] {
        space.write(name, name)?;
        space.set_mtime(name, secs)?;
    }

    let out = space.run_expect(&mut mk_command(vec!["out"]))?;
    assert_output_not_contains(&out, "mking a.o");
    assert_output_contains(&out, "mking b.o");
    assert_eq!(space.read("b.o")?, b"b.c");
    assert_eq!(space.read("out")?, b"a.ob.c");
    Ok(())
}

#[cfg(unix)]
#[test]
fn dry_run() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", BUILD_RULES)?;
    space.write("a.c", "A")?;
    space.write("b.c", "B")?;

    let out = space.run_expect(&mut mk_command(vec!["-n", "out"]))?;
    assert_output_contains(&out, "cp $stem.c $target");
    assert!(!space.exists("a.o"));
    assert!(!space.exists("out"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn virtual_target_always_runs() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "clean:V:\n\trm -f out\n\techo cleaned\n")?;
    space.write("clean", "")?;
    for _ in 0..2 {
        space.write("out", "")?;
        let out = space.run_expect(&mut mk_command(vec!["clean"]))?;
        assert_output_contains(&out, "cleaned");
        assert!(!space.exists("out"));
    }
    Ok(())
}

#[cfg(unix)]
#[test]
fn quiet_recipe() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "hush:VQ:\n\techo said\n")?;
    let out = space.run_expect(&mut mk_command(vec!["hush"]))?;
    assert_output_not_contains(&out, "echo said");
    assert_output_contains(&out, "said");
    Ok(())
}

#[cfg(unix)]
#[test]
fn variables() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "mkfile",
        "MSG = greetings
PARTS = one two
all:V: $PARTS
\techo $MSG from $target
one two:V:
\techo part $target
",
    )?;
    let out = space.run_expect(&mut mk_command(vec![]))?;
    assert_output_contains(&out, "greetings from all");
    assert_output_contains(&out, "part one");
    assert_output_contains(&out, "part two");
    Ok(())
}

#[cfg(unix)]
#[test]
fn several_targets() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("mkfile", "a:V:\n\techo made-a\nb:V:\n\techo made-b\n")?;
    let out = space.run_expect(&mut mk_command(vec!["b", "a"]))?;
    assert_output_contains(&out, "made-b");
    assert_output_contains(&out, "made-a");
    Ok(())
}

#[cfg(unix)]
#[test]
fn failed_recipe() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "mkfile",
        "top:V: bad good
\techo top ran
bad:V:
\tfalse
good:V:
\techo good ran
",
    )?;
    let out = space.run(&mut mk_command(vec!["top"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "failed mking bad");
    assert_output_contains(&out, "good ran");
    assert_output_contains(&out, "not mking top: prerequisite failed");
    assert_output_not_contains(&out, "top ran");
    Ok(())
}

#[cfg(unix)]
#[test]
fn chdir() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.mkdir("sub")?;
    space.write("sub/mkfile", "here:V:\n\techo in sub\n")?;
    let out = space.run_expect(&mut mk_command(vec!["-C", "sub", "here"]))?;
    assert_output_contains(&out, "in sub");
    Ok(())
}
