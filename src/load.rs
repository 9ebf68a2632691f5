//! Rule loading: runs mkfile parsing and constructs the rule set from it.

use crate::fs::FileSystem;
use crate::parse::{Parser, RuleDecl};
use crate::rules::{FileLoc, Pattern, Rule, RuleSet};
use crate::trace;
use anyhow::{anyhow, bail};
use std::sync::Arc;

fn add_rule(rules: &mut RuleSet, filename: &Arc<String>, decl: RuleDecl) {
    rules.rules.push(Rule {
        location: FileLoc {
            filename: filename.clone(),
            line: decl.line,
        },
        targets: decl.targets.iter().map(|t| Pattern::new(t)).collect(),
        prereqs: decl.prereqs,
        attributes: decl.attributes,
        recipe: decl.recipe,
    });
}

/// Parse mkfile content into a rule set.
pub fn parse(filename: &str, mut bytes: Vec<u8>) -> anyhow::Result<RuleSet> {
    bytes.push(0);
    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        Err(err) => {
            let ofs = err.valid_up_to();
            let line = bytes[..ofs].iter().filter(|&&c| c == b'\n').count() + 1;
            bail!("{}:{}: invalid UTF-8 at byte offset {}", filename, line, ofs);
        }
    };
    let filename = Arc::new(filename.to_owned());
    let mut parser = Parser::new(text);
    let mut rules = RuleSet::default();
    loop {
        let decl = match parser
            .read()
            .map_err(|err| anyhow!(parser.format_parse_error(&filename, err)))?
        {
            None => break,
            Some(decl) => decl,
        };
        add_rule(&mut rules, &filename, decl);
    }
    rules.vars = parser.vars;
    Ok(rules)
}

/// Load an mkfile and return its rules.
pub fn read(fs: &dyn FileSystem, path: &str) -> anyhow::Result<RuleSet> {
    let bytes = match trace::scope("fs::read", || fs.read(path)) {
        Ok(b) => b,
        Err(err) => bail!("no mkfile found: read {}: {}", path, err),
    };
    trace::scope("load::parse", || parse(path, bytes))
}
