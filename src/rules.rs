//! The rule set: target patterns mapped to prerequisite patterns, attributes
//! and a recipe.  Rules are immutable once loaded and shared read-only by the
//! resolver and the recipe executor.

use crate::densemap::{self, DenseMap};
use crate::eval::Vars;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuleId(usize);
impl densemap::Index for RuleId {
    fn index(&self) -> usize {
        self.0
    }
}
impl From<usize> for RuleId {
    fn from(u: usize) -> RuleId {
        RuleId(u)
    }
}

#[derive(Debug, Clone)]
pub struct FileLoc {
    pub filename: Arc<String>,
    pub line: usize,
}
impl std::fmt::Display for FileLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Attributes {
    /// Never backed by a real file, so always rebuilt when reached.
    pub is_virtual: bool,
    /// Matches targets by stem substitution rather than by exact name.
    pub meta: bool,
    /// Don't echo the recipe before running it.
    pub quiet: bool,
}

impl Attributes {
    /// Parse the letters between the colons of `target:VQ: prereq`.
    /// On failure returns the first unknown letter.
    pub fn parse(flags: &str) -> Result<Attributes, char> {
        let mut attrs = Attributes::default();
        for c in flags.chars() {
            match c {
                'V' => attrs.is_virtual = true,
                'Q' => attrs.quiet = true,
                c => return Err(c),
            }
        }
        Ok(attrs)
    }
}

/// A target or prerequisite pattern.  `%` stands for the stem.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Literal(String),
    Stem { prefix: String, suffix: String },
}

/// How a pattern matched a concrete name.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Match<'a> {
    Exact,
    Stem(&'a str),
}

impl Pattern {
    pub fn new(text: &str) -> Pattern {
        match text.split_once('%') {
            None => Pattern::Literal(text.to_owned()),
            Some((prefix, suffix)) => Pattern::Stem {
                prefix: prefix.to_owned(),
                suffix: suffix.to_owned(),
            },
        }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, Pattern::Stem { .. })
    }

    /// Match a concrete name.  Stems are never empty.
    pub fn match_name<'a>(&self, name: &'a str) -> Option<Match<'a>> {
        match self {
            Pattern::Literal(lit) if lit == name => Some(Match::Exact),
            Pattern::Literal(_) => None,
            Pattern::Stem { prefix, suffix } => {
                let stem = name.strip_prefix(prefix.as_str())?;
                let stem = stem.strip_suffix(suffix.as_str())?;
                if stem.is_empty() {
                    None
                } else {
                    Some(Match::Stem(stem))
                }
            }
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Pattern::Literal(lit) => write!(f, "{}", lit),
            Pattern::Stem { prefix, suffix } => write!(f, "{}%{}", prefix, suffix),
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub location: FileLoc,
    pub targets: Vec<Pattern>,
    /// Prerequisite patterns; `%` is substituted with the stem of the match.
    pub prereqs: Vec<String>,
    pub attributes: Attributes,
    /// Opaque to the resolver and scheduler; only the executor looks inside.
    pub recipe: Option<String>,
}

impl Rule {
    /// Match a name against each target pattern in turn.
    pub fn match_target<'a>(&self, name: &'a str) -> Option<Match<'a>> {
        self.targets.iter().find_map(|pat| pat.match_name(name))
    }

    /// Produce concrete prerequisite names for a match.
    pub fn instantiate_prereqs(&self, m: Match) -> Vec<String> {
        match m {
            Match::Exact => self.prereqs.clone(),
            Match::Stem(stem) => self
                .prereqs
                .iter()
                .map(|p| p.replace('%', stem))
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct RuleSet {
    pub rules: DenseMap<RuleId, Rule>,
    /// Variables defined in the mkfile, exported to recipes.
    pub vars: Vars,
}

impl RuleSet {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    /// The targets of the first non-meta rule, built when none are requested.
    pub fn default_targets(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|(_, rule)| rule)
            .find(|rule| !rule.attributes.meta)
            .map(|rule| rule.targets.iter().map(|t| t.to_string()).collect())
            .unwrap_or_default()
    }
}
