//! Represents parsed mkfile strings with embedded variable references, e.g.
//! `$OBJS main.o`, and mechanisms for expanding those into plain strings.

use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// An environment providing a mapping of variable name to variable value.
/// Lookups try each environment in turn, so earlier ones shadow later ones.
pub trait Env {
    fn get_var(&self, var: &str) -> Option<Cow<str>>;
}

/// One token within an EvalString, either literal text or a variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalPart<T: AsRef<str>> {
    Literal(T),
    VarRef(T),
}

/// A parsed but unexpanded variable-reference string.
#[derive(Debug, PartialEq)]
pub struct EvalString<T: AsRef<str>>(Vec<EvalPart<T>>);
impl<T: AsRef<str>> EvalString<T> {
    pub fn new(parts: Vec<EvalPart<T>>) -> Self {
        EvalString(parts)
    }

    /// Expand variable references.  Unknown variables expand to nothing.
    pub fn evaluate(&self, envs: &[&dyn Env]) -> String {
        let mut val = String::new();
        for part in &self.0 {
            match part {
                EvalPart::Literal(s) => val.push_str(s.as_ref()),
                EvalPart::VarRef(v) => {
                    if let Some(s) = envs.iter().find_map(|env| env.get_var(v.as_ref())) {
                        val.push_str(&s);
                    }
                }
            }
        }
        val
    }
}

/// Variables defined in an mkfile.
#[derive(Debug, Default, Clone)]
pub struct Vars(FxHashMap<String, String>);
impl Vars {
    pub fn new() -> Vars {
        Vars::default()
    }
    pub fn insert(&mut self, key: String, val: String) {
        self.0.insert(key, val);
    }
    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}
impl Env for Vars {
    fn get_var(&self, var: &str) -> Option<Cow<str>> {
        self.0.get(var).map(|val| Cow::Borrowed(val.as_str()))
    }
}

/// The process environment, consulted after mkfile variables.
pub struct ProcessEnv;
impl Env for ProcessEnv {
    fn get_var(&self, var: &str) -> Option<Cow<str>> {
        std::env::var(var).ok().map(Cow::Owned)
    }
}
