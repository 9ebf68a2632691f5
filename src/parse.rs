//! Parser for mkfiles.
//!
//! Variable assignments are evaluated as they are read and kept in
//! `Parser::vars`; rule declarations are handed back to the caller with
//! their targets and prerequisites already expanded.  Recipe text is left
//! untouched, since it is interpreted by the shell.

use crate::eval::{EvalPart, EvalString, ProcessEnv, Vars};
use crate::rules::Attributes;
use crate::scanner::{ParseError, ParseResult, Scanner};

#[derive(Debug, PartialEq)]
pub struct RuleDecl {
    pub line: usize,
    pub targets: Vec<String>,
    pub attributes: Attributes,
    pub prereqs: Vec<String>,
    pub recipe: Option<String>,
}

pub struct Parser<'text> {
    scanner: Scanner<'text>,
    pub vars: Vars,
}

fn is_ident_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

impl<'text> Parser<'text> {
    pub fn new(buf: &'text str) -> Parser<'text> {
        Parser {
            scanner: Scanner::new(buf),
            vars: Vars::new(),
        }
    }

    pub fn format_parse_error(&self, filename: &str, err: ParseError) -> String {
        self.scanner.format_parse_error(filename, err)
    }

    /// Read the next rule, applying any variable assignments on the way.
    pub fn read(&mut self) -> ParseResult<Option<RuleDecl>> {
        loop {
            match self.scanner.peek() {
                '\0' => return Ok(None),
                '\n' | '\r' => self.scanner.next(),
                '#' => self.skip_comment(),
                ' ' | '\t' => {
                    self.scanner.skip_spaces();
                    match self.scanner.peek() {
                        '\n' | '\0' => {}
                        '#' => self.skip_comment(),
                        _ => return self.scanner.parse_error("recipe line outside of a rule"),
                    }
                }
                _ => {
                    if let Some(rule) = self.read_statement()? {
                        return Ok(Some(rule));
                    }
                }
            }
        }
    }

    fn expand(&self, eval: &EvalString<&str>) -> String {
        eval.evaluate(&[&self.vars, &ProcessEnv])
    }

    fn read_statement(&mut self) -> ParseResult<Option<RuleDecl>> {
        let line = self.scanner.line;
        let start = self.scanner.ofs;
        let head = self.read_eval(&[':', '='])?;
        match self.scanner.peek() {
            '=' => {
                let name = self.scanner.slice(start, self.scanner.ofs).trim();
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return self.scanner.parse_error(format!("invalid variable name {:?}", name));
                }
                self.scanner.next();
                self.scanner.skip_spaces();
                let value = self.read_eval(&[])?;
                self.expect_eol()?;
                let value = self.expand(&value).trim().to_owned();
                self.vars.insert(name.to_owned(), value);
                Ok(None)
            }
            ':' => {
                let targets = split_words(&self.expand(&head));
                if targets.is_empty() {
                    return self.scanner.parse_error("expected targets before ':'");
                }
                self.scanner.next();
                let attrs_ofs = self.scanner.ofs;
                let mut rest = self.read_eval(&[':'])?;
                let mut attributes = Attributes::default();
                if self.scanner.skip(':') {
                    let flags = self.expand(&rest);
                    attributes = match Attributes::parse(flags.trim()) {
                        Ok(attrs) => attrs,
                        Err(c) => {
                            self.scanner.ofs = attrs_ofs;
                            return self
                                .scanner
                                .parse_error(format!("unknown attribute {:?}", c));
                        }
                    };
                    rest = self.read_eval(&[])?;
                }
                let prereqs = split_words(&self.expand(&rest));
                self.expect_eol()?;
                attributes.meta = targets.iter().any(|t| t.contains('%'));
                let recipe = self.read_recipe();
                Ok(Some(RuleDecl {
                    line,
                    targets,
                    attributes,
                    prereqs,
                    recipe,
                }))
            }
            _ => self.scanner.parse_error("expected ':' or '='"),
        }
    }

    fn expect_eol(&mut self) -> ParseResult<()> {
        match self.scanner.peek() {
            '\0' => Ok(()),
            _ => self.scanner.expect('\n'),
        }
    }

    /// Recipe lines are the indented lines directly after a rule.
    fn read_recipe(&mut self) -> Option<String> {
        let mut lines: Vec<&str> = Vec::new();
        while matches!(self.scanner.peek(), ' ' | '\t') {
            lines.push(self.scanner.read_line().trim_start());
        }
        while lines.last() == Some(&"") {
            lines.pop();
        }
        if lines.is_empty() {
            return None;
        }
        let mut recipe = lines.join("\n");
        recipe.push('\n');
        Some(recipe)
    }

    fn skip_comment(&mut self) {
        self.scanner.read_line();
    }

    /// Read text up to one of the stop characters or the end of the line,
    /// leaving the terminator unconsumed.  A `#` starts a comment that runs
    /// to the end of the line.
    fn read_eval(&mut self, stops: &[char]) -> ParseResult<EvalString<&'text str>> {
        let mut parts = Vec::new();
        let mut ofs = self.scanner.ofs;
        loop {
            let c = self.scanner.peek();
            if c == '\0' || c == '\n' || c == '#' || c == '$' || c == '\\' || stops.contains(&c)
            {
                let end = self.scanner.ofs;
                if end > ofs {
                    parts.push(EvalPart::Literal(self.scanner.slice(ofs, end)));
                }
                match c {
                    '$' => {
                        self.scanner.next();
                        parts.push(self.read_escape()?);
                    }
                    '\\' => {
                        self.scanner.next();
                        if self.scanner.skip('\n') {
                            parts.push(EvalPart::Literal(" "));
                        } else {
                            parts.push(EvalPart::Literal("\\"));
                        }
                    }
                    '#' => {
                        while !matches!(self.scanner.peek(), '\n' | '\0') {
                            self.scanner.next();
                        }
                        break;
                    }
                    _ => break,
                }
                ofs = self.scanner.ofs;
            } else {
                self.scanner.next();
            }
        }
        Ok(EvalString::new(parts))
    }

    fn read_escape(&mut self) -> ParseResult<EvalPart<&'text str>> {
        match self.scanner.peek() {
            '$' => {
                self.scanner.next();
                Ok(EvalPart::Literal("$"))
            }
            '{' => {
                self.scanner.next();
                let start = self.scanner.ofs;
                loop {
                    match self.scanner.peek() {
                        '}' => break,
                        '\0' | '\n' => return self.scanner.parse_error("unterminated ${"),
                        _ => self.scanner.next(),
                    }
                }
                let end = self.scanner.ofs;
                self.scanner.next();
                Ok(EvalPart::VarRef(self.scanner.slice(start, end)))
            }
            _ => {
                let start = self.scanner.ofs;
                while is_ident_char(self.scanner.peek()) {
                    self.scanner.next();
                }
                let end = self.scanner.ofs;
                if end == start {
                    return self.scanner.parse_error("bad $-escape (literal $ must be written as $$)");
                }
                Ok(EvalPart::VarRef(self.scanner.slice(start, end)))
            }
        }
    }
}

fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}
