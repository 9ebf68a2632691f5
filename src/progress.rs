//! Build progress reporting, for the purpose of display to the user.

use crate::graph::Status;
use std::io::Write;

/// Trait for build progress notifications.  Called from whichever thread is
/// building a node, so implementations must be Sync.
pub trait Progress: Sync {
    /// Called when a node's recipe is about to run.
    fn node_started(&self, name: &str);

    /// Called with the recipe text before it runs, unless the rule is quiet.
    fn recipe(&self, name: &str, recipe: &str);

    /// Called with the captured output of a finished recipe.
    fn output(&self, name: &str, output: &[u8]);

    /// Called when a node's recipe completes.
    fn node_finished(&self, name: &str, status: Status);

    /// Called when a node isn't built because a prerequisite failed.
    fn node_skipped(&self, name: &str);

    /// Log a line of output.
    fn log(&self, msg: &str);
}

const COLOR_DEFAULT: &str = "\x1b[0m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_YELLOW: &str = "\x1b[33m";
const COLOR_BLUE: &str = "\x1b[34m";

/// Prints progress to stdout, optionally colored.  Each notification takes
/// the stdout lock for all of its writes, so output from concurrent recipes
/// never interleaves within a message.
pub struct ConsoleProgress {
    color: bool,
}

impl ConsoleProgress {
    pub fn new(color: bool) -> Self {
        ConsoleProgress { color }
    }

    fn print(&self, color: &str, msg: &str) {
        let mut out = std::io::stdout().lock();
        let _ = if self.color {
            writeln!(out, "{}{}{}", color, msg, COLOR_DEFAULT)
        } else {
            writeln!(out, "{}", msg)
        };
    }
}

fn indent(text: &str) -> String {
    let mut indented = String::with_capacity(text.len());
    for line in text.lines() {
        indented.push_str("    ");
        indented.push_str(line);
        indented.push('\n');
    }
    indented
}

impl Progress for ConsoleProgress {
    fn node_started(&self, name: &str) {
        self.print(COLOR_BLUE, &format!("mking {}", name));
    }

    fn recipe(&self, _name: &str, recipe: &str) {
        let text = indent(recipe);
        let mut out = std::io::stdout().lock();
        let _ = if self.color {
            write!(out, "{}{}{}", COLOR_YELLOW, text, COLOR_DEFAULT)
        } else {
            write!(out, "{}", text)
        };
    }

    fn output(&self, _name: &str, output: &[u8]) {
        let _ = std::io::stdout().lock().write_all(output);
    }

    fn node_finished(&self, name: &str, status: Status) {
        match status {
            Status::Done => self.print(COLOR_GREEN, &format!("finished mking {}", name)),
            _ => self.print(COLOR_RED, &format!("failed mking {}", name)),
        }
    }

    fn node_skipped(&self, name: &str) {
        self.print(
            COLOR_RED,
            &format!("not mking {}: prerequisite failed", name),
        );
    }

    fn log(&self, msg: &str) {
        self.print(COLOR_DEFAULT, msg);
    }
}

/// Report a fatal error on stderr.
pub fn print_error(msg: &str, color: bool) {
    let mut err = std::io::stderr().lock();
    let _ = if color {
        writeln!(err, "{}mk: {}{}", COLOR_RED, msg, COLOR_DEFAULT)
    } else {
        writeln!(err, "mk: {}", msg)
    };
}
