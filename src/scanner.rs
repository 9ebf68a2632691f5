//! Scans an mkfile character by character.

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{} at offset {}", self.msg, self.ofs)
    }
}

pub struct Scanner<'a> {
    /// Text including the trailing nul.
    buf: &'a str,
    pub ofs: usize,
    pub line: usize,
}

impl<'a> Scanner<'a> {
    /// The buffer must end in a nul byte, which marks EOF.
    pub fn new(buf: &'a str) -> Self {
        if !buf.ends_with('\0') {
            panic!("Scanner requires nul-terminated buf");
        }
        Scanner {
            buf,
            ofs: 0,
            line: 1,
        }
    }

    /// Parse functions only slice at ASCII delimiters, which are always
    /// char boundaries.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.buf[start..end]
    }
    /// The byte at the cursor.  Non-ASCII bytes never equal any delimiter.
    pub fn peek(&self) -> char {
        self.buf.as_bytes()[self.ofs] as char
    }
    pub fn at_eof(&self) -> bool {
        self.ofs >= self.buf.len() - 1
    }
    pub fn next(&mut self) {
        if self.ofs == self.buf.len() - 1 {
            panic!("scanned past end")
        }
        if self.peek() == '\n' {
            self.line += 1;
        }
        self.ofs += 1;
    }
    pub fn back(&mut self) {
        if self.ofs == 0 {
            panic!("back at start")
        }
        self.ofs -= 1;
        if self.peek() == '\n' {
            self.line -= 1;
        }
    }
    /// Read one char.  Reading at EOF returns the nul without advancing.
    pub fn read(&mut self) -> char {
        let c = self.peek();
        if c != '\0' || !self.at_eof() {
            self.next();
        }
        c
    }
    pub fn skip(&mut self, ch: char) -> bool {
        if self.peek() == ch {
            self.next();
            return true;
        }
        false
    }

    /// Skip spaces and tabs, but not newlines.
    pub fn skip_spaces(&mut self) {
        while self.skip(' ') || self.skip('\t') || self.skip('\r') {}
    }

    /// Read up to (but not including) the end of the line, consuming the
    /// newline itself.
    pub fn read_line(&mut self) -> &'a str {
        let start = self.ofs;
        while !matches!(self.peek(), '\n' | '\0') {
            self.next();
        }
        let end = self.ofs;
        self.skip('\n');
        self.slice(start, end).trim_end_matches('\r')
    }

    pub fn expect(&mut self, ch: char) -> ParseResult<()> {
        let r = self.read();
        if r != ch {
            self.back();
            return self.parse_error(format!("expected {:?}, got {:?}", ch, r));
        }
        Ok(())
    }

    pub fn parse_error<T, S: Into<String>>(&self, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs: self.ofs,
        })
    }

    /// Render an error with the offending line and a caret under the column.
    pub fn format_parse_error(&self, filename: &str, err: ParseError) -> String {
        let text = &self.buf.as_bytes()[..self.buf.len() - 1];
        let ofs = err.ofs.min(text.len());
        let line_start = text[..ofs]
            .iter()
            .rposition(|&c| c == b'\n')
            .map_or(0, |i| i + 1);
        let line_end = text[ofs..]
            .iter()
            .position(|&c| c == b'\n')
            .map_or(text.len(), |i| ofs + i);
        let line_number = text[..line_start].iter().filter(|&&c| c == b'\n').count() + 1;
        let context = String::from_utf8_lossy(&text[line_start..line_end]);

        let prefix = format!("{}:{}: ", filename, line_number);
        let mut msg = format!("parse error: {}\n", err.msg);
        msg.push_str(&prefix);
        msg.push_str(context.trim_end_matches('\r'));
        msg.push('\n');
        msg.push_str(&" ".repeat(prefix.len() + (ofs - line_start)));
        msg.push_str("^\n");
        msg
    }
}
