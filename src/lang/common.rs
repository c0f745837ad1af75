//! Line classification shared by the indexer: indentation, logical-line
//! boundaries, and the structural problems a strict parse rejects.

pub const DEFAULT_TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    Comment,
    /// First physical row of a logical line.
    Code,
    /// Inside brackets, a triple-quoted string, or after a backslash continuation.
    Continuation,
}

#[derive(Debug, Clone)]
pub struct ScannedLine<'a> {
    pub text: &'a str,
    pub class: LineClass,
    pub indent: usize,
    /// Set on `Code` rows whose logical line has a `:` outside brackets and strings.
    pub block_colon: bool,
}

/// 1-based location of something a strict parse refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

pub struct Scan<'a> {
    pub lines: Vec<ScannedLine<'a>>,
    pub problems: Vec<Problem>,
}

/// Width of the leading whitespace with tabs advanced to the next tab stop.
pub fn indent_width(line: &str, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    let mut col = 0;
    for c in line.chars() {
        match c {
            ' ' => col += 1,
            '\t' => col = (col / tab_width + 1) * tab_width,
            '\x0c' => col = 0,
            _ => break,
        }
    }
    col
}

#[derive(Debug, Clone, Copy)]
struct OpenString {
    quote: char,
    triple: bool,
    line: usize,
    column: usize,
}

#[derive(Debug, Clone, Copy)]
struct OpenBracket {
    ch: char,
    line: usize,
    column: usize,
}

/// Tracks string, bracket and continuation state across physical lines.
pub struct LineScanner {
    brackets: Vec<OpenBracket>,
    string: Option<OpenString>,
    backslash: bool,
    problems: Vec<Problem>,
}

impl LineScanner {
    pub fn new() -> Self {
        Self {
            brackets: Vec::new(),
            string: None,
            backslash: false,
            problems: Vec::new(),
        }
    }

    fn in_logical_line(&self) -> bool {
        !self.brackets.is_empty() || self.string.is_some() || self.backslash
    }

    /// Classify one physical line and advance the state past it.
    /// Returns the class and whether a block colon appeared on this row.
    pub fn feed(&mut self, line: &str, row: usize) -> (LineClass, bool) {
        let continuation = self.in_logical_line();
        let trimmed = line.trim();
        let class = if continuation {
            LineClass::Continuation
        } else if trimmed.is_empty() {
            LineClass::Blank
        } else if trimmed.starts_with('#') {
            LineClass::Comment
        } else {
            LineClass::Code
        };

        self.backslash = false;
        if matches!(class, LineClass::Blank | LineClass::Comment) {
            return (class, false);
        }

        let chars: Vec<char> = line.chars().collect();
        let line_no = row + 1;
        let mut colon = false;
        let mut escaped_eol = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if let Some(open) = self.string {
                if c == '\\' {
                    if i + 1 == chars.len() {
                        escaped_eol = true;
                    }
                    i += 2;
                    continue;
                }
                if c == open.quote {
                    if !open.triple {
                        self.string = None;
                    } else if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        self.string = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
                continue;
            }

            match c {
                '#' => break,
                '\'' | '"' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    self.string = Some(OpenString {
                        quote: c,
                        triple,
                        line: line_no,
                        column: i + 1,
                    });
                    i += if triple { 3 } else { 1 };
                    continue;
                }
                '(' | '[' | '{' => self.brackets.push(OpenBracket {
                    ch: c,
                    line: line_no,
                    column: i + 1,
                }),
                ')' | ']' | '}' => self.close_bracket(c, line_no, i + 1),
                ':' if self.brackets.is_empty() => colon = true,
                '\\' if i + 1 == chars.len() => self.backslash = true,
                _ => {}
            }
            i += 1;
        }

        if let Some(open) = self.string {
            if !open.triple && !escaped_eol {
                self.problems.push(Problem {
                    line: open.line,
                    column: open.column,
                    message: "unterminated string literal".into(),
                });
                self.string = None;
            }
        }

        (class, colon)
    }

    fn close_bracket(&mut self, c: char, line: usize, column: usize) {
        let expected = match c {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.brackets.pop() {
            None => self.problems.push(Problem {
                line,
                column,
                message: format!("unmatched '{}'", c),
            }),
            Some(open) if open.ch != expected => self.problems.push(Problem {
                line,
                column,
                message: format!(
                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                    c, open.ch
                ),
            }),
            Some(_) => {}
        }
    }

    /// Report constructs still open at end of input.
    pub fn finish(mut self) -> Vec<Problem> {
        if let Some(open) = self.string.take() {
            self.problems.push(Problem {
                line: open.line,
                column: open.column,
                message: "unterminated triple-quoted string literal".into(),
            });
        }
        if let Some(open) = self.brackets.last() {
            self.problems.push(Problem {
                line: open.line,
                column: open.column,
                message: format!("'{}' was never closed", open.ch),
            });
        }
        self.problems
    }
}

/// Classify every line of `text`, attributing block colons to the row that starts each logical line.
pub fn scan(text: &str, tab_width: usize) -> Scan<'_> {
    let mut scanner = LineScanner::new();
    let mut lines: Vec<ScannedLine<'_>> = Vec::new();
    let mut logical_start: Option<usize> = None;

    for (row, line) in text.lines().enumerate() {
        let (class, colon) = scanner.feed(line, row);
        if class == LineClass::Code {
            logical_start = Some(row);
        }
        lines.push(ScannedLine {
            text: line,
            class,
            indent: indent_width(line, tab_width),
            block_colon: false,
        });
        if colon {
            if let Some(start) = logical_start {
                lines[start].block_colon = true;
            }
        }
    }

    Scan {
        lines,
        problems: scanner.finish(),
    }
}
