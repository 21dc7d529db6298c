//! Statement tree and renderer
//!
//! Generators build [`Stmt`] values through a [`CodeWriter`]; rendering
//! applies the indentation rule (4 spaces per level) in one place, so a
//! block can never be left open.

const INDENT: &str = "    ";

/// One node of generated C# source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// A single source line
    Line(String),
    /// An empty separator line
    Blank,
    /// `head`, `{`, indented body, `}` followed by `tail` (e.g. `;`)
    Block {
        head: String,
        body: Vec<Stmt>,
        tail: String,
    },
    /// `head(` with one argument per indented line, closed by `)tail`
    Call {
        head: String,
        args: Vec<String>,
        tail: String,
    },
    /// Children one level deeper, no braces (fluent continuations)
    Indented(Vec<Stmt>),
}

impl Stmt {
    pub fn line(s: impl Into<String>) -> Self {
        Stmt::Line(s.into())
    }
}

/// Builder collecting statements in order
#[derive(Debug, Default)]
pub struct CodeWriter {
    stmts: Vec<Stmt>,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, s: impl Into<String>) -> &mut Self {
        self.stmts.push(Stmt::Line(s.into()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.stmts.push(Stmt::Blank);
        self
    }

    pub fn push(&mut self, stmt: Stmt) -> &mut Self {
        self.stmts.push(stmt);
        self
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Stmt>) -> &mut Self {
        self.stmts.extend(stmts);
        self
    }

    /// Braced block; the body is built by `f`
    pub fn block(&mut self, head: impl Into<String>, f: impl FnOnce(&mut CodeWriter)) -> &mut Self {
        self.block_with_tail(head, "", f)
    }

    pub fn block_with_tail(
        &mut self,
        head: impl Into<String>,
        tail: impl Into<String>,
        f: impl FnOnce(&mut CodeWriter),
    ) -> &mut Self {
        let mut inner = CodeWriter::new();
        f(&mut inner);
        self.stmts.push(Stmt::Block {
            head: head.into(),
            body: inner.finish(),
            tail: tail.into(),
        });
        self
    }

    pub fn call(
        &mut self,
        head: impl Into<String>,
        args: Vec<String>,
        tail: impl Into<String>,
    ) -> &mut Self {
        self.stmts.push(Stmt::Call {
            head: head.into(),
            args,
            tail: tail.into(),
        });
        self
    }

    pub fn indented(&mut self, f: impl FnOnce(&mut CodeWriter)) -> &mut Self {
        let mut inner = CodeWriter::new();
        f(&mut inner);
        self.stmts.push(Stmt::Indented(inner.finish()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn finish(self) -> Vec<Stmt> {
        self.stmts
    }
}

/// Render statements starting at `level`; every line ends with `\n`
pub fn render(stmts: &[Stmt], level: usize) -> String {
    let mut out = String::new();
    for stmt in stmts {
        render_into(&mut out, stmt, level);
    }
    out
}

fn render_into(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Line(text) => push_line(out, level, text),
        Stmt::Blank => out.push('\n'),
        Stmt::Block { head, body, tail } => {
            push_line(out, level, head);
            push_line(out, level, "{");
            for child in body {
                render_into(out, child, level + 1);
            }
            push_line(out, level, &format!("}}{}", tail));
        }
        Stmt::Call { head, args, tail } => {
            if args.is_empty() {
                push_line(out, level, &format!("{}(){}", head, tail));
                return;
            }
            push_line(out, level, &format!("{}(", head));
            let last = args.len() - 1;
            for (i, arg) in args.iter().enumerate() {
                if i == last {
                    push_line(out, level + 1, &format!("{}){}", arg, tail));
                } else {
                    push_line(out, level + 1, &format!("{},", arg));
                }
            }
        }
        Stmt::Indented(children) => {
            for child in children {
                render_into(out, child, level + 1);
            }
        }
    }
}

fn push_line(out: &mut String, level: usize, text: &str) {
    if !text.is_empty() {
        for _ in 0..level {
            out.push_str(INDENT);
        }
        out.push_str(text);
    }
    out.push('\n');
}
