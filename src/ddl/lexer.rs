//! SQL lexer for CREATE TABLE and ALTER TABLE statements.
//!
//! Line comments directly above a token (no blank line between) are kept
//! and attached to that token's index; the parser reads them as table and
//! column descriptions. Comments trailing code on the same line are dropped.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Delete,
    Update,
    Cascade,
    Restrict,
    Constraint,
    Index,
    If,
    Exists,
    Auto,
    Increment,
    /// SERIAL family, spelled as written
    Serial(String),
    Check,

    Ident(String),
    Str(String),
    Num(String),

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,

    Eof,
}

impl Token {
    fn keyword(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "ALTER" => Self::Alter,
            "ADD" => Self::Add,
            "TABLE" => Self::Table,
            "ONLY" => Self::Only,
            "PRIMARY" => Self::Primary,
            "KEY" => Self::Key,
            "FOREIGN" => Self::Foreign,
            "REFERENCES" => Self::References,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "UNIQUE" => Self::Unique,
            "DEFAULT" => Self::Default,
            "ON" => Self::On,
            "DELETE" => Self::Delete,
            "UPDATE" => Self::Update,
            "CASCADE" => Self::Cascade,
            "RESTRICT" => Self::Restrict,
            "CONSTRAINT" => Self::Constraint,
            "INDEX" => Self::Index,
            "IF" => Self::If,
            "EXISTS" => Self::Exists,
            "AUTO_INCREMENT" | "AUTOINCREMENT" | "INCREMENT" => Self::Increment,
            "AUTO" => Self::Auto,
            "SERIAL" | "BIGSERIAL" | "SMALLSERIAL" => Self::Serial(word.to_string()),
            "CHECK" => Self::Check,
            _ => Self::Ident(word.to_string()),
        }
    }

    fn symbol(c: char) -> Option<Self> {
        Some(match c {
            '(' => Self::LParen,
            ')' => Self::RParen,
            ',' => Self::Comma,
            ';' => Self::Semicolon,
            '.' => Self::Dot,
            _ => return None,
        })
    }
}

/// Token stream with the 1-based line of each token and the leading
/// comments keyed by token index.
#[derive(Debug, Default)]
pub struct Tokens {
    pub tokens: Vec<Token>,
    pub lines: Vec<usize>,
    pub comments: HashMap<usize, String>,
}

pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    /// Comment lines waiting for the next token.
    pending: Vec<String>,
    /// Whether a token has been emitted on the current line.
    code_on_line: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
            pending: Vec::new(),
            code_on_line: false,
        }
    }

    fn at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.at(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.code_on_line = false;
        }
        Some(c)
    }

    fn eat_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.at(0).filter(|c| keep(*c)) {
            out.push(c);
            self.bump();
        }
        out
    }

    fn skip_blank(&mut self) {
        let start = self.line;
        self.eat_while(char::is_whitespace);
        // A blank line detaches comments from what follows.
        if self.line - start >= 2 {
            self.pending.clear();
        }
    }

    fn line_comment(&mut self, marker: usize) {
        self.pos += marker;
        let text = self.eat_while(|c| c != '\n');
        if !self.code_on_line {
            self.pending.push(text.trim().to_string());
        }
    }

    fn block_comment(&mut self) {
        self.pos += 2;
        while self.at(0).is_some() && !(self.at(0) == Some('*') && self.at(1) == Some('/')) {
            self.bump();
        }
        self.pos = (self.pos + 2).min(self.src.len());
    }

    /// Quoted text up to `close`. A doubled closing quote is a literal one.
    fn quoted(&mut self, close: char, backslash_escapes: bool) -> String {
        self.bump();
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                c if c == close && self.at(0) == Some(close) => {
                    out.push(c);
                    self.bump();
                }
                c if c == close => break,
                '\\' if backslash_escapes => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        out
    }

    fn number(&mut self) -> String {
        let mut out = String::new();
        if self.at(0) == Some('-') {
            self.bump();
            out.push('-');
        }
        out.push_str(&self.eat_while(|c| c.is_ascii_digit()));
        if self.at(0) == Some('.') {
            self.bump();
            out.push('.');
            out.push_str(&self.eat_while(|c| c.is_ascii_digit()));
        }
        out
    }

    fn word(&mut self) -> Token {
        let mut word = self.eat_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
        // Postgres array suffix
        if self.at(0) == Some('[') && self.at(1) == Some(']') {
            self.pos += 2;
            word.push_str("[]");
        }
        Token::keyword(&word)
    }

    /// Next token and the line it starts on.
    pub fn next_token(&mut self) -> (Token, usize) {
        loop {
            self.skip_blank();
            let line = self.line;
            let Some(c) = self.at(0) else {
                return (Token::Eof, line);
            };

            let token = match (c, self.at(1)) {
                ('-', Some('-')) => {
                    self.line_comment(2);
                    continue;
                }
                ('#', _) => {
                    self.line_comment(1);
                    continue;
                }
                ('/', Some('*')) => {
                    self.block_comment();
                    continue;
                }
                ('-', Some(d)) if d.is_ascii_digit() => Token::Num(self.number()),
                (d, _) if d.is_ascii_digit() => Token::Num(self.number()),
                ('"', _) => Token::Ident(self.quoted('"', false)),
                ('`', _) => Token::Ident(self.quoted('`', false)),
                // SQL Server style [identifier]
                ('[', _) => Token::Ident(self.quoted(']', false)),
                ('\'', _) => Token::Str(self.quoted('\'', true)),
                (a, _) if a.is_alphabetic() || a == '_' => self.word(),
                (s, _) => match Token::symbol(s) {
                    Some(token) => {
                        self.bump();
                        token
                    }
                    None => {
                        // stray characters are skipped
                        self.bump();
                        continue;
                    }
                },
            };
            self.code_on_line = true;
            return (token, line);
        }
    }

    /// Collect all tokens, their lines and the comments leading them.
    pub fn tokenize(mut self) -> Tokens {
        let mut out = Tokens::default();
        loop {
            let (token, line) = self.next_token();
            if !self.pending.is_empty() {
                out.comments.insert(out.tokens.len(), self.pending.join("\n"));
                self.pending.clear();
            }
            let done = token == Token::Eof;
            out.tokens.push(token);
            out.lines.push(line);
            if done {
                return out;
            }
        }
    }
}
