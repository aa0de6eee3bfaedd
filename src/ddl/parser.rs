//! SQL parser for CREATE TABLE and ALTER TABLE statements.
//!
//! Statements it does not understand are skipped, not rejected, so whole
//! database dumps can be fed in.

use super::dialect::Dialect;
use super::lexer::{Lexer, Token, Tokens};
use super::types::map_type;
use crate::model::{Cardinality, Column, KeyRole};
use crate::roster::{SourceModel, SourceRelationship, SourceTable};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlParseError {
    #[error("line {line}: unexpected token {token:?}")]
    UnexpectedToken { token: Token, line: usize },
    #[error("line {line}: expected {expected}, found {found:?}")]
    Expected { expected: String, found: Token, line: usize },
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// Parse a SQL dump into a roster.
///
/// Foreign keys become `many-to-one` relationships from the referencing
/// table to the referenced one, one per table pair.
pub fn parse_sql(input: &str, dialect: Dialect) -> Result<SourceModel, SqlParseError> {
    let dialect = dialect.resolve(input);
    let tokens = Lexer::new(input).tokenize();
    let mut parser = Parser::new(tokens, dialect);
    parser.parse()
}

struct Parser {
    tokens: Vec<Token>,
    lines: Vec<usize>,
    comments: HashMap<usize, String>,
    pos: usize,
    dialect: Dialect,
}

struct FkInfo {
    columns: Vec<String>,
    target: String,
    target_columns: Vec<String>,
}

impl Parser {
    fn new(tokens: Tokens, dialect: Dialect) -> Self {
        Self {
            tokens: tokens.tokens,
            lines: tokens.lines,
            comments: tokens.comments,
            pos: 0,
            dialect,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.lines.get(self.pos).or(self.lines.last()).copied().unwrap_or(1)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn comment_here(&self) -> Option<String> {
        self.comments.get(&self.pos).cloned()
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), SqlParseError> {
        match self.current() {
            t if *t == token => {
                self.advance();
                Ok(())
            }
            Token::Eof => Err(SqlParseError::UnexpectedEof),
            found => Err(SqlParseError::Expected {
                expected: expected.to_string(),
                found: found.clone(),
                line: self.line(),
            }),
        }
    }

    fn parse(&mut self) -> Result<SourceModel, SqlParseError> {
        let mut tables = Vec::new();
        let mut fk_constraints: Vec<(String, FkInfo)> = Vec::new();

        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => {
                    let description = self.comment_here();
                    self.advance();

                    // CREATE TEMPORARY TABLE and friends
                    while matches!(self.current(), Token::Ident(_)) {
                        self.advance();
                    }

                    if self.current() == &Token::Table {
                        self.advance();

                        if self.current() == &Token::If {
                            self.advance(); // IF
                            if self.current() == &Token::Not {
                                self.advance();
                            }
                            if self.current() == &Token::Exists {
                                self.advance();
                            }
                        }

                        if let Some((mut table, fks)) = self.parse_create_table()? {
                            table.description = description.unwrap_or_default();
                            for fk in fks {
                                fk_constraints.push((table.name.clone(), fk));
                            }
                            tables.push(table);
                        }
                    } else {
                        // CREATE INDEX, VIEW, ...
                        self.skip_statement();
                    }
                }
                Token::Alter => {
                    if let Some((table_name, fk)) = self.parse_alter_table_fk()? {
                        fk_constraints.push((table_name, fk));
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        apply_foreign_keys(&mut tables, &fk_constraints);
        let relationships = generate_relationships(&tables, &fk_constraints);
        tracing::debug!(
            dialect = self.dialect.as_str(),
            tables = tables.len(),
            relationships = relationships.len(),
            "parsed sql"
        );
        Ok(SourceModel { tables, relationships })
    }

    /// Table name, keeping the last part of `schema.table`.
    fn parse_qualified_name(&mut self) -> Option<String> {
        let mut name = match self.current() {
            Token::Ident(name) => name.clone(),
            _ => return None,
        };
        self.advance();
        while self.current() == &Token::Dot {
            self.advance();
            match self.current() {
                Token::Ident(part) => {
                    name = part.clone();
                    self.advance();
                }
                _ => return None,
            }
        }
        Some(name)
    }

    fn parse_create_table(&mut self) -> Result<Option<(SourceTable, Vec<FkInfo>)>, SqlParseError> {
        let Some(table_name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(None);
        };

        if self.current() != &Token::LParen {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        let mut columns: Vec<Column> = Vec::new();
        let mut fk_infos = Vec::new();
        let mut pk_columns: Vec<String> = Vec::new();

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                }
                Token::Primary => {
                    // PRIMARY KEY (col1, col2, ...)
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                        pk_columns.extend(self.parse_column_list());
                    }
                }
                Token::Foreign => {
                    if let Some(fk) = self.parse_foreign_key_constraint()? {
                        fk_infos.push(fk);
                    }
                }
                Token::Unique => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Constraint => {
                    // Named constraint; the type follows the name
                    self.advance();
                    if let Token::Ident(_) = self.current() {
                        self.advance();
                    }
                }
                Token::Index | Token::Key => {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Ident(_) => {
                    if let Some((col, fk)) = self.parse_column()? {
                        if columns.iter().any(|c| c.name == col.name) {
                            tracing::warn!(table = %table_name, column = %col.name, "duplicate column ignored");
                        } else {
                            fk_infos.extend(fk);
                            columns.push(col);
                        }
                    }
                }
                Token::Eof => return Err(SqlParseError::UnexpectedEof),
                _ => {
                    self.advance();
                }
            }
        }

        // Table options (ENGINE=, etc.)
        self.skip_statement();

        for col in &mut columns {
            if pk_columns.contains(&col.name) && !col.is_primary_key() {
                col.key = KeyRole::Primary;
                col.nullable = false;
            }
        }

        Ok(Some((SourceTable::new(table_name, columns), fk_infos)))
    }

    /// A column definition and its inline reference, if any.
    fn parse_column(&mut self) -> Result<Option<(Column, Option<FkInfo>)>, SqlParseError> {
        let description = self.comment_here();
        let name = match self.current() {
            Token::Ident(n) => n.clone(),
            _ => return Ok(None),
        };
        self.advance();

        let raw_type = self.parse_type();
        if raw_type.is_empty() {
            self.skip_until(&[Token::Comma, Token::RParen]);
            return Ok(None);
        }
        let (data_type, length) = map_type(&raw_type, self.dialect);

        let mut col = Column::new(name, data_type);
        col.length = length;
        col.description = description;
        let mut reference = None;

        loop {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    col.key = KeyRole::Primary;
                    col.nullable = false;
                }
                Token::Not => {
                    self.advance();
                    if self.current() == &Token::Null {
                        self.advance();
                        col.nullable = false;
                    }
                }
                Token::Null => {
                    self.advance();
                }
                Token::Unique => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                }
                Token::Default => {
                    self.advance();
                    self.skip_default_value();
                }
                Token::References => {
                    self.advance();
                    let (target, target_columns) = self.parse_reference()?;
                    reference = Some(FkInfo {
                        columns: vec![col.name.clone()],
                        target,
                        target_columns,
                    });
                    self.skip_on_actions();
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Constraint => {
                    self.advance();
                    if let Token::Ident(_) = self.current() {
                        self.advance();
                    }
                }
                Token::On => self.skip_on_actions(),
                Token::Comma | Token::RParen | Token::Eof => break,
                // AUTO_INCREMENT, COMMENT '...', COLLATE x, ...
                _ => {
                    self.advance();
                }
            }
        }

        Ok(Some((col, reference)))
    }

    /// Raw type text, e.g. `VARCHAR(255)` or `DOUBLE PRECISION`.
    fn parse_type(&mut self) -> String {
        let mut raw = String::new();
        let mut paren_depth = 0;

        loop {
            match self.current() {
                Token::Ident(t) | Token::Serial(t) => {
                    if paren_depth == 0 && !raw.is_empty() && (raw.ends_with(')') || is_modifier_word(t)) {
                        break;
                    }
                    if !raw.is_empty() && !raw.ends_with('(') && !raw.ends_with(',') {
                        raw.push(' ');
                    }
                    raw.push_str(t);
                    self.advance();
                }
                Token::LParen => {
                    paren_depth += 1;
                    raw.push('(');
                    self.advance();
                }
                Token::RParen if paren_depth > 0 => {
                    paren_depth -= 1;
                    raw.push(')');
                    self.advance();
                }
                Token::Num(n) if paren_depth > 0 => {
                    raw.push_str(n);
                    self.advance();
                }
                Token::Str(s) if paren_depth > 0 => {
                    raw.push_str(&format!("'{}'", s));
                    self.advance();
                }
                Token::Comma if paren_depth > 0 => {
                    raw.push(',');
                    self.advance();
                }
                _ => break,
            }
        }
        raw
    }

    fn skip_default_value(&mut self) {
        match self.current() {
            Token::LParen => self.skip_parenthesized(),
            Token::Ident(_) => {
                self.advance();
                // NOW(), nextval('seq'), ...
                if self.current() == &Token::LParen {
                    self.skip_parenthesized();
                }
            }
            Token::Eof | Token::Comma | Token::RParen => {}
            _ => self.advance(),
        }
    }

    fn parse_reference(&mut self) -> Result<(String, Vec<String>), SqlParseError> {
        let target = match self.parse_qualified_name() {
            Some(t) => t,
            None => {
                return Err(SqlParseError::UnexpectedToken {
                    token: self.current().clone(),
                    line: self.line(),
                });
            }
        };
        let mut columns = self.parse_column_list();
        if columns.is_empty() {
            columns.push("id".to_string());
        }
        Ok((target, columns))
    }

    fn parse_foreign_key_constraint(&mut self) -> Result<Option<FkInfo>, SqlParseError> {
        self.advance(); // FOREIGN
        if self.current() != &Token::Key {
            return Ok(None);
        }
        self.advance(); // KEY

        // MySQL allows an index name here
        if let Token::Ident(_) = self.current() {
            self.advance();
        }
        let columns = self.parse_column_list();

        if self.current() != &Token::References {
            return Ok(None);
        }
        self.advance();

        let (target, target_columns) = self.parse_reference()?;
        self.skip_on_actions();

        Ok(Some(FkInfo {
            columns,
            target,
            target_columns,
        }))
    }

    fn parse_column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();

        if self.current() != &Token::LParen {
            return cols;
        }
        self.advance();

        loop {
            match self.current() {
                Token::Ident(name) => {
                    cols.push(name.clone());
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                // commas, prefix lengths, ASC/DESC
                _ => {
                    self.advance();
                }
            }
        }

        cols
    }

    fn skip_on_actions(&mut self) {
        while self.current() == &Token::On {
            self.advance();
            if matches!(self.current(), Token::Delete | Token::Update) {
                self.advance();
            }
            // CASCADE, RESTRICT, SET NULL, SET DEFAULT, NO ACTION
            match self.current() {
                Token::Cascade | Token::Restrict => {
                    self.advance();
                }
                Token::Ident(s) if s.eq_ignore_ascii_case("SET") => {
                    self.advance();
                    if matches!(self.current(), Token::Null | Token::Default) {
                        self.advance();
                    }
                }
                Token::Ident(s) if s.eq_ignore_ascii_case("NO") => {
                    self.advance();
                    if let Token::Ident(a) = self.current() {
                        if a.eq_ignore_ascii_case("ACTION") {
                            self.advance();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_parenthesized(&mut self) {
        if self.current() != &Token::LParen {
            return;
        }
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }

    /// ALTER TABLE [ONLY] t ADD [CONSTRAINT name] FOREIGN KEY ...
    fn parse_alter_table_fk(&mut self) -> Result<Option<(String, FkInfo)>, SqlParseError> {
        self.advance(); // ALTER

        if self.current() != &Token::Table {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        if self.current() == &Token::Only {
            self.advance();
        }

        let Some(table_name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(None);
        };

        if self.current() != &Token::Add {
            self.skip_statement();
            return Ok(None);
        }
        self.advance();

        if self.current() == &Token::Constraint {
            self.advance();
            if let Token::Ident(_) = self.current() {
                self.advance();
            }
        }

        if self.current() != &Token::Foreign {
            self.skip_statement();
            return Ok(None);
        }

        let fk = self.parse_foreign_key_constraint()?;
        if self.current() != &Token::Eof {
            self.expect(Token::Semicolon, "';'")?;
        }
        Ok(fk.map(|fk| (table_name, fk)))
    }
}

/// Column options that end the type text.
fn is_modifier_word(word: &str) -> bool {
    ["COLLATE", "COMMENT", "GENERATED", "CHARSET", "IDENTITY"]
        .iter()
        .any(|w| word.eq_ignore_ascii_case(w))
}

/// Mark referencing columns as foreign keys. A primary key keeps its role;
/// the relationship is still derived from the table pair.
fn apply_foreign_keys(tables: &mut [SourceTable], fks: &[(String, FkInfo)]) {
    let names: HashSet<String> = tables.iter().map(|t| t.name.clone()).collect();
    for (source, fk) in fks {
        if !names.contains(&fk.target) {
            tracing::warn!(table = %source, target = %fk.target, "foreign key to unknown table ignored");
            continue;
        }
        let Some(table) = tables.iter_mut().find(|t| &t.name == source) else {
            continue;
        };
        for (i, column) in fk.columns.iter().enumerate() {
            let target_column = fk
                .target_columns
                .get(i)
                .or_else(|| fk.target_columns.first())
                .map(String::as_str)
                .unwrap_or("id");
            if let Some(col) = table.columns.iter_mut().find(|c| &c.name == column) {
                if col.key.set_foreign(column, &fk.target, target_column).is_err() {
                    tracing::debug!(table = %source, column = %column, "primary key column also references {}", fk.target);
                }
            }
        }
    }
}

/// One `many-to-one` relationship per (referencing, referenced) table pair,
/// in declaration order.
fn generate_relationships(tables: &[SourceTable], fks: &[(String, FkInfo)]) -> Vec<SourceRelationship> {
    let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut relationships = Vec::new();

    for (source, fk) in fks {
        if names.contains(fk.target.as_str()) && seen.insert((source.as_str(), fk.target.as_str())) {
            relationships.push(SourceRelationship::new(
                source.clone(),
                fk.target.clone(),
                Cardinality::ManyToOne,
            ));
        }
    }

    relationships
}
