//! Statement splitting for migration scripts.
//!
//! Scripts are tokenized with the sqlparser tokenizer, so a `;` inside a
//! string literal, quoted identifier, comment or dollar-quoted body never
//! ends a statement. The tokens only mark boundaries: statement text is
//! copied from the script as written, with comments dropped.

use crate::domain::model::{SqlDialect, Statement};
use crate::utils::error::{Result, RunnerError};
use sqlparser::dialect::{dialect_from_str, Dialect, GenericDialect};
use sqlparser::tokenizer::{Location, Token, TokenWithLocation, Tokenizer, Whitespace};

/// Words that may follow `END` without closing a `BEGIN`/`CASE` block.
const NON_BLOCK_END_SUFFIXES: [&str; 4] = ["IF", "LOOP", "WHILE", "REPEAT"];

pub fn split_script(sql: &str, dialect: SqlDialect) -> Result<Vec<Statement>> {
    let dialect: Box<dyn Dialect> =
        dialect_from_str(dialect.as_str()).unwrap_or_else(|| Box::new(GenericDialect {}));

    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .with_unescape(false)
        .tokenize_with_location()
        .map_err(|e| RunnerError::ParseError {
            message: e.message,
            line: e.location.line,
            column: e.location.column,
        })?;

    let offsets = SourceOffsets::new(sql);
    let starts: Vec<usize> = tokens.iter().map(|t| offsets.byte_offset(&t.location)).collect();

    let mut splitter = Splitter::default();
    for (pos, twl) in tokens.iter().enumerate() {
        let end = starts.get(pos + 1).copied().unwrap_or(sql.len());
        let span = &sql[starts[pos]..end.max(starts[pos])];
        splitter.push(twl, span, next_word(&tokens[pos + 1..]));
    }
    Ok(splitter.finish())
}

/// Maps tokenizer locations (1-based line, 1-based char column) to byte offsets.
struct SourceOffsets<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceOffsets<'a> {
    fn new(sql: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { sql, line_starts }
    }

    fn byte_offset(&self, location: &Location) -> usize {
        let line = (location.line.max(1) - 1) as usize;
        let Some(&base) = self.line_starts.get(line) else {
            return self.sql.len();
        };
        let column = location.column.max(1) as usize - 1;
        self.sql[base..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| base + i)
            .unwrap_or(self.sql.len())
    }
}

/// Uppercased bare word of the next significant token, if it is one.
fn next_word(rest: &[TokenWithLocation]) -> Option<String> {
    rest.iter()
        .map(|t| &t.token)
        .find(|t| !matches!(t, Token::Whitespace(_)))
        .and_then(bare_word)
}

fn bare_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_uppercase()),
        _ => None,
    }
}

#[derive(Default)]
struct Splitter {
    statements: Vec<Statement>,
    current: String,
    start_line: Option<u64>,
    seen_first_word: bool,
    block_depth: usize,
    /// Set after `END`, so the `IF`/`CASE`/... that follows is not read as an opener.
    skip_next_word: bool,
}

impl Splitter {
    /// `span` is the token's exact source text.
    fn push(&mut self, twl: &TokenWithLocation, span: &str, lookahead: Option<String>) {
        match &twl.token {
            Token::Whitespace(Whitespace::SingleLineComment { .. }) => {
                // 保留註解結尾的換行 (\n 或 \r\n)
                let body = span.trim_end_matches(['\r', '\n']);
                self.current.push_str(&span[body.len()..]);
            }
            Token::Whitespace(Whitespace::MultiLineComment(_)) => self.current.push(' '),
            Token::Whitespace(_) => self.current.push_str(span),
            Token::EOF => {}
            Token::SemiColon if self.block_depth == 0 => self.end_statement(),
            token => {
                self.start_line.get_or_insert(twl.location.line);
                if let Some(word) = bare_word(token) {
                    self.track_block(&word, lookahead);
                }
                self.current.push_str(span);
            }
        }
    }

    fn track_block(&mut self, word: &str, lookahead: Option<String>) {
        if !self.seen_first_word {
            // 以 BEGIN 開頭的是交易控制語句，不是區塊
            self.seen_first_word = true;
            return;
        }
        if self.skip_next_word {
            self.skip_next_word = false;
            return;
        }

        match word {
            "BEGIN" | "CASE" => self.block_depth += 1,
            "END" => match lookahead.as_deref() {
                Some(next) if NON_BLOCK_END_SUFFIXES.contains(&next) => {
                    self.skip_next_word = true;
                }
                Some("CASE") => {
                    self.skip_next_word = true;
                    self.block_depth = self.block_depth.saturating_sub(1);
                }
                _ => self.block_depth = self.block_depth.saturating_sub(1),
            },
            _ => {}
        }
    }

    fn end_statement(&mut self) {
        let text = self.current.trim();
        if let (false, Some(line)) = (text.is_empty(), self.start_line) {
            self.statements.push(Statement {
                index: self.statements.len() + 1,
                sql: format!("{};", text),
                line,
            });
        }

        self.current.clear();
        self.start_line = None;
        self.seen_first_word = false;
        self.block_depth = 0;
        self.skip_next_word = false;
    }

    fn finish(mut self) -> Vec<Statement> {
        // 最後一段可能沒有分號
        self.end_statement();
        self.statements
    }
}
