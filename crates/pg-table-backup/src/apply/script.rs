//! Parsing of backup artifacts into individual `INSERT` statements.
//!
//! The artifact is tokenized with the PostgreSQL dialect of `sqlparser`, so
//! standard, escape (`E'..'`) and dollar-quoted strings, quoted identifiers
//! and comments are recognised exactly as the server would. Statements end at
//! a `;` token. Each statement is then parsed to find its target table.

use sqlparser::ast as sp;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};

use crate::error::{BackupError, Result};

/// One statement of the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based line the statement starts on.
    pub line: usize,
    /// Target table of the `INSERT`, as stored in the catalog.
    pub table: String,
    /// Statement text without the terminating `;`.
    pub sql: String,
}

/// Split an artifact into statements and resolve each statement's table.
pub fn parse(text: &str) -> Result<Vec<Statement>> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, text)
        .tokenize_with_location()
        .map_err(|e| BackupError::artifact(e.location.line as usize, e.message))?;

    let source = SourceText::new(text);
    let mut statements = Vec::new();
    for group in tokens.split(|t| t.token == Token::SemiColon) {
        let significant: Vec<&TokenWithSpan> =
            group.iter().filter(|t| !is_insignificant(&t.token)).collect();
        let (Some(first), Some(last)) = (significant.first(), significant.last()) else {
            continue;
        };

        let line = first.span.start.line as usize;
        let sql = source.slice(first.span.start, last.span.end).to_string();
        let table = target_table(&sql, line)?;
        statements.push(Statement { line, table, sql });
    }

    Ok(statements)
}

fn is_insignificant(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_) | Token::EOF)
}

/// Table named by a single `INSERT INTO <name>` statement.
///
/// A schema qualifier is dropped. Quoted names are taken verbatim, unquoted
/// names fold to lower case the way the server folds them.
fn target_table(sql: &str, line: usize) -> Result<String> {
    let parsed = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| BackupError::artifact(line, e.to_string()))?;

    let name = match parsed.as_slice() {
        [sp::Statement::Insert(insert)] => match &insert.table {
            sp::TableObject::TableName(name) => name,
            _ => {
                return Err(BackupError::artifact(
                    line,
                    "INSERT into a table function is not supported",
                ))
            }
        },
        _ => {
            return Err(BackupError::artifact(
                line,
                format!("expected an INSERT INTO statement, got: {}", preview(sql)),
            ))
        }
    };

    match name.0.last() {
        Some(sp::ObjectNamePart::Identifier(ident)) => Ok(match ident.quote_style {
            Some('"') => ident.value.clone(),
            _ => ident.value.to_lowercase(),
        }),
        _ => Err(BackupError::artifact(
            line,
            format!("cannot resolve the target table of: {}", preview(sql)),
        )),
    }
}

/// Maps tokenizer locations (1-based line and character column) to byte offsets.
struct SourceText<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceText<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    fn offset(&self, location: Location) -> usize {
        let Some(&start) = self.line_starts.get((location.line as usize).saturating_sub(1)) else {
            return self.text.len();
        };
        self.text[start..]
            .char_indices()
            .nth((location.column as usize).saturating_sub(1))
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len())
    }

    fn slice(&self, from: Location, to: Location) -> &'a str {
        &self.text[self.offset(from)..self.offset(to)]
    }
}

fn preview(sql: &str) -> String {
    let first_line = sql.lines().next().unwrap_or_default();
    if first_line.chars().count() > 60 {
        format!("{}...", first_line.chars().take(60).collect::<String>())
    } else {
        first_line.to_string()
    }
}
