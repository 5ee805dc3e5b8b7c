//! Token buffer the translator renders into.
//!
//! Keywords and punctuation have fixed text; identifiers, literals and
//! function names are formatted by the target dialect when the stream is
//! serialized.

use super::dialect::{Dialect, SqlDialect};

/// One lexical element of rendered SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Limit,
    Offset,
    Fetch,
    Next,
    Rows,
    Only,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    Like,
    Escape,
    Is,
    IsNull,
    IsNotNull,
    Distinct,
    All,
    Union,
    Intersect,
    Except,
    With,
    Exists,
    Collate,
    Null,

    // === DML Keywords ===
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Qualified identifier: schema.table or just table
    QualifiedIdent {
        schema: Option<String>,
        name: String,
    },
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Boolean literal
    LitBool(bool),
    /// Date literal (`YYYY-MM-DD`)
    LitDate(String),
    /// NULL literal
    LitNull,

    /// Positional JDBC parameter marker.
    Parameter,

    // === Function Names ===
    /// Function name, remapped per dialect.
    FunctionName(String),

    /// Trusted fragment written verbatim: pattern literals, lock clauses,
    /// dialect placeholders. Values are always bound, never raw.
    Raw(String),
}

impl Token {
    /// Fixed text of keywords, operators and punctuation; `None` for tokens
    /// whose text depends on the dialect or on a payload.
    fn fixed_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::As => "AS",
            Token::On => "ON",
            Token::Join => "JOIN",
            Token::Inner => "INNER",
            Token::Left => "LEFT",
            Token::Right => "RIGHT",
            Token::Full => "FULL",
            Token::Outer => "OUTER",
            Token::Cross => "CROSS",
            Token::GroupBy => "GROUP BY",
            Token::Having => "HAVING",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::NullsFirst => "NULLS FIRST",
            Token::NullsLast => "NULLS LAST",
            Token::Limit => "LIMIT",
            Token::Offset => "OFFSET",
            Token::Fetch => "FETCH",
            Token::Next => "NEXT",
            Token::Rows => "ROWS",
            Token::Only => "ONLY",
            Token::Case => "CASE",
            Token::When => "WHEN",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::End => "END",
            Token::In => "IN",
            Token::Between => "BETWEEN",
            Token::Like => "LIKE",
            Token::Escape => "ESCAPE",
            Token::Is => "IS",
            Token::IsNull => "IS NULL",
            Token::IsNotNull => "IS NOT NULL",
            Token::Distinct => "DISTINCT",
            Token::All => "ALL",
            Token::Union => "UNION",
            Token::Intersect => "INTERSECT",
            Token::Except => "EXCEPT",
            Token::With => "WITH",
            Token::Exists => "EXISTS",
            Token::Collate => "COLLATE",
            Token::Null | Token::LitNull => "NULL",
            Token::Insert => "INSERT",
            Token::Into => "INTO",
            Token::Values => "VALUES",
            Token::Update => "UPDATE",
            Token::Set => "SET",
            Token::Delete => "DELETE",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Star | Token::Mul => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Lte => "<=",
            Token::Gte => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Space => " ",
            Token::Parameter => "?",
            _ => return None,
        };
        Some(text)
    }

    /// Append this token's text for `dialect` to `out`.
    ///
    /// Float literals are written as-is; the translator rejects non-finite
    /// values before they become tokens.
    pub fn write_to(&self, dialect: Dialect, out: &mut String) {
        if let Some(text) = self.fixed_text() {
            out.push_str(text);
            return;
        }
        match self {
            Token::Ident(name) => out.push_str(&dialect.quote_identifier(name)),
            Token::QualifiedIdent { schema, name } => {
                if let Some(schema) = schema {
                    out.push_str(&dialect.quote_identifier(schema));
                    out.push('.');
                }
                out.push_str(&dialect.quote_identifier(name));
            }
            Token::LitInt(n) => out.push_str(&n.to_string()),
            Token::LitFloat(f) => out.push_str(ryu::Buffer::new().format(*f)),
            Token::LitString(s) => out.push_str(&dialect.quote_string(s)),
            Token::LitBool(b) => out.push_str(dialect.format_bool(*b)),
            Token::LitDate(d) => out.push_str(&dialect.format_date_literal(d)),
            Token::FunctionName(name) => {
                let name: &str = match dialect.remap_function(name) {
                    Some(remapped) => remapped,
                    None => name,
                };
                out.push_str(&name.to_uppercase());
            }
            Token::Raw(sql) => out.push_str(sql),
            _ => {}
        }
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_to(dialect, &mut out);
        out
    }
}

/// Ordered tokens of one statement, serialized once the translator is done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Parameter markers emitted so far; the next marker takes this position.
    pub fn parameter_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| **token == Token::Parameter)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        let mut out = String::with_capacity(self.tokens.len() * 6);
        for token in &self.tokens {
            token.write_to(dialect, &mut out);
        }
        out
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }

    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }

    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }

    pub fn raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.push(Token::Raw(sql.into()))
    }
}
