//! Token types for the template lexer.

use super::Span;

/// SQL keywords the parser makes structural decisions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Queries
    Select,
    From,
    Where,
    Order,
    By,
    Group,
    Having,
    Limit,
    Offset,
    Distinct,
    Union,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,

    // Data manipulation
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // Operators
    And,
    Or,
    Not,
    In,
    Between,
    Like,
    Is,
    Null,
    Exists,

    // Misc
    As,
    Case,
    When,
    Then,
    Else,
    End,
    Asc,
    Desc,
}

impl Keyword {
    /// Looks up a keyword (case-insensitive).
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Self::Select),
            "FROM" => Some(Self::From),
            "WHERE" => Some(Self::Where),
            "ORDER" => Some(Self::Order),
            "BY" => Some(Self::By),
            "GROUP" => Some(Self::Group),
            "HAVING" => Some(Self::Having),
            "LIMIT" => Some(Self::Limit),
            "OFFSET" => Some(Self::Offset),
            "DISTINCT" => Some(Self::Distinct),
            "UNION" => Some(Self::Union),
            "JOIN" => Some(Self::Join),
            "INNER" => Some(Self::Inner),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "FULL" => Some(Self::Full),
            "OUTER" => Some(Self::Outer),
            "CROSS" => Some(Self::Cross),
            "ON" => Some(Self::On),
            "INSERT" => Some(Self::Insert),
            "INTO" => Some(Self::Into),
            "VALUES" => Some(Self::Values),
            "UPDATE" => Some(Self::Update),
            "SET" => Some(Self::Set),
            "DELETE" => Some(Self::Delete),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            "IN" => Some(Self::In),
            "BETWEEN" => Some(Self::Between),
            "LIKE" => Some(Self::Like),
            "IS" => Some(Self::Is),
            "NULL" => Some(Self::Null),
            "EXISTS" => Some(Self::Exists),
            "AS" => Some(Self::As),
            "CASE" => Some(Self::Case),
            "WHEN" => Some(Self::When),
            "THEN" => Some(Self::Then),
            "ELSE" => Some(Self::Else),
            "END" => Some(Self::End),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Returns the canonical (upper case) spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Distinct => "DISTINCT",
            Self::Union => "UNION",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::Cross => "CROSS",
            Self::On => "ON",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::Exists => "EXISTS",
            Self::As => "AS",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Returns true if the keyword starts a clause that ends a table alias.
    #[must_use]
    pub const fn is_clause_start(&self) -> bool {
        matches!(
            self,
            Self::Where
                | Self::Order
                | Self::Group
                | Self::Having
                | Self::Limit
                | Self::Offset
                | Self::Union
                | Self::Join
                | Self::Inner
                | Self::Left
                | Self::Right
                | Self::Full
                | Self::Outer
                | Self::Cross
                | Self::On
                | Self::Set
                | Self::Values
                | Self::Select
        )
    }
}

/// Token kinds produced by the template lexer.
///
/// Every byte of the input belongs to exactly one token, so joining the
/// token texts reproduces the template.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A run of whitespace.
    Whitespace,
    /// `-- ...`, `// ...` or `/* ... */`.
    Comment,
    /// A SQL keyword.
    Keyword(Keyword),
    /// An unquoted identifier.
    Identifier(String),
    /// A `"quoted"` or `` `quoted` `` identifier (content without quotes).
    QuotedIdentifier(String),
    /// A numeric literal.
    Number,
    /// A `'string'` literal (raw content between the quotes).
    String(String),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `{` not followed by `?`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `*`
    Star,
    /// `=`
    Eq,
    /// Any other operator or punctuation.
    Operator,
    /// `:name`
    NamedParam(String),
    /// `#name#`
    SharpParam(String),
    /// `#{expr}`
    ExprPlaceholder(String),
    /// `$name$`
    Replacement(String),
    /// `${expr}`
    ExprReplacement(String),
    /// `?`
    Question,
    /// `{?`
    DynamicStart,
    /// `@if(cond)`
    AtIf(String),
    /// `@elseif(cond)`
    AtElseIf(String),
    /// `@else`
    AtElse,
    /// `@endif`
    AtEndIf,
    /// `@include(key)`
    AtInclude(String),
    /// `@name{content}` or `@name(content)`
    Tag {
        /// Tag name.
        name: String,
        /// Raw content between the delimiters.
        content: String,
        /// True for the `{..}` form.
        braced: bool,
    },
    /// A lexing error.
    Error(String),
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Returns true for whitespace and comments.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }
}

/// A token with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the template text.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns true if this is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.as_keyword() == Some(keyword)
    }
}
