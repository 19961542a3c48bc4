//! Template parser implementation.

use std::mem;
use std::sync::Arc;

use super::error::ParseError;
use crate::ast::{
    AstNode, ContainerKind, DynamicClause, ElseStatement, ExprParamPlaceholder,
    ExprParamReplacement, IfBody, IfClause, IfCondition, IfStatement, IncludeClause,
    ParamPlaceholder, ParamReplacement, ParamSyntax, Scope, SqlContainer, SqlObjectName,
    SqlTableName, SqlToken, Tag, Text,
};
use crate::context::SqlContext;
use crate::el::{Expression, ExpressionLanguage};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};
use crate::sql::{Sql, SqlType};

/// How much SQL structure the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseLevel {
    /// Only template syntax, everything else is literal text.
    Base,
    /// Template syntax plus keywords, names, table names and statement
    /// containers, so names can be mapped to columns.
    #[default]
    More,
}

/// Parses template text into [`Sql`].
pub struct Parser<'c> {
    ctx: &'c SqlContext,
    level: ParseLevel,
}

impl<'c> Parser<'c> {
    /// Creates a parser using the context's parse level.
    #[must_use]
    pub const fn new(ctx: &'c SqlContext) -> Self {
        Self {
            ctx,
            level: ctx.parse_level(),
        }
    }

    /// Overrides the parse level.
    #[must_use]
    pub const fn with_level(mut self, level: ParseLevel) -> Self {
        self.level = level;
        self
    }

    /// Parses one statement.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for malformed template syntax or an invalid
    /// expression.
    pub fn parse(&self, text: &str) -> Result<Sql, ParseError> {
        TemplateParser::new(text, self.ctx.expression_language(), self.level).parse()
    }

    /// Splits a script into statements on `;` outside of braces and
    /// parentheses. Statements are trimmed and empty ones dropped.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the script cannot be tokenized.
    pub fn split(&self, text: &str) -> Result<Vec<String>, ParseError> {
        let mut statements = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for token in Lexer::new(text).tokenize() {
            match token.kind {
                TokenKind::Error(message) => return Err(ParseError::new(message, token.span)),
                TokenKind::LeftBrace | TokenKind::DynamicStart | TokenKind::LeftParen => {
                    depth += 1;
                }
                TokenKind::RightBrace | TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Semicolon if depth == 0 => {
                    push_statement(&mut statements, &text[start..token.span.start]);
                    start = token.span.end;
                }
                TokenKind::Eof => push_statement(&mut statements, &text[start..]),
                _ => {}
            }
        }
        Ok(statements)
    }

    /// Splits a script and parses every statement.
    ///
    /// # Errors
    ///
    /// Returns the first `ParseError`.
    pub fn parse_all(&self, text: &str) -> Result<Vec<Sql>, ParseError> {
        self.split(text)?
            .iter()
            .map(|statement| self.parse(statement))
            .collect()
    }
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        statements.push(String::from(text));
    }
}

/// What ends a node list.
#[derive(Debug, Clone, Copy)]
enum Stop {
    /// End of input.
    Eof,
    /// `}` or `;` closing a dynamic clause opened at the span.
    Dynamic(Span),
    /// `}` closing a braced `@if` body opened at the span.
    Brace(Span),
    /// `@elseif`, `@else` or `@endif` ending a branch opened at the span.
    IfBody(Span),
    /// `)` closing a subquery.
    Paren,
}

/// Statement state tracked while parsing at the `More` level.
#[derive(Debug, Clone, Copy)]
struct SqlState {
    kind: ContainerKind,
    scope: Scope,
    expect_table: bool,
    columns_pending: bool,
}

impl SqlState {
    const fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            scope: Scope::Unknown,
            expect_table: false,
            columns_pending: false,
        }
    }

    fn on_keyword(&mut self, keyword: Keyword) {
        self.columns_pending = false;
        match keyword {
            Keyword::Select => {
                self.scope = Scope::SelectList;
                self.expect_table = false;
            }
            Keyword::From | Keyword::Join => {
                self.scope = Scope::From;
                self.expect_table = true;
            }
            Keyword::On | Keyword::Where | Keyword::Having => {
                self.scope = Scope::Where;
                self.expect_table = false;
            }
            Keyword::Group => self.scope = Scope::GroupBy,
            Keyword::Order => self.scope = Scope::OrderBy,
            Keyword::Set => {
                self.scope = Scope::Set;
                self.expect_table = false;
            }
            Keyword::Values => self.scope = Scope::Values,
            Keyword::Into | Keyword::Update | Keyword::Delete => self.expect_table = true,
            Keyword::Limit | Keyword::Offset | Keyword::Union => {
                self.scope = Scope::Unknown;
                self.expect_table = false;
            }
            _ => {}
        }
    }
}

/// Node list under construction, adjacent text is merged.
#[derive(Default)]
struct Nodes(Vec<AstNode>);

impl Nodes {
    fn text(&mut self, text: &str) {
        if let Some(AstNode::Text(last)) = self.0.last_mut() {
            last.append(text);
        } else {
            self.0.push(AstNode::Text(Text::new(text)));
        }
    }

    fn push(&mut self, node: AstNode) {
        self.0.push(node);
    }

    /// Removes and returns the whitespace ending the last text node.
    fn take_trailing_whitespace(&mut self) -> String {
        let Some(AstNode::Text(last)) = self.0.last() else {
            return String::new();
        };
        let text = last.as_str();
        let kept = text.trim_end();
        let trailing = String::from(&text[kept.len()..]);
        if kept.is_empty() {
            self.0.pop();
        } else {
            let kept = String::from(kept);
            if let Some(last) = self.0.last_mut() {
                *last = AstNode::text(kept);
            }
        }
        trailing
    }

    fn into_vec(self) -> Vec<AstNode> {
        self.0
    }
}

/// A possibly qualified name read from the token stream.
struct Name {
    raw: String,
    parts: Vec<String>,
    quoted: bool,
    star: bool,
}

struct TemplateParser<'t> {
    text: &'t str,
    tokens: Vec<Token>,
    eof: Token,
    pos: usize,
    el: &'t dyn ExpressionLanguage,
    level: ParseLevel,
    more: bool,
    state: SqlState,
}

impl<'t> TemplateParser<'t> {
    fn new(text: &'t str, el: &'t dyn ExpressionLanguage, level: ParseLevel) -> Self {
        let tokens = Lexer::new(text).tokenize();
        Self {
            text,
            tokens,
            eof: Token::new(TokenKind::Eof, Span::new(text.len(), text.len())),
            pos: 0,
            el,
            level,
            more: false,
            state: SqlState::new(ContainerKind::Select),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_at(&self, pos: usize) -> &Token {
        self.tokens.get(pos).unwrap_or(&self.eof)
    }

    fn slice(&self, span: Span) -> &'t str {
        span.slice(self.text)
    }

    /// Index of the first non-trivia token at or after `pos`.
    fn skip_trivia(&self, mut pos: usize) -> usize {
        while self.peek_at(pos).kind.is_trivia() {
            pos += 1;
        }
        pos
    }

    fn compile(&self, source: &str, span: Span) -> Result<Arc<dyn Expression>, ParseError> {
        self.el
            .compile(source)
            .map_err(|err| ParseError::new(format!("Invalid expression: {err}"), span))
    }

    fn scope(&self) -> Scope {
        if self.more {
            self.state.scope
        } else {
            Scope::Unknown
        }
    }

    fn parse(mut self) -> Result<Sql, ParseError> {
        let mut nodes = Nodes::default();
        while self.peek().kind.is_trivia() {
            let span = self.peek().span;
            nodes.text(self.slice(span));
            self.pos += 1;
        }
        let kind = match self.peek().as_keyword() {
            Some(Keyword::Select) => Some(ContainerKind::Select),
            Some(Keyword::Insert) => Some(ContainerKind::Insert),
            Some(Keyword::Update) => Some(ContainerKind::Update),
            Some(Keyword::Delete) => Some(ContainerKind::Delete),
            _ => None,
        };
        let sql_type = kind.map_or(SqlType::Unresolved, SqlType::from);
        match kind {
            Some(kind) if self.level == ParseLevel::More => {
                self.more = true;
                self.state = SqlState::new(kind);
                let inner = self.parse_nodes(Stop::Eof)?;
                nodes.push(AstNode::Container(SqlContainer::new(kind, inner)));
            }
            _ => {
                for node in self.parse_nodes(Stop::Eof)? {
                    match node {
                        AstNode::Text(text) => nodes.text(text.as_str()),
                        other => nodes.push(other),
                    }
                }
            }
        }
        Ok(Sql::new(sql_type, nodes.into_vec()))
    }

    #[allow(clippy::too_many_lines)]
    fn parse_nodes(&mut self, stop: Stop) -> Result<Vec<AstNode>, ParseError> {
        let mut nodes = Nodes::default();
        let mut braces = 0usize;
        let mut parens = 0usize;
        let mut columns_depth: Option<usize> = None;

        loop {
            let token = self.peek().clone();
            let raw = self.slice(token.span);
            match token.kind {
                TokenKind::Eof => {
                    return match stop {
                        Stop::Eof | Stop::Paren => Ok(nodes.into_vec()),
                        Stop::Dynamic(span) => {
                            Err(ParseError::unexpected_eof("'}' closing '{?'", span))
                        }
                        Stop::Brace(span) => {
                            Err(ParseError::unexpected_eof("'}' closing '@if' body", span))
                        }
                        Stop::IfBody(span) => Err(ParseError::unexpected_eof("@endif", span)),
                    };
                }
                TokenKind::Error(message) => return Err(ParseError::new(message, token.span)),
                TokenKind::RightBrace
                    if braces == 0 && matches!(stop, Stop::Dynamic(_) | Stop::Brace(_)) =>
                {
                    return Ok(nodes.into_vec());
                }
                TokenKind::Semicolon
                    if braces == 0 && parens == 0 && matches!(stop, Stop::Dynamic(_)) =>
                {
                    return Ok(nodes.into_vec());
                }
                TokenKind::RightParen if parens == 0 && matches!(stop, Stop::Paren) => {
                    return Ok(nodes.into_vec());
                }
                TokenKind::AtElseIf(_) | TokenKind::AtElse | TokenKind::AtEndIf => {
                    if matches!(stop, Stop::IfBody(_)) {
                        return Ok(nodes.into_vec());
                    }
                    return Err(ParseError::new(
                        format!("'{}' without a matching '@if'", raw.trim()),
                        token.span,
                    ));
                }
                TokenKind::LeftBrace => {
                    braces += 1;
                    nodes.text(raw);
                    self.pos += 1;
                }
                TokenKind::RightBrace => {
                    braces = braces.saturating_sub(1);
                    nodes.text(raw);
                    self.pos += 1;
                }
                TokenKind::LeftParen => {
                    self.pos += 1;
                    nodes.text(raw);
                    let next = self.skip_trivia(self.pos);
                    if self.more && self.peek_at(next).is_keyword(Keyword::Select) {
                        self.parse_subquery(&mut nodes)?;
                    } else if self.more && self.state.columns_pending {
                        self.state.columns_pending = false;
                        self.state.scope = Scope::Columns;
                        columns_depth = Some(parens);
                    }
                    parens += 1;
                }
                TokenKind::RightParen => {
                    parens = parens.saturating_sub(1);
                    if columns_depth == Some(parens) {
                        columns_depth = None;
                        self.state.scope = Scope::Unknown;
                    }
                    nodes.text(raw);
                    self.pos += 1;
                }
                TokenKind::Comma => {
                    if self.more && self.state.scope == Scope::From {
                        self.state.expect_table = true;
                    }
                    nodes.text(raw);
                    self.pos += 1;
                }
                TokenKind::String(_) => {
                    self.parse_string(&mut nodes, raw, token.span)?;
                    self.pos += 1;
                }
                TokenKind::Keyword(keyword) if self.more => {
                    self.state.on_keyword(keyword);
                    nodes.push(AstNode::Token(SqlToken::new(keyword, raw)));
                    self.pos += 1;
                }
                TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) if self.more => {
                    self.parse_name(&mut nodes);
                }
                TokenKind::NamedParam(name) => {
                    let param = ParamPlaceholder::new(name, ParamSyntax::Colon, self.scope());
                    nodes.push(AstNode::Placeholder(param));
                    self.pos += 1;
                }
                TokenKind::SharpParam(name) => {
                    let param = ParamPlaceholder::new(name, ParamSyntax::Sharp, self.scope());
                    nodes.push(AstNode::Placeholder(param));
                    self.pos += 1;
                }
                TokenKind::Replacement(name) => {
                    nodes.push(AstNode::Replacement(ParamReplacement::new(name, self.scope())));
                    self.pos += 1;
                }
                TokenKind::ExprPlaceholder(source) => {
                    let expr = self.compile(&source, token.span)?;
                    let param = ExprParamPlaceholder::new(expr, self.scope());
                    nodes.push(AstNode::ExprPlaceholder(param));
                    self.pos += 1;
                }
                TokenKind::ExprReplacement(source) => {
                    let expr = self.compile(&source, token.span)?;
                    let param = ExprParamReplacement::new(expr, self.scope());
                    nodes.push(AstNode::ExprReplacement(param));
                    self.pos += 1;
                }
                TokenKind::Question => {
                    nodes.push(AstNode::JdbcPlaceholder);
                    self.pos += 1;
                }
                TokenKind::DynamicStart => {
                    self.pos += 1;
                    let leading = nodes.take_trailing_whitespace();
                    let clause = self.parse_dynamic(token.span)?.with_leading(leading);
                    nodes.push(AstNode::Dynamic(clause));
                }
                TokenKind::AtIf(_) => {
                    let clause = self.parse_if()?;
                    nodes.push(AstNode::If(clause));
                }
                TokenKind::AtInclude(key) => {
                    nodes.push(AstNode::Include(IncludeClause::new(key, raw)));
                    self.pos += 1;
                }
                TokenKind::Tag {
                    name,
                    content,
                    braced,
                } => {
                    nodes.push(AstNode::Tag(Tag::new(name, content, braced)));
                    self.pos += 1;
                }
                _ => {
                    nodes.text(raw);
                    self.pos += 1;
                }
            }
        }
    }

    /// Parses `( select .. )` after the `(`, leaving the `)` to the caller.
    fn parse_subquery(&mut self, nodes: &mut Nodes) -> Result<(), ParseError> {
        while self.peek().kind.is_trivia() {
            let span = self.peek().span;
            nodes.text(self.slice(span));
            self.pos += 1;
        }
        let outer = mem::replace(&mut self.state, SqlState::new(ContainerKind::Select));
        let inner = self.parse_nodes(Stop::Paren);
        self.state = outer;
        // a derived table is followed by its alias, not a table name
        self.state.expect_table = false;
        nodes.push(AstNode::Container(SqlContainer::new(ContainerKind::Select, inner?)));
        Ok(())
    }

    /// Splits a string literal into text and `$name$` / `${expr}`
    /// replacements. `$$` stays literal.
    fn parse_string(&self, nodes: &mut Nodes, raw: &str, span: Span) -> Result<(), ParseError> {
        let mut rest = raw;
        while let Some(at) = rest.find('$') {
            let (before, after) = rest.split_at(at);
            nodes.text(before);
            let body = &after[1..];
            if let Some(literal) = body.strip_prefix('$') {
                nodes.text("$$");
                rest = literal;
            } else if let Some(expr) = body.strip_prefix('{') {
                let Some(end) = expr.find('}') else {
                    return Err(ParseError::new("Unclosed expression in string", span));
                };
                let source = &expr[..end];
                if source.trim().is_empty() {
                    return Err(ParseError::new("Empty expression not allowed", span));
                }
                let expr_node = self.compile(source, span)?;
                nodes.push(AstNode::ExprReplacement(ExprParamReplacement::new(
                    expr_node,
                    Scope::String,
                )));
                rest = &expr[end + 1..];
            } else {
                let len = param_name_len(body);
                if len > 0 && body[len..].starts_with('$') {
                    nodes.push(AstNode::Replacement(ParamReplacement::new(
                        &body[..len],
                        Scope::String,
                    )));
                    rest = &body[len + 1..];
                } else {
                    nodes.text("$");
                    rest = body;
                }
            }
        }
        nodes.text(rest);
        Ok(())
    }

    fn read_name(&mut self) -> Name {
        let first = self.peek().clone();
        let mut parts = Vec::new();
        let mut quoted = false;
        let mut star = false;
        match &first.kind {
            TokenKind::QuotedIdentifier(name) => {
                parts.push(name.clone());
                quoted = true;
            }
            TokenKind::Identifier(name) => parts.push(name.clone()),
            _ => parts.push(String::from(self.slice(first.span))),
        }
        let mut end = first.span.end;
        self.pos += 1;
        while matches!(self.peek().kind, TokenKind::Dot) {
            let next = self.peek_at(self.pos + 1).clone();
            match &next.kind {
                TokenKind::Identifier(name) => {
                    parts.push(name.clone());
                    quoted = false;
                }
                TokenKind::QuotedIdentifier(name) => {
                    parts.push(name.clone());
                    quoted = true;
                }
                TokenKind::Keyword(_) => {
                    parts.push(String::from(self.slice(next.span)));
                    quoted = false;
                }
                TokenKind::Star => {
                    star = true;
                }
                _ => break,
            }
            end = next.span.end;
            self.pos += 2;
            if star {
                break;
            }
        }
        Name {
            raw: String::from(self.slice(Span::new(first.span.start, end))),
            parts,
            quoted,
            star,
        }
    }

    /// Parses a name into an object name, a table name with its alias, or
    /// plain text for function calls and `t.*`.
    fn parse_name(&mut self, nodes: &mut Nodes) {
        let name = self.read_name();
        let is_call = !name.quoted && matches!(self.peek().kind, TokenKind::LeftParen);
        if name.star || is_call {
            nodes.text(&name.raw);
            return;
        }
        if !self.state.expect_table {
            nodes.push(AstNode::ObjectName(SqlObjectName::new(
                name.raw,
                name.parts,
                name.quoted,
                self.state.scope,
            )));
            return;
        }
        self.state.expect_table = false;
        self.state.columns_pending = self.state.kind == ContainerKind::Insert
            && self.state.scope != Scope::From;
        let mut table = SqlTableName::new(name.raw, name.parts, name.quoted);

        let mark = self.pos;
        let mut pos = self.skip_trivia(mark);
        if self.peek_at(pos).is_keyword(Keyword::As) {
            pos = self.skip_trivia(pos + 1);
        }
        let alias_token = self.peek_at(pos).clone();
        let consumed = match &alias_token.kind {
            TokenKind::Identifier(alias) | TokenKind::QuotedIdentifier(alias) => {
                table = table.with_alias(alias.as_str());
                self.pos = pos + 1;
                Some(Span::new(self.peek_at(mark).span.start, alias_token.span.end))
            }
            _ => None,
        };
        nodes.push(AstNode::TableName(table));
        if let Some(span) = consumed {
            nodes.text(self.slice(span));
        }
    }

    /// Parses a dynamic clause after `{?`.
    fn parse_dynamic(&mut self, start: Span) -> Result<DynamicClause, ParseError> {
        let body = self.parse_nodes(Stop::Dynamic(start))?;
        let mut options = None;
        if matches!(self.peek().kind, TokenKind::Semicolon) {
            let from = self.peek().span.end;
            self.pos += 1;
            loop {
                let token = self.peek().clone();
                match token.kind {
                    TokenKind::RightBrace => {
                        let span = Span::new(from, token.span.start);
                        options = Some(String::from(self.slice(span)));
                        break;
                    }
                    TokenKind::Eof => {
                        return Err(ParseError::unexpected_eof("'}' closing '{?'", start));
                    }
                    _ => self.pos += 1,
                }
            }
        }
        // the closing brace
        self.pos += 1;
        Ok(DynamicClause::new(body, options))
    }

    /// Parses `@if .. @endif`, the current token being `@if(..)`.
    fn parse_if(&mut self) -> Result<IfClause, ParseError> {
        let start = self.peek().span;
        let mut branches = Vec::new();
        let mut else_branch = None;
        loop {
            let token = self.peek().clone();
            let head = self.slice(token.span);
            match token.kind {
                TokenKind::AtIf(source) | TokenKind::AtElseIf(source) => {
                    let condition = IfCondition::new(self.compile(&source, token.span)?);
                    self.pos += 1;
                    let body = self.parse_if_body(token.span)?;
                    branches.push(IfStatement::new(head, condition, body));
                }
                TokenKind::AtElse if else_branch.is_none() => {
                    self.pos += 1;
                    let body = self.parse_if_body(token.span)?;
                    else_branch = Some(ElseStatement::new(head, body));
                }
                TokenKind::AtEndIf => {
                    self.pos += 1;
                    return Ok(IfClause::new(branches, else_branch, head));
                }
                TokenKind::Eof => return Err(ParseError::unexpected_eof("@endif", start)),
                _ => {
                    return Err(ParseError::unexpected("@endif", head, token.span));
                }
            }
        }
    }

    fn parse_if_body(&mut self, head: Span) -> Result<IfBody, ParseError> {
        if !matches!(self.peek().kind, TokenKind::LeftBrace) {
            let nodes = self.parse_nodes(Stop::IfBody(head))?;
            return Ok(IfBody::new("", nodes, ""));
        }
        self.pos += 1;
        let nodes = self.parse_nodes(Stop::Brace(head))?;
        // the closing brace, with whitespace up to the next directive
        let close_start = self.peek().span.start;
        self.pos += 1;
        let next = self.skip_trivia(self.pos);
        if matches!(
            self.peek_at(next).kind,
            TokenKind::AtElseIf(_) | TokenKind::AtElse | TokenKind::AtEndIf
        ) {
            self.pos = next;
        }
        let close_end = self.peek_at(self.pos).span.start;
        let close = self.slice(Span::new(close_start, close_end));
        Ok(IfBody::new("{", nodes, close))
    }
}

/// Length of a parameter name at the start of `text`, dots allowed between
/// segments.
fn param_name_len(text: &str) -> usize {
    let mut len = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let valid = c.is_alphanumeric()
            || c == '_'
            || (c == '.' && i > 0 && chars.peek().is_some_and(|(_, n)| n.is_alphabetic()));
        if !valid || (i == 0 && c.is_ascii_digit()) {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}
