use std::{collections::BTreeSet, rc::Rc};

use tracing::{debug, info};

use crate::{
    arith::{ArithError, ArithExpr, Bindings},
    ast::{
        ChannelDecl, ChannelExpr, CommunicationExpr, ConExpr, Decl, DeclKind, Expr, ExprList,
        ForEachExpr, GlobalTypeDecl, IndexDecl, IndexExpr, IterExpr, LabelDecl, ParticipantDecl,
        ParticipantExpr, RecExpr, UNBOUNDED,
    },
    lexer::{self, extract},
    symbol_table::SymbolTable,
    token::{Keyword, Span, Spanned, Symbol, Token, TokenKind},
};

pub type ParseError = Spanned<Error>;

type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Lexes and parses a choreography, returning its declarations.
///
/// Parsing stops at the first error.
pub fn parse_choreography(src: &str, tokens: &mut Vec<Token>) -> Result<SymbolTable> {
    assert!(tokens.is_empty());
    lexer::lex(src, tokens);
    let table = Parser::new(src, tokens).parse_choreography()?;
    info!(declarations = table.len(), "parsed choreography");
    Ok(table)
}

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    table: SymbolTable,
    /// Names bound by the enclosing `foreach` and `Rec` constructs.
    scopes: Vec<Scope>,
}

enum Scope {
    Iter(Rc<str>),
    Rec(Rc<str>),
}

impl Scope {
    fn name(&self) -> &str {
        match self {
            Scope::Iter(name) | Scope::Rec(name) => name,
        }
    }
}

#[derive(Copy, Clone)]
enum Terminator {
    End,
    RBrace,
}

impl Terminator {
    fn kind(self) -> TokenKind {
        match self {
            Terminator::End => TokenKind::Keyword(Keyword::End),
            Terminator::RBrace => TokenKind::Symbol(Symbol::RBrace),
        }
    }

    fn expected_after_expr(self) -> &'static str {
        match self {
            Terminator::End => "`.` or `end`",
            Terminator::RBrace => "`.` or `}`",
        }
    }
}

impl Parser<'_, '_> {
    fn parse_choreography(mut self) -> Result<SymbolTable> {
        loop {
            let token = self.peek();
            let decl = match token.kind {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Index) => self.parse_index_decl()?,
                TokenKind::Keyword(Keyword::Participant) => self.parse_participant_decl()?,
                TokenKind::Keyword(Keyword::Channel) => self.parse_channel_decl()?,
                TokenKind::Keyword(Keyword::Label) => self.parse_label_decl()?,
                TokenKind::Identifier => self.parse_global_type_decl()?,
                _ => return Err(self.unexpected(token, "a declaration")),
            };
            self.declare(decl)?;
            // Declarations may be separated by dots.
            self.take(TokenKind::Symbol(Symbol::Dot));
        }
        Ok(self.table)
    }

    fn parse_index_decl(&mut self) -> Result<Spanned<Decl>> {
        self.advance();
        let name = self.parse_ident("an index name")?;
        self.consume_symbol(Symbol::LBrace)?;
        let lower = self.parse_bound()?;
        self.parse_range_dots()?;
        let upper = self.parse_bound()?;
        self.consume_symbol(Symbol::RBrace)?;

        let lower = match lower.inner {
            extract::Literal::Number(lower) => lower,
            extract::Literal::Unbounded => {
                return Err(lower.span.wrap(
                    SyntaxError::UnboundedLowerBound {
                        index: Rc::clone(&name.inner),
                    }
                    .into(),
                ));
            }
        };
        let upper = match upper.inner {
            extract::Literal::Number(upper) => upper,
            extract::Literal::Unbounded => UNBOUNDED,
        };
        if lower > upper {
            return Err(name.span.wrap(
                SyntaxError::InvertedBounds {
                    index: Rc::clone(&name.inner),
                    lower,
                    upper,
                }
                .into(),
            ));
        }

        let decl = IndexDecl {
            name: name.inner,
            lower,
            upper,
        };
        Ok(name.span.wrap(Decl::Index(Rc::new(decl))))
    }

    fn parse_participant_decl(&mut self) -> Result<Spanned<Decl>> {
        self.advance();
        let name = self.parse_ident("a participant name")?;
        let index = self.parse_index_ref()?;
        let decl = ParticipantDecl {
            name: name.inner,
            index,
        };
        Ok(name.span.wrap(Decl::Participant(Rc::new(decl))))
    }

    fn parse_channel_decl(&mut self) -> Result<Spanned<Decl>> {
        self.advance();
        let name = self.parse_ident("a channel name")?;
        let index = self.parse_index_ref()?;
        let decl = ChannelDecl {
            name: name.inner,
            index,
        };
        Ok(name.span.wrap(Decl::Channel(Rc::new(decl))))
    }

    fn parse_label_decl(&mut self) -> Result<Spanned<Decl>> {
        self.advance();
        let name = self.parse_ident("a label set name")?;
        self.consume_symbol(Symbol::LBrace)?;
        let mut labels = BTreeSet::new();
        while !self.is(TokenKind::Symbol(Symbol::RBrace)) {
            labels.insert(self.parse_ident("a label or `}`")?.inner);
        }
        self.advance();
        let decl = LabelDecl {
            name: name.inner,
            labels,
        };
        Ok(name.span.wrap(Decl::Label(Rc::new(decl))))
    }

    fn parse_global_type_decl(&mut self) -> Result<Spanned<Decl>> {
        let name = self.parse_ident("a global type name")?;
        self.consume_symbol(Symbol::Eq)?;
        let body = self.parse_expr_list(Terminator::End)?;
        self.consume(TokenKind::Keyword(Keyword::End), "`end`")?;
        let decl = GlobalTypeDecl {
            name: name.inner,
            body,
        };
        Ok(name.span.wrap(Decl::GlobalType(Rc::new(decl))))
    }

    /// Parses the `{ I | 1 }` part of participant and channel declarations.
    fn parse_index_ref(&mut self) -> Result<Rc<IndexDecl>> {
        self.consume_symbol(Symbol::LBrace)?;
        let token = self.advance();
        let index = match token.kind {
            TokenKind::Identifier => self.resolve_index(token)?,
            TokenKind::Literal => match self.literal(token)? {
                extract::Literal::Number(1) => Rc::clone(self.table.unary_index()),
                _ => {
                    let found = extract::describe(token, self.src);
                    return Err(token.span().wrap(SyntaxError::NonUnitLiteral { found }.into()));
                }
            },
            _ => return Err(self.unexpected(token, "an index name or `1`")),
        };
        self.consume_symbol(Symbol::RBrace)?;
        Ok(index)
    }

    fn parse_bound(&mut self) -> Result<Spanned<extract::Literal>> {
        let token = self.consume(TokenKind::Literal, "a bound literal or `n`")?;
        let literal = self.literal(token)?;
        Ok(token.span().wrap(literal))
    }

    /// Parses `..`, which is lexed as two adjacent dots.
    fn parse_range_dots(&mut self) -> Result<()> {
        let first = self.consume(TokenKind::Symbol(Symbol::Dot), "`..`")?;
        let second = self.peek();
        if second.kind != TokenKind::Symbol(Symbol::Dot) || second.span().lo != first.span().hi() {
            return Err(self.unexpected(second, "`..`"));
        }
        self.advance();
        Ok(())
    }

    fn parse_expr_list(&mut self, terminator: Terminator) -> Result<ExprList> {
        let mut exprs = Vec::new();
        loop {
            while self.take(TokenKind::Symbol(Symbol::Dot)) {}
            if self.is(terminator.kind()) {
                break;
            }
            exprs.push(self.parse_expr()?);
            let next = self.peek();
            if next.kind != TokenKind::Symbol(Symbol::Dot) && next.kind != terminator.kind() {
                return Err(self.unexpected(next, terminator.expected_after_expr()));
            }
        }
        Ok(ExprList { exprs })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Keyword(Keyword::Foreach) => self.parse_for_each().map(Expr::ForEach),
            TokenKind::Keyword(Keyword::Rec) => self.parse_rec().map(Expr::Rec),
            TokenKind::Identifier if self.is_rec_var(token.text(self.src)) => {
                self.advance();
                let var = extract::ident(token, self.src);
                Ok(Expr::Con(ConExpr {
                    var,
                    span: token.span(),
                }))
            }
            TokenKind::Identifier => {
                let decl = self.resolve(token)?.clone();
                match decl {
                    Decl::Participant(_) => self.parse_communication().map(Expr::Communication),
                    Decl::GlobalType(global) => {
                        self.advance();
                        Ok(Expr::Splice(global))
                    }
                    other => Err(wrong_kind(token.span(), &other, DeclKind::Participant)),
                }
            }
            _ => Err(self.unexpected(token, "a communication, `foreach`, `Rec` or a global type")),
        }
    }

    fn parse_communication(&mut self) -> Result<CommunicationExpr> {
        let lo = self.peek().span();
        let sender = self.parse_participant_expr()?;
        self.consume_symbol(Symbol::Arrow)?;
        let receiver = self.parse_participant_expr()?;
        self.consume_symbol(Symbol::Colon)?;
        let channel = self.parse_channel_expr()?;
        self.consume_symbol(Symbol::Less)?;
        let data_type = self.parse_ident("a data type name")?.inner;
        let hi = self.consume_symbol(Symbol::Greater)?.span();
        debug!(%data_type, sender = %sender.decl.name, receiver = %receiver.decl.name, "parsed communication");
        Ok(CommunicationExpr {
            sender,
            receiver,
            channel,
            data_type,
            span: lo.to(hi),
        })
    }

    fn parse_participant_expr(&mut self) -> Result<ParticipantExpr> {
        let token = self.consume(TokenKind::Identifier, "a participant name")?;
        let decl = match self.resolve(token)? {
            Decl::Participant(decl) => Rc::clone(decl),
            other => return Err(wrong_kind(token.span(), other, DeclKind::Participant)),
        };
        let index = self.parse_index_suffix(token, &decl.name, &decl.index)?;
        Ok(ParticipantExpr { decl, index })
    }

    fn parse_channel_expr(&mut self) -> Result<ChannelExpr> {
        let token = self.consume(TokenKind::Identifier, "a channel name")?;
        let decl = match self.resolve(token)? {
            Decl::Channel(decl) => Rc::clone(decl),
            other => return Err(wrong_kind(token.span(), other, DeclKind::Channel)),
        };
        let index = self.parse_index_suffix(token, &decl.name, &decl.index)?;
        Ok(ChannelExpr { decl, index })
    }

    /// Parses the optional `[expr]` after a participant or channel name.
    ///
    /// The brackets may only be omitted for entities whose index has a single
    /// value. Closed expressions are evaluated and range checked here, the
    /// rest is left to projection.
    fn parse_index_suffix(
        &mut self,
        entity: Token,
        name: &Rc<str>,
        base: &Rc<IndexDecl>,
    ) -> Result<IndexExpr> {
        if !self.is(TokenKind::Symbol(Symbol::LBracket)) {
            if base.is_singleton() {
                return Ok(IndexExpr {
                    base: Rc::clone(base),
                    value: ArithExpr::Literal(base.lower),
                    is_literal: true,
                });
            }
            return Err(entity.span().wrap(
                ResolutionError::MissingIndex {
                    name: Rc::clone(name),
                    index: Rc::clone(&base.name),
                }
                .into(),
            ));
        }
        let open = self.advance().span();
        let value = self.parse_arith(name, base)?;
        let close = self.consume_symbol(Symbol::RBracket)?.span();
        let span = open.to(close);

        let is_literal = value.is_closed();
        if is_literal {
            let evaluated = value
                .eval(&Bindings::new())
                .map_err(|error| span.wrap(SyntaxError::from(error).into()))?;
            if !base.contains(evaluated) {
                return Err(span.wrap(
                    SyntaxError::IndexOutOfBounds {
                        value: evaluated,
                        index: base.to_string().into(),
                    }
                    .into(),
                ));
            }
        }
        Ok(IndexExpr {
            base: Rc::clone(base),
            value,
            is_literal,
        })
    }

    fn parse_arith(&mut self, entity: &Rc<str>, base: &Rc<IndexDecl>) -> Result<ArithExpr> {
        let mut lhs = self.parse_arith_primary(entity, base)?;
        loop {
            let op = self.peek();
            lhs = match op.kind {
                TokenKind::Symbol(Symbol::Plus) => {
                    self.advance();
                    let rhs = self.parse_arith_primary(entity, base)?;
                    ArithExpr::Add(Box::new(lhs), Box::new(rhs))
                }
                TokenKind::Symbol(Symbol::Minus) => {
                    self.advance();
                    let rhs = self.parse_arith_primary(entity, base)?;
                    ArithExpr::Sub(Box::new(lhs), Box::new(rhs))
                }
                _ => break Ok(lhs),
            };
        }
    }

    fn parse_arith_primary(&mut self, entity: &Rc<str>, base: &Rc<IndexDecl>) -> Result<ArithExpr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Literal => match self.literal(token)? {
                extract::Literal::Number(value) => Ok(ArithExpr::Literal(value)),
                extract::Literal::Unbounded => {
                    Err(token.span().wrap(SyntaxError::UnboundedInIndexExpr.into()))
                }
            },
            TokenKind::Identifier => Ok(ArithExpr::Identifier(extract::ident(token, self.src))),
            TokenKind::Symbol(Symbol::LParen) => {
                let inner = self.parse_arith(entity, base)?;
                self.consume_symbol(Symbol::RParen)?;
                Ok(inner)
            }
            TokenKind::Keyword(keyword @ (Keyword::Min | Keyword::Max)) => {
                let index = self.parse_bound_call(keyword, Some((entity, base)))?;
                Ok(match keyword {
                    Keyword::Min => ArithExpr::Min(index),
                    _ => ArithExpr::Max(index),
                })
            }
            _ => Err(self.unexpected(token, "an index expression")),
        }
    }

    /// Parses the `(I)` part of `min(I)` and `max(I)`. When `expected` is
    /// provided, `I` must be the index of that entity.
    fn parse_bound_call(
        &mut self,
        keyword: Keyword,
        expected: Option<(&Rc<str>, &Rc<IndexDecl>)>,
    ) -> Result<Rc<IndexDecl>> {
        self.consume_symbol(Symbol::LParen)?;
        let token = self.consume(TokenKind::Identifier, "an index name")?;
        let index = self.resolve_index(token)?;
        self.consume_symbol(Symbol::RParen)?;

        if let Some((entity, base)) = expected {
            if !Rc::ptr_eq(&index, base) {
                return Err(token.span().wrap(
                    ResolutionError::UnrelatedIndex {
                        entity: Rc::clone(entity),
                        expected: Rc::clone(&base.name),
                        found: Rc::clone(&index.name),
                    }
                    .into(),
                ));
            }
        }
        if keyword == Keyword::Max && index.is_unbounded() {
            return Err(token.span().wrap(
                ResolutionError::UnboundedMax {
                    index: Rc::clone(&index.name),
                }
                .into(),
            ));
        }
        Ok(index)
    }

    fn parse_for_each(&mut self) -> Result<ForEachExpr> {
        let lo = self.advance().span();
        self.consume_symbol(Symbol::LParen)?;
        let iter = self.parse_iter()?;
        self.consume_symbol(Symbol::RParen)?;
        self.consume_symbol(Symbol::LBrace)?;

        self.scopes.push(Scope::Iter(Rc::clone(&iter.bound)));
        let body = self.parse_expr_list(Terminator::RBrace);
        self.scopes.pop();
        let body = body?;

        let hi = self.consume_symbol(Symbol::RBrace)?.span();
        Ok(ForEachExpr {
            iter,
            body,
            span: lo.to(hi),
        })
    }

    fn parse_iter(&mut self) -> Result<IterExpr> {
        let bound_token = self.consume(TokenKind::Identifier, "an iteration identifier")?;
        let bound = self.bind_name(bound_token)?;
        let op = self.advance();
        let (base, min, max) = match op.kind {
            TokenKind::Symbol(Symbol::Colon) => {
                let token = self.consume(TokenKind::Identifier, "an index name")?;
                let base = self.resolve_index(token)?;
                let (min, max) = (base.lower, base.upper);
                (base, Some(min), Some(max))
            }
            TokenKind::Symbol(Symbol::Less) => {
                self.consume(TokenKind::Keyword(Keyword::Max), "`max`")?;
                let base = self.parse_bound_call(Keyword::Max, None)?;
                let (min, max) = (base.lower, base.upper.checked_sub(1));
                (base, Some(min), max)
            }
            TokenKind::Symbol(Symbol::Greater) => {
                self.consume(TokenKind::Keyword(Keyword::Min), "`min`")?;
                let base = self.parse_bound_call(Keyword::Min, None)?;
                let (min, max) = (base.lower.checked_add(1), base.upper);
                (base, min, Some(max))
            }
            _ => return Err(self.unexpected(op, "`:`, `<` or `>`")),
        };

        match (min, max) {
            (Some(min), Some(max)) if min <= max => Ok(IterExpr {
                base,
                bound,
                min,
                max,
            }),
            _ => Err(bound_token.span().wrap(
                SyntaxError::EmptyIteration {
                    bound,
                    index: Rc::clone(&base.name),
                }
                .into(),
            )),
        }
    }

    fn parse_rec(&mut self) -> Result<RecExpr> {
        let lo = self.advance().span();
        let var_token = self.consume(TokenKind::Identifier, "a recursion variable")?;
        let var = self.bind_name(var_token)?;
        self.consume_symbol(Symbol::LBrace)?;

        self.scopes.push(Scope::Rec(Rc::clone(&var)));
        let body = self.parse_expr_list(Terminator::RBrace);
        self.scopes.pop();
        let body = body?;

        let hi = self.consume_symbol(Symbol::RBrace)?.span();
        Ok(RecExpr {
            var,
            body,
            span: lo.to(hi),
        })
    }

    fn parse_ident(&mut self, expected: &'static str) -> Result<Spanned<Rc<str>>> {
        let token = self.consume(TokenKind::Identifier, expected)?;
        Ok(token.span().wrap(extract::ident(token, self.src)))
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok [Token]) -> Parser<'src, 'tok> {
        Parser {
            src,
            tokens,
            cursor: 0,
            table: SymbolTable::new(),
            scopes: Vec::new(),
        }
    }

    fn declare(&mut self, decl: Spanned<Decl>) -> Result<()> {
        let Spanned { span, inner: decl } = decl;
        debug!(name = %decl.name(), kind = %decl.kind(), "declared");
        self.table
            .declare(decl)
            .map_err(|error| span.wrap(error.into()))
    }

    fn resolve(&self, token: Token) -> Result<&Decl> {
        let name = token.text(self.src);
        self.table.resolve(name).ok_or_else(|| {
            token
                .span()
                .wrap(ResolutionError::Undeclared { name: name.into() }.into())
        })
    }

    fn resolve_index(&self, token: Token) -> Result<Rc<IndexDecl>> {
        match self.resolve(token)? {
            Decl::Index(index) => Ok(Rc::clone(index)),
            other => Err(wrong_kind(token.span(), other, DeclKind::Index)),
        }
    }

    /// Checks that a `foreach` or `Rec` name doesn't clash with anything
    /// already in scope.
    fn bind_name(&self, token: Token) -> Result<Rc<str>> {
        let name = extract::ident(token, self.src);
        if self.table.resolve(&name).is_some() {
            return Err(token
                .span()
                .wrap(ResolutionError::ShadowsDeclaration { name }.into()));
        }
        if self.scopes.iter().any(|scope| scope.name() == &*name) {
            return Err(token
                .span()
                .wrap(ResolutionError::AlreadyBound { name }.into()));
        }
        Ok(name)
    }

    fn is_rec_var(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| matches!(scope, Scope::Rec(var) if &**var == name))
    }

    /// Reads a literal. `usize::MAX` is reserved for `n`, so it is out of
    /// range like any larger number.
    fn literal(&self, token: Token) -> Result<extract::Literal> {
        match extract::literal(token, self.src) {
            Ok(extract::Literal::Number(UNBOUNDED)) | Err(_) => {
                let literal = token.text(self.src).into();
                Err(token
                    .span()
                    .wrap(SyntaxError::LiteralOutOfRange { literal }.into()))
            }
            Ok(literal) => Ok(literal),
        }
    }

    fn unexpected(&self, token: Token, expected: &'static str) -> ParseError {
        let found = extract::describe(token, self.src);
        let error = if token.kind == TokenKind::Unknown {
            SyntaxError::UnknownCharacter { found }
        } else {
            SyntaxError::Unexpected { expected, found }
        };
        token.span().wrap(error.into())
    }

    /// Returns the current token. The token buffer always ends with an
    /// [`TokenKind::Eof`], which is returned indefinitely once reached.
    fn peek(&self) -> Token {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::new_of_length(self.src.len(), 0, 1)))
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not, fails
    /// with an error describing what was expected.
    fn consume(&mut self, expect: TokenKind, expected: &'static str) -> Result<Token> {
        let c = self.peek();
        if c.kind == expect {
            self.advance();
            Ok(c)
        } else {
            Err(self.unexpected(c, expected))
        }
    }

    fn consume_symbol(&mut self, symbol: Symbol) -> Result<Token> {
        let expected = match symbol {
            Symbol::LBrace => "`{`",
            Symbol::RBrace => "`}`",
            Symbol::LBracket => "`[`",
            Symbol::RBracket => "`]`",
            Symbol::LParen => "`(`",
            Symbol::RParen => "`)`",
            Symbol::Less => "`<`",
            Symbol::Greater => "`>`",
            Symbol::Dot => "`.`",
            Symbol::Eq => "`=`",
            Symbol::Plus => "`+`",
            Symbol::Minus => "`-`",
            Symbol::Colon => "`:`",
            Symbol::Arrow => "`->`",
        };
        self.consume(TokenKind::Symbol(symbol), expected)
    }
}

fn wrong_kind(span: Span, found: &Decl, expected: DeclKind) -> ParseError {
    span.wrap(
        ResolutionError::WrongKind {
            name: Rc::clone(found.name()),
            expected,
            found: found.kind(),
        }
        .into(),
    )
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: Box<str>,
    },
    #[error("unknown character {found}")]
    UnknownCharacter { found: Box<str> },
    #[error("lower bound of index `{index}` can't be unbounded")]
    UnboundedLowerBound { index: Rc<str> },
    #[error("index `{index}` has lower bound {lower} above its upper bound {upper}")]
    InvertedBounds {
        index: Rc<str>,
        lower: usize,
        upper: usize,
    },
    #[error("literal `{literal}` is out of range")]
    LiteralOutOfRange { literal: Box<str> },
    #[error("expected an index name or the literal `1`, found {found}")]
    NonUnitLiteral { found: Box<str> },
    #[error("the unbounded literal `n` can't be used in an index expression")]
    UnboundedInIndexExpr,
    #[error("index {value} is out of bounds for {index}")]
    IndexOutOfBounds { value: usize, index: Box<str> },
    #[error("iteration of `{bound}` over `{index}` is empty")]
    EmptyIteration { bound: Rc<str>, index: Rc<str> },
    #[error(transparent)]
    Arithmetic(#[from] ArithError),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("`{name}` is not declared")]
    Undeclared { name: Rc<str> },
    #[error("`{name}` is declared as {found}, expected {expected}")]
    WrongKind {
        name: Rc<str>,
        expected: DeclKind,
        found: DeclKind,
    },
    #[error("`{name}` is already declared")]
    Redeclared { name: Rc<str> },
    #[error("`{name}` is indexed by `{index}` and needs an explicit index")]
    MissingIndex { name: Rc<str>, index: Rc<str> },
    #[error("`{entity}` is indexed by `{expected}`, not by `{found}`")]
    UnrelatedIndex {
        entity: Rc<str>,
        expected: Rc<str>,
        found: Rc<str>,
    },
    #[error("index `{index}` is unbounded and has no maximum")]
    UnboundedMax { index: Rc<str> },
    #[error("`{name}` shadows a declaration")]
    ShadowsDeclaration { name: Rc<str> },
    #[error("`{name}` is already bound by an enclosing construct")]
    AlreadyBound { name: Rc<str> },
}
