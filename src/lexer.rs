use std::iter::Peekable;

use crate::token::{Span, Symbol, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The choreography lexer.
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    line: u32,
    current_lo: usize,
    current_line: u32,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer. Whitespace and
    /// comments are skipped, so the buffer only holds significant tokens, the
    /// last of which is always the single [`TokenKind::Eof`].
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            self.skip_trivia();
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use Symbol::*;
        let Some(c) = self.mark_advance() else {
            return TokenKind::Eof;
        };
        let symbol = match c {
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            '(' => LParen,
            ')' => RParen,
            '<' => Less,
            '>' => Greater,
            '.' => Dot,
            '=' => Eq,
            '+' => Plus,
            '-' => match self.peek() {
                Some('>') => self.advance_with(Arrow),
                _ => Minus,
            },
            ':' => Colon,
            'n' if self.is_at_boundary() => return TokenKind::Literal,
            c if c.is_ascii_alphabetic() || c == '_' => return self.identifier_or_keyword(),
            c if c.is_ascii_digit() => return self.literal(),
            _ => return TokenKind::Unknown,
        };
        TokenKind::Symbol(symbol)
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';
        while self.peek().is_some_and(valid_identifier_suffix) {
            self.advance();
        }
        match KEYWORDS.get(self.substr()).copied() {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        }
    }

    fn literal(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        TokenKind::Literal
    }

    /// Whether the next character ends a word. A lone `n` in such a position
    /// is the unbounded literal rather than an identifier.
    fn is_at_boundary(&mut self) -> bool {
        self.peek()
            .is_none_or(|next| next.is_ascii_whitespace() || Symbol::starts_with(next))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some('/') if self.src[self.cursor..].starts_with("//") => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            line: 1,
            current_lo: 0,
            current_line: 1,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.advance()
    }

    /// Returns the next character and advances the iterator. `None` once the
    /// input is exhausted.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor, self.current_line)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.span()));
    }
}

/// Helpers to read token payloads out of the source.
pub mod extract {
    use std::num::ParseIntError;

    use super::*;

    /// A literal's value: either a concrete number or the unbounded `n`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum Literal {
        Number(usize),
        Unbounded,
    }

    pub fn literal(token: Token, src: &str) -> Result<Literal, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Literal);
        match token.text(src) {
            "n" => Ok(Literal::Unbounded),
            digits => digits.parse().map(Literal::Number),
        }
    }

    pub fn ident(token: Token, src: &str) -> std::rc::Rc<str> {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.text(src).into()
    }

    /// Renders a token for diagnostics.
    pub fn describe(token: Token, src: &str) -> Box<str> {
        match token.kind {
            TokenKind::Eof => "end of input".into(),
            TokenKind::Keyword(keyword) => format!("`{}`", keyword.as_str()).into(),
            _ => format!("`{}`", token.text(src)).into(),
        }
    }
}
