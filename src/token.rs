use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
    line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
            line: span.line,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            lo: self.lo,
            len: self.len,
            line: self.line,
        }
    }

    /// Returns the source text under this token.
    pub fn text<'src>(&self, src: &'src str) -> &'src str {
        self.span().substr(src)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    /// 1-based source line of the first byte.
    pub line: u32,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>, line: u32) -> Span {
        debug_assert!(hi >= lo);
        let len = u32::try_from(hi - lo).unwrap_or(u32::MAX);
        Self::new_of_length(lo, len, line)
    }

    pub fn new_of_length(lo: usize, len: u32, line: u32) -> Span {
        Span { lo, len, line }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span that covers both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let lo = self.lo.min(other.lo);
        let hi = self.hi().max(other.hi());
        Span::new_of_bounds(lo..hi, self.line.min(other.line))
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, line: {})", self.line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lo, self.hi())
    }
}

/// A value tagged with the source span it originates from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner } = self;
        if f.alternate() {
            write!(f, "line {} ({span}): {inner}", span.line)
        } else {
            write!(f, "line {}: {inner}", span.line)
        }
    }
}

impl<T: std::error::Error + 'static> std::error::Error for Spanned<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Symbol(Symbol),
    Identifier,
    /// A digit run, or the unbounded literal `n`.
    Literal,
    /// A character that doesn't start any valid token. Reported by the parser.
    Unknown,
    Eof,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Index,
    Participant,
    Channel,
    Label,
    Foreach,
    Rec,
    End,
    Min,
    Max,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Index => "Index",
            Keyword::Participant => "Participant",
            Keyword::Channel => "Channel",
            Keyword::Label => "Label",
            Keyword::Foreach => "foreach",
            Keyword::Rec => "Rec",
            Keyword::End => "end",
            Keyword::Min => "min",
            Keyword::Max => "max",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Less,
    Greater,
    Dot,
    Eq,
    Plus,
    Minus,
    Colon,
    /// `->`
    Arrow,
}

impl Symbol {
    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::LBrace => "{",
            Symbol::RBrace => "}",
            Symbol::LBracket => "[",
            Symbol::RBracket => "]",
            Symbol::LParen => "(",
            Symbol::RParen => ")",
            Symbol::Less => "<",
            Symbol::Greater => ">",
            Symbol::Dot => ".",
            Symbol::Eq => "=",
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Colon => ":",
            Symbol::Arrow => "->",
        }
    }

    /// Whether the character starts a symbol token.
    pub fn starts_with(c: char) -> bool {
        matches!(
            c,
            '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | '.' | '=' | '+' | '-' | ':'
        )
    }
}

pub static KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "Index" => Keyword::Index,
    "Participant" => Keyword::Participant,
    "Channel" => Keyword::Channel,
    "Label" => Keyword::Label,
    "foreach" => Keyword::Foreach,
    "Rec" => Keyword::Rec,
    "end" => Keyword::End,
    "min" => Keyword::Min,
    "max" => Keyword::Max,
};
