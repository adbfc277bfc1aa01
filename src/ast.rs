//! The choreography AST.
//!
//! Declarations are shared through [`Rc`] between the symbol table and the
//! expressions that reference them. Expressions themselves form a tree, except
//! for [`Expr::Splice`], which shares an already declared global type.

use std::{collections::BTreeSet, fmt, rc::Rc};

use crate::{arith::ArithExpr, token::Span};

/// Upper bound of an index declared with the `n` literal.
pub const UNBOUNDED: usize = usize::MAX;

/// Name of the reserved singleton index used by unparametrized participants
/// and channels. Not a valid identifier, so it can't clash with user names.
pub const UNARY_INDEX: &str = "<unary>";

#[derive(Debug, PartialEq, Eq)]
pub struct IndexDecl {
    pub name: Rc<str>,
    pub lower: usize,
    /// Inclusive. [`UNBOUNDED`] if declared as `n`.
    pub upper: usize,
}

impl IndexDecl {
    pub fn unary() -> IndexDecl {
        IndexDecl {
            name: UNARY_INDEX.into(),
            lower: 1,
            upper: 1,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.upper == UNBOUNDED
    }

    pub fn is_singleton(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_unary(&self) -> bool {
        &*self.name == UNARY_INDEX
    }

    pub fn contains(&self, value: usize) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

impl fmt::Display for IndexDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{{}..", self.name, self.lower)?;
        if self.is_unbounded() {
            write!(f, "n}}")
        } else {
            write!(f, "{}}}", self.upper)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParticipantDecl {
    pub name: Rc<str>,
    pub index: Rc<IndexDecl>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ChannelDecl {
    pub name: Rc<str>,
    pub index: Rc<IndexDecl>,
}

/// Reserved for label-based selection. Labels are recorded but carry no
/// projection semantics.
#[derive(Debug, PartialEq, Eq)]
pub struct LabelDecl {
    pub name: Rc<str>,
    pub labels: BTreeSet<Rc<str>>,
}

#[derive(Debug)]
pub struct GlobalTypeDecl {
    pub name: Rc<str>,
    pub body: ExprList,
}

#[derive(Clone, Debug)]
pub enum Decl {
    Index(Rc<IndexDecl>),
    Participant(Rc<ParticipantDecl>),
    Channel(Rc<ChannelDecl>),
    Label(Rc<LabelDecl>),
    GlobalType(Rc<GlobalTypeDecl>),
}

impl Decl {
    pub fn name(&self) -> &Rc<str> {
        match self {
            Decl::Index(decl) => &decl.name,
            Decl::Participant(decl) => &decl.name,
            Decl::Channel(decl) => &decl.name,
            Decl::Label(decl) => &decl.name,
            Decl::GlobalType(decl) => &decl.name,
        }
    }

    pub fn kind(&self) -> DeclKind {
        match self {
            Decl::Index(_) => DeclKind::Index,
            Decl::Participant(_) => DeclKind::Participant,
            Decl::Channel(_) => DeclKind::Channel,
            Decl::Label(_) => DeclKind::Label,
            Decl::GlobalType(_) => DeclKind::GlobalType,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Index,
    Participant,
    Channel,
    Label,
    GlobalType,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclKind::Index => "an index",
            DeclKind::Participant => "a participant",
            DeclKind::Channel => "a channel",
            DeclKind::Label => "a label set",
            DeclKind::GlobalType => "a global type",
        })
    }
}

/// A `.`-separated sequence of expressions.
#[derive(Debug, Default)]
pub struct ExprList {
    pub exprs: Vec<Expr>,
}

#[derive(Debug)]
pub enum Expr {
    Communication(CommunicationExpr),
    /// A previously declared global type, used in place.
    Splice(Rc<GlobalTypeDecl>),
    ForEach(ForEachExpr),
    Rec(RecExpr),
    Con(ConExpr),
}

/// `sender -> receiver : channel <data_type>`
#[derive(Debug)]
pub struct CommunicationExpr {
    pub sender: ParticipantExpr,
    pub receiver: ParticipantExpr,
    pub channel: ChannelExpr,
    pub data_type: Rc<str>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ParticipantExpr {
    pub decl: Rc<ParticipantDecl>,
    pub index: IndexExpr,
}

#[derive(Debug)]
pub struct ChannelExpr {
    pub decl: Rc<ChannelDecl>,
    pub index: IndexExpr,
}

#[derive(Debug)]
pub struct IndexExpr {
    pub base: Rc<IndexDecl>,
    pub value: ArithExpr,
    /// `false` iff `value` references an iteration identifier.
    pub is_literal: bool,
}

/// The header of a `foreach`: `bound` ranges over `min..=max`.
#[derive(Debug)]
pub struct IterExpr {
    pub base: Rc<IndexDecl>,
    pub bound: Rc<str>,
    pub min: usize,
    /// Inclusive. May be [`UNBOUNDED`], which projection rejects.
    pub max: usize,
}

#[derive(Debug)]
pub struct ForEachExpr {
    pub iter: IterExpr,
    pub body: ExprList,
    pub span: Span,
}

#[derive(Debug)]
pub struct RecExpr {
    pub var: Rc<str>,
    pub body: ExprList,
    pub span: Span,
}

/// A continuation to the enclosing [`RecExpr`] with the same variable.
#[derive(Debug)]
pub struct ConExpr {
    pub var: Rc<str>,
    pub span: Span,
}
