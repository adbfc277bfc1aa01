//! Index arithmetic.

use std::{collections::HashMap, fmt, rc::Rc};

use crate::ast::IndexDecl;

/// Values of the iteration identifiers currently in scope.
pub type Bindings = HashMap<Rc<str>, usize>;

#[derive(Debug, PartialEq, Eq)]
pub enum ArithExpr {
    Literal(usize),
    /// An iteration identifier, bound by an enclosing `foreach`.
    Identifier(Rc<str>),
    Min(Rc<IndexDecl>),
    Max(Rc<IndexDecl>),
    Add(Box<ArithExpr>, Box<ArithExpr>),
    Sub(Box<ArithExpr>, Box<ArithExpr>),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArithError {
    #[error("`{expr}` underflows")]
    Underflow { expr: Box<str> },
    #[error("`{expr}` overflows")]
    Overflow { expr: Box<str> },
    #[error("identifier `{name}` is not bound by any enclosing foreach")]
    UnboundIdentifier { name: Rc<str> },
    #[error("index `{index}` is unbounded and has no maximum")]
    Unbounded { index: Rc<str> },
}

impl ArithExpr {
    /// Evaluates the expression in the provided context.
    pub fn eval(&self, ctx: &Bindings) -> Result<usize, ArithError> {
        match self {
            ArithExpr::Literal(value) => Ok(*value),
            ArithExpr::Identifier(name) => {
                ctx.get(name)
                    .copied()
                    .ok_or_else(|| ArithError::UnboundIdentifier {
                        name: Rc::clone(name),
                    })
            }
            ArithExpr::Min(index) => Ok(index.lower),
            ArithExpr::Max(index) if index.is_unbounded() => Err(ArithError::Unbounded {
                index: Rc::clone(&index.name),
            }),
            ArithExpr::Max(index) => Ok(index.upper),
            ArithExpr::Add(lhs, rhs) => lhs
                .eval(ctx)?
                .checked_add(rhs.eval(ctx)?)
                .ok_or_else(|| ArithError::Overflow {
                    expr: self.to_string().into(),
                }),
            ArithExpr::Sub(lhs, rhs) => lhs
                .eval(ctx)?
                .checked_sub(rhs.eval(ctx)?)
                .ok_or_else(|| ArithError::Underflow {
                    expr: self.to_string().into(),
                }),
        }
    }

    /// Whether the expression references no iteration identifier.
    pub fn is_closed(&self) -> bool {
        match self {
            ArithExpr::Literal(_) | ArithExpr::Min(_) | ArithExpr::Max(_) => true,
            ArithExpr::Identifier(_) => false,
            ArithExpr::Add(lhs, rhs) | ArithExpr::Sub(lhs, rhs) => lhs.is_closed() && rhs.is_closed(),
        }
    }
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithExpr::Literal(value) => write!(f, "{value}"),
            ArithExpr::Identifier(name) => write!(f, "{name}"),
            ArithExpr::Min(index) => write!(f, "min({})", index.name),
            ArithExpr::Max(index) => write!(f, "max({})", index.name),
            ArithExpr::Add(lhs, rhs) => write_binary(f, lhs, "+", rhs),
            ArithExpr::Sub(lhs, rhs) => write_binary(f, lhs, "-", rhs),
        }
    }
}

// Operators are left-associative, so only a compound right operand needs
// parentheses.
fn write_binary(f: &mut fmt::Formatter<'_>, lhs: &ArithExpr, op: &str, rhs: &ArithExpr) -> fmt::Result {
    write!(f, "{lhs} {op} ")?;
    match rhs {
        ArithExpr::Add(..) | ArithExpr::Sub(..) => write!(f, "({rhs})"),
        _ => write!(f, "{rhs}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lit(value: usize) -> Box<ArithExpr> {
        Box::new(ArithExpr::Literal(value))
    }

    fn ident(name: &str) -> Box<ArithExpr> {
        Box::new(ArithExpr::Identifier(name.into()))
    }

    fn index(lower: usize, upper: usize) -> Rc<IndexDecl> {
        Rc::new(IndexDecl {
            name: "I".into(),
            lower,
            upper,
        })
    }

    #[test]
    fn evaluates_with_bindings() {
        let ctx = Bindings::from([("i".into(), 3)]);
        let expr = ArithExpr::Sub(Box::new(ArithExpr::Add(ident("i"), lit(2))), lit(1));
        assert_eq!(expr.to_string(), "i + 2 - 1");
        assert_eq!(expr.eval(&ctx), Ok(4));
        assert!(!expr.is_closed());
    }

    #[test]
    fn evaluates_min_and_max() {
        let i = index(2, 7);
        let expr = ArithExpr::Sub(Box::new(ArithExpr::Max(Rc::clone(&i))), Box::new(ArithExpr::Min(i)));
        assert_eq!(expr.to_string(), "max(I) - min(I)");
        assert_eq!(expr.eval(&Bindings::new()), Ok(5));
        assert!(expr.is_closed());
    }

    #[test]
    fn parenthesizes_compound_right_operand() {
        let expr = ArithExpr::Sub(lit(5), Box::new(ArithExpr::Sub(lit(3), lit(1))));
        assert_eq!(expr.to_string(), "5 - (3 - 1)");
        assert_eq!(expr.eval(&Bindings::new()), Ok(3));
    }

    #[test]
    fn reports_errors() {
        let ctx = Bindings::new();
        assert_eq!(
            ArithExpr::Sub(lit(0), lit(1)).eval(&ctx),
            Err(ArithError::Underflow {
                expr: "0 - 1".into()
            }),
        );
        assert_eq!(
            ArithExpr::Add(lit(usize::MAX), lit(1)).eval(&ctx),
            Err(ArithError::Overflow {
                expr: format!("{} + 1", usize::MAX).into()
            }),
        );
        assert_eq!(
            ArithExpr::Add(ident("j"), lit(1)).eval(&ctx),
            Err(ArithError::UnboundIdentifier { name: "j".into() }),
        );
        assert_eq!(
            ArithExpr::Max(index(0, usize::MAX)).eval(&ctx),
            Err(ArithError::Unbounded { index: "I".into() }),
        );
    }
}
