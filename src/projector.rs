//! Endpoint projection.
//!
//! Walks a global type and appends, for each communication, a send to the
//! sender's local protocol and a receive to the receiver's. `foreach` bodies
//! are unrolled in ascending index order, so every local protocol follows the
//! syntactic order of the communications its participant takes part in.

use std::rc::Rc;

use tracing::{debug, info};

use crate::{
    arith::{ArithError, Bindings},
    ast::{CommunicationExpr, Expr, ExprList, ForEachExpr, GlobalTypeDecl, IndexExpr, UNBOUNDED},
    projection::{Action, Message, ParticipantKey, Projection},
    symbol_table::SymbolTable,
};

type Result<T, E = ProjectionError> = std::result::Result<T, E>;

/// Projects the choreography's root, which is its last declaration.
pub fn project(table: &SymbolTable) -> Result<Projection> {
    let root = table.root().ok_or(ProjectionError::NoGlobalType)?;
    project_global(root)
}

pub fn project_global(global: &GlobalTypeDecl) -> Result<Projection> {
    let mut projector = Projector::default();
    projector.project_list(&global.body)?;
    let projection = projector.projection;
    info!(
        global = %global.name,
        participants = projection.len(),
        actions = projection.action_count(),
        "projected global type",
    );
    Ok(projection)
}

#[derive(Default)]
struct Projector {
    bindings: Bindings,
    projection: Projection,
}

impl Projector {
    fn project_list(&mut self, list: &ExprList) -> Result<()> {
        list.exprs
            .iter()
            .try_for_each(|expr| self.project_expr(expr))
    }

    fn project_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Communication(comm) => self.project_communication(comm),
            Expr::Splice(global) => self.project_list(&global.body),
            Expr::ForEach(for_each) => self.project_for_each(for_each),
            Expr::Rec(_) => Err(ProjectionError::Unimplemented {
                construct: "recursion",
            }),
            Expr::Con(_) => Err(ProjectionError::Unimplemented {
                construct: "continuation",
            }),
        }
    }

    fn project_communication(&mut self, comm: &CommunicationExpr) -> Result<()> {
        let channel_index = self.eval(&comm.channel.decl.name, &comm.channel.index)?;
        let sender = ParticipantKey::new(
            Rc::clone(&comm.sender.decl.name),
            self.eval(&comm.sender.decl.name, &comm.sender.index)?,
        );
        let receiver = ParticipantKey::new(
            Rc::clone(&comm.receiver.decl.name),
            self.eval(&comm.receiver.decl.name, &comm.receiver.index)?,
        );
        let message = Message {
            channel: Rc::clone(&comm.channel.decl.name),
            channel_index,
            data_type: Rc::clone(&comm.data_type),
        };
        debug!(
            %sender,
            %receiver,
            channel = %message.channel,
            channel_index,
            data_type = %message.data_type,
            "projected communication",
        );

        self.projection
            .protocol_mut(sender)
            .push(Action::Send(message.clone()));
        self.projection
            .protocol_mut(receiver)
            .push(Action::Receive(message));
        Ok(())
    }

    fn project_for_each(&mut self, for_each: &ForEachExpr) -> Result<()> {
        let iter = &for_each.iter;
        if iter.max == UNBOUNDED {
            return Err(ProjectionError::UnboundedIteration {
                bound: Rc::clone(&iter.bound),
                index: Rc::clone(&iter.base.name),
            });
        }

        let shadowed = self.bindings.remove(&iter.bound);
        let result = (iter.min..=iter.max).try_for_each(|el| {
            self.bindings.insert(Rc::clone(&iter.bound), el);
            self.project_list(&for_each.body)
        });
        match shadowed {
            Some(previous) => self.bindings.insert(Rc::clone(&iter.bound), previous),
            None => self.bindings.remove(&iter.bound),
        };
        result
    }

    fn eval(&self, entity: &Rc<str>, index: &IndexExpr) -> Result<usize> {
        let value = index.value.eval(&self.bindings)?;
        // Closed indices were range-checked while parsing.
        if !index.is_literal && !index.base.contains(value) {
            return Err(ProjectionError::IndexOutOfBounds {
                entity: Rc::clone(entity),
                value,
                index: index.base.to_string().into(),
            });
        }
        Ok(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("the last declaration is not a global type")]
    NoGlobalType,
    #[error("iteration of `{bound}` over `{index}` is unbounded")]
    UnboundedIteration { bound: Rc<str>, index: Rc<str> },
    #[error("index {value} of `{entity}` is out of bounds for {index}")]
    IndexOutOfBounds {
        entity: Rc<str>,
        value: usize,
        index: Box<str>,
    },
    #[error("{construct} can't be projected")]
    Unimplemented { construct: &'static str },
    #[error(transparent)]
    Arithmetic(#[from] ArithError),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{parser::parse_choreography, util::test_utils::tree_tests};

    tree_tests!(
        use projector;

        fn test_single_communication() {
            let choreography = "
                Index I{0..1}. Participant A{I}. Participant B{I}. Channel Ch{I}.
                G = A[0]->B[0]:Ch[0]<Msg>. end
            ";
            let tree_ok = "
                A[0]
                  !Ch[0]<Msg>
                B[0]
                  ?Ch[0]<Msg>
            ";
        }

        fn test_foreach_unrolls_in_ascending_order() {
            let choreography = "
                Index I {0..2}
                Participant A {I}
                Participant B {I}
                Channel C {I}
                G = foreach (i : I) { A[i] -> B[i] : C[i] <T> } . A[2] -> B[0] : C[1] <U> end
            ";
            let tree_ok = "
                A[0]
                  !C[0]<T>
                A[1]
                  !C[1]<T>
                A[2]
                  !C[2]<T>
                  !C[1]<U>
                B[0]
                  ?C[0]<T>
                  ?C[1]<U>
                B[1]
                  ?C[1]<T>
                B[2]
                  ?C[2]<T>
            ";
        }

        fn test_ring() {
            let choreography = include_str!("../demos/ring.cor");
            let tree_ok = "
                Process[0]
                  !C[1]<Ping>
                  ?C[0]<Ping>
                Process[1]
                  ?C[1]<Ping>
                  !C[2]<Ping>
                Process[2]
                  ?C[2]<Ping>
                  !C[3]<Ping>
                Process[3]
                  ?C[3]<Ping>
                  !C[0]<Ping>
            ";
        }

        fn test_nested_foreach_with_splice() {
            let choreography = "
                Index I {0..1}
                Index J {0..2}
                Participant Hub {1}
                Participant W {J}
                Channel C {J}
                Step = Hub -> W[j] : C[j] <Job> . W[j] -> Hub : C[j] <Done> end
                G = foreach (i : I) { foreach (j > min(J)) { Step } } end
            ";
            let tree_ok = "
                Hub[1]
                  !C[1]<Job>
                  ?C[1]<Done>
                  !C[2]<Job>
                  ?C[2]<Done>
                  !C[1]<Job>
                  ?C[1]<Done>
                  !C[2]<Job>
                  ?C[2]<Done>
                W[1]
                  ?C[1]<Job>
                  !C[1]<Done>
                  ?C[1]<Job>
                  !C[1]<Done>
                W[2]
                  ?C[2]<Job>
                  !C[2]<Done>
                  ?C[2]<Job>
                  !C[2]<Done>
            ";
        }

        fn test_greater_than_min_over_unbounded_index() {
            let choreography = "
                Index I {0..n}
                Participant A {I}
                Channel C {1}
                G = foreach (i > min(I)) { A[i] -> A[i] : C <T> } end
            ";
            let expected_errors = &["projection error: iteration of `i` over `I` is unbounded"];
        }

        fn test_colon_over_unbounded_index() {
            let choreography = "
                Index I {0..n}
                Participant A {I}
                Channel C {1}
                G = foreach (i : I) { A[i] -> A[i] : C <T> } end
            ";
            let expected_errors = &["projection error: iteration of `i` over `I` is unbounded"];
        }

        fn test_evaluated_index_out_of_bounds() {
            let choreography = "
                Index I {0..2}
                Participant A {I}
                Channel C {1}
                G = foreach (i : I) { A[i] -> A[i + 1] : C <T> } end
            ";
            let expected_errors = &["projection error: index 3 of `A` is out of bounds for I {0..2}"];
        }

        fn test_evaluated_index_underflow() {
            let choreography = "
                Index I {0..2}
                Participant A {I}
                Channel C {1}
                G = foreach (i : I) { A[i - 1] -> A[i] : C <T> } end
            ";
            let expected_errors = &["projection error: `i - 1` underflows"];
        }

        fn test_unbound_identifier() {
            let choreography = "
                Index I {0..2}
                Participant A {I}
                Channel C {1}
                G = A[j] -> A[0] : C <T> end
            ";
            let expected_errors = &["projection error: identifier `j` is not bound by any enclosing foreach"];
        }

        fn test_recursion_is_not_projected() {
            let choreography = "
                Participant A {1}
                Participant B {1}
                Channel C {1}
                G = Rec X { A -> B : C <Ping> . X } end
            ";
            let expected_errors = &["projection error: recursion can't be projected"];
        }

        fn test_last_declaration_must_be_global_type() {
            let choreography = "
                Participant A {1}
                Channel C {1}
                G = A -> A : C <T> end
                Index I {0..1}
            ";
            let expected_errors = &["projection error: the last declaration is not a global type"];
        }

        fn test_parse_errors_are_reported() {
            let choreography = "Index I{1..}";
            let expected_errors = &["line 1: syntax error: expected a bound literal or `n`, found `}`"];
        }
    );

    fn project_src(src: &str) -> Projection {
        let table = parse_choreography(src, &mut Vec::new()).unwrap();
        project(&table).unwrap()
    }

    #[test]
    fn test_two_actions_per_communication() {
        let projection = project_src(
            "
            Participant A {1}
            Participant B {1}
            Participant C {1}
            Channel X {1}
            G = A -> B : X <T> . B -> C : X <T> . C -> A : X <T> . A -> C : X <U> end
            ",
        );
        assert_eq!(projection.action_count(), 8);
        let a = projection.get(&ParticipantKey::new("A", 1)).unwrap();
        let actions: Vec<_> = a.actions().iter().map(ToString::to_string).collect();
        assert_eq!(actions, ["!X[1]<T>", "?X[1]<T>", "!X[1]<U>"]);
    }

    #[test]
    fn test_singleton_index_projects_like_unary() {
        let unary = project_src(
            "
            Participant A {1}
            Participant B {1}
            Channel C {1}
            G = A -> B : C <T> end
            ",
        );
        let singleton = project_src(
            "
            Index U {1..1}
            Participant A {U}
            Participant B {U}
            Channel C {U}
            G = A -> B : C <T> . end
            ",
        );
        assert_eq!(unary, singleton);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let src = include_str!("../demos/ring.cor");
        assert_eq!(project_src(src), project_src(src));
    }
}
