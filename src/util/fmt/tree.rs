use std::io::Write;

use crate::{
    ast::*,
    lexer::extract,
    projection::Projection,
    symbol_table::SymbolTable,
    token::Token,
    validator::{Outcome, ValidationReport},
};

const INDENT_WIDTH: usize = 2;

pub fn print_symbol_table_string(table: &SymbolTable) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_symbol_table(&mut buf, table).expect("writing to a buffer can't fail");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_projection_string(projection: &Projection) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_projection(&mut buf, projection).expect("writing to a buffer can't fail");
    String::from_utf8(buf).expect("tree output is UTF-8")
}

pub fn print_tokens(w: &mut impl Write, src: &str, tokens: &[Token]) -> std::io::Result<()> {
    for token in tokens {
        let text = extract::describe(*token, src);
        writeln!(w, "{:?} {} {text}", token.kind, token.span())?;
    }
    Ok(())
}

pub fn print_symbol_table(w: &mut impl Write, table: &SymbolTable) -> std::io::Result<()> {
    for decl in table.iter() {
        print_decl(w, 0, decl)?;
    }
    Ok(())
}

fn print_decl(w: &mut impl Write, i: usize, decl: &Decl) -> std::io::Result<()> {
    sp(w, i)?;
    match decl {
        Decl::Index(index) => writeln!(w, "index {index}"),
        Decl::Participant(participant) => {
            write!(w, "participant {} ", participant.name)?;
            print_index_ref(w, &participant.index)
        }
        Decl::Channel(channel) => {
            write!(w, "channel {} ", channel.name)?;
            print_index_ref(w, &channel.index)
        }
        Decl::Label(label) => {
            write!(w, "label {} {{", label.name)?;
            for (idx, name) in label.labels.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{name}")?;
            }
            writeln!(w, "}}")
        }
        Decl::GlobalType(global) => {
            writeln!(w, "global {}", global.name)?;
            print_expr_list(w, i + 1, &global.body)
        }
    }
}

fn print_index_ref(w: &mut impl Write, index: &IndexDecl) -> std::io::Result<()> {
    if index.is_unary() {
        writeln!(w, "{{1}}")
    } else {
        writeln!(w, "{{{}}}", index.name)
    }
}

fn print_expr_list(w: &mut impl Write, i: usize, list: &ExprList) -> std::io::Result<()> {
    for expr in &list.exprs {
        print_expr(w, i, expr)?;
    }
    Ok(())
}

fn print_expr(w: &mut impl Write, i: usize, expr: &Expr) -> std::io::Result<()> {
    sp(w, i)?;
    match expr {
        Expr::Communication(CommunicationExpr {
            sender,
            receiver,
            channel,
            data_type,
            span: _,
        }) => {
            print_indexed(w, &sender.decl.name, &sender.index)?;
            write!(w, " -> ")?;
            print_indexed(w, &receiver.decl.name, &receiver.index)?;
            write!(w, " : ")?;
            print_indexed(w, &channel.decl.name, &channel.index)?;
            writeln!(w, " <{data_type}>")
        }
        Expr::Splice(global) => writeln!(w, "splice {}", global.name),
        Expr::ForEach(ForEachExpr { iter, body, span: _ }) => {
            write!(w, "foreach {} in {}..=", iter.bound, iter.min)?;
            if iter.max == UNBOUNDED {
                write!(w, "n")?;
            } else {
                write!(w, "{}", iter.max)?;
            }
            writeln!(w, " of {}", iter.base.name)?;
            print_expr_list(w, i + 1, body)
        }
        Expr::Rec(RecExpr { var, body, span: _ }) => {
            writeln!(w, "rec {var}")?;
            print_expr_list(w, i + 1, body)
        }
        Expr::Con(ConExpr { var, span: _ }) => writeln!(w, "continue {var}"),
    }
}

fn print_indexed(w: &mut impl Write, name: &str, index: &IndexExpr) -> std::io::Result<()> {
    if index.base.is_unary() {
        write!(w, "{name}")
    } else {
        write!(w, "{name}[{}]", index.value)
    }
}

pub fn print_projection(w: &mut impl Write, projection: &Projection) -> std::io::Result<()> {
    for (key, protocol) in projection.iter() {
        writeln!(w, "{key}")?;
        for action in protocol.actions() {
            sp(w, 1)?;
            writeln!(w, "{action}")?;
        }
    }
    Ok(())
}

pub fn print_report(w: &mut impl Write, report: &ValidationReport) -> std::io::Result<()> {
    for (participant, witness) in report.witnesses() {
        match witness {
            Some(method) => writeln!(w, "{participant}: conforms via {method}")?,
            None => writeln!(w, "{participant}: no conforming method")?,
        }
        for attempt in report.attempts_of(participant) {
            sp(w, 1)?;
            match &attempt.outcome {
                Outcome::Conforms { trailing: 0 } => writeln!(w, "{}: conforms", attempt.method)?,
                Outcome::Conforms { trailing } => writeln!(
                    w,
                    "{}: conforms ({trailing} trailing statements)",
                    attempt.method
                )?,
                Outcome::Mismatch { consumed, expected } => writeln!(
                    w,
                    "{}: mismatch after {consumed} actions, expected {expected}",
                    attempt.method
                )?,
            }
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
