use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{Decl, GlobalTypeDecl, IndexDecl},
    parser::ResolutionError,
};

/// Declarations of a choreography, in declaration order.
///
/// The reserved unary index is always available through
/// [`SymbolTable::unary_index`] but is not part of the declarations, so the
/// last declaration is always a user declaration.
#[derive(Debug)]
pub struct SymbolTable {
    decls: IndexMap<Rc<str>, Decl>,
    unary: Rc<IndexDecl>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            decls: IndexMap::with_capacity(16),
            unary: Rc::new(IndexDecl::unary()),
        }
    }

    /// Adds a declaration. Names are unique across all declaration kinds.
    pub fn declare(&mut self, decl: Decl) -> Result<(), ResolutionError> {
        let name = Rc::clone(decl.name());
        if self.decls.contains_key(&name) {
            return Err(ResolutionError::Redeclared { name });
        }
        self.decls.insert(name, decl);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&Decl> {
        self.decls.get(name)
    }

    pub fn unary_index(&self) -> &Rc<IndexDecl> {
        &self.unary
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.values()
    }

    pub fn last(&self) -> Option<&Decl> {
        self.decls.last().map(|(_, decl)| decl)
    }

    /// The global type to be projected: the last declaration, if it is one.
    pub fn root(&self) -> Option<&Rc<GlobalTypeDecl>> {
        match self.last()? {
            Decl::GlobalType(global) => Some(global),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprList, ParticipantDecl};

    #[test]
    fn rejects_redeclaration_across_kinds() {
        let mut table = SymbolTable::new();
        let index = Rc::new(IndexDecl {
            name: "A".into(),
            lower: 0,
            upper: 3,
        });
        table.declare(Decl::Index(Rc::clone(&index))).unwrap();
        let participant = Decl::Participant(Rc::new(ParticipantDecl {
            name: "A".into(),
            index,
        }));
        assert_eq!(
            table.declare(participant),
            Err(ResolutionError::Redeclared { name: "A".into() }),
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn root_is_last_global_type() {
        let mut table = SymbolTable::new();
        assert!(table.root().is_none());
        table
            .declare(Decl::GlobalType(Rc::new(GlobalTypeDecl {
                name: "G".into(),
                body: ExprList::default(),
            })))
            .unwrap();
        assert_eq!(table.root().map(|g| &*g.name), Some("G"));

        table
            .declare(Decl::Index(Rc::new(IndexDecl {
                name: "I".into(),
                lower: 0,
                upper: 1,
            })))
            .unwrap();
        assert!(table.root().is_none());
        assert!(table.resolve("<unary>").is_none());
        assert!(table.unary_index().is_unary());
    }
}
