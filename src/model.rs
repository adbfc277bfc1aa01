//! An in-memory program model that can be validated against choreographies.
//!
//! Programs are described in JSON: data types, and classes with typed fields
//! and methods whose bodies are reduced to the statements validation cares
//! about.
//!
//! ```json
//! {
//!   "types": ["Message"],
//!   "classes": [{
//!     "name": "Anne",
//!     "fields": [{ "name": "inbox", "ty": "Message" }],
//!     "methods": [{
//!       "name": "send",
//!       "body": [
//!         { "assign": { "field": "Nicholas.inbox", "ty": "Message" } },
//!         { "wait": { "field": "inbox" } },
//!         { "call": { "method": "log" } },
//!         { "other": "return" }
//!       ]
//!     }]
//!   }]
//! }
//! ```
//!
//! Field and method references are local to the enclosing class unless
//! qualified with a class name.

use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use serde::Deserialize;

use crate::validator::Implementation;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramDef {
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    classes: Vec<ClassDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassDef {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDef>,
    #[serde(default)]
    methods: Vec<MethodDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDef {
    name: String,
    /// `None` for declarations without a definition.
    #[serde(default)]
    body: Option<Vec<StmtDef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum StmtDef {
    Assign { field: String, ty: String },
    Wait { field: String },
    Call { method: String },
    Other(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldId {
    class: usize,
    field: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId {
    class: usize,
    method: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclId {
    Class(ClassId),
    Type(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// Stores a value of type `ty` into `field`.
    Assign { field: FieldId, ty: Rc<str> },
    /// Blocks until `field` is set.
    Wait { field: FieldId },
    Call { callee: MethodId },
    Other(Rc<str>),
}

#[derive(Debug)]
pub struct Class {
    pub name: Rc<str>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

#[derive(Debug)]
pub struct Field {
    pub name: Rc<str>,
    pub ty: Rc<str>,
}

#[derive(Debug)]
pub struct Method {
    pub name: Rc<str>,
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug)]
pub struct Program {
    types: Vec<Rc<str>>,
    classes: Vec<Class>,
}

impl Program {
    pub fn from_json(src: &str) -> Result<Program, Error> {
        let def: ProgramDef = serde_json::from_str(src)?;
        Program::resolve(def)
    }

    fn resolve(def: ProgramDef) -> Result<Program, Error> {
        let mut class_ids = HashMap::with_capacity(def.classes.len());
        for (idx, class) in def.classes.iter().enumerate() {
            if class_ids.insert(class.name.as_str(), idx).is_some() {
                return Err(Error::DuplicateClass {
                    class: class.name.clone(),
                });
            }
        }
        let resolver = Resolver {
            classes: &def.classes,
            class_ids,
        };

        let mut classes = Vec::with_capacity(def.classes.len());
        for (class_idx, class) in def.classes.iter().enumerate() {
            let methods = class
                .methods
                .iter()
                .map(|method| -> Result<Method, Error> {
                    let body = match &method.body {
                        Some(stmts) => Some(
                            stmts
                                .iter()
                                .map(|stmt| resolver.stmt(class_idx, stmt))
                                .collect::<Result<_, _>>()?,
                        ),
                        None => None,
                    };
                    Ok(Method {
                        name: method.name.as_str().into(),
                        body,
                    })
                })
                .collect::<Result<_, _>>()?;
            let fields = class
                .fields
                .iter()
                .map(|field| Field {
                    name: field.name.as_str().into(),
                    ty: field.ty.as_str().into(),
                })
                .collect();
            classes.push(Class {
                name: class.name.as_str().into(),
                fields,
                methods,
            });
        }

        Ok(Program {
            types: def.types.iter().map(|ty| ty.as_str().into()).collect(),
            classes,
        })
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.classes[id.class].fields[id.field]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.classes[id.class].methods[id.method]
    }

    /// Whether the method's body assigns or waits on `ty`, directly or
    /// through the methods it calls.
    fn uses_type(&self, id: MethodId, ty: &str, visited: &mut HashSet<MethodId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        self.method(id).body.iter().flatten().any(|stmt| match stmt {
            Stmt::Assign { ty: assigned, .. } => &**assigned == ty,
            Stmt::Wait { field } => &*self.field(*field).ty == ty,
            Stmt::Call { callee } => self.uses_type(*callee, ty, visited),
            Stmt::Other(_) => false,
        })
    }
}

struct Resolver<'d> {
    classes: &'d [ClassDef],
    class_ids: HashMap<&'d str, usize>,
}

impl Resolver<'_> {
    fn stmt(&self, class: usize, stmt: &StmtDef) -> Result<Stmt, Error> {
        Ok(match stmt {
            StmtDef::Assign { field, ty } => Stmt::Assign {
                field: self.field(class, field)?,
                ty: ty.as_str().into(),
            },
            StmtDef::Wait { field } => Stmt::Wait {
                field: self.field(class, field)?,
            },
            StmtDef::Call { method } => Stmt::Call {
                callee: self.method(class, method)?,
            },
            StmtDef::Other(label) => Stmt::Other(label.as_str().into()),
        })
    }

    fn field(&self, from: usize, path: &str) -> Result<FieldId, Error> {
        let (class, name) = self.qualify(from, path)?;
        let field = self.classes[class]
            .fields
            .iter()
            .position(|field| field.name == name)
            .ok_or_else(|| Error::UnknownField {
                class: self.classes[class].name.clone(),
                field: name.to_owned(),
            })?;
        Ok(FieldId { class, field })
    }

    fn method(&self, from: usize, path: &str) -> Result<MethodId, Error> {
        let (class, name) = self.qualify(from, path)?;
        let method = self.classes[class]
            .methods
            .iter()
            .position(|method| method.name == name)
            .ok_or_else(|| Error::UnknownMethod {
                class: self.classes[class].name.clone(),
                method: name.to_owned(),
            })?;
        Ok(MethodId { class, method })
    }

    /// Splits `Class.member` paths. Unqualified members belong to `from`.
    fn qualify<'p>(&self, from: usize, path: &'p str) -> Result<(usize, &'p str), Error> {
        match path.split_once('.') {
            Some((class, member)) => {
                let class = self
                    .class_ids
                    .get(class)
                    .copied()
                    .ok_or_else(|| Error::UnknownClass {
                        class: class.to_owned(),
                        referenced_from: self.classes[from].name.clone(),
                    })?;
                Ok((class, member))
            }
            None => Ok((from, path)),
        }
    }
}

impl Implementation for Program {
    type Decl = DeclId;
    type Method = MethodId;
    type Field = FieldId;
    type Stmt = Stmt;
    type Body = MethodId;

    fn resolve_declaration(&self, name: &str) -> Option<DeclId> {
        if let Some(class) = self.classes.iter().position(|class| &*class.name == name) {
            return Some(DeclId::Class(ClassId(class)));
        }
        self.types
            .iter()
            .position(|ty| &**ty == name)
            .map(DeclId::Type)
    }

    fn find_members_using_type(&self, class: &DeclId, type_name: &str) -> Vec<MethodId> {
        let DeclId::Class(ClassId(class)) = *class else {
            return Vec::new();
        };
        (0..self.classes[class].methods.len())
            .map(|method| MethodId { class, method })
            .filter(|&id| self.method(id).body.is_some())
            .filter(|&id| self.uses_type(id, type_name, &mut HashSet::new()))
            .collect()
    }

    fn find_field(&self, class: &DeclId, type_name: &str) -> Option<FieldId> {
        let DeclId::Class(ClassId(class)) = *class else {
            return None;
        };
        self.classes[class]
            .fields
            .iter()
            .position(|field| &*field.ty == type_name)
            .map(|field| FieldId { class, field })
    }

    fn method_name(&self, method: &MethodId) -> String {
        let class = &self.classes[method.class];
        format!("{}.{}", class.name, self.method(*method).name)
    }

    fn method_body(&self, method: &MethodId) -> Option<MethodId> {
        self.method(*method).body.as_ref().map(|_| *method)
    }

    fn statement_children(&self, body: &MethodId) -> Vec<Stmt> {
        self.method(*body).body.clone().unwrap_or_default()
    }

    fn is_assignment_of_type_to_field(&self, stmt: &Stmt, field: &FieldId, type_name: &str) -> bool {
        matches!(stmt, Stmt::Assign { field: assigned, ty } if assigned == field && &**ty == type_name)
    }

    fn is_wait_loop_on_field(&self, stmt: &Stmt, field: &FieldId) -> bool {
        matches!(stmt, Stmt::Wait { field: waited } if waited == field)
    }

    fn callee_body_of(&self, stmt: &Stmt) -> Option<MethodId> {
        match stmt {
            Stmt::Call { callee } => self.method_body(callee),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed program model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("class `{class}` is defined more than once")]
    DuplicateClass { class: String },
    #[error("unknown class `{class}` referenced from `{referenced_from}`")]
    UnknownClass {
        class: String,
        referenced_from: String,
    },
    #[error("class `{class}` has no field `{field}`")]
    UnknownField { class: String, field: String },
    #[error("class `{class}` has no method `{method}`")]
    UnknownMethod { class: String, method: String },
}
