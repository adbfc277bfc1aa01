//! Conformance validation of an implementation against projected local
//! protocols.
//!
//! Validation runs in two phases. Binding maps every participant to its
//! implementing class and every channel (per carried data type) to the field
//! that stands for it. Matching then walks each local protocol against the
//! candidate methods of the participant's class, one statement at a time,
//! inlining calls, until a method consumes the whole protocol.

use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use tracing::{debug, info, trace, warn};

use crate::{
    ast::{CommunicationExpr, Expr, ExprList, GlobalTypeDecl},
    projection::{Action, Cursor, LocalProtocol, ParticipantKey, Projection},
};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 16;

/// The queries the validator needs from a program under validation.
///
/// Handles are opaque to the validator. `Decl` stands for any named
/// declaration (classes and data types), `Body` for a statement sequence that
/// can be scanned in order.
pub trait Implementation {
    type Decl: Clone;
    type Method;
    type Field;
    type Stmt;
    type Body: Clone + PartialEq;

    fn resolve_declaration(&self, name: &str) -> Option<Self::Decl>;

    /// Methods of `class` whose bodies involve `type_name`, in declaration
    /// order.
    fn find_members_using_type(&self, class: &Self::Decl, type_name: &str) -> Vec<Self::Method>;

    fn find_field(&self, class: &Self::Decl, type_name: &str) -> Option<Self::Field>;

    fn method_name(&self, method: &Self::Method) -> String;

    fn method_body(&self, method: &Self::Method) -> Option<Self::Body>;

    fn statement_children(&self, body: &Self::Body) -> Vec<Self::Stmt>;

    fn is_assignment_of_type_to_field(
        &self,
        stmt: &Self::Stmt,
        field: &Self::Field,
        type_name: &str,
    ) -> bool;

    fn is_wait_loop_on_field(&self, stmt: &Self::Stmt, field: &Self::Field) -> bool;

    /// If `stmt` calls a method with a body, returns that body.
    fn callee_body_of(&self, stmt: &Self::Stmt) -> Option<Self::Body>;
}

/// The order in which candidate methods are tried.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MethodOrder {
    /// Last declared method first.
    #[default]
    Reverse,
    Declaration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Maximum number of nested calls inlined while matching.
    pub max_call_depth: usize,
    pub method_order: MethodOrder,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            method_order: MethodOrder::default(),
        }
    }
}

/// Validates every local protocol of `projection` against `imp`.
///
/// Failing to bind participants or channels aborts validation. Protocol
/// mismatches don't; they are recorded in the returned report.
pub fn validate<I: Implementation>(
    imp: &I,
    global: &GlobalTypeDecl,
    projection: &Projection,
    options: &Options,
) -> Result<ValidationReport, Error> {
    let bindings = bind_channels(imp, global)?;
    let matcher = Matcher {
        imp,
        bindings: &bindings,
        options,
    };
    let mut report = ValidationReport::default();
    for (key, protocol) in projection.iter() {
        matcher.validate_participant(key, protocol, &mut report);
    }
    info!(
        participants = report.witnesses.len(),
        conformant = report.is_conformant(),
        "validated implementation",
    );
    Ok(report)
}

/// Participant classes and channel fields of an implementation.
pub struct ChannelBindings<I: Implementation> {
    participants: HashMap<Rc<str>, I::Decl>,
    /// Channel name, then data type.
    fields: HashMap<Rc<str>, HashMap<Rc<str>, I::Field>>,
}

impl<I: Implementation> ChannelBindings<I> {
    pub fn participant(&self, name: &str) -> Option<&I::Decl> {
        self.participants.get(name)
    }

    pub fn field(&self, channel: &str, data_type: &str) -> Option<&I::Field> {
        self.fields.get(channel)?.get(data_type)
    }
}

/// Binds the participants and channels of `global` to the implementation.
///
/// A channel carrying a data type is bound to the first field of that type
/// found in the receiving class, falling back to the sending class. The first
/// communication to bind a channel and data type pair decides the field.
pub fn bind_channels<I: Implementation>(
    imp: &I,
    global: &GlobalTypeDecl,
) -> Result<ChannelBindings<I>, Error> {
    let mut binder = Binder {
        imp,
        bindings: ChannelBindings {
            participants: HashMap::new(),
            fields: HashMap::new(),
        },
    };
    binder.bind_list(&global.body)?;
    Ok(binder.bindings)
}

struct Binder<'i, I: Implementation> {
    imp: &'i I,
    bindings: ChannelBindings<I>,
}

impl<I: Implementation> Binder<'_, I> {
    fn bind_list(&mut self, list: &ExprList) -> Result<(), Error> {
        for expr in &list.exprs {
            match expr {
                Expr::Communication(comm) => self.bind_communication(comm)?,
                Expr::Splice(global) => self.bind_list(&global.body)?,
                Expr::ForEach(for_each) => self.bind_list(&for_each.body)?,
                Expr::Rec(rec) => self.bind_list(&rec.body)?,
                Expr::Con(_) => {}
            }
        }
        Ok(())
    }

    fn bind_communication(&mut self, comm: &CommunicationExpr) -> Result<(), Error> {
        let sender = self.participant(&comm.sender.decl.name)?;
        let receiver = self.participant(&comm.receiver.decl.name)?;
        let data_type = &comm.data_type;
        if self.imp.resolve_declaration(data_type).is_none() {
            return Err(Error::Unresolved {
                kind: "data type",
                name: Rc::clone(data_type),
            });
        }

        let channel = &comm.channel.decl.name;
        if self.bindings.field(channel, data_type).is_some() {
            return Ok(());
        }
        let field = self
            .imp
            .find_field(&receiver, data_type)
            .or_else(|| self.imp.find_field(&sender, data_type))
            .ok_or_else(|| Error::NoChannelField {
                channel: Rc::clone(channel),
                data_type: Rc::clone(data_type),
                sender: Rc::clone(&comm.sender.decl.name),
                receiver: Rc::clone(&comm.receiver.decl.name),
            })?;
        debug!(%channel, %data_type, "bound channel");
        self.bindings
            .fields
            .entry(Rc::clone(channel))
            .or_default()
            .insert(Rc::clone(data_type), field);
        Ok(())
    }

    fn participant(&mut self, name: &Rc<str>) -> Result<I::Decl, Error> {
        if let Some(class) = self.bindings.participants.get(name) {
            return Ok(class.clone());
        }
        let class = self
            .imp
            .resolve_declaration(name)
            .ok_or_else(|| Error::Unresolved {
                kind: "participant",
                name: Rc::clone(name),
            })?;
        self.bindings
            .participants
            .insert(Rc::clone(name), class.clone());
        Ok(class)
    }
}

struct Matcher<'a, I: Implementation> {
    imp: &'a I,
    bindings: &'a ChannelBindings<I>,
    options: &'a Options,
}

enum Scan {
    /// The protocol was fully consumed, with this many statements left over
    /// in the scanned body.
    Complete { trailing: usize },
    /// The body ran out of statements first.
    Exhausted,
}

impl<I: Implementation> Matcher<'_, I> {
    fn validate_participant(
        &self,
        key: &ParticipantKey,
        protocol: &LocalProtocol,
        report: &mut ValidationReport,
    ) {
        report.witnesses.insert(key.clone(), None);
        let (Some(class), Some(head)) = (
            self.bindings.participant(&key.name),
            protocol.actions().first(),
        ) else {
            return;
        };

        let mut candidates = self
            .imp
            .find_members_using_type(class, &head.message().data_type);
        if self.options.method_order == MethodOrder::Reverse {
            candidates.reverse();
        }

        for method in candidates {
            let name = self.imp.method_name(&method);
            let Some(body) = self.imp.method_body(&method) else {
                warn!(participant = %key, method = %name, "skipping method without a body");
                continue;
            };
            let outcome = self.match_body(&body, protocol);
            debug!(participant = %key, method = %name, ?outcome, "matched method");

            if let Outcome::Conforms { trailing } = outcome {
                if trailing > 0 {
                    warn!(
                        participant = %key,
                        method = %name,
                        trailing,
                        "statements left after the protocol completed",
                    );
                }
            }
            let conforms = outcome.is_conforming();
            report.attempts.push(Attempt {
                participant: key.clone(),
                method: name.clone(),
                outcome,
            });
            if conforms {
                report.witnesses.insert(key.clone(), Some(name));
                break;
            }
        }
    }

    fn match_body(&self, body: &I::Body, protocol: &LocalProtocol) -> Outcome {
        let mut cursor = protocol.cursor();
        let mut stack = vec![body.clone()];
        match self.scan(body, &mut cursor, &mut stack) {
            Scan::Complete { trailing } => Outcome::Conforms { trailing },
            Scan::Exhausted => match cursor.current() {
                Some(expected) => Outcome::Mismatch {
                    consumed: cursor.consumed(),
                    expected: expected.clone(),
                },
                None => Outcome::Conforms { trailing: 0 },
            },
        }
    }

    /// Scans the statements of `body`, consuming matching actions. Calls that
    /// don't match directly are scanned in place with the same cursor; the
    /// actions they consume stay consumed even if the protocol doesn't
    /// complete inside them.
    fn scan(&self, body: &I::Body, cursor: &mut Cursor<'_>, stack: &mut Vec<I::Body>) -> Scan {
        let stmts = self.imp.statement_children(body);
        for (pos, stmt) in stmts.iter().enumerate() {
            let Some(action) = cursor.current() else {
                return Scan::Complete {
                    trailing: stmts.len() - pos,
                };
            };
            if self.matches(stmt, action) {
                cursor.advance();
                continue;
            }

            let Some(callee) = self.imp.callee_body_of(stmt) else {
                continue;
            };
            if stack.len() > self.options.max_call_depth || stack.contains(&callee) {
                trace!(depth = stack.len(), "not inlining call");
                continue;
            }
            stack.push(callee.clone());
            let scan = self.scan(&callee, cursor, stack);
            stack.pop();
            if let Scan::Complete { trailing } = scan {
                return Scan::Complete {
                    trailing: trailing + stmts.len() - pos - 1,
                };
            }
        }
        if cursor.is_done() {
            Scan::Complete { trailing: 0 }
        } else {
            Scan::Exhausted
        }
    }

    fn matches(&self, stmt: &I::Stmt, action: &Action) -> bool {
        let message = action.message();
        let Some(field) = self.bindings.field(&message.channel, &message.data_type) else {
            return false;
        };
        match action {
            Action::Send(_) => {
                self.imp
                    .is_assignment_of_type_to_field(stmt, field, &message.data_type)
            }
            Action::Receive(_) => self.imp.is_wait_loop_on_field(stmt, field),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The method consumed the whole protocol.
    Conforms { trailing: usize },
    /// The method ran out of statements after consuming `consumed` actions.
    Mismatch { consumed: usize, expected: Action },
}

impl Outcome {
    pub fn is_conforming(&self) -> bool {
        matches!(self, Outcome::Conforms { .. })
    }
}

/// One method tried against one participant's protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub participant: ParticipantKey,
    pub method: String,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    witnesses: BTreeMap<ParticipantKey, Option<String>>,
    attempts: Vec<Attempt>,
}

impl ValidationReport {
    /// Every validated participant with the method that conforms to its
    /// protocol, if any.
    pub fn witnesses(&self) -> impl Iterator<Item = (&ParticipantKey, Option<&str>)> {
        self.witnesses
            .iter()
            .map(|(key, method)| (key, method.as_deref()))
    }

    pub fn witness(&self, key: &ParticipantKey) -> Option<&str> {
        self.witnesses.get(key)?.as_deref()
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn attempts_of<'a>(&'a self, key: &ParticipantKey) -> impl Iterator<Item = &'a Attempt> {
        let key = key.clone();
        self.attempts
            .iter()
            .filter(move |attempt| attempt.participant == key)
    }

    /// Participants each method conforms for.
    pub fn successes(&self) -> BTreeMap<&str, Vec<&ParticipantKey>> {
        self.group_by_method(Outcome::is_conforming)
    }

    /// Participants each method was tried for without conforming.
    pub fn failures(&self) -> BTreeMap<&str, Vec<&ParticipantKey>> {
        self.group_by_method(|outcome| !outcome.is_conforming())
    }

    pub fn nonconforming(&self) -> impl Iterator<Item = &ParticipantKey> {
        self.witnesses
            .iter()
            .filter(|(_, method)| method.is_none())
            .map(|(key, _)| key)
    }

    pub fn is_conformant(&self) -> bool {
        self.nonconforming().next().is_none()
    }

    fn group_by_method(&self, f: impl Fn(&Outcome) -> bool) -> BTreeMap<&str, Vec<&ParticipantKey>> {
        let mut groups: BTreeMap<&str, Vec<&ParticipantKey>> = BTreeMap::new();
        for attempt in self.attempts.iter().filter(|attempt| f(&attempt.outcome)) {
            groups
                .entry(&attempt.method)
                .or_default()
                .push(&attempt.participant);
        }
        groups
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{kind} `{name}` has no declaration in the implementation")]
    Unresolved { kind: &'static str, name: Rc<str> },
    #[error(
        "no field of type `{data_type}` for channel `{channel}` in `{receiver}` or `{sender}`"
    )]
    NoChannelField {
        channel: Rc<str>,
        data_type: Rc<str>,
        sender: Rc<str>,
        receiver: Rc<str>,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        model::Program, parser::parse_choreography, projection::Message, projector,
        symbol_table::SymbolTable, util::fmt::tree,
    };

    fn compile(src: &str) -> (SymbolTable, Projection) {
        let table = parse_choreography(src, &mut Vec::new()).unwrap();
        let projection = projector::project(&table).unwrap();
        (table, projection)
    }

    fn run(src: &str, model: &str, options: &Options) -> Result<ValidationReport, Error> {
        let (table, projection) = compile(src);
        let program = Program::from_json(model).unwrap();
        validate(&program, table.root().unwrap(), &projection, options)
    }

    fn key(name: &str, index: usize) -> ParticipantKey {
        ParticipantKey::new(name, index)
    }

    fn report_string(report: &ValidationReport) -> String {
        let mut buf = Vec::new();
        tree::print_report(&mut buf, report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    static RING: &str = include_str!("../demos/ring.cor");
    static RING_MODEL: &str = include_str!("../demos/ring.json");
    static PURCHASE: &str = include_str!("../demos/purchase.cor");
    static PURCHASE_MODEL: &str = include_str!("../demos/purchase.json");

    #[test]
    fn test_ring_conforms() {
        let report = run(RING, RING_MODEL, &Options::default()).unwrap();
        assert!(report.is_conformant());
        assert_eq!(
            report_string(&report),
            indoc::indoc! {"
                Process[0]: conforms via Process.sendThenReceive
                  Process.sendThenReceive: conforms
                Process[1]: conforms via Process.receiveThenSend
                  Process.sendThenReceive: mismatch after 1 actions, expected !C[2]<Ping>
                  Process.receiveThenSend: conforms
                Process[2]: conforms via Process.receiveThenSend
                  Process.sendThenReceive: mismatch after 1 actions, expected !C[3]<Ping>
                  Process.receiveThenSend: conforms
                Process[3]: conforms via Process.receiveThenSend
                  Process.sendThenReceive: mismatch after 1 actions, expected !C[0]<Ping>
                  Process.receiveThenSend: conforms
            "},
        );
        assert_eq!(
            report.successes(),
            BTreeMap::from([
                ("Process.receiveThenSend", vec![&key("Process", 1), &key("Process", 2), &key("Process", 3)]),
                ("Process.sendThenReceive", vec![&key("Process", 0)]),
            ]),
        );
        assert_eq!(
            report.failures(),
            BTreeMap::from([(
                "Process.sendThenReceive",
                vec![&key("Process", 1), &key("Process", 2), &key("Process", 3)],
            )]),
        );
    }

    #[test]
    fn test_declaration_order() {
        let options = Options {
            method_order: MethodOrder::Declaration,
            ..Options::default()
        };
        let report = run(RING, RING_MODEL, &options).unwrap();
        assert!(report.is_conformant());

        let p0 = key("Process", 0);
        let attempts: Vec<_> = report.attempts_of(&p0).map(|a| a.method.as_str()).collect();
        assert_eq!(
            attempts,
            ["Process.pingMe", "Process.receiveThenSend", "Process.sendThenReceive"],
        );
        assert_eq!(report.witness(&p0), Some("Process.sendThenReceive"));

        let p1 = key("Process", 1);
        let first = report.attempts_of(&p1).next().unwrap();
        assert_eq!(
            first.outcome,
            Outcome::Mismatch {
                consumed: 0,
                expected: Action::Receive(Message {
                    channel: "C".into(),
                    channel_index: 1,
                    data_type: "Ping".into(),
                }),
            },
        );
        assert_eq!(report.witness(&p1), Some("Process.receiveThenSend"));
    }

    #[test]
    fn test_call_depth_limits_inlining() {
        let options = Options {
            max_call_depth: 0,
            ..Options::default()
        };
        let report = run(RING, RING_MODEL, &options).unwrap();
        assert!(!report.is_conformant());
        let nonconforming: Vec<_> = report.nonconforming().map(ToString::to_string).collect();
        assert_eq!(nonconforming, ["Process[0]", "Process[1]", "Process[2]", "Process[3]"]);
    }

    #[test]
    fn test_trailing_statements_still_conform() {
        let report = run(PURCHASE, PURCHASE_MODEL, &Options::default()).unwrap();
        assert!(report.is_conformant());
        assert_eq!(
            report_string(&report),
            indoc::indoc! {"
                Buyer[1]: conforms via Buyer.purchase
                  Buyer.purchase: conforms
                Seller[1]: conforms via Seller.serve
                  Seller.serve: conforms (1 trailing statements)
            "},
        );
    }

    #[test]
    fn test_trailing_statements_count_inlined_calls() {
        let src = "
            Participant A {1}
            Participant B {1}
            Channel C {1}
            G = A -> B : C <T> end
        ";
        let model = r#"{
            "types": ["T"],
            "classes": [
                { "name": "A", "methods": [
                    { "name": "send", "body": [
                        { "assign": { "field": "B.slot", "ty": "T" } },
                        { "other": "flush" },
                        { "other": "log" }
                    ] },
                    { "name": "run", "body": [
                        { "call": { "method": "send" } },
                        { "other": "return" }
                    ] }
                ] },
                { "name": "B", "fields": [{ "name": "slot", "ty": "T" }], "methods": [
                    { "name": "receive", "body": [{ "wait": { "field": "slot" } }] }
                ] }
            ]
        }"#;
        let report = run(src, model, &Options::default()).unwrap();
        let a = key("A", 1);
        assert_eq!(report.witness(&a), Some("A.run"));
        let attempt = report.attempts_of(&a).next().unwrap();
        assert_eq!(attempt.outcome, Outcome::Conforms { trailing: 3 });
    }

    #[test]
    fn test_out_of_order_implementation() {
        let model = r#"{
            "types": ["Request", "Quote", "Order"],
            "classes": [
                {
                    "name": "Buyer",
                    "fields": [{ "name": "quote", "ty": "Quote" }],
                    "methods": [{
                        "name": "purchase",
                        "body": [
                            { "assign": { "field": "Seller.request", "ty": "Request" } },
                            { "assign": { "field": "Seller.order", "ty": "Order" } },
                            { "wait": { "field": "quote" } }
                        ]
                    }]
                },
                {
                    "name": "Seller",
                    "fields": [
                        { "name": "request", "ty": "Request" },
                        { "name": "order", "ty": "Order" }
                    ],
                    "methods": [{
                        "name": "serve",
                        "body": [
                            { "wait": { "field": "request" } },
                            { "assign": { "field": "Buyer.quote", "ty": "Quote" } },
                            { "wait": { "field": "order" } }
                        ]
                    }]
                }
            ]
        }"#;
        let report = run(PURCHASE, model, &Options::default()).unwrap();
        assert!(!report.is_conformant());
        assert_eq!(report.witness(&key("Buyer", 1)), None);
        assert_eq!(report.witness(&key("Seller", 1)), Some("Seller.serve"));
        assert_eq!(
            report.failures(),
            BTreeMap::from([("Buyer.purchase", vec![&key("Buyer", 1)])]),
        );
        let attempt = report.attempts_of(&key("Buyer", 1)).next().unwrap();
        assert_eq!(
            attempt.outcome,
            Outcome::Mismatch {
                consumed: 2,
                expected: Action::Send(Message {
                    channel: "Orders".into(),
                    channel_index: 1,
                    data_type: "Order".into(),
                }),
            },
        );
    }

    #[test]
    fn test_recursive_calls_terminate() {
        let src = "
            Participant A {1}
            Participant B {1}
            Channel C {1}
            G = A -> B : C <T> . A -> B : C <T> end
        ";
        let model = r#"{
            "types": ["T"],
            "classes": [
                { "name": "A", "methods": [
                    { "name": "send", "body": [
                        { "assign": { "field": "B.slot", "ty": "T" } },
                        { "call": { "method": "send" } }
                    ] }
                ] },
                { "name": "B", "fields": [{ "name": "slot", "ty": "T" }], "methods": [
                    { "name": "ping", "body": [{ "call": { "method": "pong" } }, { "wait": { "field": "slot" } }] },
                    { "name": "pong", "body": [{ "call": { "method": "ping" } }, { "wait": { "field": "slot" } }] }
                ] }
            ]
        }"#;
        let report = run(src, model, &Options::default()).unwrap();
        // `send` can't re-enter itself, so it only sends once.
        assert_eq!(report.witness(&key("A", 1)), None);
        // `pong` inlines `ping`, which can't re-enter `pong`. Their two waits
        // cover both receives.
        assert_eq!(report.witness(&key("B", 1)), Some("B.pong"));
    }

    #[test]
    fn test_binding_errors() {
        let src = "
            Participant A {1}
            Participant B {1}
            Channel C {1}
            G = A -> B : C <T> end
        ";
        let missing_class = r#"{ "types": ["T"], "classes": [{ "name": "A" }] }"#;
        assert_eq!(
            run(src, missing_class, &Options::default()).err(),
            Some(Error::Unresolved {
                kind: "participant",
                name: "B".into(),
            }),
        );

        let missing_type = r#"{ "classes": [{ "name": "A" }, { "name": "B" }] }"#;
        assert_eq!(
            run(src, missing_type, &Options::default()).err(),
            Some(Error::Unresolved {
                kind: "data type",
                name: "T".into(),
            }),
        );

        let missing_field = r#"{ "types": ["T"], "classes": [{ "name": "A" }, { "name": "B" }] }"#;
        let error = run(src, missing_field, &Options::default()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "no field of type `T` for channel `C` in `B` or `A`",
        );
    }

    #[test]
    fn test_channel_falls_back_to_sender_field() {
        let src = "
            Participant A {1}
            Participant B {1}
            Channel C {1}
            G = A -> B : C <T> end
        ";
        let model = r#"{
            "types": ["T"],
            "classes": [
                { "name": "A", "fields": [{ "name": "outbox", "ty": "T" }], "methods": [
                    { "name": "send", "body": [{ "assign": { "field": "outbox", "ty": "T" } }] }
                ] },
                { "name": "B", "methods": [
                    { "name": "receive", "body": [{ "wait": { "field": "A.outbox" } }] }
                ] }
            ]
        }"#;
        let report = run(src, model, &Options::default()).unwrap();
        assert!(report.is_conformant());
    }

    #[test]
    fn test_validation_is_deterministic() {
        let first = run(RING, RING_MODEL, &Options::default()).unwrap();
        let second = run(RING, RING_MODEL, &Options::default()).unwrap();
        assert_eq!(first, second);
    }
}
