//! Local protocols: the per participant instance view of a global type.

use std::{collections::BTreeMap, fmt, rc::Rc};

/// A concrete participant instance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantKey {
    pub name: Rc<str>,
    pub index: usize,
}

impl ParticipantKey {
    pub fn new(name: impl Into<Rc<str>>, index: usize) -> ParticipantKey {
        ParticipantKey {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub channel: Rc<str>,
    pub channel_index: usize,
    pub data_type: Rc<str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Send(Message),
    Receive(Message),
}

impl Action {
    pub fn message(&self) -> &Message {
        match self {
            Action::Send(message) | Action::Receive(message) => message,
        }
    }

    pub fn is_send(&self) -> bool {
        matches!(self, Action::Send(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = if self.is_send() { '!' } else { '?' };
        let Message {
            channel,
            channel_index,
            data_type,
        } = self.message();
        write!(f, "{sigil}{channel}[{channel_index}]<{data_type}>")
    }
}

/// The ordered actions of a single participant instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalProtocol {
    actions: Vec<Action>,
}

impl LocalProtocol {
    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns a cursor positioned at the first action.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            actions: &self.actions,
            pos: 0,
        }
    }
}

/// A forward-only position inside a [`LocalProtocol`].
#[derive(Clone, Debug)]
pub struct Cursor<'p> {
    actions: &'p [Action],
    pos: usize,
}

impl<'p> Cursor<'p> {
    pub fn current(&self) -> Option<&'p Action> {
        self.actions.get(self.pos)
    }

    pub fn advance(&mut self) {
        if self.pos < self.actions.len() {
            self.pos += 1;
        }
    }

    /// Number of actions already consumed.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn is_done(&self) -> bool {
        self.pos == self.actions.len()
    }
}

/// Local protocols of every participant instance that takes part in a global
/// type, ordered by [`ParticipantKey`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    protocols: BTreeMap<ParticipantKey, LocalProtocol>,
}

impl Projection {
    pub(crate) fn protocol_mut(&mut self, key: ParticipantKey) -> &mut LocalProtocol {
        self.protocols.entry(key).or_default()
    }

    pub fn get(&self, key: &ParticipantKey) -> Option<&LocalProtocol> {
        self.protocols.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantKey, &LocalProtocol)> {
        self.protocols.iter()
    }

    /// Number of participant instances.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.protocols.values().map(LocalProtocol::len).sum()
    }
}
