use std::collections::HashMap;

use super::action::ReducerId;
use super::machine::ReducerDef;
use super::stack::Frame;

/// Semantic callback invoked over the frames being reduced.
pub type Reducer<V> = Box<dyn Fn(&[Frame<V>]) -> V>;

/// Callback slots parallel to the machine's reduction descriptors.
///
/// The identifier map is built once at parser construction; binding resolves
/// through it instead of scanning the descriptor list per call.
pub struct Reducers<'sid, V> {
    slots: Vec<Option<Reducer<V>>>,
    index: HashMap<&'sid str, ReducerId>,
    fallback: Option<Reducer<V>>,
}

impl<'sid, V> Reducers<'sid, V>
where
    V: Default,
{
    pub(crate) fn new(defs: &'sid [ReducerDef<'sid>]) -> Self {
        Self {
            slots: defs.iter().map(|_| None).collect(),
            index: defs.iter().enumerate().map(|(slot, def)| (def.id, slot)).collect(),
            fallback: None,
        }
    }

    /// Bind a callback by identifier.
    ///
    /// Unknown identifiers are a silent no-op: the grammar may have evolved
    /// past the host's bindings, and rebinding must not fail.
    pub(crate) fn bind(&mut self, identifier: &str, f: Reducer<V>) {
        if let Some(&slot) = self.index.get(identifier) {
            self.slots[slot] = Some(f);
        }
    }

    pub(crate) fn bind_default(&mut self, f: Reducer<V>) {
        self.fallback = Some(f);
    }

    /// Synthesize the value for a reduction over `frames`.
    ///
    /// Falls back to the default handler when the slot is absent or unbound,
    /// and to `V::default()` when no default handler is installed.
    pub(crate) fn invoke(&self, reducer: Option<ReducerId>, frames: &[Frame<V>]) -> V {
        let bound = reducer
            .and_then(|slot| self.slots.get(slot))
            .and_then(|slot| slot.as_ref())
            .or(self.fallback.as_ref());

        match bound {
            Some(f) => f(frames),
            None => V::default(),
        }
    }
}
