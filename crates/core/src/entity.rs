//! Entities: records whose identity outlives edits (e.g. a client whose
//! address changes is still the same client).

pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Identity comparison, ignoring every other attribute.
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
