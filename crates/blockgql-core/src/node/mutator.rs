//! Child slot mutations.
//!
//! Only object nodes have slots. The slot list is the single source of the
//! child count, so the persisted `gql_fields` attribute always matches it.

use tracing::trace;

use super::{NodeShape, QueryNode};
use crate::error::MutationError;

impl QueryNode {
    fn slots_mut(&mut self) -> Result<&mut Vec<Option<QueryNode>>, MutationError> {
        match &mut self.shape {
            NodeShape::Object { children } => Ok(children),
            NodeShape::Scalar => Err(MutationError::ScalarNode {
                field: self.field_name.clone(),
            }),
        }
    }

    /// Inserts an empty slot at `index` and returns it for the caller to fill.
    ///
    /// `index` may equal the current count to append.
    pub fn add_child(&mut self, index: usize) -> Result<&mut Option<QueryNode>, MutationError> {
        let slots = self.slots_mut()?;
        if index > slots.len() {
            return Err(MutationError::IndexOutOfRange {
                index,
                len: slots.len(),
            });
        }
        slots.insert(index, None);
        trace!(index, count = slots.len(), "Added child slot");
        Ok(&mut slots[index])
    }

    /// Removes the slot at `index`, returning whatever it held.
    ///
    /// Out-of-range indexes and scalar nodes leave the node untouched and
    /// return `None`.
    pub fn remove_child(&mut self, index: usize) -> Option<Option<QueryNode>> {
        let slots = self.slots_mut().ok()?;
        if index >= slots.len() {
            return None;
        }
        let removed = slots.remove(index);
        trace!(index, count = slots.len(), "Removed child slot");
        Some(removed)
    }

    /// Puts `child` into an existing slot, returning the previous occupant.
    pub fn set_child(
        &mut self,
        index: usize,
        child: QueryNode,
    ) -> Result<Option<QueryNode>, MutationError> {
        let slots = self.slots_mut()?;
        let len = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(MutationError::IndexOutOfRange { index, len })?;
        Ok(slot.replace(child))
    }

    /// Appends `child` in a new slot at the end.
    pub fn push_child(&mut self, child: QueryNode) -> Result<(), MutationError> {
        self.slots_mut()?.push(Some(child));
        Ok(())
    }

    /// Grows or shrinks the slot list to exactly `count` slots.
    ///
    /// New slots are empty; slots past `count` are dropped with their content.
    pub fn set_child_count(&mut self, count: usize) -> Result<(), MutationError> {
        self.slots_mut()?.resize_with(count, || None);
        Ok(())
    }
}
