//! Finite handle table and scoped node handles.
//!
//! The table models the fixed-size handle table of the underlying store.
//! A [`NodeRef`] owns one slot and gives it back when dropped, so every
//! exit path (including `?` early returns) releases exactly once.

use crate::mesh_error::CgnsError;
use crate::node::label::Label;
use crate::node::tree::NodeId;
use parking_lot::Mutex;

/// Default number of simultaneously open handles per file.
pub const DEFAULT_HANDLE_CAPACITY: usize = 4096;

/// Slot allocator for node handles.
#[derive(Debug)]
pub struct HandleTable {
    capacity: usize,
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    free: Vec<usize>,
    next: usize,
    open: usize,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(SlotState::default()),
        }
    }

    /// Table capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of handles currently open.
    pub fn open(&self) -> usize {
        self.state.lock().open
    }

    fn acquire(&self) -> Result<usize, CgnsError> {
        let mut st = self.state.lock();
        let slot = match st.free.pop() {
            Some(slot) => slot,
            None if st.next < self.capacity => {
                st.next += 1;
                st.next - 1
            }
            None => {
                return Err(CgnsError::HandleTableExhausted {
                    capacity: self.capacity,
                });
            }
        };
        st.open += 1;
        Ok(slot)
    }

    fn release(&self, slot: usize) {
        let mut st = self.state.lock();
        debug_assert!(!st.free.contains(&slot), "handle slot {slot} released twice");
        st.free.push(slot);
        st.open -= 1;
    }

    /// Open a handle on `id`.
    pub(crate) fn handle<'t>(
        &'t self,
        id: NodeId,
        name: &str,
        label: &Label,
    ) -> Result<NodeRef<'t>, CgnsError> {
        let slot = self.acquire()?;
        Ok(NodeRef {
            table: self,
            slot,
            id,
            name: name.to_string(),
            label: label.clone(),
        })
    }
}

/// Scoped handle on one node: id + label + name.
///
/// Released on drop.
#[derive(Debug)]
pub struct NodeRef<'t> {
    table: &'t HandleTable,
    slot: usize,
    id: NodeId,
    name: String,
    label: Label,
}

impl NodeRef<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// `true` if this node carries `label`.
    pub fn is(&self, label: &Label) -> bool {
        &self.label == label
    }
}

impl Drop for NodeRef<'_> {
    fn drop(&mut self) {
        self.table.release(self.slot);
    }
}
