//! Recording slot
//!
//! At most one recording may be in flight per camera platform. A
//! [`RecordingSlot`] is that platform-wide claim: a recorder takes it on
//! start and the returned [`RecordingClaim`] gives it back when dropped.
//! Real hardware shares [`RecordingSlot::global`]; a synthetic backend
//! owns its own slot so independent fake platforms do not contend.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct RecordingSlot {
    holder: Arc<Mutex<Option<Uuid>>>,
}

impl RecordingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot shared by every native stream
    pub fn global() -> RecordingSlot {
        static GLOBAL: OnceLock<RecordingSlot> = OnceLock::new();
        GLOBAL.get_or_init(RecordingSlot::new).clone()
    }

    /// Take the slot for recording `id`.
    ///
    /// Fails with the current holder's id when another recording has it.
    pub fn claim(&self, id: Uuid) -> Result<RecordingClaim, Uuid> {
        let mut holder = self.holder.lock();
        if let Some(current) = *holder {
            return Err(current);
        }
        *holder = Some(id);
        Ok(RecordingClaim {
            slot: self.clone(),
            id,
        })
    }

    /// Recording currently holding the slot
    pub fn holder(&self) -> Option<Uuid> {
        *self.holder.lock()
    }
}

/// Held for the lifetime of one recording; releases the slot on drop
#[derive(Debug)]
pub struct RecordingClaim {
    slot: RecordingSlot,
    id: Uuid,
}

impl RecordingClaim {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for RecordingClaim {
    fn drop(&mut self) {
        let mut holder = self.slot.holder.lock();
        if *holder == Some(self.id) {
            *holder = None;
        }
    }
}
