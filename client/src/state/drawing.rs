//! Shared canvas snapshot and late-join answers.

#[cfg(test)]
#[path = "drawing_test.rs"]
mod drawing_test;

use std::collections::HashSet;

use frames::model::{DrawingData, DrawingSync, DrawingUpdate, SocketId};

#[derive(Clone, Debug, Default)]
pub struct DrawingReplica {
    snapshot: Option<DrawingData>,
    /// Requesters already answered, so a repeated request gets one reply.
    answered: HashSet<SocketId>,
}

impl DrawingReplica {
    #[must_use]
    pub fn snapshot(&self) -> Option<&DrawingData> {
        self.snapshot.as_ref()
    }

    /// Replace the local canvas and produce the live update to broadcast.
    pub fn set_local(&mut self, data: DrawingData) -> DrawingUpdate {
        self.snapshot = Some(data.clone());
        DrawingUpdate { snapshot: data }
    }

    pub fn apply_update(&mut self, update: DrawingUpdate) {
        self.snapshot = Some(update.snapshot);
    }

    /// Late-join answer from a peer. Last one received wins.
    pub fn apply_sync(&mut self, sync: DrawingSync) {
        self.snapshot = Some(sync.drawing_data);
    }

    /// Answer a peer's request, at most once per requester and only when
    /// there is something to send.
    pub fn respond_to(&mut self, requester: &SocketId) -> Option<DrawingSync> {
        let data = self.snapshot.clone()?;
        if !self.answered.insert(requester.clone()) {
            return None;
        }
        Some(DrawingSync { socket_id: Some(requester.clone()), drawing_data: data })
    }

    /// Drop answer bookkeeping for a peer that left.
    pub fn forget(&mut self, socket_id: &SocketId) {
        self.answered.remove(socket_id);
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
        self.answered.clear();
    }
}
