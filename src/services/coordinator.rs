use std::{collections::HashSet, sync::Mutex};

/// In-process registry enforcing at most one in-flight renewal per order
/// code. Webhook deliveries and batch retries both go through here; a second
/// request for a code already being processed is coalesced, never run
/// concurrently. The registry is injectable state, not a process-wide
/// static.
#[derive(Debug, Default)]
pub struct RenewalCoordinator {
    in_flight: Mutex<HashSet<String>>,
}

impl RenewalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `order_code`. Returns a guard when this caller owns processing;
    /// `None` when a task for the code is already in flight. The guard
    /// clears the entry on drop, so completion and failure both release the
    /// code, never a silent leak.
    pub fn begin(&self, order_code: &str) -> Option<TaskGuard<'_>> {
        let mut in_flight = self.in_flight.lock().expect("coordinator lock poisoned");
        if !in_flight.insert(order_code.to_string()) {
            return None;
        }
        Some(TaskGuard {
            coordinator: self,
            order_code: order_code.to_string(),
        })
    }

    pub fn is_in_flight(&self, order_code: &str) -> bool {
        self.in_flight
            .lock()
            .expect("coordinator lock poisoned")
            .contains(order_code)
    }

    fn finish(&self, order_code: &str) {
        self.in_flight
            .lock()
            .expect("coordinator lock poisoned")
            .remove(order_code);
    }
}

pub struct TaskGuard<'a> {
    coordinator: &'a RenewalCoordinator,
    order_code: String,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.finish(&self.order_code);
    }
}
