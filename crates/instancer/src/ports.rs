//! Host port allocation for container port bindings

use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::Mutex;
use tracing::debug;

/// Best-effort allocator over a configured host port range.
///
/// A reserved set prevents concurrent starts from double-allocating, and a
/// bind probe skips ports already held by live containers or other
/// processes. The window between probe and the container actually binding
/// is not closed; an unrelated process can still steal a port there.
pub struct PortAllocator {
    start: u16,
    end: u16,
    inner: Mutex<AllocatorState>,
}

struct AllocatorState {
    reserved: HashSet<u16>,
    cursor: u16,
}

impl PortAllocator {
    pub fn new(start: u16, end: u16) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            inner: Mutex::new(AllocatorState {
                reserved: HashSet::new(),
                cursor: start,
            }),
        }
    }

    /// Reserve `n` free host ports; `None` when the range is exhausted
    pub fn reserve(&self, n: usize) -> Option<Vec<u16>> {
        if n == 0 {
            return Some(vec![]);
        }

        let mut state = self.inner.lock().expect("port allocator lock poisoned");
        let span = (self.end - self.start) as usize + 1;
        let mut picked = Vec::with_capacity(n);
        let mut candidate = state.cursor;

        for _ in 0..span {
            if !state.reserved.contains(&candidate) && Self::probe(candidate) {
                picked.push(candidate);
                state.reserved.insert(candidate);
                if picked.len() == n {
                    state.cursor = Self::next_in_range(candidate, self.start, self.end);
                    debug!(ports = ?picked, "Reserved host ports");
                    return Some(picked);
                }
            }
            candidate = Self::next_in_range(candidate, self.start, self.end);
        }

        // Not enough free ports; roll back the partial reservation
        for port in picked {
            state.reserved.remove(&port);
        }
        None
    }

    /// Return ports to the pool after teardown or a failed start
    pub fn release(&self, ports: &[u16]) {
        let mut state = self.inner.lock().expect("port allocator lock poisoned");
        for port in ports {
            state.reserved.remove(port);
        }
    }

    pub fn reserved_count(&self) -> usize {
        self.inner
            .lock()
            .expect("port allocator lock poisoned")
            .reserved
            .len()
    }

    fn next_in_range(port: u16, start: u16, end: u16) -> u16 {
        if port >= end {
            start
        } else {
            port + 1
        }
    }

    fn probe(port: u16) -> bool {
        TcpListener::bind(("127.0.0.1", port)).is_ok()
    }
}
