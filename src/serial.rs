// Copyright 2023 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serial tracking.

use std::cell::Cell;

/// Correlates compositor serials with requests that depend on them.
///
/// Two counters live here. The transport serial is whatever the compositor
/// last handed us (requests such as "set cursor" or "set selection" must quote
/// it). The request serial is ours: it only ever grows, and grab records are
/// ordered by it.
///
/// One tracker is shared by every seat of an [`InputContext`], and goes away
/// with it.
///
/// [`InputContext`]: crate::InputContext
#[derive(Debug, Default)]
pub struct SerialTracker {
    transport: Cell<u32>,
    request: Cell<u64>,
}

impl SerialTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a serial received from the compositor.
    pub fn update(&self, serial: u32) {
        tracing::trace!("transport serial {}", serial);
        self.transport.set(serial);
    }

    /// The most recent serial received from the compositor.
    pub fn latest(&self) -> u32 {
        self.transport.get()
    }

    /// Mint a fresh request serial. The first one is 1.
    pub fn next(&self) -> u64 {
        let next = self.request.get() + 1;
        self.request.set(next);
        next
    }

    /// The last minted request serial, or 0 if none has been minted.
    pub fn current(&self) -> u64 {
        self.request.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serials_increase() {
        let serials = SerialTracker::new();
        assert_eq!(serials.current(), 0);
        let a = serials.next();
        let b = serials.next();
        assert!(b > a);
        assert_eq!(serials.current(), b);
    }

    #[test]
    fn transport_serial_is_the_last_seen() {
        let serials = SerialTracker::new();
        serials.update(40);
        serials.update(12);
        assert_eq!(serials.latest(), 12);
    }
}
