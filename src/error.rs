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

//! Seat and device errors.
//!
//! None of these cross the notification dispatch boundary: [`Seat::dispatch`]
//! logs them and drops the offending notification.
//!
//! [`Seat::dispatch`]: crate::Seat::dispatch

use std::{error::Error as StdError, fmt, sync::Arc};

use crate::tablet::{TabletId, ToolId};
use crate::touch::TouchId;
use crate::window::WindowId;

#[derive(Debug, Clone)]
pub enum Error {
    /// A notification referenced a window that is not (or no longer) live.
    UnknownWindow(WindowId),
    /// A notification referenced a touch sequence that is not in the slot table.
    UnknownTouch(TouchId),
    /// A touch-down reused the id of a contact that is still live.
    DuplicateTouch(TouchId),
    UnknownTablet(TabletId),
    UnknownTool(ToolId),
    /// The seat has no device for the requested capability.
    NoDevice(&'static str),
    /// Scheduling a timer failed. Only that one scheduling attempt is lost.
    Timer(Arc<dyn StdError + 'static>),
    /// The compositor sent a keymap we could not load.
    Keymap(ErrorString),
    Io(Arc<std::io::Error>),
    String(ErrorString),
}

impl Error {
    pub fn timer(e: impl StdError + 'static) -> Self {
        Self::Timer(Arc::new(e))
    }

    pub fn keymap(s: impl Into<String>) -> Self {
        Error::Keymap(ErrorString::from(s))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Error::String(ErrorString::from(s))
    }

    /// Whether this error is a protocol inconsistency, which is expected
    /// from racy compositors and only worth a warning.
    pub fn is_protocol_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::UnknownWindow(_)
                | Self::UnknownTouch(_)
                | Self::DuplicateTouch(_)
                | Self::UnknownTablet(_)
                | Self::UnknownTool(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::UnknownWindow(id) => write!(f, "unknown window {id:?}"),
            Self::UnknownTouch(id) => write!(f, "unknown touch sequence {id:?}"),
            Self::DuplicateTouch(id) => write!(f, "touch sequence {id:?} is already live"),
            Self::UnknownTablet(id) => write!(f, "unknown tablet {id:?}"),
            Self::UnknownTool(id) => write!(f, "unknown tablet tool {id:?}"),
            Self::NoDevice(kind) => write!(f, "the seat has no {kind} device"),
            Self::Timer(e) => write!(f, "failed to schedule a timer: {e}"),
            Self::Keymap(e) => write!(f, "failed to load keymap: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::String(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Timer(e) => Some(&**e),
            Self::Keymap(e) => Some(e),
            Self::Io(e) => Some(&**e),
            Self::String(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

#[derive(Debug, Clone)]
pub struct ErrorString {
    details: String,
}

impl ErrorString {
    pub fn from(s: impl Into<String>) -> Self {
        Self { details: s.into() }
    }
}

impl std::fmt::Display for ErrorString {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl std::error::Error for ErrorString {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_inconsistencies_are_classified() {
        assert!(Error::UnknownTouch(TouchId(3)).is_protocol_inconsistency());
        assert!(Error::DuplicateTouch(TouchId(3)).is_protocol_inconsistency());
        assert!(!Error::NoDevice("keyboard").is_protocol_inconsistency());
        assert!(!Error::string("boom").is_protocol_inconsistency());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "gone"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "io error: gone");
    }
}
