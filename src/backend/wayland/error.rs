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

//! wayland backend errors.

use smithay_client_toolkit::reexports::client::globals::BindError;
use std::{error::Error as StdError, fmt, sync::Arc};

use crate::error::ErrorString;

#[derive(Debug, Clone)]
pub enum Error {
    /// A wayland global either doesn't exist, or doesn't support the version we need.
    Bind {
        name: String,
        inner: Arc<BindError>,
    },
    /// Input the seat could not take, such as an unreadable keymap.
    Input(crate::Error),
    String(ErrorString),
}

impl Error {
    pub fn bind(name: impl Into<String>, inner: BindError) -> Self {
        Error::Bind {
            name: name.into(),
            inner: Arc::new(inner),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Error::String(ErrorString::from(s))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Bind { name, inner } => write!(f, "{name} failed to bind: {inner}"),
            Self::Input(e) => write!(f, "{e}"),
            Self::String(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Bind { inner, .. } => Some(&**inner),
            Self::Input(e) => Some(e),
            Self::String(e) => Some(e),
        }
    }
}

impl From<crate::Error> for Error {
    fn from(err: crate::Error) -> Self {
        Self::Input(err)
    }
}
