// Copyright 2022 The Strata Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Values stored at area paths: raw bytes or an encoded string view.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;

use bstr::ByteSlice as _;

/// Character encoding of an encoded-string content.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Encoding {
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl Encoding {
    /// Encodes `value` under this encoding.
    pub fn encode(self, value: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => value.as_bytes().to_vec(),
            Self::Utf16Be => value
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect(),
            Self::Utf16Le => value
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
        }
    }
}

/// A content value. Immutable once placed in a snapshot.
///
/// Every content can be read as a byte sequence; the conversion borrows the
/// underlying storage whenever the representations coincide.
#[derive(Clone)]
pub enum Content {
    /// An opaque byte sequence.
    Bytes(Arc<[u8]>),
    /// A string carrying the encoding its byte form is produced under.
    EncodedString { value: String, encoding: Encoding },
}

impl Content {
    /// Creates a raw byte content.
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Creates a UTF-8 encoded-string content.
    pub fn string(value: impl Into<String>) -> Self {
        Self::EncodedString {
            value: value.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// Creates an encoded-string content under the given encoding.
    pub fn encoded_string(value: impl Into<String>, encoding: Encoding) -> Self {
        Self::EncodedString {
            value: value.into(),
            encoding,
        }
    }

    /// The byte form of this content. UTF-8 strings and raw bytes return
    /// their backing storage unchanged; other encodings encode on demand.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Bytes(bytes) => Cow::Borrowed(bytes),
            Self::EncodedString {
                value,
                encoding: Encoding::Utf8,
            } => Cow::Borrowed(value.as_bytes()),
            Self::EncodedString { value, encoding } => Cow::Owned(encoding.encode(value)),
        }
    }

    /// A string view of this content, if one exists without re-decoding:
    /// the stored string of an encoded-string content, or a byte content
    /// that happens to be valid UTF-8.
    pub fn try_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            Self::EncodedString { value, .. } => Some(value),
        }
    }
}

// Contents compare by their byte form; an encoded string is equal to the raw
// bytes it encodes to.
impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Content {}

impl Debug for Content {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({:?})", bytes.as_bstr()),
            Self::EncodedString { value, encoding } => {
                write!(f, "EncodedString({value:?}, {encoding:?})")
            }
        }
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<&[u8]> for Content {
    fn from(value: &[u8]) -> Self {
        Self::bytes(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Self::bytes(value)
    }
}

/// Produces the content instances a checkout places into a fresh area.
pub type ContentFactory = dyn Fn(&[u8]) -> Content + Send + Sync;

/// Factory producing raw byte contents. The default.
pub fn bytes_content(bytes: &[u8]) -> Content {
    Content::bytes(bytes)
}

/// Factory producing UTF-8 encoded-string contents, falling back to raw
/// bytes where the input is not valid UTF-8.
pub fn utf8_content(bytes: &[u8]) -> Content {
    match std::str::from_utf8(bytes) {
        Ok(value) => Content::string(value),
        Err(_) => Content::bytes(bytes),
    }
}
