// Copyright 2023 The Strata Authors
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

//! Interning of byte sequences, giving commits value-equality deduplication.

use std::collections::HashSet;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;
use std::sync::Mutex;

/// Content-addressed interning store for byte sequences.
///
/// Two byte-wise equal inputs intern to the same canonical instance, so a
/// snapshot never stores the same bytes twice. One index may be shared by any
/// number of repos; sharing it widens the deduplication scope accordingly.
/// The returned sequences must be treated as immutable.
pub trait ByteIndex: Send + Sync + Debug {
    /// Returns the canonical instance for `bytes`: an existing entry with
    /// equal content if one is present, else a newly inserted one.
    /// Amortized O(len) per call.
    fn intern(&self, bytes: &[u8]) -> Arc<[u8]>;
}

/// The default [`ByteIndex`]: a content-hashed set behind a mutex, so a
/// single index can back several repos at once.
#[derive(Default)]
pub struct HashingByteIndex {
    entries: Mutex<HashSet<Arc<[u8]>>>,
}

impl HashingByteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct byte sequences currently interned.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl ByteIndex for HashingByteIndex {
    fn intern(&self, bytes: &[u8]) -> Arc<[u8]> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(bytes) {
            return existing.clone();
        }
        let canonical: Arc<[u8]> = bytes.into();
        entries.insert(canonical.clone());
        canonical
    }
}

impl Debug for HashingByteIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingByteIndex")
            .field("len", &self.len())
            .finish()
    }
}

/// A [`ByteIndex`] that never deduplicates; every call allocates a fresh
/// sequence. Valid wherever deduplication is undesired.
#[derive(Debug, Default)]
pub struct PassthroughByteIndex;

impl PassthroughByteIndex {
    pub fn new() -> Self {
        Self
    }
}

impl ByteIndex for PassthroughByteIndex {
    fn intern(&self, bytes: &[u8]) -> Arc<[u8]> {
        bytes.into()
    }
}
