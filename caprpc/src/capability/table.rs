//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-connection export and import tables.
//!
//! The table is pure bookkeeping: it never performs I/O. Callers hold the
//! connection's lock only for the duration of one method call and act on the
//! returned values (dropping a removed server, sending a `Release`) after the
//! lock is released.

use crate::RpcError;
use crate::capability::Server;
use crate::rpc::{ExportId, IdGenerator, ImportId};
use std::collections::HashMap;
use std::sync::Arc;

struct ExportEntry {
    server: Arc<dyn Server>,
    refcount: u32,
}

#[derive(Debug, Default)]
struct ImportEntry {
    /// Live `Capability` handles on this side.
    local_refs: u32,
    /// Times the peer has sent us this capability.
    remote_refs: u32,
}

/// Reference-counted capability table for one connection.
#[derive(Default)]
pub struct CapTable {
    exports: HashMap<ExportId, ExportEntry>,
    export_index: HashMap<usize, ExportId>,
    imports: HashMap<ImportId, ImportEntry>,
    ids: IdGenerator,
}

fn server_key(server: &Arc<dyn Server>) -> usize {
    Arc::as_ptr(server).cast::<()>() as usize
}

impl CapTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a local implementation for the peer to call.
    ///
    /// Exporting the same `Arc` again returns the existing id and adds a
    /// reference to it.
    pub fn export(&mut self, server: Arc<dyn Server>) -> ExportId {
        let key = server_key(&server);
        if let Some(&id) = self.export_index.get(&key) {
            if let Some(entry) = self.exports.get_mut(&id) {
                entry.refcount += 1;
                return id;
            }
        }

        let id = ExportId::new(self.ids.next());
        self.exports.insert(id, ExportEntry { server, refcount: 1 });
        self.export_index.insert(key, id);
        id
    }

    /// Looks up a live export.
    pub fn get_export(&self, id: ExportId) -> Option<Arc<dyn Server>> {
        self.exports.get(&id).map(|entry| Arc::clone(&entry.server))
    }

    /// Returns the reference count of an export, or 0 if it is not live.
    pub fn export_refcount(&self, id: ExportId) -> u32 {
        self.exports.get(&id).map_or(0, |entry| entry.refcount)
    }

    /// Drops `count` references the peer held on an export.
    ///
    /// Returns the implementation once its last reference is gone so that the
    /// caller can drop it outside the lock.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Protocol`] if the id is unknown or the peer
    /// releases more references than it was given.
    pub fn release_export(
        &mut self,
        id: ExportId,
        count: u32,
    ) -> Result<Option<Arc<dyn Server>>, RpcError> {
        let Some(entry) = self.exports.get_mut(&id) else {
            return Err(RpcError::protocol(format!("release of unknown capability {}", id.as_u64())));
        };
        if count > entry.refcount {
            return Err(RpcError::protocol(format!(
                "release of {count} references to capability {} which holds {}",
                id.as_u64(),
                entry.refcount
            )));
        }

        entry.refcount -= count;
        if entry.refcount > 0 {
            return Ok(None);
        }

        let entry = self.exports.remove(&id);
        Ok(entry.map(|entry| {
            self.export_index.remove(&server_key(&entry.server));
            entry.server
        }))
    }

    /// Records that the peer sent us one of its exports and that a new local
    /// handle now refers to it.
    pub fn import(&mut self, remote: ExportId) -> ImportId {
        let id = ImportId::from_remote(remote);
        let entry = self.imports.entry(id).or_default();
        entry.local_refs += 1;
        entry.remote_refs += 1;
        id
    }

    /// Adds a local handle to an existing import.
    ///
    /// Returns `false` if the import is no longer live.
    pub fn retain_import(&mut self, id: ImportId) -> bool {
        match self.imports.get_mut(&id) {
            Some(entry) => {
                entry.local_refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one local handle to an import.
    ///
    /// When the last handle goes, the entry is removed and the number of
    /// references to hand back to the peer is returned.
    pub fn release_import(&mut self, id: ImportId) -> Option<u32> {
        let entry = self.imports.get_mut(&id)?;
        entry.local_refs = entry.local_refs.saturating_sub(1);
        if entry.local_refs > 0 {
            return None;
        }
        self.imports.remove(&id).map(|entry| entry.remote_refs)
    }

    /// Returns `true` if the import still has local handles.
    pub fn has_import(&self, id: ImportId) -> bool {
        self.imports.contains_key(&id)
    }

    /// Number of live exports.
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// Number of live imports.
    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    /// Empties both tables, returning the exported implementations so the
    /// caller can drop them outside the lock.
    pub fn clear(&mut self) -> Vec<Arc<dyn Server>> {
        self.imports.clear();
        self.export_index.clear();
        self.exports.drain().map(|(_, entry)| entry.server).collect()
    }
}

impl std::fmt::Debug for CapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapTable")
            .field("exports", &self.exports.len())
            .field("imports", &self.imports)
            .finish()
    }
}
