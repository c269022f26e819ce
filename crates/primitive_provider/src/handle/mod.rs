// Copyright (C) Microsoft Corporation. All rights reserved.

//! Opaque handles and the table that owns every provider object.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use super::*;

/// Opaque handle to a provider object.
///
/// The zero value is never issued and always reports
/// [`CngError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(u32);

impl Handle {
    /// The null handle.
    pub const NULL: Handle = Handle(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl Deref for Handle {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Handle {
    fn from(value: u32) -> Self {
        Handle(value)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Type tag of a handle.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandleType {
    Algorithm,
    Hash,
    Key,
    Secret,
}

/// Object owned by a handle.
pub(crate) enum Object {
    Algorithm(Algorithm),
    Hash(Box<Hash>),
    Key(Box<Key>),
    Secret(Secret),
}

impl Object {
    fn handle_type(&self) -> HandleType {
        match self {
            Object::Algorithm(_) => HandleType::Algorithm,
            Object::Hash(_) => HandleType::Hash,
            Object::Key(_) => HandleType::Key,
            Object::Secret(_) => HandleType::Secret,
        }
    }
}

/// Handle table.
///
/// Removing an entry drops the object, which zeroizes any secret material it
/// owns; the handle value is then unknown to the table, so stale handles are
/// rejected instead of being dereferenced.
#[derive(Default)]
pub(crate) struct HandleTable {
    table: HashMap<Handle, Object>,
    id_counter: u32,
}

impl HandleTable {
    pub(crate) fn alloc_handle(&mut self, obj: Object) -> Handle {
        while self.id_counter == 0 || self.table.contains_key(&Handle(self.id_counter)) {
            self.id_counter = self.id_counter.wrapping_add(1);
        }
        let handle = Handle(self.id_counter);
        self.id_counter = self.id_counter.wrapping_add(1);
        tracing::debug!(%handle, handle_type = ?obj.handle_type(), "allocated handle");
        self.table.insert(handle, obj);
        handle
    }

    /// Removes a handle after checking its type tag.
    pub(crate) fn free_handle(
        &mut self,
        handle: Handle,
        handle_type: HandleType,
    ) -> Result<Object, CngError> {
        if self.get_handle_type(handle)? != handle_type {
            return Err(CngError::InvalidHandle);
        }
        tracing::debug!(%handle, ?handle_type, "freed handle");
        self.table.remove(&handle).ok_or(CngError::InvalidHandle)
    }

    /// Get the handle type for a given handle.
    pub(crate) fn get_handle_type(&self, handle: Handle) -> Result<HandleType, CngError> {
        self.table
            .get(&handle)
            .map(Object::handle_type)
            .ok_or(CngError::InvalidHandle)
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn algorithm(&self, handle: Handle) -> Result<&Algorithm, CngError> {
        match self.table.get(&handle) {
            Some(Object::Algorithm(alg)) => Ok(alg),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn algorithm_mut(&mut self, handle: Handle) -> Result<&mut Algorithm, CngError> {
        match self.table.get_mut(&handle) {
            Some(Object::Algorithm(alg)) => Ok(alg),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn hash(&self, handle: Handle) -> Result<&Hash, CngError> {
        match self.table.get(&handle) {
            Some(Object::Hash(hash)) => Ok(hash),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn hash_mut(&mut self, handle: Handle) -> Result<&mut Hash, CngError> {
        match self.table.get_mut(&handle) {
            Some(Object::Hash(hash)) => Ok(hash),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn key(&self, handle: Handle) -> Result<&Key, CngError> {
        match self.table.get(&handle) {
            Some(Object::Key(key)) => Ok(key),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn key_mut(&mut self, handle: Handle) -> Result<&mut Key, CngError> {
        match self.table.get_mut(&handle) {
            Some(Object::Key(key)) => Ok(key),
            _ => Err(CngError::InvalidHandle),
        }
    }

    pub(crate) fn secret(&self, handle: Handle) -> Result<&Secret, CngError> {
        match self.table.get(&handle) {
            Some(Object::Secret(secret)) => Ok(secret),
            _ => Err(CngError::InvalidHandle),
        }
    }
}

#[cfg(test)]
mod tests;
