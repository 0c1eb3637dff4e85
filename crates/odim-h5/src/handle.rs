//! Reference-counted ownership of backing-store ids.

use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{ErrorContext, OdimError, Operation, Result};
use crate::store::{ObjectId, Storage, StoreError, StoreResult, Target};

/// Owns one reference to a backing-store resource.
///
/// Cloning takes another reference on the same resource; dropping or
/// [`close`](Handle::close)-ing gives it back. Two clones denote the same
/// resource, so a write through one is visible through the other.
pub struct Handle {
    id: ObjectId,
    target: Target,
    storage: Rc<dyn Storage>,
}

impl Handle {
    /// Take ownership of an id freshly returned by the store.
    ///
    /// A failed store call, or an id `<= 0`, becomes an error naming the
    /// operation, the target kind, `name` and the path of `location` (looked
    /// up now rather than cached).
    pub fn acquire(
        storage: &Rc<dyn Storage>,
        target: Target,
        op: Operation,
        name: &str,
        location: Option<&Handle>,
        id: StoreResult<ObjectId>,
    ) -> Result<Self> {
        let failure = match id {
            Ok(id) if id > 0 => {
                return Ok(Self {
                    id,
                    target,
                    storage: Rc::clone(storage),
                })
            }
            Ok(id) => StoreError::InvalidId(id),
            Err(err) => err,
        };
        let context = if name.is_empty() {
            ErrorContext::new(target)
        } else {
            ErrorContext::named(target, name)
        };
        let context = context.at(location.and_then(Handle::path));
        Err(OdimError::storage(op, context, failure))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn storage(&self) -> &Rc<dyn Storage> {
        &self.storage
    }

    /// Whether this handle still owns a resource.
    pub fn is_valid(&self) -> bool {
        self.id > 0
    }

    /// Path of the resource inside its file, queried from the store.
    pub fn path(&self) -> Option<String> {
        if self.is_valid() {
            self.storage.path_of(self.id)
        } else {
            None
        }
    }

    /// Release the resource now. Closing an empty handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_valid() {
            return Ok(());
        }
        let id = std::mem::replace(&mut self.id, 0);
        self.storage.dec_ref(id).map_err(|source| {
            OdimError::storage(Operation::Remove, ErrorContext::new(self.target), source)
        })
    }

    /// Error context for this resource, with its current path.
    pub(crate) fn context(&self, target: Target, name: &str) -> ErrorContext {
        ErrorContext::named(target, name).at(self.path())
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        let id = if self.is_valid() {
            match self.storage.inc_ref(self.id) {
                Ok(()) => self.id,
                Err(err) => {
                    warn!(id = self.id, error = %err, "Failed to add reference to handle");
                    0
                }
            }
        } else {
            0
        };
        Self {
            id,
            target: self.target,
            storage: Rc::clone(&self.storage),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to release handle");
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("target", &self.target)
            .finish()
    }
}
