//! Nodes with metadata, and the numbered-child addressing scheme.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::attribute::{AttributeValue, FromAttribute};
use crate::attribute_store::{AttributeMut, AttributeRef, AttributeStore};
use crate::datetime;
use crate::error::{OdimError, Operation, Result};
use crate::handle::Handle;
use crate::store::Target;
use crate::vocabulary::Slot;

/// A node of the file and its `what`/`where`/`how` attributes.
#[derive(Debug, Clone)]
pub struct Group {
    handle: Handle,
    attributes: AttributeStore,
}

impl Group {
    /// Open the existing child group `name` of `parent`.
    pub fn open(parent: &Handle, name: &str) -> Result<Self> {
        let storage = parent.storage();
        let handle = Handle::acquire(
            storage,
            Target::Group,
            Operation::Open,
            name,
            Some(parent),
            storage.open_group(parent.id(), name),
        )?;
        Self::from_opened(handle)
    }

    /// Create the child group `name` of `parent`.
    pub fn create(parent: &Handle, name: &str) -> Result<Self> {
        let storage = parent.storage();
        let handle = Handle::acquire(
            storage,
            Target::Group,
            Operation::Create,
            name,
            Some(parent),
            storage.create_group(parent.id(), name),
        )?;
        debug!(path = ?handle.path(), "Created group");
        Ok(Self::from_created(handle))
    }

    /// Wrap an existing node, discovering its attributes.
    pub(crate) fn from_opened(handle: Handle) -> Result<Self> {
        let attributes = AttributeStore::open(&handle)?;
        Ok(Self { handle, attributes })
    }

    /// Wrap a node that was just created and has no metadata yet.
    pub(crate) fn from_created(handle: Handle) -> Self {
        Self {
            handle,
            attributes: AttributeStore::new(),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Path of the node inside its file.
    pub fn path(&self) -> Option<String> {
        self.handle.path()
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Look an attribute up, failing with "no such attribute" on a miss.
    pub fn attribute(&self, name: &str) -> Result<AttributeRef<'_>> {
        self.attributes
            .find(name)
            .ok_or_else(|| OdimError::NotFound(self.handle.context(Target::Attribute, name)))
    }

    pub fn find_attribute(&self, name: &str) -> Option<AttributeRef<'_>> {
        self.attributes.find(name)
    }

    /// Look an attribute up, creating it on a miss.
    pub fn attribute_mut(&mut self, name: &str) -> AttributeMut<'_> {
        self.attributes.entry(&self.handle, name)
    }

    /// Look an attribute up in an explicit sub-group, creating it on a miss.
    pub fn attribute_in(&mut self, slot: Slot, name: &str) -> AttributeMut<'_> {
        self.attributes.entry_in(&self.handle, slot, name)
    }

    pub fn erase_attribute(&mut self, name: &str) -> Result<bool> {
        self.attributes.erase(name)
    }

    pub fn erase_attribute_in(&mut self, slot: Slot, name: &str) -> Result<bool> {
        self.attributes.erase_in(slot, name)
    }

    /// Read an attribute as `T`.
    pub fn get<T: FromAttribute>(&self, name: &str) -> Result<T> {
        self.attribute(name)?.get()
    }

    /// Read an attribute as `T`, or `None` if there is no such attribute.
    pub fn get_opt<T: FromAttribute>(&self, name: &str) -> Result<Option<T>> {
        match self.find_attribute(name) {
            Some(attribute) => match attribute.get() {
                Ok(value) => Ok(Some(value)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            },
            None => Ok(None),
        }
    }

    /// Read an attribute as `T`, falling back to `default` if absent.
    pub fn get_or<T: FromAttribute>(&self, name: &str, default: T) -> Result<T> {
        Ok(self.get_opt(name)?.unwrap_or(default))
    }

    /// Write an attribute, routing it to the sub-group it belongs in.
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) -> Result<()> {
        self.attribute_mut(name).set(value)
    }

    /// Combine a date attribute and a time attribute into a timestamp.
    pub fn date_time(&self, date_name: &str, time_name: &str) -> Result<DateTime<Utc>> {
        let date: String = self.get(date_name)?;
        let time: String = self.get(time_name)?;
        datetime::combine(&date, &time).map_err(|err| {
            OdimError::bad_value(self.handle.context(Target::Attribute, date_name), err.to_string())
        })
    }

    /// Store a timestamp as a date attribute and a time attribute.
    pub fn set_date_time(
        &mut self,
        date_name: &str,
        time_name: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<()> {
        let (date, time) = datetime::split(timestamp);
        self.set(date_name, date)?;
        self.set(time_name, time)
    }
}

/// Numbered children `<base>1`, `<base>2`, … of a node.
///
/// The count is discovered once, by checking indices from 1 until one is
/// missing, and afterwards tracked in memory. Indices are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Children {
    base: &'static str,
    count: usize,
}

impl Children {
    /// No children yet, for a node that was just created.
    pub fn empty(base: &'static str) -> Self {
        Self { base, count: 0 }
    }

    /// Count the children of `node` by checking `base1`, `base2`, ... in turn.
    ///
    /// A missing index ends the count; a store error along the way is
    /// returned.
    pub fn discover(node: &Handle, base: &'static str) -> Result<Self> {
        let storage = node.storage();
        let mut count = 0;
        loop {
            let name = child_name(base, count + 1);
            let exists = storage.child_exists(node.id(), &name).map_err(|source| {
                OdimError::storage(Operation::Open, node.context(Target::Group, &name), source)
            })?;
            if !exists {
                break;
            }
            count += 1;
        }
        trace!(base, count, path = ?node.path(), "Counted numbered children");
        Ok(Self { base, count })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Name of an existing child, or a not-found error outside `1..=count`.
    pub fn existing(&self, node: &Handle, index: usize) -> Result<String> {
        let name = child_name(self.base, index);
        if index == 0 || index > self.count {
            return Err(OdimError::NotFound(node.context(Target::Group, &name)));
        }
        Ok(name)
    }

    /// Name the next appended child takes.
    pub fn next_name(&self) -> String {
        child_name(self.base, self.count + 1)
    }

    /// Record that the next child was created.
    pub fn appended(&mut self) {
        self.count += 1;
    }
}

/// `<base><index>`, unpadded.
pub fn child_name(base: &str, index: usize) -> String {
    format!("{}{}", base, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IoMode, MemoryStorage, Storage};
    use chrono::TimeZone;
    use std::path::Path;
    use std::rc::Rc;

    fn root() -> Handle {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        let id = storage.create_file(Path::new("group.h5"));
        Handle::acquire(&storage, Target::File, Operation::Create, "group.h5", None, id).unwrap()
    }

    #[test]
    fn test_child_name_is_unpadded() {
        assert_eq!(child_name("dataset", 1), "dataset1");
        assert_eq!(child_name("quality", 12), "quality12");
    }

    #[test]
    fn test_create_then_open_sees_attributes() {
        let root = root();
        let mut group = Group::create(&root, "dataset1").unwrap();
        group.set("product", "SCAN").unwrap();
        group.set("elangle", 0.5).unwrap();
        assert_eq!(group.path().as_deref(), Some("/dataset1"));

        let reopened = Group::open(&root, "dataset1").unwrap();
        assert_eq!(reopened.get::<String>("product").unwrap(), "SCAN");
        assert_eq!(reopened.get::<f64>("elangle").unwrap(), 0.5);
    }

    #[test]
    fn test_missing_attribute_error_carries_path() {
        let root = root();
        let group = Group::create(&root, "dataset1").unwrap();
        let err = group.get::<f64>("elangle").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.context().and_then(|c| c.path.as_deref()),
            Some("/dataset1")
        );
        assert_eq!(group.get_opt::<f64>("elangle").unwrap(), None);
        assert_eq!(group.get_or("elangle", 1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_open_missing_group_fails() {
        let root = root();
        let err = Group::open(&root, "dataset1").unwrap_err();
        assert!(matches!(err, OdimError::OpenFailed { .. }));
    }

    #[test]
    fn test_date_time_pair() {
        let root = root();
        let mut group = Group::create(&root, "dataset1").unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
        group.set_date_time("startdate", "starttime", &ts).unwrap();
        assert_eq!(group.get::<String>("startdate").unwrap(), "20240601");
        assert_eq!(group.get::<String>("starttime").unwrap(), "123000");
        assert_eq!(group.date_time("startdate", "starttime").unwrap(), ts);

        group.set("enddate", "2024-06-01").unwrap();
        group.set("endtime", "123500").unwrap();
        let err = group.date_time("enddate", "endtime").unwrap_err();
        assert!(matches!(err, OdimError::BadValue { .. }));
    }

    #[test]
    fn test_discovery_stops_at_first_gap() {
        let root = root();
        for name in ["dataset1", "dataset2", "dataset4"] {
            Group::create(&root, name).unwrap();
        }
        let children = Children::discover(&root, "dataset").unwrap();
        assert_eq!(children.count(), 2);
        assert_eq!(children.next_name(), "dataset3");
        assert!(children.existing(&root, 2).is_ok());
        assert!(children.existing(&root, 0).unwrap_err().is_not_found());
        assert!(children.existing(&root, 3).unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_only_group_rejects_writes() {
        let root = root();
        Group::create(&root, "dataset1").unwrap();
        let storage = root.storage();
        let id = storage.open_file(Path::new("group.h5"), IoMode::ReadOnly);
        let ro = Handle::acquire(storage, Target::File, Operation::Open, "group.h5", None, id)
            .unwrap();
        let mut group = Group::open(&ro, "dataset1").unwrap();
        let err = group.set("product", "SCAN").unwrap_err();
        assert!(matches!(err, OdimError::CreateFailed { .. }));
    }
}
