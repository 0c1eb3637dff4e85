//! The attributes of one node, spread over its `what`, `where` and `how`
//! sub-groups.

use tracing::debug;

use crate::attribute::{Attribute, AttributeType, AttributeValue, FromAttribute};
use crate::error::{ErrorContext, OdimError, Operation, Result};
use crate::handle::Handle;
use crate::store::Target;
use crate::vocabulary::{classify, Slot};

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    attribute: Attribute,
}

/// Attributes of a node and handles to the sub-groups holding them.
///
/// Each attribute records which sub-group it lives in, not a reference to
/// the group handle. The handle is looked up in *this* store whenever the
/// attribute is accessed, so a cloned or moved store never reaches back into
/// the store it came from.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    groups: [Option<Handle>; 3],
    entries: Vec<Entry>,
}

impl AttributeStore {
    /// An empty store for a node that has just been created.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the sub-groups of `node` that exist and list their attributes.
    pub fn open(node: &Handle) -> Result<Self> {
        let storage = node.storage();
        let mut store = Self::new();
        for slot in Slot::ALL {
            let name = slot.group_name();
            let exists = storage
                .child_exists(node.id(), name)
                .map_err(|source| {
                    OdimError::storage(Operation::Open, node.context(Target::Group, name), source)
                })?;
            if !exists {
                continue;
            }
            let group = Handle::acquire(
                storage,
                Target::Group,
                Operation::Open,
                name,
                Some(node),
                storage.open_group(node.id(), name),
            )?;
            let names = storage.attribute_names(group.id()).map_err(|source| {
                OdimError::storage(Operation::Read, group.context(Target::Group, name), source)
            })?;
            store.entries.extend(names.into_iter().map(|attr| Entry {
                slot,
                attribute: Attribute::existing(attr),
            }));
            store.groups[slot.index()] = Some(group);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(sub-group, name)` of every attribute, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.entries.iter().map(|e| (e.slot, e.attribute.name()))
    }

    /// Handle of a sub-group, if it exists.
    pub fn group(&self, slot: Slot) -> Option<&Handle> {
        self.groups[slot.index()].as_ref()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.attribute.name() == name)
    }

    fn position_in(&self, slot: Slot, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.slot == slot && e.attribute.name() == name)
    }

    fn view(&self, index: usize) -> AttributeRef<'_> {
        let entry = &self.entries[index];
        AttributeRef {
            slot: entry.slot,
            attribute: &entry.attribute,
            group: self.group(entry.slot),
        }
    }

    /// Look an attribute up in any sub-group. Never creates.
    pub fn find(&self, name: &str) -> Option<AttributeRef<'_>> {
        self.position(name).map(|i| self.view(i))
    }

    /// Look an attribute up in one sub-group. Never creates.
    pub fn find_in(&self, slot: Slot, name: &str) -> Option<AttributeRef<'_>> {
        self.position_in(slot, name).map(|i| self.view(i))
    }

    /// Look an attribute up, failing if there is no such attribute.
    pub fn get(&self, name: &str) -> Result<AttributeRef<'_>> {
        self.find(name)
            .ok_or_else(|| OdimError::NotFound(ErrorContext::named(Target::Attribute, name)))
    }

    /// Mutable lookup that creates on a miss.
    ///
    /// A new name is placed in `what` or `where` if the convention lists it
    /// there, otherwise in `how`. Nothing is written until
    /// [`AttributeMut::set`], which also creates the sub-group if needed.
    pub fn entry<'a>(&'a mut self, node: &'a Handle, name: &str) -> AttributeMut<'a> {
        let slot = match self.position(name) {
            Some(index) => self.entries[index].slot,
            None => classify(name),
        };
        self.entry_in(node, slot, name)
    }

    /// Mutable lookup in an explicit sub-group, creating on a miss.
    pub fn entry_in<'a>(&'a mut self, node: &'a Handle, slot: Slot, name: &str) -> AttributeMut<'a> {
        let index = match self.position_in(slot, name) {
            Some(index) => index,
            None => {
                self.entries.push(Entry {
                    slot,
                    attribute: Attribute::creatable(name),
                });
                self.entries.len() - 1
            }
        };
        let Self { groups, entries } = self;
        AttributeMut {
            node,
            slot,
            group: &mut groups[slot.index()],
            attribute: &entries[index].attribute,
        }
    }

    /// Remove an attribute from the store and from disk.
    ///
    /// Returns whether there was such an attribute.
    pub fn erase(&mut self, name: &str) -> Result<bool> {
        match self.position(name) {
            Some(index) => self.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove an attribute from one sub-group, leaving a namesake in
    /// another sub-group alone.
    pub fn erase_in(&mut self, slot: Slot, name: &str) -> Result<bool> {
        match self.position_in(slot, name) {
            Some(index) => self.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }

    fn remove_at(&mut self, index: usize) -> Result<()> {
        let entry = &self.entries[index];
        if let Some(group) = self.group(entry.slot) {
            entry.attribute.erase(group)?;
        }
        self.entries.remove(index);
        Ok(())
    }
}

macro_rules! typed_getters {
    () => {
        pub fn get_boolean(&self) -> Result<bool> {
            self.get()
        }

        pub fn get_integer(&self) -> Result<i64> {
            self.get()
        }

        pub fn get_real(&self) -> Result<f64> {
            self.get()
        }

        pub fn get_string(&self) -> Result<String> {
            self.get()
        }

        pub fn get_integer_array(&self) -> Result<Vec<i64>> {
            self.get()
        }

        pub fn get_real_array(&self) -> Result<Vec<f64>> {
            self.get()
        }

        /// The value, whatever its type.
        pub fn value(&self) -> Result<AttributeValue> {
            self.get()
        }
    };
}

/// Read access to one attribute of a store.
#[derive(Debug, Clone, Copy)]
pub struct AttributeRef<'a> {
    slot: Slot,
    attribute: &'a Attribute,
    group: Option<&'a Handle>,
}

impl<'a> AttributeRef<'a> {
    pub fn name(&self) -> &'a str {
        self.attribute.name()
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The stored type, asking the store on first use.
    pub fn attribute_type(&self) -> Result<AttributeType> {
        match self.group {
            Some(group) => self.attribute.discover(group),
            None => Ok(AttributeType::Uninitialized),
        }
    }

    pub fn get<T: FromAttribute>(&self) -> Result<T> {
        match self.group {
            Some(group) => self.attribute.get(group),
            None => Err(OdimError::NotFound(ErrorContext::named(
                Target::Attribute,
                self.attribute.name(),
            ))),
        }
    }

    typed_getters!();
}

/// Read/write access to one attribute of a store.
#[derive(Debug)]
pub struct AttributeMut<'a> {
    node: &'a Handle,
    slot: Slot,
    group: &'a mut Option<Handle>,
    attribute: &'a Attribute,
}

impl<'a> AttributeMut<'a> {
    pub fn name(&self) -> &str {
        self.attribute.name()
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn view(&self) -> AttributeRef<'_> {
        AttributeRef {
            slot: self.slot,
            attribute: self.attribute,
            group: self.group.as_ref(),
        }
    }

    pub fn attribute_type(&self) -> Result<AttributeType> {
        self.view().attribute_type()
    }

    pub fn get<T: FromAttribute>(&self) -> Result<T> {
        self.view().get()
    }

    typed_getters!();

    /// Write the value, creating the sub-group and the attribute as needed.
    pub fn set(&mut self, value: impl Into<AttributeValue>) -> Result<()> {
        let value = value.into();
        let group = match self.group.take() {
            Some(group) => group,
            None => open_or_create_group(self.node, self.slot)?,
        };
        let group = self.group.insert(group);
        self.attribute.set(group, &value)
    }
}

fn open_or_create_group(node: &Handle, slot: Slot) -> Result<Handle> {
    let storage = node.storage();
    let name = slot.group_name();
    let exists = storage
        .child_exists(node.id(), name)
        .map_err(|source| {
            OdimError::storage(Operation::Open, node.context(Target::Group, name), source)
        })?;
    if exists {
        return Handle::acquire(
            storage,
            Target::Group,
            Operation::Open,
            name,
            Some(node),
            storage.open_group(node.id(), name),
        );
    }
    debug!(group = name, path = ?node.path(), "Creating metadata group");
    Handle::acquire(
        storage,
        Target::Group,
        Operation::Create,
        name,
        Some(node),
        storage.create_group(node.id(), name),
    )
}
