//! In-process storage engine.
//!
//! Files live in a per-engine registry keyed by path, so a product can be
//! created, all of its handles dropped, and the file reopened (read-only or
//! read-write) through the same engine. Ids are reference counted exactly
//! like libhdf5 ids, which lets tests assert that the object model releases
//! everything it acquires.
//!
//! Creating a file at a path that already holds one replaces it. The old
//! tree stays reachable through ids still open on it and its nodes are
//! reused once the last of those ids is released.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::trace;

use super::{
    AttributeData, AttributeShape, DatasetLayout, DatasetSpec, IoMode, ObjectId, Storage,
    StorageClass, StoreError, StoreResult,
};
use crate::sample::SampleBuffer;

/// Storage engine that keeps every file in memory.
#[derive(Default)]
pub struct MemoryStorage {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    last_id: ObjectId,
    nodes: Vec<Node>,
    files: HashMap<PathBuf, usize>,
    open: HashMap<ObjectId, OpenObject>,
    /// Roots of replaced files not reclaimed yet.
    retired: Vec<usize>,
    /// Node slots free for reuse.
    free: Vec<usize>,
}

struct Node {
    name: String,
    parent: Option<usize>,
    children: BTreeMap<String, usize>,
    attributes: BTreeMap<String, AttributeData>,
    dataset: Option<StoredDataset>,
}

impl Node {
    fn new(name: &str, parent: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: BTreeMap::new(),
            attributes: BTreeMap::new(),
            dataset: None,
        }
    }
}

struct StoredDataset {
    dims: Vec<usize>,
    chunk: Vec<usize>,
    compression: Option<u8>,
    data: SampleBuffer,
}

struct OpenObject {
    refs: usize,
    writable: bool,
    kind: ObjectKind,
}

#[derive(Clone)]
enum ObjectKind {
    Node(usize),
    Attribute { node: usize, name: String },
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids currently holding at least one reference.
    pub fn open_object_count(&self) -> usize {
        self.state.borrow().open.len()
    }

    /// Number of nodes held across all files, replaced ones included.
    pub fn node_count(&self) -> usize {
        let state = self.state.borrow();
        state.nodes.len() - state.free.len()
    }

    /// Whether a file has been created at `path`.
    pub fn contains_file(&self, path: &Path) -> bool {
        self.state.borrow().files.contains_key(path)
    }

    /// Chunk shape and deflate level a dataset was created with.
    pub fn dataset_storage(&self, dataset: ObjectId) -> StoreResult<(Vec<usize>, Option<u8>)> {
        let state = self.state.borrow();
        let index = state.node_index(dataset)?;
        let stored = state.dataset(index)?;
        Ok((stored.chunk.clone(), stored.compression))
    }
}

impl State {
    fn issue(&mut self, kind: ObjectKind, writable: bool) -> ObjectId {
        self.last_id += 1;
        self.open.insert(
            self.last_id,
            OpenObject {
                refs: 1,
                writable,
                kind,
            },
        );
        self.last_id
    }

    fn object(&self, id: ObjectId) -> StoreResult<&OpenObject> {
        self.open.get(&id).ok_or(StoreError::InvalidId(id))
    }

    fn node_index(&self, id: ObjectId) -> StoreResult<usize> {
        match &self.object(id)?.kind {
            ObjectKind::Node(index) => Ok(*index),
            ObjectKind::Attribute { .. } => Err(StoreError::InvalidId(id)),
        }
    }

    /// Node index of `id`, plus whether it was opened writable.
    fn node_access(&self, id: ObjectId) -> StoreResult<(usize, bool)> {
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Node(index) => Ok((*index, object.writable)),
            ObjectKind::Attribute { .. } => Err(StoreError::InvalidId(id)),
        }
    }

    fn writable_node(&self, id: ObjectId) -> StoreResult<usize> {
        let (index, writable) = self.node_access(id)?;
        if !writable {
            return Err(StoreError::ReadOnly);
        }
        Ok(index)
    }

    fn attribute_key(&self, id: ObjectId) -> StoreResult<(usize, String, bool)> {
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Attribute { node, name } => Ok((*node, name.clone(), object.writable)),
            ObjectKind::Node(_) => Err(StoreError::InvalidId(id)),
        }
    }

    fn dataset(&self, index: usize) -> StoreResult<&StoredDataset> {
        self.nodes[index]
            .dataset
            .as_ref()
            .ok_or_else(|| StoreError::NotFound(format!("{} is not a dataset", self.path(index))))
    }

    fn path(&self, mut index: usize) -> String {
        let mut parts = Vec::new();
        while let Some(parent) = self.nodes[index].parent {
            parts.push(self.nodes[index].name.as_str());
            index = parent;
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// `root` and every node below it.
    fn subtree(&self, root: usize) -> Vec<usize> {
        let mut pending = vec![root];
        let mut found = Vec::new();
        while let Some(index) = pending.pop() {
            pending.extend(self.nodes[index].children.values().copied());
            found.push(index);
        }
        found
    }

    /// Free the trees of replaced files that no open id points into.
    fn reclaim(&mut self) {
        let used: HashSet<usize> = self
            .open
            .values()
            .map(|object| match &object.kind {
                ObjectKind::Node(index) => *index,
                ObjectKind::Attribute { node, .. } => *node,
            })
            .collect();
        for root in std::mem::take(&mut self.retired) {
            let indices = self.subtree(root);
            if indices.iter().any(|index| used.contains(index)) {
                self.retired.push(root);
                continue;
            }
            trace!(root, nodes = indices.len(), "Reclaimed replaced file");
            for index in indices {
                self.nodes[index] = Node::new("", None);
                self.free.push(index);
            }
        }
    }

    fn add_child(&mut self, parent: usize, name: &str) -> StoreResult<usize> {
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::NotFound(format!("invalid link name '{}'", name)));
        }
        if self.nodes[parent].dataset.is_some() {
            return Err(StoreError::NotFound(format!(
                "{} is not a group",
                self.path(parent)
            )));
        }
        if self.nodes[parent].children.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let index = self.alloc(Node::new(name, Some(parent)));
        self.nodes[parent].children.insert(name.to_string(), index);
        Ok(index)
    }

    fn child(&self, parent: usize, name: &str) -> StoreResult<usize> {
        self.nodes[parent]
            .children
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

fn empty_value(shape: AttributeShape) -> AttributeData {
    match shape.class {
        StorageClass::Integer => AttributeData::Integers(vec![0; shape.count]),
        StorageClass::Float => AttributeData::Reals(vec![0.0; shape.count]),
        StorageClass::String => AttributeData::Text(vec![0; shape.count]),
    }
}

impl Storage for MemoryStorage {
    fn inc_ref(&self, id: ObjectId) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let object = state.open.get_mut(&id).ok_or(StoreError::InvalidId(id))?;
        object.refs += 1;
        Ok(())
    }

    fn dec_ref(&self, id: ObjectId) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let object = state.open.get_mut(&id).ok_or(StoreError::InvalidId(id))?;
        object.refs -= 1;
        if object.refs == 0 {
            state.open.remove(&id);
            trace!(id, "Released object");
            if !state.retired.is_empty() {
                state.reclaim();
            }
        }
        Ok(())
    }

    fn path_of(&self, id: ObjectId) -> Option<String> {
        let state = self.state.borrow();
        let index = match &state.open.get(&id)?.kind {
            ObjectKind::Node(index) => *index,
            ObjectKind::Attribute { node, .. } => *node,
        };
        Some(state.path(index))
    }

    fn create_file(&self, path: &Path) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let root = state.alloc(Node::new("", None));
        if let Some(replaced) = state.files.insert(path.to_path_buf(), root) {
            state.retired.push(replaced);
            state.reclaim();
        }
        Ok(state.issue(ObjectKind::Node(root), true))
    }

    fn open_file(&self, path: &Path, mode: IoMode) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let root = *state
            .files
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.display().to_string()))?;
        Ok(state.issue(ObjectKind::Node(root), mode.is_writable()))
    }

    fn flush(&self, id: ObjectId) -> StoreResult<()> {
        self.state.borrow().object(id)?;
        Ok(())
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let parent = state.writable_node(parent)?;
        let index = state.add_child(parent, name)?;
        Ok(state.issue(ObjectKind::Node(index), true))
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let (parent, writable) = state.node_access(parent)?;
        let index = state.child(parent, name)?;
        if state.nodes[index].dataset.is_some() {
            return Err(StoreError::NotFound(format!("{} is not a group", state.path(index))));
        }
        Ok(state.issue(ObjectKind::Node(index), writable))
    }

    fn child_exists(&self, parent: ObjectId, name: &str) -> StoreResult<bool> {
        let state = self.state.borrow();
        let parent = state.node_index(parent)?;
        Ok(state.nodes[parent].children.contains_key(name))
    }

    fn attribute_names(&self, node: ObjectId) -> StoreResult<Vec<String>> {
        let state = self.state.borrow();
        let node = state.node_index(node)?;
        Ok(state.nodes[node].attributes.keys().cloned().collect())
    }

    fn attribute_exists(&self, node: ObjectId, name: &str) -> StoreResult<bool> {
        let state = self.state.borrow();
        let node = state.node_index(node)?;
        Ok(state.nodes[node].attributes.contains_key(name))
    }

    fn create_attribute(
        &self,
        node: ObjectId,
        name: &str,
        shape: AttributeShape,
    ) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let node = state.writable_node(node)?;
        if shape.class == StorageClass::String && shape.count == 0 {
            return Err(StoreError::ShapeMismatch(
                "string attributes need at least one byte".to_string(),
            ));
        }
        let attributes = &mut state.nodes[node].attributes;
        if attributes.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        attributes.insert(name.to_string(), empty_value(shape));
        Ok(state.issue(
            ObjectKind::Attribute {
                node,
                name: name.to_string(),
            },
            true,
        ))
    }

    fn open_attribute(&self, node: ObjectId, name: &str) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let (node, writable) = state.node_access(node)?;
        if !state.nodes[node].attributes.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(state.issue(
            ObjectKind::Attribute {
                node,
                name: name.to_string(),
            },
            writable,
        ))
    }

    fn delete_attribute(&self, node: ObjectId, name: &str) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let node = state.writable_node(node)?;
        state.nodes[node]
            .attributes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn attribute_shape(&self, attribute: ObjectId) -> StoreResult<AttributeShape> {
        let state = self.state.borrow();
        let (node, name, _) = state.attribute_key(attribute)?;
        state.nodes[node]
            .attributes
            .get(&name)
            .map(AttributeData::shape)
            .ok_or(StoreError::NotFound(name))
    }

    fn read_attribute(&self, attribute: ObjectId) -> StoreResult<AttributeData> {
        let state = self.state.borrow();
        let (node, name, _) = state.attribute_key(attribute)?;
        state.nodes[node]
            .attributes
            .get(&name)
            .cloned()
            .ok_or(StoreError::NotFound(name))
    }

    fn write_attribute(&self, attribute: ObjectId, data: &AttributeData) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let (node, name, writable) = state.attribute_key(attribute)?;
        if !writable {
            return Err(StoreError::ReadOnly);
        }
        let stored = state.nodes[node]
            .attributes
            .get_mut(&name)
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;
        if stored.shape() != data.shape() {
            return Err(StoreError::ShapeMismatch(format!(
                "attribute '{}' is {:?}, value is {:?}",
                name,
                stored.shape(),
                data.shape()
            )));
        }
        *stored = data.clone();
        Ok(())
    }

    fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        spec: &DatasetSpec,
    ) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let parent = state.writable_node(parent)?;
        if spec.chunk.len() != spec.dims.len()
            || spec.chunk.iter().zip(&spec.dims).any(|(c, d)| *c == 0 || c > d)
        {
            return Err(StoreError::ShapeMismatch(format!(
                "chunk {:?} does not fit dimensions {:?}",
                spec.chunk, spec.dims
            )));
        }
        if spec.compression.is_some_and(|level| level > 9) {
            return Err(StoreError::Library(format!(
                "invalid deflate level {:?}",
                spec.compression
            )));
        }
        let index = state.add_child(parent, name)?;
        state.nodes[index].dataset = Some(StoredDataset {
            dims: spec.dims.clone(),
            chunk: spec.chunk.clone(),
            compression: spec.compression,
            data: SampleBuffer::zeroed(spec.sample_type, spec.element_count()),
        });
        Ok(state.issue(ObjectKind::Node(index), true))
    }

    fn open_dataset(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        let mut state = self.state.borrow_mut();
        let (parent, writable) = state.node_access(parent)?;
        let index = state.child(parent, name)?;
        state.dataset(index)?;
        Ok(state.issue(ObjectKind::Node(index), writable))
    }

    fn dataset_layout(&self, dataset: ObjectId) -> StoreResult<DatasetLayout> {
        let state = self.state.borrow();
        let index = state.node_index(dataset)?;
        let stored = state.dataset(index)?;
        Ok(DatasetLayout {
            sample_type: stored.data.sample_type(),
            dims: stored.dims.clone(),
        })
    }

    fn read_dataset(&self, dataset: ObjectId) -> StoreResult<SampleBuffer> {
        let state = self.state.borrow();
        let index = state.node_index(dataset)?;
        Ok(state.dataset(index)?.data.clone())
    }

    fn write_dataset(&self, dataset: ObjectId, data: &SampleBuffer) -> StoreResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state.writable_node(dataset)?;
        let path = state.path(index);
        let stored = state.nodes[index]
            .dataset
            .as_mut()
            .ok_or_else(|| StoreError::NotFound(format!("{} is not a dataset", path)))?;
        if stored.data.sample_type() != data.sample_type() || stored.data.len() != data.len() {
            return Err(StoreError::ShapeMismatch(format!(
                "{} holds {} x {}, buffer is {} x {}",
                path,
                stored.data.len(),
                stored.data.sample_type(),
                data.len(),
                data.sample_type()
            )));
        }
        stored.data = data.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleType;

    #[test]
    fn test_reference_counting_releases_ids() {
        let storage = MemoryStorage::new();
        let root = storage.create_file(Path::new("refs.h5")).unwrap();
        storage.inc_ref(root).unwrap();
        assert_eq!(storage.open_object_count(), 1);

        storage.dec_ref(root).unwrap();
        assert_eq!(storage.open_object_count(), 1);
        storage.dec_ref(root).unwrap();
        assert_eq!(storage.open_object_count(), 0);

        assert!(matches!(storage.dec_ref(root), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn test_file_survives_release_and_reopens_read_only() {
        let storage = MemoryStorage::new();
        let path = Path::new("scan.h5");
        let root = storage.create_file(path).unwrap();
        let what = storage.create_group(root, "what").unwrap();
        storage.dec_ref(what).unwrap();
        storage.dec_ref(root).unwrap();

        let root = storage.open_file(path, IoMode::ReadOnly).unwrap();
        assert!(storage.child_exists(root, "what").unwrap());
        assert!(matches!(
            storage.create_group(root, "where"),
            Err(StoreError::ReadOnly)
        ));
        let what = storage.open_group(root, "what").unwrap();
        assert_eq!(storage.path_of(what).as_deref(), Some("/what"));
    }

    #[test]
    fn test_recreated_file_is_empty_and_old_nodes_are_reused() {
        let storage = MemoryStorage::new();
        let path = Path::new("again.h5");
        let root = storage.create_file(path).unwrap();
        for name in ["what", "where", "dataset1"] {
            let group = storage.create_group(root, name).unwrap();
            storage.dec_ref(group).unwrap();
        }
        storage.dec_ref(root).unwrap();
        assert_eq!(storage.node_count(), 4);

        let root = storage.create_file(path).unwrap();
        assert_eq!(storage.node_count(), 1);
        assert!(!storage.child_exists(root, "what").unwrap());
        let how = storage.create_group(root, "how").unwrap();
        assert_eq!(storage.path_of(how).as_deref(), Some("/how"));
        assert_eq!(storage.node_count(), 2);
    }

    #[test]
    fn test_replaced_file_kept_while_ids_are_open() {
        let storage = MemoryStorage::new();
        let path = Path::new("held.h5");
        let old_root = storage.create_file(path).unwrap();
        let what = storage.create_group(old_root, "what").unwrap();

        let new_root = storage.create_file(path).unwrap();
        assert_eq!(storage.node_count(), 3);
        assert_eq!(storage.path_of(what).as_deref(), Some("/what"));
        assert!(!storage.child_exists(new_root, "what").unwrap());

        storage.dec_ref(what).unwrap();
        assert_eq!(storage.node_count(), 3);
        storage.dec_ref(old_root).unwrap();
        assert_eq!(storage.node_count(), 1);
    }

    #[test]
    fn test_attribute_write_requires_matching_shape() {
        let storage = MemoryStorage::new();
        let root = storage.create_file(Path::new("attr.h5")).unwrap();
        let attr = storage
            .create_attribute(root, "source", AttributeShape::new(StorageClass::String, 5))
            .unwrap();
        storage
            .write_attribute(attr, &AttributeData::Text(b"WMO:\0".to_vec()))
            .unwrap();
        let err = storage
            .write_attribute(attr, &AttributeData::Text(b"NOD:x\0".to_vec()))
            .unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch(_)));
        assert_eq!(storage.attribute_names(root).unwrap(), vec!["source".to_string()]);
    }

    #[test]
    fn test_dataset_layout_and_storage() {
        let storage = MemoryStorage::new();
        let root = storage.create_file(Path::new("data.h5")).unwrap();
        let spec = DatasetSpec {
            sample_type: SampleType::U8,
            dims: vec![3, 4],
            chunk: vec![3, 4],
            compression: Some(6),
        };
        let dataset = storage.create_dataset(root, "data", &spec).unwrap();
        let layout = storage.dataset_layout(dataset).unwrap();
        assert_eq!(layout.dims, vec![3, 4]);
        assert_eq!(layout.sample_type, SampleType::U8);
        assert_eq!(
            storage.dataset_storage(dataset).unwrap(),
            (vec![3, 4], Some(6))
        );
        assert!(storage
            .write_dataset(dataset, &SampleBuffer::U16(vec![0; 12]))
            .is_err());
        assert!(storage.open_group(root, "data").is_err());
    }
}
