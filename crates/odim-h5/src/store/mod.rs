//! The backing hierarchical store.
//!
//! The object model never talks to a storage engine directly. Everything it
//! needs is expressed by the [`Storage`] trait: reference-counted opaque ids,
//! named groups, typed attributes attached to a node, and whole-array
//! datasets. Two engines implement it:
//!
//! - [`MemoryStorage`]: an in-process engine, used by tests and for scratch
//!   products that never touch disk.
//! - `Hdf5Storage` (feature `hdf5`): libhdf5 through `hdf5-metno-sys`.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::sample::{SampleBuffer, SampleType};

pub mod memory;

#[cfg(feature = "hdf5")]
pub mod hdf5;

pub use memory::MemoryStorage;

#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Storage;

/// Opaque resource id issued by a store. Ids `<= 0` are never valid.
pub type ObjectId = i64;

/// Result type for backing store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a storage engine.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid object id {0}")]
    InvalidId(ObjectId),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("file is open read-only")]
    ReadOnly,

    /// The value handed to the store does not match the shape or type the
    /// object was created with.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The stored object uses a type the contract does not cover.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Failure reported by the underlying library.
    #[error("storage library error: {0}")]
    Library(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The kind of resource an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    File,
    Group,
    Type,
    Dataspace,
    Attribute,
    PropertyList,
    Dataset,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Group => "group",
            Self::Type => "type",
            Self::Dataspace => "dataspace",
            Self::Attribute => "attribute",
            Self::PropertyList => "property list",
            Self::Dataset => "dataset",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    ReadOnly,
    ReadWrite,
}

impl IoMode {
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Storage class of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Signed 64-bit integers on the wire.
    Integer,
    /// IEEE 64-bit floats on the wire.
    Float,
    /// Fixed-length, null-terminated string.
    String,
}

/// Shape of an attribute as stored.
///
/// For integer and float attributes `count` is the number of elements; a
/// count of one is stored as a scalar. For strings `count` is the fixed
/// length in bytes, terminator included, and the attribute is always scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeShape {
    pub class: StorageClass,
    pub count: usize,
}

impl AttributeShape {
    pub fn new(class: StorageClass, count: usize) -> Self {
        Self { class, count }
    }

    /// Size of the encoded value in bytes.
    pub fn byte_size(&self) -> usize {
        match self.class {
            StorageClass::Integer | StorageClass::Float => self.count * 8,
            StorageClass::String => self.count,
        }
    }
}

/// The full value of an attribute in wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Integers(Vec<i64>),
    Reals(Vec<f64>),
    /// Raw fixed-length bytes, terminator included.
    Text(Vec<u8>),
}

impl AttributeData {
    /// The shape needed to store this value exactly.
    pub fn shape(&self) -> AttributeShape {
        match self {
            Self::Integers(values) => AttributeShape::new(StorageClass::Integer, values.len()),
            Self::Reals(values) => AttributeShape::new(StorageClass::Float, values.len()),
            Self::Text(bytes) => AttributeShape::new(StorageClass::String, bytes.len()),
        }
    }

    pub fn byte_size(&self) -> usize {
        self.shape().byte_size()
    }
}

/// Creation parameters of a sample array.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    pub sample_type: SampleType,
    pub dims: Vec<usize>,
    pub chunk: Vec<usize>,
    /// Deflate level 0-9, `None` for no compression filter.
    pub compression: Option<u8>,
}

impl DatasetSpec {
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Type and extent of an existing sample array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub sample_type: SampleType,
    pub dims: Vec<usize>,
}

/// The contract the object model consumes from a storage engine.
///
/// Every id returned by an `open_*`/`create_*` call carries one reference
/// that the caller owns and must give back with [`Storage::dec_ref`].
pub trait Storage {
    /// Add a reference to a live id.
    fn inc_ref(&self, id: ObjectId) -> StoreResult<()>;

    /// Drop a reference; the resource is released when none remain.
    fn dec_ref(&self, id: ObjectId) -> StoreResult<()>;

    /// Human-readable path of the object behind `id`, for diagnostics.
    fn path_of(&self, id: ObjectId) -> Option<String>;

    /// Create a file, truncating any existing one. Returns the root node.
    fn create_file(&self, path: &Path) -> StoreResult<ObjectId>;

    /// Open an existing file. Returns the root node.
    fn open_file(&self, path: &Path, mode: IoMode) -> StoreResult<ObjectId>;

    /// Make all pending writes of the file containing `id` durable.
    fn flush(&self, id: ObjectId) -> StoreResult<()>;

    fn create_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId>;

    fn open_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId>;

    /// Whether `parent` has an immediate child called `name`, without
    /// opening it.
    fn child_exists(&self, parent: ObjectId, name: &str) -> StoreResult<bool>;

    /// Names of the attributes directly attached to `node`.
    fn attribute_names(&self, node: ObjectId) -> StoreResult<Vec<String>>;

    fn attribute_exists(&self, node: ObjectId, name: &str) -> StoreResult<bool>;

    fn create_attribute(
        &self,
        node: ObjectId,
        name: &str,
        shape: AttributeShape,
    ) -> StoreResult<ObjectId>;

    fn open_attribute(&self, node: ObjectId, name: &str) -> StoreResult<ObjectId>;

    fn delete_attribute(&self, node: ObjectId, name: &str) -> StoreResult<()>;

    fn attribute_shape(&self, attribute: ObjectId) -> StoreResult<AttributeShape>;

    fn read_attribute(&self, attribute: ObjectId) -> StoreResult<AttributeData>;

    /// Overwrite the value in place. The value must match the stored shape.
    fn write_attribute(&self, attribute: ObjectId, data: &AttributeData) -> StoreResult<()>;

    fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        spec: &DatasetSpec,
    ) -> StoreResult<ObjectId>;

    fn open_dataset(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId>;

    fn dataset_layout(&self, dataset: ObjectId) -> StoreResult<DatasetLayout>;

    /// Read the whole array in its storage type.
    fn read_dataset(&self, dataset: ObjectId) -> StoreResult<SampleBuffer>;

    /// Write the whole array. The buffer must be in the storage type and
    /// hold exactly as many elements as the array.
    fn write_dataset(&self, dataset: ObjectId, data: &SampleBuffer) -> StoreResult<()>;
}
