//! Named, typed metadata values attached to a node.
//!
//! The store keeps attributes in a small dynamic type system (64-bit
//! integers, 64-bit floats, fixed-length strings, scalar or 1-D). The client
//! API is statically typed. [`AttributeValue`] is the closed set of values
//! the convention uses; [`Attribute`] discovers which one a stored attribute
//! holds the first time it is asked, caches that, and decides on every write
//! whether the stored attribute can be overwritten in place or has to be
//! deleted and recreated with a new shape.

use std::cell::Cell;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{ErrorContext, OdimError, Operation, Result};
use crate::handle::Handle;
use crate::store::{AttributeData, AttributeShape, StorageClass, Target};

/// Encoded form of `true`, terminator included.
const TRUE_BYTES: &[u8] = b"True\0";
/// Encoded form of `false`, terminator included.
const FALSE_BYTES: &[u8] = b"False\0";

/// Type tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// About to be created; nothing on disk yet.
    Uninitialized,
    /// On disk, not inspected yet.
    Unknown,
    Boolean,
    Integer,
    Real,
    String,
    IntegerArray,
    RealArray,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Unknown => "unknown",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::String => "string",
            Self::IntegerArray => "integer array",
            Self::RealArray => "real array",
        }
    }

    /// Whether a value stored as `self` can be read as `requested`.
    ///
    /// Scalars project into one-element arrays: a one-element array is
    /// stored (and rediscovered) as a scalar.
    fn readable_as(&self, requested: AttributeType) -> bool {
        *self == requested
            || matches!(
                (self, requested),
                (Self::Integer, Self::IntegerArray) | (Self::Real, Self::RealArray)
            )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    IntegerArray(Vec<i64>),
    RealArray(Vec<f64>),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Boolean(_) => AttributeType::Boolean,
            Self::Integer(_) => AttributeType::Integer,
            Self::Real(_) => AttributeType::Real,
            Self::String(_) => AttributeType::String,
            Self::IntegerArray(_) => AttributeType::IntegerArray,
            Self::RealArray(_) => AttributeType::RealArray,
        }
    }

    /// Wire form of the value.
    pub fn encode(&self) -> AttributeData {
        match self {
            Self::Boolean(true) => AttributeData::Text(TRUE_BYTES.to_vec()),
            Self::Boolean(false) => AttributeData::Text(FALSE_BYTES.to_vec()),
            Self::Integer(value) => AttributeData::Integers(vec![*value]),
            Self::Real(value) => AttributeData::Reals(vec![*value]),
            Self::String(value) => {
                let mut bytes = Vec::with_capacity(value.len() + 1);
                bytes.extend_from_slice(value.as_bytes());
                bytes.push(0);
                AttributeData::Text(bytes)
            }
            Self::IntegerArray(values) => AttributeData::Integers(values.clone()),
            Self::RealArray(values) => AttributeData::Reals(values.clone()),
        }
    }

    /// Interpret wire data as a value of type `ty`.
    fn decode(ty: AttributeType, data: AttributeData) -> std::result::Result<Self, String> {
        match (ty, data) {
            (AttributeType::Boolean, AttributeData::Text(bytes)) => match bytes.as_slice() {
                TRUE_BYTES => Ok(Self::Boolean(true)),
                FALSE_BYTES => Ok(Self::Boolean(false)),
                other => Err(format!("'{}' is not a boolean", String::from_utf8_lossy(other))),
            },
            (AttributeType::String, AttributeData::Text(bytes)) => decode_text(&bytes).map(Self::String),
            (AttributeType::Integer, AttributeData::Integers(values)) if values.len() == 1 => {
                Ok(Self::Integer(values[0]))
            }
            (AttributeType::Real, AttributeData::Reals(values)) if values.len() == 1 => {
                Ok(Self::Real(values[0]))
            }
            (AttributeType::IntegerArray, AttributeData::Integers(values)) => {
                Ok(Self::IntegerArray(values))
            }
            (AttributeType::RealArray, AttributeData::Reals(values)) => Ok(Self::RealArray(values)),
            (ty, data) => Err(format!("stored {:?} does not hold a {}", data.shape(), ty)),
        }
    }
}

/// Text up to the first terminator.
fn decode_text(bytes: &[u8]) -> std::result::Result<String, String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(|e| format!("invalid UTF-8: {}", e))
}

/// Type tag implied by a stored shape, before any boolean check.
fn classify(shape: AttributeShape) -> AttributeType {
    match shape.class {
        StorageClass::Integer if shape.count == 1 => AttributeType::Integer,
        StorageClass::Integer => AttributeType::IntegerArray,
        StorageClass::Float if shape.count == 1 => AttributeType::Real,
        StorageClass::Float => AttributeType::RealArray,
        StorageClass::String => AttributeType::String,
    }
}

/// Whether a string of this encoded size could be a boolean.
fn boolean_sized(shape: AttributeShape) -> bool {
    shape.class == StorageClass::String
        && (shape.count == TRUE_BYTES.len() || shape.count == FALSE_BYTES.len())
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(values: Vec<i64>) -> Self {
        Self::IntegerArray(values)
    }
}

impl From<&[i64]> for AttributeValue {
    fn from(values: &[i64]) -> Self {
        Self::IntegerArray(values.to_vec())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        Self::RealArray(values)
    }
}

impl From<&[f64]> for AttributeValue {
    fn from(values: &[f64]) -> Self {
        Self::RealArray(values.to_vec())
    }
}

/// Rust types an attribute can be read as.
pub trait FromAttribute: Sized {
    const TYPE: AttributeType;

    /// Project a value of a compatible type onto `Self`.
    fn project(value: AttributeValue) -> Option<Self>;
}

impl FromAttribute for bool {
    const TYPE: AttributeType = AttributeType::Boolean;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

impl FromAttribute for i64 {
    const TYPE: AttributeType = AttributeType::Integer;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Integer(v) => Some(v),
            _ => None,
        }
    }
}

impl FromAttribute for f64 {
    const TYPE: AttributeType = AttributeType::Real;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Real(v) => Some(v),
            _ => None,
        }
    }
}

impl FromAttribute for String {
    const TYPE: AttributeType = AttributeType::String;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl FromAttribute for Vec<i64> {
    const TYPE: AttributeType = AttributeType::IntegerArray;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::IntegerArray(v) => Some(v),
            AttributeValue::Integer(v) => Some(vec![v]),
            _ => None,
        }
    }
}

impl FromAttribute for Vec<f64> {
    const TYPE: AttributeType = AttributeType::RealArray;

    fn project(value: AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::RealArray(v) => Some(v),
            AttributeValue::Real(v) => Some(vec![v]),
            _ => None,
        }
    }
}

impl FromAttribute for AttributeValue {
    const TYPE: AttributeType = AttributeType::Unknown;

    fn project(value: AttributeValue) -> Option<Self> {
        Some(value)
    }
}

/// One attribute under a parent node.
///
/// The attribute does not hold its parent. Every operation takes the parent
/// handle, which the owning [`AttributeStore`](crate::AttributeStore)
/// resolves from the sub-group the attribute lives in.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    ty: Cell<AttributeType>,
    shape: Cell<Option<AttributeShape>>,
}

impl Attribute {
    /// An attribute known to exist on disk.
    pub(crate) fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Cell::new(AttributeType::Unknown),
            shape: Cell::new(None),
        }
    }

    /// An attribute the caller is about to create with its first `set`.
    pub(crate) fn creatable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Cell::new(AttributeType::Uninitialized),
            shape: Cell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type tag as currently cached, without touching the store.
    pub fn cached_type(&self) -> AttributeType {
        self.ty.get()
    }

    /// Whether the attribute exists in the store, as far as this instance
    /// knows.
    pub fn is_stored(&self) -> bool {
        self.ty.get() != AttributeType::Uninitialized
    }

    fn context(&self, parent: &Handle) -> ErrorContext {
        parent.context(Target::Attribute, &self.name)
    }

    fn open(&self, parent: &Handle) -> Result<Handle> {
        let storage = parent.storage();
        Handle::acquire(
            storage,
            Target::Attribute,
            Operation::Open,
            &self.name,
            Some(parent),
            storage.open_attribute(parent.id(), &self.name),
        )
    }

    fn stored_shape(&self, parent: &Handle, attribute: &Handle) -> Result<AttributeShape> {
        parent
            .storage()
            .attribute_shape(attribute.id())
            .map_err(|source| OdimError::storage(Operation::Read, self.context(parent), source))
    }

    /// Read the wire data, refusing anything larger than `shape` says.
    fn read_data(
        &self,
        parent: &Handle,
        attribute: &Handle,
        shape: AttributeShape,
    ) -> Result<AttributeData> {
        let data = parent
            .storage()
            .read_attribute(attribute.id())
            .map_err(|source| OdimError::storage(Operation::Read, self.context(parent), source))?;
        let capacity = shape.byte_size();
        if data.byte_size() > capacity {
            return Err(OdimError::SizeMismatch {
                context: self.context(parent),
                stored: data.byte_size(),
                capacity,
            });
        }
        Ok(data)
    }

    /// Discover and cache the stored type.
    ///
    /// Strings of exactly the encoded size of `True` or `False` are read to
    /// check whether they are booleans; any string whose value is one of
    /// those two is reported as a boolean, whoever wrote it.
    pub(crate) fn discover(&self, parent: &Handle) -> Result<AttributeType> {
        if self.ty.get() != AttributeType::Unknown {
            return Ok(self.ty.get());
        }
        let attribute = self.open(parent)?;
        let shape = self.stored_shape(parent, &attribute)?;
        let mut ty = classify(shape);
        if boolean_sized(shape) {
            if let AttributeData::Text(bytes) = self.read_data(parent, &attribute, shape)? {
                if bytes == TRUE_BYTES || bytes == FALSE_BYTES {
                    ty = AttributeType::Boolean;
                }
            }
        }
        trace!(name = %self.name, %ty, "Discovered attribute type");
        self.ty.set(ty);
        self.shape.set(Some(shape));
        Ok(ty)
    }

    /// Read the whole value.
    pub(crate) fn read(&self, parent: &Handle) -> Result<AttributeValue> {
        let ty = self.discover(parent)?;
        if ty == AttributeType::Uninitialized {
            return Err(OdimError::NotFound(self.context(parent)));
        }
        let attribute = self.open(parent)?;
        let shape = match self.shape.get() {
            Some(shape) => shape,
            None => self.stored_shape(parent, &attribute)?,
        };
        let data = self.read_data(parent, &attribute, shape)?;
        AttributeValue::decode(ty, data)
            .map_err(|reason| OdimError::bad_value(self.context(parent), reason))
    }

    /// Read the value as `T`, failing with a type mismatch if the stored
    /// type cannot be read as `T`.
    pub(crate) fn get<T: FromAttribute>(&self, parent: &Handle) -> Result<T> {
        let stored = self.discover(parent)?;
        if stored == AttributeType::Uninitialized {
            return Err(OdimError::NotFound(self.context(parent)));
        }
        if T::TYPE != AttributeType::Unknown && !stored.readable_as(T::TYPE) {
            return Err(OdimError::TypeMismatch {
                context: self.context(parent),
                requested: T::TYPE,
                stored,
            });
        }
        let value = self.read(parent)?;
        T::project(value).ok_or_else(|| OdimError::TypeMismatch {
            context: self.context(parent),
            requested: T::TYPE,
            stored,
        })
    }

    /// Write a value.
    ///
    /// Creates the attribute if it does not exist. An existing attribute is
    /// overwritten in place when the type and encoded size are unchanged,
    /// and deleted and recreated otherwise so no bytes of an older, larger
    /// value survive. Strings with a NUL byte are refused, since stored text
    /// ends at the first NUL.
    pub(crate) fn set(&self, parent: &Handle, value: &AttributeValue) -> Result<()> {
        if let AttributeValue::String(text) = value {
            if text.contains('\0') {
                return Err(OdimError::bad_value(
                    self.context(parent),
                    "string contains a NUL byte",
                ));
            }
        }
        let storage = parent.storage();
        let data = value.encode();
        let shape = data.shape();
        let ty = value.attribute_type();

        if self.ty.get() == AttributeType::Uninitialized {
            let exists = storage
                .attribute_exists(parent.id(), &self.name)
                .map_err(|source| OdimError::storage(Operation::Open, self.context(parent), source))?;
            if exists {
                self.ty.set(AttributeType::Unknown);
            }
        }

        let stored = self.discover(parent)?;
        let attribute = if stored == AttributeType::Uninitialized {
            self.create(parent, shape)?
        } else if stored != ty || self.shape.get() != Some(shape) {
            debug!(
                name = %self.name,
                from = %stored,
                to = %ty,
                "Recreating attribute with new shape"
            );
            storage.delete_attribute(parent.id(), &self.name).map_err(|source| {
                OdimError::storage(Operation::Remove, self.context(parent), source)
            })?;
            self.ty.set(AttributeType::Uninitialized);
            self.shape.set(None);
            self.create(parent, shape)?
        } else {
            trace!(name = %self.name, "Overwriting attribute in place");
            self.open(parent)?
        };

        storage
            .write_attribute(attribute.id(), &data)
            .map_err(|source| OdimError::storage(Operation::Write, self.context(parent), source))?;
        self.ty.set(ty);
        self.shape.set(Some(shape));
        Ok(())
    }

    fn create(&self, parent: &Handle, shape: AttributeShape) -> Result<Handle> {
        let storage = parent.storage();
        Handle::acquire(
            storage,
            Target::Attribute,
            Operation::Create,
            &self.name,
            Some(parent),
            storage.create_attribute(parent.id(), &self.name, shape),
        )
    }

    /// Remove the attribute from the store.
    pub(crate) fn erase(&self, parent: &Handle) -> Result<()> {
        if !self.is_stored() {
            return Ok(());
        }
        parent
            .storage()
            .delete_attribute(parent.id(), &self.name)
            .map_err(|source| OdimError::storage(Operation::Remove, self.context(parent), source))?;
        self.ty.set(AttributeType::Uninitialized);
        self.shape.set(None);
        Ok(())
    }
}

/// Write an attribute attached directly to `node` rather than to one of its
/// metadata sub-groups.
pub(crate) fn write_direct(node: &Handle, name: &str, value: impl Into<AttributeValue>) -> Result<()> {
    Attribute::creatable(name).set(node, &value.into())
}

/// Read an attribute attached directly to `node`, if present.
pub(crate) fn read_direct<T: FromAttribute>(node: &Handle, name: &str) -> Result<Option<T>> {
    let exists = node
        .storage()
        .attribute_exists(node.id(), name)
        .map_err(|source| {
            OdimError::storage(Operation::Open, node.context(Target::Attribute, name), source)
        })?;
    if !exists {
        return Ok(None);
    }
    Attribute::existing(name).get(node).map(Some)
}
