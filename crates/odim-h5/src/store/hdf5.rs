//! libhdf5 engine, through the raw `hdf5-metno-sys` bindings.
//!
//! Ids handed out are `hid_t`s and the reference counting the object model
//! relies on is HDF5's own (`H5Iinc_ref`/`H5Idec_ref`). The root node of a
//! file is the file id itself, which HDF5 accepts as a location everywhere a
//! group id is accepted.
//!
//! Requires libhdf5 (`libhdf5-dev`) at build time.

use std::ffi::{c_char, c_uint, c_void, CStr, CString};
use std::path::Path;
use std::ptr;
use std::sync::Once;

use hdf5_metno_sys::h5::{herr_t, hsize_t, htri_t, H5_index_t, H5_iter_order_t, H5free_memory, H5open};
use hdf5_metno_sys::h5a::{
    H5A_info_t, H5Acreate2, H5Adelete, H5Aexists, H5Aget_space, H5Aget_type, H5Aiterate2, H5Aopen,
    H5Aread, H5Awrite,
};
use hdf5_metno_sys::h5d::{H5Dcreate2, H5Dget_space, H5Dget_type, H5Dopen2, H5Dread, H5Dwrite};
use hdf5_metno_sys::h5e::{H5Eset_auto2, H5E_DEFAULT};
use hdf5_metno_sys::h5f::{
    H5F_scope_t, H5Fcreate, H5Fflush, H5Fopen, H5F_ACC_RDONLY, H5F_ACC_RDWR, H5F_ACC_TRUNC,
};
use hdf5_metno_sys::h5g::{H5Gcreate2, H5Gopen2};
use hdf5_metno_sys::h5i::{hid_t, H5Idec_ref, H5Iget_name, H5Iinc_ref};
use hdf5_metno_sys::h5l::H5Lexists;
use hdf5_metno_sys::h5p::{H5Pcreate, H5Pset_chunk, H5Pset_deflate, H5P_CLS_DATASET_CREATE, H5P_DEFAULT};
use hdf5_metno_sys::h5s::{
    H5S_class_t, H5Screate, H5Screate_simple, H5Sget_simple_extent_dims,
    H5Sget_simple_extent_ndims, H5Sget_simple_extent_npoints, H5S_ALL,
};
use hdf5_metno_sys::h5t::{
    H5T_class_t, H5T_sign_t, H5T_str_t, H5Tcopy, H5Tget_class, H5Tget_sign, H5Tget_size,
    H5Tis_variable_str, H5Tset_size, H5Tset_strpad, H5T_C_S1, H5T_NATIVE_DOUBLE, H5T_NATIVE_FLOAT,
    H5T_NATIVE_INT16, H5T_NATIVE_INT32, H5T_NATIVE_INT64, H5T_NATIVE_INT8, H5T_NATIVE_UINT16,
    H5T_NATIVE_UINT32, H5T_NATIVE_UINT64, H5T_NATIVE_UINT8, H5T_VARIABLE,
};
use tracing::debug;

use super::{
    AttributeData, AttributeShape, DatasetLayout, DatasetSpec, IoMode, ObjectId, Storage,
    StorageClass, StoreError, StoreResult,
};
use crate::config::OdimConfig;
use crate::sample::{dispatch_buffer, SampleBuffer, SampleType};

/// Silence HDF5's automatic error printing to stderr.
///
/// HDF5 prints a diagnostic stack for every failed call, including the
/// existence checks this crate makes routinely. Failures are still reported
/// through return codes. Safe to call more than once.
pub fn silence_library_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: null handlers are the documented way to turn printing off.
        unsafe {
            H5Eset_auto2(H5E_DEFAULT, None, ptr::null_mut());
        }
    });
}

/// Storage engine backed by libhdf5.
#[derive(Debug)]
pub struct Hdf5Storage {
    _private: (),
}

impl Hdf5Storage {
    pub fn new() -> StoreResult<Self> {
        Self::with_config(&OdimConfig::default())
    }

    pub fn with_config(config: &OdimConfig) -> StoreResult<Self> {
        // SAFETY: H5open only initialises the library.
        check(unsafe { H5open() }, "H5open")?;
        if config.silence_library_errors {
            silence_library_errors();
        }
        Ok(Self { _private: () })
    }
}

/// A temporary id (type, dataspace, property list) released on drop.
struct Owned(hid_t);

impl Owned {
    fn new(id: hid_t, call: &str) -> StoreResult<Self> {
        check_id(id, call).map(Self)
    }
}

impl Drop for Owned {
    fn drop(&mut self) {
        // SAFETY: the id was returned by HDF5 and is owned by this guard.
        unsafe {
            H5Idec_ref(self.0);
        }
    }
}

fn check_id(id: hid_t, call: &str) -> StoreResult<ObjectId> {
    if id < 0 {
        return Err(StoreError::Library(format!("{} failed", call)));
    }
    Ok(id)
}

fn check(status: herr_t, call: &str) -> StoreResult<()> {
    if status < 0 {
        return Err(StoreError::Library(format!("{} failed", call)));
    }
    Ok(())
}

fn check_tri(status: htri_t, call: &str) -> StoreResult<bool> {
    if status < 0 {
        return Err(StoreError::Library(format!("{} failed", call)));
    }
    Ok(status > 0)
}

fn c_name(name: &str) -> StoreResult<CString> {
    CString::new(name).map_err(|_| StoreError::NotFound(format!("invalid name '{}'", name)))
}

fn c_path(path: &Path) -> StoreResult<CString> {
    let path = path
        .to_str()
        .ok_or_else(|| StoreError::NotFound(format!("non UTF-8 path {}", path.display())))?;
    c_name(path)
}

fn native_type(sample_type: SampleType) -> hid_t {
    match sample_type {
        SampleType::I8 => *H5T_NATIVE_INT8,
        SampleType::U8 => *H5T_NATIVE_UINT8,
        SampleType::I16 => *H5T_NATIVE_INT16,
        SampleType::U16 => *H5T_NATIVE_UINT16,
        SampleType::I32 => *H5T_NATIVE_INT32,
        SampleType::U32 => *H5T_NATIVE_UINT32,
        SampleType::I64 => *H5T_NATIVE_INT64,
        SampleType::U64 => *H5T_NATIVE_UINT64,
        SampleType::F32 => *H5T_NATIVE_FLOAT,
        SampleType::F64 => *H5T_NATIVE_DOUBLE,
    }
}

/// Sample type of a stored array's datatype.
fn sample_type_of(datatype: hid_t) -> StoreResult<SampleType> {
    // SAFETY: `datatype` is a live type id.
    let (class, size, sign) = unsafe {
        (
            H5Tget_class(datatype),
            H5Tget_size(datatype),
            H5Tget_sign(datatype),
        )
    };
    let signed = sign == H5T_sign_t::H5T_SGN_2;
    let sample_type = match (class, size, signed) {
        (H5T_class_t::H5T_INTEGER, 1, true) => SampleType::I8,
        (H5T_class_t::H5T_INTEGER, 1, false) => SampleType::U8,
        (H5T_class_t::H5T_INTEGER, 2, true) => SampleType::I16,
        (H5T_class_t::H5T_INTEGER, 2, false) => SampleType::U16,
        (H5T_class_t::H5T_INTEGER, 4, true) => SampleType::I32,
        (H5T_class_t::H5T_INTEGER, 4, false) => SampleType::U32,
        (H5T_class_t::H5T_INTEGER, 8, true) => SampleType::I64,
        (H5T_class_t::H5T_INTEGER, 8, false) => SampleType::U64,
        (H5T_class_t::H5T_FLOAT, 4, _) => SampleType::F32,
        (H5T_class_t::H5T_FLOAT, 8, _) => SampleType::F64,
        (class, size, _) => {
            return Err(StoreError::UnsupportedType(format!(
                "{:?} of {} bytes",
                class, size
            )))
        }
    };
    Ok(sample_type)
}

/// Dataspace for an attribute value: scalar for one element or a string.
fn attribute_space(shape: AttributeShape) -> StoreResult<Owned> {
    if shape.class == StorageClass::String || shape.count == 1 {
        // SAFETY: plain constructor.
        return Owned::new(unsafe { H5Screate(H5S_class_t::H5S_SCALAR) }, "H5Screate");
    }
    let dims = [shape.count as hsize_t];
    // SAFETY: `dims` outlives the call.
    Owned::new(
        unsafe { H5Screate_simple(1, dims.as_ptr(), ptr::null()) },
        "H5Screate_simple",
    )
}

/// Fixed-length, null-terminated string type of `size` bytes.
fn fixed_string_type(size: usize) -> StoreResult<Owned> {
    // SAFETY: H5T_C_S1 is a predefined type; the copy is owned by the guard.
    let datatype = Owned::new(unsafe { H5Tcopy(*H5T_C_S1) }, "H5Tcopy")?;
    check(unsafe { H5Tset_size(datatype.0, size) }, "H5Tset_size")?;
    check(
        unsafe { H5Tset_strpad(datatype.0, H5T_str_t::H5T_STR_NULLTERM) },
        "H5Tset_strpad",
    )?;
    Ok(datatype)
}

fn variable_string_type() -> StoreResult<Owned> {
    // SAFETY: as above.
    let datatype = Owned::new(unsafe { H5Tcopy(*H5T_C_S1) }, "H5Tcopy")?;
    check(unsafe { H5Tset_size(datatype.0, H5T_VARIABLE) }, "H5Tset_size")?;
    Ok(datatype)
}

/// Number of elements in an attribute's dataspace.
fn element_count(attribute: hid_t) -> StoreResult<usize> {
    // SAFETY: `attribute` is a live attribute id; the guard releases the space.
    let space = Owned::new(unsafe { H5Aget_space(attribute) }, "H5Aget_space")?;
    let count = unsafe { H5Sget_simple_extent_npoints(space.0) };
    if count < 0 {
        return Err(StoreError::Library("H5Sget_simple_extent_npoints failed".into()));
    }
    Ok(count as usize)
}

/// Read a variable-length string attribute, terminator appended.
fn read_variable_string(attribute: hid_t) -> StoreResult<Vec<u8>> {
    let memtype = variable_string_type()?;
    let mut value: *mut c_char = ptr::null_mut();
    // SAFETY: a scalar variable-length string reads into one pointer that
    // HDF5 allocates and we free.
    check(
        unsafe { H5Aread(attribute, memtype.0, &mut value as *mut _ as *mut c_void) },
        "H5Aread",
    )?;
    if value.is_null() {
        return Ok(vec![0]);
    }
    let mut bytes = unsafe { CStr::from_ptr(value) }.to_bytes().to_vec();
    unsafe {
        H5free_memory(value as *mut c_void);
    }
    bytes.push(0);
    Ok(bytes)
}

unsafe extern "C" fn collect_name(
    _location: hid_t,
    name: *const c_char,
    _info: *const H5A_info_t,
    names: *mut c_void,
) -> herr_t {
    let names = &mut *(names as *mut Vec<String>);
    names.push(CStr::from_ptr(name).to_string_lossy().into_owned());
    0
}

impl Storage for Hdf5Storage {
    fn inc_ref(&self, id: ObjectId) -> StoreResult<()> {
        // SAFETY: HDF5 validates the id.
        if unsafe { H5Iinc_ref(id) } < 0 {
            return Err(StoreError::InvalidId(id));
        }
        Ok(())
    }

    fn dec_ref(&self, id: ObjectId) -> StoreResult<()> {
        // SAFETY: HDF5 validates the id.
        if unsafe { H5Idec_ref(id) } < 0 {
            return Err(StoreError::InvalidId(id));
        }
        Ok(())
    }

    fn path_of(&self, id: ObjectId) -> Option<String> {
        // SAFETY: a null buffer asks for the length only; the second call
        // writes at most `len + 1` bytes into `buffer`.
        let len = unsafe { H5Iget_name(id, ptr::null_mut(), 0) };
        if len <= 0 {
            return None;
        }
        let mut buffer = vec![0u8; len as usize + 1];
        let written =
            unsafe { H5Iget_name(id, buffer.as_mut_ptr() as *mut c_char, buffer.len()) };
        if written <= 0 {
            return None;
        }
        buffer.truncate(written as usize);
        String::from_utf8(buffer).ok()
    }

    fn create_file(&self, path: &Path) -> StoreResult<ObjectId> {
        let cpath = c_path(path)?;
        // SAFETY: `cpath` outlives the call.
        let id = unsafe { H5Fcreate(cpath.as_ptr(), H5F_ACC_TRUNC, H5P_DEFAULT, H5P_DEFAULT) };
        let id = check_id(id, "H5Fcreate")?;
        debug!(path = %path.display(), "Created HDF5 file");
        Ok(id)
    }

    fn open_file(&self, path: &Path, mode: IoMode) -> StoreResult<ObjectId> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let cpath = c_path(path)?;
        let flags: c_uint = if mode.is_writable() {
            H5F_ACC_RDWR
        } else {
            H5F_ACC_RDONLY
        };
        // SAFETY: `cpath` outlives the call.
        check_id(unsafe { H5Fopen(cpath.as_ptr(), flags, H5P_DEFAULT) }, "H5Fopen")
    }

    fn flush(&self, id: ObjectId) -> StoreResult<()> {
        // SAFETY: any object id of the file is accepted.
        check(
            unsafe { H5Fflush(id, H5F_scope_t::H5F_SCOPE_GLOBAL) },
            "H5Fflush",
        )
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        let id = unsafe {
            H5Gcreate2(parent, cname.as_ptr(), H5P_DEFAULT, H5P_DEFAULT, H5P_DEFAULT)
        };
        check_id(id, "H5Gcreate2")
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        if !self.child_exists(parent, name)? {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check_id(unsafe { H5Gopen2(parent, cname.as_ptr(), H5P_DEFAULT) }, "H5Gopen2")
    }

    fn child_exists(&self, parent: ObjectId, name: &str) -> StoreResult<bool> {
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check_tri(unsafe { H5Lexists(parent, cname.as_ptr(), H5P_DEFAULT) }, "H5Lexists")
    }

    fn attribute_names(&self, node: ObjectId) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        // SAFETY: `collect_name` only touches `names`, which outlives the
        // iteration.
        check(
            unsafe {
                H5Aiterate2(
                    node,
                    H5_index_t::H5_INDEX_NAME,
                    H5_iter_order_t::H5_ITER_INC,
                    ptr::null_mut(),
                    Some(collect_name),
                    &mut names as *mut Vec<String> as *mut c_void,
                )
            },
            "H5Aiterate2",
        )?;
        Ok(names)
    }

    fn attribute_exists(&self, node: ObjectId, name: &str) -> StoreResult<bool> {
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check_tri(unsafe { H5Aexists(node, cname.as_ptr()) }, "H5Aexists")
    }

    fn create_attribute(
        &self,
        node: ObjectId,
        name: &str,
        shape: AttributeShape,
    ) -> StoreResult<ObjectId> {
        let cname = c_name(name)?;
        let space = attribute_space(shape)?;
        let string_type;
        let datatype = match shape.class {
            StorageClass::Integer => *H5T_NATIVE_INT64,
            StorageClass::Float => *H5T_NATIVE_DOUBLE,
            StorageClass::String => {
                string_type = fixed_string_type(shape.count)?;
                string_type.0
            }
        };
        // SAFETY: all ids are live for the duration of the call.
        let id = unsafe {
            H5Acreate2(node, cname.as_ptr(), datatype, space.0, H5P_DEFAULT, H5P_DEFAULT)
        };
        check_id(id, "H5Acreate2")
    }

    fn open_attribute(&self, node: ObjectId, name: &str) -> StoreResult<ObjectId> {
        if !self.attribute_exists(node, name)? {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check_id(unsafe { H5Aopen(node, cname.as_ptr(), H5P_DEFAULT) }, "H5Aopen")
    }

    fn delete_attribute(&self, node: ObjectId, name: &str) -> StoreResult<()> {
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check(unsafe { H5Adelete(node, cname.as_ptr()) }, "H5Adelete")
    }

    fn attribute_shape(&self, attribute: ObjectId) -> StoreResult<AttributeShape> {
        // SAFETY: `attribute` is a live attribute id; the guards release the
        // type and space.
        let datatype = Owned::new(unsafe { H5Aget_type(attribute) }, "H5Aget_type")?;
        let class = unsafe { H5Tget_class(datatype.0) };
        match class {
            H5T_class_t::H5T_STRING => {
                // Reads below fill exactly one string.
                let count = element_count(attribute)?;
                if count != 1 {
                    return Err(StoreError::UnsupportedType(format!(
                        "string array of {} elements",
                        count
                    )));
                }
                if check_tri(unsafe { H5Tis_variable_str(datatype.0) }, "H5Tis_variable_str")? {
                    let bytes = read_variable_string(attribute)?;
                    return Ok(AttributeShape::new(StorageClass::String, bytes.len()));
                }
                let size = unsafe { H5Tget_size(datatype.0) };
                Ok(AttributeShape::new(StorageClass::String, size))
            }
            H5T_class_t::H5T_INTEGER | H5T_class_t::H5T_FLOAT => {
                let count = element_count(attribute)?;
                let storage_class = if class == H5T_class_t::H5T_INTEGER {
                    StorageClass::Integer
                } else {
                    StorageClass::Float
                };
                Ok(AttributeShape::new(storage_class, count))
            }
            other => Err(StoreError::UnsupportedType(format!("{:?}", other))),
        }
    }

    fn read_attribute(&self, attribute: ObjectId) -> StoreResult<AttributeData> {
        let shape = self.attribute_shape(attribute)?;
        match shape.class {
            StorageClass::Integer => {
                let mut values = vec![0i64; shape.count];
                // SAFETY: `values` holds `count` native 64-bit integers.
                check(
                    unsafe {
                        H5Aread(attribute, *H5T_NATIVE_INT64, values.as_mut_ptr() as *mut c_void)
                    },
                    "H5Aread",
                )?;
                Ok(AttributeData::Integers(values))
            }
            StorageClass::Float => {
                let mut values = vec![0f64; shape.count];
                // SAFETY: `values` holds `count` native doubles.
                check(
                    unsafe {
                        H5Aread(attribute, *H5T_NATIVE_DOUBLE, values.as_mut_ptr() as *mut c_void)
                    },
                    "H5Aread",
                )?;
                Ok(AttributeData::Reals(values))
            }
            StorageClass::String => {
                let datatype = Owned::new(unsafe { H5Aget_type(attribute) }, "H5Aget_type")?;
                if check_tri(unsafe { H5Tis_variable_str(datatype.0) }, "H5Tis_variable_str")? {
                    return read_variable_string(attribute).map(AttributeData::Text);
                }
                // Stored type: other producers may pad with NULs or spaces.
                let mut bytes = vec![0u8; shape.count];
                // SAFETY: `bytes` holds exactly one fixed-length string.
                check(
                    unsafe { H5Aread(attribute, datatype.0, bytes.as_mut_ptr() as *mut c_void) },
                    "H5Aread",
                )?;
                Ok(AttributeData::Text(bytes))
            }
        }
    }

    fn write_attribute(&self, attribute: ObjectId, data: &AttributeData) -> StoreResult<()> {
        let stored = self.attribute_shape(attribute)?;
        if stored != data.shape() {
            return Err(StoreError::ShapeMismatch(format!(
                "attribute is {:?}, value is {:?}",
                stored,
                data.shape()
            )));
        }
        // SAFETY: each buffer matches the memory type and the stored shape.
        let status = match data {
            AttributeData::Integers(values) => unsafe {
                H5Awrite(attribute, *H5T_NATIVE_INT64, values.as_ptr() as *const c_void)
            },
            AttributeData::Reals(values) => unsafe {
                H5Awrite(attribute, *H5T_NATIVE_DOUBLE, values.as_ptr() as *const c_void)
            },
            AttributeData::Text(bytes) => {
                let memtype = fixed_string_type(bytes.len())?;
                unsafe { H5Awrite(attribute, memtype.0, bytes.as_ptr() as *const c_void) }
            }
        };
        check(status, "H5Awrite")
    }

    fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        spec: &DatasetSpec,
    ) -> StoreResult<ObjectId> {
        if spec.chunk.len() != spec.dims.len() {
            return Err(StoreError::ShapeMismatch(format!(
                "chunk {:?} does not fit dimensions {:?}",
                spec.chunk, spec.dims
            )));
        }
        let cname = c_name(name)?;
        let dims: Vec<hsize_t> = spec.dims.iter().map(|&d| d as hsize_t).collect();
        let chunk: Vec<hsize_t> = spec.chunk.iter().map(|&c| c as hsize_t).collect();
        let rank = dims.len() as i32;

        // SAFETY: `dims`/`chunk` outlive the calls; the guards release the
        // dataspace and property list.
        let space = Owned::new(
            unsafe { H5Screate_simple(rank, dims.as_ptr(), ptr::null()) },
            "H5Screate_simple",
        )?;
        let dcpl = Owned::new(unsafe { H5Pcreate(*H5P_CLS_DATASET_CREATE) }, "H5Pcreate")?;
        check(unsafe { H5Pset_chunk(dcpl.0, rank, chunk.as_ptr()) }, "H5Pset_chunk")?;
        if let Some(level) = spec.compression {
            check(unsafe { H5Pset_deflate(dcpl.0, level as c_uint) }, "H5Pset_deflate")?;
        }
        let id = unsafe {
            H5Dcreate2(
                parent,
                cname.as_ptr(),
                native_type(spec.sample_type),
                space.0,
                H5P_DEFAULT,
                dcpl.0,
                H5P_DEFAULT,
            )
        };
        check_id(id, "H5Dcreate2")
    }

    fn open_dataset(&self, parent: ObjectId, name: &str) -> StoreResult<ObjectId> {
        if !self.child_exists(parent, name)? {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let cname = c_name(name)?;
        // SAFETY: `cname` outlives the call.
        check_id(unsafe { H5Dopen2(parent, cname.as_ptr(), H5P_DEFAULT) }, "H5Dopen2")
    }

    fn dataset_layout(&self, dataset: ObjectId) -> StoreResult<DatasetLayout> {
        // SAFETY: `dataset` is a live dataset id; the guards release the
        // type and space, and `dims` is sized from the reported rank.
        let datatype = Owned::new(unsafe { H5Dget_type(dataset) }, "H5Dget_type")?;
        let sample_type = sample_type_of(datatype.0)?;
        let space = Owned::new(unsafe { H5Dget_space(dataset) }, "H5Dget_space")?;
        let rank = unsafe { H5Sget_simple_extent_ndims(space.0) };
        if rank < 0 {
            return Err(StoreError::Library("H5Sget_simple_extent_ndims failed".into()));
        }
        let mut dims = vec![0 as hsize_t; rank as usize];
        check(
            unsafe { H5Sget_simple_extent_dims(space.0, dims.as_mut_ptr(), ptr::null_mut()) },
            "H5Sget_simple_extent_dims",
        )?;
        Ok(DatasetLayout {
            sample_type,
            dims: dims.into_iter().map(|d| d as usize).collect(),
        })
    }

    fn read_dataset(&self, dataset: ObjectId) -> StoreResult<SampleBuffer> {
        let layout = self.dataset_layout(dataset)?;
        let len = layout.dims.iter().product();
        let mut buffer = SampleBuffer::zeroed(layout.sample_type, len);
        let memtype = native_type(layout.sample_type);
        let target = dispatch_buffer!(&mut buffer, values => values.as_mut_ptr() as *mut c_void);
        // SAFETY: `buffer` holds every element of the array in the memory
        // type passed.
        check(
            unsafe { H5Dread(dataset, memtype, H5S_ALL, H5S_ALL, H5P_DEFAULT, target) },
            "H5Dread",
        )?;
        Ok(buffer)
    }

    fn write_dataset(&self, dataset: ObjectId, data: &SampleBuffer) -> StoreResult<()> {
        let layout = self.dataset_layout(dataset)?;
        let len: usize = layout.dims.iter().product();
        if layout.sample_type != data.sample_type() || len != data.len() {
            return Err(StoreError::ShapeMismatch(format!(
                "array holds {} x {}, buffer is {} x {}",
                len,
                layout.sample_type,
                data.len(),
                data.sample_type()
            )));
        }
        let memtype = native_type(data.sample_type());
        let source = dispatch_buffer!(data, values => values.as_ptr() as *const c_void);
        // SAFETY: `data` holds every element of the array in the memory type
        // passed.
        check(
            unsafe { H5Dwrite(dataset, memtype, H5S_ALL, H5S_ALL, H5P_DEFAULT, source) },
            "H5Dwrite",
        )
    }
}
