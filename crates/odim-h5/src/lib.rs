//! Typed object model for ODIM_H5 weather radar files.
//!
//! ODIM_H5 (the OPERA Data Information Model for HDF5) stores radar products
//! as a hierarchy of groups. Metadata lives in attributes grouped under
//! `what`, `where` and `how` sub-groups, and sample arrays are named `data`:
//!
//! ```text
//! /                       Conventions = "ODIM_H5/V2_2"
//! ├── what                object, version, date, time, source
//! ├── where               lat, lon, height
//! └── dataset1            what/product, where/elangle, nrays, nbins ...
//!     ├── data1           what/quantity, gain, offset, nodata, undetect
//!     │   ├── data        the sample array
//!     │   └── quality1
//!     └── quality1
//! ```
//!
//! # Layers
//!
//! - [`store`]: the [`Storage`] contract, an in-memory engine and (feature
//!   `hdf5`) a libhdf5 engine.
//! - [`Handle`], [`Attribute`], [`AttributeStore`]: reference-counted ids and
//!   typed attribute access, with names routed to `what`/`where`/`how`.
//! - [`Group`], [`Dataset`], [`Data`], [`File`]: the generic node types.
//! - [`product`]: polar volumes, scans and vertical profiles.
//! - [`transform`]: raw/physical conversion with `gain`, `offset`, `nodata`
//!   and `undetect`.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use odim_h5::{IoMode, MemoryStorage, PolarVolume, SampleType, Storage};
//!
//! let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
//! {
//!     let mut volume = PolarVolume::create(&storage, "pvol.h5")?;
//!     let mut scan = volume.append_scan()?;
//!     scan.set_elevation(0.5)?;
//!     scan.set_ray_count(360)?;
//!     scan.set_bin_count(500)?;
//!     scan.append_data("DBZH", SampleType::U8)?;
//! }
//!
//! let volume = PolarVolume::open(&storage, "pvol.h5", IoMode::ReadOnly)?;
//! let scan = volume.scan(1)?;
//! assert_eq!(scan.elevation()?, 0.5);
//! assert_eq!(scan.data(1)?.shape()?, vec![360, 500]);
//! # Ok::<(), odim_h5::OdimError>(())
//! ```

pub mod attribute;
pub mod attribute_store;
pub mod config;
pub mod data;
pub mod dataset;
pub mod datetime;
pub mod error;
pub mod file;
pub mod group;
pub mod handle;
pub mod product;
pub mod sample;
pub mod store;
pub mod transform;
pub mod vocabulary;

pub use attribute::{Attribute, AttributeType, AttributeValue, FromAttribute};
pub use attribute_store::{AttributeMut, AttributeRef, AttributeStore};
pub use config::{OdimConfig, OdimVersion};
pub use data::{Data, DataSpec, LayerKind};
pub use dataset::{Dataset, ProductType};
pub use error::{ErrorContext, OdimError, Operation, Result};
pub use file::{File, ObjectType};
pub use group::Group;
pub use handle::Handle;
pub use product::{PolarVolume, Profile, Scan, Site, VerticalProfile};
pub use sample::{Sample, SampleBuffer, SampleType};
pub use store::{IoMode, MemoryStorage, Storage, Target};
pub use transform::{Packing, TransformError};
pub use vocabulary::Slot;

#[cfg(feature = "hdf5")]
pub use store::Hdf5Storage;
