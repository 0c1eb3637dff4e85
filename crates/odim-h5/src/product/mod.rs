//! Typed views of the standard products.
//!
//! These map the semantic fields of each product (elevation angle, range
//! gate geometry, site position, …) onto attribute lookups and enforce the
//! object and product tags the convention requires.

pub mod profile;
pub mod scan;
pub mod vertical_profile;
pub mod volume;

pub use profile::Profile;
pub use scan::Scan;
pub use vertical_profile::VerticalProfile;
pub use volume::PolarVolume;

use crate::error::{OdimError, Result};
use crate::file::{File, ObjectType};
use crate::group::Group;
use crate::store::Target;

/// Fail unless `file` holds an object of the expected type.
pub(crate) fn expect_object(file: &File, expected: ObjectType) -> Result<()> {
    let found = file.object_type();
    if found != expected {
        return Err(OdimError::bad_value(
            file.handle().context(Target::Attribute, "object"),
            format!("expected {}, file holds {}", expected, found),
        ));
    }
    Ok(())
}

/// Read a non-negative integer attribute as a count.
pub(crate) fn get_count(group: &Group, name: &str) -> Result<usize> {
    let value: i64 = group.get(name)?;
    usize::try_from(value).map_err(|_| {
        OdimError::bad_value(
            group.handle().context(Target::Attribute, name),
            format!("{} is not a valid count", value),
        )
    })
}

/// Write a count as an integer attribute.
pub(crate) fn set_count(group: &mut Group, name: &str, value: usize) -> Result<()> {
    let value = i64::try_from(value).map_err(|_| {
        OdimError::bad_value(
            group.handle().context(Target::Attribute, name),
            format!("{} does not fit a 64-bit integer", value),
        )
    })?;
    group.set(name, value)
}

/// Latitude, longitude and height of a radar site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Metres above sea level.
    pub height: f64,
}

impl Site {
    pub(crate) fn read(group: &Group) -> Result<Self> {
        Ok(Self {
            latitude: group.get("lat")?,
            longitude: group.get("lon")?,
            height: group.get("height")?,
        })
    }

    pub(crate) fn write(&self, group: &mut Group) -> Result<()> {
        group.set("lat", self.latitude)?;
        group.set("lon", self.longitude)?;
        group.set("height", self.height)
    }
}
