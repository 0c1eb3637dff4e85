//! Polar volumes (`PVOL`): a set of scans from one radar.

use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::{expect_object, Scan, Site};
use crate::config::OdimConfig;
use crate::error::Result;
use crate::file::{File, ObjectType};
use crate::store::{IoMode, Storage};

#[derive(Debug, Clone)]
pub struct PolarVolume {
    file: File,
}

impl PolarVolume {
    pub fn create(storage: &Rc<dyn Storage>, path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(storage, path, OdimConfig::default())
    }

    pub fn create_with_config(
        storage: &Rc<dyn Storage>,
        path: impl AsRef<Path>,
        config: OdimConfig,
    ) -> Result<Self> {
        let file = File::create_with_config(storage, path, ObjectType::PolarVolume, config)?;
        Ok(Self { file })
    }

    /// Open a file, failing with a bad value unless it holds a `PVOL`.
    pub fn open(storage: &Rc<dyn Storage>, path: impl AsRef<Path>, mode: IoMode) -> Result<Self> {
        let file = File::open(storage, path, mode)?;
        expect_object(&file, ObjectType::PolarVolume)?;
        Ok(Self { file })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Position of the radar (root `where`).
    pub fn site(&self) -> Result<Site> {
        Site::read(self.file.group())
    }

    pub fn set_site(&mut self, site: &Site) -> Result<()> {
        site.write(self.file.group_mut())
    }

    pub fn latitude(&self) -> Result<f64> {
        self.file.group().get("lat")
    }

    pub fn longitude(&self) -> Result<f64> {
        self.file.group().get("lon")
    }

    pub fn height(&self) -> Result<f64> {
        self.file.group().get("height")
    }

    pub fn source(&self) -> Result<String> {
        self.file.source()
    }

    pub fn set_source(&mut self, source: &str) -> Result<()> {
        self.file.set_source(source)
    }

    /// Nominal time of the volume.
    pub fn date_time(&self) -> Result<DateTime<Utc>> {
        self.file.date_time()
    }

    pub fn set_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.file.set_date_time(timestamp)
    }

    pub fn scan_count(&self) -> usize {
        self.file.dataset_count()
    }

    /// Open scan `index` (1-based).
    pub fn scan(&self, index: usize) -> Result<Scan> {
        let dataset = self.file.dataset(index)?;
        Ok(Scan::from_dataset(dataset, self.file.config().compression_level))
    }

    /// Add a scan after the last one, tagged with product `SCAN`.
    pub fn append_scan(&mut self) -> Result<Scan> {
        let dataset = self.file.append_dataset()?;
        Scan::init(dataset, self.file.config().compression_level)
    }

    pub fn flush(&self) -> Result<()> {
        self.file.flush()
    }
}
