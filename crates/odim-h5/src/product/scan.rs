//! Polar scans: one elevation sweep of a volume.

use chrono::{DateTime, Utc};

use super::{get_count, set_count};
use crate::data::{Data, DataSpec};
use crate::dataset::{Dataset, ProductType};
use crate::error::Result;
use crate::sample::SampleType;

/// A `datasetN` holding a polar sweep (`what/product` = `SCAN`).
///
/// Data layers are `nrays` x `nbins` arrays.
#[derive(Debug, Clone)]
pub struct Scan {
    dataset: Dataset,
    compression: Option<u8>,
}

impl Scan {
    /// Tag a freshly created dataset as a scan.
    pub(crate) fn init(mut dataset: Dataset, compression: Option<u8>) -> Result<Self> {
        dataset.set_product(ProductType::Scan)?;
        Ok(Self {
            dataset,
            compression,
        })
    }

    pub(crate) fn from_dataset(dataset: Dataset, compression: Option<u8>) -> Self {
        Self {
            dataset,
            compression,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }

    /// Elevation angle in degrees (`where/elangle`).
    pub fn elevation(&self) -> Result<f64> {
        self.dataset.group().get("elangle")
    }

    pub fn set_elevation(&mut self, degrees: f64) -> Result<()> {
        self.dataset.group_mut().set("elangle", degrees)
    }

    /// Number of rays (`where/nrays`).
    pub fn ray_count(&self) -> Result<usize> {
        get_count(self.dataset.group(), "nrays")
    }

    pub fn set_ray_count(&mut self, rays: usize) -> Result<()> {
        set_count(self.dataset.group_mut(), "nrays", rays)
    }

    /// Number of range bins per ray (`where/nbins`).
    pub fn bin_count(&self) -> Result<usize> {
        get_count(self.dataset.group(), "nbins")
    }

    pub fn set_bin_count(&mut self, bins: usize) -> Result<()> {
        set_count(self.dataset.group_mut(), "nbins", bins)
    }

    /// Range of the start of the first bin, in km (`where/rstart`).
    pub fn range_start(&self) -> Result<f64> {
        self.dataset.group().get("rstart")
    }

    pub fn set_range_start(&mut self, km: f64) -> Result<()> {
        self.dataset.group_mut().set("rstart", km)
    }

    /// Bin length in metres (`where/rscale`).
    pub fn range_scale(&self) -> Result<f64> {
        self.dataset.group().get("rscale")
    }

    pub fn set_range_scale(&mut self, metres: f64) -> Result<()> {
        self.dataset.group_mut().set("rscale", metres)
    }

    /// Index of the first ray radiated (`where/a1gate`).
    pub fn first_ray_radiated(&self) -> Result<usize> {
        get_count(self.dataset.group(), "a1gate")
    }

    pub fn set_first_ray_radiated(&mut self, ray: usize) -> Result<()> {
        set_count(self.dataset.group_mut(), "a1gate", ray)
    }

    pub fn start_date_time(&self) -> Result<DateTime<Utc>> {
        self.dataset.start_date_time()
    }

    pub fn set_start_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.dataset.set_start_date_time(timestamp)
    }

    pub fn end_date_time(&self) -> Result<DateTime<Utc>> {
        self.dataset.end_date_time()
    }

    pub fn set_end_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.dataset.set_end_date_time(timestamp)
    }

    /// Spec of an `nrays` x `nbins` layer. The geometry must be set first.
    fn layer_spec(&self, sample_type: SampleType) -> Result<DataSpec> {
        let dims = vec![self.ray_count()?, self.bin_count()?];
        Ok(DataSpec::new(sample_type, dims).with_compression(self.compression))
    }

    pub fn data_count(&self) -> usize {
        self.dataset.data_count()
    }

    pub fn data(&self, index: usize) -> Result<Data> {
        self.dataset.data(index)
    }

    /// Layer holding `quantity`, if any.
    pub fn find_data(&self, quantity: &str) -> Result<Option<Data>> {
        self.dataset.find_data(quantity)
    }

    /// Add a layer for `quantity`, shaped by the scan geometry.
    pub fn append_data(&mut self, quantity: &str, sample_type: SampleType) -> Result<Data> {
        let spec = self.layer_spec(sample_type)?;
        let mut layer = self.dataset.append_data(&spec)?;
        layer.set_quantity(quantity)?;
        Ok(layer)
    }

    pub fn quality_count(&self) -> usize {
        self.dataset.quality_count()
    }

    pub fn quality(&self, index: usize) -> Result<Data> {
        self.dataset.quality(index)
    }

    /// Add a scan-wide quality layer, shaped by the scan geometry.
    pub fn append_quality(&mut self, sample_type: SampleType) -> Result<Data> {
        let spec = self.layer_spec(sample_type)?;
        self.dataset.append_quality(&spec)
    }
}
