//! One vertical profile: a `datasetN` with product `VP`.

use chrono::{DateTime, Utc};

use crate::data::{Data, DataSpec};
use crate::dataset::{Dataset, ProductType};
use crate::error::Result;
use crate::sample::SampleType;

/// Profile layers are 1-D arrays with one sample per height level.
#[derive(Debug, Clone)]
pub struct Profile {
    dataset: Dataset,
    compression: Option<u8>,
}

impl Profile {
    pub(crate) fn init(mut dataset: Dataset, compression: Option<u8>) -> Result<Self> {
        dataset.set_product(ProductType::Vp)?;
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

    pub fn data_count(&self) -> usize {
        self.dataset.data_count()
    }

    pub fn data(&self, index: usize) -> Result<Data> {
        self.dataset.data(index)
    }

    pub fn find_data(&self, quantity: &str) -> Result<Option<Data>> {
        self.dataset.find_data(quantity)
    }

    /// Add a `levels`-long layer of 64-bit floats for `quantity`.
    pub fn append_data(&mut self, quantity: &str, levels: usize) -> Result<Data> {
        let spec = DataSpec::new(SampleType::F64, vec![levels]).with_compression(self.compression);
        let mut layer = self.dataset.append_data(&spec)?;
        layer.set_quantity(quantity)?;
        Ok(layer)
    }
}
