//! `datasetN` groups: one sweep, profile or image and its layers.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::data::{Data, DataSpec, LayerKind};
use crate::error::Result;
use crate::group::{Children, Group};
use crate::handle::Handle;

/// Value of a dataset's `what/product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    Scan,
    Ppi,
    Cappi,
    Pcappi,
    Etop,
    Max,
    Rr,
    Vil,
    Comp,
    Vp,
    Rhi,
    Xsec,
    Vsp,
    Hsp,
    Ray,
    Azim,
    Qual,
    Unknown,
}

impl ProductType {
    /// Parse a product code (case-sensitive). Unrecognised codes map to
    /// `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "SCAN" => Self::Scan,
            "PPI" => Self::Ppi,
            "CAPPI" => Self::Cappi,
            "PCAPPI" => Self::Pcappi,
            "ETOP" => Self::Etop,
            "MAX" => Self::Max,
            "RR" => Self::Rr,
            "VIL" => Self::Vil,
            "COMP" => Self::Comp,
            "VP" => Self::Vp,
            "RHI" => Self::Rhi,
            "XSEC" => Self::Xsec,
            "VSP" => Self::Vsp,
            "HSP" => Self::Hsp,
            "RAY" => Self::Ray,
            "AZIM" => Self::Azim,
            "QUAL" => Self::Qual,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "SCAN",
            Self::Ppi => "PPI",
            Self::Cappi => "CAPPI",
            Self::Pcappi => "PCAPPI",
            Self::Etop => "ETOP",
            Self::Max => "MAX",
            Self::Rr => "RR",
            Self::Vil => "VIL",
            Self::Comp => "COMP",
            Self::Vp => "VP",
            Self::Rhi => "RHI",
            Self::Xsec => "XSEC",
            Self::Vsp => "VSP",
            Self::Hsp => "HSP",
            Self::Ray => "RAY",
            Self::Azim => "AZIM",
            Self::Qual => "QUAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `datasetN` group with its numbered data and quality layers.
#[derive(Debug, Clone)]
pub struct Dataset {
    group: Group,
    data: Children,
    quality: Children,
}

impl Dataset {
    pub fn open(parent: &Handle, name: &str) -> Result<Self> {
        let group = Group::open(parent, name)?;
        let data = Children::discover(group.handle(), LayerKind::Data.base_name())?;
        let quality = Children::discover(group.handle(), LayerKind::Quality.base_name())?;
        Ok(Self {
            group,
            data,
            quality,
        })
    }

    pub fn create(parent: &Handle, name: &str) -> Result<Self> {
        Ok(Self {
            group: Group::create(parent, name)?,
            data: Children::empty(LayerKind::Data.base_name()),
            quality: Children::empty(LayerKind::Quality.base_name()),
        })
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    /// `what/product`.
    pub fn product(&self) -> Result<ProductType> {
        let code: String = self.group.get("product")?;
        Ok(ProductType::from_code(&code))
    }

    pub fn set_product(&mut self, product: ProductType) -> Result<()> {
        self.group.set("product", product.as_str())
    }

    pub fn start_date_time(&self) -> Result<DateTime<Utc>> {
        self.group.date_time("startdate", "starttime")
    }

    pub fn set_start_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.group.set_date_time("startdate", "starttime", timestamp)
    }

    pub fn end_date_time(&self) -> Result<DateTime<Utc>> {
        self.group.date_time("enddate", "endtime")
    }

    pub fn set_end_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.group.set_date_time("enddate", "endtime", timestamp)
    }

    pub fn data_count(&self) -> usize {
        self.data.count()
    }

    /// Open data layer `index` (1-based).
    pub fn data(&self, index: usize) -> Result<Data> {
        let node = self.group.handle();
        let name = self.data.existing(node, index)?;
        Data::open(node, &name, LayerKind::Data)
    }

    /// Add a data layer after the last one.
    pub fn append_data(&mut self, spec: &DataSpec) -> Result<Data> {
        let layer = Data::create(self.group.handle(), &self.data.next_name(), LayerKind::Data, spec)?;
        self.data.appended();
        Ok(layer)
    }

    /// First data layer holding `quantity`, if any.
    pub fn find_data(&self, quantity: &str) -> Result<Option<Data>> {
        for index in 1..=self.data_count() {
            let layer = self.data(index)?;
            if layer.group().get_opt::<String>("quantity")?.as_deref() == Some(quantity) {
                return Ok(Some(layer));
            }
        }
        Ok(None)
    }

    pub fn quality_count(&self) -> usize {
        self.quality.count()
    }

    /// Open dataset-level quality layer `index` (1-based).
    pub fn quality(&self, index: usize) -> Result<Data> {
        let node = self.group.handle();
        let name = self.quality.existing(node, index)?;
        Data::open(node, &name, LayerKind::Quality)
    }

    pub fn append_quality(&mut self, spec: &DataSpec) -> Result<Data> {
        let layer = Data::create(
            self.group.handle(),
            &self.quality.next_name(),
            LayerKind::Quality,
            spec,
        )?;
        self.quality.appended();
        Ok(layer)
    }
}
