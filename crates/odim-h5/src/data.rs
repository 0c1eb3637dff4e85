//! Data and quality layers: a metadata group plus one sample array.

use num_traits::Float;
use tracing::debug;

use crate::attribute::{read_direct, write_direct};
use crate::error::{ErrorContext, OdimError, Operation, Result};
use crate::group::{Children, Group};
use crate::handle::Handle;
use crate::sample::{dispatch_buffer, Sample, SampleBuffer, SampleType};
use crate::store::{DatasetLayout, DatasetSpec, Target};
use crate::transform::{self, Packing, TransformError};

/// Name of the sample array inside a layer group.
pub const ARRAY_NAME: &str = "data";

/// Which numbered collection a layer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// `dataN`: a measured quantity.
    Data,
    /// `qualityN`: per-sample quality of its parent.
    Quality,
}

impl LayerKind {
    /// Base name of the numbered children.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Quality => "quality",
        }
    }
}

/// Creation parameters of a layer's sample array.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSpec {
    pub sample_type: SampleType,
    pub dims: Vec<usize>,
    /// Deflate level 0-9, `None` for no compression.
    pub compression: Option<u8>,
}

impl DataSpec {
    pub fn new(sample_type: SampleType, dims: impl Into<Vec<usize>>) -> Self {
        Self {
            sample_type,
            dims: dims.into(),
            compression: None,
        }
    }

    pub fn with_compression(mut self, level: Option<u8>) -> Self {
        self.compression = level;
        self
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Store parameters: one chunk spanning the whole array.
    fn to_dataset_spec(&self) -> DatasetSpec {
        DatasetSpec {
            sample_type: self.sample_type,
            dims: self.dims.clone(),
            chunk: self.dims.clone(),
            compression: self.compression,
        }
    }
}

/// A `dataN` or `qualityN` group and its `data` array.
#[derive(Debug, Clone)]
pub struct Data {
    group: Group,
    kind: LayerKind,
    array: Handle,
    quality: Children,
}

impl Data {
    /// Open the layer `name` under `parent`.
    pub fn open(parent: &Handle, name: &str, kind: LayerKind) -> Result<Self> {
        let group = Group::open(parent, name)?;
        let node = group.handle();
        let storage = node.storage();
        let array = Handle::acquire(
            storage,
            Target::Dataset,
            Operation::Open,
            ARRAY_NAME,
            Some(node),
            storage.open_dataset(node.id(), ARRAY_NAME),
        )?;
        let quality = Children::discover(node, LayerKind::Quality.base_name())?;
        Ok(Self {
            group,
            kind,
            array,
            quality,
        })
    }

    /// Create the layer `name` under `parent` with an array shaped by `spec`.
    ///
    /// 2-D arrays are tagged as images.
    pub fn create(parent: &Handle, name: &str, kind: LayerKind, spec: &DataSpec) -> Result<Self> {
        if spec.dims.is_empty() || spec.dims.contains(&0) {
            return Err(OdimError::bad_value(
                parent.context(Target::Dataset, name),
                format!("dimensions {:?} must be non-empty and non-zero", spec.dims),
            ));
        }
        let group = Group::create(parent, name)?;
        let node = group.handle();
        let storage = node.storage();
        let array = Handle::acquire(
            storage,
            Target::Dataset,
            Operation::Create,
            ARRAY_NAME,
            Some(node),
            storage.create_dataset(node.id(), ARRAY_NAME, &spec.to_dataset_spec()),
        )?;
        if spec.dims.len() == 2 {
            write_direct(&array, "CLASS", "IMAGE")?;
            write_direct(&array, "IMAGE_VERSION", "1.2")?;
        }
        debug!(
            path = ?array.path(),
            sample_type = %spec.sample_type,
            dims = ?spec.dims,
            compression = ?spec.compression,
            "Created sample array"
        );
        Ok(Self {
            group,
            kind,
            array,
            quality: Children::empty(LayerKind::Quality.base_name()),
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    /// Handle of the sample array.
    pub fn array(&self) -> &Handle {
        &self.array
    }

    pub fn quantity(&self) -> Result<String> {
        self.group.get("quantity")
    }

    pub fn set_quantity(&mut self, quantity: &str) -> Result<()> {
        self.group.set("quantity", quantity)
    }

    /// `what/gain`, 1 when absent.
    pub fn gain(&self) -> Result<f64> {
        self.group.get_or("gain", 1.0)
    }

    pub fn set_gain(&mut self, gain: f64) -> Result<()> {
        self.group.set("gain", gain)
    }

    /// `what/offset`, 0 when absent.
    pub fn offset(&self) -> Result<f64> {
        self.group.get_or("offset", 0.0)
    }

    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.group.set("offset", offset)
    }

    /// Raw code marking samples that were not measured.
    pub fn nodata(&self) -> Result<Option<f64>> {
        self.group.get_opt("nodata")
    }

    pub fn set_nodata(&mut self, code: f64) -> Result<()> {
        self.group.set("nodata", code)
    }

    /// Raw code marking samples where nothing was detected.
    pub fn undetect(&self) -> Result<Option<f64>> {
        self.group.get_opt("undetect")
    }

    pub fn set_undetect(&mut self, code: f64) -> Result<()> {
        self.group.set("undetect", code)
    }

    /// The transform parameters stored on this layer.
    pub fn packing(&self) -> Result<Packing> {
        Ok(Packing {
            gain: self.gain()?,
            offset: self.offset()?,
            nodata: self.nodata()?,
            undetect: self.undetect()?,
        })
    }

    /// Store all transform parameters at once.
    pub fn set_packing(&mut self, packing: &Packing) -> Result<()> {
        self.set_gain(packing.gain)?;
        self.set_offset(packing.offset)?;
        if let Some(code) = packing.nodata {
            self.set_nodata(code)?;
        }
        if let Some(code) = packing.undetect {
            self.set_undetect(code)?;
        }
        Ok(())
    }

    /// `CLASS` attribute of the array, if set.
    pub fn image_class(&self) -> Result<Option<String>> {
        read_direct(&self.array, "CLASS")
    }

    fn layout(&self) -> Result<DatasetLayout> {
        self.array
            .storage()
            .dataset_layout(self.array.id())
            .map_err(|source| {
                OdimError::storage(Operation::Read, self.array_context(), source)
            })
    }

    fn array_context(&self) -> ErrorContext {
        self.group.handle().context(Target::Dataset, ARRAY_NAME)
    }

    /// Dimensions of the array.
    pub fn shape(&self) -> Result<Vec<usize>> {
        Ok(self.layout()?.dims)
    }

    /// Storage type of the array.
    pub fn sample_type(&self) -> Result<SampleType> {
        Ok(self.layout()?.sample_type)
    }

    fn read_buffer(&self) -> Result<SampleBuffer> {
        self.array
            .storage()
            .read_dataset(self.array.id())
            .map_err(|source| OdimError::storage(Operation::Read, self.array_context(), source))
    }

    fn write_buffer(&self, buffer: &SampleBuffer) -> Result<()> {
        self.array
            .storage()
            .write_dataset(self.array.id(), buffer)
            .map_err(|source| OdimError::storage(Operation::Write, self.array_context(), source))
    }

    /// Read the raw samples, converted to `T`.
    ///
    /// Fails with a bad value if a sample does not fit `T`.
    pub fn read<T: Sample>(&self) -> Result<Vec<T>> {
        match T::from_buffer(self.read_buffer()?) {
            Ok(values) => Ok(values),
            Err(buffer) => {
                let stored = buffer.sample_type();
                buffer.convert().map_err(|index| {
                    OdimError::bad_value(
                        self.array_context(),
                        format!("sample {} of type {} does not fit {}", index, stored, T::TYPE),
                    )
                })
            }
        }
    }

    /// Overwrite the whole array with raw samples, converting to the
    /// storage type.
    pub fn write<T: Sample>(&mut self, values: &[T]) -> Result<()> {
        let layout = self.layout()?;
        self.check_len(&layout, values.len())?;
        let buffer = SampleBuffer::from_samples(layout.sample_type, values).map_err(|index| {
            OdimError::bad_value(
                self.array_context(),
                format!(
                    "sample {} ({:?}) does not fit storage type {}",
                    index, values[index], layout.sample_type
                ),
            )
        })?;
        self.write_buffer(&buffer)
    }

    fn check_len(&self, layout: &DatasetLayout, len: usize) -> Result<()> {
        let expected: usize = layout.dims.iter().product();
        if len != expected {
            return Err(OdimError::bad_value(
                self.array_context(),
                format!("{} samples given, array {:?} holds {}", len, layout.dims, expected),
            ));
        }
        Ok(())
    }

    /// Read the array as physical values.
    ///
    /// Samples equal to the layer's `undetect` or `nodata` code become the
    /// given replacements; everything else is `raw * gain + offset`.
    pub fn read_unpacked<P: Sample + Float>(&self, nodata_value: P, undetect_value: P) -> Result<Vec<P>> {
        let packing = self.packing()?;
        let buffer = self.read_buffer()?;
        dispatch_buffer!(buffer, raw => transform::unpack(raw.as_slice(), &packing, nodata_value, undetect_value))
            .map_err(|err| self.transform_error(err))
    }

    /// Write physical values, packing them with the layer's parameters.
    ///
    /// The predicates pick the samples stored as the `nodata` and
    /// `undetect` codes.
    pub fn write_packed<P: Sample>(
        &mut self,
        values: &[P],
        is_nodata: impl Fn(P) -> bool,
        is_undetect: impl Fn(P) -> bool,
    ) -> Result<()> {
        let layout = self.layout()?;
        self.check_len(&layout, values.len())?;
        let packing = self.packing()?;
        let buffer = pack_into(layout.sample_type, values, &packing, &is_nodata, &is_undetect)
            .map_err(|err| self.transform_error(err))?;
        self.write_buffer(&buffer)
    }

    fn transform_error(&self, err: TransformError) -> OdimError {
        OdimError::bad_value(self.array_context(), err.to_string())
    }

    pub fn quality_count(&self) -> usize {
        self.quality.count()
    }

    /// Open quality layer `index` (1-based) of this layer.
    pub fn quality(&self, index: usize) -> Result<Data> {
        let node = self.group.handle();
        let name = self.quality.existing(node, index)?;
        Data::open(node, &name, LayerKind::Quality)
    }

    /// Add a quality layer after the last one.
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

/// Pack into a buffer of the given storage type.
fn pack_into<P: Sample>(
    sample_type: SampleType,
    values: &[P],
    packing: &Packing,
    is_nodata: &impl Fn(P) -> bool,
    is_undetect: &impl Fn(P) -> bool,
) -> std::result::Result<SampleBuffer, TransformError> {
    macro_rules! packed {
        ($ty:ty, $variant:ident) => {
            SampleBuffer::$variant(transform::pack::<$ty, P>(values, packing, is_nodata, is_undetect)?)
        };
    }
    Ok(match sample_type {
        SampleType::I8 => packed!(i8, I8),
        SampleType::U8 => packed!(u8, U8),
        SampleType::I16 => packed!(i16, I16),
        SampleType::U16 => packed!(u16, U16),
        SampleType::I32 => packed!(i32, I32),
        SampleType::U32 => packed!(u32, U32),
        SampleType::I64 => packed!(i64, I64),
        SampleType::U64 => packed!(u64, U64),
        SampleType::F32 => packed!(f32, F32),
        SampleType::F64 => packed!(f64, F64),
    })
}
