//! Top-level ODIM_H5 files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::attribute::{read_direct, write_direct};
use crate::config::{OdimConfig, OdimVersion};
use crate::data::DataSpec;
use crate::dataset::Dataset;
use crate::error::{ErrorContext, OdimError, Operation, Result};
use crate::group::{Children, Group};
use crate::handle::Handle;
use crate::sample::SampleType;
use crate::store::{IoMode, Storage, Target};

/// Name of the root attribute declaring the convention.
pub const CONVENTIONS: &str = "Conventions";

/// Value of the root `what/object`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Polar volume.
    PolarVolume,
    /// Cartesian volume.
    CartesianVolume,
    /// Polar scan.
    Scan,
    /// Single polar ray.
    Ray,
    /// Azimuthal object.
    Azimuthal,
    /// 2-D cartesian image.
    Image,
    /// Cartesian composite.
    Composite,
    /// Vertical cross-section.
    CrossSection,
    /// Vertical profile.
    VerticalProfile,
    /// Embedded graphical image.
    Picture,
    Unknown,
}

impl ObjectType {
    /// Parse an object code (case-sensitive). Unrecognised codes map to
    /// `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "PVOL" => Self::PolarVolume,
            "CVOL" => Self::CartesianVolume,
            "SCAN" => Self::Scan,
            "RAY" => Self::Ray,
            "AZIM" => Self::Azimuthal,
            "IMAGE" => Self::Image,
            "COMP" => Self::Composite,
            "XSEC" => Self::CrossSection,
            "VP" => Self::VerticalProfile,
            "PIC" => Self::Picture,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolarVolume => "PVOL",
            Self::CartesianVolume => "CVOL",
            Self::Scan => "SCAN",
            Self::Ray => "RAY",
            Self::Azimuthal => "AZIM",
            Self::Image => "IMAGE",
            Self::Composite => "COMP",
            Self::CrossSection => "XSEC",
            Self::VerticalProfile => "VP",
            Self::Picture => "PIC",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open ODIM_H5 file: the root group and its `datasetN` children.
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
    group: Group,
    object_type: ObjectType,
    datasets: Children,
    config: OdimConfig,
}

impl File {
    /// Create a file holding an object of the given type, with the default
    /// configuration.
    pub fn create(
        storage: &Rc<dyn Storage>,
        path: impl AsRef<Path>,
        object_type: ObjectType,
    ) -> Result<Self> {
        Self::create_with_config(storage, path, object_type, OdimConfig::default())
    }

    /// Create a file, truncating any existing one.
    ///
    /// Writes the root `Conventions` attribute and `what/object` and
    /// `what/version` for the configured convention version.
    pub fn create_with_config(
        storage: &Rc<dyn Storage>,
        path: impl AsRef<Path>,
        object_type: ObjectType,
        config: OdimConfig,
    ) -> Result<Self> {
        config.validate().map_err(OdimError::Config)?;
        let path = path.as_ref();
        let name = path.display().to_string();
        let root = Handle::acquire(
            storage,
            Target::File,
            Operation::Create,
            &name,
            None,
            storage.create_file(path),
        )?;
        let version = config.odim_version;
        write_direct(&root, CONVENTIONS, version.conventions_string())?;

        let mut group = Group::from_created(root);
        group.set("object", object_type.as_str())?;
        group.set("version", version.version_string())?;

        debug!(path = %name, object = %object_type, version = %version, "Created ODIM_H5 file");
        Ok(Self {
            path: path.to_path_buf(),
            group,
            object_type,
            datasets: Children::empty("dataset"),
            config,
        })
    }

    /// Open an existing file.
    ///
    /// Missing `what` metadata is tolerated; the object type is then
    /// `Unknown`.
    pub fn open(storage: &Rc<dyn Storage>, path: impl AsRef<Path>, mode: IoMode) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let root = Handle::acquire(
            storage,
            Target::File,
            Operation::Open,
            &name,
            None,
            storage.open_file(path, mode),
        )?;
        let group = Group::from_opened(root)?;
        let object_type = group
            .get_opt::<String>("object")?
            .map(|code| ObjectType::from_code(&code))
            .unwrap_or(ObjectType::Unknown);
        let datasets = Children::discover(group.handle(), "dataset")?;
        debug!(
            path = %name,
            ?mode,
            object = %object_type,
            datasets = datasets.count(),
            "Opened ODIM_H5 file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            group,
            object_type,
            datasets,
            config: OdimConfig::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &OdimConfig {
        &self.config
    }

    /// The root node.
    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut Group {
        &mut self.group
    }

    pub fn handle(&self) -> &Handle {
        self.group.handle()
    }

    /// Object type read at open time, or written at creation.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Root `Conventions` attribute, if present.
    pub fn conventions(&self) -> Result<Option<String>> {
        read_direct(self.handle(), CONVENTIONS)
    }

    /// Convention version from `what/version`.
    pub fn version(&self) -> Result<OdimVersion> {
        let value: String = self.group.get("version")?;
        OdimVersion::parse_version(&value).ok_or_else(|| {
            OdimError::bad_value(
                self.handle().context(Target::Attribute, "version"),
                format!("'{}' is not of the form 'H5rad <major>.<minor>'", value),
            )
        })
    }

    /// `what/source`, the radar identifiers.
    pub fn source(&self) -> Result<String> {
        self.group.get("source")
    }

    pub fn set_source(&mut self, source: &str) -> Result<()> {
        self.group.set("source", source)
    }

    /// Nominal time of the product (`what/date` + `what/time`).
    pub fn date_time(&self) -> Result<DateTime<Utc>> {
        self.group.date_time("date", "time")
    }

    pub fn set_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.group.set_date_time("date", "time", timestamp)
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.count()
    }

    /// Open `datasetN` (1-based).
    pub fn dataset(&self, index: usize) -> Result<Dataset> {
        let name = self.datasets.existing(self.handle(), index)?;
        Dataset::open(self.handle(), &name)
    }

    /// Add a dataset after the last one.
    pub fn append_dataset(&mut self) -> Result<Dataset> {
        let dataset = Dataset::create(self.handle(), &self.datasets.next_name())?;
        self.datasets.appended();
        Ok(dataset)
    }

    /// A layer spec using the configured compression level.
    pub fn data_spec(&self, sample_type: SampleType, dims: impl Into<Vec<usize>>) -> DataSpec {
        DataSpec::new(sample_type, dims).with_compression(self.config.compression_level)
    }

    /// Make pending writes durable.
    pub fn flush(&self) -> Result<()> {
        let root = self.handle();
        root.storage().flush(root.id()).map_err(|source| {
            OdimError::storage(
                Operation::Write,
                ErrorContext::named(Target::File, self.path.display().to_string()),
                source,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use chrono::TimeZone;

    fn storage() -> (Rc<MemoryStorage>, Rc<dyn Storage>) {
        let memory = Rc::new(MemoryStorage::new());
        let storage: Rc<dyn Storage> = memory.clone();
        (memory, storage)
    }

    #[test]
    fn test_create_writes_convention_tags() {
        let (_memory, storage) = storage();
        let file = File::create(&storage, "pvol.h5", ObjectType::PolarVolume).unwrap();
        assert_eq!(file.conventions().unwrap().as_deref(), Some("ODIM_H5/V2_2"));
        assert_eq!(file.version().unwrap(), OdimVersion::V2_2);
        assert_eq!(file.group().get::<String>("object").unwrap(), "PVOL");
        assert_eq!(file.dataset_count(), 0);
        file.flush().unwrap();
    }

    #[test]
    fn test_create_with_custom_version() {
        let (_memory, storage) = storage();
        let config = OdimConfig {
            odim_version: OdimVersion::V2_3,
            ..Default::default()
        };
        let file = File::create_with_config(&storage, "vp.h5", ObjectType::VerticalProfile, config)
            .unwrap();
        assert_eq!(
            file.group().get::<String>("version").unwrap(),
            "H5rad 2.3"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (memory, storage) = storage();
        let config = OdimConfig {
            compression_level: Some(12),
            ..Default::default()
        };
        let err = File::create_with_config(&storage, "bad.h5", ObjectType::Scan, config).unwrap_err();
        assert!(matches!(err, OdimError::Config(_)));
        assert!(!memory.contains_file(Path::new("bad.h5")));
    }

    #[test]
    fn test_append_datasets_and_reopen() {
        let (memory, storage) = storage();
        {
            let mut file = File::create(&storage, "scan.h5", ObjectType::PolarVolume).unwrap();
            file.set_source("WMO:02954,NOD:fikor").unwrap();
            let ts = Utc.with_ymd_and_hms(2024, 1, 31, 6, 0, 0).unwrap();
            file.set_date_time(&ts).unwrap();
            for _ in 0..3 {
                file.append_dataset().unwrap();
            }
            assert_eq!(file.dataset_count(), 3);
        }
        assert_eq!(memory.open_object_count(), 0);

        let file = File::open(&storage, "scan.h5", IoMode::ReadOnly).unwrap();
        assert_eq!(file.object_type(), ObjectType::PolarVolume);
        assert_eq!(file.dataset_count(), 3);
        for index in 1..=3 {
            let dataset = file.dataset(index).unwrap();
            assert_eq!(
                dataset.group().path(),
                Some(format!("/dataset{}", index))
            );
        }
        assert!(file.dataset(4).unwrap_err().is_not_found());
        assert_eq!(file.source().unwrap(), "WMO:02954,NOD:fikor");
        assert_eq!(
            file.date_time().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_open_tolerates_missing_metadata() {
        let (_memory, storage) = storage();
        let root = storage.create_file(Path::new("bare.h5")).unwrap();
        storage.dec_ref(root).unwrap();

        let file = File::open(&storage, "bare.h5", IoMode::ReadOnly).unwrap();
        assert_eq!(file.object_type(), ObjectType::Unknown);
        assert_eq!(file.conventions().unwrap(), None);
        assert!(file.version().unwrap_err().is_not_found());
    }

    #[test]
    fn test_open_missing_file() {
        let (_memory, storage) = storage();
        let err = File::open(&storage, "missing.h5", IoMode::ReadOnly).unwrap_err();
        assert!(matches!(err, OdimError::OpenFailed { .. }));
        assert_eq!(
            err.context().and_then(|c| c.name.as_deref()),
            Some("missing.h5")
        );
    }

    #[test]
    fn test_object_codes() {
        assert_eq!(ObjectType::from_code("XSEC"), ObjectType::CrossSection);
        assert_eq!(ObjectType::from_code("pvol"), ObjectType::Unknown);
        assert_eq!(ObjectType::Picture.to_string(), "PIC");
    }
}
