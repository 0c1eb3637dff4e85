//! Vertical profiles (`VP`): wind and reflectivity by height above a site.

use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::{expect_object, get_count, set_count, Profile, Site};
use crate::config::OdimConfig;
use crate::error::Result;
use crate::file::{File, ObjectType};
use crate::store::{IoMode, Storage};

#[derive(Debug, Clone)]
pub struct VerticalProfile {
    file: File,
}

impl VerticalProfile {
    pub fn create(storage: &Rc<dyn Storage>, path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(storage, path, OdimConfig::default())
    }

    pub fn create_with_config(
        storage: &Rc<dyn Storage>,
        path: impl AsRef<Path>,
        config: OdimConfig,
    ) -> Result<Self> {
        let file = File::create_with_config(storage, path, ObjectType::VerticalProfile, config)?;
        Ok(Self { file })
    }

    /// Open a file, failing with a bad value unless it holds a `VP`.
    pub fn open(storage: &Rc<dyn Storage>, path: impl AsRef<Path>, mode: IoMode) -> Result<Self> {
        let file = File::open(storage, path, mode)?;
        expect_object(&file, ObjectType::VerticalProfile)?;
        Ok(Self { file })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

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

    /// Number of height levels (`where/levels`).
    pub fn levels(&self) -> Result<usize> {
        get_count(self.file.group(), "levels")
    }

    pub fn set_levels(&mut self, levels: usize) -> Result<()> {
        set_count(self.file.group_mut(), "levels", levels)
    }

    /// Vertical distance between levels in metres (`where/interval`).
    pub fn interval(&self) -> Result<f64> {
        self.file.group().get("interval")
    }

    pub fn set_interval(&mut self, metres: f64) -> Result<()> {
        self.file.group_mut().set("interval", metres)
    }

    /// Height of the lowest level's centre, in metres above sea level.
    pub fn min_height(&self) -> Result<f64> {
        self.file.group().get("minheight")
    }

    pub fn set_min_height(&mut self, metres: f64) -> Result<()> {
        self.file.group_mut().set("minheight", metres)
    }

    pub fn max_height(&self) -> Result<f64> {
        self.file.group().get("maxheight")
    }

    pub fn set_max_height(&mut self, metres: f64) -> Result<()> {
        self.file.group_mut().set("maxheight", metres)
    }

    pub fn source(&self) -> Result<String> {
        self.file.source()
    }

    pub fn set_source(&mut self, source: &str) -> Result<()> {
        self.file.set_source(source)
    }

    pub fn date_time(&self) -> Result<DateTime<Utc>> {
        self.file.date_time()
    }

    pub fn set_date_time(&mut self, timestamp: &DateTime<Utc>) -> Result<()> {
        self.file.set_date_time(timestamp)
    }

    pub fn profile_count(&self) -> usize {
        self.file.dataset_count()
    }

    pub fn profile(&self, index: usize) -> Result<Profile> {
        let dataset = self.file.dataset(index)?;
        Ok(Profile::from_dataset(dataset, self.file.config().compression_level))
    }

    /// Add a profile after the last one, tagged with product `VP`.
    pub fn append_profile(&mut self) -> Result<Profile> {
        let dataset = self.file.append_dataset()?;
        Profile::init(dataset, self.file.config().compression_level)
    }

    pub fn flush(&self) -> Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ProductType;
    use crate::sample::SampleType;
    use crate::store::MemoryStorage;

    #[test]
    fn test_profile_layers_follow_levels() {
        let storage: Rc<dyn Storage> = Rc::new(MemoryStorage::new());
        {
            let mut vp = VerticalProfile::create(&storage, "vp.h5").unwrap();
            vp.set_levels(20).unwrap();
            vp.set_interval(200.0).unwrap();
            vp.set_min_height(0.0).unwrap();
            vp.set_max_height(4000.0).unwrap();

            let levels = vp.levels().unwrap();
            let mut profile = vp.append_profile().unwrap();
            let mut speed = profile.append_data("ff", levels).unwrap();
            let values: Vec<f64> = (0..levels).map(|i| i as f64 * 0.5).collect();
            speed.write(&values).unwrap();
            profile.append_data("dd", levels).unwrap();
        }

        let vp = VerticalProfile::open(&storage, "vp.h5", IoMode::ReadOnly).unwrap();
        assert_eq!(vp.levels().unwrap(), 20);
        assert_eq!(vp.interval().unwrap(), 200.0);
        assert_eq!(vp.max_height().unwrap(), 4000.0);
        assert_eq!(vp.profile_count(), 1);

        let profile = vp.profile(1).unwrap();
        assert_eq!(profile.dataset().product().unwrap(), ProductType::Vp);
        assert_eq!(profile.data_count(), 2);
        let speed = profile.find_data("ff").unwrap().unwrap();
        assert_eq!(speed.sample_type().unwrap(), SampleType::F64);
        assert_eq!(speed.shape().unwrap(), vec![20]);
        assert_eq!(speed.read::<f64>().unwrap()[4], 2.0);
        assert!(vp.profile(2).unwrap_err().is_not_found());
    }
}
