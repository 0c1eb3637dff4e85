//! End-to-end tests of the object model over the in-memory engine.
//!
//! These tests don't require libhdf5 or sample files.

use std::rc::Rc;

use odim_h5::{
    Data, IoMode, MemoryStorage, ObjectType, OdimConfig, OdimError, Packing, PolarVolume,
    SampleType, Storage, VerticalProfile,
};
use test_utils::fixtures::{packing, scan, site, timestamps};
use test_utils::{
    assert_approx_eq, assert_samples_approx_eq, create_reflectivity_sweep, create_velocity_sweep,
    with_gaps,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn memory() -> (Rc<MemoryStorage>, Rc<dyn Storage>) {
    let memory = Rc::new(MemoryStorage::new());
    let storage: Rc<dyn Storage> = memory.clone();
    (memory, storage)
}

fn to_packing((gain, offset, nodata, undetect): (f64, f64, f64, f64)) -> Packing {
    Packing::new(gain, offset)
        .with_nodata(nodata)
        .with_undetect(undetect)
}

fn dbzh_packing() -> Packing {
    to_packing(packing::DBZH_U8)
}

// ============================================================================
// Volumes
// ============================================================================

#[test]
fn test_volume_round_trip() {
    init_tracing();
    let (memory, storage) = memory();
    {
        let mut volume = PolarVolume::create(&storage, "pvol.h5").unwrap();
        let (lat, lon, height) = site::VANTAA;
        volume.set_site(&odim_h5::Site { latitude: lat, longitude: lon, height }).unwrap();
        volume.set_source("WMO:02974,NOD:fivan").unwrap();

        for geometry in scan::VOLUME {
            let mut sweep = volume.append_scan().unwrap();
            sweep.set_elevation(geometry.elangle).unwrap();
            sweep.set_ray_count(geometry.nrays).unwrap();
            sweep.set_bin_count(geometry.nbins).unwrap();
            sweep.set_range_start(geometry.rstart).unwrap();
            sweep.set_range_scale(geometry.rscale).unwrap();
            sweep.append_data("DBZH", SampleType::U8).unwrap();
        }
        volume.flush().unwrap();
    }
    assert_eq!(memory.open_object_count(), 0);

    let volume = PolarVolume::open(&storage, "pvol.h5", IoMode::ReadOnly).unwrap();
    assert_eq!(volume.file().object_type(), ObjectType::PolarVolume);
    assert_eq!(volume.scan_count(), 3);
    assert_approx_eq!(volume.latitude().unwrap(), site::VANTAA.0, 1e-12);
    assert_eq!(volume.source().unwrap(), "WMO:02974,NOD:fivan");

    for (index, geometry) in scan::VOLUME.iter().enumerate() {
        let sweep = volume.scan(index + 1).unwrap();
        assert_eq!(sweep.elevation().unwrap(), geometry.elangle);
        assert_eq!(sweep.range_scale().unwrap(), geometry.rscale);
        assert_eq!(sweep.data(1).unwrap().shape().unwrap(), geometry.dims());
    }
}

#[test]
fn test_append_then_reopen_counts_children() {
    let (_, storage) = memory();
    {
        let mut volume = PolarVolume::create(&storage, "count.h5").unwrap();
        for _ in 0..4 {
            volume.append_scan().unwrap();
        }
        assert_eq!(volume.scan_count(), 4);
    }

    let volume = PolarVolume::open(&storage, "count.h5", IoMode::ReadOnly).unwrap();
    assert_eq!(volume.scan_count(), 4);
    assert!(volume.scan(4).is_ok());
    assert!(volume.scan(5).unwrap_err().is_not_found());
    assert!(volume.scan(0).unwrap_err().is_not_found());
}

#[test]
fn test_read_only_reopen_rejects_writes() {
    let (_, storage) = memory();
    {
        let mut volume = PolarVolume::create(&storage, "ro.h5").unwrap();
        volume.set_source("NOD:fivan").unwrap();
    }

    let mut volume = PolarVolume::open(&storage, "ro.h5", IoMode::ReadOnly).unwrap();
    assert!(volume.set_source("NOD:fikor").is_err());
    assert!(volume.append_scan().is_err());
    assert_eq!(volume.source().unwrap(), "NOD:fivan");
}

#[test]
fn test_read_write_reopen_appends() {
    let (_, storage) = memory();
    {
        let mut volume = PolarVolume::create(&storage, "rw.h5").unwrap();
        volume.append_scan().unwrap();
    }
    {
        let mut volume = PolarVolume::open(&storage, "rw.h5", IoMode::ReadWrite).unwrap();
        let mut sweep = volume.append_scan().unwrap();
        sweep.set_elevation(2.5).unwrap();
    }

    let volume = PolarVolume::open(&storage, "rw.h5", IoMode::ReadOnly).unwrap();
    assert_eq!(volume.scan_count(), 2);
    assert_eq!(volume.scan(2).unwrap().elevation().unwrap(), 2.5);
}

#[test]
fn test_missing_file_is_open_failure() {
    let (_, storage) = memory();
    let err = PolarVolume::open(&storage, "nowhere.h5", IoMode::ReadOnly).unwrap_err();
    assert!(matches!(err, OdimError::OpenFailed { .. }));
}

// ============================================================================
// Data layers
// ============================================================================

fn tiny_layer(storage: &Rc<dyn Storage>, path: &str) -> (PolarVolume, Data) {
    let geometry = scan::TINY;
    let mut volume = PolarVolume::create(storage, path).unwrap();
    let mut sweep = volume.append_scan().unwrap();
    sweep.set_ray_count(geometry.nrays).unwrap();
    sweep.set_bin_count(geometry.nbins).unwrap();
    let mut layer = sweep.append_data("DBZH", SampleType::U8).unwrap();
    layer.set_packing(&dbzh_packing()).unwrap();
    (volume, layer)
}

#[test]
fn test_pack_unpack_through_layer() {
    let (_, storage) = memory();
    let (gain, offset, _, _) = packing::DBZH_U8;
    let geometry = scan::TINY;

    let physical = with_gaps(create_reflectivity_sweep(geometry.nrays, geometry.nbins), 5);
    {
        let (_volume, mut layer) = tiny_layer(&storage, "pack.h5");
        layer
            .write_packed(&physical, |v: f64| v.is_nan(), |v: f64| v < offset + gain / 2.0)
            .unwrap();
    }

    let volume = PolarVolume::open(&storage, "pack.h5", IoMode::ReadOnly).unwrap();
    let layer = volume.scan(1).unwrap().find_data("DBZH").unwrap().unwrap();
    assert_eq!(layer.packing().unwrap(), dbzh_packing());

    let unpacked: Vec<f64> = layer.read_unpacked(f64::NAN, -32.0).unwrap();
    assert_samples_approx_eq!(unpacked, physical, gain / 2.0);

    let raw: Vec<u8> = layer.read().unwrap();
    assert_eq!(raw[0], 255);
}

#[test]
fn test_full_sweep_with_reflectivity_and_velocity() {
    let (memory, storage) = memory();
    let geometry = scan::LOWEST;
    let reflectivity = with_gaps(create_reflectivity_sweep(geometry.nrays, geometry.nbins), 7);
    let velocity = create_velocity_sweep(geometry.nrays, geometry.nbins, 20.0, 45.0);
    {
        let mut volume = PolarVolume::create(&storage, "deemd.h5").unwrap();
        let (lat, lon, height) = site::EMDEN;
        volume.set_site(&odim_h5::Site { latitude: lat, longitude: lon, height }).unwrap();
        let (date, time) = timestamps::NOMINAL;
        volume.file_mut().group_mut().set("date", date).unwrap();
        volume.file_mut().group_mut().set("time", time).unwrap();

        let mut sweep = volume.append_scan().unwrap();
        sweep.set_elevation(geometry.elangle).unwrap();
        sweep.set_ray_count(geometry.nrays).unwrap();
        sweep.set_bin_count(geometry.nbins).unwrap();

        let mut dbzh = sweep.append_data("DBZH", SampleType::U16).unwrap();
        dbzh.set_packing(&to_packing(packing::DBZH_U16)).unwrap();
        dbzh.write_packed(&reflectivity, |v: f64| v.is_nan(), |_| false).unwrap();

        let mut vradh = sweep.append_data("VRADH", SampleType::U8).unwrap();
        vradh.set_packing(&to_packing(packing::VRADH_U8)).unwrap();
        vradh.write_packed(&velocity, |_| false, |_| false).unwrap();
    }
    assert_eq!(memory.open_object_count(), 0);

    let volume = PolarVolume::open(&storage, "deemd.h5", IoMode::ReadOnly).unwrap();
    assert_eq!(volume.site().unwrap().height, site::EMDEN.2);
    assert_eq!(volume.date_time().unwrap().to_rfc3339(), "2024-03-15T12:00:00+00:00");

    let sweep = volume.scan(1).unwrap();
    assert_eq!(sweep.data_count(), 2);
    let dbzh = sweep.find_data("DBZH").unwrap().unwrap();
    assert_eq!(dbzh.sample_type().unwrap(), SampleType::U16);
    let values: Vec<f64> = dbzh.read_unpacked(f64::NAN, f64::NEG_INFINITY).unwrap();
    assert_samples_approx_eq!(values, reflectivity, packing::DBZH_U16.0);

    let vradh = sweep.find_data("VRADH").unwrap().unwrap();
    let values: Vec<f64> = vradh.read_unpacked(f64::NAN, f64::NEG_INFINITY).unwrap();
    assert_samples_approx_eq!(values, velocity, packing::VRADH_U8.0);
    // Ray 45 of 360 looks straight down the wind.
    assert_approx_eq!(values[45 * geometry.nbins], 20.0, packing::VRADH_U8.0);
}

#[test]
fn test_packing_twice_is_stable() {
    let (_, storage) = memory();
    let (_volume, mut layer) = tiny_layer(&storage, "stable.h5");
    let values: Vec<f64> = (0..16).map(|i| -20.0 + i as f64 * 3.3).collect();

    layer.write_packed(&values, |_| false, |_| false).unwrap();
    let first: Vec<f64> = layer.read_unpacked(f64::NAN, f64::NAN).unwrap();
    let raw_first: Vec<u8> = layer.read().unwrap();

    layer.write_packed(&first, |_| false, |_| false).unwrap();
    let raw_second: Vec<u8> = layer.read().unwrap();
    assert_eq!(raw_first, raw_second);
}

#[test]
fn test_out_of_range_physical_value_is_bad_value() {
    let (_, storage) = memory();
    let (_volume, mut layer) = tiny_layer(&storage, "range.h5");
    let mut values = vec![0.0f64; 16];
    values[3] = 500.0;
    let err = layer.write_packed(&values, |_| false, |_| false).unwrap_err();
    assert!(matches!(err, OdimError::BadValue { .. }));
}

#[test]
fn test_layer_quality_children() {
    let (_, storage) = memory();
    {
        let (_volume, mut layer) = tiny_layer(&storage, "quality.h5");
        let spec = odim_h5::DataSpec::new(SampleType::U8, scan::TINY.dims());
        let mut quality = layer.append_quality(&spec).unwrap();
        quality.group_mut().set("task", "fi.fmi.ropo.detector").unwrap();
        layer.append_quality(&spec).unwrap();
    }

    let volume = PolarVolume::open(&storage, "quality.h5", IoMode::ReadOnly).unwrap();
    let layer = volume.scan(1).unwrap().data(1).unwrap();
    assert_eq!(layer.quality_count(), 2);
    let quality = layer.quality(1).unwrap();
    assert_eq!(quality.group().get::<String>("task").unwrap(), "fi.fmi.ropo.detector");
    assert!(layer.quality(3).unwrap_err().is_not_found());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_controls_version_and_compression() {
    let (memory, storage) = memory();
    let config = OdimConfig {
        odim_version: odim_h5::OdimVersion::V2_3,
        compression_level: None,
        ..Default::default()
    };
    let mut volume = PolarVolume::create_with_config(&storage, "cfg.h5", config).unwrap();
    assert_eq!(volume.file().conventions().unwrap().as_deref(), Some("ODIM_H5/V2_3"));
    assert_eq!(volume.file().version().unwrap(), odim_h5::OdimVersion::V2_3);

    let mut sweep = volume.append_scan().unwrap();
    sweep.set_ray_count(2).unwrap();
    sweep.set_bin_count(3).unwrap();
    let layer = sweep.append_data("TH", SampleType::U16).unwrap();
    let (_, compression) = memory.dataset_storage(layer.array().id()).unwrap();
    assert_eq!(compression, None);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_, storage) = memory();
    let config = OdimConfig {
        compression_level: Some(12),
        ..Default::default()
    };
    let err = PolarVolume::create_with_config(&storage, "bad.h5", config).unwrap_err();
    assert!(matches!(err, OdimError::Config(_)));
}

#[test]
fn test_config_json_round_trip() {
    let config = OdimConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: OdimConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.odim_version, config.odim_version);
    assert_eq!(parsed.compression_level, Some(6));
}

// ============================================================================
// Vertical profiles
// ============================================================================

#[test]
fn test_vertical_profile_is_not_a_volume() {
    let (_, storage) = memory();
    {
        let mut vp = VerticalProfile::create(&storage, "vp.h5").unwrap();
        vp.set_levels(10).unwrap();
        let levels = vp.levels().unwrap();
        let mut profile = vp.append_profile().unwrap();
        let mut speed = profile.append_data("ff", levels).unwrap();
        speed
            .write(&test_utils::create_wind_profile(levels, 2.0, 0.5))
            .unwrap();
    }

    assert!(PolarVolume::open(&storage, "vp.h5", IoMode::ReadOnly).is_err());
    let vp = VerticalProfile::open(&storage, "vp.h5", IoMode::ReadOnly).unwrap();
    let speed = vp.profile(1).unwrap().find_data("ff").unwrap().unwrap();
    let values: Vec<f64> = speed.read().unwrap();
    assert_eq!(values[9], 6.5);
}
