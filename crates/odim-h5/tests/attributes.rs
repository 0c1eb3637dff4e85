//! Attribute typing, routing and lifetime over the in-memory engine.

use std::rc::Rc;

use odim_h5::{
    AttributeType, AttributeValue, File, IoMode, MemoryStorage, ObjectType, OdimError, Slot,
    Storage,
};
use test_utils::fixtures::timestamps;

fn storage() -> Rc<dyn Storage> {
    Rc::new(MemoryStorage::new())
}

fn reopen(storage: &Rc<dyn Storage>, path: &str) -> File {
    File::open(storage, path, IoMode::ReadOnly).unwrap()
}

#[test]
fn test_names_are_routed_to_subgroups() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "route.h5", ObjectType::Scan).unwrap();
        let root = file.group_mut();
        root.set("source", "NOD:fivan").unwrap();
        root.set("lat", 60.27).unwrap();
        root.set("beamwidth", 1.0).unwrap();
    }

    let file = reopen(&storage, "route.h5");
    let attributes = file.group().attributes();
    assert_eq!(attributes.find("source").unwrap().slot(), Slot::What);
    assert_eq!(attributes.find("lat").unwrap().slot(), Slot::Where);
    assert_eq!(attributes.find("beamwidth").unwrap().slot(), Slot::How);
    assert!(attributes.find_in(Slot::What, "lat").is_none());
    assert!(attributes.group(Slot::How).is_some());
}

#[test]
fn test_explicit_slot_overrides_routing() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "slot.h5", ObjectType::Scan).unwrap();
        file.group_mut()
            .attribute_in(Slot::How, "lat")
            .set(1.5)
            .unwrap();
    }

    let file = reopen(&storage, "slot.h5");
    let attributes = file.group().attributes();
    assert_eq!(attributes.find("lat").unwrap().slot(), Slot::How);
    assert_eq!(attributes.find_in(Slot::How, "lat").unwrap().get_real().unwrap(), 1.5);
}

#[test]
fn test_string_read_as_integer_is_type_mismatch() {
    let storage = storage();
    let mut file = File::create(&storage, "mismatch.h5", ObjectType::Scan).unwrap();
    file.group_mut().set("source", "WMO:02974").unwrap();

    let err = file.group().get::<i64>("source").unwrap_err();
    match err {
        OdimError::TypeMismatch {
            requested, stored, ..
        } => {
            assert_eq!(requested, AttributeType::Integer);
            assert_eq!(stored, AttributeType::String);
        }
        other => panic!("expected a type mismatch, got {:?}", other),
    }
}

#[test]
fn test_boolean_text_is_reclassified_after_reopen() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "bool.h5", ObjectType::Scan).unwrap();
        file.group_mut().set("simulated", true).unwrap();
        file.group_mut().set("comment", "True").unwrap();
        file.group_mut().set("malfunc", "Truly").unwrap();
    }

    let file = reopen(&storage, "bool.h5");
    let root = file.group();
    assert!(root.get::<bool>("simulated").unwrap());
    assert!(root.get::<bool>("comment").unwrap());
    assert_eq!(
        root.attribute("comment").unwrap().attribute_type().unwrap(),
        AttributeType::Boolean
    );
    assert_eq!(root.get::<String>("malfunc").unwrap(), "Truly");
}

#[test]
fn test_single_element_array_reads_back_as_scalar() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "scalar.h5", ObjectType::Scan).unwrap();
        file.group_mut().set("angles", vec![0.5f64]).unwrap();
        file.group_mut().set("startazA", vec![0.0f64, 1.0, 2.0]).unwrap();
    }

    let file = reopen(&storage, "scalar.h5");
    let root = file.group();
    assert_eq!(root.get::<f64>("angles").unwrap(), 0.5);
    assert_eq!(root.get::<Vec<f64>>("angles").unwrap(), vec![0.5]);
    assert_eq!(root.get::<Vec<f64>>("startazA").unwrap(), vec![0.0, 1.0, 2.0]);
    assert!(root.get::<f64>("startazA").is_err());
}

#[test]
fn test_rewrite_with_new_type() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "retype.h5", ObjectType::Scan).unwrap();
        let root = file.group_mut();
        root.set("nodes", "'fivan','fikor','fianj'").unwrap();
        root.set("nodes", "'fivan'").unwrap();
        root.set("elangle", 0.5).unwrap();
        root.set("elangle", 2i64).unwrap();
    }

    let file = reopen(&storage, "retype.h5");
    let root = file.group();
    assert_eq!(root.get::<String>("nodes").unwrap(), "'fivan'");
    assert_eq!(root.get::<i64>("elangle").unwrap(), 2);
    assert_eq!(
        root.attribute("elangle").unwrap().value().unwrap(),
        AttributeValue::Integer(2)
    );
}

#[test]
fn test_retype_on_read_only_file_keeps_value() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "ro_retype.h5", ObjectType::Scan).unwrap();
        file.group_mut().set("elangle", 0.5).unwrap();
    }

    let mut file = reopen(&storage, "ro_retype.h5");
    let err = file.group_mut().set("elangle", "high").unwrap_err();
    assert!(matches!(err, OdimError::RemoveFailed { .. }));
    assert_eq!(file.group().get::<f64>("elangle").unwrap(), 0.5);
}

#[test]
fn test_string_with_nul_is_bad_value() {
    let storage = storage();
    let mut file = File::create(&storage, "nul.h5", ObjectType::Scan).unwrap();
    let err = file.group_mut().set("source", "NOD:fi\0van").unwrap_err();
    assert!(matches!(err, OdimError::BadValue { .. }));
    assert_eq!(file.group().get_opt::<String>("source").unwrap(), None);
}

#[test]
fn test_missing_attribute() {
    let storage = storage();
    let file = File::create(&storage, "missing_attr.h5", ObjectType::Scan).unwrap();
    let root = file.group();
    assert!(root.get::<f64>("lat").unwrap_err().is_not_found());
    assert_eq!(root.get_opt::<f64>("lat").unwrap(), None);
    assert_eq!(root.get_or("gain", 1.0).unwrap(), 1.0);
    assert!(root.find_attribute("lat").is_none());
}

#[test]
fn test_erase_attribute() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "erase.h5", ObjectType::Scan).unwrap();
        file.group_mut().set("comment", "temporary").unwrap();
        assert!(file.group_mut().erase_attribute("comment").unwrap());
        assert!(!file.group_mut().erase_attribute("comment").unwrap());
    }

    let file = reopen(&storage, "erase.h5");
    assert!(file.group().find_attribute("comment").is_none());
}

#[test]
fn test_erase_attribute_from_one_slot() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "erase_in.h5", ObjectType::Scan).unwrap();
        let root = file.group_mut();
        root.attribute_in(Slot::Where, "height").set(50.0).unwrap();
        root.attribute_in(Slot::How, "height").set(52.5).unwrap();
        assert!(root.erase_attribute_in(Slot::Where, "height").unwrap());
        assert!(!root.erase_attribute_in(Slot::What, "height").unwrap());
    }

    let file = reopen(&storage, "erase_in.h5");
    let attributes = file.group().attributes();
    assert!(attributes.find_in(Slot::Where, "height").is_none());
    assert_eq!(attributes.find("height").unwrap().get_real().unwrap(), 52.5);
}

#[test]
fn test_cloned_group_outlives_original() {
    let memory = Rc::new(MemoryStorage::new());
    let storage: Rc<dyn Storage> = memory.clone();
    let copy = {
        let mut file = File::create(&storage, "clone.h5", ObjectType::Scan).unwrap();
        file.group_mut().set("source", "NOD:fivan").unwrap();
        let copy = file.group().clone();
        drop(file);
        copy
    };

    assert!(copy.handle().is_valid());
    assert_eq!(copy.get::<String>("source").unwrap(), "NOD:fivan");

    let mut copy = copy;
    copy.set("lon", 24.87).unwrap();
    assert_eq!(copy.get::<f64>("lon").unwrap(), 24.87);
    drop(copy);
    assert_eq!(memory.open_object_count(), 0);
}

#[test]
fn test_date_time_pair() {
    let storage = storage();
    let mut file = File::create(&storage, "when.h5", ObjectType::Scan).unwrap();
    let timestamp = chrono::DateTime::parse_from_rfc3339("2024-03-15T12:05:30Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    file.set_date_time(&timestamp).unwrap();

    assert_eq!(file.group().get::<String>("date").unwrap(), "20240315");
    assert_eq!(file.group().get::<String>("time").unwrap(), "120530");
    assert_eq!(file.date_time().unwrap(), timestamp);
}

#[test]
fn test_date_time_strings_from_another_writer() {
    let storage = storage();
    {
        let mut file = File::create(&storage, "late.h5", ObjectType::Scan).unwrap();
        let (date, time) = timestamps::MIDNIGHT;
        file.group_mut().set("date", date).unwrap();
        file.group_mut().set("time", time).unwrap();
    }

    let file = reopen(&storage, "late.h5");
    assert_eq!(file.date_time().unwrap().to_rfc3339(), "2023-12-31T23:59:59+00:00");
}
