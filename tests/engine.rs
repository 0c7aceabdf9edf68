use bitcaskd::storage::bitcask::Config;
use bytes::Bytes;
use proptest::prelude::*;

proptest! {
    #[test]
    fn set_then_get_returns_the_written_value(key in "[a-z]{1,16}", value in "[a-z0-9]{1,64}") {
        let dir = tempfile::tempdir().unwrap();
        let db = Config::default().open(dir.path()).unwrap();
        db.set(Bytes::from(key.clone()), Bytes::from(value.clone())).unwrap();
        prop_assert_eq!(db.get(key.as_bytes()).unwrap(), Bytes::from(value));
    }

    #[test]
    fn del_makes_a_key_unreadable_until_set_again(key in "[a-z]{1,16}", value in "[a-z0-9]{1,64}") {
        let dir = tempfile::tempdir().unwrap();
        let db = Config::default().open(dir.path()).unwrap();
        db.set(Bytes::from(key.clone()), Bytes::from(value)).unwrap();
        db.del(key.as_bytes()).unwrap();
        prop_assert!(db.get(key.as_bytes()).unwrap_err().is_not_found());
    }
}

#[test]
fn rolling_segments_still_serve_older_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.max_data_file_size(bytesize::ByteSize::b(64));
    let db = config.open(dir.path()).unwrap();

    for i in 0..50 {
        db.set(
            Bytes::from(format!("key-{i}")),
            Bytes::from(format!("value-{i}-padded-out-a-bit")),
        )
        .unwrap();
    }

    for i in 0..50 {
        let value = db.get(format!("key-{i}").as_bytes()).unwrap();
        assert_eq!(value, Bytes::from(format!("value-{i}-padded-out-a-bit")));
    }
}

#[test]
fn merge_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db = Config::default().open(dir.path()).unwrap();
    db.set(Bytes::from_static(b"k"), Bytes::from_static(b"a")).unwrap();
    db.set(Bytes::from_static(b"k"), Bytes::from_static(b"b")).unwrap();
    db.del(Bytes::from_static(b"k2").as_ref()).ok();

    db.merge().unwrap();
    let after_first = db.get(b"k").unwrap();
    db.merge().unwrap();
    let after_second = db.get(b"k").unwrap();
    assert_eq!(after_first, after_second);
}

#[test]
fn reopening_preserves_exactly_the_live_map() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Config::default().open(dir.path()).unwrap();
        for i in 0..10 {
            db.set(Bytes::from(format!("k{i}")), Bytes::from(format!("v{i}")))
                .unwrap();
        }
        db.del(b"k3").unwrap();
        db.close();
    }

    let db = Config::default().open(dir.path()).unwrap();
    assert_eq!(db.size(), 9);
    assert!(db.get(b"k3").unwrap_err().is_not_found());
    assert_eq!(db.get(b"k7").unwrap(), Bytes::from_static(b"v7"));
}
