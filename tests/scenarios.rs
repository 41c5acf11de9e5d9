use rbcore::{Map, MapError, RBTree, Set};

const SEQUENCE: [i32; 20] = [5, 15, 4, 17, 2, 20, 8, 18, 3, 14, 9, 19, 1, 16, 12, 7, 11, 6, 10, 13];

#[test]
fn five_values_stay_balanced() {
    let mut tree = RBTree::new();
    for v in [5, 15, 4, 17, 2] {
        tree.insert_unique(v);
    }
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [2, 4, 5, 15, 17]);
    assert_eq!(tree.validate(), Ok(2));
}

#[test]
fn twenty_values_in_and_out() {
    let mut set = Set::new();
    for v in SEQUENCE {
        assert!(set.insert(v));
    }
    assert_eq!(set.len(), 20);
    set.validate().unwrap();

    for v in SEQUENCE {
        assert!(set.remove(&v));
        set.validate().unwrap();
    }
    assert_eq!(set.len(), 0);
    assert_eq!(set.first(), None);
    assert_eq!(set.last(), None);
    assert_eq!(set.iter().next(), None);
}

#[test]
fn names_by_number() {
    let mut names = Map::new();
    *names.get_or_insert_default(2) = "alice".to_string();
    *names.get_or_insert_default(1) = "nina birch".to_string();
    assert_eq!(format!("{names:?}"), r#"{1: "nina birch", 2: "alice"}"#);

    *names.get_or_insert_default(2) = "horsedog".to_string();

    let names = &names;
    assert_eq!(names.at(&2).map(String::as_str), Ok("horsedog"));
    let missing = names.at(&55).unwrap_err();
    assert_eq!(missing, MapError::KeyNotFound { key: "55".to_string() });
    assert_eq!(missing.to_string(), "KeyError: 55");
}
