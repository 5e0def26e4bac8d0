use daysel_core::datastore::DataStore;
use daysel_core::gesture::{GestureOutcome, GestureState};
use daysel_core::{Capacity, Day, Interval, IntervalSet, IntervalTag, ModeType, OverflowPolicy};
use daysel_core::{SelectionGesture, config::Config};
use tempfile::tempdir;

fn day(month_index: u32, d: u32) -> Day {
    Day::new(2026, month_index, d).expect("valid day")
}

#[test]
fn datastore_roundtrip_and_undo() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let tag = IntervalTag::new(ModeType::OnlyAfternoon);

    let mut set = store.load_intervals().expect("load empty");
    assert!(set.is_empty());

    let before = set.clone();
    set.add(Interval::new(day(0, 5), day(0, 9), tag), &Capacity::UNBOUNDED)
        .expect("add");
    assert!(store.commit(&before, &set).expect("commit"));
    assert!(!store.commit(&set, &set).expect("no-op commit"));

    let loaded = store.load_intervals().expect("reload");
    assert_eq!(loaded, set);
    assert_eq!(loaded.get(0).map(|i| *i.tag()), Some(tag));

    let snapshot = store
        .pop_undo_snapshot()
        .expect("pop")
        .expect("one snapshot");
    assert!(snapshot.is_empty());
    assert!(store.pop_undo_snapshot().expect("pop again").is_none());
}

#[test]
fn gesture_survives_between_invocations() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    let mut gesture = store.load_gesture().expect("load idle");
    assert!(gesture.is_idle());
    assert!(gesture.press(day(2, 10)));
    store.save_gesture(&gesture).expect("save pressed");

    let mut gesture = store.load_gesture().expect("load pressed");
    gesture.enter(day(2, 14));
    store.save_gesture(&gesture).expect("save dragging");

    let mut gesture = store.load_gesture().expect("load dragging");
    assert_eq!(
        gesture.state(),
        GestureState::Dragging {
            anchor: day(2, 10),
            current: day(2, 14),
        }
    );

    let mut set = store.load_intervals().expect("load");
    let outcome = gesture
        .release(day(2, 14), &mut set, IntervalTag::default(), &Capacity::UNBOUNDED)
        .expect("release");
    store.save_gesture(&gesture).expect("save idle");
    store.save_intervals(&set).expect("save intervals");

    assert!(matches!(outcome, GestureOutcome::Added(_)));
    assert!(store.load_gesture().expect("reload").is_idle());
    assert_eq!(
        std::fs::read_to_string(&store.gesture_path).expect("read gesture file"),
        ""
    );
    assert_eq!(
        store.load_intervals().expect("reload").as_slice(),
        &[Interval::new(day(2, 10), day(2, 14), IntervalTag::default())]
    );
}

#[test]
fn toggling_with_a_capacity_from_config() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
        ("rc.max.active".to_string(), "2".to_string()),
        ("overflow".to_string(), "evict-oldest".to_string()),
    ]);
    let capacity = cfg.capacity().expect("capacity");
    assert_eq!(capacity.limit(), Some(2));
    assert_eq!(capacity.on_overflow, OverflowPolicy::EvictOldest);
    let tag = cfg.default_tag().expect("tag");

    let mut set = IntervalSet::new();
    for d in [1, 10, 20] {
        let mut click = SelectionGesture::new();
        click.press(day(0, d));
        click
            .release(day(0, d), &mut set, tag, &capacity)
            .expect("click adds");
    }
    assert_eq!(
        set.as_slice(),
        &[Interval::single(day(0, 10), tag), Interval::single(day(0, 20), tag)]
    );

    let mut click = SelectionGesture::new();
    click.press(day(0, 10));
    let outcome = click
        .release(day(0, 10), &mut set, tag, &capacity)
        .expect("click removes");
    assert!(matches!(outcome, GestureOutcome::Removed { index: 0, .. }));
    assert_eq!(set.find_containing(day(0, 20)), Some(0));
}
