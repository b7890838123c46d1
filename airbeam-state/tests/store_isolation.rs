//! Devices sharing one store keep independent debounce state.

use std::thread;
use std::time::{Duration, Instant};

use airbeam_state::{Debouncer, DeviceState, StateStore, Transition};

fn step(store: &StateStore, debouncer: &Debouncer, device: &str, raw: &str, now: Instant) -> Option<Transition> {
    let mut state = store.get(device).unwrap_or_default();
    let (next, transition) = debouncer.evaluate(&state.property("motionDetected"), Some(raw), now);
    state.set_property("motionDetected", next);
    store.replace(device, state);
    transition
}

#[test]
fn test_devices_do_not_share_windows() {
    let store = StateStore::new();
    let debouncer = Debouncer::default();
    let t0 = Instant::now();

    assert_eq!(step(&store, &debouncer, "porch", "yes", t0), Some(Transition::Start));
    assert_eq!(step(&store, &debouncer, "garage", "no", t0), None);

    // Garage starts later; its window is its own.
    let t1 = t0 + Duration::from_millis(4000);
    assert_eq!(step(&store, &debouncer, "garage", "yes", t1), Some(Transition::Start));

    let t2 = t0 + Duration::from_millis(6000);
    assert_eq!(step(&store, &debouncer, "porch", "no", t2), Some(Transition::Stop));
    assert_eq!(step(&store, &debouncer, "garage", "no", t2), None);

    assert!(!store.get("porch").unwrap().is_active("motionDetected"));
    assert!(store.get("garage").unwrap().is_active("motionDetected"));
}

#[test]
fn test_concurrent_writers_on_distinct_devices() {
    let store = StateStore::new();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let name = format!("camera-{}", i);
                for n in 0..100 {
                    let mut state = DeviceState::default();
                    state.recording = n % 2 == 0;
                    store.replace(&name, state);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.device_count(), 8);
    // Last write (n = 99) was not recording.
    assert!((0..8).all(|i| !store.is_recording(&format!("camera-{}", i))));
}
