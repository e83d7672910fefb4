/// Demo-data generator tests through the public API.
use metrix::synthetic::{self, DEMO_POINTS};

#[test]
fn demo_payload_has_fixed_shape() {
    let payload = synthetic::demo_payload();

    assert_eq!(payload.metrics.len(), DEMO_POINTS + 1);
    assert_eq!(payload.endpoints.len(), 2);
    assert_eq!(payload.endpoints[0].path, "/api/demo/users");
    assert_eq!(payload.endpoints[1].path, "/api/demo/products");
    assert!(payload.endpoints.iter().all(|e| e.status_code == 200));

    assert_eq!(payload.geo.len(), 1);
    let geo = &payload.geo[0];
    assert_eq!(geo.city, "Demo City");
    assert_eq!(geo.country, "Turkey");
    assert!(geo.has_valid_coordinates());
}

#[test]
fn series_values_stay_in_range() {
    for _ in 0..20 {
        for m in synthetic::generate_time_series(DEMO_POINTS) {
            assert!((500..3500).contains(&m.visitors), "visitors {}", m.visitors);
            assert!(m.page_views >= m.visitors, "page views below visitors");
            assert!(m.page_views <= m.visitors * 3);
            assert!(m.errors < 15, "errors {}", m.errors);
            assert!((100..600).contains(&m.latency_ms), "latency {}", m.latency_ms);
        }
    }
}

#[test]
fn labels_are_clock_times() {
    for m in synthetic::generate_time_series(5) {
        let (h, min) = m.timestamp.split_once(':').expect("HH:MM label");
        assert_eq!(h.len(), 2);
        assert_eq!(min.len(), 2);
        assert!(h.parse::<u8>().unwrap() < 24);
        assert!(min.parse::<u8>().unwrap() < 60);
    }
}

#[test]
fn zero_points_yields_a_single_sample() {
    assert_eq!(synthetic::generate_time_series(0).len(), 1);
}

#[test]
fn consecutive_payloads_differ_in_values_only() {
    let a = synthetic::demo_payload();
    let b = synthetic::demo_payload();
    assert_ne!(a.metrics, b.metrics);
    assert_eq!(a.endpoints, b.endpoints);
    assert_eq!(a.geo, b.geo);
}
