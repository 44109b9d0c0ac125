use super::*;

#[test]
fn probe_results_map_to_tri_state() {
    assert_eq!(ClipDuration::from_probe(4.5), ClipDuration::Known(4.5));
    assert_eq!(ClipDuration::from_probe(0.0), ClipDuration::Unknown);
    assert_eq!(ClipDuration::from_probe(f64::NAN), ClipDuration::Unknown);
    assert_eq!(ClipDuration::from_probe(-1.0), ClipDuration::Unknown);
    assert_eq!(ClipDuration::Unknown.as_secs_or_zero(), 0.0);
}

#[test]
fn unknown_duration_never_fits() {
    assert!(ClipDuration::Known(5.0).fits_within(5.0));
    assert!(!ClipDuration::Known(5.01).fits_within(5.0));
    assert!(!ClipDuration::Unknown.fits_within(1e9));
    assert!(!ClipDuration::Known(0.0).fits_within(5.0));
}

#[test]
fn time_range_rejects_inverted_and_negative_bounds() {
    assert!(TimeRange::new(0.0, 0.0).is_err());
    assert!(TimeRange::new(3.0, 2.0).is_err());
    assert!(TimeRange::new(-0.1, 2.0).is_err());
    assert!(TimeRange::new(0.0, f64::INFINITY).is_err());
    let r = TimeRange::new(2.0, 9.0).unwrap();
    assert_eq!(r.len_sec(), 7.0);
}

#[test]
fn clip_duration_json_is_tagged() {
    let s = serde_json::to_string(&ClipDuration::Known(2.5)).unwrap();
    assert_eq!(s, r#"{"kind":"known","sec":2.5}"#);
    let de: ClipDuration = serde_json::from_str(r#"{"kind":"unknown"}"#).unwrap();
    assert_eq!(de, ClipDuration::Unknown);
}
