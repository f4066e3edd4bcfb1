use thrust_stand_lib::telemetry::{classify_line, Field, LineKind};

#[test]
fn test_header_lines() {
    assert_eq!(classify_line("Time,Thrust,RPM,Temp,Voltage,Current,Power"), LineKind::Header);
    assert_eq!(classify_line("timestamp,load"), LineKind::Header);
    assert_eq!(classify_line("  TIME (ms),a,b"), LineKind::Header);
}

#[test]
fn test_seven_field_csv_defaults_throttle() {
    let LineKind::Sample(s) = classify_line("1.5,120.25,5000,31.2,11.8,3.1,36.58") else {
        panic!("expected sample");
    };
    assert_eq!(s.elapsed_time, 1.5);
    assert_eq!(s.thrust, 120.25);
    assert_eq!(s.rpm, 5000.0);
    assert_eq!(s.power, Some(36.58));
    assert_eq!(s.throttle, 0.0);
}

#[test]
fn test_eight_field_csv_carries_throttle() {
    match classify_line("2,1,2,3,4,5,6,55") {
        LineKind::Sample(s) => assert_eq!(s.throttle, 55.0),
        other => panic!("expected sample, got {:?}", other),
    }
}

#[test]
fn test_csv_with_junk_field_is_not_a_sample() {
    assert_eq!(classify_line("1,2,3,abc,5,6,7"), LineKind::Unrecognized);
    assert_eq!(classify_line("1,2,3,4,5,6"), LineKind::Unrecognized);
}

#[test]
fn test_free_text_keywords() {
    assert_eq!(classify_line("Load: 123.4g"), LineKind::Field(Field::Thrust, 123.4));
    assert_eq!(classify_line("Thrust: -2.5"), LineKind::Field(Field::Thrust, -2.5));
    assert_eq!(classify_line("RPM: 5000"), LineKind::Field(Field::Rpm, 5000.0));
    assert_eq!(classify_line("Temp: 27.1C"), LineKind::Field(Field::Temperature, 27.1));
    assert_eq!(classify_line("Voltage: 12.6V"), LineKind::Field(Field::Voltage, 12.6));
    assert_eq!(classify_line("Current: 4.2 A"), LineKind::Field(Field::Current, 4.2));
}

#[test]
fn test_free_text_without_value_or_keyword() {
    assert_eq!(classify_line("RPM: ---"), LineKind::Unrecognized);
    assert_eq!(classify_line("Calibrating..."), LineKind::Unrecognized);
    assert_eq!(classify_line(""), LineKind::Unrecognized);
}
