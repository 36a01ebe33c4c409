use doctor_cell::services::review::rating_summary;

#[test]
fn rating_recomputes_average_and_count() {
    let (average, total) = rating_summary(&[4, 5, 3]);
    assert_eq!(average, 4.00);
    assert_eq!(total, 3);
}

#[test]
fn rating_rounds_to_two_decimals() {
    let (average, total) = rating_summary(&[4, 4, 5]);
    assert_eq!(average, 4.33);
    assert_eq!(total, 3);
}

#[test]
fn no_approved_reviews_resets_to_zero() {
    let (average, total) = rating_summary(&[]);
    assert_eq!(average, 0.0);
    assert_eq!(total, 0);
}
