use insight_engine::stats::{median, percentile, whole_percentages};
use insight_engine::{correlation, extract_features, ContentRecord, Correlation};

#[test]
fn doubled_series_correlates_perfectly() {
    let xs = [1.0, 2.0, 4.0, 7.0, 11.0];
    let ys: Vec<f64> = xs.iter().map(|x| x * 2.0).collect();
    assert!((correlation(&xs, &ys) - 1.0).abs() < 1e-9);

    let inverted: Vec<f64> = xs.iter().map(|x| -3.0 * x).collect();
    assert!((correlation(&xs, &inverted) + 1.0).abs() < 1e-9);
}

#[test]
fn degenerate_inputs_yield_zero() {
    let empty: [f64; 0] = [];
    assert_eq!(correlation(&empty, &empty), 0.0);
    assert_eq!(correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0]), 0.0);
    assert_eq!(correlation(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]), 0.0);
    assert_eq!(correlation(&[1.0], &[2.0]), 0.0);
}

#[test]
fn booleans_count_as_zero_and_one() {
    let flags = [true, false, true, false, true];
    let scores: [i64; 5] = [10, 0, 10, 0, 10];
    assert!((correlation(&flags, &scores) - 1.0).abs() < 1e-9);

    let result = Correlation::between(&flags, &scores);
    assert_eq!(result.sample_size, 5);
    assert!(result.strength() <= 1.0);
}

#[test]
fn mismatched_lengths_report_empty_sample() {
    let result = Correlation::between(&[1.0, 2.0], &[1.0, 2.0, 3.0]);
    assert_eq!(result.coefficient, 0.0);
    assert_eq!(result.sample_size, 0);
}

#[test]
fn whole_percentages_always_sum_to_hundred() {
    assert_eq!(whole_percentages(&[1, 1, 1]), vec![34, 33, 33]);
    for counts in [[3usize, 5, 2], [7, 0, 0], [1, 2, 4], [13, 29, 58]] {
        let shares = whole_percentages(&counts);
        assert_eq!(shares.iter().sum::<u32>(), 100, "counts {:?}", counts);
    }
    assert_eq!(whole_percentages(&[0, 0, 0]), vec![0, 0, 0]);
}

#[test]
fn percentile_interpolates() {
    let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
    assert!((percentile(&sorted, 0.25) - 20.0).abs() < 1e-9);
    assert!((percentile(&sorted, 0.6) - 34.0).abs() < 1e-9);
    assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-9);
}

#[test]
fn features_detect_markers() {
    let record = ContentRecord {
        id: "f1".into(),
        title: "Is this the best glue? 🎉".into(),
        body: "Notes at www.example.com\n- clamp it\n- wait a day".into(),
        sentiment_score: 0.4,
        created_at: 1_704_121_200,
        ..ContentRecord::default()
    };
    let features = extract_features(&record);
    assert!(features.has_question);
    assert!(features.has_links);
    assert!(features.has_emojis);
    assert!(features.has_list);
    assert_eq!(features.hour_of_day, 15);
    assert_eq!(features.day_of_week, 0);
    assert_eq!(features.title_length, record.title.chars().count());

    let blank = extract_features(&ContentRecord::default());
    assert_eq!(blank.title_length, 0);
    assert!(!blank.has_question && !blank.has_links && !blank.has_emojis && !blank.has_list);
}
