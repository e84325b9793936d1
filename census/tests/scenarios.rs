use census::{
    derive_metric, derive_metrics, extract_full_name, extract_short_name, normalize_label,
    reconcile, AdminArea, AgeRange, DerivedMetric, PopulationRow,
};

#[derive(Clone, Debug, PartialEq)]
struct Boundary {
    code: String,
    name: String,
}

impl Boundary {
    fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

impl AdminArea for Boundary {
    fn admin_name(&self) -> &str {
        &self.name
    }
}

fn youth_row(label: &str, youth: [u64; 10], total: u64) -> PopulationRow {
    youth
        .iter()
        .zip(10..)
        .fold(PopulationRow::new(label, total), |row, (count, age)| {
            row.with_band(age, *count)
        })
}

#[test]
fn label_normalizes_to_subdivision() {
    let full = extract_full_name("종로구 청운효자동(1111051500)").unwrap();
    assert_eq!(full, "청운효자동");
    assert_eq!(extract_short_name(&full).unwrap(), "청운효자동");
}

#[test]
fn full_name_never_contains_code_suffix() {
    let labels = [
        "종로구 청운효자동(1111051500)",
        "서울특별시 종로구 청운효자동(1111051500)",
        "노원구 중계1동 (1135062100)",
        "부산광역시 기장군 정관읍(2631025300)",
        "세종특별자치시 조치원읍",
    ];
    for label in labels {
        let full = extract_full_name(label).unwrap();
        assert!(!full.contains('('), "{label} -> {full}");
        assert!(!full.contains(')'), "{label} -> {full}");
        assert!(!full.is_empty());
    }
}

#[test]
fn youth_share_of_four_hundred() {
    let row = youth_row(
        "종로구 청운효자동(1111051500)",
        [5, 3, 4, 4, 4, 4, 4, 5, 5, 2],
        400,
    );
    let name = normalize_label(&row.raw_label).unwrap();
    let metric = derive_metric(&row, &name, AgeRange::YOUTH);
    assert_eq!(metric.subgroup_population, 40);
    assert_eq!(metric.subgroup_percentage, Some(10.0));
}

#[test]
fn empty_district_never_yields_nan() {
    let row = youth_row("종로구 무인동", [0; 10], 0);
    let name = normalize_label(&row.raw_label).unwrap();
    let metric = derive_metric(&row, &name, AgeRange::YOUTH);
    assert_eq!(metric.subgroup_percentage, None);
}

#[test]
fn ranges_without_columns_sum_to_zero() {
    let row = youth_row("종로구 사직동", [1; 10], 10);
    for (lo, hi) in [(0, 9), (20, 20), (65, 100)] {
        let name = normalize_label(&row.raw_label).unwrap();
        let metric = derive_metric(&row, &name, AgeRange::new(lo, hi).unwrap());
        assert_eq!(metric.subgroup_population, 0);
    }
}

#[test]
fn unmatched_boundary_keeps_null_metric() {
    let features = vec![
        Boundary::new("1111051500", "청운효자동"),
        Boundary::new("1135062100", "중계동"),
    ];
    let rows = vec![youth_row(
        "종로구 청운효자동(1111051500)",
        [1; 10],
        100,
    )];
    let joined = reconcile(&features, &derive_metrics(&rows, AgeRange::YOUTH));

    assert_eq!(joined.len(), 2);
    assert_eq!(joined[1].feature.admin_name(), "중계동");
    assert_eq!(joined[1].feature.code, "1135062100");
    assert_eq!(joined[1].subgroup_percentage(), None);
}

#[test]
fn duplicate_short_names_keep_the_later_row() {
    let rows = vec![
        youth_row("강남구 신사동(1168051000)", [1; 10], 100),
        youth_row("은평구 신사동(1138055100)", [2; 10], 100),
    ];
    let joined = reconcile(
        &[Boundary::new("1168051000", "신사동")],
        &derive_metrics(&rows, AgeRange::YOUTH),
    );
    let metric = joined[0].metric.as_ref().unwrap();
    assert_eq!(metric.district.as_deref(), Some("은평구"));
    assert_eq!(metric.subgroup_population, 20);
}

#[test]
fn output_length_matches_features_for_empty_metrics() {
    let features: Vec<Boundary> = (0..5)
        .map(|i| Boundary::new(&i.to_string(), &format!("{i}동")))
        .collect();
    let joined = reconcile(&features, &[]);
    assert_eq!(joined.len(), features.len());
    assert!(joined.iter().all(|j| j.metric.is_none()));
    assert!(reconcile::<Boundary>(&[], &[]).is_empty());
}

#[test]
fn reconcile_is_idempotent() {
    let features = vec![
        Boundary::new("1", "사직동"),
        Boundary::new("2", "삼청동"),
        Boundary::new("3", "중계동"),
    ];
    let metrics: Vec<DerivedMetric> = derive_metrics(
        &[
            youth_row("종로구 사직동", [1; 10], 50),
            youth_row("종로구 삼청동", [0; 10], 0),
        ],
        AgeRange::YOUTH,
    );
    assert_eq!(reconcile(&features, &metrics), reconcile(&features, &metrics));
}
