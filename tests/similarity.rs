use roster_enrich::similarity::{
    name_order_score, normalize_name, partial_ratio, ratio, score_breakdown, similarity,
};

#[test]
fn identical_names_score_full_marks() {
    assert_eq!(similarity("Ana Cruz", "  ana cruz "), 100.0);
}

#[test]
fn ratio_counts_single_edit() {
    assert_eq!(ratio("john smith", "jonn smith"), 90.0);
    assert_eq!(ratio("", ""), 100.0);
}

#[test]
fn ratio_divides_edits_by_the_longer_length() {
    assert_eq!(ratio("ana cruz", "ana m cruz"), 80.0);
}

#[test]
fn partial_ratio_finds_embedded_name() {
    assert_eq!(partial_ratio("cruz", "ana cruz"), 100.0);
    assert_eq!(partial_ratio("", "ana"), 0.0);
}

#[test]
fn last_comma_first_matches_first_last() {
    let scores = score_breakdown("Ranjo, Jared", "Jared Ranjo");
    assert_eq!(scores.name_order, 100.0);
    assert_eq!(scores.best(), 100.0);
}

#[test]
fn middle_names_are_handled_by_split_points() {
    let score = name_order_score("maria clara santos", "santos, maria clara");
    assert_eq!(score, 100.0);
}

#[test]
fn part_matching_needs_two_substantial_parts() {
    assert!(similarity("ana cruz", "ben cruz") < 80.0);
    let score = name_order_score("jose rizal mercado", "rizal mercado");
    assert!(score >= 66.0, "score was {score}");
}

#[test]
fn unrelated_names_stay_below_default_threshold() {
    assert!(similarity("Ana Cruz", "Ben Uy") < 80.0);
}

#[test]
fn normalization_only_trims_and_lowercases() {
    assert_eq!(normalize_name("  Ranjo,  Jared "), "ranjo,  jared");
}
