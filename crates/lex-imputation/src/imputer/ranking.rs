//! Attribute ordering by missingness.

/// Order attribute indices by missing count, most missing first.
///
/// Ties keep ascending index order. `target` is left out of the ranking;
/// attributes with no missing cells are kept.
pub fn rank_by_missingness(missing_counts: &[usize], target: Option<usize>) -> Vec<usize> {
    let mut ranking: Vec<usize> = (0..missing_counts.len())
        .filter(|&index| Some(index) != target)
        .collect();
    // sort_by_key is stable, so equal counts stay in index order
    ranking.sort_by_key(|&index| std::cmp::Reverse(missing_counts[index]));
    ranking
}
