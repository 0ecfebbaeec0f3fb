//! Candidate grid shapes for a box count.

use crate::geometry::ratio_score;

/// Grid shape as `(rows, columns)`.
pub type Shape = (usize, usize);

/// Generates every exact factorisation of `count` into `(rows, columns)`.
///
/// Only shapes with `rows >= columns` are kept. The result is ordered by
/// closeness to `target_ratio`, then by cell count. For every positive count
/// `(count, 1)` survives, so the list is only empty for `count == 0`.
///
/// # Examples
/// ```
/// use layer_it_now::candidates::generate_candidates;
///
/// assert_eq!(generate_candidates(1, 1.2), vec![(1, 1)]);
/// assert_eq!(generate_candidates(12, 1.2)[0], (4, 3));
/// ```
pub fn generate_candidates(count: usize, target_ratio: f64) -> Vec<Shape> {
    let mut shapes: Vec<Shape> = (1..=count)
        .filter(|rows| count % rows == 0)
        .map(|rows| (rows, count / rows))
        .filter(|&(rows, columns)| rows >= columns)
        .collect();

    shapes.sort_by(|a, b| {
        ratio_score(a.0, a.1, target_ratio)
            .total_cmp(&ratio_score(b.0, b.1, target_ratio))
            .then_with(|| (a.0 * a.1).cmp(&(b.0 * b.1)))
    });
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: f64 = 6.0 / 5.0;

    #[test]
    fn shapes_are_exact_factorisations() {
        for count in 1..=60 {
            let shapes = generate_candidates(count, TARGET);
            assert!(!shapes.is_empty(), "count {} produced no shapes", count);
            for (rows, columns) in &shapes {
                assert_eq!(rows * columns, count);
                assert!(rows >= columns);
            }
            assert!(shapes.contains(&(count, 1)));
        }
    }

    #[test]
    fn shapes_are_sorted_by_ratio_score() {
        let shapes = generate_candidates(36, TARGET);
        let scores: Vec<f64> = shapes
            .iter()
            .map(|&(r, c)| ratio_score(r, c, TARGET))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(shapes[0], (6, 6));
    }

    #[test]
    fn twelve_prefers_four_by_three() {
        assert_eq!(generate_candidates(12, TARGET), vec![(4, 3), (6, 2), (12, 1)]);
    }

    #[test]
    fn boundary_counts() {
        assert_eq!(generate_candidates(1, TARGET), vec![(1, 1)]);
        assert_eq!(generate_candidates(7, TARGET), vec![(7, 1)]);
        assert!(generate_candidates(0, TARGET).is_empty());
    }
}
