// ============================================================
// Layer 3 — Pointer Permutations
// ============================================================
// The model never outputs numbers, it outputs positions.
// Positions live in "annotation space":
//
//   0       → the end-of-sequence sentinel
//   1..=L   → input position 0..L-1, shifted by one
//
// A target for a list of L numbers is therefore L+1 pointers:
// the annotation of the smallest input, the next smallest, ...,
// and finally 0.
//
// Example:
//   values   = [3, 1, 2]
//   order    = [1, 2, 0]       (input indices, ascending)
//   pointers = [2, 3, 1, 0]    (annotation space + sentinel)

use crate::domain::error::{PointerError, PointerResult};

/// Annotation index reserved for the end-of-sequence sentinel.
pub const END_POINTER: usize = 0;

/// Pointer targets that sort `values` ascending.
///
/// Equal values keep their input order (stable sort).
pub fn sorting_pointers(values: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order_to_pointers(&order)
}

/// Convert input indices into annotation-space pointers plus the sentinel.
pub fn order_to_pointers(order: &[usize]) -> Vec<usize> {
    order
        .iter()
        .map(|&i| i + 1)
        .chain(std::iter::once(END_POINTER))
        .collect()
}

/// Read a pointer sequence back as input indices, stopping at the sentinel.
pub fn pointers_to_order(pointers: &[usize]) -> Vec<usize> {
    pointers
        .iter()
        .take_while(|&&p| p != END_POINTER)
        .map(|&p| p - 1)
        .collect()
}

/// Check that `pointers` is a permutation of `1..=max_len` followed by the sentinel.
pub fn validate_pointers(pointers: &[usize], max_len: usize) -> PointerResult<()> {
    if pointers.len() != max_len + 1 {
        return Err(PointerError::shape("pointers", &[max_len + 1], &[pointers.len()]));
    }

    let mut seen = vec![false; max_len + 1];
    for &p in &pointers[..max_len] {
        if p == END_POINTER || p > max_len || seen[p] {
            return Err(PointerError::InvalidPermutation(pointers.to_vec()));
        }
        seen[p] = true;
    }

    if pointers[max_len] != END_POINTER {
        return Err(PointerError::InvalidPermutation(pointers.to_vec()));
    }
    Ok(())
}

/// Index of the single 1.0 entry of a one-hot row, or `None`.
pub fn one_hot_index(row: &[f32]) -> Option<usize> {
    let mut hot = None;
    for (i, &v) in row.iter().enumerate() {
        if v == 1.0 {
            if hot.is_some() {
                return None;
            }
            hot = Some(i);
        } else if v != 0.0 {
            return None;
        }
    }
    hot
}

/// Sequence-level exact match: every step must agree.
pub fn is_exact_match(predicted: &[usize], target: &[usize]) -> bool {
    predicted.len() == target.len() && predicted.iter().zip(target).all(|(a, b)| a == b)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorting_pointers_shift_by_one() {
        // index 1 holds the smallest value, then 2, then 0
        assert_eq!(sorting_pointers(&[3.0, 1.0, 2.0]), vec![2, 3, 1, 0]);
    }

    #[test]
    fn test_pointers_to_order_stops_at_sentinel() {
        assert_eq!(pointers_to_order(&[2, 3, 1, 0]), vec![1, 2, 0]);
        assert_eq!(pointers_to_order(&[2, 0, 1, 0]), vec![1]);
        assert_eq!(pointers_to_order(&[0, 1, 2, 3]), Vec::<usize>::new());
    }

    #[test]
    fn test_order_round_trip_on_sorting_example() {
        let pointers = order_to_pointers(&[1, 2, 0]);
        assert_eq!(pointers, vec![2, 3, 1, 0]);
        assert_eq!(pointers_to_order(&pointers), vec![1, 2, 0]);
    }

    #[test]
    fn test_stable_for_duplicates() {
        assert_eq!(sorting_pointers(&[0.5, 0.5, 0.1]), vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_validate_accepts_permutation() {
        assert!(validate_pointers(&[2, 3, 1, 0], 3).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_pointers() {
        // wrong length
        assert!(matches!(
            validate_pointers(&[1, 0], 3),
            Err(PointerError::ShapeMismatch { .. })
        ));
        // repeated position
        assert_eq!(
            validate_pointers(&[1, 1, 2, 0], 3),
            Err(PointerError::InvalidPermutation(vec![1, 1, 2, 0]))
        );
        // sentinel too early
        assert!(validate_pointers(&[1, 0, 2, 3], 3).is_err());
        // missing final sentinel
        assert!(validate_pointers(&[1, 2, 3, 3], 3).is_err());
        // out of range
        assert!(validate_pointers(&[1, 2, 4, 0], 3).is_err());
    }

    #[test]
    fn test_one_hot_index() {
        assert_eq!(one_hot_index(&[0.0, 1.0, 0.0]), Some(1));
        assert_eq!(one_hot_index(&[0.0, 0.0, 0.0]), None);
        assert_eq!(one_hot_index(&[1.0, 1.0, 0.0]), None);
        assert_eq!(one_hot_index(&[0.5, 0.5, 0.0]), None);
    }

    #[test]
    fn test_exact_match_is_sequence_level() {
        assert!(is_exact_match(&[2, 3, 1, 0], &[2, 3, 1, 0]));
        assert!(!is_exact_match(&[2, 1, 3, 0], &[2, 3, 1, 0]));
        assert!(!is_exact_match(&[2, 3, 1], &[2, 3, 1, 0]));
    }
}
