//! Euclidean rhythms: spread `k` accents as evenly as possible over `n` beats.
//!
//! Groups of beats are repeatedly redistributed, Bjorklund style: each
//! remainder group is appended to an accented group until at most one
//! remainder group is left.

use super::error::RuntimeError;

/// Longest pattern `spread` builds.
pub const MAX_BEATS: usize = 4096;

fn redistribute(
    left: Vec<Vec<bool>>,
    right: Vec<Vec<bool>>,
) -> (Vec<Vec<bool>>, Vec<Vec<bool>>) {
    let moves = left.len().min(right.len());
    let mut new_left = Vec::with_capacity(moves);
    let mut new_right = Vec::new();

    let mut left = left.into_iter();
    let mut right = right.into_iter();
    for _ in 0..moves {
        if let (Some(mut l), Some(r)) = (left.next(), right.next()) {
            l.extend(r);
            new_left.push(l);
        }
    }
    new_right.extend(left);
    new_right.extend(right);
    (new_left, new_right)
}

/// `k` accents spread over `n` beats.
pub fn spread(accents: usize, beats: usize) -> Result<Vec<bool>, RuntimeError> {
    if beats > MAX_BEATS {
        return Err(RuntimeError::invalid(format!(
            "spread supports at most {MAX_BEATS} beats, got {beats}"
        )));
    }
    if accents > beats {
        return Err(RuntimeError::invalid(
            "number of accented beats cannot be greater than the total number of beats",
        ));
    }
    if accents == 0 {
        return Ok(vec![false; beats]);
    }

    let mut left: Vec<Vec<bool>> = vec![vec![true]; accents];
    let mut right: Vec<Vec<bool>> = vec![vec![false]; beats - accents];
    while right.len() > 1 {
        (left, right) = redistribute(left, right);
    }
    Ok(left.into_iter().chain(right).flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == 'x').collect()
    }

    #[test]
    fn reference_patterns() {
        let cases = [
            (1, 2, "x."),
            (1, 3, "x.."),
            (1, 4, "x..."),
            (4, 12, "x..x..x..x.."),
            (2, 3, "xx."),
            (2, 5, "x.x.."),
            (3, 4, "xxx."),
            (3, 5, "x.x.x"),
            (3, 7, "x.x.x.."),
            (3, 8, "x..x..x."),
            (4, 7, "x.x.x.x"),
            (4, 9, "x.x.x.x.."),
            (4, 11, "x..x..x..x."),
            (5, 6, "xxxxx."),
            (5, 7, "x.xx.xx"),
            (5, 8, "x.xx.xx."),
            (5, 9, "x.x.x.x.x"),
            (5, 11, "x.x.x.x.x.."),
            (5, 12, "x..x.x..x.x."),
            (5, 16, "x..x..x..x..x..."),
            (7, 8, "xxxxxxx."),
            (7, 12, "x.xx.x.xx.x."),
            (7, 16, "x..x.x.x..x.x.x."),
            (9, 16, "x.xx.x.x.xx.x.x."),
            (11, 24, "x..x.x.x.x.x..x.x.x.x.x."),
            (13, 24, "x.xx.x.x.x.x.xx.x.x.x.x."),
        ];
        for (k, n, expected) in cases {
            assert_eq!(spread(k, n).unwrap(), pattern(expected), "spread({k}, {n})");
        }
    }

    #[test]
    fn length_and_accent_count_hold_for_all_inputs() {
        for n in 0..=32 {
            for k in 0..=n {
                let result = spread(k, n).unwrap();
                assert_eq!(result.len(), n);
                assert_eq!(result.iter().filter(|&&b| b).count(), k);
                assert_eq!(spread(k, n).unwrap(), result);
            }
        }
    }

    #[test]
    fn more_accents_than_beats_is_an_error() {
        assert!(spread(5, 4).is_err());
    }

    #[test]
    fn oversized_patterns_are_rejected() {
        assert!(spread(0, MAX_BEATS + 1).is_err());
        assert!(spread(0, 4_000_000_000).is_err());
        assert_eq!(spread(0, MAX_BEATS).unwrap().len(), MAX_BEATS);
    }

    #[test]
    fn edge_cases() {
        assert!(spread(0, 0).unwrap().is_empty());
        assert_eq!(spread(0, 3).unwrap(), vec![false; 3]);
        assert_eq!(spread(3, 3).unwrap(), vec![true; 3]);
    }
}
