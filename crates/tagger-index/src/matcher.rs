//! Approximate string matching used for "did you mean" suggestions.
//!
//! The score is the Ratcliff/Obershelp ratio: find the longest common block,
//! recurse into the unmatched pieces on either side, and report
//! `2 * matched / combined_length`. Both sides are case-folded first.

/// Ratio above which an unknown tag is reported as a probable typo.
pub const TYPO_THRESHOLD: f64 = 0.75;

/// Similarity of `a` and `b` in `[0, 1]`. Two empty strings score `1.0`.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = 2.0 * matching_characters(&a, &b) as f64 / total as f64;
    score
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest `(i, j, size)` with `a[i..i + size] == b[j..j + size]` inside the
/// given half-open ranges. Ties keep the block found first, scanning `a` then
/// `b` in order.
fn longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    // current[k] is the length of the common run ending at a[i] and b[blo + k - 1].
    let mut previous = vec![0usize; bhi - blo + 1];
    let mut current = vec![0usize; bhi - blo + 1];
    for (i, ca) in a.iter().enumerate().take(ahi).skip(alo) {
        for (k, cb) in b[blo..bhi].iter().enumerate().map(|(k, cb)| (k + 1, cb)) {
            current[k] = if ca == cb { previous[k - 1] + 1 } else { 0 };
            let run = current[k];
            if run > best.2 {
                best = (i + 1 - run, blo + k - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn identical_strings() {
        assert!(approx(ratio("music", "music"), 1.0));
    }

    #[test]
    fn case_is_folded() {
        assert!(approx(ratio("Music", "mUSIC"), 1.0));
    }

    #[test]
    fn one_substitution() {
        // "musi" matches: 2 * 4 / 10
        assert!(approx(ratio("musik", "music"), 0.8));
        assert!(ratio("musik", "music") > TYPO_THRESHOLD);
    }

    #[test]
    fn nothing_in_common() {
        assert!(approx(ratio("xyz", "music"), 0.0));
    }

    #[test]
    fn shifted_block() {
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        assert!(ratio("abcd", "bcde") <= TYPO_THRESHOLD);
    }

    #[test]
    fn recursion_on_both_sides() {
        // "a" + "cd" + "f" are found around the longest block.
        assert!(approx(ratio("abcdef", "axcdyf"), 2.0 * 4.0 / 12.0));
    }

    #[test]
    fn empty_inputs() {
        assert!(approx(ratio("", ""), 1.0));
        assert!(approx(ratio("", "rust"), 0.0));
    }

    #[test]
    fn non_ascii() {
        assert!(approx(ratio("café", "CAFÉ"), 1.0));
        assert!(approx(ratio("über", "uber"), 0.75));
    }
}
