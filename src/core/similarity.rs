// normalized edit-distance similarity for the fuzzy resolution step
use crate::core::rules::strip_library_prefix;

/// Levenshtein distance over chars.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let m = a.len();
    let n = b.len();
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// `1 - distance / longest`, case-insensitive. Two empty strings score 0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

//compare both the full names and the names without library qualifier, keep the better
fn name_ratio(raw: &str, candidate: &str) -> f64 {
    ratio(raw, candidate).max(ratio(strip_library_prefix(raw), strip_library_prefix(candidate)))
}

/// Best candidate whose ratio is strictly above `threshold`. Ties keep the
/// earlier candidate, so the result depends on candidate order.
pub fn best_match<'a>(raw: &str, candidates: &[&'a str], threshold: f64) -> Option<(&'a str, f64)> {
    let mut best: Option<(&'a str, f64)> = None;
    for &candidate in candidates {
        let score = name_ratio(raw, candidate);
        if score > threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        let c = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&c("abc"), &c("abc")), 0);
        assert_eq!(levenshtein(&c(""), &c("abc")), 3);
        assert_eq!(levenshtein(&c("cat"), &c("car")), 1);
        assert_eq!(levenshtein(&c("kitten"), &c("sitting")), 3);
    }

    #[test]
    fn ratio_is_normalized() {
        assert_eq!(ratio("LED", "led"), 1.0);
        assert_eq!(ratio("", ""), 0.0);
        assert!((ratio("abcd", "abcf") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn best_match_respects_threshold_and_order() {
        let candidates = ["Device:LED", "Device:LED_Small", "Device:R"];
        let (hit, score) = best_match("LED", &candidates, 0.6).unwrap();
        assert_eq!(hit, "Device:LED");
        assert_eq!(score, 1.0);

        assert!(best_match("XTAL_32K", &candidates, 0.6).is_none());
        //exactly at threshold is rejected
        assert!(best_match("abcd", &["abxy"], 0.5).is_none());
    }
}
