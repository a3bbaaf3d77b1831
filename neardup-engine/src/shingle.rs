//! Shingle extraction: normalized text to a set of hashed w-word windows.

use neardup_core::config::ShingleConfig;
use neardup_core::types::FxHashSet;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Case-fold and strip punctuation according to the flags.
///
/// Punctuation is removed rather than replaced, so `don't` becomes `dont`.
/// Whitespace is left alone; tokenization splits on it afterwards.
pub fn normalize(text: &str, lowercase: bool, strip_punctuation: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if strip_punctuation && !c.is_alphanumeric() && !c.is_whitespace() {
            continue;
        }
        if lowercase {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A document's shingles as 64-bit hashes. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShingleSet(FxHashSet<u64>);

impl ShingleSet {
    pub fn from_hashes(hashes: impl IntoIterator<Item = u64>) -> Self {
        Self(hashes.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.0.contains(&hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    /// Exact Jaccard similarity |A ∩ B| / |A ∪ B|.
    ///
    /// Returns 0.0 if either set is empty: a degenerate document is never
    /// similar to anything, itself included.
    pub fn jaccard(&self, other: &ShingleSet) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let intersection = small.0.iter().filter(|h| large.0.contains(h)).count();
        let union = self.len() + other.len() - intersection;
        intersection as f64 / union as f64
    }
}

/// Turns text into a `ShingleSet` for a fixed width and seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shingler {
    width: usize,
    seed: u64,
    lowercase: bool,
    strip_punctuation: bool,
}

impl Shingler {
    pub fn new(width: usize, seed: u64) -> Self {
        Self {
            width: width.max(1),
            seed,
            lowercase: true,
            strip_punctuation: true,
        }
    }

    pub fn from_config(config: &ShingleConfig) -> Self {
        Self {
            width: config.effective_width().max(1),
            seed: config.effective_seed(),
            lowercase: config.effective_lowercase(),
            strip_punctuation: config.effective_strip_punctuation(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    pub fn strip_punctuation(&self) -> bool {
        self.strip_punctuation
    }

    /// Shingle `text`. Fewer than `width` tokens gives an empty set.
    ///
    /// Each window is hashed as its tokens joined by a single space, so the
    /// hash does not depend on the original whitespace.
    pub fn shingle(&self, text: &str) -> ShingleSet {
        let normalized = normalize(text, self.lowercase, self.strip_punctuation);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.len() < self.width {
            return ShingleSet::default();
        }

        let mut set = FxHashSet::default();
        set.reserve(tokens.len() - self.width + 1);
        let mut window = String::new();
        for chunk in tokens.windows(self.width) {
            window.clear();
            for (i, token) in chunk.iter().enumerate() {
                if i > 0 {
                    window.push(' ');
                }
                window.push_str(token);
            }
            set.insert(xxh3_64_with_seed(window.as_bytes(), self.seed));
        }
        ShingleSet(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_drops_punctuation() {
        assert_eq!(normalize("  Hello, World! It's  ", true, true), "hello world its");
        assert_eq!(normalize("Hello, World!", false, false), "Hello, World!");
    }

    #[test]
    fn window_count_bounds_set_size() {
        let shingler = Shingler::new(3, 0);
        let set = shingler.shingle("a b c d e");
        // 5 tokens, width 3 -> 3 windows
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn repeated_windows_collapse() {
        let shingler = Shingler::new(2, 0);
        let set = shingler.shingle("x y x y x y");
        // windows: "x y", "y x" only
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn short_or_empty_text_is_degenerate() {
        let shingler = Shingler::new(3, 0);
        assert!(shingler.shingle("").is_empty());
        assert!(shingler.shingle("only two").is_empty());
        assert!(shingler.shingle("!!! ???").is_empty());
    }

    #[test]
    fn whitespace_and_case_do_not_change_shingles() {
        let shingler = Shingler::new(2, 0);
        assert_eq!(
            shingler.shingle("The quick  brown\tfox"),
            shingler.shingle("the QUICK brown fox")
        );
    }

    #[test]
    fn seed_changes_hashes() {
        let a = Shingler::new(2, 0).shingle("one two three");
        let b = Shingler::new(2, 99).shingle("one two three");
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn jaccard_of_partial_overlap() {
        let a = ShingleSet::from_hashes([1, 2, 3]);
        let b = ShingleSet::from_hashes([1, 2, 4]);
        // intersection = 2, union = 4
        assert!((a.jaccard(&b) - 0.5).abs() < 1e-12);
        assert!((a.jaccard(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn jaccard_with_empty_is_zero() {
        let empty = ShingleSet::default();
        assert_eq!(empty.jaccard(&empty), 0.0);
        assert_eq!(empty.jaccard(&ShingleSet::from_hashes([1])), 0.0);
    }
}
