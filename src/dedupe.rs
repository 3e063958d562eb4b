use std::collections::HashMap;

/// Titles scoring above this against an already kept title are dropped.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Elements of `b` are treated as too common to anchor a match once `b` is
/// this long and an element makes up more than 1% of it.
const POPULAR_MIN_LEN: usize = 200;

/// Keeps the first title of every group of near-duplicates, in input order.
///
/// Each incoming title is compared against every title kept so far, so the
/// first-seen member of a group always survives.
pub fn dedupe_similar_titles<I, S>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut kept: Vec<String> = Vec::new();
    for title in titles {
        let title = title.as_ref();
        let near_duplicate = kept
            .iter()
            .any(|existing| similarity_ratio(title, existing) > SIMILARITY_THRESHOLD);
        if near_duplicate {
            tracing::debug!(title, "dropping near-duplicate title");
            continue;
        }
        kept.push(title.to_owned());
    }
    kept
}

/// Ratcliff/Obershelp similarity: `2 * M / (len(a) + len(b))`, where `M` is the
/// number of characters in the matching blocks found by repeatedly taking the
/// longest common run and recursing on both sides of it.
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matcher = Matcher::new(&a, &b);
    2.0 * matcher.matching_chars() as f64 / total as f64
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    fn matching_chars(&self) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            total += size;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                pending.push((i + size, ahi, j + size, bhi));
            }
        }
        total
    }

    /// Longest run `a[i..i+size] == b[j..j+size]` inside the given windows;
    /// ties go to the smallest `i`, then the smallest `j`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut run_len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_run_len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run_len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            run_len = next_run_len;
        }

        // Popular elements were left out of `b2j`; grow the match over them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}
