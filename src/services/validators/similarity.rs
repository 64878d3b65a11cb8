// 文字列類似度（Ratcliff/Obershelp方式）

/// 2つの文字列の一致率 `2M / T`（M: 一致文字数、T: 両者の合計文字数）
///
/// 最長一致ブロックを取り、その左右を再帰的に比較する。両方空なら1.0。
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
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

/// `a[alo..ahi]` と `b[blo..bhi]` の最長共通ブロック（同長なら最も左のもの）
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    let mut previous = vec![0usize; width + 1];

    for i in alo..ahi {
        let mut current = vec![0usize; width + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let k = previous[j - blo] + 1;
            current[j - blo + 1] = k;
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        previous = current;
    }

    best
}

/// 住所の類似度：一致率に共通単語1つあたり0.1を加算（上限1.0）
pub fn address_similarity(a: &str, b: &str) -> f64 {
    let ratio = sequence_ratio(a, b);

    let words_a: std::collections::BTreeSet<&str> = a.split_whitespace().collect();
    let common = b
        .split_whitespace()
        .collect::<std::collections::BTreeSet<&str>>()
        .intersection(&words_a)
        .count();

    (ratio + common as f64 * 0.1).min(1.0)
}
