//! Query expansion and passage deduplication for lesson retrieval.

/// Short student phrasings and the lesson vocabulary they stand for.
static EXPANSIONS: [(&str, &str); 10] = [
    ("chẵn", "số chẵn chia hết cho 2"),
    ("lẻ", "số lẻ không chia hết cho 2"),
    ("phân số", "tử số mẫu số"),
    ("rút gọn", "rút gọn phân số chia cả tử số và mẫu số"),
    ("quy đồng", "quy đồng mẫu số các phân số"),
    ("chu vi", "chu vi tổng độ dài các cạnh"),
    ("diện tích", "diện tích chiều dài nhân chiều rộng"),
    ("đặt tính", "đặt tính rồi tính thẳng hàng"),
    ("hàng", "giá trị theo hàng đơn vị chục trăm nghìn vạn"),
    ("tính nhẩm", "tính nhẩm cộng trừ nhân chia"),
];

/// Default number of leading characters compared when deduplicating.
pub const DEFAULT_PREFIX_LEN: usize = 100;

/// Appends the expansion of every table key found in `query`, each once and
/// in table order. A query without matches is returned unchanged.
pub fn expand_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mut expanded = query.trim().to_string();

    for (key, expansion) in EXPANSIONS.iter() {
        if lowered.contains(key) {
            expanded.push(' ');
            expanded.push_str(expansion);
        }
    }

    expanded
}

/// Drops passages whose first `prefix_len` characters (after trimming) equal
/// those of an earlier passage. Order is preserved.
pub fn dedup_by_prefix(passages: Vec<String>, prefix_len: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(passages.len());
    let mut kept = Vec::with_capacity(passages.len());

    for passage in passages {
        let prefix: String = passage.trim().chars().take(prefix_len).collect();
        if seen.contains(&prefix) {
            continue;
        }
        seen.push(prefix);
        kept.push(passage);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_matching_keys() {
        let expanded = expand_query("Số 8 có phải số chẵn không?");
        assert!(expanded.starts_with("Số 8 có phải số chẵn không?"));
        assert!(expanded.contains("số chẵn chia hết cho 2"));
        assert!(!expanded.contains("tử số"));
    }

    #[test]
    fn test_unmatched_query_is_untouched() {
        assert_eq!(expand_query("xin chào cô"), "xin chào cô");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = format!("{}đoạn A", "x".repeat(100));
        let b = format!("{}đoạn B", "x".repeat(100));
        let c = "Một đoạn khác".to_string();

        let kept = dedup_by_prefix(vec![a.clone(), c.clone(), b], DEFAULT_PREFIX_LEN);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn test_dedup_counts_characters_not_bytes() {
        // Both passages share their first 3 characters, each several bytes long.
        let kept = dedup_by_prefix(vec!["ữữữa".to_string(), "  ữữữb".to_string()], 3);
        assert_eq!(kept.len(), 1);

        let kept = dedup_by_prefix(vec!["ữữữa".to_string(), "ữữữb".to_string()], 4);
        assert_eq!(kept.len(), 2);
    }
}
