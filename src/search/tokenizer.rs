//! Text normalization shared by filters, scoring and suggestions / 文本标准化
//!
//! Matching is case-insensitive everywhere; tokens are whitespace-delimited.

/// Lowercase + trim / 转小写并去除首尾空白
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Normalize a tag for comparison / 标准化标签
pub fn normalize_tag(tag: &str) -> String {
    normalize(tag)
}

/// Split a query into lowercase terms / 将查询拆分为小写词项
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Whitespace-delimited words of an already lowercased field / 按空白切分
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Tags joined into one searchable field / 标签拼接为单一字段
pub fn joined_tags(tags: &[String]) -> String {
    tags.join(" ").to_lowercase()
}

/// Split a comma separated list, dropping empty items / 解析逗号分隔列表
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_query() {
        assert_eq!(tokenize_query("  Casa   Moderna "), vec!["casa", "moderna"]);
        assert!(tokenize_query("   ").is_empty());
    }

    #[test]
    fn test_joined_tags() {
        let tags = vec!["Audio".to_string(), "LoFi".to_string()];
        assert_eq!(joined_tags(&tags), "audio lofi");
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("audio, 3d,,  "), vec!["audio", "3d"]);
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  Texturas "), "texturas");
    }
}
