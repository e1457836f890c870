//! Offset/limit pagination / 分页

use serde::Serialize;

/// Page metadata / 分页信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

impl PageInfo {
    pub fn new(total: usize, page: u32, limit: u32) -> Self {
        let total_pages = total_pages(total, limit);
        Self {
            total,
            page,
            limit,
            total_pages,
            has_more: page < total_pages,
        }
    }

    /// Index of the first item of this page / 本页起始偏移
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }
}

/// ceil(total / limit), 0 when nothing matched / 总页数
pub fn total_pages(total: usize, limit: u32) -> u32 {
    if total == 0 || limit == 0 {
        return 0;
    }
    let limit = limit as usize;
    ((total + limit - 1) / limit) as u32
}

/// Slice `[offset, offset + limit)` out of the full ordered set / 截取当前页
pub fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> (Vec<T>, PageInfo) {
    let info = PageInfo::new(items.len(), page, limit);
    let start = info.offset().min(items.len());
    let end = start.saturating_add(limit as usize).min(items.len());
    (items[start..end].to_vec(), info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_items_two_per_page() {
        let items = vec!["a", "b", "c"];
        let (page1, info1) = paginate(&items, 1, 2);
        assert_eq!(page1, vec!["a", "b"]);
        assert_eq!(info1.total_pages, 2);
        assert!(info1.has_more);

        let (page2, info2) = paginate(&items, 2, 2);
        assert_eq!(page2, vec!["c"]);
        assert!(!info2.has_more);
        assert_eq!(info2.total, 3);
    }

    #[test]
    fn test_empty_and_out_of_range() {
        let empty: Vec<u8> = Vec::new();
        let (page, info) = paginate(&empty, 1, 20);
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_more);

        let items = vec![1, 2, 3];
        let (page, info) = paginate(&items, 9, 2);
        assert!(page.is_empty());
        assert_eq!(info.total, 3);
        assert!(!info.has_more);
    }

    #[test]
    fn test_pages_partition_the_set() {
        let items: Vec<u32> = (0..47).collect();
        let limit = 10;
        let pages = total_pages(items.len(), limit);
        let mut seen = Vec::new();
        for page in 1..=pages {
            let (chunk, _) = paginate(&items, page, limit);
            seen.extend(chunk);
        }
        assert_eq!(seen, items);
    }
}
