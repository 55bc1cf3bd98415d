/// Most page numbers shown at once.
const MAX_VISIBLE_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl std::fmt::Display for PageItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{}", n),
            PageItem::Ellipsis => f.write_str("..."),
        }
    }
}

/// Page links for a pager with `total` pages, `current` being 1-based.
///
/// Empty when there is nothing to page through.
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(PageItem::Page).collect();
    }

    let current = current.clamp(1, total);
    let mut items = Vec::with_capacity(7);
    if current <= 3 {
        items.extend((1..=MAX_VISIBLE_PAGES).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    } else if current >= total - 2 {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((total - 4..=total).map(PageItem::Page));
    } else {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((current - 1..=current + 1).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(items: &[PageItem]) -> String {
        items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_small_totals() {
        assert!(page_window(1, 1).is_empty());
        assert_eq!(render(&page_window(2, 4)), "1 2 3 4");
    }

    #[test]
    fn test_window_positions() {
        assert_eq!(render(&page_window(2, 10)), "1 2 3 4 5 ... 10");
        assert_eq!(render(&page_window(9, 10)), "1 ... 6 7 8 9 10");
        assert_eq!(render(&page_window(5, 10)), "1 ... 4 5 6 ... 10");
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        assert_eq!(render(&page_window(0, 8)), "1 2 3 4 5 ... 8");
        assert_eq!(render(&page_window(40, 8)), "1 ... 4 5 6 7 8");
    }
}
