//! Page navigation control.

/// One slot in the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    Page(u32),
    Ellipsis,
}

/// Page selector for a paginated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    pub current: u32,
    pub total: u32,
    pub entries: Vec<PageEntry>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

/// Build the selector. Returns `None` when there is at most one page.
///
/// Shows the first and last page plus the neighbours of `current`, with an ellipsis two
/// pages away from `current`. Navigation is disabled while `loading`.
pub fn page_control(current: u32, total: u32, loading: bool) -> Option<PageControl> {
    if total <= 1 {
        return None;
    }

    Some(PageControl {
        current,
        total,
        entries: page_window(current, total),
        prev_enabled: !loading && current > 1,
        next_enabled: !loading && current < total,
    })
}

/// Entries of the selector in page order.
pub fn page_window(current: u32, total: u32) -> Vec<PageEntry> {
    let lo = current.saturating_sub(2).max(1);
    let hi = current.saturating_add(2).min(total);

    let mut candidates = vec![1, total];
    if lo <= hi {
        candidates.extend(lo..=hi);
    }
    candidates.sort_unstable();
    candidates.dedup();

    candidates
        .into_iter()
        .filter_map(|page| {
            if page == 1 || page == total || page.abs_diff(current) <= 1 {
                Some(PageEntry::Page(page))
            } else if page.abs_diff(current) == 2 {
                Some(PageEntry::Ellipsis)
            } else {
                None
            }
        })
        .collect()
}
