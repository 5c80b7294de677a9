//! Sliding page-number window for paginated listings.

use crate::models::Page;

/// Compute the window of page numbers to display around `current_page`.
///
/// Returns the zero [`Page`] when any input is non-positive or when
/// `current_page` lies beyond the last page. The window holds at most
/// `window_size` pages and is shifted, not shrunk, when it would run past
/// either end of the page range. For an even `window_size` the extra page
/// goes to the right of the current page.
pub fn compute_window(
    current_page: i64,
    page_size: i64,
    total_count: i64,
    window_size: i64,
) -> Page {
    if page_size <= 0 || current_page <= 0 || total_count <= 0 {
        return Page::default();
    }

    let total_pages = (total_count + page_size - 1) / page_size;
    if current_page > total_pages {
        return Page::default();
    }

    let window_size = window_size.max(1);
    let half = window_size / 2;
    let mut left = current_page - half;
    let mut right = left + window_size - 1;

    if left <= 0 {
        left = 1;
        right = window_size.min(total_pages);
    } else if right > total_pages {
        right = total_pages;
        left = (total_pages - window_size + 1).max(1);
    }

    Page {
        left,
        right,
        cur: current_page,
        total: total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_of_ten() {
        let page = compute_window(1, 10, 95, 5);
        assert_eq!(
            page,
            Page {
                left: 1,
                right: 5,
                cur: 1,
                total: 10
            }
        );
    }

    #[test]
    fn test_last_page_of_ten() {
        let page = compute_window(10, 10, 95, 5);
        assert_eq!(
            page,
            Page {
                left: 6,
                right: 10,
                cur: 10,
                total: 10
            }
        );
    }

    #[test]
    fn test_middle_page_is_centered() {
        let page = compute_window(5, 10, 95, 5);
        assert_eq!((page.left, page.right), (3, 7));
    }

    #[test]
    fn test_even_window_size() {
        let page = compute_window(1, 10, 95, 4);
        assert_eq!((page.left, page.right), (1, 4));

        let page = compute_window(10, 10, 95, 4);
        assert_eq!((page.left, page.right), (7, 10));

        let page = compute_window(5, 10, 95, 4);
        assert_eq!((page.left, page.right), (3, 6));
    }

    #[test]
    fn test_fewer_pages_than_window() {
        let page = compute_window(2, 10, 25, 5);
        assert_eq!(
            page,
            Page {
                left: 1,
                right: 3,
                cur: 2,
                total: 3
            }
        );
    }

    #[test]
    fn test_exact_multiple_of_page_size() {
        let page = compute_window(1, 10, 100, 5);
        assert_eq!(page.total, 10);
    }

    #[test]
    fn test_zero_inputs_yield_zero_page() {
        assert_eq!(compute_window(0, 10, 95, 5), Page::default());
        assert_eq!(compute_window(1, 0, 95, 5), Page::default());
        assert_eq!(compute_window(1, 10, 0, 5), Page::default());
        assert_eq!(compute_window(-3, 10, 95, 5), Page::default());
    }

    #[test]
    fn test_out_of_range_yields_zero_page() {
        for total_count in 1..=60 {
            let total_pages = (total_count + 9) / 10;
            for current in (total_pages + 1)..(total_pages + 4) {
                assert_eq!(compute_window(current, 10, total_count, 5), Page::default());
            }
        }
    }

    #[test]
    fn test_window_bounds_hold_for_valid_inputs() {
        for window_size in 1..=8 {
            for page_size in 1..=7 {
                for total_count in 1..=60 {
                    let total_pages = (total_count + page_size - 1) / page_size;
                    for current in 1..=total_pages {
                        let page = compute_window(current, page_size, total_count, window_size);
                        assert!(
                            page.right - page.left < window_size,
                            "window too wide: {page:?} (size {window_size})"
                        );
                        assert!(1 <= page.left, "{page:?}");
                        assert!(page.left <= page.cur, "{page:?}");
                        assert!(page.cur <= page.right, "{page:?}");
                        assert!(page.right <= page.total, "{page:?}");
                        assert_eq!(page.total, total_pages);
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_positive_window_size_shows_current_page() {
        let page = compute_window(4, 10, 95, 0);
        assert_eq!((page.left, page.right), (4, 4));
    }
}
