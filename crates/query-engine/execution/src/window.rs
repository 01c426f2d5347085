//! Materialize a bounded window of rows from a cursor.

use crate::driver::{Cursor, Row};
use crate::error::Error;

/// Upper bound for the initial allocation of a window.
const MAX_PREALLOCATED_ROWS: usize = 1024;

/// Which rows of a result set are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Rows to read and discard before materializing anything.
    pub offset: usize,
    /// Maximum number of rows to materialize after the offset. `None` means all of them.
    pub max_rows: Option<usize>,
}

impl Window {
    pub fn new(offset: Option<usize>, max_rows: Option<usize>) -> Self {
        Window {
            offset: offset.unwrap_or(0),
            max_rows,
        }
    }

    fn is_full(&self, materialized: usize) -> bool {
        self.max_rows.is_some_and(|max_rows| materialized >= max_rows)
    }
}

/// Read the rows described by `window` from `cursor`.
///
/// The offset is applied by reading rows and throwing them away, not by seeking, since
/// not every driver can seek. An offset past the end of the result set yields an empty
/// window. Rows after the window are left in the cursor.
pub async fn fetch_window(
    cursor: &mut (dyn Cursor + '_),
    window: Window,
) -> Result<Vec<Row>, Error> {
    for _ in 0..window.offset {
        if !cursor.skip_row().await? {
            return Ok(vec![]);
        }
    }

    let mut rows = Vec::with_capacity(window.max_rows.unwrap_or(0).min(MAX_PREALLOCATED_ROWS));
    while !window.is_full(rows.len()) {
        match cursor.next_row().await? {
            Some(row) => rows.push(row),
            None => break,
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// A cursor over `r0..r{count}` that remembers how far it was read.
    struct CountingCursor {
        rows: VecDeque<Row>,
        read: usize,
    }

    impl CountingCursor {
        fn with_rows(count: usize) -> Self {
            CountingCursor {
                rows: (0..count).map(row).collect(),
                read: 0,
            }
        }
    }

    fn row(index: usize) -> Row {
        [("r", json!(index))].into_iter().collect()
    }

    #[async_trait]
    impl Cursor for CountingCursor {
        async fn next_row(&mut self) -> Result<Option<Row>, Error> {
            let next = self.rows.pop_front();
            if next.is_some() {
                self.read += 1;
            }
            Ok(next)
        }

        async fn skip_row(&mut self) -> Result<bool, Error> {
            Ok(self.next_row().await?.is_some())
        }

        async fn close(self: Box<Self>) -> Result<(), Error> {
            Ok(())
        }
    }

    async fn window_of(count: usize, offset: Option<usize>, max_rows: Option<usize>) -> Vec<Row> {
        let mut cursor = CountingCursor::with_rows(count);
        fetch_window(&mut cursor, Window::new(offset, max_rows))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn offset_and_limit_select_a_slice() {
        let rows = window_of(10, Some(3), Some(4)).await;
        assert_eq!(rows, vec![row(3), row(4), row(5), row(6)]);
    }

    #[tokio::test]
    async fn no_bounds_returns_everything() {
        let rows = window_of(10, Some(0), None).await;
        assert_eq!(rows, (0..10).map(row).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn offset_past_the_end_is_empty() {
        let rows = window_of(10, Some(12), Some(5)).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn zero_rows_requested() {
        let rows = window_of(10, None, Some(0)).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn limit_larger_than_the_result_set() {
        let rows = window_of(3, Some(1), Some(100)).await;
        assert_eq!(rows, vec![row(1), row(2)]);
    }

    #[tokio::test]
    async fn rows_after_the_window_are_not_read() {
        let mut cursor = CountingCursor::with_rows(10);
        let rows = fetch_window(&mut cursor, Window::new(Some(2), Some(3)))
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(cursor.read, 5);
        assert_eq!(cursor.rows.len(), 5);
    }
}
