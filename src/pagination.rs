//! 分页：在基于偏移量或游标的列表接口上提供惰性迭代。
//!
//! Lazy iteration over offset- or cursor-based list endpoints.
//!
//! [`PaginatedIterator`] yields whole pages until a page reports no more
//! data; [`auto_paginate`] flattens pages into a stream of items. Neither is
//! restartable: once exhausted (or after an error) they stay finished.
//! [`batch_read`] drains a listing eagerly, optionally capped at a page count.

use crate::{Error, ErrorContext, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_READ_PAGE_SIZE: u32 = 100;

/// One page as reported by the fetch function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
}

/// Page-at-a-time iterator over an offset/limit fetch function.
pub struct PaginatedIterator<T, F> {
    fetch: F,
    offset: u32,
    limit: u32,
    has_more: bool,
    _item: std::marker::PhantomData<fn() -> T>,
}

impl<T, F, Fut> PaginatedIterator<T, F>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    pub fn new(fetch: F, limit: u32) -> Self {
        Self {
            fetch,
            offset: 0,
            limit: limit.max(1),
            has_more: true,
            _item: std::marker::PhantomData,
        }
    }

    /// Fetch the next page; `None` once the previous page reported no more data.
    pub async fn next_page(&mut self) -> Option<Result<Vec<T>>> {
        if !self.has_more {
            return None;
        }
        match (self.fetch)(self.offset, self.limit).await {
            Ok(page) => {
                self.has_more = page.has_more;
                self.offset = self.offset.saturating_add(self.limit);
                Some(Ok(page.data))
            }
            Err(e) => {
                self.has_more = false;
                Some(Err(e))
            }
        }
    }

    /// Collect every remaining item. Holds the whole result set in memory.
    pub async fn to_vec(mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await {
            all.extend(page?);
        }
        Ok(all)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>>> {
        stream::unfold(self, |mut it| async move {
            let page = it.next_page().await?;
            Some((page, it))
        })
    }
}

struct AutoState<T, F> {
    fetch: F,
    offset: u32,
    limit: u32,
    buffered: VecDeque<T>,
    done: bool,
}

/// Stream of individual items across pages.
///
/// Stops after an empty page or a page whose length differs from `limit`.
pub fn auto_paginate<T, F, Fut>(fetch: F, limit: u32) -> impl Stream<Item = Result<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let state = AutoState {
        fetch,
        offset: 0,
        limit: limit.max(1),
        buffered: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.buffered.pop_front() {
                return Some((Ok(item), st));
            }
            if st.done {
                return None;
            }
            match (st.fetch)(st.offset, st.limit).await {
                Ok(items) if items.is_empty() => return None,
                Ok(items) => {
                    st.done = items.len() != st.limit as usize;
                    st.offset = st.offset.saturating_add(st.limit);
                    st.buffered.extend(items);
                }
                Err(e) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
            }
        }
    })
}

type PageFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options for [`batch_read`].
#[derive(Clone)]
pub struct ReadOptions {
    pub page_size: u32,
    /// Stop after this many non-empty pages. `Some(0)` reads nothing.
    pub max_pages: Option<usize>,
    on_page: Option<PageFn>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_READ_PAGE_SIZE,
            max_pages: None,
            on_page: None,
        }
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("on_page", &self.on_page.is_some())
            .finish()
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Called with `(pages_read, items_so_far)` after each non-empty page.
    pub fn on_page(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_page = Some(Arc::new(f));
        self
    }
}

/// Drain an offset listing into one `Vec`.
///
/// Page `n` is requested at `offset = n * page_size`. Stops on an empty page,
/// a page shorter than `page_size`, or once `max_pages` pages were read. The
/// first fetch error is returned and the items read so far are dropped.
pub async fn batch_read<T, F, Fut>(mut fetch: F, options: &ReadOptions) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let limit = options.page_size.max(1);
    let mut all = Vec::new();
    let mut pages = 0usize;
    while options.max_pages.map_or(true, |max| pages < max) {
        let offset = u32::try_from(pages).unwrap_or(u32::MAX).saturating_mul(limit);
        let items = fetch(offset, limit).await?;
        if items.is_empty() {
            break;
        }
        let short = items.len() < limit as usize;
        all.extend(items);
        pages += 1;
        if let Some(f) = &options.on_page {
            f(pages, all.len());
        }
        if short {
            break;
        }
    }
    Ok(all)
}

/// Position in an offset-addressed listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCursor {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

/// Either an offset/limit pair or a server-issued opaque token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Offset(OffsetCursor),
    Token(String),
}

impl Cursor {
    /// Opaque string form, suitable for a `cursor` query parameter.
    pub fn encode(&self) -> Result<String> {
        match self {
            Cursor::Offset(c) => encode_cursor(c),
            Cursor::Token(t) => Ok(t.clone()),
        }
    }
}

/// Base64 of the JSON form of `data`.
pub fn encode_cursor<T: Serialize>(data: &T) -> Result<String> {
    Ok(STANDARD.encode(serde_json::to_vec(data)?))
}

pub fn decode_cursor<T: DeserializeOwned>(cursor: &str) -> Result<T> {
    let invalid = || {
        Error::validation(
            "Invalid cursor format",
            ErrorContext::new().with_source("pagination"),
        )
    };
    let bytes = STANDARD.decode(cursor.trim()).map_err(|_| invalid())?;
    serde_json::from_slice(&bytes).map_err(|_| invalid())
}

/// Pagination block attached to a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub has_more: bool,
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
}

impl PaginationMeta {
    /// Metadata for a page of `count` items fetched at `offset`; a full page
    /// is assumed to have a successor.
    pub fn from_page(count: usize, limit: u32, offset: u32, total: Option<u64>) -> Result<Self> {
        let has_more = count == limit as usize;
        let next_cursor = if has_more {
            Some(encode_cursor(&OffsetCursor { offset: offset.saturating_add(limit), limit })?)
        } else {
            None
        };
        let prev_cursor = if offset > 0 {
            Some(encode_cursor(&OffsetCursor { offset: offset.saturating_sub(limit), limit })?)
        } else {
            None
        };
        Ok(Self { has_more, limit, offset, total, next_cursor, prev_cursor })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub offset: Option<u32>,
}

/// Resolve params to an offset/limit pair. A cursor wins over explicit
/// offset/limit; a missing or zero limit becomes [`DEFAULT_PAGE_LIMIT`].
pub fn parse_pagination_params(params: &PaginationParams) -> Result<OffsetCursor> {
    let (limit, offset) = match params.cursor.as_deref() {
        Some(c) if !c.is_empty() => {
            let decoded: OffsetCursor = decode_cursor(c)?;
            (decoded.limit, decoded.offset)
        }
        _ => (params.limit.unwrap_or(0), params.offset.unwrap_or(0)),
    };
    Ok(OffsetCursor {
        limit: if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit },
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorKind;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::{Arc, Mutex};

    fn numbers(total: u32) -> impl FnMut(u32, u32) -> futures::future::Ready<Result<Page<u32>>> {
        move |offset, limit| {
            let end = (offset + limit).min(total);
            let data: Vec<u32> = (offset..end).collect();
            futures::future::ready(Ok(Page { data, has_more: end < total }))
        }
    }

    #[tokio::test]
    async fn test_iterator_yields_pages_until_exhausted() {
        let mut it = PaginatedIterator::new(numbers(5), 2);
        assert_eq!(it.next_page().await.unwrap().unwrap(), vec![0, 1]);
        assert_eq!(it.next_page().await.unwrap().unwrap(), vec![2, 3]);
        assert_eq!(it.next_page().await.unwrap().unwrap(), vec![4]);
        assert!(it.next_page().await.is_none());
        assert!(it.next_page().await.is_none());
    }

    #[tokio::test]
    async fn test_to_vec_and_stream() {
        let all = PaginatedIterator::new(numbers(7), 3).to_vec().await.unwrap();
        assert_eq!(all, (0..7).collect::<Vec<_>>());

        let pages: Vec<Vec<u32>> = PaginatedIterator::new(numbers(4), 2)
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(pages, vec![vec![0, 1], vec![2, 3]]);
    }

    #[tokio::test]
    async fn test_iterator_stops_after_error() {
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        let mut it = PaginatedIterator::new(
            move |_, _| {
                *c.lock().unwrap() += 1;
                futures::future::ready(Err::<Page<u32>, _>(Error::from_kind(ErrorKind::InternalError)))
            },
            10,
        );
        assert!(it.next_page().await.unwrap().is_err());
        assert!(it.next_page().await.is_none());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_auto_paginate_stops_on_short_page() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let seen = offsets.clone();
        let items: Vec<u32> = auto_paginate(
            move |offset, limit| {
                seen.lock().unwrap().push(offset);
                let end = (offset + limit).min(5);
                futures::future::ready(Ok((offset..end).collect::<Vec<u32>>()))
            },
            2,
        )
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_auto_paginate_stops_on_empty_page() {
        let items: Vec<u32> = auto_paginate(
            |offset, _| futures::future::ready(Ok(if offset == 0 { vec![1, 2] } else { vec![] })),
            2,
        )
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_auto_paginate_surfaces_error_then_ends() {
        let results: Vec<Result<u32>> = auto_paginate(
            |_, _| futures::future::ready(Err::<Vec<u32>, _>(Error::from_kind(ErrorKind::Timeout))),
            2,
        )
        .collect()
        .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().kind, ErrorKind::Timeout);
    }

    fn listing(total: u32, offsets: Arc<Mutex<Vec<u32>>>) -> impl FnMut(u32, u32) -> futures::future::Ready<Result<Vec<u32>>> {
        move |offset, limit| {
            offsets.lock().unwrap().push(offset);
            let end = (offset + limit).min(total);
            futures::future::ready(Ok((offset..end).collect()))
        }
    }

    #[tokio::test]
    async fn test_batch_read_drains_until_short_page() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let pages = Arc::new(Mutex::new(Vec::new()));
        let p = pages.clone();
        let options = ReadOptions::new()
            .with_page_size(4)
            .on_page(move |n, so_far| p.lock().unwrap().push((n, so_far)));

        let all = batch_read(listing(10, offsets.clone()), &options).await.unwrap();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(*offsets.lock().unwrap(), vec![0, 4, 8]);
        assert_eq!(*pages.lock().unwrap(), vec![(1, 4), (2, 8), (3, 10)]);
    }

    #[tokio::test]
    async fn test_batch_read_respects_max_pages() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let options = ReadOptions::new().with_page_size(2).with_max_pages(2);
        let all = batch_read(listing(100, offsets.clone()), &options).await.unwrap();
        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 2]);

        let none = batch_read(listing(100, offsets.clone()), &ReadOptions::new().with_max_pages(0))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_batch_read_stops_on_empty_page_and_errors() {
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let all = batch_read(listing(4, offsets.clone()), &ReadOptions::new().with_page_size(2))
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 2, 4]);

        let err = batch_read(
            |_, _| futures::future::ready(Err::<Vec<u32>, _>(Error::from_kind(ErrorKind::Timeout))),
            &ReadOptions::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_cursor_codec() {
        let c = OffsetCursor { offset: 100, limit: 50 };
        let encoded = encode_cursor(&c).unwrap();
        assert_eq!(decode_cursor::<OffsetCursor>(&encoded).unwrap(), c);
        assert_eq!(Cursor::Offset(c).encode().unwrap(), encoded);
        assert_eq!(Cursor::Token("abc".into()).encode().unwrap(), "abc");

        let err = decode_cursor::<OffsetCursor>("%%%not-base64").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(err.message, "Invalid cursor format");
        let not_json = STANDARD.encode("hello");
        assert!(decode_cursor::<OffsetCursor>(&not_json).is_err());
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::from_page(10, 10, 20, Some(95)).unwrap();
        assert!(meta.has_more);
        let next: OffsetCursor = decode_cursor(meta.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(next, OffsetCursor { offset: 30, limit: 10 });
        let prev: OffsetCursor = decode_cursor(meta.prev_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(prev, OffsetCursor { offset: 10, limit: 10 });

        let last = PaginationMeta::from_page(3, 10, 0, None).unwrap();
        assert!(!last.has_more);
        assert!(last.next_cursor.is_none() && last.prev_cursor.is_none());
    }

    #[test]
    fn test_parse_pagination_params() {
        let p = parse_pagination_params(&PaginationParams::default()).unwrap();
        assert_eq!(p, OffsetCursor { offset: 0, limit: DEFAULT_PAGE_LIMIT });

        let cursor = encode_cursor(&OffsetCursor { offset: 40, limit: 20 }).unwrap();
        let p = parse_pagination_params(&PaginationParams {
            limit: Some(5),
            offset: Some(1),
            cursor: Some(cursor),
        })
        .unwrap();
        assert_eq!(p, OffsetCursor { offset: 40, limit: 20 });

        let p = parse_pagination_params(&PaginationParams { limit: Some(5), offset: Some(1), cursor: None }).unwrap();
        assert_eq!(p, OffsetCursor { offset: 1, limit: 5 });
    }
}
