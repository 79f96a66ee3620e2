//! Lazy pagination over window queries

use futures::stream::{self, Stream};
use unical_domain::{Account, Result, TimeWindow};

use crate::calendar_ports::{RemoteEventSource, WindowPage};

/// Pages of a window query as a lazy stream.
///
/// Page N+1 is requested only after page N has been yielded and its
/// continuation is known. The stream ends after the first page without a
/// continuation, or after the first error.
pub fn window_pages<'a>(
    source: &'a dyn RemoteEventSource,
    account: &'a Account,
    window: &'a TimeWindow,
) -> impl Stream<Item = Result<WindowPage>> + Send + 'a {
    // `None` = exhausted, `Some(None)` = first page, `Some(Some(t))` = continuation.
    stream::try_unfold(Some(None::<String>), move |cursor| async move {
        let Some(page_token) = cursor else {
            return Ok(None);
        };
        let page = source.fetch_window_page(account, window, page_token.as_deref()).await?;
        let next = page.next_page.clone().map(Some);
        Ok(Some((page, next)))
    })
}
