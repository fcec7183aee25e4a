// @file: extraction_engine/src/core/paginator.rs
// @description: Walks one symbol's history page by page until the exchange reports no more pages.
// @author: LAS.

use log::{debug, info, warn};
use tokio::time::sleep;
use crate::connectors::bitget::bitget_rest::MAX_PAGE_SIZE;
use crate::core::errors::FetchError;
use crate::core::interfaces::ExchangeHistoryClient;
use crate::core::models::{ApiEnvelope, FetchJob, Record, SymbolRecords};
use crate::core::page_shape::{detect_page_shape, Continuation};
use crate::core::retry::retry_with_backoff;


//
// PUBLIC INTERFACE
//

/// Exhaust one symbol's history for the job's window.
///
/// A failure after at least one good page keeps what was gathered and marks
/// the result as truncated. Only a failure before anything was gathered is
/// returned as `Err`.
pub async fn paginate_symbol(
    client: &dyn ExchangeHistoryClient,
    job: &FetchJob,
) -> Result<SymbolRecords, FetchError> {
    let settings = &job.pagination;
    // Must match the `limit` actually sent, or every full page looks short.
    let page_size: u32 = settings.page_size.clamp(1, MAX_PAGE_SIZE);

    let mut records: Vec<Record> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched: u32 = 0;
    let mut truncated: Option<String> = None;

    loop {
        // #1. Fetch one page, retrying transient failures
        let current_cursor: Option<&str> = cursor.as_deref();
        let fetched = retry_with_backoff(
            &settings.retry,
            |envelope: &ApiEnvelope| envelope.is_retriable(),
            || async move {
                let envelope = client
                    .fetch_page(job.kind, &job.symbol, &job.window, current_cursor, page_size)
                    .await;
                if envelope.is_success() { Ok(envelope) } else { Err(envelope) }
            },
        )
        .await;

        let envelope: ApiEnvelope = match fetched {
            Ok(envelope) => envelope,
            Err((envelope, attempts)) => {
                let error = if envelope.is_retriable() {
                    FetchError::Transport { attempts, msg: envelope.msg.clone() }
                } else {
                    FetchError::Api { code: envelope.code.clone(), msg: envelope.msg.clone() }
                };

                if pages_fetched == 0 {
                    return Err(error);
                }

                warn!(
                    "Pagination for {} stopped after {} page(s): {}",
                    job.symbol, pages_fetched, error
                );
                truncated = Some(error.to_string());
                break;
            }
        };
        pages_fetched += 1;

        // #2. Normalise the payload shape
        let shape = detect_page_shape(&envelope.data);
        let item_count: usize = shape.items.len();

        debug!(
            "Fetched page {} for {}: {} item(s), continuation={:?}",
            pages_fetched, job.symbol, item_count, shape.continuation
        );

        if item_count == 0 {
            break;
        }

        let last_id: Option<String> = shape
            .items
            .last()
            .cloned()
            .and_then(Record::from_value)
            .and_then(|r| r.logical_id(job.kind));

        // #3. Stamp and accumulate
        for item in shape.items {
            match Record::from_value(item) {
                Some(mut record) => {
                    record.stamp_symbol(&job.symbol);
                    records.push(record);
                }
                None => debug!("Skipping non-object item for {}", job.symbol),
            }
        }

        // #4. Decide whether another page exists
        if item_count < page_size as usize {
            break;
        }

        let next_cursor: Option<String> = match shape.continuation {
            Continuation::End => None,
            Continuation::Cursor(token) => Some(token),
            Continuation::FromLastItem => last_id,
        };

        let next_cursor = match next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => next,
            Some(next) => {
                warn!("Cursor {} for {} did not advance; stopping", next, job.symbol);
                break;
            }
            None => break,
        };

        if let Some(max_pages) = settings.max_pages {
            if pages_fetched >= max_pages {
                info!("Reached page cap ({}) for {}", max_pages, job.symbol);
                break;
            }
        }

        cursor = Some(next_cursor);

        // #5. Rate-limit courtesy; blocks only this symbol's task
        sleep(settings.inter_page_delay).await;
    }

    info!(
        "Collected {} {} record(s) for {} across {} page(s)",
        records.len(), job.kind, job.symbol, pages_fetched
    );

    Ok(SymbolRecords {
        symbol: job.symbol.clone(),
        records,
        pages_fetched,
        truncated,
    })
}
