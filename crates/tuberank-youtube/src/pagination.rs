//! Multi-page video collection.

use std::collections::HashMap;

use tracing::{debug, warn};

use tuberank_models::Video;

use crate::client::YouTubeClient;
use crate::error::YouTubeResult;

/// Walk a channel's video listing, carrying the continuation token
/// forward until the token is exhausted or `max_pages` is reached.
///
/// Each page's IDs are cross-referenced against a detail fetch (the list
/// endpoint carries no statistics). IDs that fail to resolve a detail
/// match are dropped and logged rather than aborting the page: losing one
/// item beats losing the whole page.
pub async fn collect_videos(
    client: &YouTubeClient,
    channel_id: &str,
    max_pages: u32,
) -> YouTubeResult<Vec<Video>> {
    let mut videos = Vec::new();
    let mut page_token: Option<String> = None;

    for page in 0..max_pages {
        let listing = client.list_videos(channel_id, page_token.as_deref()).await?;
        if listing.video_ids.is_empty() {
            debug!(channel_id, page, "Listing returned no items, stopping");
            break;
        }

        let details = client.get_video_details(&listing.video_ids).await?;
        let mut by_id: HashMap<String, Video> = details
            .into_iter()
            .map(|v| (v.video_id.clone(), v))
            .collect();

        let mut dropped = 0usize;
        for id in &listing.video_ids {
            match by_id.remove(id) {
                Some(video) => videos.push(video),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                channel_id,
                page, dropped, "Dropped listing items without a detail match"
            );
        }

        page_token = listing.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    Ok(videos)
}
