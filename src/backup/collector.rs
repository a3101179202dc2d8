use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::backup::{Category, FingerprintIndex, OwnerFilter, Source};
use crate::error::BackupError;
use crate::provider::{Page, Provider, RecordExt};

/// Walk a paginated listing from `first_url` and return every item, in the
/// order the API returned them.
pub async fn collect_pages(
    provider: &dyn Provider,
    first_url: &str,
    wrapper: Option<&str>,
) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    let mut url = Some(first_url.to_string());

    while let Some(current) = url.take() {
        let response = provider.get_json(&current).await?;
        let page = Page::from_response(response, wrapper)
            .with_context(|| format!("Unexpected page shape from {}", current))?;

        debug!(url = %current, items = page.items.len(), "Fetched page");

        if page.has_more() {
            url = page.next.clone();
        }
        items.extend(page.items);
    }

    Ok(items)
}

/// Fetch a playlist with every one of its track pages merged into
/// `tracks.items`.
pub async fn expand_playlist(provider: &dyn Provider, playlist_id: &str) -> Result<Value> {
    let mut playlist = provider
        .get_json(&format!("/playlists/{}", urlencoding::encode(playlist_id)))
        .await
        .with_context(|| format!("Failed to fetch playlist {}", playlist_id))?;

    if let Some(tracks) = playlist.get_mut("tracks") {
        let next = tracks
            .get("next")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(next) = next {
            let rest = collect_pages(provider, &next, None)
                .await
                .with_context(|| format!("Failed to fetch tracks of playlist {}", playlist_id))?;

            if let Some(items) = tracks.get_mut("items").and_then(Value::as_array_mut) {
                items.extend(rest);
            }
            tracks["next"] = Value::Null;
        }
    }

    Ok(playlist)
}

pub struct Collector<'a> {
    provider: &'a dyn Provider,
    user_id: String,
    page_limit: u32,
}

impl<'a> Collector<'a> {
    pub fn new(provider: &'a dyn Provider, user_id: String, page_limit: u32) -> Self {
        Self {
            provider,
            user_id,
            page_limit,
        }
    }

    /// Retrieve the complete collection for `category`.
    ///
    /// For playlist categories, playlists whose listing fingerprint matches an
    /// entry in `known` are returned as listing summaries without fetching
    /// their tracks; merging replaces them with the stored entry.
    pub async fn collect(
        &self,
        category: &Category,
        known: &FingerprintIndex,
    ) -> Result<Vec<Value>, BackupError> {
        let items = match category.source(self.page_limit) {
            Source::Listing { path, wrapper } => {
                collect_pages(self.provider, &path, wrapper).await
            }
            Source::Playlists(filter) => self.collect_playlists(filter, known).await,
        }
        .map_err(|e| BackupError::from_collect(category, e))?;

        info!(category = %category, items = items.len(), "Collected");
        Ok(items)
    }

    async fn collect_playlists(
        &self,
        filter: OwnerFilter,
        known: &FingerprintIndex,
    ) -> Result<Vec<Value>> {
        let listing = collect_pages(
            self.provider,
            &format!("/me/playlists?limit={}", self.page_limit),
            None,
        )
        .await?;

        let mut playlists = Vec::new();
        for summary in listing {
            if summary.is_null() {
                continue;
            }
            if filter == OwnerFilter::OwnedByUser && summary.owner_id() != Some(self.user_id.as_str()) {
                continue;
            }

            if known.is_unchanged(&summary) {
                debug!(playlist = ?summary.id(), "Playlist unchanged, skipping tracks");
                playlists.push(summary);
                continue;
            }

            let id = summary.id().context("Playlist listing entry has no id")?;
            playlists.push(expand_playlist(self.provider, id).await?);
        }

        Ok(playlists)
    }
}
