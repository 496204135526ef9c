/// Read-through caching for external lookups
///
/// Evaluates to the cached value on a hit. On a miss the future is awaited,
/// its error propagated with `?`, and its value queued for a background write
/// using the key's TTL. A failed cache read counts as a miss.
///
/// ```rust,ignore
/// async fn list_items(&self, playlist_id: &str) -> AppResult<Vec<String>> {
///     cached!(
///         self.cache,
///         CacheKey::PlaylistItems(playlist_id.to_string()),
///         async move { self.request_playlist_items(playlist_id).await }
///     )
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $fetch:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(hit)) => Ok(hit),
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, fetching upstream");
                }
                let value = $fetch.await?;
                $cache.set_in_background(&key, &value);
                Ok(value)
            }
        }
    }};
}
