/// Read-through caching for catalog calls.
///
/// Looks up `$key` in `$cache`; on a hit the decoded value is returned. On a miss the
/// future `$block` is awaited, its value queued for a background write with `$ttl`
/// seconds to live, and returned. Errors from `$block` propagate and are never cached.
///
/// The enclosing function must return `AppResult<_>` and `$cache` must expose
/// `get_from_cache` and `set_in_background`.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::SeasonMeta(tmdb_id), SEASON_CACHE_TTL, async move {
///     self.fetch_details(tmdb_id).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
