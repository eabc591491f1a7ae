use crate::{
    error::AppResult,
    models::ShowSummary,
    services::{catalog::ShowCatalog, genres::GenreTable},
};

/// Searches the catalog and resolves genre ids to names
///
/// Keeps HTTP routing apart from catalog access, as the enrichment path does.
pub async fn search_shows(
    catalog: &dyn ShowCatalog,
    genres: &GenreTable,
    query: &str,
) -> AppResult<Vec<ShowSummary>> {
    let mut shows = catalog.search_shows(query).await?;

    for show in &mut shows {
        show.genres = genres.names_for(&show.genre_ids).await;
    }

    Ok(shows)
}
