//! Store page handlers: the combined product and farm listing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use greengate_core::FarmId;

use crate::api::types::{Farm, Product};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

/// Farm display data with its favorite state for the logged-in visitor.
#[derive(Clone)]
pub struct FarmView {
    pub farm: Farm,
    pub favorite: bool,
}

/// Store page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/index.html")]
pub struct StoreTemplate {
    pub products: Vec<Product>,
    pub farms: Vec<FarmView>,
    pub logged_in: bool,
    /// Render a degraded page instead of failing when the catalog is down.
    pub catalog_error: Option<String>,
}

/// Favorite toggle button fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub farm_id: FarmId,
    pub favorite: bool,
    pub error: Option<String>,
}

/// Display the store page.
///
/// Catalog failures degrade to an inline notice; favorites are only looked
/// up for logged-in visitors and a favorites failure never blocks the page.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, OptionalAuth(auth): OptionalAuth) -> Response {
    let (products, farms, catalog_error) = match load_catalog(&state).await {
        Ok((products, farms)) => (products, farms, None),
        Err(message) => (Vec::new(), Vec::new(), Some(message)),
    };

    let favorite_ids = match &auth {
        Some(auth) => match state.api().list_favorites(&auth.access_token).await {
            Ok(favorites) => favorites.into_iter().map(|f| f.farm_id).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load favorites for store page");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let farms = farms
        .into_iter()
        .map(|farm| FarmView {
            favorite: favorite_ids.contains(&farm.id),
            farm,
        })
        .collect();

    StoreTemplate {
        products,
        farms,
        logged_in: auth.is_some(),
        catalog_error,
    }
    .into_response()
}

async fn load_catalog(state: &AppState) -> Result<(Vec<Product>, Vec<Farm>), String> {
    let products = state
        .api()
        .list_products()
        .await
        .map_err(|e| e.user_message())?;
    let farms = state.api().list_farms().await.map_err(|e| e.user_message())?;
    Ok((products, farms))
}

/// Toggle a farm favorite (HTMX).
///
/// The button renders its new state on success and the old state with an
/// inline message on failure.
#[instrument(skip(state, auth))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<i64>,
) -> Response {
    let farm_id = FarmId::new(id);
    let token = &auth.access_token;

    // The favorite ID is needed for removal, so look the list up first.
    let existing = match state.api().list_favorites(token).await {
        Ok(favorites) => favorites.into_iter().find(|f| f.farm_id == farm_id),
        Err(e) => {
            return FavoriteButtonTemplate {
                farm_id,
                favorite: false,
                error: Some(e.user_message()),
            }
            .into_response();
        }
    };

    let result = match &existing {
        Some(favorite) => state.api().remove_favorite(token, favorite.id).await,
        None => state.api().add_favorite(token, farm_id).await,
    };

    match result {
        Ok(()) => FavoriteButtonTemplate {
            farm_id,
            favorite: existing.is_none(),
            error: None,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, %farm_id, "favorite toggle failed");
            FavoriteButtonTemplate {
                farm_id,
                favorite: existing.is_some(),
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}
