//! Account route handlers.
//!
//! The profile comes from the session; the favorite-farms panel comes from
//! the API and degrades to a notice when it fails, never blocking the page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::types::Favorite;
use crate::filters;
use crate::middleware::{RequireAuth, expire_auth};
use crate::state::AppState;

/// User display data for templates.
#[derive(Clone)]
pub struct UserView {
    pub email: String,
    pub name: Option<String>,
    pub is_farmer: bool,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub user: UserView,
    pub favorites: Vec<Favorite>,
    pub favorites_error: Option<String>,
}

/// Display the account page.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Response {
    let user = auth.user.as_ref().map_or_else(
        || UserView {
            email: String::new(),
            name: None,
            is_farmer: false,
        },
        |u| UserView {
            email: u.email.clone(),
            name: u.name.clone(),
            is_farmer: u.is_farmer(),
        },
    );

    let (favorites, favorites_error) = match state.api().list_favorites(&auth.access_token).await {
        Ok(favorites) => (favorites, None),
        Err(e) if e.is_unauthorized() => {
            expire_auth(&session).await;
            return crate::error::AppError::from(e).into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load favorites for account page");
            (Vec::new(), Some(e.user_message()))
        }
    };

    AccountTemplate {
        user,
        favorites,
        favorites_error,
    }
    .into_response()
}
