//! OpenAPI document for the HTTP API, served at `/openapi.json` and rendered at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Bearer access token scheme referenced by the protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token returned by `/auth/login` or `/auth/refresh`:\n\n\
                            ```\nAuthorization: Bearer ACCESS_TOKEN\n```\n\n\
                            Access tokens are short lived; exchange the `refreshToken` cookie at \
                            `/auth/refresh` for a new one.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "warden", description = "Accounts, role-based access control and owned items"),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::auth::refresh,
        api::handlers::auth::logout,
        api::handlers::user::get_current_user,
        api::handlers::user::update_current_user,
        api::handlers::user::delete_current_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::items::create_item,
        api::handlers::items::list_items,
        api::handlers::items::list_user_items,
        api::handlers::items::get_item,
        api::handlers::items::update_item,
        api::handlers::items::delete_item,
    ),
    components(
        schemas(
            api::models::auth::SignupRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AccessTokenResponse,
            api::models::auth::SuccessResponse,
            api::models::users::Role,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::users::PublicUserResponse,
            api::models::users::UserView,
            api::models::items::ItemCreate,
            api::models::items::ItemUpdate,
            api::models::items::ItemResponse,
        )
    ),
    tags(
        (name = "auth", description = "Signup, login and token lifecycle"),
        (name = "user", description = "The caller's own account"),
        (name = "users", description = "Other accounts"),
        (name = "items", description = "User-owned items"),
    )
)]
pub struct ApiDoc;
