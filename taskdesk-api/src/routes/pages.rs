/// HTML page routes
///
/// Minimal shells for the dashboard, the task board, user management and
/// the login form. The pages themselves talk to `/api/*`; these handlers
/// only enforce who may open which page.

use crate::{
    app::AppState,
    middleware::session::{authenticate_headers, LOGIN_PATH},
};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use taskdesk_shared::auth::middleware::AuthContext;

fn shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | TaskDesk</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn greeting(auth: &AuthContext) -> String {
    format!(
        "<p data-role=\"{}\">Signed in as {}</p>",
        auth.role,
        escape(&auth.name)
    )
}

/// `GET /`: dashboard with per-status counters
pub async fn home(auth: AuthContext) -> Html<String> {
    shell(
        "Dashboard",
        &format!(
            "<h1>Dashboard</h1>\n{}\n<section id=\"summary\" data-source=\"/api/tasks/summary\"></section>",
            greeting(&auth)
        ),
    )
}

/// `GET /tasks`: the task board
pub async fn tasks(auth: AuthContext) -> Html<String> {
    shell(
        "Tasks",
        &format!(
            "<h1>Tasks</h1>\n{}\n<section id=\"tasks\" data-source=\"/api/tasks\"></section>",
            greeting(&auth)
        ),
    )
}

/// `GET /managements`: user administration, admins only
pub async fn managements(auth: AuthContext) -> Response {
    if !auth.is_admin() {
        return Redirect::to("/").into_response();
    }

    shell(
        "Management",
        &format!(
            "<h1>Management</h1>\n{}\n<section id=\"users\" data-source=\"/api/users\"></section>",
            greeting(&auth)
        ),
    )
    .into_response()
}

/// `GET /login`: the sign-in form, or back to `/` when already signed in
///
/// The form is a mount point: the page script posts its fields to
/// `data-endpoint` as JSON. Inputs carry no `name`, so a scriptless submit
/// sends nothing.
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if authenticate_headers(&headers, state.jwt_secret()).is_ok() {
        return Redirect::to("/").into_response();
    }

    shell(
        "Sign in",
        &format!(
            "<h1>Sign in</h1>\n<form id=\"login\" data-endpoint=\"/api/auth/login\" data-path=\"{LOGIN_PATH}\">\n\
             <input type=\"email\" id=\"email\" autocomplete=\"username\" required>\n\
             <input type=\"password\" id=\"password\" autocomplete=\"current-password\" required>\n\
             <button type=\"submit\">Sign in</button>\n</form>"
        ),
    )
    .into_response()
}
