//! HTTP routes.
//!
//! POST endpoints answer with a flash object `{category, message, ...}`;
//! failures go through [`ApiError`].

use crate::auth::AuthError;
use crate::engine::EngineHandle;
use crate::error::{ApiError, Category};
use crate::files::{FileError, FileManager};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::Path as FsPath;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub files: FileManager,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    /// `data:<mime>;base64,<payload>` image.
    pub face_image: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub face_image: String,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/login") }))
        .route("/status", get(status))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/dashboard/{username}", get(dashboard))
        .route("/upload", post(upload))
        .route("/download/{*filename}", get(download))
        .route("/preview/{*filename}", get(preview))
        .route("/delete/{id}/{username}", post(delete))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

fn flash(category: Category, message: impl Into<String>) -> serde_json::Value {
    json!({ "category": category, "message": message.into() })
}

/// Run a store/filesystem operation off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FileError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Unwrap a JSON body, turning a rejected body into a flash response.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(form)| form)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn decode_image(data_uri: &str) -> Result<Vec<u8>, ApiError> {
    facelogin_core::decode_data_uri(data_uri)
        .map_err(|e| ApiError::Auth(AuthError::InvalidImage(e.to_string())))
}

async fn status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.files.store().clone();
    let users = blocking(move || Ok(store.count_users()?)).await?;
    Ok(Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "users": users,
        "match_threshold": state.engine.threshold(),
    })))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = json_body(payload)?;
    let image = decode_image(&form.face_image)?;
    let username = form.username.trim().to_string();
    state.engine.register(username.clone(), image).await?;

    let mut body = flash(Category::Success, "Registration successful!");
    body["username"] = json!(username);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = json_body(payload)?;
    let image = decode_image(&form.face_image)?;
    let username = state.engine.login(image).await?;

    let mut body = flash(Category::Success, format!("Welcome {username}!"));
    body["username"] = json!(username);
    Ok(Json(body))
}

async fn dashboard(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let files = state.files.clone();
    let owner = username.clone();
    let listed = blocking(move || files.list(&owner)).await?;
    Ok(Json(json!({ "username": username, "files": listed })))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut username: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("username") => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                username = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((file_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let username = username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Username is required.".into()))?;
    let (file_name, contents) = file.ok_or(ApiError::File(FileError::NoFileSelected))?;

    let files = state.files.clone();
    let record = blocking(move || files.upload(&username, &file_name, &contents)).await?;

    let mut body = flash(Category::Success, "File uploaded successfully!");
    body["file"] = json!(record);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn delete(
    State(state): State<AppState>,
    Path((id, username)): Path<(i64, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let files = state.files.clone();
    let record = blocking(move || files.delete(id, &username)).await?;

    let mut body = flash(Category::Success, "File deleted successfully.");
    body["id"] = json!(record.id);
    Ok(Json(body))
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_file(state, filename, true).await
}

async fn preview(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    serve_file(state, filename, false).await
}

async fn serve_file(state: AppState, filename: String, attachment: bool) -> Result<Response, ApiError> {
    let files = state.files.clone();
    let path = blocking(move || files.resolve(&filename)).await?;
    let contents = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::File(FileError::FileMissing),
        _ => ApiError::Internal(format!("reading {}: {e}", path.display())),
    })?;

    let stored_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");

    let (content_type, disposition) = if attachment {
        ("application/octet-stream".to_string(), content_disposition("attachment", stored_name))
    } else {
        (content_type_for(&path), content_disposition("inline", stored_name))
    };

    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response())
}

fn content_disposition(kind: &'static str, file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("{kind}; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static(kind))
}

/// Guess a preview content type from the file extension.
fn content_type_for(path: &FsPath) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "log" | "csv" | "md" => "text/plain; charset=utf-8".to_string(),
        "pdf" => "application/pdf".to_string(),
        "json" => "application/json".to_string(),
        _ => image::ImageFormat::from_extension(&ext)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}
