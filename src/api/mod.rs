//! HTTP request handlers
//!
//! The transport surface over the lifecycle services. Authorization outcomes
//! map onto distinct statuses: 404 for absent documents, 403 for a wrong
//! modification secret, 413 for oversized uploads. Handlers return explicit
//! responses; services never signal through exceptions.

use actix_web::error::ErrorInternalServerError;
use actix_web::http::header;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, error, warn};
use serde_json::json;

use crate::app_state::AppState;

/// Configure all routes on an actix application
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/documents", web::post().to(create_document))
        .route("/documents", web::get().to(list_documents))
        .route("/documents/{document_id}", web::delete().to(delete_document))
        .route(
            "/documents/{document_id}/images",
            web::post().to(upload_image),
        )
        .route("/images/{image_id}", web::get().to(get_image))
        .route("/images/{image_id}", web::delete().to(delete_image));
}

/// The raw Authorization header carries the modification secret.
fn modification_secret(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// External identity from the signed cookie; anonymous on any failure.
fn caller_identity(req: &HttpRequest, state: &AppState) -> Option<String> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    state.identity.extract(cookie_header)
}

/// Outcome of checking a modification secret against a document.
enum Authorization {
    Authorized,
    NotFound,
    Forbidden,
}

fn authorize_document(
    state: &AppState,
    document_id: &str,
    secret: Option<&str>,
) -> Result<Authorization, Error> {
    let projection = state
        .documents
        .fetch_for_access_check(document_id)
        .map_err(ErrorInternalServerError)?;
    match projection {
        None => Ok(Authorization::NotFound),
        Some(projection) => match secret {
            Some(supplied) if projection.modification_secret == supplied => {
                Ok(Authorization::Authorized)
            }
            _ => {
                warn!("Rejected wrong modification secret for {}", document_id);
                Ok(Authorization::Forbidden)
            }
        },
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

async fn create_document(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let owner = caller_identity(&req, &state);
    debug!("Creating new document");
    let document = state.documents.create(owner.as_deref()).map_err(|e| {
        error!("Failed to create document: {}", e);
        ErrorInternalServerError(e)
    })?;
    Ok(HttpResponse::Ok().json(document))
}

async fn list_documents(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let owner = caller_identity(&req, &state);
    if let Some(owner) = &owner {
        debug!("Fetching documents for owner {}", owner);
    }
    let documents = state
        .documents
        .list_by_owner(owner.as_deref())
        .map_err(|e| {
            error!("Failed to list documents: {}", e);
            ErrorInternalServerError(e)
        })?;
    Ok(HttpResponse::Ok().json(documents))
}

async fn delete_document(
    path: web::Path<String>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let document_id = path.into_inner();
    log_mdc::insert("document_id", &document_id);
    let secret = modification_secret(&req);

    match authorize_document(&state, &document_id, secret.as_deref())? {
        Authorization::NotFound => Ok(HttpResponse::NotFound().finish()),
        Authorization::Forbidden => {
            Ok(HttpResponse::Forbidden().body("Invalid modification secret"))
        }
        Authorization::Authorized => {
            let deleted = state
                .documents
                .delete_by_id(&document_id)
                .map_err(ErrorInternalServerError)?;
            if deleted {
                Ok(HttpResponse::Ok().finish())
            } else {
                // lost a race with the retention sweep
                Ok(HttpResponse::NotFound().finish())
            }
        }
    }
}

async fn upload_image(
    path: web::Path<String>,
    mut payload: web::Payload,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let document_id = path.into_inner();
    log_mdc::insert("document_id", &document_id);
    let secret = modification_secret(&req);

    match authorize_document(&state, &document_id, secret.as_deref())? {
        Authorization::NotFound => return Ok(HttpResponse::NotFound().finish()),
        Authorization::Forbidden => {
            return Ok(HttpResponse::Forbidden().body("Invalid modification secret"))
        }
        Authorization::Authorized => {}
    }

    let max_size = state.config.upload.max_image_size_bytes;
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ErrorInternalServerError)?;
        if bytes.len() + chunk.len() > max_size {
            warn!(
                "Rejected oversized image upload for {} (limit {} bytes)",
                document_id, max_size
            );
            return Ok(HttpResponse::PayloadTooLarge()
                .json(json!({ "error": "File size exceeds maximum allowed size" })));
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Ok(HttpResponse::BadRequest().body("No data was uploaded"));
    }

    let mimetype = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let original_filename = req
        .headers()
        .get("X-Original-Filename")
        .and_then(|value| value.to_str().ok());

    let image = state
        .images
        .create(&document_id, &mimetype, original_filename)
        .map_err(ErrorInternalServerError)?;
    let Some(image) = image else {
        // document vanished between the authorization check and the insert
        return Ok(HttpResponse::NotFound().finish());
    };

    if let Err(e) = state.blobs.put_blob(&image.id, &bytes) {
        error!("Failed to store blob for image {}: {}", image.id, e);
        // roll the metadata row back so no record points at missing bytes
        if let Err(e) = state.images.delete(&image.id) {
            warn!("Failed to remove image record {}: {}", image.id, e);
        }
        return Err(ErrorInternalServerError(e));
    }

    Ok(HttpResponse::Ok().json(json!({
        "image": image,
        "imageUrl": format!("images/{}", image.id),
    })))
}

async fn get_image(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image_id = path.into_inner();
    let image = state
        .images
        .fetch(&image_id)
        .map_err(ErrorInternalServerError)?;
    let Some(image) = image else {
        return Ok(HttpResponse::NotFound().finish());
    };

    let data = state
        .blobs
        .get_blob(&image.id)
        .map_err(ErrorInternalServerError)?;
    match data {
        Some(data) => Ok(HttpResponse::Ok()
            .content_type(image.mimetype.clone())
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("inline; filename={}", image.name),
            ))
            .body(data)),
        None => {
            warn!("Image {} has a metadata row but no blob", image.id);
            Ok(HttpResponse::NotFound().finish())
        }
    }
}

async fn delete_image(
    path: web::Path<String>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let image_id = path.into_inner();
    let secret = modification_secret(&req);

    let image = state
        .images
        .fetch(&image_id)
        .map_err(ErrorInternalServerError)?;
    let Some(image) = image else {
        return Ok(HttpResponse::NotFound().finish());
    };

    // image deletion authorizes against the owning document's secret
    match authorize_document(&state, &image.document_id, secret.as_deref())? {
        Authorization::NotFound => return Ok(HttpResponse::NotFound().finish()),
        Authorization::Forbidden => {
            return Ok(HttpResponse::Forbidden().body("Invalid modification secret"))
        }
        Authorization::Authorized => {}
    }

    let removed = state
        .images
        .delete(&image_id)
        .map_err(ErrorInternalServerError)?;
    if removed.is_none() {
        return Ok(HttpResponse::NotFound().finish());
    }
    if let Err(e) = state.blobs.delete_blob(&image_id) {
        warn!("Failed to delete blob for image {}: {}", image_id, e);
    }
    Ok(HttpResponse::NoContent().finish())
}
