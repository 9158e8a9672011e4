use actix_multipart::{Multipart, MultipartError};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, warn};
use serde_json::json;
use shared::ErrorResponse;

use crate::inference::PredictionService;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

#[derive(Default)]
struct PredictForm {
    image: Option<Vec<u8>>,
    category: Option<String>,
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/"))
}

/// Collects the `image` file and the `category` field. The first occurrence
/// of each wins; an `image` part without a filename is not a file upload and
/// is ignored like any unknown field.
async fn read_form(mut payload: Multipart) -> Result<PredictForm, MultipartError> {
    let mut form = PredictForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().map(str::to_owned);
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            data.extend_from_slice(&chunk?);
        }

        match name.as_deref() {
            Some("image") if is_file && form.image.is_none() => form.image = Some(data),
            Some("category") if form.category.is_none() => {
                form.category = Some(String::from_utf8_lossy(&data).into_owned())
            }
            _ => {}
        }
    }
    Ok(form)
}

fn prediction_failed(detail: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse::prediction_failed(detail))
}

async fn handle_predict(
    req: HttpRequest,
    service: web::Data<PredictionService>,
    payload: Multipart,
) -> HttpResponse {
    // Anything other than a multipart body cannot carry an image field.
    if !is_multipart(&req) {
        warn!("Rejected prediction request without multipart body");
        return HttpResponse::BadRequest().json(ErrorResponse::no_image());
    }

    let form = match read_form(payload).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to read multipart body: {}", e);
            return prediction_failed(e.to_string());
        }
    };
    let image = form.image.unwrap_or_default();
    let category = form.category;

    let outcome = web::block(move || service.predict(category.as_deref(), &image)).await;

    match outcome {
        Ok(Ok(prediction)) => HttpResponse::Ok().json(prediction),
        Ok(Err(e)) if e.is_client_error() => {
            warn!("Rejected prediction request: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::no_image())
        }
        Ok(Err(e)) => {
            error!("Prediction failed: {}", e);
            prediction_failed(e.to_string())
        }
        Err(e) => {
            error!("Prediction task aborted: {}", e);
            prediction_failed(e.to_string())
        }
    }
}

async fn health(service: web::Data<PredictionService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model_loaded": service.model_loaded(),
    }))
}
