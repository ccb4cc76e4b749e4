use actix_files::{Files, NamedFile};
use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::PredictError;
use crate::inference::Predictor;
use crate::models::{ApiResponse, ApplicantInput, PredictionResult};

const JSON_LIMIT: usize = 1024 * 1024;

/// Directory holding `index.html` and the form assets.
#[derive(Debug, Clone)]
pub struct StaticDir(pub PathBuf);

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success("API de scoring crédit"))
}

pub async fn model_info(predictor: web::Data<Predictor>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(predictor.model_info()))
}

pub async fn predict(
    predictor: web::Data<Predictor>,
    req: web::Json<ApplicantInput>,
) -> HttpResponse {
    let start_time = Instant::now();
    let input = clamp_logged(req.into_inner());

    let predictor = predictor.get_ref().clone();
    let model_version = predictor.model_version().to_string();

    match web::block(move || predictor.assess(&input)).await {
        Ok(Ok(assessment)) => {
            info!(
                "Prédiction réussie: probabilité={:.3} niveau={:?}",
                assessment.probability.value(),
                assessment.tier
            );
            let result = PredictionResult::new(assessment, &model_version);
            HttpResponse::Ok().json(ApiResponse::success(result).timed(start_time))
        }
        Ok(Err(e)) => {
            error!("Erreur de prédiction: {}", e);
            failure::<PredictionResult>(&e, start_time)
        }
        Err(e) => {
            error!("Erreur d'exécution bloquante: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<PredictionResult>::error("Erreur d'exécution").timed(start_time))
        }
    }
}

pub async fn batch_predict(
    predictor: web::Data<Predictor>,
    req: web::Json<Vec<ApplicantInput>>,
) -> HttpResponse {
    let start_time = Instant::now();
    info!("Nouvelle requête de batch prediction: {} demandeurs", req.len());

    let inputs: Vec<ApplicantInput> = req.into_inner().into_iter().map(clamp_logged).collect();
    let predictor = predictor.get_ref().clone();
    let model_version = predictor.model_version().to_string();

    match web::block(move || predictor.assess_batch(&inputs)).await {
        Ok(Ok(assessments)) => {
            info!("Batch prédiction réussie: {} résultats", assessments.len());
            let results: Vec<PredictionResult> = assessments
                .into_iter()
                .map(|assessment| PredictionResult::new(assessment, &model_version))
                .collect();
            HttpResponse::Ok().json(ApiResponse::success(results).timed(start_time))
        }
        Ok(Err(e)) => {
            error!("Erreur batch prédiction: {}", e);
            failure::<Vec<PredictionResult>>(&e, start_time)
        }
        Err(e) => {
            error!("Erreur d'exécution bloquante batch: {}", e);
            HttpResponse::InternalServerError().json(
                ApiResponse::<Vec<PredictionResult>>::error("Erreur d'exécution").timed(start_time),
            )
        }
    }
}

fn clamp_logged(raw: ApplicantInput) -> ApplicantInput {
    let input = raw.clamped();
    if input != raw {
        warn!("Entrée hors domaine ramenée dans les bornes: {:?}", raw);
    }
    input
}

fn failure<T: serde::Serialize>(e: &PredictError, start_time: Instant) -> HttpResponse {
    let response = ApiResponse::<T>::error(&e.to_string()).timed(start_time);
    match e {
        PredictError::EmptyBatch => HttpResponse::BadRequest().json(response),
        PredictError::Scoring(_) => HttpResponse::InternalServerError().json(response),
    }
}

// Formulaire
pub async fn index(req: HttpRequest, static_dir: web::Data<StaticDir>) -> impl Responder {
    match NamedFile::open_async(static_dir.0.join("index.html")).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("Erreur chargement interface: {}", e);
            HttpResponse::InternalServerError().body("Erreur chargement interface")
        }
    }
}

/// Malformed bodies and unknown categories answer 400 in the usual envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let message = format!("Requête invalide: {}", err);
            warn!("{}", message);
            let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error(&message));
            InternalError::from_response(err, response).into()
        })
}

pub fn configure(cfg: &mut web::ServiceConfig, static_dir: &Path) {
    cfg.app_data(json_config())
        .app_data(web::Data::new(StaticDir(static_dir.to_path_buf())))
        .route("/api/health", web::get().to(health_check))
        .route("/api/model-info", web::get().to(model_info))
        .route("/api/predict", web::post().to(predict))
        .route("/api/batch-predict", web::post().to(batch_predict))
        .route("/", web::get().to(index))
        .service(Files::new("/static", static_dir).prefer_utf8(true))
        .default_service(web::route().to(|| async {
            HttpResponse::NotFound().json(ApiResponse::<String>::error("Endpoint non trouvé"))
        }));
}
