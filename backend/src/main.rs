use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::{error, info};

use credit_risk::config::AppConfig;
use credit_risk::inference::Predictor;
use credit_risk::routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Démarrage de l'API de Scoring du Risque de Crédit");

    let config = AppConfig::from_env();

    // Sans modèle le service ne peut rien faire: on s'arrête.
    let predictor = match Predictor::from_artifact(&config.model_path) {
        Ok(predictor) => {
            let info = predictor.model_info();
            info!("✅ Modèle {} chargé: {} (version {})", info.kind, info.artifact, info.version);
            predictor
        }
        Err(e) => {
            error!("❌ {}", e);
            return Err(e).context("Impossible de charger le modèle");
        }
    };

    let predictor_data = web::Data::new(predictor);
    let bind_address = config.bind_address();

    info!("🌐 Serveur démarré sur: http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("📊 Formulaire disponible sur: http://{}/", bind_address);
    info!("🔧 Endpoints API:");
    info!("   GET  /api/health         - Vérification santé");
    info!("   GET  /api/model-info     - Information modèle");
    info!("   POST /api/predict        - Prédiction simple");
    info!("   POST /api/batch-predict  - Prédiction multiple");

    let static_dir = config.static_dir.clone();
    let cors_origin = config.cors_origin.clone();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(predictor_data.clone())
            .configure(|cfg| routes::configure(cfg, &static_dir))
    })
    .workers(config.workers)
    .bind(&bind_address)
    .with_context(|| format!("Impossible d'écouter sur {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
