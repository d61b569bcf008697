use crate::config::AppConfig;
use crate::deleter::DeletionHandler;
use crate::error::AppError;
use crate::indexer::IndexingHandler;
use crate::labels::LabelOracle;
use crate::notification::StorageEvent;
use crate::photo_search::{extract_search_key, SearchHandler, SEARCH_KEY_HEADER};
use crate::search::SearchTransport;
use crate::storage::ObjectStore;
use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub indexer: IndexingHandler,
    pub deleter: DeletionHandler,
    pub searcher: SearchHandler,
    pub invocation_timeout: Duration,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        search: Arc<dyn SearchTransport>,
        store: Arc<dyn ObjectStore>,
        oracle: Arc<dyn LabelOracle>,
    ) -> Self {
        Self {
            indexer: IndexingHandler::new(
                store.clone(),
                oracle,
                search.clone(),
                config.index.clone(),
            ),
            deleter: DeletionHandler::new(search.clone(), config.index.clone()),
            searcher: SearchHandler::new(
                search,
                store,
                config.index.clone(),
                config.search_size,
                config.url_expiry(),
            ),
            invocation_timeout: config.invocation_timeout(),
        }
    }
}

/// Bounds a whole invocation; records not reached before the deadline are not processed.
async fn with_deadline<T, F>(deadline: Duration, invocation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(deadline, invocation)
        .await
        .map_err(|_| AppError::Timeout(deadline))?
}

async fn search_pictures(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let header = req
        .headers()
        .get(SEARCH_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let label = extract_search_key(header, &body)?;

    let hits = state.searcher.search(&label).await.map_err(|e| {
        log::error!("Search for '{}' failed: {}", label, e);
        e
    })?;
    Ok(HttpResponse::Ok().json(hits))
}

async fn object_created(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let event = StorageEvent::from_slice(&body)?;
    let report = with_deadline(state.invocation_timeout, async {
        Ok(state.indexer.handle(&event).await)
    })
    .await
    .map_err(|e| {
        log::error!("Indexing invocation failed: {}", e);
        e
    })?;
    Ok(HttpResponse::Ok().json(report))
}

async fn object_removed(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let event = StorageEvent::from_slice(&body)?;
    let report = with_deadline(state.invocation_timeout, state.deleter.handle(&event))
        .await
        .map_err(|e| {
            log::error!("Deletion invocation failed: {}", e);
            e
        })?;
    Ok(HttpResponse::Ok().json(report))
}

async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Browser clients call search from any origin.
fn search_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/picture/search")
            .wrap(search_cors())
            .route(web::post().to(search_pictures)),
    )
        .service(web::resource("/events/object-created").route(web::post().to(object_created)))
        .service(web::resource("/events/object-removed").route(web::post().to(object_removed)))
        .service(web::resource("/healthz").route(web::get().to(healthz)));
}

pub async fn start_web_server(config: &AppConfig, state: AppState) -> Result<(), AppError> {
    let port = config.web_port;
    let state = web::Data::new(state);

    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(format!("0.0.0.0:{}", port))?
        .run()
        .await?;
    Ok(())
}
