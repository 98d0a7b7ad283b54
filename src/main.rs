use actix_web::{middleware, web, App, HttpServer};
use log::info;

use doc_drive::api;
use doc_drive::app_state::AppState;
use doc_drive::service::gc_worker::GcWorker;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    log4rs::init_file("server_log.yaml", Default::default())
        .expect("Failed to initialize logging");
    let state = AppState::new();

    if state.config.retention.enabled {
        let worker = GcWorker::new(
            state.documents.clone(),
            state.store.clone(),
            &state.config.retention,
        );
        worker.start_background();
    }

    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let workers = state.config.server.workers;
    info!("Starting server on {}:{}", host, port);

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(api::configure)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}
