//! HTTP surface for the council transparency site. Every handler is a thin
//! adapter over a `council_core` operation; the caller comes from a bearer
//! session token.

use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, patch, post},
};
use council_core::config::AppConfig;
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod error;
pub mod routes;
pub mod state;

use routes::*;
pub use state::{AppState, Caller};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/questions", get(list_questions_handler).post(create_question_handler))
        .route("/questions/search", get(search_questions_handler))
        .route("/questions/paginated", get(paginated_questions_handler))
        .route("/questions/top-liked", get(top_liked_handler))
        .route(
            "/questions/{id}",
            get(question_detail_handler)
                .patch(update_question_handler)
                .delete(delete_question_handler),
        )
        .route("/questions/{id}/like", post(toggle_like_handler))
        .route("/questions/{id}/responses", post(create_response_handler))
        .route("/responses/{id}", delete(delete_response_handler))
        .route("/members", get(list_members_handler).post(create_member_handler))
        .route("/members/{id}", get(member_detail_handler).patch(update_member_handler))
        .route("/rankings", get(rankings_handler))
        .route("/news", get(list_news_handler).post(create_news_handler))
        .route("/news/recent", get(recent_news_handler))
        .route(
            "/news/{id}",
            get(news_detail_handler)
                .patch(update_news_handler)
                .delete(delete_news_handler),
        )
        .route("/admin/news", get(admin_news_handler))
        .route("/slides", get(list_slides_handler).post(create_slide_handler))
        .route("/slides/{id}", patch(update_slide_handler).delete(delete_slide_handler))
        .route("/faqs", get(list_faqs_handler).post(create_faq_handler))
        .route("/faqs/{id}", patch(update_faq_handler).delete(delete_faq_handler))
        .route("/contact", post(submit_contact_handler))
        .route("/admin/contact", get(contact_inbox_handler))
        .route("/admin/contact/{id}", patch(contact_status_handler))
        .route("/uploads", post(upload_url_handler))
        .route("/admin/grants", post(grant_admin_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    info!("Initializing state...");
    let address = config.bind_address();
    let state = AppState::open(config)?;

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            tracing::error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(%err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
