use std::io;

use actix_web::http::StatusCode;
use actix_web::{error, web, HttpResponse, Responder, Result as ActixResult};
use serde::Deserialize;
use serde_json::json;

use crate::config::FeedServing;
use crate::podcast::Podcast;
use crate::web::helpers::{feed_error, key_matches, xml_response, FEED_NOT_FOUND};

type Data = web::Data<AppData>;

pub struct AppData {
    pub access_key: String,
    pub feed_serving: FeedServing,
    pub podcast: Podcast,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

pub fn configure_app(config: &mut web::ServiceConfig) {
    use web::{get, post, resource as r};

    config
        .service(
            r("/api/cleanup-old-episodes")
                .route(get().to(cleanup_old_episodes))
                .route(post().to(cleanup_old_episodes)),
        )
        .service(r("/api/podcast-feed").route(get().to(get_podcast_feed)))
        .service(r("/api/generate-feed").route(post().to(post_generate_feed)));
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }))
}

async fn cleanup_old_episodes(
    data: Data,
    query: web::Query<KeyQuery>,
) -> ActixResult<impl Responder> {
    if !key_matches(query.key.as_deref(), &data.access_key) {
        tracing::warn!("cleanup rejected: invalid key");
        return Ok(unauthorized());
    }

    let app = data.clone();
    let report = web::block(move || app.podcast.cleanup())
        .await?
        .map_err(|err| {
            tracing::error!(error = %err, "cleanup failed");
            error::ErrorInternalServerError(err)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "Cleanup complete",
        "deleted": report.deleted,
        "remaining": report.remaining,
        "failed": report.failed,
    })))
}

async fn get_podcast_feed(data: Data) -> impl Responder {
    let app = data.clone();

    match data.feed_serving {
        FeedServing::Static => match web::block(move || app.podcast.cached_feed()).await {
            Ok(Ok(feed)) => xml_response(StatusCode::OK, feed),
            Ok(Err(err)) if err.kind() == io::ErrorKind::NotFound => {
                tracing::error!(path = %data.podcast.feed_path().display(), "feed file not found");
                xml_response(StatusCode::NOT_FOUND, FEED_NOT_FOUND.to_owned())
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "error serving podcast feed");
                feed_error()
            }
            Err(err) => {
                tracing::error!(error = %err, "error serving podcast feed");
                feed_error()
            }
        },
        FeedServing::Dynamic => match web::block(move || app.podcast.render_feed()).await {
            Ok(Ok(feed)) => xml_response(StatusCode::OK, feed),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "error generating podcast feed");
                feed_error()
            }
            Err(err) => {
                tracing::error!(error = %err, "error generating podcast feed");
                feed_error()
            }
        },
    }
}

async fn post_generate_feed(
    data: Data,
    query: web::Query<KeyQuery>,
) -> ActixResult<impl Responder> {
    if !key_matches(query.key.as_deref(), &data.access_key) {
        tracing::warn!("feed generation rejected: invalid key");
        return Ok(unauthorized());
    }

    let app = data.clone();
    let summary = web::block(move || app.podcast.write_feed())
        .await?
        .map_err(|err| {
            tracing::error!(error = %err, "feed generation failed");
            error::ErrorInternalServerError(err)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "Feed generated",
        "episodes": summary.episodes,
    })))
}
