use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use listenfd::ListenFd;

use crate::config::Config;
use crate::podcast::Podcast;
use crate::web::services::{configure_app, AppData};

mod helpers;
mod services;

pub fn start(config: Config) -> Result<()> {
    let access_key = config
        .cleanup_key
        .clone()
        .context("CLEANUP_SECRET_KEY or a secrets file must be set to serve")?;

    let data = web::Data::new(AppData {
        access_key,
        feed_serving: config.feed_serving,
        podcast: Podcast::new(&config)?,
    });
    let content_dir = config.content_dir.clone();
    let port = config.port;

    actix_rt::System::new().block_on(async move {
        let mut listenfd = ListenFd::from_env();

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(data.clone())
                .configure(configure_app)
                .service(Files::new("/", content_dir.clone()))
        });

        server = if let Some(listener) = listenfd.take_tcp_listener(0)? {
            server.listen(listener)?
        } else {
            let addr = format!("127.0.0.1:{}", port);
            tracing::info!(%addr, "binding");
            server.bind(addr)?
        };

        server.run().await
    })?;

    Ok(())
}
