use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use local_commerce_api::{
    app::build_app,
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    services::{
        media::{CloudinaryHost, DisabledImageHost, ImageHost},
        notifications::{LogMailer, Mailer, Notifier, SmtpMailer},
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,local_commerce_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let media: Arc<dyn ImageHost> = match config.cloudinary.clone() {
        Some(cloudinary) => Arc::new(CloudinaryHost::new(cloudinary)),
        None => {
            tracing::warn!("image host not configured, uploads will be skipped");
            Arc::new(DisabledImageHost)
        }
    };
    let mailer: Arc<dyn Mailer> = match config.smtp.as_ref() {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("smtp not configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (notifier, _email_worker) = Notifier::spawn(mailer);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let app = build_app(AppState::new(orm, config, media, notifier));

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
