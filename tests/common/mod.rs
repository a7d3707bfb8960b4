#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use local_commerce_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{sea_orm_active_enums::Role, users},
    middleware::{auth::AuthUser, form::FormData},
    services::{
        auth_service::hash_password,
        category_service, product_service,
        media::DisabledImageHost,
        notifications::{LogMailer, Notifier},
    },
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "secret123";

/// Fresh in-memory database with the schema applied.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let database_url = "sqlite::memory:";
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let config = AppConfig::for_database(database_url, TEST_SECRET);
    let (notifier, _worker) = Notifier::spawn(Arc::new(LogMailer));
    Ok(AppState::new(
        orm,
        config,
        Arc::new(DisabledImageHost),
        notifier,
    ))
}

pub async fn create_user(state: &AppState, email: &str, role: Role) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(TEST_PASSWORD)?),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        role: Set(role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_category(state: &AppState, admin: &AuthUser, name: &str) -> anyhow::Result<Uuid> {
    let resp = category_service::create_category(
        state,
        admin,
        FormData::from_pairs([("name", name)]),
    )
    .await?;
    Ok(resp.data.expect("category").id)
}

pub async fn create_product(
    state: &AppState,
    owner: &AuthUser,
    category_id: Uuid,
    name: &str,
    price: f64,
) -> anyhow::Result<Uuid> {
    let form = FormData::from_pairs([
        ("name".to_string(), name.to_string()),
        ("price".to_string(), price.to_string()),
        ("categoryId".to_string(), category_id.to_string()),
        ("seller".to_string(), "Local Seller".to_string()),
        ("location".to_string(), "Kigali".to_string()),
        ("stock".to_string(), "10".to_string()),
    ]);
    let resp = product_service::create_product(state, owner, form).await?;
    Ok(resp.data.expect("product").id)
}
