use chrono::Utc;
use local_commerce_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{Categories, Users, categories, sea_orm_active_enums::Role, users},
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin123", "Admin", Role::Admin).await?;
    let owner_id = ensure_user(
        &orm,
        "owner@example.com",
        "owner123",
        "Shop Owner",
        Role::BusinessOwner,
    )
    .await?;
    let customer_id =
        ensure_user(&orm, "customer@example.com", "customer123", "Customer", Role::Customer)
            .await?;
    seed_categories(&orm).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Business owner ID: {owner_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

/// Create the user, or bring an existing account's role back in line.
async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?;

    let user_id = match existing {
        Some(user) if user.role == role => user.id,
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.role = Set(role);
            active.updated_at = Set(Utc::now().into());
            active.update(orm).await?.id
        }
        None => {
            let password_hash =
                hash_password(password)?;
            let now = Utc::now();
            users::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                password_hash: Set(password_hash),
                name: Set(name.to_string()),
                role: Set(role),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(orm)
            .await?
            .id
        }
    };

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(user_id)
}

async fn seed_categories(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let categories = vec![
        ("Groceries", "Fresh produce and pantry staples"),
        ("Crafts", "Handmade goods from local artisans"),
        ("Fashion", "Clothing and accessories"),
        ("Electronics", "Phones, accessories and repairs"),
    ];

    for (name, description) in categories {
        let exists = Categories::find()
            .filter(categories::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let now = Utc::now();
        categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            image: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded categories");
    Ok(())
}
