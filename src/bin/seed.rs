use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;
use warehouse_api::{
    audit,
    config::AppConfig,
    db::{OrmConn, run_migrations},
    entity::{
        products::{self, ProductNotes},
        users,
    },
    models::{HistoryType, NewHistoryEntry, ProductNote, UserGroup},
    services::auth_service::hash_password,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    run_migrations(&state.orm).await?;

    let username = std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    let admin = ensure_admin(&state.orm, &username, &password).await?;
    seed_products(&state.orm, &admin).await?;

    println!("Seed completed. Admin ID: {}", admin.id);
    Ok(())
}

async fn ensure_admin(
    conn: &OrmConn,
    username: &str,
    password: &str,
) -> anyhow::Result<users::Model> {
    if let Some(existing) = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(conn)
        .await?
    {
        println!("Admin {username} already present");
        return Ok(existing);
    }

    let now = Utc::now();
    let admin = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(Some(username.to_string())),
        first_name: Set("Admin".into()),
        last_name: Set("Magazynu".into()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set(Some(hash_password(password)?)),
        group: Set(UserGroup::Admin),
        active: Set(true),
        approved: Set(true),
        approved_by: Set(None),
        approved_at: Set(Some(now)),
        last_active: Set(None),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    println!("Created admin {username}");
    Ok(admin)
}

async fn seed_products(conn: &OrmConn, admin: &users::Model) -> anyhow::Result<()> {
    if products::Entity::find().count(conn).await? > 0 {
        println!("Products already seeded");
        return Ok(());
    }

    let actor = admin.actor();
    let now = Utc::now();
    let items = [
        ("Magazyn A", "Paleta EUR", 120, 45.0, None),
        ("Magazyn A", "Folia stretch", 8, 19.99, Some("Zamówić przed końcem miesiąca")),
        ("Magazyn B", "Karton 60x40", 300, 2.5, None),
        ("Magazyn B", "Taśma pakowa", 4, 7.49, None),
    ];

    for (owner, name, quantity, price, note) in items {
        let notes = note
            .map(|content| vec![ProductNote::new(content, actor.clone(), now)])
            .unwrap_or_default();
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner: Set(owner.into()),
            name: Set(name.into()),
            quantity: Set(quantity),
            price: Set(price),
            created_by: Set(actor.clone()),
            created_at: Set(now),
            last_edited_by: Set(None),
            last_edited_at: Set(None),
            notes: Set(ProductNotes(notes)),
        }
        .insert(conn)
        .await?;

        audit::record(
            conn,
            NewHistoryEntry::new(
                HistoryType::ProductCreate,
                &actor,
                format!("Utworzono produkt \"{}\"", product.name),
            )
            .product(product.id, product.name.clone()),
        )
        .await;
    }

    println!("Seeded products");
    Ok(())
}
