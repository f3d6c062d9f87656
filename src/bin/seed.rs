use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, UserRole},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin123", "Admin", UserRole::Admin).await?;
    let vendor_id =
        ensure_user(&orm, "vendor@example.com", "vendor123", "Vendor", UserRole::Vendor).await?;
    ensure_user(&orm, "user@example.com", "user123", "Customer", UserRole::Customer).await?;

    let category_id = ensure_category(&orm, "Electronics", "electronics").await?;
    seed_products(&orm, vendor_id, category_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Vendor ID: {vendor_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    name: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .filter(UserCol::Role.eq(role))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        name: Set(name.to_string()),
        role: Set(role),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(user.id)
}

async fn ensure_category(
    orm: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Slug.eq(slug))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(category.id)
}

async fn seed_products(
    orm: &DatabaseConnection,
    vendor_id: Uuid,
    category_id: Uuid,
) -> anyhow::Result<()> {
    let samples = [
        ("Wireless Earbuds", 1999_i64, 25_i32),
        ("Bluetooth Speaker", 2499, 15),
        ("USB-C Charger", 899, 50),
    ];

    for (name, price, stock) in samples {
        let exists = Products::find()
            .filter(ProductCol::Name.eq(name))
            .one(orm)
            .await?;
        if exists.is_some() {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor_id),
            category_id: Set(Some(category_id)),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            stock: Set(stock),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    Ok(())
}
