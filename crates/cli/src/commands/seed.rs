//! Seed the database with sample data.
//!
//! Inserts one author with a couple of posts plus a small commerce catalog
//! (categories, suppliers, products, shippers, customers, employees, and an
//! order with line items). Skips seeding if any users already exist.

use sqlx::PgPool;
use tracing::info;

use trellis_core::types::{
    CategoryId, CustomerId, EmployeeId, OrderDetailId, OrderId, ProductId, ShipperId, SupplierId,
    UserId,
};
use trellis_graph::store::create_pool;

use super::migrate::database_url;

/// Seed sample data.
///
/// # Errors
///
/// Returns an error if the database URL is missing or any insert fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;
    let pool = create_pool(&database_url).await?;
    info!("Connected to database");

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    if users > 0 {
        info!("Database already seeded, skipping");
        return Ok(());
    }

    seed_blog(&pool).await?;
    seed_commerce(&pool).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_blog(pool: &PgPool) -> Result<(), sqlx::Error> {
    let author_id: UserId = sqlx::query_scalar(
        "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id",
    )
    .bind("ada@example.com")
    .bind("Ada Lovelace")
    .fetch_one(pool)
    .await?;

    sqlx::query(
        "INSERT INTO posts (title, content, published, author_id) VALUES \
         ($1, $2, TRUE, $5), ($3, $4, FALSE, $5)",
    )
    .bind("Hello, world")
    .bind("The first post.")
    .bind("Notes on engines")
    .bind("Still a draft.")
    .bind(author_id)
    .execute(pool)
    .await?;

    info!(author = %author_id, "Seeded blog data");
    Ok(())
}

async fn seed_commerce(pool: &PgPool) -> Result<(), sqlx::Error> {
    let category_id: CategoryId = sqlx::query_scalar(
        "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
    )
    .bind("Beverages")
    .bind("Soft drinks, coffees, teas")
    .fetch_one(pool)
    .await?;

    let supplier_id: SupplierId = sqlx::query_scalar(
        "INSERT INTO suppliers \
         (name, contact_name, address, city, postal_code, country, phone) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind("Exotic Liquids")
    .bind("Charlotte Cooper")
    .bind("49 Gilbert St.")
    .bind("London")
    .bind("EC1 4SD")
    .bind("UK")
    .bind("(171) 555-2222")
    .fetch_one(pool)
    .await?;

    let product_id: ProductId = sqlx::query_scalar(
        "INSERT INTO products \
         (name, price, description, excerpt, unit, category_id, supplier_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind("Chai")
    .bind(sqlx::types::Decimal::new(1800, 2))
    .bind("A fragrant black tea blend.")
    .bind("Black tea blend")
    .bind("10 boxes x 20 bags")
    .bind(category_id)
    .bind(supplier_id)
    .fetch_one(pool)
    .await?;

    let shipper_id: ShipperId = sqlx::query_scalar(
        "INSERT INTO shippers (shipper_name, phone) VALUES ($1, $2) RETURNING id",
    )
    .bind("Speedy Express")
    .bind("(503) 555-9831")
    .fetch_one(pool)
    .await?;

    let customer_id: CustomerId = sqlx::query_scalar(
        "INSERT INTO customers \
         (customer_name, contact_name, address, city, postal_code, country) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind("Alfreds Futterkiste")
    .bind("Maria Anders")
    .bind("Obere Str. 57")
    .bind("Berlin")
    .bind("12209")
    .bind("Germany")
    .fetch_one(pool)
    .await?;

    let employee_id: EmployeeId = sqlx::query_scalar(
        "INSERT INTO employees (last_name, first_name, birth_date, photo, notes) \
         VALUES ($1, $2, '1968-12-08T00:00:00Z', $3, $4) RETURNING id",
    )
    .bind("Davolio")
    .bind("Nancy")
    .bind("nancy.jpg")
    .bind("Education includes a BA in psychology.")
    .fetch_one(pool)
    .await?;

    let order_id: OrderId = sqlx::query_scalar(
        "INSERT INTO orders (order_date, shipper_id, customer_id, employee_id) \
         VALUES ('1996-07-04T00:00:00Z', $1, $2, $3) RETURNING id",
    )
    .bind(shipper_id)
    .bind(customer_id)
    .bind(employee_id)
    .fetch_one(pool)
    .await?;

    let detail_id: OrderDetailId = sqlx::query_scalar(
        "INSERT INTO order_details (quantity, order_id, product_id) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(12)
    .bind(order_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    info!(order = %order_id, detail = %detail_id, "Seeded commerce data");
    Ok(())
}
