use std::time::Duration;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::entity::poster;

pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    ensure_schema(&db).await?;

    Ok(db)
}

/// Create the `poster` table and its listing index when they are missing.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(poster::Entity);
    table.if_not_exists();
    db.execute_raw(backend.build(&table)).await?;

    // Backs the fixed `year DESC, id DESC` listing order.
    let index = Index::create()
        .if_not_exists()
        .name("idx_poster_year_id")
        .table(poster::Entity)
        .col(poster::Column::Year)
        .col(poster::Column::Id)
        .to_owned();
    db.execute_raw(backend.build(&index)).await?;

    info!("Ensured poster table and idx_poster_year_id exist");
    Ok(())
}
