//! Bulk CSV importer.
//!
//! Wipes the shop dataset and rebuilds it from four exports, in order:
//! products (with their categories, manufacturers and suppliers), delivery
//! points, users with profiles, and orders with line items. Later phases
//! resolve references created by earlier ones, so the order is fixed.
//!
//! Row-level problems skip the row. Missing files, missing headers, bad
//! encoding, duplicate logins and store failures abort the run. With
//! [`ImportConfig::atomic`] set the whole run happens in one transaction
//! and an abort leaves the previous dataset in place.

pub mod csv_source;
pub mod delivery_points;
pub mod line_items;
pub mod orders;
pub mod products;
pub(crate) mod references;
pub mod reset;
pub mod summary;
pub mod users;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::{error, info, instrument};

use crate::auth::PasswordHasher;
use crate::config::ImportConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;

pub use line_items::{parse_line_items, LineItem};
pub use summary::{ImportSummary, UnresolvedArticle};

/// Runs the reset and the four import phases against one database.
#[derive(Clone)]
pub struct Importer {
    db: Arc<DbPool>,
    config: ImportConfig,
    hasher: PasswordHasher,
}

impl Importer {
    pub fn new(db: Arc<DbPool>, config: ImportConfig) -> Self {
        Self {
            db,
            config,
            hasher: PasswordHasher::default(),
        }
    }

    /// Overrides the hasher used for imported passwords.
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Executes a full import.
    #[instrument(skip(self), fields(data_dir = %self.config.data_dir.display(), atomic = self.config.atomic))]
    pub async fn run(&self) -> Result<ImportSummary, ServiceError> {
        let result = if self.config.atomic {
            let txn = self.db.begin().await?;
            match self.run_on(&txn).await {
                Ok(summary) => {
                    txn.commit().await?;
                    Ok(summary)
                }
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        error!("Rollback after failed import also failed: {}", rollback);
                    }
                    Err(e)
                }
            }
        } else {
            self.run_on(&*self.db).await
        };

        match &result {
            Ok(_) => info!("Import completed successfully!"),
            Err(e) => error!("Import aborted: {}", e),
        }
        result
    }

    async fn run_on<C: ConnectionTrait>(&self, db: &C) -> Result<ImportSummary, ServiceError> {
        let mut summary = ImportSummary::default();

        info!("Clearing existing data...");
        reset::reset(db).await?;

        info!("Importing products...");
        products::import_products(db, &self.config.products_path(), &self.config, &mut summary)
            .await?;

        info!("Importing delivery points...");
        delivery_points::import_delivery_points(
            db,
            &self.config.delivery_points_path(),
            &mut summary,
        )
        .await?;

        info!("Importing users...");
        users::import_users(db, &self.config.users_path(), &self.hasher, &mut summary).await?;

        info!("Importing orders...");
        orders::import_orders(db, &self.config.orders_path(), &mut summary).await?;

        Ok(summary)
    }
}
