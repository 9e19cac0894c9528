use sea_orm::DatabaseConnection;

use crate::{ResultEngine, RentalPolicy};

mod catalog;
mod membership;
mod rentals;

pub use catalog::BicycleSearch;
pub use rentals::{OpenRental, RentalHistoryEntry};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The rental desk engine.
///
/// Cheap to share behind an `Arc`; every operation opens and closes its own
/// database transaction on the pooled connection.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    policy: RentalPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The rental period and late fee rate in force.
    pub fn policy(&self) -> &RentalPolicy {
        &self.policy
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    policy: RentalPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default rental policy (7 days, 10.00 per late day).
    pub fn policy(mut self, policy: RentalPolicy) -> EngineBuilder {
        self.policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.policy.validate()?;
        Ok(Engine {
            database: self.database,
            policy: self.policy,
        })
    }
}
