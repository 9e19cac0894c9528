use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    BicycleStatus, EngineError, RentCmd, RentalTransaction, ResultEngine, bicycles, rentals,
};

use super::super::{Engine, with_tx};

fn not_available(bicycle_id: i32, status: BicycleStatus) -> EngineError {
    EngineError::NotAvailable(format!(
        "Bicycle with ID {bicycle_id} is not available for rent, current status: {status}"
    ))
}

impl Engine {
    /// Rents a bicycle to a member.
    ///
    /// Checks run in order: member eligibility, bicycle existence, bicycle
    /// availability. On success the rental is stored with its expected return
    /// date and the bicycle is marked `Rented`, in one transaction. No fee is
    /// recorded until the bicycle comes back.
    pub async fn initiate_rental(&self, cmd: RentCmd) -> ResultEngine<RentalTransaction> {
        let RentCmd {
            member_id,
            bicycle_id,
            rented_at,
        } = cmd;
        let result = self.open_rental(member_id, bicycle_id, rented_at).await;
        match &result {
            Ok(rental) => tracing::info!(
                "rental {} opened: bicycle {bicycle_id} to member {member_id}, due {}",
                rental.id,
                rental.expected_return_date
            ),
            Err(err) if err.is_rejection() => tracing::warn!(
                "rental of bicycle {bicycle_id} to member {member_id} rejected: {err}"
            ),
            Err(err) => tracing::error!(
                "rental of bicycle {bicycle_id} to member {member_id} failed: {err}"
            ),
        }
        result
    }

    async fn open_rental(
        &self,
        member_id: i32,
        bicycle_id: i32,
        rented_at: DateTime<Utc>,
    ) -> ResultEngine<RentalTransaction> {
        with_tx!(self, |db_tx| {
            let eligibility = self.eligibility_in(&db_tx, member_id).await?;
            if !eligibility.eligible {
                return Err(EngineError::Ineligible(eligibility.reason));
            }

            let bicycle = self.require_bicycle(&db_tx, bicycle_id).await?;
            if !bicycle.is_rentable() {
                return Err(not_available(bicycle_id, bicycle.status));
            }

            // Only flips a bicycle that is still available at write time.
            let flipped = bicycles::Entity::update_many()
                .col_expr(
                    bicycles::Column::Status,
                    Expr::value(BicycleStatus::Rented.as_str()),
                )
                .filter(bicycles::Column::Id.eq(bicycle_id))
                .filter(bicycles::Column::Status.eq(BicycleStatus::Available.as_str()))
                .exec(&db_tx)
                .await?;
            if flipped.rows_affected == 0 {
                let current = self.require_bicycle(&db_tx, bicycle_id).await?;
                return Err(not_available(bicycle_id, current.status));
            }

            let rental = RentalTransaction {
                id: 0,
                bicycle_id,
                member_id,
                rental_date: rented_at,
                expected_return_date: self.policy.expected_return_date(rented_at),
                return_date: None,
            };
            let model = match rentals::ActiveModel::from(&rental).insert(&db_tx).await {
                Ok(model) => model,
                // The open-rental index caught a rental the status did not reflect.
                Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    return Err(not_available(bicycle_id, BicycleStatus::Rented));
                }
                Err(err) => return Err(err.into()),
            };
            RentalTransaction::try_from(model)
        })
    }
}
