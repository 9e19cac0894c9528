use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    BicycleStatus, EngineError, Money, RentalFee, RentalTransaction, ResultEngine, ReturnCmd,
    ReturnReceipt, assess_late_fee, fees, rentals,
};

use super::super::{Engine, with_tx};

impl Engine {
    pub(crate) async fn find_open_rental<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
        member_id: i32,
    ) -> ResultEngine<Option<RentalTransaction>> {
        rentals::Entity::find()
            .filter(rentals::Column::BicycleId.eq(bicycle_id))
            .filter(rentals::Column::MemberId.eq(member_id))
            .filter(rentals::Column::ReturnDate.is_null())
            .order_by_desc(rentals::Column::RentalDate)
            .one(db)
            .await?
            .map(RentalTransaction::try_from)
            .transpose()
    }

    /// Tells a return of an already closed rental apart from one that never
    /// existed.
    async fn missing_rental_error<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
        member_id: i32,
    ) -> ResultEngine<EngineError> {
        let closed = rentals::Entity::find()
            .filter(rentals::Column::BicycleId.eq(bicycle_id))
            .filter(rentals::Column::MemberId.eq(member_id))
            .filter(rentals::Column::ReturnDate.is_not_null())
            .one(db)
            .await?;
        Ok(match closed {
            Some(_) => EngineError::AlreadyClosed(format!(
                "Rental of Bicycle ID {bicycle_id} by Member ID {member_id} is already returned"
            )),
            None => EngineError::NotFound(format!(
                "No active rental found for Bicycle ID {bicycle_id} and Member ID {member_id}"
            )),
        })
    }

    /// Writes the fee row of a transaction, replacing a previous one.
    async fn record_fee<C: ConnectionTrait>(&self, db: &C, fee: &RentalFee) -> ResultEngine<()> {
        let active = fees::ActiveModel::from(fee);
        match fees::Entity::find_by_id(fee.transaction_id).one(db).await? {
            Some(_) => {
                active.update(db).await?;
            }
            None => {
                active.insert(db).await?;
            }
        }
        Ok(())
    }

    /// Completes the return of a rented bicycle.
    ///
    /// The open rental of `(bicycle, member)` is closed at `returned_at`, the
    /// late and damage fees are recorded and the bicycle goes back to
    /// `Available` with the condition assessed at the counter. All of it
    /// commits together or not at all. An unconfirmed return is rejected
    /// with [`EngineError::Canceled`] and changes nothing, as does a return
    /// dated before the rental or a fee total that does not fit in [`Money`].
    pub async fn complete_return(&self, cmd: ReturnCmd) -> ResultEngine<ReturnReceipt> {
        let bicycle_id = cmd.bicycle_id;
        let member_id = cmd.member_id;
        let result = self.close_rental(cmd).await;
        match &result {
            Ok(receipt) => tracing::info!(
                "rental {} closed: bicycle {bicycle_id} back from member {member_id} after {} days, total fee {}",
                receipt.transaction_id,
                receipt.days_rented,
                receipt.total_fee
            ),
            Err(err) if err.is_rejection() => tracing::warn!(
                "return of bicycle {bicycle_id} by member {member_id} rejected: {err}"
            ),
            Err(err) => tracing::error!(
                "return of bicycle {bicycle_id} by member {member_id} failed: {err}"
            ),
        }
        result
    }

    async fn close_rental(&self, cmd: ReturnCmd) -> ResultEngine<ReturnReceipt> {
        let ReturnCmd {
            bicycle_id,
            member_id,
            confirmed,
            damage,
            condition,
            returned_at,
        } = cmd;
        let damage_fee = damage.unwrap_or(Money::ZERO);
        if damage_fee.is_negative() {
            return Err(EngineError::InvalidInput(
                "damage amount must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let Some(rental) = self
                .find_open_rental(&db_tx, bicycle_id, member_id)
                .await?
            else {
                return Err(self
                    .missing_rental_error(&db_tx, bicycle_id, member_id)
                    .await?);
            };
            if !confirmed {
                return Err(EngineError::Canceled(
                    "Return canceled by user".to_string(),
                ));
            }
            if returned_at < rental.rental_date {
                return Err(EngineError::InvalidInput(format!(
                    "return date {returned_at} is before rental date {}",
                    rental.rental_date
                )));
            }
            let late = assess_late_fee(&self.policy, rental.rental_date, returned_at);
            let Some(total_fee) = late.amount.checked_add(damage_fee) else {
                return Err(EngineError::InvalidInput(format!(
                    "total fee of late fee {} and damage fee {damage_fee} is out of range",
                    late.amount
                )));
            };

            let closed = rentals::Entity::update_many()
                .col_expr(rentals::Column::ReturnDate, Expr::value(returned_at))
                .filter(rentals::Column::Id.eq(rental.id))
                .filter(rentals::Column::ReturnDate.is_null())
                .exec(&db_tx)
                .await?;
            if closed.rows_affected == 0 {
                return Err(EngineError::AlreadyClosed(format!(
                    "Rental {} is already returned",
                    rental.id
                )));
            }

            let fee = RentalFee {
                transaction_id: rental.id,
                late_fee: late.amount,
                damage_fee,
            };
            self.record_fee(&db_tx, &fee).await?;
            self.write_status_and_condition(
                &db_tx,
                bicycle_id,
                BicycleStatus::Available,
                condition,
            )
            .await?;

            Ok(ReturnReceipt {
                transaction_id: rental.id,
                bicycle_id,
                member_id,
                rental_date: rental.rental_date,
                return_date: returned_at,
                days_rented: late.days_rented,
                late_fee: fee.late_fee,
                damage_fee: fee.damage_fee,
                total_fee,
                condition,
            })
        })
    }
}
