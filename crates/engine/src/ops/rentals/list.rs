use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    EngineError, RentalFee, RentalTransaction, ResultEngine, bicycles, fees, rentals,
};

use super::super::{Engine, with_tx};
use super::{OpenRental, RentalHistoryEntry};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HistoryCursor {
    rental_date: DateTime<Utc>,
    transaction_id: i32,
}

impl HistoryCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidInput("invalid history cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidInput("invalid history cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidInput("invalid history cursor".to_string()))
    }
}

impl Engine {
    /// Returns a rental by transaction id.
    pub async fn get_rental(&self, transaction_id: i32) -> ResultEngine<RentalTransaction> {
        with_tx!(self, |db_tx| {
            rentals::Entity::find_by_id(transaction_id)
                .one(&db_tx)
                .await?
                .map(RentalTransaction::try_from)
                .transpose()?
                .ok_or_else(|| {
                    EngineError::NotFound(format!("Rental {transaction_id} not found"))
                })
        })
    }

    /// Fees recorded for a transaction; `None` while the rental is open.
    pub async fn rental_fee(&self, transaction_id: i32) -> ResultEngine<Option<RentalFee>> {
        with_tx!(self, |db_tx| {
            fees::Entity::find_by_id(transaction_id)
                .one(&db_tx)
                .await?
                .map(RentalFee::try_from)
                .transpose()
        })
    }

    /// Bicycles currently out on rent, oldest rental first.
    pub async fn open_rentals(&self) -> ResultEngine<Vec<OpenRental>> {
        with_tx!(self, |db_tx| {
            let rows: Vec<(rentals::Model, Option<bicycles::Model>)> = rentals::Entity::find()
                .filter(rentals::Column::ReturnDate.is_null())
                .find_also_related(bicycles::Entity)
                .order_by_asc(rentals::Column::RentalDate)
                .order_by_asc(rentals::Column::Id)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (rental_model, bicycle_model) in rows {
                let Some(bicycle_model) = bicycle_model else {
                    continue;
                };
                out.push(OpenRental {
                    rental: RentalTransaction::try_from(rental_model)?,
                    brand: bicycle_model.brand,
                    kind: bicycle_model.kind,
                });
            }
            Ok(out)
        })
    }

    /// Open rentals whose expected return date is before `now`.
    pub async fn overdue_rentals(&self, now: DateTime<Utc>) -> ResultEngine<Vec<OpenRental>> {
        let open = self.open_rentals().await?;
        Ok(open
            .into_iter()
            .filter(|open| open.rental.is_overdue(now))
            .collect())
    }

    /// Lists rentals, newest first, optionally for a single member, with
    /// cursor-based pagination.
    ///
    /// Pagination is newest → older by `(rental_date DESC, id DESC)`; the
    /// returned cursor is `None` on the last page.
    pub async fn rental_history(
        &self,
        member_id: Option<i32>,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<RentalHistoryEntry>, Option<String>)> {
        if limit == 0 {
            return Err(EngineError::InvalidInput(
                "limit must be > 0".to_string(),
            ));
        }
        let cursor = cursor.map(HistoryCursor::decode).transpose()?;
        with_tx!(self, |db_tx| {
            let mut query = rentals::Entity::find()
                .find_also_related(fees::Entity)
                .order_by_desc(rentals::Column::RentalDate)
                .order_by_desc(rentals::Column::Id)
                .limit(limit.saturating_add(1));
            if let Some(member_id) = member_id {
                query = query.filter(rentals::Column::MemberId.eq(member_id));
            }
            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(rentals::Column::RentalDate.lt(cursor.rental_date))
                        .add(
                            Condition::all()
                                .add(rentals::Column::RentalDate.eq(cursor.rental_date))
                                .add(rentals::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }

            let rows: Vec<(rentals::Model, Option<fees::Model>)> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out = Vec::with_capacity(rows.len().min(limit as usize));
            for (rental_model, fee_model) in rows.into_iter().take(limit as usize) {
                out.push(RentalHistoryEntry {
                    rental: RentalTransaction::try_from(rental_model)?,
                    fee: fee_model.map(RentalFee::try_from).transpose()?,
                });
            }

            let next_cursor = if has_more {
                out.last()
                    .map(|entry| HistoryCursor {
                        rental_date: entry.rental.rental_date,
                        transaction_id: entry.rental.id,
                    })
                    .map(|c| c.encode())
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }
}
