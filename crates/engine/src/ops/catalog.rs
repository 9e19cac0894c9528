use sea_orm::{
    Condition, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};

use crate::{
    Bicycle, BicycleCondition, BicycleFilter, BicycleStatus, EngineError, Money, ResultEngine,
    SortField, bicycles, rentals, util::contains_pattern,
};

use super::{Engine, with_tx};

/// Result of a catalog search.
///
/// When the filters matched nothing, the engine retries with relaxed
/// predicates and returns near-matches with `exact == false`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BicycleSearch {
    pub exact: bool,
    pub bicycles: Vec<Bicycle>,
}

impl BicycleSearch {
    pub fn count(&self) -> usize {
        self.bicycles.len()
    }

    /// Mean daily rate of the matched bicycles, rounded down to the cent.
    pub fn average_daily_rate(&self) -> Option<Money> {
        if self.bicycles.is_empty() {
            return None;
        }
        let total: Money = self.bicycles.iter().map(|b| b.daily_rate).sum();
        Some(Money::new(total.minor() / self.bicycles.len() as i64))
    }
}

fn lower_like(column: bicycles::Column, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(contains_pattern(needle)).escape('\\'))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// All predicates combined with AND.
fn exact_condition(filter: &BicycleFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(brand) = non_blank(filter.brand.as_deref()) {
        cond = cond.add(lower_like(bicycles::Column::Brand, brand));
    }
    if let Some(kind) = non_blank(filter.kind.as_deref()) {
        cond = cond.add(lower_like(bicycles::Column::Kind, kind));
    }
    if let Some(status) = filter.status {
        cond = cond.add(bicycles::Column::Status.eq(status.as_str()));
    }
    if let Some(condition) = filter.condition {
        cond = cond.add(bicycles::Column::Condition.eq(condition.as_str()));
    }
    if let Some(min) = filter.min_rate {
        cond = cond.add(bicycles::Column::DailyRateMinor.gte(min.minor()));
    }
    if let Some(max) = filter.max_rate {
        cond = cond.add(bicycles::Column::DailyRateMinor.lte(max.minor()));
    }
    cond
}

/// Status stays mandatory, text predicates become alternatives and rate
/// bounds are dropped.
fn relaxed_condition(filter: &BicycleFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(status) = filter.status {
        cond = cond.add(bicycles::Column::Status.eq(status.as_str()));
    }
    if filter.text_predicates_count() > 0 {
        let mut any = Condition::any();
        if let Some(brand) = non_blank(filter.brand.as_deref()) {
            any = any.add(lower_like(bicycles::Column::Brand, brand));
        }
        if let Some(kind) = non_blank(filter.kind.as_deref()) {
            any = any.add(lower_like(bicycles::Column::Kind, kind));
        }
        if let Some(condition) = filter.condition {
            any = any.add(bicycles::Column::Condition.eq(condition.as_str()));
        }
        cond = cond.add(any);
    }
    cond
}

fn sort_column(field: SortField) -> bicycles::Column {
    match field {
        SortField::Brand => bicycles::Column::Brand,
        SortField::Type => bicycles::Column::Kind,
        SortField::Rate => bicycles::Column::DailyRateMinor,
        SortField::Condition => bicycles::Column::Condition,
    }
}

fn validate_filter(filter: &BicycleFilter) -> ResultEngine<()> {
    if let (Some(min), Some(max)) = (filter.min_rate, filter.max_rate)
        && min > max
    {
        return Err(EngineError::InvalidInput(
            "invalid range: min rate must be <= max rate".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    pub(crate) async fn find_bicycle<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
    ) -> ResultEngine<Option<Bicycle>> {
        bicycles::Entity::find_by_id(bicycle_id)
            .one(db)
            .await?
            .map(Bicycle::try_from)
            .transpose()
    }

    pub(crate) async fn require_bicycle<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
    ) -> ResultEngine<Bicycle> {
        self.find_bicycle(db, bicycle_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Bicycle ID {bicycle_id} not found")))
    }

    /// Overwrites status and condition. Callers own the status invariant.
    pub(crate) async fn write_status_and_condition<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
        status: BicycleStatus,
        condition: BicycleCondition,
    ) -> ResultEngine<()> {
        let result = bicycles::Entity::update_many()
            .col_expr(bicycles::Column::Status, Expr::value(status.as_str()))
            .col_expr(bicycles::Column::Condition, Expr::value(condition.as_str()))
            .filter(bicycles::Column::Id.eq(bicycle_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!(
                "Bicycle ID {bicycle_id} not found"
            )));
        }
        Ok(())
    }

    async fn query_bicycles<C: ConnectionTrait>(
        &self,
        db: &C,
        condition: Condition,
        sort_by: Option<SortField>,
    ) -> ResultEngine<Vec<Bicycle>> {
        let mut query = bicycles::Entity::find().filter(condition);
        if let Some(field) = sort_by {
            query = query.order_by_asc(sort_column(field));
        }
        query
            .order_by_asc(bicycles::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Bicycle::try_from)
            .collect()
    }

    /// Returns a bicycle by id.
    pub async fn get_bicycle(&self, bicycle_id: i32) -> ResultEngine<Bicycle> {
        with_tx!(self, |db_tx| self.require_bicycle(&db_tx, bicycle_id).await)
    }

    /// Lists the whole fleet ordered by id.
    pub async fn list_all_bicycles(&self) -> ResultEngine<Vec<Bicycle>> {
        with_tx!(self, |db_tx| {
            self.query_bicycles(&db_tx, Condition::all(), None).await
        })
    }

    /// Searches the catalog.
    ///
    /// Text filters match case-insensitively anywhere in the field, rate
    /// bounds are inclusive. If nothing matches and some filter can be
    /// relaxed, a second query keeps the status filter, accepts any of the
    /// brand/type/condition filters and ignores the rate bounds.
    pub async fn search_bicycles(&self, filter: &BicycleFilter) -> ResultEngine<BicycleSearch> {
        validate_filter(filter)?;
        with_tx!(self, |db_tx| {
            let bicycles = self
                .query_bicycles(&db_tx, exact_condition(filter), filter.sort_by)
                .await?;
            if !bicycles.is_empty() || !filter.has_relaxable_predicates() {
                Ok(BicycleSearch {
                    exact: true,
                    bicycles,
                })
            } else {
                let bicycles = self
                    .query_bicycles(&db_tx, relaxed_condition(filter), filter.sort_by)
                    .await?;
                Ok(BicycleSearch {
                    exact: false,
                    bicycles,
                })
            }
        })
    }

    /// Lists available bicycles matching `filter` exactly; the status filter
    /// is forced to `Available`.
    pub async fn list_available(&self, filter: &BicycleFilter) -> ResultEngine<Vec<Bicycle>> {
        validate_filter(filter)?;
        let filter = filter.clone().status(BicycleStatus::Available);
        with_tx!(self, |db_tx| {
            self.query_bicycles(&db_tx, exact_condition(&filter), filter.sort_by)
                .await
        })
    }

    /// Administrative status/condition change.
    ///
    /// Only `Available` and `UnderMaintenance` can be set here, and never on a
    /// bicycle that is out on rent: `Rented` belongs to the rental workflow.
    pub async fn set_status_and_condition(
        &self,
        bicycle_id: i32,
        status: BicycleStatus,
        condition: BicycleCondition,
    ) -> ResultEngine<Bicycle> {
        if status == BicycleStatus::Rented {
            return Err(EngineError::InvalidInput(
                "status Rented is set by renting the bicycle".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let bicycle = self.require_bicycle(&db_tx, bicycle_id).await?;
            if bicycle.status == BicycleStatus::Rented {
                return Err(EngineError::NotAvailable(format!(
                    "Bicycle with ID {bicycle_id} is currently rented; return it first"
                )));
            }
            self.write_status_and_condition(&db_tx, bicycle_id, status, condition)
                .await?;
            Ok(bicycle.with_status(status).with_condition(condition))
        })
    }

    /// Adds a bicycle to the fleet. Ids are inventory numbers and must be
    /// unique.
    pub async fn add_bicycle(&self, bicycle: &Bicycle) -> ResultEngine<Bicycle> {
        if bicycle.status == BicycleStatus::Rented {
            return Err(EngineError::InvalidInput(
                "a new bicycle cannot start as Rented".to_string(),
            ));
        }
        if bicycle.daily_rate.is_negative() {
            return Err(EngineError::InvalidInput(
                "daily rate must be >= 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            if self.find_bicycle(&db_tx, bicycle.id).await?.is_some() {
                return Err(EngineError::InvalidInput(format!(
                    "bicycle {} already exists",
                    bicycle.id
                )));
            }
            bicycles::ActiveModel::from(bicycle).insert(&db_tx).await?;
            Ok(bicycle.clone())
        })
    }

    /// Number of open rentals referencing the bicycle; 0 or 1 in a
    /// consistent store.
    pub(crate) async fn count_open_for_bicycle<C: ConnectionTrait>(
        &self,
        db: &C,
        bicycle_id: i32,
    ) -> ResultEngine<u64> {
        Ok(rentals::Entity::find()
            .filter(rentals::Column::BicycleId.eq(bicycle_id))
            .filter(rentals::Column::ReturnDate.is_null())
            .count(db)
            .await?)
    }

    /// Checks that the bicycle is marked `Rented` exactly when one open
    /// rental references it.
    pub async fn bicycle_state_is_consistent(&self, bicycle_id: i32) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let bicycle = self.require_bicycle(&db_tx, bicycle_id).await?;
            let open = self.count_open_for_bicycle(&db_tx, bicycle_id).await?;
            Ok((bicycle.status == BicycleStatus::Rented) == (open == 1) && open <= 1)
        })
    }
}
