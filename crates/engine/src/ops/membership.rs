use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, TransactionTrait, prelude::*};

use crate::{Eligibility, EngineError, Member, ResultEngine, members, rentals};

use super::{Engine, with_tx};

impl Engine {
    pub(crate) async fn find_member<C: ConnectionTrait>(
        &self,
        db: &C,
        member_id: i32,
    ) -> ResultEngine<Option<Member>> {
        members::Entity::find_by_id(member_id)
            .one(db)
            .await?
            .map(Member::try_from)
            .transpose()
    }

    pub(crate) async fn count_open_rentals_in<C: ConnectionTrait>(
        &self,
        db: &C,
        member_id: i32,
    ) -> ResultEngine<u64> {
        Ok(rentals::Entity::find()
            .filter(rentals::Column::MemberId.eq(member_id))
            .filter(rentals::Column::ReturnDate.is_null())
            .count(db)
            .await?)
    }

    /// Eligibility evaluated on the given connection, so the rent workflow
    /// sees the same snapshot it writes to.
    pub(crate) async fn eligibility_in<C: ConnectionTrait>(
        &self,
        db: &C,
        member_id: i32,
    ) -> ResultEngine<Eligibility> {
        let Some(member) = self
            .find_member(db, member_id)
            .await?
            .filter(Member::is_active)
        else {
            return Ok(Eligibility::invalid_membership());
        };
        let open = self.count_open_rentals_in(db, member_id).await?;
        if open >= u64::from(member.rental_limit) {
            return Ok(Eligibility::limit_exceeded(member.rental_limit, open));
        }
        Ok(Eligibility::eligible())
    }

    /// Returns a member by id, whatever their status.
    pub async fn get_member(&self, member_id: i32) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| {
            self.find_member(&db_tx, member_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("Member ID {member_id} not found")))
        })
    }

    /// Returns the member only when it exists and is `Active`.
    pub async fn get_active_member(&self, member_id: i32) -> ResultEngine<Option<Member>> {
        with_tx!(self, |db_tx| {
            Ok(self
                .find_member(&db_tx, member_id)
                .await?
                .filter(Member::is_active))
        })
    }

    /// Number of rentals the member has not returned yet.
    pub async fn count_open_rentals(&self, member_id: i32) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            self.count_open_rentals_in(&db_tx, member_id).await
        })
    }

    /// Whether the member may rent one more bicycle, with the reason.
    pub async fn is_eligible(&self, member_id: i32) -> ResultEngine<Eligibility> {
        with_tx!(self, |db_tx| self.eligibility_in(&db_tx, member_id).await)
    }

    /// Inserts or replaces a member record (membership import).
    pub async fn upsert_member(&self, member: &Member) -> ResultEngine<Member> {
        let active = members::ActiveModel::try_from(member)?;
        with_tx!(self, |db_tx| {
            match members::Entity::find_by_id(member.id).one(&db_tx).await? {
                Some(_) => {
                    active.update(&db_tx).await?;
                }
                None => {
                    active.insert(&db_tx).await?;
                }
            }
            Ok(member.clone())
        })
    }
}
