//! SeaORM implementation of ReservationRepository
//!
//! Create and reschedule run the same-day read, the overlap check and the
//! write inside one transaction. Postgres and MySQL get `SERIALIZABLE`;
//! SQLite serializes writers itself and reports a busy database instead.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, IsolationLevel, NotSet, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::db_err;
use crate::domain::reservation::{
    describe_conflicts, find_conflicts, guard_status, ConflictPolicy, NewReservation,
    Reservation, ReservationFilter, ReservationRepository, ReservationStatus, ReservationView,
};
use crate::domain::{DomainError, DomainResult, User};
use crate::infrastructure::database::entities::{reservation, user};

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn begin(&self) -> DomainResult<DatabaseTransaction> {
        let txn = if self.db.get_database_backend() == DbBackend::Sqlite {
            self.db.begin().await
        } else {
            self.db
                .begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        };
        txn.map_err(db_err)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn to_view(
    (model, owner): (reservation::Model, Option<user::Model>),
) -> DomainResult<ReservationView> {
    let owner = owner.ok_or_else(|| DomainError::InvalidReference {
        entity: "User",
        value: model.user_id.to_string(),
    })?;
    Ok(ReservationView {
        reservation: model.into(),
        owner: User::from(owner).summary(),
    })
}

/// Same-day rows that collide with `candidate`, read inside `txn`.
async fn conflicts_in<C: ConnectionTrait>(
    conn: &C,
    candidate: &Reservation,
    exclude_id: Option<i32>,
    policy: ConflictPolicy,
) -> DomainResult<Vec<Reservation>> {
    let same_day = reservation::Entity::find()
        .filter(reservation::Column::Date.eq(candidate.date))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(find_conflicts(
        &candidate.slot(),
        same_day.into_iter().map(Reservation::from),
        exclude_id,
        policy,
    ))
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ReservationView>> {
        let row = reservation::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        row.map(to_view).transpose()
    }

    async fn list(&self, filter: ReservationFilter) -> DomainResult<Vec<ReservationView>> {
        let mut query = reservation::Entity::find();

        if let Some(from) = filter.date_from {
            query = query.filter(reservation::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(reservation::Column::Date.lte(to));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(reservation::Column::UserId.eq(user_id));
        }
        match filter.status {
            Some(status) => {
                query = query.filter(
                    reservation::Column::Status.eq(reservation::ReservationStatus::from(status)),
                );
            }
            None if !filter.include_cancelled => {
                query = query.filter(
                    reservation::Column::Status.ne(reservation::ReservationStatus::Cancelled),
                );
            }
            None => {}
        }

        let rows = query
            .order_by_asc(reservation::Column::Date)
            .order_by_asc(reservation::Column::StartTime)
            .order_by_asc(reservation::Column::Id)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(to_view).collect()
    }

    async fn find_by_date(&self, date: NaiveDate) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Date.eq(date))
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(Reservation::from).collect())
    }

    async fn insert_if_free(
        &self,
        new: NewReservation,
        policy: ConflictPolicy,
    ) -> DomainResult<Reservation> {
        debug!("Booking {} {}..{}", new.slot.date, new.slot.start_time, new.slot.end_time);

        let txn = self.begin().await?;

        let candidate = Reservation {
            id: 0,
            date: new.slot.date,
            start_time: new.slot.start_time,
            end_time: new.slot.end_time,
            note: new.note,
            status: new.status,
            user_id: new.user_id,
            created_at: new.created_at,
            updated_at: new.created_at,
        };

        let conflicts = conflicts_in(&txn, &candidate, None, policy).await?;
        if !conflicts.is_empty() {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::Conflict(describe_conflicts(&conflicts)));
        }

        let model = reservation::ActiveModel {
            id: NotSet,
            date: Set(candidate.date),
            start_time: Set(candidate.start_time),
            end_time: Set(candidate.end_time),
            note: Set(candidate.note),
            status: Set(candidate.status.into()),
            user_id: Set(candidate.user_id),
            created_at: Set(candidate.created_at),
            updated_at: Set(candidate.updated_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(model.into())
    }

    async fn update(
        &self,
        r: Reservation,
        expected: ReservationStatus,
        conflict_check: Option<ConflictPolicy>,
    ) -> DomainResult<Reservation> {
        debug!("Updating reservation: {}", r.id);

        let txn = self.begin().await?;

        let existing = reservation::Entity::find_by_id(r.id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Reservation", r.id))?;

        if let Err(e) = guard_status(existing.status.into(), expected, r.status) {
            txn.rollback().await.map_err(db_err)?;
            return Err(e);
        }

        if let Some(policy) = conflict_check {
            let conflicts = conflicts_in(&txn, &r, Some(r.id), policy).await?;
            if !conflicts.is_empty() {
                txn.rollback().await.map_err(db_err)?;
                return Err(DomainError::Conflict(describe_conflicts(&conflicts)));
            }
        }

        let mut active: reservation::ActiveModel = existing.into();
        active.date = Set(r.date);
        active.start_time = Set(r.start_time);
        active.end_time = Set(r.end_time);
        active.note = Set(r.note);
        if r.status != expected {
            active.status = Set(r.status.into());
        }
        active.user_id = Set(r.user_id);
        active.updated_at = Set(r.updated_at);
        let updated = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(updated.into())
    }

    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let txn = self.begin().await?;

        let existing = reservation::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;

        if let Err(e) = guard_status(existing.status.into(), from, to) {
            txn.rollback().await.map_err(db_err)?;
            return Err(e);
        }

        let mut active: reservation::ActiveModel = existing.into();
        active.status = Set(to.into());
        active.updated_at = Set(updated_at);
        let updated = active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(updated.into())
    }

    async fn purge_cancelled(&self, before: NaiveDate) -> DomainResult<u64> {
        let result = reservation::Entity::delete_many()
            .filter(reservation::Column::Status.eq(reservation::ReservationStatus::Cancelled))
            .filter(reservation::Column::Date.lt(before))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::TimeSlot;
    use crate::domain::{CreateUserDto, UserRepositoryInterface};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::UserRepository;
    use chrono::NaiveTime;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    async fn setup() -> (SeaOrmReservationRepository, UserRepository, i32) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let users = UserRepository::new(db.clone());
        let owner = users
            .create_user(CreateUserDto {
                name: "Fabio Rocha".into(),
                email: "fabio@example.com".into(),
                phone: "3132221111".into(),
                unit: 501,
                role: None,
                password_hash: "x".into(),
            })
            .await
            .unwrap();

        (SeaOrmReservationRepository::new(db), users, owner.id)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 9, day).unwrap()
    }

    fn new(user_id: i32, day: u32, start: u32, end: u32) -> NewReservation {
        let d = date(day);
        let at = |h| d.and_time(NaiveTime::from_hms_opt(h, 0, 0).unwrap());
        NewReservation {
            slot: TimeSlot::new(d, at(start), at(end)),
            note: Some("family lunch".into()),
            status: ReservationStatus::Pending,
            user_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_with_owner() {
        let (repo, _, owner) = setup().await;
        let r = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        assert!(r.id > 0);

        let view = repo.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(view.reservation.date, date(1));
        assert_eq!(view.reservation.note.as_deref(), Some("family lunch"));
        assert_eq!(view.reservation.status, ReservationStatus::Pending);
        assert_eq!(view.owner.unit, 501);

        assert!(repo.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overlapping_insert_is_rejected() {
        let (repo, _, owner) = setup().await;
        repo.insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();

        let err = repo
            .insert_if_free(new(owner, 1, 11, 13), ConflictPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // different day, same hours
        repo.insert_if_free(new(owner, 2, 11, 13), ConflictPolicy::default())
            .await
            .unwrap();
        assert_eq!(repo.find_by_date(date(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_excludes_itself_and_checks_others() {
        let (repo, _, owner) = setup().await;
        let mut a = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        let b = repo
            .insert_if_free(new(owner, 1, 14, 16), ConflictPolicy::default())
            .await
            .unwrap();

        a.end_time = date(1).and_time(NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        let extended = repo
            .update(a.clone(), ReservationStatus::Pending, Some(ConflictPolicy::default()))
            .await
            .unwrap();
        assert_eq!(extended.end_time, a.end_time);

        a.end_time = b.end_time;
        let err = repo
            .update(a, ReservationStatus::Pending, Some(ConflictPolicy::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_hides_cancelled_and_orders_by_slot() {
        let (repo, _, owner) = setup().await;
        let late = repo
            .insert_if_free(new(owner, 3, 18, 20), ConflictPolicy::default())
            .await
            .unwrap();
        let early = repo
            .insert_if_free(new(owner, 3, 9, 11), ConflictPolicy::default())
            .await
            .unwrap();
        let gone = repo
            .insert_if_free(new(owner, 2, 9, 11), ConflictPolicy::default())
            .await
            .unwrap();
        repo.update_status(
            gone.id,
            ReservationStatus::Pending,
            ReservationStatus::Cancelled,
            Utc::now(),
        )
        .await
        .unwrap();

        let ids: Vec<i32> = repo
            .list(ReservationFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.reservation.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);

        let cancelled = repo
            .list(ReservationFilter {
                status: Some(ReservationStatus::Cancelled),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].reservation.id, gone.id);

        let ranged = repo
            .list(ReservationFilter {
                date_from: Some(date(2)),
                date_to: Some(date(2)),
                include_cancelled: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
    }

    #[tokio::test]
    async fn purge_deletes_old_cancelled_only() {
        let (repo, _, owner) = setup().await;
        let old = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        let kept = repo
            .insert_if_free(new(owner, 2, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        let later = repo
            .insert_if_free(new(owner, 20, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        for id in [old.id, later.id] {
            repo.update_status(
                id,
                ReservationStatus::Pending,
                ReservationStatus::Cancelled,
                Utc::now(),
            )
            .await
            .unwrap();
        }

        assert_eq!(repo.purge_cancelled(date(10)).await.unwrap(), 1);
        assert!(repo.find_by_id(old.id).await.unwrap().is_none());
        assert!(repo.find_by_id(kept.id).await.unwrap().is_some());
        assert!(repo.find_by_id(later.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_owner_removes_reservations() {
        let (repo, users, owner) = setup().await;
        let r = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();

        users.delete_user(owner).await.unwrap();
        assert!(repo.find_by_id(r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_write_cannot_revive_a_cancelled_row() {
        let (repo, _, owner) = setup().await;
        let a = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();

        // cancelled after the caller read it as pending
        repo.update_status(
            a.id,
            ReservationStatus::Pending,
            ReservationStatus::Cancelled,
            Utc::now(),
        )
        .await
        .unwrap();
        let b = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();

        let mut stale = a.clone();
        stale.note = Some("balloons".into());
        let err = repo
            .update(stale, ReservationStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Terminal(ReservationStatus::Cancelled)
        ));

        let err = repo
            .update_status(
                a.id,
                ReservationStatus::Pending,
                ReservationStatus::Confirmed,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Terminal(ReservationStatus::Cancelled)
        ));

        let live: Vec<i32> = repo
            .find_by_date(date(1))
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .map(|r| r.id)
            .collect();
        assert_eq!(live, vec![b.id]);
    }

    #[tokio::test]
    async fn field_edit_keeps_a_newer_stored_status() {
        let (repo, _, owner) = setup().await;
        let a = repo
            .insert_if_free(new(owner, 1, 10, 12), ConflictPolicy::default())
            .await
            .unwrap();
        repo.update_status(
            a.id,
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            Utc::now(),
        )
        .await
        .unwrap();

        let mut stale = a.clone();
        stale.note = Some("cake".into());
        let updated = repo
            .update(stale, ReservationStatus::Pending, None)
            .await
            .unwrap();
        assert_eq!(updated.status, ReservationStatus::Confirmed);
        assert_eq!(updated.note.as_deref(), Some("cake"));
    }
}
