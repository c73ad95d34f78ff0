//! In-memory storage implementation

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::domain::reservation::{
    describe_conflicts, find_conflicts, guard_status, ConflictPolicy, NewReservation,
    Reservation, ReservationFilter, ReservationRepository, ReservationStatus, ReservationView,
};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, RepositoryProvider, UpdateUserDto, User,
    UserRepositoryInterface,
};
use crate::shared::{validate_pagination, PaginatedResult};

/// In-memory storage for development and testing
pub struct InMemoryStorage {
    users: DashMap<i32, User>,
    reservations: DashMap<i32, Reservation>,
    user_counter: AtomicI32,
    reservation_counter: AtomicI32,
    /// Serializes check-then-write sequences
    write_gate: Mutex<()>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            reservations: DashMap::new(),
            user_counter: AtomicI32::new(1),
            reservation_counter: AtomicI32::new(1),
            write_gate: Mutex::new(()),
        }
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn view(&self, reservation: Reservation) -> DomainResult<ReservationView> {
        let owner = self
            .users
            .get(&reservation.user_id)
            .map(|u| u.summary())
            .ok_or_else(|| DomainError::InvalidReference {
                entity: "User",
                value: reservation.user_id.to_string(),
            })?;
        Ok(ReservationView { reservation, owner })
    }

    fn same_day(&self, date: NaiveDate) -> Vec<Reservation> {
        self.reservations
            .iter()
            .filter(|e| e.value().date == date)
            .map(|e| e.value().clone())
            .collect()
    }

    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .iter()
            .any(|e| e.value().email.eq_ignore_ascii_case(email) && Some(*e.key()) != except)
    }

    fn insert_reservation(
        &self,
        new: NewReservation,
        policy: ConflictPolicy,
    ) -> DomainResult<Reservation> {
        let _gate = self.gate();

        let conflicts = find_conflicts(&new.slot, self.same_day(new.slot.date), None, policy);
        if !conflicts.is_empty() {
            return Err(DomainError::Conflict(describe_conflicts(&conflicts)));
        }

        let id = self.reservation_counter.fetch_add(1, Ordering::SeqCst);
        let reservation = Reservation {
            id,
            date: new.slot.date,
            start_time: new.slot.start_time,
            end_time: new.slot.end_time,
            note: new.note,
            status: new.status,
            user_id: new.user_id,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    fn replace_reservation(
        &self,
        mut reservation: Reservation,
        expected: ReservationStatus,
        conflict_check: Option<ConflictPolicy>,
    ) -> DomainResult<Reservation> {
        let _gate = self.gate();

        let stored = self
            .reservations
            .get(&reservation.id)
            .map(|r| r.status)
            .ok_or_else(|| DomainError::not_found("Reservation", reservation.id))?;
        guard_status(stored, expected, reservation.status)?;
        if reservation.status == expected {
            reservation.status = stored;
        }

        if let Some(policy) = conflict_check {
            let conflicts = find_conflicts(
                &reservation.slot(),
                self.same_day(reservation.date),
                Some(reservation.id),
                policy,
            );
            if !conflicts.is_empty() {
                return Err(DomainError::Conflict(describe_conflicts(&conflicts)));
            }
        }

        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStorage {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ReservationView>> {
        let found = self.reservations.get(&id).map(|r| r.value().clone());
        found.map(|r| self.view(r)).transpose()
    }

    async fn list(&self, filter: ReservationFilter) -> DomainResult<Vec<ReservationView>> {
        let mut items: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|r| (r.date, r.start_time, r.id));
        items.into_iter().map(|r| self.view(r)).collect()
    }

    async fn find_by_date(&self, date: NaiveDate) -> DomainResult<Vec<Reservation>> {
        let mut items = self.same_day(date);
        items.sort_by_key(|r| (r.start_time, r.id));
        Ok(items)
    }

    async fn insert_if_free(
        &self,
        reservation: NewReservation,
        policy: ConflictPolicy,
    ) -> DomainResult<Reservation> {
        self.insert_reservation(reservation, policy)
    }

    async fn update(
        &self,
        reservation: Reservation,
        expected: ReservationStatus,
        conflict_check: Option<ConflictPolicy>,
    ) -> DomainResult<Reservation> {
        self.replace_reservation(reservation, expected, conflict_check)
    }

    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let _gate = self.gate();
        let mut entry = self
            .reservations
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        guard_status(entry.status, from, to)?;
        entry.status = to;
        entry.updated_at = updated_at;
        Ok(entry.clone())
    }

    async fn purge_cancelled(&self, before: NaiveDate) -> DomainResult<u64> {
        let _gate = self.gate();
        let before_len = self.reservations.len();
        self.reservations
            .retain(|_, r| !(r.status == ReservationStatus::Cancelled && r.date < before));
        Ok((before_len - self.reservations.len()) as u64)
    }
}

#[async_trait]
impl UserRepositoryInterface for InMemoryStorage {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let _gate = self.gate();
        if self.email_taken(&dto.email, None) {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                dto.email
            )));
        }

        let now = Utc::now();
        let id = self.user_counter.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            name: dto.name,
            email: dto.email,
            phone: dto.phone,
            unit: dto.unit,
            password_hash: dto.password_hash,
            role: dto.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, limit) = validate_pagination(dto.page, dto.page_size);
        let search = dto.search.as_deref().map(str::to_lowercase);

        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|e| e.value().clone())
            .filter(|u| dto.role.map_or(true, |role| u.role == role))
            .filter(|u| {
                search.as_deref().map_or(true, |s| {
                    u.name.to_lowercase().contains(s) || u.email.to_lowercase().contains(s)
                })
            })
            .collect();

        match dto.sort_by.as_deref() {
            Some("name") => users.sort_by(|a, b| a.name.cmp(&b.name)),
            Some("email") => users.sort_by(|a, b| a.email.cmp(&b.email)),
            Some("unit") => users.sort_by_key(|u| (u.unit, u.id)),
            _ => users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        }

        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().email.eq_ignore_ascii_case(email))
            .map(|e| e.value().clone()))
    }

    async fn get_user_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn update_user(&self, id: i32, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let _gate = self.gate();
        if let Some(email) = dto.email.as_deref() {
            if self.email_taken(email, Some(id)) {
                return Err(DomainError::Conflict(format!(
                    "email {} is already registered",
                    email
                )));
            }
        }

        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = dto.name {
            user.name = name;
        }
        if let Some(email) = dto.email {
            user.email = email;
        }
        if let Some(phone) = dto.phone {
            user.phone = phone;
        }
        if let Some(unit) = dto.unit {
            user.unit = unit;
        }
        if let Some(role) = dto.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_user_password(&self, id: i32, new_password_hash: &str) -> DomainResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        user.password_hash = new_password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> DomainResult<()> {
        let _gate = self.gate();
        self.users
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        self.reservations.retain(|_, r| r.user_id != id);
        Ok(())
    }
}

/// Repository provider backed by [`InMemoryStorage`]
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    storage: InMemoryStorage,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryRepositoryProvider {
    fn reservations(&self) -> &dyn ReservationRepository {
        &self.storage
    }

    fn users(&self) -> &dyn UserRepositoryInterface {
        &self.storage
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
