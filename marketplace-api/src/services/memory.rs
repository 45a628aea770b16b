//! In-process store used by tests and local runs without MongoDB.
//!
//! Mirrors the unique indexes of the Mongo store (user email, payment
//! bookingId) and can be told to fail booking settlement so the
//! payment-then-booking gap can be exercised.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::{Booking, Category, Payment, Product, Role, User, VerificationStatus};
use crate::services::store::{
    BookingStore, Catalog, DeleteOutcome, InsertOutcome, PaymentLedger, StoreError, StoreResult,
    UpdateOutcome, UserDirectory,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    bookings: BTreeMap<String, Booking>,
    payments: BTreeMap<String, Payment>,
    categories: BTreeMap<String, Category>,
    products: BTreeMap<String, Product>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    transactional: bool,
    fail_settlement: AtomicBool,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `settle_atomically` applies both writes or neither.
    pub fn transactional() -> Self {
        Self {
            transactional: true,
            ..Self::default()
        }
    }

    /// Make every booking settlement write fail until switched back.
    pub fn fail_settlement(&self, fail: bool) {
        self.fail_settlement.store(fail, Ordering::SeqCst);
    }

    /// Make every operation fail as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn seed_user(&self, user: User) {
        if let Ok(mut t) = self.tables.lock() {
            t.users.insert(user.id.clone(), user);
        }
    }

    pub fn seed_booking(&self, booking: Booking) {
        if let Ok(mut t) = self.tables.lock() {
            t.bookings.insert(booking.id.clone(), booking);
        }
    }

    pub fn seed_category(&self, category: Category) {
        if let Ok(mut t) = self.tables.lock() {
            t.categories.insert(category.id.clone(), category);
        }
    }

    pub fn booking(&self, id: &str) -> Option<Booking> {
        self.tables.lock().ok()?.bookings.get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.tables.lock().ok()?.users.get(id).cloned()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.tables
            .lock()
            .map(|t| t.payments.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().map(|t| t.users.len()).unwrap_or(0)
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("store is offline")));
        }
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("In-memory store mutex poisoned: {}", e)))
    }

    fn check_settlement(&self) -> StoreResult<()> {
        if self.fail_settlement.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "booking settlement write failed"
            )));
        }
        Ok(())
    }
}

fn payment_exists_for(tables: &Tables, booking_id: &str) -> bool {
    tables.payments.values().any(|p| p.booking_id == booking_id)
}

fn settle(tables: &mut Tables, booking_id: &str, transaction_id: &str) -> UpdateOutcome {
    match tables.bookings.get_mut(booking_id) {
        Some(booking) => {
            let modified = !booking.paid || booking.transaction_id.as_deref() != Some(transaction_id);
            booking.paid = true;
            booking.transaction_id = Some(transaction_id.to_string());
            UpdateOutcome::new(1, u64::from(modified), None)
        }
        None => UpdateOutcome::new(0, 0, None),
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    /// Records upserted by `set_role` carry no email and are never matched.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| !u.email.is_empty() && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(id).cloned())
    }

    async fn insert(&self, user: &User) -> StoreResult<InsertOutcome> {
        let mut t = self.tables()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        t.users.insert(user.id.clone(), user.clone());
        Ok(InsertOutcome::new(user.id.clone()))
    }

    async fn set_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome> {
        let mut t = self.tables()?;
        match t.users.get_mut(id) {
            Some(user) => {
                let modified = user.role != role;
                user.role = role;
                Ok(UpdateOutcome::new(1, u64::from(modified), None))
            }
            None => {
                t.users.insert(
                    id.to_string(),
                    User {
                        id: id.to_string(),
                        email: String::new(),
                        name: None,
                        role,
                        verification_status: VerificationStatus::Unverified,
                    },
                );
                Ok(UpdateOutcome::new(0, 0, Some(id.to_string())))
            }
        }
    }

    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> StoreResult<UpdateOutcome> {
        let mut t = self.tables()?;
        Ok(match t.users.get_mut(id) {
            Some(user) => {
                let modified = user.verification_status != status;
                user.verification_status = status;
                UpdateOutcome::new(1, u64::from(modified), None)
            }
            None => UpdateOutcome::new(0, 0, None),
        })
    }

    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let removed = self.tables()?.users.remove(id);
        Ok(DeleteOutcome::new(u64::from(removed.is_some())))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert(&self, booking: &Booking) -> StoreResult<InsertOutcome> {
        self.tables()?
            .bookings
            .insert(booking.id.clone(), booking.clone());
        Ok(InsertOutcome::new(booking.id.clone()))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Booking>> {
        Ok(self.tables()?.bookings.get(id).cloned())
    }

    async fn list(&self, email: Option<&str>) -> StoreResult<Vec<Booking>> {
        Ok(self
            .tables()?
            .bookings
            .values()
            .filter(|b| email.map_or(true, |e| b.email == e))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let removed = self.tables()?.bookings.remove(id);
        Ok(DeleteOutcome::new(u64::from(removed.is_some())))
    }

    async fn record_intent(&self, id: &str, intent_id: &str) -> StoreResult<UpdateOutcome> {
        let mut t = self.tables()?;
        Ok(match t.bookings.get_mut(id) {
            Some(booking) if !booking.paid => {
                booking.intent_id = Some(intent_id.to_string());
                UpdateOutcome::new(1, 1, None)
            }
            _ => UpdateOutcome::new(0, 0, None),
        })
    }
}

#[async_trait]
impl PaymentLedger for InMemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome> {
        let mut t = self.tables()?;
        if payment_exists_for(&t, &payment.booking_id) {
            return Err(StoreError::Duplicate(format!(
                "payment for booking {}",
                payment.booking_id
            )));
        }
        t.payments.insert(payment.id.clone(), payment.clone());
        Ok(InsertOutcome::new(payment.id.clone()))
    }

    async fn mark_booking_paid(
        &self,
        booking_id: &str,
        transaction_id: &str,
    ) -> StoreResult<UpdateOutcome> {
        self.check_settlement()?;
        let mut t = self.tables()?;
        Ok(settle(&mut t, booking_id, transaction_id))
    }

    async fn settle_atomically(&self, payment: &Payment) -> StoreResult<Option<InsertOutcome>> {
        if !self.transactional {
            return Ok(None);
        }

        let mut t = self.tables()?;
        if payment_exists_for(&t, &payment.booking_id) {
            return Err(StoreError::Duplicate(format!(
                "payment for booking {}",
                payment.booking_id
            )));
        }
        if !t.bookings.contains_key(&payment.booking_id) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "Booking {} disappeared during settlement",
                payment.booking_id
            )));
        }
        // Nothing has been written yet, so a failure here leaves no trace.
        self.check_settlement()?;

        t.payments.insert(payment.id.clone(), payment.clone());
        settle(&mut t, &payment.booking_id, &payment.transaction_id);
        Ok(Some(InsertOutcome::new(payment.id.clone())))
    }

    async fn payment_for_booking(&self, booking_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .tables()?
            .payments
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn payments_for_email(&self, email: &str) -> StoreResult<Vec<Payment>> {
        Ok(self
            .tables()?
            .payments
            .values()
            .filter(|p| p.email == email)
            .cloned()
            .collect())
    }

    async fn unsettled_payments(&self) -> StoreResult<Vec<Payment>> {
        let t = self.tables()?;
        Ok(t.payments
            .values()
            .filter(|p| !t.bookings.get(&p.booking_id).is_some_and(|b| b.paid))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tables()?.categories.values().cloned().collect())
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.tables()?.products.values().cloned().collect())
    }

    async fn products_in_category(&self, category_id: &str) -> StoreResult<Vec<Product>> {
        Ok(self
            .tables()?
            .products
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn products_by_seller(&self, email: &str) -> StoreResult<Vec<Product>> {
        Ok(self
            .tables()?
            .products
            .values()
            .filter(|p| p.email == email)
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<InsertOutcome> {
        self.tables()?
            .products
            .insert(product.id.clone(), product.clone());
        Ok(InsertOutcome::new(product.id.clone()))
    }

    async fn delete_product(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let removed = self.tables()?.products.remove(id);
        Ok(DeleteOutcome::new(u64::from(removed.is_some())))
    }
}
