//! MongoDB-backed implementation of the storage seams.

use async_trait::async_trait;
use futures::TryStreamExt;
use marketplace_core::error::AppError;
use mongodb::{
    bson::{self, doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, UpdateOptions},
    Client, ClientSession, Collection, Database, IndexModel,
};
use secrecy::ExposeSecret;

use crate::config::DatabaseConfig;
use crate::models::{Booking, Category, Payment, Product, Role, User, VerificationStatus};
use crate::services::store::{
    BookingStore, Catalog, DeleteOutcome, InsertOutcome, PaymentLedger, StoreError, StoreResult,
    UpdateOutcome, UserDirectory,
};

pub const USERS: &str = "users";
pub const BOOKINGS: &str = "bookings";
pub const PAYMENTS: &str = "payments";
pub const CATEGORIES: &str = "categories";
pub const PRODUCTS: &str = "products";

const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let duplicate = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
            ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
            _ => false,
        };

        if duplicate {
            StoreError::Duplicate(err.to_string())
        } else {
            StoreError::Backend(anyhow::Error::new(err))
        }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
    transactions: bool,
}

impl MongoStore {
    pub async fn connect(config: &DatabaseConfig, app_name: &str) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(config.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::from(e)
            })?;
        client_options.app_name = Some(app_name.to_string());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.db_name);

        tracing::info!(
            database = %config.db_name,
            transactions = config.transactions,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            db,
            transactions: config.transactions,
        })
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn user_collection(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn booking_collection(&self) -> Collection<Booking> {
        self.db.collection(BOOKINGS)
    }

    fn payment_collection(&self) -> Collection<Payment> {
        self.db.collection(PAYMENTS)
    }

    fn category_collection(&self) -> Collection<Category> {
        self.db.collection(CATEGORIES)
    }

    fn product_collection(&self) -> Collection<Product> {
        self.db.collection(PRODUCTS)
    }

    /// Unique emails, one payment per booking, and the lookup keys used by listings.
    pub async fn init_indexes(&self) -> anyhow::Result<()> {
        let user_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_email_unique".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "email": { "$exists": true } })
                    .build(),
            )
            .build();
        let user_role = IndexModel::builder()
            .keys(doc! { "role": 1 })
            .options(IndexOptions::builder().name("user_role_idx".to_string()).build())
            .build();
        self.user_collection()
            .create_indexes([user_email, user_role], None)
            .await?;

        let payment_booking = IndexModel::builder()
            .keys(doc! { "bookingId": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_booking_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        let payment_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().name("payment_email_idx".to_string()).build())
            .build();
        self.payment_collection()
            .create_indexes([payment_booking, payment_email], None)
            .await?;

        let booking_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().name("booking_email_idx".to_string()).build())
            .build();
        self.booking_collection().create_index(booking_email, None).await?;

        let product_category = IndexModel::builder()
            .keys(doc! { "category_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("product_category_idx".to_string())
                    .build(),
            )
            .build();
        let product_seller = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().name("product_seller_idx".to_string()).build())
            .build();
        self.product_collection()
            .create_indexes([product_category, product_seller], None)
            .await?;

        tracing::info!("Marketplace indexes initialized");
        Ok(())
    }

    async fn settle_in_session(
        &self,
        payment: &Payment,
        session: &mut ClientSession,
    ) -> StoreResult<InsertOutcome> {
        self.payment_collection()
            .insert_one_with_session(payment, None, session)
            .await?;

        let updated = self
            .booking_collection()
            .update_one_with_session(
                doc! { "_id": payment.booking_id.as_str() },
                paid_update(&payment.transaction_id),
                None,
                session,
            )
            .await?;

        if updated.matched_count == 0 {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "Booking {} disappeared during settlement",
                payment.booking_id
            )));
        }

        Ok(InsertOutcome::new(payment.id.clone()))
    }
}

fn paid_update(transaction_id: &str) -> Document {
    doc! { "$set": { "paid": true, "transactionId": transaction_id } }
}

fn upserted_id(id: Option<Bson>) -> Option<String> {
    id.and_then(|b| b.as_str().map(str::to_string))
}

fn to_bson<T: serde::Serialize>(value: &T) -> StoreResult<Bson> {
    bson::to_bson(value).map_err(|e| StoreError::Backend(anyhow::Error::new(e)))
}

#[async_trait]
impl UserDirectory for MongoStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.user_collection().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.user_collection().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert(&self, user: &User) -> StoreResult<InsertOutcome> {
        self.user_collection().insert_one(user, None).await?;
        Ok(InsertOutcome::new(user.id.clone()))
    }

    async fn set_role(&self, id: &str, role: Role) -> StoreResult<UpdateOutcome> {
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .user_collection()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "role": to_bson(&role)? } },
                options,
            )
            .await?;

        Ok(UpdateOutcome::new(
            result.matched_count,
            result.modified_count,
            upserted_id(result.upserted_id),
        ))
    }

    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> StoreResult<UpdateOutcome> {
        let result = self
            .user_collection()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "verificationStatus": to_bson(&status)? } },
                None,
            )
            .await?;

        Ok(UpdateOutcome::new(
            result.matched_count,
            result.modified_count,
            None,
        ))
    }

    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let filter = doc! { "role": { "$in": role.stored_spellings().to_vec() } };
        let cursor = self.user_collection().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let result = self.user_collection().delete_one(doc! { "_id": id }, None).await?;
        Ok(DeleteOutcome::new(result.deleted_count))
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert(&self, booking: &Booking) -> StoreResult<InsertOutcome> {
        self.booking_collection().insert_one(booking, None).await?;
        Ok(InsertOutcome::new(booking.id.clone()))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Booking>> {
        Ok(self.booking_collection().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list(&self, email: Option<&str>) -> StoreResult<Vec<Booking>> {
        let filter = email.map(|email| doc! { "email": email });
        let cursor = self.booking_collection().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let result = self.booking_collection().delete_one(doc! { "_id": id }, None).await?;
        Ok(DeleteOutcome::new(result.deleted_count))
    }

    async fn record_intent(&self, id: &str, intent_id: &str) -> StoreResult<UpdateOutcome> {
        // Never move a paid booking back to IntentCreated.
        let result = self
            .booking_collection()
            .update_one(
                doc! { "_id": id, "paid": { "$ne": true } },
                doc! { "$set": { "intentId": intent_id } },
                None,
            )
            .await?;

        Ok(UpdateOutcome::new(
            result.matched_count,
            result.modified_count,
            None,
        ))
    }
}

#[async_trait]
impl PaymentLedger for MongoStore {
    async fn insert_payment(&self, payment: &Payment) -> StoreResult<InsertOutcome> {
        self.payment_collection().insert_one(payment, None).await?;
        Ok(InsertOutcome::new(payment.id.clone()))
    }

    async fn mark_booking_paid(
        &self,
        booking_id: &str,
        transaction_id: &str,
    ) -> StoreResult<UpdateOutcome> {
        let result = self
            .booking_collection()
            .update_one(doc! { "_id": booking_id }, paid_update(transaction_id), None)
            .await?;

        Ok(UpdateOutcome::new(
            result.matched_count,
            result.modified_count,
            None,
        ))
    }

    async fn settle_atomically(&self, payment: &Payment) -> StoreResult<Option<InsertOutcome>> {
        if !self.transactions {
            return Ok(None);
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.settle_in_session(payment, &mut session).await {
            Ok(outcome) => {
                session.commit_transaction().await?;
                Ok(Some(outcome))
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort settlement transaction");
                }
                Err(e)
            }
        }
    }

    async fn payment_for_booking(&self, booking_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .payment_collection()
            .find_one(doc! { "bookingId": booking_id }, None)
            .await?)
    }

    async fn payments_for_email(&self, email: &str) -> StoreResult<Vec<Payment>> {
        let cursor = self.payment_collection().find(doc! { "email": email }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn unsettled_payments(&self) -> StoreResult<Vec<Payment>> {
        let pipeline = vec![
            doc! { "$lookup": {
                "from": BOOKINGS,
                "localField": "bookingId",
                "foreignField": "_id",
                "as": "booking"
            } },
            doc! { "$match": { "booking.paid": { "$ne": true } } },
            doc! { "$project": { "booking": 0 } },
        ];

        let cursor = self.payment_collection().aggregate(pipeline, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|d| {
                bson::from_document::<Payment>(d)
                    .map_err(|e| StoreError::Backend(anyhow::Error::new(e)))
            })
            .collect()
    }
}

#[async_trait]
impl Catalog for MongoStore {
    async fn categories(&self) -> StoreResult<Vec<Category>> {
        let cursor = self.category_collection().find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        let cursor = self.product_collection().find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn products_in_category(&self, category_id: &str) -> StoreResult<Vec<Product>> {
        let cursor = self
            .product_collection()
            .find(doc! { "category_id": category_id }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn products_by_seller(&self, email: &str) -> StoreResult<Vec<Product>> {
        let cursor = self.product_collection().find(doc! { "email": email }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<InsertOutcome> {
        self.product_collection().insert_one(product, None).await?;
        Ok(InsertOutcome::new(product.id.clone()))
    }

    async fn delete_product(&self, id: &str) -> StoreResult<DeleteOutcome> {
        let result = self.product_collection().delete_one(doc! { "_id": id }, None).await?;
        Ok(DeleteOutcome::new(result.deleted_count))
    }
}
