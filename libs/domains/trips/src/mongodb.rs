//! MongoDB implementation of TripDocumentStore

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Bson, Document, doc},
    options::IndexOptions,
};
use serde_json::Value;
use tracing::instrument;

use crate::error::{TripError, TripResult};
use crate::models::{TRIP_ID_FIELD, TripDocument};
use crate::repository::TripDocumentStore;

/// Collection holding one document per trip
pub const TRIPS_COLLECTION: &str = "corridas";

/// Trip documents stored verbatim, keyed by `id_corrida`
#[derive(Clone)]
pub struct MongoTripStore {
    collection: Collection<Document>,
}

impl MongoTripStore {
    pub fn new(db: Database) -> Self {
        Self::with_collection(db, TRIPS_COLLECTION)
    }

    pub fn with_collection(db: Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Document>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// Create the unique `id_corrida` index
    pub async fn create_indexes(&self) -> TripResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { TRIP_ID_FIELD: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection.create_index(index).await?;
        Ok(())
    }

    /// Serialize the payload as is. `$`-prefixed keys are not read as extended JSON.
    fn to_bson_document(document: &TripDocument) -> TripResult<Document> {
        bson::to_document(document).map_err(|e| TripError::DocumentStore(e.to_string()))
    }

    fn to_bson_value(value: &Value) -> TripResult<Bson> {
        bson::to_bson(value).map_err(|e| TripError::DocumentStore(e.to_string()))
    }

    /// Convert a stored document back to JSON, dropping `_id`
    fn from_bson_document(mut doc: Document) -> TripDocument {
        doc.remove("_id");
        match Bson::Document(doc).into_relaxed_extjson() {
            Value::Object(map) => map,
            _ => TripDocument::new(),
        }
    }

    async fn find_many(&self, filter: Document, limit: i64) -> TripResult<Vec<TripDocument>> {
        let cursor = self
            .collection
            .find(filter)
            .projection(doc! { "_id": 0 })
            .limit(limit)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        Ok(docs.into_iter().map(Self::from_bson_document).collect())
    }
}

#[async_trait]
impl TripDocumentStore for MongoTripStore {
    #[instrument(skip(self, document), fields(match_value = %match_value))]
    async fn upsert(
        &self,
        match_key: &str,
        match_value: &Value,
        document: &TripDocument,
    ) -> TripResult<()> {
        let filter = doc! { match_key: Self::to_bson_value(match_value)? };
        let update = doc! { "$set": Self::to_bson_document(document)? };

        let result = self.collection.update_one(filter, update).upsert(true).await?;

        tracing::debug!(
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Trip document upserted"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, trip_id: &Value) -> TripResult<Option<TripDocument>> {
        let filter = doc! { TRIP_ID_FIELD: Self::to_bson_value(trip_id)? };
        let doc = self.collection.find_one(filter).await?;
        Ok(doc.map(Self::from_bson_document))
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: i64) -> TripResult<Vec<TripDocument>> {
        self.find_many(doc! {}, limit).await
    }

    #[instrument(skip(self))]
    async fn list_by_field(
        &self,
        field: &str,
        value: &Value,
        limit: i64,
    ) -> TripResult<Vec<TripDocument>> {
        let filter = doc! { field: Self::to_bson_value(value)? };
        self.find_many(filter, limit).await
    }
}
