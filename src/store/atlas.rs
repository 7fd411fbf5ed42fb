//! MongoDB Atlas store with `$vectorSearch`

use crate::config::{Config, StoreCredentials};
use crate::error::{JobVecError, Result};
use crate::processing::record::Record;
use crate::store::{ensure_writable, NearestQuery, SearchHit, UpsertKey, UpsertOutcome, VectorStore};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::{debug, info, warn};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{ClientOptions, Credential, ReplaceOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Collection};
use std::future::Future;
use std::time::Duration;

/// Filter field the vector index must declare for source-restricted search.
const SOURCE_FIELD: &str = "source";

/// Long-lived connection to one collection. Open once per process and share.
pub struct AtlasStore {
    client: Client,
    collection: Collection<Document>,
    vector_path: String,
    dimensions: usize,
    operation_timeout: Duration,
}

impl AtlasStore {
    /// Connect, ping, and (when enabled) verify the vector index.
    /// Any failure here is a configuration problem and aborts startup.
    pub async fn connect(config: &Config, credentials: &StoreCredentials) -> Result<Self> {
        let uri = match credentials {
            StoreCredentials::Uri(uri) => uri.as_str(),
            StoreCredentials::UsernamePassword { .. } => config.store.connection_string.as_str(),
        };

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| JobVecError::Configuration(format!("Invalid connection string: {}", e)))?;

        if let StoreCredentials::UsernamePassword { username, password } = credentials {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .build(),
            );
        }
        options.app_name = Some(config.store.app_name.clone());
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());

        let client = Client::with_options(options)
            .map_err(|e| JobVecError::Configuration(format!("Failed to build store client: {}", e)))?;

        let store = Self {
            collection: client
                .database(&config.store.database)
                .collection::<Document>(&config.store.collection),
            client,
            vector_path: config.index.vector_path.clone(),
            dimensions: config.index.dimensions,
            operation_timeout: config.operation_timeout(),
        };

        store
            .ping()
            .await
            .map_err(|e| JobVecError::Configuration(format!("Store unreachable: {}", e)))?;
        info!(
            "Connected to {}.{}",
            config.store.database, config.store.collection
        );

        if config.index.verify_on_startup {
            store.verify_index(&config.index.name).await?;
        }

        Ok(store)
    }

    pub async fn ping(&self) -> Result<()> {
        let admin = self.client.database("admin");
        self.bounded(admin.run_command(doc! { "ping": 1 }, None)).await?;
        Ok(())
    }

    /// Check that the named search index exists and indexes vectors of the
    /// configured dimensionality.
    pub async fn verify_index(&self, index_name: &str) -> Result<()> {
        let pipeline = vec![doc! { "$listSearchIndexes": { "name": index_name } }];
        let cursor = self
            .bounded(self.collection.aggregate(pipeline, None))
            .await
            .map_err(|e| JobVecError::Configuration(format!("Cannot list search indexes: {}", e)))?;
        let indexes: Vec<Document> = self
            .bounded(cursor.try_collect())
            .await
            .map_err(|e| JobVecError::Configuration(format!("Cannot list search indexes: {}", e)))?;

        let index = indexes.first().ok_or_else(|| {
            JobVecError::Configuration(format!("Vector index '{}' does not exist", index_name))
        })?;

        match indexed_dimensions(index, &self.vector_path) {
            Some(dims) if dims != self.dimensions => {
                return Err(JobVecError::Configuration(format!(
                    "Index '{}' has {} dimensions on '{}', embedder produces {}",
                    index_name, dims, self.vector_path, self.dimensions
                )))
            }
            Some(_) => {}
            None => {
                return Err(JobVecError::Configuration(format!(
                    "Index '{}' has no vector field on path '{}'",
                    index_name, self.vector_path
                )))
            }
        }

        if !has_filter_field(index, SOURCE_FIELD) {
            return Err(JobVecError::Configuration(format!(
                "Index '{}' must declare '{}' as a filter field",
                index_name, SOURCE_FIELD
            )));
        }
        Ok(())
    }

    async fn bounded<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result.map_err(JobVecError::from),
            Err(_) => Err(JobVecError::Persistence(format!(
                "store operation timed out after {:?}",
                self.operation_timeout
            ))),
        }
    }
}

#[async_trait]
impl VectorStore for AtlasStore {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome> {
        let vector = ensure_writable(record, self.dimensions)?;
        let document = record_to_document(record, vector, &self.vector_path)?;

        match UpsertKey::for_record(record) {
            Some(key) => {
                let filter = key_filter(&key);
                let options = ReplaceOptions::builder().upsert(true).build();
                let result = self
                    .bounded(self.collection.replace_one(filter, document, options))
                    .await?;
                debug!("Upserted {:?} (matched {})", key, result.matched_count);
                if result.upserted_id.is_some() {
                    Ok(UpsertOutcome::Inserted)
                } else {
                    Ok(UpsertOutcome::Replaced)
                }
            }
            None => {
                self.bounded(self.collection.insert_one(document, None)).await?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn query_nearest(&self, query: &NearestQuery) -> Result<Vec<SearchHit>> {
        let pipeline = vector_search_pipeline(query, &self.vector_path);
        let cursor = self.bounded(self.collection.aggregate(pipeline, None)).await?;
        let documents: Vec<Document> = self.bounded(cursor.try_collect()).await?;

        Ok(hits_from_documents(&documents))
    }
}

/// Serialize a record with its vector as a plain array of doubles stored
/// at `vector_path`.
pub fn record_to_document(record: &Record, vector: &[f32], vector_path: &str) -> Result<Document> {
    let mut document = bson::to_document(record)?;
    document.remove("vector");
    let values: Vec<Bson> = vector.iter().map(|v| Bson::Double(f64::from(*v))).collect();
    document.insert(vector_path, Bson::Array(values));
    Ok(document)
}

fn key_filter(key: &UpsertKey) -> Document {
    match key {
        UpsertKey::Id(source, id) => doc! { "source": source.as_str(), "id": *id },
        UpsertKey::Link(source, link) => doc! { "source": source.as_str(), "link": link.as_str() },
    }
}

/// `$vectorSearch` followed by a projection carrying the search score.
pub fn vector_search_pipeline(query: &NearestQuery, vector_path: &str) -> Vec<Document> {
    let query_vector: Vec<Bson> = query
        .vector
        .iter()
        .map(|v| Bson::Double(f64::from(*v)))
        .collect();

    let mut search = doc! {
        "index": query.index_name.as_str(),
        "path": vector_path,
        "queryVector": query_vector,
        "numCandidates": query.num_candidates() as i64,
        "limit": query.limit as i64,
    };
    if let Some(source) = query.source {
        search.insert("filter", doc! { "source": source.as_str() });
    }

    vec![
        doc! { "$vectorSearch": search },
        doc! {
            "$project": {
                "_id": 1,
                "id": 1,
                "title": 1,
                "link": 1,
                "score": { "$meta": "vectorSearchScore" },
            }
        },
    ]
}

/// Documents without a numeric score are logged and skipped.
fn hits_from_documents(documents: &[Document]) -> Vec<SearchHit> {
    documents
        .iter()
        .filter_map(|document| match hit_from_document(document) {
            Ok(hit) => Some(hit),
            Err(e) => {
                warn!("Skipping search result: {}", e);
                None
            }
        })
        .collect()
}

fn hit_from_document(document: &Document) -> Result<SearchHit> {
    let score = match document.get("score") {
        Some(Bson::Double(score)) => *score,
        Some(Bson::Int32(score)) => f64::from(*score),
        Some(Bson::Int64(score)) => *score as f64,
        _ => {
            return Err(JobVecError::Persistence(
                "search result is missing a numeric score".to_string(),
            ))
        }
    };

    let identifier = match (document.get("id"), document.get("_id")) {
        (Some(Bson::Int64(id)), _) => id.to_string(),
        (Some(Bson::Int32(id)), _) => id.to_string(),
        (_, Some(Bson::ObjectId(oid))) => oid.to_hex(),
        (_, Some(other)) => other.to_string(),
        _ => String::new(),
    };

    Ok(SearchHit {
        identifier,
        title: document.get_str("title").ok().map(str::to_string),
        link: document.get_str("link").ok().map(str::to_string),
        score,
    })
}

fn has_filter_field(index: &Document, path: &str) -> bool {
    index
        .get_document("latestDefinition")
        .and_then(|definition| definition.get_array("fields"))
        .map(|fields| {
            fields.iter().filter_map(Bson::as_document).any(|field| {
                field.get_str("type").ok() == Some("filter") && field.get_str("path").ok() == Some(path)
            })
        })
        .unwrap_or(false)
}

/// `numDimensions` of the vector field at `path`, from a `$listSearchIndexes` entry.
fn indexed_dimensions(index: &Document, path: &str) -> Option<usize> {
    let definition = index
        .get_document("latestDefinition")
        .ok()?;
    let fields = definition.get_array("fields").ok()?;

    fields.iter().find_map(|field| {
        let field = field.as_document()?;
        if field.get_str("path").ok()? != path {
            return None;
        }
        match field.get("numDimensions")? {
            Bson::Int32(n) => usize::try_from(*n).ok(),
            Bson::Int64(n) => usize::try_from(*n).ok(),
            Bson::Double(n) => Some(*n as usize),
            _ => None,
        }
    })
}
