//! ChromaDB client over the v2 REST API.
//!
//! Embeddings are computed by the AI service and sent with each write and
//! query; the Chroma collection itself has no embedding function.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::record::{from_chroma_metadata, to_chroma_metadata};
use super::{ScoredCv, StoredCv, VectorDbError, VectorStore};
use crate::config::Config;
use crate::models::cv::CvDocument;

const REQUEST_TIMEOUT_SECS: u64 = 30;

type Metadata = Map<String, Value>;

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
    documents: [&'a str; 1],
    metadatas: [Metadata; 1],
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct GetRequest {
    include: &'static [&'static str],
}

/// Column-oriented batch as returned by `query`: one inner list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Clone)]
pub struct ChromaStore {
    client: Client,
    /// `{url}/api/v2/tenants/{tenant}/databases/{database}`
    database_url: String,
    collection_id: String,
    collection_name: String,
}

impl ChromaStore {
    /// Checks the server heartbeat, then gets or creates the collection.
    pub async fn connect(config: &Config) -> Result<Self, VectorDbError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        info!("Connecting to ChromaDB at {}", config.chroma_url);
        let heartbeat = format!("{}/api/v2/heartbeat", config.chroma_url);
        let _: Value = send(client.get(&heartbeat)).await?;

        let database_url = format!(
            "{}/api/v2/tenants/{}/databases/{}",
            config.chroma_url, config.chroma_tenant, config.chroma_database
        );

        let collection: CollectionResponse = send(
            client
                .post(format!("{database_url}/collections"))
                .json(&CreateCollectionRequest {
                    name: &config.collection_name,
                    get_or_create: true,
                }),
        )
        .await?;

        let store = Self {
            client,
            database_url,
            collection_id: collection.id,
            collection_name: collection.name,
        };

        let count = store.count().await?;
        info!(
            "Using collection '{}' ({}) with {} documents",
            store.collection_name, store.collection_id, count
        );

        Ok(store)
    }

    fn collection_url(&self, op: &str) -> String {
        format!(
            "{}/collections/{}/{}",
            self.database_url, self.collection_id, op
        )
    }
}

/// Sends a request and decodes the JSON body, surfacing non-2xx bodies as API errors.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, VectorDbError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(VectorDbError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add_document(&self, cv: StoredCv) -> Result<(), VectorDbError> {
        let request = AddRequest {
            ids: [&cv.id],
            embeddings: [&cv.embedding],
            documents: [&cv.text],
            metadatas: [to_chroma_metadata(&cv.filename, &cv.metadata, cv.uploaded_at)],
        };
        let _: Value = send(self.client.post(self.collection_url("add")).json(&request)).await?;
        info!("Added document {} to vector database", cv.id);
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<ScoredCv>, VectorDbError> {
        let request = QueryRequest {
            query_embeddings: [embedding],
            n_results,
            include: &["documents", "metadatas", "distances"],
        };
        let response: QueryResponse =
            send(self.client.post(self.collection_url("query")).json(&request)).await?;
        let hits = scored_from_query(response)?;
        debug!(
            "Vector query returned {} hits: {:?}",
            hits.len(),
            hits.iter().map(|h| h.distance).collect::<Vec<_>>()
        );
        Ok(hits)
    }

    async fn get_all(&self) -> Result<Vec<CvDocument>, VectorDbError> {
        let request = GetRequest {
            include: &["documents", "metadatas"],
        };
        let response: GetResponse =
            send(self.client.post(self.collection_url("get")).json(&request)).await?;
        documents_from_get(response)
    }

    async fn count(&self) -> Result<usize, VectorDbError> {
        send(self.client.get(self.collection_url("count"))).await
    }

    fn name(&self) -> &str {
        "chroma"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response assembly
// ────────────────────────────────────────────────────────────────────────────

fn build_document(id: String, content: Option<String>, metadata: Option<&Metadata>) -> CvDocument {
    let record = from_chroma_metadata(metadata);
    CvDocument {
        id,
        filename: record.filename,
        content: content.unwrap_or_default(),
        metadata: record.metadata,
        uploaded_at: record.uploaded_at,
    }
}

fn check_len<T>(column: &Option<Vec<T>>, expected: usize, name: &str) -> Result<(), VectorDbError> {
    match column {
        Some(values) if values.len() != expected => Err(VectorDbError::Malformed(format!(
            "{name} has {} entries for {expected} ids",
            values.len()
        ))),
        _ => Ok(()),
    }
}

fn scored_from_query(response: QueryResponse) -> Result<Vec<ScoredCv>, VectorDbError> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response.documents.and_then(|d| d.into_iter().next());
    let metadatas = response.metadatas.and_then(|m| m.into_iter().next());
    let distances = response.distances.and_then(|d| d.into_iter().next());

    check_len(&documents, ids.len(), "documents")?;
    check_len(&metadatas, ids.len(), "metadatas")?;
    check_len(&distances, ids.len(), "distances")?;

    let mut documents = documents.map(Vec::into_iter);
    let mut distances = distances.map(Vec::into_iter);

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let content = documents.as_mut().and_then(|d| d.next()).flatten();
            let metadata = metadatas.as_ref().and_then(|m| m[i].as_ref());
            let distance = distances.as_mut().and_then(|d| d.next()).flatten();
            ScoredCv {
                document: build_document(id, content, metadata),
                distance,
            }
        })
        .collect())
}

fn documents_from_get(response: GetResponse) -> Result<Vec<CvDocument>, VectorDbError> {
    let GetResponse {
        ids,
        documents,
        metadatas,
    } = response;

    check_len(&documents, ids.len(), "documents")?;
    check_len(&metadatas, ids.len(), "metadatas")?;

    let mut documents = documents.map(Vec::into_iter);

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let content = documents.as_mut().and_then(|d| d.next()).flatten();
            let metadata = metadatas.as_ref().and_then(|m| m[i].as_ref());
            build_document(id, content, metadata)
        })
        .collect())
}
