use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{
        MatchEntity, MatchPatch, NewMatchEntity, NewPointEntity, NewSetEntity, PointEntity,
        SetEntity, SetPatch,
    },
    score_gateway::ScoreGateway,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchMatchDocument, CouchPointDocument, CouchSetDocument, DocumentRevision, FindResponse,
        SET_KIND, match_doc_id, point_doc_id, set_doc_id,
    },
};

/// Mango queries return 25 documents unless told otherwise.
const FIND_LIMIT: usize = 1_000;

#[derive(Clone)]
pub struct CouchScoreGateway {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchScoreGateway {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseCreate {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn require_document<T>(&self, doc_id: &str) -> CouchResult<T>
    where
        T: DeserializeOwned,
    {
        self.get_document::<T>(doc_id)
            .await?
            .ok_or_else(|| CouchDaoError::MissingDocument {
                doc_id: doc_id.to_string(),
            })
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<()> {
        let DocumentRevision { rev } = self.require_document(doc_id).await?;

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn find_documents<T>(&self, selector: Value) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const FIND: &str = "_find";
        let body = json!({ "selector": selector, "limit": FIND_LIMIT });

        let response = self
            .request(Method::POST, FIND)
            .json(&body)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: FIND.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: FIND.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<FindResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: FIND.to_string(),
                source,
            }
        })?;

        payload
            .docs
            .into_iter()
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: FIND.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn sets_of(&self, selector: Value) -> CouchResult<Vec<SetEntity>> {
        let mut sets = self
            .find_documents::<CouchSetDocument>(selector)
            .await?
            .into_iter()
            .map(SetEntity::from)
            .collect::<Vec<_>>();
        sets.sort_by_key(|set| set.set_number);
        Ok(sets)
    }
}

impl ScoreGateway for CouchScoreGateway {
    fn create_match(
        &self,
        new_match: NewMatchEntity,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let entity = new_match.into_entity(Uuid::new_v4());
            let doc = CouchMatchDocument::from((entity.clone(), None));
            store.put_document(&doc.id, &doc).await?;
            Ok(entity)
        })
    }

    fn update_match(
        &self,
        id: Uuid,
        patch: MatchPatch,
    ) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = match_doc_id(id);
            let existing = store
                .require_document::<CouchMatchDocument>(&doc_id)
                .await?;
            let rev = existing.rev.clone();
            let mut entity = MatchEntity::from(existing);
            entity.apply(patch);
            let doc = CouchMatchDocument::from((entity.clone(), rev));
            store.put_document(&doc_id, &doc).await?;
            Ok(entity)
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let maybe_doc = store
                .get_document::<CouchMatchDocument>(&match_doc_id(id))
                .await?;
            Ok(maybe_doc.map(MatchEntity::from))
        })
    }

    fn list_sets_by_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let selector = json!({ "kind": SET_KIND, "match_id": match_id });
            Ok(store.sets_of(selector).await?)
        })
    }

    fn create_set(&self, new_set: NewSetEntity) -> BoxFuture<'static, StorageResult<SetEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let selector = json!({
                "kind": SET_KIND,
                "match_id": new_set.match_id,
                "set_number": new_set.set_number,
            });
            if !store.sets_of(selector).await?.is_empty() {
                return Err(CouchDaoError::DuplicateSet {
                    match_id: new_set.match_id,
                    set_number: new_set.set_number,
                }
                .into());
            }

            let entity = new_set.into_entity(Uuid::new_v4());
            let doc = CouchSetDocument::from((entity.clone(), None));
            store.put_document(&doc.id, &doc).await?;
            debug!(set_id = %entity.id, set_number = entity.set_number, "created set document");
            Ok(entity)
        })
    }

    fn update_set(
        &self,
        id: Uuid,
        patch: SetPatch,
    ) -> BoxFuture<'static, StorageResult<SetEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = set_doc_id(id);
            let existing = store.require_document::<CouchSetDocument>(&doc_id).await?;
            let rev = existing.rev.clone();
            let mut entity = SetEntity::from(existing);
            entity.apply(patch);
            let doc = CouchSetDocument::from((entity.clone(), rev));
            store.put_document(&doc_id, &doc).await?;
            Ok(entity)
        })
    }

    fn delete_set(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.delete_document(&set_doc_id(id)).await?) })
    }

    fn create_point(
        &self,
        new_point: NewPointEntity,
    ) -> BoxFuture<'static, StorageResult<PointEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let entity = new_point.into_entity(Uuid::new_v4());
            let doc = CouchPointDocument::from(entity.clone());
            store.put_document(&doc.id, &doc).await?;
            Ok(entity)
        })
    }

    fn delete_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.delete_document(&point_doc_id(id)).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let mut builder = store.client.get(&url);
            if let Some((ref user, ref pass)) = store.auth {
                builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
            }

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }
}
