#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fhir_bundle_validator::error::{IngestionError, Result};
use fhir_bundle_validator::object_store::{ListPage, ObjectStore, StoredObject};

/// Mock object store serving fixed listing pages without any network calls
#[derive(Clone, Default)]
pub struct MockObjectStore {
    pages: Arc<Mutex<Vec<Vec<String>>>>,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    request_log: Arc<Mutex<Vec<StoreRequest>>>,
    failing_page: Arc<Mutex<Option<usize>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreRequest {
    List { continuation_token: Option<String> },
    Get { key: String },
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listing page; every key gets an object with `body`
    pub fn with_page(self, keys: &[(&str, &str)]) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            for (key, body) in keys {
                objects.insert(key.to_string(), body.as_bytes().to_vec());
            }
        }
        self.pages
            .lock()
            .unwrap()
            .push(keys.iter().map(|(key, _)| key.to_string()).collect());
        self
    }

    pub fn fail_listing_on_page(self, index: usize) -> Self {
        *self.failing_page.lock().unwrap() = Some(index);
        self
    }

    pub fn fail_fetch(self, key: &str) -> Self {
        self.failing_keys.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn requests(&self) -> Vec<StoreRequest> {
        self.request_log.lock().unwrap().clone()
    }

    pub fn list_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, StoreRequest::List { .. }))
            .count()
    }

    pub fn fetched_keys(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                StoreRequest::Get { key } => Some(key),
                StoreRequest::List { .. } => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.request_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        self.request_log.lock().unwrap().push(StoreRequest::List {
            continuation_token: continuation_token.clone(),
        });

        let index = continuation_token
            .as_deref()
            .and_then(|token| token.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        if *self.failing_page.lock().unwrap() == Some(index) {
            return Err(IngestionError::Listing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                details: "AccessDenied".to_string(),
            });
        }

        let pages = self.pages.lock().unwrap();
        let keys = pages
            .get(index)
            .map(|keys| {
                keys.iter()
                    .filter(|key| key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let continuation_token = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));

        Ok(ListPage {
            keys,
            continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        self.request_log.lock().unwrap().push(StoreRequest::Get {
            key: key.to_string(),
        });

        let fetch_error = |details: &str| IngestionError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            details: details.to_string(),
        };

        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(fetch_error("InternalError"));
        }

        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .map(StoredObject::new)
            .ok_or_else(|| fetch_error("NoSuchKey"))
    }
}
