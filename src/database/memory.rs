use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::store::{
    Document, DocumentCollection, Filter, StoreError, StoreResult, Update, document_id,
};

/// In-process collection used for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find(&self, filter: &Filter) -> StoreResult<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn insert_one(&self, document: Document) -> StoreResult<()> {
        let id = document_id(&document)?.to_string();
        let mut documents = self.documents.write().await;

        if documents
            .iter()
            .any(|existing| document_id(existing).is_ok_and(|existing_id| existing_id == id))
        {
            return Err(StoreError::Unacknowledged(format!(
                "document {} already exists",
                id
            )));
        }

        documents.push(document);
        Ok(())
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        let applied = documents
            .iter_mut()
            .find(|document| filter.matches(document))
            .is_some_and(|document| update.apply(document));

        Ok(u64::from(applied))
    }

    async fn delete_one(&self, filter: &Filter) -> StoreResult<u64> {
        let mut documents = self.documents.write().await;
        match documents.iter().position(|document| filter.matches(document)) {
            Some(position) => {
                documents.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
