use crate::{ContentStore, Result, StoredObject};
use std::sync::Arc;

#[derive(Clone)]
pub struct ListFilesOperation {
    store: Arc<ContentStore>,
}

#[derive(Debug, Clone)]
pub struct ListFilesOperationResult {
    pub items: Vec<StoredObject>,
}

impl ListFilesOperation {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<ListFilesOperationResult> {
        let items = self.store.list().await?;
        Ok(ListFilesOperationResult { items })
    }
}
