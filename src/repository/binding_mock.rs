#![allow(clippy::significant_drop_tightening)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AccessError;

use super::binding::{ClusterBinding, ClusterBindingRepository, CreateClusterBinding};

/// In-memory membership store with buffered transactions.
///
/// Records are keyed by `(cluster_ref, user_ref)`. Writes made through a
/// transaction are staged and only applied to `bindings` on commit.
/// Uniqueness is checked both when a write is staged
/// and again at commit, so two transactions racing to create the same
/// record cannot both commit.
#[derive(Clone, Default)]
pub struct MockClusterBindingRepository {
    pub bindings: Arc<Mutex<Vec<ClusterBinding>>>,
}

#[derive(Debug, Default)]
pub struct MockBindingTx {
    staged: Vec<StagedOp>,
}

/// `(cluster_ref, user_ref)`
type RecordKey = (String, String);

fn record_key(cluster: &str, username: &str) -> RecordKey {
    (cluster.to_owned(), username.to_owned())
}

fn has_key(binding: &ClusterBinding, key: &RecordKey) -> bool {
    binding.cluster_ref == key.0 && binding.user_ref == key.1
}

#[derive(Debug, Clone)]
enum StagedOp {
    Create(ClusterBinding),
    Touch(RecordKey, DateTime<Utc>),
    Delete(RecordKey),
}

impl MockClusterBindingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn committed(&self) -> Result<Vec<ClusterBinding>, AccessError> {
        let bindings = self
            .bindings
            .lock()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
        Ok(bindings.clone())
    }

    /// Committed records with the transaction's staged writes applied.
    fn view(&self, tx: Option<&MockBindingTx>) -> Result<Vec<ClusterBinding>, AccessError> {
        let mut view = self.committed()?;
        if let Some(tx) = tx {
            for op in &tx.staged {
                apply(&mut view, op)?;
            }
        }
        Ok(view)
    }

    fn write(&self, op: StagedOp, tx: Option<&mut MockBindingTx>) -> Result<(), AccessError> {
        match tx {
            Some(tx) => {
                tx.staged.push(op);
                Ok(())
            }
            None => {
                let mut bindings = self
                    .bindings
                    .lock()
                    .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
                apply(&mut bindings, &op)
            }
        }
    }
}

fn apply(bindings: &mut Vec<ClusterBinding>, op: &StagedOp) -> Result<(), AccessError> {
    match op {
        StagedOp::Create(binding) => {
            let key = record_key(&binding.cluster_ref, &binding.user_ref);
            if bindings.iter().any(|b| has_key(b, &key)) {
                return Err(AccessError::AlreadyExists);
            }
            bindings.push(binding.clone());
            Ok(())
        }
        StagedOp::Touch(key, at) => {
            let binding = bindings
                .iter_mut()
                .find(|b| has_key(b, key))
                .ok_or(AccessError::NotFound)?;
            binding.updated_at = *at;
            Ok(())
        }
        StagedOp::Delete(key) => {
            bindings.retain(|b| !has_key(b, key));
            Ok(())
        }
    }
}

#[async_trait]
impl ClusterBindingRepository for MockClusterBindingRepository {
    type Tx = MockBindingTx;

    async fn begin(&self) -> Result<Self::Tx, AccessError> {
        Ok(MockBindingTx::default())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), AccessError> {
        let mut bindings = self
            .bindings
            .lock()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))?;

        let mut next = bindings.clone();
        for op in &tx.staged {
            apply(&mut next, op)?;
        }
        *bindings = next;

        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), AccessError> {
        drop(tx);
        Ok(())
    }

    async fn create(
        &self,
        data: CreateClusterBinding,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        let now = Utc::now();
        let binding = ClusterBinding {
            name: data.name(),
            cluster_ref: data.cluster_ref,
            user_ref: data.user_ref,
            created_by: data.created_by,
            certificate: data.certificate,
            created_at: now,
            updated_at: now,
        };

        let mut tx = tx;
        let mut view = self.view(tx.as_deref())?;
        let op = StagedOp::Create(binding.clone());
        apply(&mut view, &op)?;
        self.write(op, tx.as_deref_mut())?;

        Ok(binding)
    }

    async fn find_by_cluster_and_user(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        self.view(tx.as_deref())?
            .into_iter()
            .find(|b| b.cluster_ref == cluster && b.user_ref == username)
            .ok_or(AccessError::NotFound)
    }

    async fn find_by_cluster(
        &self,
        cluster: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<Vec<ClusterBinding>, AccessError> {
        let mut found: Vec<ClusterBinding> = self
            .view(tx.as_deref())?
            .into_iter()
            .filter(|b| b.cluster_ref == cluster)
            .collect();

        if found.is_empty() {
            return Err(AccessError::NotFound);
        }

        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn touch(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError> {
        let key = record_key(cluster, username);
        let mut tx = tx;
        let mut view = self.view(tx.as_deref())?;
        let op = StagedOp::Touch(key.clone(), Utc::now());
        apply(&mut view, &op)?;
        self.write(op, tx.as_deref_mut())?;

        view.into_iter()
            .find(|b| has_key(b, &key))
            .ok_or(AccessError::NotFound)
    }

    async fn delete(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<(), AccessError> {
        self.write(StagedOp::Delete(record_key(cluster, username)), tx)
    }
}
