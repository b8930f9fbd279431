// Circuit definition repository

//! # Circuit Repository
//!
//! Circuit definitions are created and edited by the admin console's CRUD
//! screens; the engine only reads them. The one write the engine performs is
//! activation: assigning a document to an inactive circuit activates it, and
//! activation is one-way.
//!
//! [`InMemoryCircuitRepository`] validates every circuit on insert, so the
//! engine can rely on definitions being well-formed (apart from runtime
//! checks such as activity that depend on the moment of the call).

use std::path::Path;

use dashmap::DashMap;
use tracing::info;

use crate::models::{Circuit, CircuitId};
use crate::{Result, WorkflowError};

/// Read access to circuit definitions, plus one-way activation
#[async_trait::async_trait]
pub trait CircuitRepository: Send + Sync {
    /// Get a circuit by id; `Ok(None)` if no such circuit exists
    async fn get_circuit(&self, id: &CircuitId) -> Result<Option<Circuit>>;

    /// List all circuits
    async fn list_circuits(&self) -> Result<Vec<Circuit>>;

    /// Mark a circuit active and return the updated definition
    ///
    /// Activating an already-active circuit is a no-op.
    async fn activate_circuit(&self, id: &CircuitId) -> Result<Circuit>;
}

/// In-memory circuit definitions for development, tests and file-backed setups
#[derive(Default)]
pub struct InMemoryCircuitRepository {
    circuits: DashMap<CircuitId, Circuit>,
}

impl InMemoryCircuitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from definitions, validating each one
    pub fn with_circuits(circuits: Vec<Circuit>) -> Result<Self> {
        let repository = Self::new();
        for circuit in circuits {
            repository.insert(circuit)?;
        }
        Ok(repository)
    }

    /// Load definitions from a JSON file holding an array of circuits
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let circuits: Vec<Circuit> = serde_json::from_str(&raw)?;
        let count = circuits.len();
        let repository = Self::with_circuits(circuits)?;

        info!(path = %path.display(), count, "Loaded circuit definitions");
        Ok(repository)
    }

    /// Insert or replace a definition after validating it
    pub fn insert(&self, circuit: Circuit) -> Result<()> {
        circuit.validate()?;
        self.circuits.insert(circuit.id.clone(), circuit);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}

#[async_trait::async_trait]
impl CircuitRepository for InMemoryCircuitRepository {
    async fn get_circuit(&self, id: &CircuitId) -> Result<Option<Circuit>> {
        Ok(self.circuits.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_circuits(&self) -> Result<Vec<Circuit>> {
        let mut circuits: Vec<Circuit> = self
            .circuits
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        circuits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(circuits)
    }

    async fn activate_circuit(&self, id: &CircuitId) -> Result<Circuit> {
        let mut entry = self
            .circuits
            .get_mut(id)
            .ok_or_else(|| WorkflowError::CircuitNotFound {
                circuit_id: id.clone(),
            })?;

        if !entry.is_active {
            entry.is_active = true;
            info!(circuit_id = %id, "Circuit activated");
        }

        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Step;
    use std::io::Write;

    fn circuit(id: &str) -> Circuit {
        Circuit::new(id, "Test", true)
            .with_step(Step::new(format!("{id}-s0"), "s0", 0).final_step())
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let repository =
            InMemoryCircuitRepository::with_circuits(vec![circuit("b"), circuit("a")]).unwrap();

        assert!(repository.get_circuit(&"a".into()).await.unwrap().is_some());
        assert!(repository.get_circuit(&"zzz".into()).await.unwrap().is_none());

        let ids: Vec<String> = repository
            .list_circuits()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.0)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_malformed_circuit() {
        let repository = InMemoryCircuitRepository::new();
        let result = repository.insert(Circuit::new("empty", "Empty", true));
        assert!(matches!(result, Err(WorkflowError::MalformedCircuit { .. })));
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_activation_is_one_way_and_idempotent() {
        let repository = InMemoryCircuitRepository::with_circuits(vec![circuit("a")]).unwrap();

        let activated = repository.activate_circuit(&"a".into()).await.unwrap();
        assert!(activated.is_active);
        let again = repository.activate_circuit(&"a".into()).await.unwrap();
        assert!(again.is_active);

        let missing = repository.activate_circuit(&"nope".into()).await;
        assert!(matches!(missing, Err(WorkflowError::CircuitNotFound { .. })));
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&vec![circuit("from-file")]).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let repository = InMemoryCircuitRepository::from_json_file(file.path()).unwrap();
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = InMemoryCircuitRepository::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(WorkflowError::Configuration(_))));
    }
}
