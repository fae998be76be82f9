use super::{
    AnalystSquad, Critic, QAAgent, Refinery, Steward, Worker, WorkerDeps, WorkerError,
    ANALYST_SQUAD, CRITIC, QA_AGENT, REFINERY, STEWARD,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds a live worker from shared collaborators
pub type WorkerFactory = fn(&WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError>;

/// Catalog entry describing a worker and how to construct it
#[derive(Clone)]
pub struct WorkerDescriptor {
    pub name: String,
    pub role: String,
    pub capabilities: Vec<String>,
    pub input_schema: BTreeMap<String, String>,
    pub output_schema: BTreeMap<String, String>,
    pub factory: WorkerFactory,
}

impl fmt::Debug for WorkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerDescriptor")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .finish_non_exhaustive()
    }
}

impl WorkerDescriptor {
    pub fn new(name: impl Into<String>, role: impl Into<String>, factory: WorkerFactory) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            capabilities: Vec::new(),
            input_schema: BTreeMap::new(),
            output_schema: BTreeMap::new(),
            factory,
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_input(mut self, field: &str, kind: &str) -> Self {
        self.input_schema.insert(field.to_string(), kind.to_string());
        self
    }

    pub fn with_output(mut self, field: &str, kind: &str) -> Self {
        self.output_schema.insert(field.to_string(), kind.to_string());
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Run the factory
    pub fn instantiate(&self, deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
        (self.factory)(deps).map_err(|e| match e {
            WorkerError::Construction { .. } => e,
            other => WorkerError::Construction {
                worker: self.name.clone(),
                message: other.to_string(),
            },
        })
    }
}

/// Name-keyed catalog of worker descriptors
///
/// Populated once at startup. Listing preserves registration order;
/// re-registering a name replaces the entry in place.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    entries: Vec<Arc<WorkerDescriptor>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the five built-in workers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    pub fn register(&mut self, descriptor: WorkerDescriptor) {
        debug!("Registering worker {}", descriptor.name);
        let descriptor = Arc::new(descriptor);
        match self.entries.iter_mut().find(|d| d.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.entries.push(descriptor),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<WorkerDescriptor>> {
        self.entries.iter().find(|d| d.name == name).cloned()
    }

    /// Registered names, in registration order
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name.clone()).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<WorkerDescriptor>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct every registered worker
    ///
    /// A factory failure is logged and leaves that worker out; the others
    /// are still built.
    pub fn instantiate_all(&self, deps: &WorkerDeps) -> BTreeMap<String, Arc<dyn Worker>> {
        let mut workers = BTreeMap::new();
        for descriptor in &self.entries {
            match descriptor.instantiate(deps) {
                Ok(worker) => {
                    workers.insert(descriptor.name.clone(), worker);
                }
                Err(e) => warn!("Worker {} unavailable: {}", descriptor.name, e),
            }
        }
        workers
    }
}

fn build_steward(deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
    Ok(Arc::new(Steward::new(deps.model.clone(), deps.catalog.clone())))
}

fn build_refinery(deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
    Ok(Arc::new(Refinery::new(
        deps.model.clone(),
        deps.executor.clone(),
        deps.catalog.data_dir().to_path_buf(),
    )))
}

fn build_analyst(deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
    Ok(Arc::new(AnalystSquad::new(deps.model.clone())))
}

fn build_critic(deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
    Ok(Arc::new(Critic::new(deps.model.clone())))
}

fn build_qa(deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
    Ok(Arc::new(QAAgent::new(deps.model.clone(), deps.executor.clone())))
}

/// Descriptors for the built-in workers, in workflow order
pub fn builtin_descriptors() -> Vec<WorkerDescriptor> {
    vec![
        WorkerDescriptor::new(STEWARD, "Data Ingestion & Privacy", build_steward)
            .with_capabilities(&["ingest_file", "extract_metadata"])
            .with_input("file_path", "string")
            .with_output("profile", "markdown"),
        WorkerDescriptor::new(REFINERY, "Data Cleaning", build_refinery)
            .with_capabilities(&["audit_data", "clean_data", "verify_quality"])
            .with_input("file_path", "string")
            .with_output("cleaned_file_path", "string"),
        WorkerDescriptor::new(ANALYST_SQUAD, "Data Analysis", build_analyst)
            .with_capabilities(&["univariate_analysis", "bivariate_analysis", "trend_analysis"])
            .with_input("file_path", "string")
            .with_input("schema", "object")
            .with_output("insights", "object"),
        WorkerDescriptor::new(CRITIC, "Evaluation & Reporting", build_critic)
            .with_capabilities(&["evaluate_insights", "generate_report"])
            .with_input("insights", "object")
            .with_output("report", "markdown"),
        WorkerDescriptor::new(QA_AGENT, "Ad-hoc Q&A", build_qa)
            .with_capabilities(&["answer_question"])
            .with_input("question", "string")
            .with_input("file_path", "string")
            .with_output("answer", "string"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::llm::ScriptedModel;

    fn deps() -> WorkerDeps {
        WorkerDeps::new(Arc::new(Settings::default()), Arc::new(ScriptedModel::new()))
    }

    fn failing_factory(_deps: &WorkerDeps) -> Result<Arc<dyn Worker>, WorkerError> {
        Err(WorkerError::Data("no model".to_string()))
    }

    #[test]
    fn test_builtins_listed_in_registration_order() {
        let registry = WorkerRegistry::with_builtins();
        assert_eq!(
            registry.list(),
            vec![STEWARD, REFINERY, ANALYST_SQUAD, CRITIC, QA_AGENT]
        );
        let refinery = registry.get(REFINERY).unwrap();
        assert_eq!(refinery.role, "Data Cleaning");
        assert!(refinery.has_capability("clean_data"));
        assert!(registry.get("Nobody").is_none());
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let mut registry = WorkerRegistry::with_builtins();
        registry.register(WorkerDescriptor::new(REFINERY, "Replacement", build_refinery));
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.list()[1], REFINERY);
        assert_eq!(registry.get(REFINERY).unwrap().role, "Replacement");
    }

    #[test]
    fn test_instantiate_all_isolates_failures() {
        let mut registry = WorkerRegistry::with_builtins();
        registry.register(WorkerDescriptor::new(CRITIC, "Broken", failing_factory));

        let workers = registry.instantiate_all(&deps());
        assert_eq!(workers.len(), 4);
        assert!(!workers.contains_key(CRITIC));
        assert_eq!(workers[STEWARD].name(), STEWARD);
    }

    #[test]
    fn test_factory_failure_becomes_construction_error() {
        let descriptor = WorkerDescriptor::new("Broken", "none", failing_factory);
        let err = descriptor.instantiate(&deps()).err().unwrap();
        assert!(matches!(err, WorkerError::Construction { ref worker, .. } if worker == "Broken"));
    }
}
