//! Persona registry
//!
//! Immutable, process-lifetime store of persona definitions. A registry is
//! built once from a definition source, validated as a whole (any malformed
//! definition is fatal, never partial), and never mutated afterwards.
//! Iteration order is load order, which downstream components use as the
//! canonical tie-break order.
//!
//! A "reload" is building a brand-new registry and swapping it into the
//! `SharedRegistry` handle atomically; concurrent readers keep the snapshot
//! they already hold and never observe a half-updated registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use tracing::info;

use sdk::errors::ConclaveError;
use sdk::persona::PersonaDefinition;

/// TOML definition file: a sequence of `[[persona]]` tables.
#[derive(Debug, Deserialize)]
struct PersonaFile {
    #[serde(default)]
    persona: Vec<PersonaDefinition>,
}

/// Immutable store of persona definitions.
#[derive(Debug)]
pub struct PersonaRegistry {
    personas: Vec<PersonaDefinition>,
    by_id: HashMap<String, usize>,
}

impl PersonaRegistry {
    /// Build a registry from in-memory definitions.
    ///
    /// Rejects any definition with a missing or empty required field and
    /// rejects duplicate ids. Failure is fatal: no partial registry is ever
    /// produced.
    pub fn from_definitions(
        definitions: Vec<PersonaDefinition>,
    ) -> Result<Self, ConclaveError> {
        let mut by_id = HashMap::with_capacity(definitions.len());

        for (index, def) in definitions.iter().enumerate() {
            if let Err(reason) = validate_definition(def) {
                return Err(ConclaveError::InvalidPersona {
                    id: if def.id.trim().is_empty() {
                        format!("#{index}")
                    } else {
                        def.id.clone()
                    },
                    reason,
                });
            }
            if by_id.insert(def.id.clone(), index).is_some() {
                return Err(ConclaveError::DuplicatePersona(def.id.clone()));
            }
        }

        info!(personas = definitions.len(), "persona registry loaded");

        Ok(Self {
            personas: definitions,
            by_id,
        })
    }

    /// Load a registry from a TOML file of `[[persona]]` tables.
    ///
    /// File order becomes registration order.
    pub fn load_file(path: &Path) -> Result<Self, ConclaveError> {
        let text = std::fs::read_to_string(path)?;
        let file: PersonaFile = toml::from_str(&text)
            .map_err(|e| ConclaveError::Config(format!("{}: {e}", path.display())))?;
        Self::from_definitions(file.persona)
    }

    /// Look up a persona by id.
    pub fn get(&self, id: &str) -> Result<&PersonaDefinition, ConclaveError> {
        self.by_id
            .get(id)
            .map(|&index| &self.personas[index])
            .ok_or_else(|| ConclaveError::PersonaNotFound(id.to_string()))
    }

    /// Whether a persona id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Persona ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.iter().map(|p| p.id.as_str())
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[PersonaDefinition] {
        &self.personas
    }

    /// Number of registered personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

fn validate_definition(def: &PersonaDefinition) -> Result<(), String> {
    fn require(field: &str, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err(format!("{field} must be non-empty"))
        } else {
            Ok(())
        }
    }

    fn require_list(field: &str, values: &[String]) -> Result<(), String> {
        if values.is_empty() {
            return Err(format!("{field} must hold at least one entry"));
        }
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(format!("{field} entries must be non-empty"));
        }
        Ok(())
    }

    require("id", &def.id)?;
    require("name", &def.name)?;
    require("philosophy", &def.philosophy)?;

    if def.memories.is_empty() {
        return Err("memories must hold at least one entry".to_string());
    }
    for (index, memory) in def.memories.iter().enumerate() {
        require(&format!("memories[{index}].context"), &memory.context)?;
        require(&format!("memories[{index}].decision"), &memory.decision)?;
        require(&format!("memories[{index}].reasoning"), &memory.reasoning)?;
        require(&format!("memories[{index}].outcome"), &memory.outcome)?;
        require(&format!("memories[{index}].lesson"), &memory.lesson)?;
    }

    require_list("trigger_patterns", &def.trigger_patterns)?;
    require_list("blind_spots", &def.blind_spots)?;
    require_list("decision_framework", &def.decision_framework)?;

    Ok(())
}

/// Copy-on-write handle for atomic registry replacement.
///
/// Readers take a cheap `Arc` snapshot; `replace` swaps the whole registry
/// under a short write lock. No reader ever sees a partial update.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Arc<PersonaRegistry>>>,
}

impl SharedRegistry {
    /// Wrap a freshly built registry.
    pub fn new(registry: PersonaRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// Current registry snapshot.
    pub fn current(&self) -> Arc<PersonaRegistry> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Atomically replace the active registry with a new one.
    pub fn replace(&self, registry: PersonaRegistry) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(registry);
        info!(personas = guard.len(), "persona registry replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::persona::FormativeMemory;
    use std::io::Write as _;

    fn definition(id: &str) -> PersonaDefinition {
        PersonaDefinition {
            id: id.to_string(),
            name: format!("Persona {id}"),
            era: String::new(),
            philosophy: "buy quality cheap".to_string(),
            memories: vec![FormativeMemory {
                context: "a crash".to_string(),
                decision: "bought".to_string(),
                reasoning: "value".to_string(),
                outcome: "recovered".to_string(),
                lesson: "patience".to_string(),
            }],
            trigger_patterns: vec!["drawdown".to_string()],
            blind_spots: vec!["momentum".to_string()],
            decision_framework: vec!["what is the moat?".to_string()],
        }
    }

    #[test]
    fn test_load_order_is_iteration_order() {
        let registry = PersonaRegistry::from_definitions(vec![
            definition("zeta"),
            definition("alpha"),
            definition("mid"),
        ])
        .expect("registry");

        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_get_unknown_id() {
        let registry = PersonaRegistry::from_definitions(vec![definition("a")]).expect("registry");
        assert!(registry.get("a").is_ok());
        assert!(matches!(
            registry.get("missing"),
            Err(ConclaveError::PersonaNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let result =
            PersonaRegistry::from_definitions(vec![definition("dup"), definition("dup")]);
        assert!(matches!(result, Err(ConclaveError::DuplicatePersona(id)) if id == "dup"));
    }

    #[test]
    fn test_empty_field_is_fatal() {
        let mut bad = definition("bad");
        bad.philosophy = "  ".to_string();
        let result = PersonaRegistry::from_definitions(vec![definition("ok"), bad]);
        assert!(matches!(result, Err(ConclaveError::InvalidPersona { id, .. }) if id == "bad"));
    }

    #[test]
    fn test_empty_memory_field_is_fatal() {
        let mut bad = definition("bad");
        bad.memories[0].lesson = String::new();
        assert!(PersonaRegistry::from_definitions(vec![bad]).is_err());
    }

    #[test]
    fn test_missing_list_is_fatal() {
        let mut bad = definition("bad");
        bad.blind_spots.clear();
        assert!(PersonaRegistry::from_definitions(vec![bad]).is_err());
    }

    #[test]
    fn test_load_file_preserves_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[[persona]]
id = "second-sight"
name = "Second Sight"
philosophy = "statistical dislocations"
trigger_patterns = ["forced selling"]
blind_spots = ["narrative momentum"]
decision_framework = ["what does the base rate say?"]

[[persona.memories]]
context = "2008"
decision = "shorted credit"
reasoning = "underwriting had decayed"
outcome = "paid off"
lesson = "trust the data over the crowd"

[[persona]]
id = "steward"
name = "Steward"
philosophy = "durable moats at fair prices"
trigger_patterns = ["quality on sale"]
blind_spots = ["early technology shifts"]
decision_framework = ["is the moat intact?"]

[[persona.memories]]
context = "a panic"
decision = "held"
reasoning = "business unimpaired"
outcome = "compounded"
lesson = "volatility is not risk"
"#
        )
        .expect("write");

        let registry = PersonaRegistry::load_file(file.path()).expect("load");
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["second-sight", "steward"]);
        assert_eq!(registry.get("steward").expect("steward").name, "Steward");
    }

    #[test]
    fn test_shared_registry_swap_is_atomic_to_readers() {
        let shared = SharedRegistry::new(
            PersonaRegistry::from_definitions(vec![definition("old")]).expect("registry"),
        );

        let snapshot = shared.current();
        shared.replace(
            PersonaRegistry::from_definitions(vec![definition("new-a"), definition("new-b")])
                .expect("registry"),
        );

        // The old snapshot is untouched; new readers see the replacement.
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["old"]);
        assert_eq!(
            shared.current().ids().collect::<Vec<_>>(),
            vec!["new-a", "new-b"]
        );
    }
}
