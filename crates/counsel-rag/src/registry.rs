//! Static registry of knowledge partitions

use crate::config::PartitionConfig;
use crate::error::{Error, Result};

/// One independently indexed knowledge partition
#[derive(Debug, Clone)]
pub struct Partition {
    /// Stable id, unique across the registry
    pub id: String,
    /// Routing description; never shown to end users
    pub description: String,
    /// Object-store prefix holding the partition's index artifacts
    pub storage_prefix: String,
}

/// Immutable, insertion-ordered partition registry.
///
/// Built once from deploy-time configuration; ordering is preserved so the
/// routing prompt enumerates partitions deterministically.
#[derive(Debug)]
pub struct PartitionRegistry {
    partitions: Vec<Partition>,
}

impl PartitionRegistry {
    /// Build a registry from configuration, rejecting duplicates and an
    /// empty partition set.
    pub fn new(configs: Vec<PartitionConfig>) -> Result<Self> {
        if configs.is_empty() {
            return Err(Error::Config(
                "At least one knowledge partition must be configured".to_string(),
            ));
        }

        let mut partitions: Vec<Partition> = Vec::with_capacity(configs.len());
        for config in configs {
            if partitions.iter().any(|p| p.id == config.id) {
                return Err(Error::Config(format!(
                    "Duplicate partition id: {}",
                    config.id
                )));
            }
            partitions.push(Partition {
                id: config.id,
                description: config.description,
                storage_prefix: config.storage_prefix,
            });
        }

        Ok(Self { partitions })
    }

    /// Iterate `(id, description)` pairs in configured order
    pub fn describe_all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.partitions
            .iter()
            .map(|p| (p.id.as_str(), p.description.as_str()))
    }

    /// Resolve a partition by id
    pub fn resolve(&self, partition_id: &str) -> Result<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.id == partition_id)
            .ok_or_else(|| Error::UnknownPartition(partition_id.to_string()))
    }

    /// Whether the id is registered
    pub fn contains(&self, partition_id: &str) -> bool {
        self.partitions.iter().any(|p| p.id == partition_id)
    }

    /// Reverse lookup by storage prefix. The router uses this as a parse
    /// fallback when the model echoes a partition's storage location instead
    /// of its id.
    pub fn find_by_storage_prefix(&self, prefix: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.storage_prefix == prefix)
    }

    /// Registered ids in configured order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.partitions.iter().map(|p| p.id.as_str())
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_partitions;

    fn registry() -> PartitionRegistry {
        PartitionRegistry::new(default_partitions()).expect("default registry")
    }

    #[test]
    fn resolve_known_partition() {
        let registry = registry();
        let partition = registry.resolve("professions_immigration").unwrap();
        assert_eq!(partition.storage_prefix, "vs_professions_data_immigration");
    }

    #[test]
    fn resolve_unknown_partition_fails() {
        let registry = registry();
        let err = registry.resolve("nonexistent_partition").unwrap_err();
        assert!(matches!(err, Error::UnknownPartition(id) if id == "nonexistent_partition"));
    }

    #[test]
    fn describe_all_preserves_order() {
        let registry = registry();
        let ids: Vec<&str> = registry.describe_all().map(|(id, _)| id).collect();
        assert_eq!(ids[0], "course_details_source1");
        assert_eq!(ids[4], "course_details_source2");
    }

    #[test]
    fn storage_prefix_reverse_lookup() {
        let registry = registry();
        let partition = registry
            .find_by_storage_prefix("vs_processed_data_university")
            .expect("known prefix");
        assert_eq!(partition.id, "university_details");
        assert!(registry.find_by_storage_prefix("vs_unknown").is_none());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut configs = default_partitions();
        configs.push(configs[0].clone());
        assert!(matches!(
            PartitionRegistry::new(configs),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn empty_registry_rejected() {
        assert!(matches!(
            PartitionRegistry::new(Vec::new()),
            Err(Error::Config(_))
        ));
    }
}
