//! Database provisioning and seeding.
//!
//! [`DatabaseCreator`] makes sure the remote database and one container per
//! entity type exist, then seeds declared data if and only if something was
//! newly created.
//!
//! # Workflow
//!
//! ```text
//! NotStarted -> DatabaseEnsured -> ContainersEnsured -> Seeded | SkippedSeeding -> Done
//! ```
//!
//! Blocking and async call shapes run the same steps. The async shape checks
//! its cancellation token before every client call and before the save.
//! Nothing is rolled back: containers created before a failure or a
//! cancellation stay created.

use crate::client::{AsyncDocumentClient, DocumentClient};
use keystone_core::config::ProvisioningOptions;
use keystone_core::error::{KeystoneError, KeystoneResult};
use keystone_core::metadata::Model;
use keystone_core::tracking::{EntityState, EntryTracker, EntryTrackerFactory};
use keystone_core::traits::{AsyncSaveExecutor, SaveExecutor, Support};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Steps of a provisioning call, reported in trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStage {
    /// Nothing done yet
    NotStarted,
    /// Database exists
    DatabaseEnsured,
    /// Every entity type has a container
    ContainersEnsured,
    /// Seed data staged and saved
    Seeded,
    /// Everything already existed; nothing seeded
    SkippedSeeding,
    /// Call finished
    Done,
}

fn enter_stage(stage: ProvisioningStage) {
    debug!(target: "keystone::provision", stage = ?stage, "provisioning stage");
}

/// Ensures remote storage exists and seeds it on creation.
pub struct DatabaseCreator<C, S> {
    client: Arc<C>,
    model: Arc<Model>,
    trackers: Arc<dyn EntryTrackerFactory>,
    executor: Arc<S>,
    options: ProvisioningOptions,
}

impl<C, S> DatabaseCreator<C, S> {
    /// Create a coordinator with default provisioning options.
    pub fn new(
        client: Arc<C>,
        model: Arc<Model>,
        trackers: Arc<dyn EntryTrackerFactory>,
        executor: Arc<S>,
    ) -> Self {
        Self {
            client,
            model,
            trackers,
            executor,
            options: ProvisioningOptions::default(),
        }
    }

    /// Replace the provisioning options.
    pub fn with_options(mut self, options: ProvisioningOptions) -> Self {
        self.options = options;
        self
    }

    /// Model being provisioned.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Partition key path used for new containers.
    pub fn partition_key_path(&self) -> &str {
        &self.options.partition_key_path
    }

    /// Connectivity probing is not offered by this provider.
    pub fn can_connect(&self) -> Support<bool> {
        Support::Unsupported {
            operation: "can_connect",
        }
    }

    /// Connectivity probing is not offered by this provider.
    pub async fn can_connect_async(&self, _cancel: &CancellationToken) -> Support<bool> {
        Support::Unsupported {
            operation: "can_connect",
        }
    }

    fn stage_seed_data(&self) -> EntryTracker {
        let mut tracker = self.trackers.create();
        for entity_type in self.model.entity_types() {
            for seed in entity_type.seed_data() {
                tracker
                    .create_entry(seed.clone(), entity_type)
                    .set_state(EntityState::Added);
            }
        }
        tracker
    }
}

impl<C: DocumentClient, S: SaveExecutor> DatabaseCreator<C, S> {
    /// Ensure the database and all containers exist, seeding on creation.
    ///
    /// Returns `true` if the database or any container was created.
    pub fn ensure_created(&self) -> KeystoneResult<bool> {
        enter_stage(ProvisioningStage::NotStarted);

        let mut created = self.client.create_database_if_not_exists()?;
        enter_stage(ProvisioningStage::DatabaseEnsured);

        for entity_type in self.model.entity_types() {
            created |= self.client.create_container_if_not_exists(
                entity_type.container_name(),
                &self.options.partition_key_path,
            )?;
        }
        enter_stage(ProvisioningStage::ContainersEnsured);

        if created {
            let tracker = self.stage_seed_data();
            let entries = tracker.entries_to_save();
            let saved = self.executor.save_changes(&entries)?;
            enter_stage(ProvisioningStage::Seeded);
            info!(target: "keystone::provision", staged = entries.len(), saved, "store provisioned and seeded");
        } else {
            enter_stage(ProvisioningStage::SkippedSeeding);
        }

        enter_stage(ProvisioningStage::Done);
        Ok(created)
    }
}

impl<C: DocumentClient, S> DatabaseCreator<C, S> {
    /// Delete the database. The client's result and errors pass through.
    pub fn ensure_deleted(&self) -> KeystoneResult<bool> {
        self.client.delete_database()
    }
}

impl<C: AsyncDocumentClient, S: AsyncSaveExecutor> DatabaseCreator<C, S> {
    /// Async form of [`DatabaseCreator::ensure_created`].
    ///
    /// Fails with [`KeystoneError::Cancelled`] if `cancel` fires before the
    /// seed batch is handed to the executor.
    pub async fn ensure_created_async(&self, cancel: &CancellationToken) -> KeystoneResult<bool> {
        enter_stage(ProvisioningStage::NotStarted);

        check_cancelled(cancel)?;
        let mut created = self.client.create_database_if_not_exists_async(cancel).await?;
        enter_stage(ProvisioningStage::DatabaseEnsured);

        for entity_type in self.model.entity_types() {
            check_cancelled(cancel)?;
            created |= self
                .client
                .create_container_if_not_exists_async(
                    entity_type.container_name(),
                    &self.options.partition_key_path,
                    cancel,
                )
                .await?;
        }
        enter_stage(ProvisioningStage::ContainersEnsured);

        if created {
            let entries = self.stage_seed_data().entries_to_save();
            let staged = entries.len();
            check_cancelled(cancel)?;
            let saved = self.executor.save_changes_async(entries, cancel).await?;
            enter_stage(ProvisioningStage::Seeded);
            info!(target: "keystone::provision", staged, saved, "store provisioned and seeded");
        } else {
            enter_stage(ProvisioningStage::SkippedSeeding);
        }

        enter_stage(ProvisioningStage::Done);
        Ok(created)
    }
}

impl<C: AsyncDocumentClient, S> DatabaseCreator<C, S> {
    /// Async form of [`DatabaseCreator::ensure_deleted`].
    pub async fn ensure_deleted_async(&self, cancel: &CancellationToken) -> KeystoneResult<bool> {
        self.client.delete_database_async(cancel).await
    }
}

fn check_cancelled(cancel: &CancellationToken) -> KeystoneResult<()> {
    if cancel.is_cancelled() {
        return Err(KeystoneError::Cancelled);
    }
    Ok(())
}

impl<C, S> std::fmt::Debug for DatabaseCreator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCreator")
            .field("entity_types", &self.model.entity_types().len())
            .field("partition_key_path", &self.options.partition_key_path)
            .finish()
    }
}
