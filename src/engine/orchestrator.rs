//! Instance fan-out
//!
//! Runs one plugin instance across its configured targets. Targets execute
//! concurrently on spawned tasks with a staggered start (`i * stagger_ms`)
//! so multi-target instances do not stampede one upstream host. Aggregation
//! is deliberately lenient: one succeeding target makes the whole execution
//! count as successful, which keeps fast-retry scheduling from hammering
//! instances where only a single target is broken.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Engine, outputs};
use crate::plugin::{Context, InputMap, PluginInstance, PluginTemplate};

impl Engine {
    /// Execute one full refresh cycle for `instance`.
    ///
    /// Returns true when at least one target chain succeeded. Cancellation
    /// aborts cleanly: no partial output is written for cancelled targets.
    pub async fn execute_instance(
        self: &Arc<Self>,
        instance: &PluginInstance,
        template: &PluginTemplate,
        cancel: &CancellationToken,
    ) -> bool {
        if !instance.enabled {
            debug!(instance = %instance.id, "instance disabled, skipping");
            return false;
        }

        // No declared targets still means one execution, with an empty
        // target map and no key suffix.
        let targets: Vec<InputMap> = if instance.targets.is_empty() {
            vec![InputMap::new()]
        } else {
            instance.targets.clone()
        };

        let instance = Arc::new(instance.clone());
        let template = Arc::new(template.clone());
        let stagger_ms = self.config.scheduler.target_stagger_ms;

        let mut tasks = JoinSet::new();
        for (index, target) in targets.into_iter().enumerate() {
            let engine = Arc::clone(self);
            let instance = Arc::clone(&instance);
            let template = Arc::clone(&template);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                if index > 0 {
                    let delay = Duration::from_millis(stagger_ms * index as u64);
                    tokio::select! {
                        _ = cancel.cancelled() => return false,
                        _ = sleep(delay) => {}
                    }
                }
                engine
                    .execute_target(&instance, &template, &target, index, &cancel)
                    .await
            });
        }

        let mut any_succeeded = false;
        while let Some(joined) = tasks.join_next().await {
            if matches!(joined, Ok(true)) {
                any_succeeded = true;
            }
        }
        any_succeeded
    }

    /// Run one target's full step chain and publish its outputs.
    async fn execute_target(
        &self,
        instance: &PluginInstance,
        template: &PluginTemplate,
        target: &InputMap,
        index: usize,
        cancel: &CancellationToken,
    ) -> bool {
        let suffix = instance.target_suffix(index);
        let mut ctx = Context::merged(&instance.inputs, target, template.input_defaults());

        for step in &template.steps {
            match self
                .execute_step(instance, step, &mut ctx, &suffix, cancel)
                .await
            {
                Ok(()) => {}
                Err(err) if err.is_cancellation() => {
                    debug!(
                        instance = %instance.id,
                        step = %step.id,
                        "target execution cancelled"
                    );
                    return false;
                }
                Err(err) => {
                    warn!(
                        instance = %instance.id,
                        step = %step.id,
                        target = index,
                        error = %err,
                        "step failed, publishing error outputs"
                    );
                    outputs::write_error_outputs(self, instance, template, &ctx, &suffix);
                    self.metrics.target_failed();
                    return false;
                }
            }
        }

        outputs::write_outputs(self, instance, template, &ctx, &suffix);
        self.metrics.target_succeeded();
        true
    }
}
