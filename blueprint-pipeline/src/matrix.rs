//! Matrix experiments: one blueprint per (tone, length, format) combination,
//! optionally executed and judged.
//!
//! Cells run strictly one after another. Cancellation is checked before each
//! cell and progress is reported after each, so a caller always holds a
//! prefix of the full result list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use blueprint_adapters::{Credentials, ModelCaller, ModelCatalog, ModelRequest};
use blueprint_primitives::{Combo, ExperimentId, OutputType};
use blueprint_prompts::{PlanParams, PromptAssembler, Toggles};
use blueprint_spec::TypeSpecific;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::architect::{extract_blueprint, with_contract};
use crate::error::{PipelineError, PipelineResult};
use crate::judge::{JudgeEvaluation, JudgeInput, JudgeSettings, judge_output};

/// Default cap on cells per run.
pub const DEFAULT_MAX_CELLS: usize = 64;

/// Axis values to combine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Tone ids.
    pub tones: Vec<String>,
    /// Length ids.
    pub lengths: Vec<String>,
    /// Format ids.
    pub formats: Vec<String>,
}

impl MatrixConfig {
    /// Number of cells [`expand_matrix`] will produce.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        unique(&self.tones).len() * unique(&self.lengths).len() * unique(&self.formats).len()
    }
}

fn unique(values: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    values.iter().filter(|value| seen.insert(value.as_str())).collect()
}

/// Cartesian product of the axes in tone-major order. Repeated axis values
/// are collapsed, keeping the first occurrence.
#[must_use]
pub fn expand_matrix(config: &MatrixConfig) -> Vec<Combo> {
    let (tones, lengths, formats) = (
        unique(&config.tones),
        unique(&config.lengths),
        unique(&config.formats),
    );

    let mut combos = Vec::with_capacity(tones.len() * lengths.len() * formats.len());
    for tone in &tones {
        for length in &lengths {
            for format in &formats {
                combos.push(Combo::new(tone.as_str(), length.as_str(), format.as_str()));
            }
        }
    }
    combos
}

/// Which models play which role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    /// Writes the blueprint.
    pub architect: String,
    /// Runs the blueprint; skipped when unset.
    pub executor: Option<String>,
    /// Scores the output; defaults to the architect model.
    pub judge: Option<String>,
}

/// Everything one matrix run needs.
#[derive(Clone, Debug, Default)]
pub struct MatrixExperiment {
    /// Run identifier attached to log events.
    pub id: ExperimentId,
    /// User brief.
    pub prompt: String,
    /// Axis values.
    pub matrix: MatrixConfig,
    /// Explicit output type; inferred from the brief when unset.
    pub output_type: Option<OutputType>,
    /// Prompt toggles applied to every cell.
    pub toggles: Toggles,
    /// Explicit type-specific attributes.
    pub type_specific: Option<TypeSpecific>,
    /// Model roles.
    pub models: ModelSelection,
    /// Provider keys.
    pub credentials: Credentials,
    /// Judge phase settings.
    pub judge: JudgeSettings,
    /// Stops the run between cells.
    pub cancel: CancellationToken,
}

/// Outcome of one cell. Failures are recorded, never raised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellResult {
    /// The combination this cell ran.
    pub config: Combo,
    /// Architect output; empty when the architect failed.
    pub blueprint_result: String,
    /// Executor output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<String>,
    /// Judge verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<JudgeEvaluation>,
    /// Executor failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
    /// Architect failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CellResult {
    fn failed(config: Combo, error: impl ToString) -> Self {
        Self {
            config,
            blueprint_result: String::new(),
            execution_result: None,
            evaluation: None,
            execution_error: None,
            error: Some(error.to_string()),
        }
    }
}

/// Receives progress after every completed cell.
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    /// Called with the number of finished cells, the total, and the newest result.
    async fn on_progress(&self, completed: usize, total: usize, last: &CellResult);
}

/// Observer that logs progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressObserver;

#[async_trait]
impl ProgressObserver for TracingProgressObserver {
    async fn on_progress(&self, completed: usize, total: usize, last: &CellResult) {
        info!(
            completed,
            total,
            cell = %last.config,
            failed = last.error.is_some(),
            composite = last.evaluation.as_ref().map(|e| e.composite),
            "matrix progress"
        );
    }
}

/// Sequential matrix runner.
pub struct MatrixRunner {
    caller: Arc<dyn ModelCaller>,
    assembler: PromptAssembler,
    models: ModelCatalog,
    observer: Arc<dyn ProgressObserver>,
    max_cells: usize,
}

impl std::fmt::Debug for MatrixRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixRunner")
            .field("max_cells", &self.max_cells)
            .finish_non_exhaustive()
    }
}

impl MatrixRunner {
    /// Runner with the standard model catalog, a tracing observer, and
    /// [`DEFAULT_MAX_CELLS`].
    #[must_use]
    pub fn new(caller: Arc<dyn ModelCaller>, assembler: PromptAssembler) -> Self {
        Self {
            caller,
            assembler,
            models: ModelCatalog::standard(),
            observer: Arc::new(TracingProgressObserver),
            max_cells: DEFAULT_MAX_CELLS,
        }
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the cell cap.
    #[must_use]
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// Catalog used to decide whether the executor has a credential.
    #[must_use]
    pub fn with_model_catalog(mut self, models: ModelCatalog) -> Self {
        self.models = models;
        self
    }

    /// Runs every cell in order.
    ///
    /// Returns one result per attempted cell; a cancelled run returns the
    /// prefix completed before cancellation was observed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MatrixTooLarge`] before any model call when the
    /// product exceeds the cap.
    pub async fn run(&self, experiment: &MatrixExperiment) -> PipelineResult<Vec<CellResult>> {
        let combos = expand_matrix(&experiment.matrix);
        if combos.is_empty() {
            debug!("matrix has an empty axis; nothing to run");
            return Ok(Vec::new());
        }
        if combos.len() > self.max_cells {
            return Err(PipelineError::MatrixTooLarge {
                cells: combos.len(),
                max: self.max_cells,
            });
        }

        let total = combos.len();
        info!(
            experiment = %experiment.id,
            total,
            architect = %experiment.models.architect,
            "starting matrix run"
        );

        let mut results = Vec::with_capacity(total);
        for (index, combo) in combos.into_iter().enumerate() {
            if experiment.cancel.is_cancelled() {
                info!(experiment = %experiment.id, completed = index, total, "matrix run cancelled");
                break;
            }

            info!(cell = index, tone = %combo.tone, length = %combo.length, format = %combo.format, "running cell");
            let result = self.run_experiment_cell(experiment, combo).await;
            self.observer.on_progress(index + 1, total, &result).await;
            results.push(result);
        }

        Ok(results)
    }

    /// Runs the architect, executor, and judge phases for one combination.
    pub async fn run_experiment_cell(&self, experiment: &MatrixExperiment, combo: Combo) -> CellResult {
        let base = ModelRequest::new(experiment.models.architect.clone(), String::new())
            .with_credentials(experiment.credentials.clone())
            .with_cancellation(experiment.cancel.clone());

        // Architect
        let params = PlanParams {
            user_input: experiment.prompt.clone(),
            tone: Some(combo.tone.clone()),
            length: Some(combo.length.clone()),
            format: Some(combo.format.clone()),
            output_type: experiment.output_type,
            toggles: experiment.toggles,
            type_specific: experiment.type_specific.clone(),
            ..PlanParams::default()
        };
        let plan = match self.assembler.plan_with_inference(&params) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(cell = %combo, error = %err, "prompt assembly failed");
                return CellResult::failed(combo, err);
            }
        };

        let request = ModelRequest {
            user_prompt: plan.user_prompt,
            system_prompt: Some(with_contract(&plan.system_prompt)),
            json_mode: true,
            ..base.clone()
        };
        let blueprint = match self.caller.call(request).await {
            Ok(response) => extract_blueprint(&response),
            Err(err) => {
                warn!(cell = %combo, error = %err, "architect call failed");
                return CellResult::failed(combo, PipelineError::model("architect")(err));
            }
        };

        let mut result = CellResult {
            config: combo,
            blueprint_result: blueprint,
            execution_result: None,
            evaluation: None,
            execution_error: None,
            error: None,
        };

        // Executor
        let Some(executor) = self.executor_for(experiment) else {
            return result;
        };
        let request = ModelRequest {
            model_id: executor.to_owned(),
            user_prompt: result.blueprint_result.clone(),
            ..base.clone()
        };
        match self.caller.call(request).await {
            Ok(output) => result.execution_result = Some(output),
            Err(err) => {
                warn!(cell = %result.config, error = %err, "executor call failed");
                result.execution_error = Some(PipelineError::model("executor")(err).to_string());
                return result;
            }
        }

        // Judge
        if experiment.judge.enabled {
            if let Some(output) = &result.execution_result {
                let judge = ModelRequest {
                    model_id: experiment
                        .models
                        .judge
                        .clone()
                        .unwrap_or_else(|| experiment.models.architect.clone()),
                    ..base
                };
                let input = JudgeInput {
                    brief: &experiment.prompt,
                    blueprint: &result.blueprint_result,
                    output,
                    baselines: &experiment.judge.baselines,
                };
                let evaluation =
                    judge_output(self.caller.as_ref(), &judge, &input, &experiment.judge).await;
                result.evaluation = Some(evaluation);
            }
        }

        result
    }

    fn executor_for<'a>(&self, experiment: &'a MatrixExperiment) -> Option<&'a str> {
        let model = experiment.models.executor.as_deref()?.trim();
        if model.is_empty() {
            return None;
        }
        let has_key = self
            .models
            .provider_for(model)
            .is_none_or(|provider| experiment.credentials.has(provider));
        if !has_key {
            debug!(model, "executor configured without a credential; skipping execution");
        }
        has_key.then_some(model)
    }
}
