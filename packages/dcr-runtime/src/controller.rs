//! Reconciliation controller.
//!
//! Drives each table through
//! `Fetching → Resolving → Filtering → Naming → Synthesizing → Assessing`
//! and into a terminal state. Only this module talks to collaborators, and
//! only through [`with_auth_retry`].
//!
//! A batch runs in two passes. The first fetches, resolves and names every
//! table and only reads; the second checks for an existing resource, writes
//! the artifact and deploys. Between them, positions that resolved to a
//! target claimed earlier in the batch are dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use dcr_core::advisor::{self, DeploymentVerdict};
use dcr_core::config::EngineConfig;
use dcr_core::error::{DcrError, Result};
use dcr_core::naming::{NameOverride, NameResolver};
use dcr_core::persistence::ArtifactStore;
use dcr_core::schema::{NormalizedColumn, Resolution, ResolvedSchema, SchemaResolver};
use dcr_core::template::TemplateSynthesizer;
use dcr_core::warning::TableWarning;

use crate::collaborators::{Deployer, SchemaSource, SessionProvider};
use crate::retry::with_auth_retry;
use crate::session::SessionHandle;
use crate::summary::{ControllerState, RunSummary, TableOutcome, TableReport};

/// Reason recorded for tables not started after cancellation.
pub const CANCELLED_REASON: &str = "cancelled";
/// Reason recorded for repeated identifiers in one batch.
pub const DUPLICATE_REASON: &str = "duplicate table identifier";
/// Reason recorded for identifiers that resolve to an already claimed target.
pub const DUPLICATE_TARGET_REASON: &str = "duplicate resolved target";
/// Reason recorded for auto-deployable tables in a dry run.
pub const DRY_RUN_REASON: &str = "deployment disabled";

/// Cooperative stop signal, checked before each table.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that no further tables are started.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type SharedOverride = Arc<Mutex<Box<dyn NameOverride + Send>>>;

/// Processes batches of tables against a set of collaborators.
pub struct Controller {
    config: EngineConfig,
    source: Arc<dyn SchemaSource>,
    deployer: Arc<dyn Deployer>,
    sessions: Arc<dyn SessionProvider>,
    store: ArtifactStore,
    resolver: SchemaResolver,
    naming: NameResolver,
    name_override: Option<SharedOverride>,
    cancel: CancellationFlag,
}

/// Work item for one position in the batch.
enum Slot {
    Process(String),
    Duplicate(String),
}

/// What a table resolved to, before any side effect.
struct Target {
    schema: ResolvedSchema,
    columns: Vec<NormalizedColumn>,
    name: String,
}

/// A resolved and named table waiting for its side effects.
struct Prepared {
    run: TableRun,
    session: Arc<SessionHandle>,
    target: Target,
}

/// Result of the first pass over one slot.
enum Stage {
    Done(TableReport),
    Ready(Box<Prepared>),
}

/// Progress of one table, turned into a report at the end.
struct TableRun {
    state: ControllerState,
    report: TableReport,
}

impl TableRun {
    fn new(table: &str) -> Self {
        Self {
            state: ControllerState::Fetching,
            report: TableReport {
                table: table.to_string(),
                outcome: TableOutcome::Skipped(String::new()),
                final_state: ControllerState::Fetching,
                failed_at: None,
                warnings: Vec::new(),
                definition_name: None,
                artifact: None,
                verdict: None,
            },
        }
    }

    fn enter(&mut self, state: ControllerState) {
        tracing::debug!(table = %self.report.table, from = %self.state, to = %state, "State transition");
        self.state = state;
    }

    fn finish(mut self, state: ControllerState, outcome: TableOutcome) -> TableReport {
        self.enter(state);
        self.report.final_state = state;
        self.report.outcome = outcome;
        for warning in &self.report.warnings {
            tracing::warn!(table = %self.report.table, %warning, "Table warning");
        }
        self.report
    }

    fn fail(mut self, err: &DcrError) -> TableReport {
        let failed_at = self.state;
        tracing::error!(table = %self.report.table, state = %failed_at, error = %err, "Table failed");
        self.report.failed_at = Some(failed_at);
        self.finish(ControllerState::Failed, TableOutcome::Failed(err.to_string()))
    }
}

impl Controller {
    /// Creates a controller. The configuration is validated here.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn SchemaSource>,
        deployer: Arc<dyn Deployer>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let store = ArtifactStore::new(
            config.output_dir.clone(),
            config.io_max_retries,
            config.io_retry_delay_ms,
        );
        Ok(Self {
            resolver: SchemaResolver::new(config.mode),
            naming: NameResolver::new(config.name.clone()),
            store,
            config,
            source,
            deployer,
            sessions,
            name_override: None,
            cancel: CancellationFlag::new(),
        })
    }

    /// Consults `hook` for every computed name.
    pub fn with_name_override(mut self, hook: Box<dyn NameOverride + Send>) -> Self {
        self.name_override = Some(Arc::new(Mutex::new(hook)));
        self
    }

    /// Handle to stop the controller between tables.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Processes every table in `tables`. Reports come back in input order;
    /// per-table failures never stop the batch.
    ///
    /// Tables are resolved and named first. Identifiers that resolve to a
    /// remote table or resource name already claimed earlier in the batch
    /// are skipped, so no two workers ever write or deploy the same target.
    pub fn run<S: AsRef<str>>(&self, tables: &[S]) -> RunSummary {
        let slots = dedupe(tables);
        let parallel = self.parallel_enabled();
        tracing::info!(
            tables = slots.len(),
            mode = %self.config.mode,
            deploy = self.config.deploy,
            parallel,
            "Starting run"
        );

        // Sequential runs share one session; parallel workers own theirs.
        let shared = (!parallel)
            .then(|| SessionHandle::acquire(Arc::clone(&self.sessions)).map(Arc::new));
        let staged = map_batch(parallel, slots, |slot| self.stage(slot, shared.as_ref()));
        let staged = claim_targets(staged);
        let reports = map_batch(parallel, staged, |stage| match stage {
            Stage::Done(report) => report,
            Stage::Ready(prepared) => self.complete(*prepared),
        });

        let summary = RunSummary::new(reports);
        let counts = summary.counts();
        tracing::info!(
            created = counts.created,
            already_exists = counts.already_exists,
            manual = counts.manual,
            skipped = counts.skipped,
            failed = counts.failed,
            "Run finished"
        );
        summary
    }

    /// Runs one table to a terminal state.
    pub fn process_table(&self, table: &str, session: Arc<SessionHandle>) -> TableReport {
        match self.prepare(TableRun::new(table), session) {
            Stage::Done(report) => report,
            Stage::Ready(prepared) => self.complete(*prepared),
        }
    }

    fn parallel_enabled(&self) -> bool {
        if self.config.parallel && !cfg!(feature = "parallel") {
            tracing::warn!("Built without the parallel feature, processing sequentially");
            return false;
        }
        self.config.parallel
    }

    fn stage(&self, slot: Slot, shared: Option<&Result<Arc<SessionHandle>>>) -> Stage {
        let table = match slot {
            Slot::Duplicate(table) => {
                return Stage::Done(TableReport::skipped(table, DUPLICATE_REASON))
            }
            Slot::Process(table) => table,
        };
        if self.cancel.is_cancelled() {
            return Stage::Done(TableReport::skipped(table, CANCELLED_REASON));
        }
        let run = TableRun::new(&table);
        let session = match shared {
            Some(Ok(handle)) => Arc::clone(handle),
            Some(Err(err)) => return Stage::Done(run.fail(err)),
            None => match SessionHandle::acquire(Arc::clone(&self.sessions)) {
                Ok(handle) => Arc::new(handle),
                Err(err) => return Stage::Done(run.fail(&err)),
            },
        };
        self.prepare(run, session)
    }

    fn prepare(&self, mut run: TableRun, session: Arc<SessionHandle>) -> Stage {
        match self.resolve_target(&mut run, &session) {
            Ok(target) => Stage::Ready(Box::new(Prepared {
                run,
                session,
                target,
            })),
            Err(err) => Stage::Done(run.fail(&err)),
        }
    }

    fn complete(&self, prepared: Prepared) -> TableReport {
        let Prepared {
            mut run,
            session,
            target,
        } = prepared;
        match self.apply_target(&mut run, &session, target) {
            Ok((state, outcome)) => {
                tracing::info!(table = %run.report.table, outcome = %outcome, "Table finished");
                run.finish(state, outcome)
            }
            Err(err) => run.fail(&err),
        }
    }

    /// Fetching, Resolving, Filtering and Naming. Reads only.
    fn resolve_target(&self, run: &mut TableRun, session: &SessionHandle) -> Result<Target> {
        let table = run.report.table.clone();
        let retries = self.config.auth_max_retries;

        // The resolver probes name variants through the fetch callback.
        run.enter(ControllerState::Fetching);
        let resolution = self.resolver.resolve(&table, |candidate| {
            let workspace = self.config.workspace_for(&table, candidate);
            with_auth_retry(session, retries, "fetch_schema", |s| {
                self.source.fetch_schema(s, workspace, candidate)
            })
        })?;

        run.enter(ControllerState::Resolving);
        if let Resolution::Ambiguous { reason, .. } = &resolution {
            tracing::info!(table = %table, %reason, "Continuing with best-guess schema");
        }
        let schema = resolution.into_schema();

        run.enter(ControllerState::Filtering);
        let (columns, warnings) = schema.normalize(self.config.mode);
        run.report.warnings.extend(warnings);

        run.enter(ControllerState::Naming);
        let resolved = match &self.name_override {
            Some(hook) => {
                let mut guard = hook.lock();
                self.naming.resolve(&schema.table_name, Some(&mut **guard))?
            }
            None => self.naming.resolve(&schema.table_name, None)?,
        };
        run.report.warnings.extend(resolved.warnings.iter().cloned());
        run.report.definition_name = Some(resolved.name.clone());

        Ok(Target {
            schema,
            columns,
            name: resolved.name,
        })
    }

    /// Existence check, Synthesizing, Assessing and the terminal step.
    fn apply_target(
        &self,
        run: &mut TableRun,
        session: &SessionHandle,
        target: Target,
    ) -> Result<(ControllerState, TableOutcome)> {
        let Target {
            schema,
            columns,
            name,
        } = target;
        let table = run.report.table.clone();
        let retries = self.config.auth_max_retries;

        let exists = with_auth_retry(session, retries, "resource_exists", |s| {
            self.deployer.resource_exists(s, &name)
        })?;
        if exists {
            tracing::info!(table = %table, name = %name, "Resource already exists");
            return Ok((ControllerState::Skipped, TableOutcome::AlreadyExists));
        }

        run.enter(ControllerState::Synthesizing);
        let synthesizer = TemplateSynthesizer::new(
            self.config.location.clone(),
            self.config.workspace_for(&table, &schema.table_name),
            self.config.endpoint.clone(),
        );
        let definition = synthesizer.synthesize(&schema.table_name, self.config.mode, &name, columns);

        run.enter(ControllerState::Assessing);
        let size = definition.serialized_size()?;
        let verdict = advisor::assess(&definition, size);
        run.report.warnings.extend(verdict.warnings.iter().cloned());
        run.report.verdict = Some(verdict.clone());

        // Both paths leave a self-contained template on disk.
        run.report.artifact = Some(self.store.write(&definition)?);

        if !verdict.auto_deployable {
            return Ok((
                ControllerState::ManualHandoff,
                TableOutcome::ManualDeploymentRecommended(manual_reason(&verdict)),
            ));
        }

        if !self.config.deploy {
            return Ok((
                ControllerState::Skipped,
                TableOutcome::Skipped(DRY_RUN_REASON.to_string()),
            ));
        }

        with_auth_retry(session, retries, "deploy", |s| self.deployer.deploy(s, &definition))?;
        Ok((ControllerState::AutoDeploy, TableOutcome::Created))
    }
}

/// Applies `f` to every item, on the worker pool when `parallel` is set.
/// Output keeps input order.
#[cfg(feature = "parallel")]
fn map_batch<T, R, F>(parallel: bool, items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    use rayon::prelude::*;

    if parallel {
        items.into_par_iter().map(f).collect()
    } else {
        items.into_iter().map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_batch<T, R, F>(_parallel: bool, items: Vec<T>, f: F) -> Vec<R>
where
    F: Fn(T) -> R,
{
    items.into_iter().map(f).collect()
}

/// Skips prepared tables whose remote table or resource name was already
/// claimed by an earlier position in the batch.
fn claim_targets(staged: Vec<Stage>) -> Vec<Stage> {
    let mut tables = HashSet::new();
    let mut names = HashSet::new();
    staged
        .into_iter()
        .map(|stage| match stage {
            Stage::Ready(prepared) => {
                let table_key = prepared.target.schema.table_name.to_ascii_lowercase();
                let name_key = prepared.target.name.to_ascii_lowercase();
                if tables.contains(&table_key) || names.contains(&name_key) {
                    tracing::warn!(
                        table = %prepared.run.report.table,
                        resolved = %prepared.target.schema.table_name,
                        name = %prepared.target.name,
                        "Table resolves to a target already claimed in this batch"
                    );
                    let Prepared { run, .. } = *prepared;
                    return Stage::Done(run.finish(
                        ControllerState::Skipped,
                        TableOutcome::Skipped(DUPLICATE_TARGET_REASON.to_string()),
                    ));
                }
                tables.insert(table_key);
                names.insert(name_key);
                Stage::Ready(prepared)
            }
            done => done,
        })
        .collect()
}

fn manual_reason(verdict: &DeploymentVerdict) -> String {
    let blocking = verdict.warnings.iter().find(|w| {
        matches!(
            w,
            TableWarning::SizeExceeded { .. } | TableWarning::ColumnCountExceeded { .. }
        )
    });
    match blocking {
        Some(warning) => format!("{} (complexity {})", warning, verdict.complexity_tier),
        None => verdict.reason.clone(),
    }
}

/// Marks repeated identifiers, keeping the first occurrence.
fn dedupe<S: AsRef<str>>(tables: &[S]) -> Vec<Slot> {
    let mut seen = HashSet::new();
    tables
        .iter()
        .map(|table| {
            let table = table.as_ref().trim().to_string();
            if seen.insert(table.to_ascii_lowercase()) {
                Slot::Process(table)
            } else {
                tracing::warn!(table = %table, "Duplicate table identifier in batch");
                Slot::Duplicate(table)
            }
        })
        .collect()
}
