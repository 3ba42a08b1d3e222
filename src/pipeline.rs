//! Ordered module pipeline building a level.
//!
//! A run initializes the level, executes every enabled module in declared order
//! (one module per [`LevelGenerationPipeline::step`]), builds the block meshes
//! and finally notifies the registered listeners once.
use crate::config::TerrainSettings;
use crate::error::{LevelGenError, Result};
use crate::level::LevelRepresentation;
use crate::mesh::{generate_terrain_meshes, MeshSink, MeshStats, MeshStore, TerrainMesh};
use crate::race_generation::RaceParameters;
use crate::region::{RegionCatalog, RegionKind, RegionTables};
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Random number generator shared by all modules of one run.
pub type LevelRng = rand_chacha::ChaCha8Rng;

/// One stage of level generation.
///
/// A module may read and write terrain points, append track points and bonus
/// spots, and add regions to the in-level set. It must leave the level
/// consistent, e.g. any region it tags points with is also marked in-level.
pub trait LevelGeneratorModule: Send {
    fn name(&self) -> &'static str;

    fn generate(&mut self, level: &mut LevelRepresentation, rng: &mut LevelRng) -> Result<()>;

    /// Takes over the parameters derived from player stats. Modules not
    /// affected by them ignore the call.
    fn apply_race_parameters(&mut self, _params: &RaceParameters) {}
}

pub struct ModuleSlot {
    pub module: Box<dyn LevelGeneratorModule>,
    pub enabled: bool,
}

impl ModuleSlot {
    pub fn new(module: Box<dyn LevelGeneratorModule>, enabled: bool) -> Self {
        Self { module, enabled }
    }

    pub fn enabled(module: impl LevelGeneratorModule + 'static) -> Self {
        Self::new(Box::new(module), true)
    }

    pub fn disabled(module: impl LevelGeneratorModule + 'static) -> Self {
        Self::new(Box::new(module), false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running { next_module: usize },
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStep {
    ModuleRan(&'static str),
    ModuleSkipped(&'static str),
    Completed(MeshStats),
}

/// Single-shot "level generated" listener.
pub type LevelListener = Box<dyn FnOnce(&LevelRepresentation) + Send>;

pub struct LevelGenerationPipeline {
    terrain: TerrainSettings,
    catalog: RegionCatalog,
    modules: Vec<ModuleSlot>,
    level: LevelRepresentation,
    region_tables: RegionTables,
    terrain_regions_to_include: Vec<RegionKind>,
    seed: Option<u64>,
    seed_used: u64,
    rng: LevelRng,
    state: PipelineState,
    meshes: MeshStore,
    mesh_sink: Option<Box<dyn MeshSink + Send>>,
    listeners: Vec<LevelListener>,
}

impl LevelGenerationPipeline {
    pub fn new(terrain: TerrainSettings, catalog: RegionCatalog) -> Self {
        let level = LevelRepresentation::new(
            terrain.dimensions(),
            terrain.point_offset,
            terrain.block_size,
        );
        Self {
            terrain,
            catalog,
            modules: Vec::new(),
            level,
            region_tables: RegionTables::default(),
            terrain_regions_to_include: Vec::new(),
            seed: None,
            seed_used: 0,
            rng: LevelRng::seed_from_u64(0),
            state: PipelineState::Idle,
            meshes: MeshStore::new(),
            mesh_sink: None,
            listeners: Vec::new(),
        }
    }

    pub fn with_modules(mut self, modules: Vec<ModuleSlot>) -> Self {
        self.modules = modules;
        self
    }

    pub fn add_module(&mut self, module: Box<dyn LevelGeneratorModule>, enabled: bool) {
        self.modules.push(ModuleSlot::new(module, enabled));
    }

    pub fn modules(&self) -> &[ModuleSlot] {
        &self.modules
    }

    /// Enables or disables every module with the given name. Returns `false`
    /// if there is none.
    pub fn set_module_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for slot in self.modules.iter_mut().filter(|s| s.module.name() == name) {
            slot.enabled = enabled;
            found = true;
        }
        found
    }

    pub fn set_terrain_settings(&mut self, terrain: TerrainSettings) {
        self.terrain = terrain;
    }

    pub fn set_region_tables(&mut self, tables: RegionTables) {
        self.region_tables = tables;
    }

    pub fn set_terrain_regions_to_include(&mut self, regions: Vec<RegionKind>) {
        self.terrain_regions_to_include = regions;
    }

    /// Fixed seed for the next runs, `None` draws a fresh one per run.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    /// Seed of the current or last run.
    pub fn seed_used(&self) -> u64 {
        self.seed_used
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Forwards every block mesh to `sink` in addition to the internal store.
    pub fn set_mesh_sink(&mut self, sink: Box<dyn MeshSink + Send>) {
        self.mesh_sink = Some(sink);
    }

    pub fn apply_race_parameters(&mut self, params: &RaceParameters) {
        for slot in &mut self.modules {
            slot.module.apply_race_parameters(params);
        }
    }

    /// Registers a listener fired once when the current or next run completes.
    pub fn on_level_generated(&mut self, listener: impl FnOnce(&LevelRepresentation) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.state, PipelineState::Running { .. })
    }

    pub fn level(&self) -> &LevelRepresentation {
        &self.level
    }

    pub fn meshes(&self) -> &MeshStore {
        &self.meshes
    }

    /// Initializes the level for a new run. Fails if a run is in progress.
    pub fn start(&mut self) -> Result<()> {
        if self.is_generating() {
            return Err(LevelGenError::GenerationInProgress);
        }

        self.seed_used = self.seed.unwrap_or_else(rand::random);
        self.rng = LevelRng::seed_from_u64(self.seed_used);
        self.level.initialize(
            self.terrain.dimensions(),
            self.terrain.point_offset,
            self.terrain.block_size,
            &self.catalog,
            self.region_tables.clone(),
        );
        self.level.terrain_regions_to_include = self.terrain_regions_to_include.clone();
        self.meshes.clear();
        self.state = PipelineState::Running { next_module: 0 };

        let dimensions = self.level.terrain.dimensions();
        info!(
            "Starting level generation: {}x{} terrain, seed {}, {} modules",
            dimensions.x,
            dimensions.y,
            self.seed_used,
            self.modules.len()
        );
        Ok(())
    }

    /// Advances the current run by one module, or finishes it once every
    /// module has run.
    pub fn step(&mut self) -> Result<GenerationStep> {
        let next_module = match self.state {
            PipelineState::Running { next_module } => next_module,
            _ => return Err(LevelGenError::NotInitialized),
        };

        match self.modules.get_mut(next_module) {
            Some(slot) => {
                let name = slot.module.name();
                self.state = PipelineState::Running {
                    next_module: next_module + 1,
                };
                if !slot.enabled {
                    debug!("Skipping disabled module {}", name);
                    return Ok(GenerationStep::ModuleSkipped(name));
                }
                debug!("Running module {}", name);
                if let Err(e) = slot.module.generate(&mut self.level, &mut self.rng) {
                    warn!("Module {} failed: {}", name, e);
                    self.state = PipelineState::Failed;
                    return Err(e);
                }
                debug!("Module {} finished", name);
                Ok(GenerationStep::ModuleRan(name))
            }
            None => {
                let stats = self.finish_run()?;
                let listeners = std::mem::take(&mut self.listeners);
                for listener in listeners {
                    listener(&self.level);
                }
                Ok(GenerationStep::Completed(stats))
            }
        }
    }

    /// Runs a whole generation synchronously.
    pub fn generate(&mut self) -> Result<&LevelRepresentation> {
        self.start()?;
        while !matches!(self.step()?, GenerationStep::Completed(_)) {}
        Ok(&self.level)
    }

    /// Runs a whole generation, yielding to the runtime between modules.
    pub async fn generate_async(&mut self) -> Result<&LevelRepresentation> {
        self.start()?;
        loop {
            if let GenerationStep::Completed(_) = self.step()? {
                break;
            }
            tokio::task::yield_now().await;
        }
        Ok(&self.level)
    }

    /// Resets the level in place and replays all enabled modules with the
    /// current parameters, continuing the run's random sequence. Listeners
    /// already notified are not notified again.
    pub fn regenerate(&mut self) -> Result<&LevelRepresentation> {
        match self.state {
            PipelineState::Idle => return Err(LevelGenError::NotInitialized),
            PipelineState::Running { .. } => return Err(LevelGenError::GenerationInProgress),
            PipelineState::Complete | PipelineState::Failed => {}
        }

        self.level.terrain.update_parameters(
            self.terrain.dimensions(),
            self.terrain.point_offset,
            self.terrain.block_size,
        );
        self.level.reset_level();
        self.meshes.clear();
        info!("Regenerating level {}", self.level.id);

        for slot in self.modules.iter_mut().filter(|s| s.enabled) {
            if let Err(e) = slot.module.generate(&mut self.level, &mut self.rng) {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        }
        self.finish_run()?;
        Ok(&self.level)
    }

    fn finish_run(&mut self) -> Result<MeshStats> {
        let mut sink = ForwardingSink {
            store: &mut self.meshes,
            extra: self.mesh_sink.as_deref_mut(),
        };
        match generate_terrain_meshes(&self.level.terrain, &self.level.terrain_regions, &mut sink) {
            Ok(stats) => {
                self.state = PipelineState::Complete;
                info!(
                    "Level {} generated with {} track points and {} bonus spots",
                    self.level.id,
                    self.level.track.len(),
                    self.level.bonuses.len()
                );
                Ok(stats)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }
}

struct ForwardingSink<'a> {
    store: &'a mut MeshStore,
    extra: Option<&'a mut (dyn MeshSink + Send + 'static)>,
}

impl MeshSink for ForwardingSink<'_> {
    fn submit_block_mesh(&mut self, block_x: usize, block_z: usize, mesh: TerrainMesh) {
        if let Some(extra) = self.extra.as_deref_mut() {
            extra.submit_block_mesh(block_x, block_z, mesh.clone());
        }
        self.store.submit_block_mesh(block_x, block_z, mesh);
    }
}
