// ==============================================================================
// nullfix.toml Configuration
// ==============================================================================
//
// Settings for one inference run: how deep to explore, which evaluator and
// approval mode to use, and where the producers write the files describing the
// target module and its downstream dependents.
//
// Example nullfix.toml:
//
// ```toml
// depth = 5
// evaluator = "cached"
// mode = "lower-bound"
// downstream = true
// report_path = "out/report.json"
//
// [target]
// name = "core"
// errors = "out/core/errors.tsv"
// calls = ["out/core/calls.tsv"]
// field_usages = ["out/core/field_usages.tsv"]
// methods = ["out/core/methods.tsv"]
// fields = ["out/core/fields.tsv"]
//
// [[downstream_modules]]
// name = "app"
// errors = "out/app/errors.tsv"
// calls = ["out/app/calls.tsv"]
// ```

use std::path::{Path, PathBuf};

use fix_model::{WireFormat, DEFAULT_ANNOTATION};
use region_index::ModuleSources;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::InferError;
use crate::policy::AnalysisMode;

pub const CONFIG_FILE_NAME: &str = "nullfix.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluatorKind {
    /// Assigns every fix a pessimistic effect without building.
    Void,
    /// Re-measures whole trees every round.
    Basic,
    /// Measures each fix once and composes tree effects from the cache.
    #[default]
    Cached,
}

/// Top-level `nullfix.toml` configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferConfig {
    /// Maximum number of exploration rounds per fix tree.
    pub depth: usize,
    pub evaluator: EvaluatorKind,
    /// Batch non-conflicting fixes into one build.
    pub optimized: bool,
    /// Inject the whole tree of an approved fix instead of only its root.
    pub chain: bool,
    /// Accept every fix the checker suggests without evaluating it.
    pub exhaustive: bool,
    pub mode: AnalysisMode,
    /// Measure the effect of return-type fixes on `downstream_modules`.
    pub downstream: bool,
    /// Upper limit on outer-loop iterations.
    pub max_iterations: usize,
    /// Column layout of the checker's errors file, `v1` or `v3`.
    pub wire_format: WireFormat,
    pub annotation: SmolStr,
    pub report_path: Option<PathBuf>,
    pub target: ModuleConfig,
    pub downstream_modules: Vec<ModuleConfig>,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            depth: 5,
            evaluator: EvaluatorKind::default(),
            optimized: true,
            chain: false,
            exhaustive: false,
            mode: AnalysisMode::default(),
            downstream: false,
            max_iterations: 100,
            wire_format: WireFormat::default(),
            annotation: SmolStr::new_static(DEFAULT_ANNOTATION),
            report_path: None,
            target: ModuleConfig::default(),
            downstream_modules: Vec::new(),
        }
    }
}

impl InferConfig {
    /// Exploration depth, never below one round.
    pub fn effective_depth(&self) -> usize {
        self.depth.max(1)
    }

    /// Make every relative path absolute against `base`.
    pub fn rebase(&mut self, base: &Path) {
        self.target.rebase(base);
        for module in &mut self.downstream_modules {
            module.rebase(base);
        }
        if let Some(path) = &mut self.report_path {
            *path = join(base, path);
        }
    }
}

/// Files produced for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub name: SmolStr,
    pub errors: PathBuf,
    pub fixes: Option<PathBuf>,
    pub field_usages: Vec<PathBuf>,
    pub calls: Vec<PathBuf>,
    pub parameter_usages: Vec<PathBuf>,
    pub methods: Vec<PathBuf>,
    pub fields: Vec<PathBuf>,
}

impl ModuleConfig {
    fn rebase(&mut self, base: &Path) {
        self.errors = join(base, &self.errors);
        if let Some(fixes) = &mut self.fixes {
            *fixes = join(base, fixes);
        }
        for list in [
            &mut self.field_usages,
            &mut self.calls,
            &mut self.parameter_usages,
            &mut self.methods,
            &mut self.fields,
        ] {
            for path in list.iter_mut() {
                *path = join(base, path);
            }
        }
    }
}

impl From<ModuleConfig> for ModuleSources {
    fn from(config: ModuleConfig) -> Self {
        ModuleSources {
            name: config.name,
            errors: config.errors,
            fixes: config.fixes,
            field_usages: config.field_usages,
            calls: config.calls,
            parameter_usages: config.parameter_usages,
            methods: config.methods,
            fields: config.fields,
        }
    }
}

fn join(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Walk up from `start_dir` looking for `nullfix.toml`. Returns the first match.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse a `nullfix.toml` file. Relative paths are resolved against
/// the directory holding the file.
pub fn load_config(path: &Path) -> Result<InferConfig, InferError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InferError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: InferConfig =
        toml::from_str(&contents).map_err(|source| InferError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(base) = path.parent() {
        config.rebase(base);
    }
    Ok(config)
}
