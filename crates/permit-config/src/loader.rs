//! Multi-file configuration loading.
//!
//! The entry file may name other files under `include`. Their top-level
//! sections are merged into the entry file's table; a section defined twice
//! is an error rather than a silent override.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads an entry file together with its includes.
pub(crate) struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read, for cycle detection.
	visited: HashSet<PathBuf>,
	/// Top-level section name to the file that defined it.
	owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub(crate) fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			owners: HashMap::new(),
		}
	}

	/// Reads the entry file, merges its includes and parses the result.
	pub(crate) async fn load_config(
		&mut self,
		entry: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let entry_path = self.resolve_path(entry.as_ref());
		let mut root = self.read_table(&entry_path).await?;
		let includes = match root.remove("include") {
			Some(value) => parse_includes(&value)?,
			None => Vec::new(),
		};

		for key in root.keys() {
			self.owners.insert(key.clone(), entry_path.clone());
		}

		for include in includes {
			let path = self.resolve_path(&include);
			let table = self.read_table(&path).await?;
			if table.contains_key("include") {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					path.display()
				)));
			}
			for (key, value) in table {
				if let Some(owner) = self.owners.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Section '{}' is defined in both {} and {}",
						key,
						owner.display(),
						path.display()
					)));
				}
				self.owners.insert(key.clone(), path.clone());
				root.insert(key, value);
			}
		}

		tracing::debug!(
			files = self.visited.len(),
			sections = self.owners.len(),
			"Merged configuration files"
		);

		let merged = toml::to_string(&toml::Value::Table(root))
			.map_err(|e| ConfigError::Parse(format!("Failed to re-serialize configuration: {}", e)))?;
		merged.parse()
	}

	async fn read_table(&mut self, path: &Path) -> Result<toml::map::Map<String, toml::Value>, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Configuration file {} is included more than once",
				canonical.display()
			)));
		}

		let raw = tokio::fs::read_to_string(&canonical).await?;
		let resolved = resolve_env_vars(&raw)?;
		match toml::from_str::<toml::Value>(&resolved)? {
			toml::Value::Table(table) => Ok(table),
			other => Err(ConfigError::Parse(format!(
				"{} must contain a table, found {}",
				path.display(),
				other.type_str()
			))),
		}
	}

	fn resolve_path(&self, path: &Path) -> PathBuf {
		if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		}
	}
}

fn parse_includes(value: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("include must contain only strings".into())
				})
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"include must be a string or an array of strings".into(),
		)),
	}
}
