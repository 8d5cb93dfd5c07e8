//! The `[plugins]` section: an ordered plugin pipeline per category.
//!
//! Categories run in a fixed order ([`Category::ALL`]); within a category
//! plugins run in list order. Plugin names are unique per category and double
//! as the binary filename inside `plugins.dir`.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::OperationResult;

/// Plugin category, in pipeline execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Authentication,
    Authorization,
    RateLimiting,
    Validation,
    Content,
    Observability,
    Audit,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Authentication,
        Category::Authorization,
        Category::RateLimiting,
        Category::Validation,
        Category::Content,
        Category::Observability,
        Category::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Authentication => "authentication",
            Category::Authorization => "authorization",
            Category::RateLimiting => "rate_limiting",
            Category::Validation => "validation",
            Category::Content => "content",
            Category::Observability => "observability",
            Category::Audit => "audit",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
                ConfigError::invalid(
                    "category",
                    format!("unknown category '{}' (valid: {})", s, valid.join(", ")),
                )
            })
    }
}

/// Stage at which a plugin sees a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Request,
    Response,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Request => "request",
            Flow::Response => "response",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Flow::Request),
            "response" => Ok(Flow::Response),
            _ => Err(ConfigError::invalid(
                "flow",
                format!("unknown flow '{}' (valid: request, response)", s),
            )),
        }
    }
}

/// A single plugin in a category's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Plugin name, also the binary filename
    pub name: String,

    /// Flows the plugin participates in (never empty)
    pub flows: BTreeSet<Flow>,

    /// Whether a failure of this plugin fails the request; absent is not `false`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>, flows: impl IntoIterator<Item = Flow>) -> Self {
        Self {
            name: name.into(),
            flows: flows.into_iter().collect(),
            required: None,
            commit_hash: None,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.commit_hash = Some(hash.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.push(ConfigError::EmptyInput("plugin name".to_string()));
        } else if name.contains(['/', '\\']) || name == "." || name == ".." {
            errors.push(ConfigError::invalid(
                format!("plugin '{}'", self.name),
                "name must be a plain file name",
            ));
        }
        if self.flows.is_empty() {
            errors.push(ConfigError::invalid(
                format!("plugin '{}'", self.name),
                "at least one flow is required",
            ));
        }
        if let Some(hash) = &self.commit_hash
            && hash.trim().is_empty()
        {
            errors.push(ConfigError::invalid(
                format!("plugin '{}'", self.name),
                "commit hash must not be empty",
            ));
        }
        ConfigError::collect(errors)
    }
}

/// Where to place a plugin within its (destination) category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Before(String),
    After(String),
    /// 1-indexed slot; `-1` means the end.
    Position(i64),
}

/// Parameters of a move.
#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    pub to_category: Option<Category>,
    pub placement: Option<Placement>,
    /// Replace a same-named plugin in the destination category.
    pub force: bool,
}

impl MoveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_category(mut self, category: Category) -> Self {
        self.to_category = Some(category);
        self
    }

    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.placement = Some(Placement::Before(name.into()));
        self
    }

    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.placement = Some(Placement::After(name.into()));
        self
    }

    pub fn position(mut self, position: i64) -> Self {
        self.placement = Some(Placement::Position(position));
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PluginCatalogue {
    /// Directory holding the plugin binaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_limiting: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observability: Vec<PluginEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<PluginEntry>,
}

impl PluginCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugins(&self, category: Category) -> &[PluginEntry] {
        match category {
            Category::Authentication => &self.authentication,
            Category::Authorization => &self.authorization,
            Category::RateLimiting => &self.rate_limiting,
            Category::Validation => &self.validation,
            Category::Content => &self.content,
            Category::Observability => &self.observability,
            Category::Audit => &self.audit,
        }
    }

    fn plugins_mut(&mut self, category: Category) -> &mut Vec<PluginEntry> {
        match category {
            Category::Authentication => &mut self.authentication,
            Category::Authorization => &mut self.authorization,
            Category::RateLimiting => &mut self.rate_limiting,
            Category::Validation => &mut self.validation,
            Category::Content => &mut self.content,
            Category::Observability => &mut self.observability,
            Category::Audit => &mut self.audit,
        }
    }

    /// Every non-empty category, keyed in execution order.
    pub fn all_categories(&self) -> BTreeMap<Category, &[PluginEntry]> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.plugins(c)))
            .filter(|(_, plugins)| !plugins.is_empty())
            .collect()
    }

    pub fn plugin(&self, category: Category, name: &str) -> Option<&PluginEntry> {
        self.plugins(category).iter().find(|p| p.name == name)
    }

    fn index_of(&self, category: Category, name: &str) -> Option<usize> {
        self.plugins(category).iter().position(|p| p.name == name)
    }

    /// Number of unique plugin names across all categories.
    pub fn distinct_count(&self) -> usize {
        Category::ALL
            .iter()
            .flat_map(|c| self.plugins(*c))
            .map(|p| p.name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Copy holding the directory and the plugins of `category` only.
    pub fn only(&self, category: Category) -> PluginCatalogue {
        let mut scoped = PluginCatalogue {
            dir: self.dir.clone(),
            ..Default::default()
        };
        *scoped.plugins_mut(category) = self.plugins(category).to_vec();
        scoped
    }

    /// Whether no plugin and no directory is configured.
    pub fn is_empty(&self) -> bool {
        self.dir.is_none() && Category::ALL.iter().all(|c| self.plugins(*c).is_empty())
    }

    /// Set or clear the plugin directory.
    pub fn set_dir(&mut self, dir: Option<String>) -> OperationResult {
        let dir = dir.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        let result = OperationResult::from_change(self.dir.as_ref(), dir.as_ref());
        self.dir = dir;
        result
    }

    /// Insert or replace a plugin in place.
    ///
    /// `Noop` when an identical entry (including optional-field presence)
    /// already exists.
    pub fn upsert(
        &mut self,
        category: Category,
        entry: PluginEntry,
    ) -> Result<OperationResult, ConfigError> {
        entry.validate()?;
        let plugins = self.plugins_mut(category);
        match plugins.iter_mut().find(|p| p.name == entry.name) {
            Some(existing) if *existing == entry => Ok(OperationResult::Noop),
            Some(existing) => {
                *existing = entry;
                Ok(OperationResult::Updated)
            }
            None => {
                plugins.push(entry);
                Ok(OperationResult::Created)
            }
        }
    }

    pub fn delete(
        &mut self,
        category: Category,
        name: &str,
    ) -> Result<OperationResult, ConfigError> {
        let index = self
            .index_of(category, name)
            .ok_or_else(|| not_found(category, name))?;
        self.plugins_mut(category).remove(index);
        Ok(OperationResult::Deleted)
    }

    /// Reorder a plugin within its category or move it to another one.
    ///
    /// A cross-category move onto an existing name fails with `Conflict`
    /// unless `force` is set, in which case the destination entry is replaced
    /// in its own slot (or at the requested placement).
    pub fn move_plugin(
        &mut self,
        category: Category,
        name: &str,
        options: &MoveOptions,
    ) -> Result<OperationResult, ConfigError> {
        let source_index = self
            .index_of(category, name)
            .ok_or_else(|| not_found(category, name))?;

        match options.to_category {
            Some(target) if target == category => Err(ConfigError::invalid(
                "to-category",
                format!("plugin '{}' is already in category '{}'", name, category),
            )),
            Some(target) => self.move_across(category, source_index, target, options),
            None => {
                let placement = options.placement.as_ref().ok_or_else(|| {
                    ConfigError::MissingArgument(
                        "one of to-category, before, after or position".to_string(),
                    )
                })?;
                self.move_within(category, source_index, placement)
            }
        }
    }

    fn move_within(
        &mut self,
        category: Category,
        source_index: usize,
        placement: &Placement,
    ) -> Result<OperationResult, ConfigError> {
        let plugins = self.plugins_mut(category);
        let before: Vec<String> = plugins.iter().map(|p| p.name.clone()).collect();
        let remaining: Vec<&str> = before
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != source_index)
            .map(|(_, name)| name.as_str())
            .collect();
        let index = resolve_index(&remaining, placement, &before[source_index], category)?;

        let entry = plugins.remove(source_index);
        plugins.insert(index, entry);

        let changed = plugins.iter().map(|p| &p.name).ne(before.iter());
        Ok(if changed {
            OperationResult::Updated
        } else {
            OperationResult::Noop
        })
    }

    fn move_across(
        &mut self,
        category: Category,
        source_index: usize,
        target: Category,
        options: &MoveOptions,
    ) -> Result<OperationResult, ConfigError> {
        if matches!(
            options.placement,
            Some(Placement::Before(_)) | Some(Placement::After(_))
        ) {
            return Err(ConfigError::invalid(
                "to-category",
                "cannot be combined with before or after; use position",
            ));
        }

        let name = self.plugins(category)[source_index].name.clone();
        let conflict_index = self.index_of(target, &name);
        if conflict_index.is_some() && !options.force {
            return Err(ConfigError::Conflict(format!(
                "plugin '{}' already exists in category '{}' (use force to overwrite)",
                name, target
            )));
        }

        // Validate the placement before mutating anything.
        let destination_len = self.plugins(target).len() - usize::from(conflict_index.is_some());
        let position = match &options.placement {
            Some(Placement::Position(n)) => Some(position_index(*n, destination_len + 1)?),
            _ => None,
        };

        let entry = self.plugins_mut(category).remove(source_index);
        let destination = self.plugins_mut(target);
        match (conflict_index, position) {
            (Some(slot), None) => destination[slot] = entry,
            (Some(slot), Some(index)) => {
                destination.remove(slot);
                destination.insert(index, entry);
            }
            (None, Some(index)) => destination.insert(index, entry),
            (None, None) => destination.push(entry),
        }

        Ok(OperationResult::Updated)
    }

    /// Structural checks over every category.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if let Some(dir) = &self.dir
            && dir.trim().is_empty()
        {
            errors.push(ConfigError::EmptyInput("plugins.dir".to_string()));
        }
        for category in Category::ALL {
            if let Err(err) = self.validate_category(category) {
                errors.extend(err.into_leaves());
            }
        }
        ConfigError::collect(errors)
    }

    pub fn validate_category(&self, category: Category) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for plugin in self.plugins(category) {
            if let Err(err) = plugin.validate() {
                for leaf in err.into_leaves() {
                    errors.push(ConfigError::invalid(category.as_str(), leaf.to_string()));
                }
            }
            if !seen.insert(plugin.name.as_str()) {
                errors.push(ConfigError::invalid(
                    category.as_str(),
                    format!("duplicate plugin '{}'", plugin.name),
                ));
            }
        }
        ConfigError::collect(errors)
    }
}

fn not_found(category: Category, name: &str) -> ConfigError {
    ConfigError::not_found(format!("plugin '{}' in category '{}'", name, category))
}

/// Convert a 1-indexed position (or `-1` for the end) into an insert index
/// for a list that will hold `len` entries after insertion.
fn position_index(position: i64, len: usize) -> Result<usize, ConfigError> {
    if position == -1 {
        return Ok(len - 1);
    }
    match usize::try_from(position) {
        Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
        _ => Err(ConfigError::invalid(
            "position",
            format!("position {} out of range (1-{} or -1 for the end)", position, len),
        )),
    }
}

/// Insert index for `placement` once the moving entry has been taken out.
fn resolve_index(
    remaining: &[&str],
    placement: &Placement,
    moving: &str,
    category: Category,
) -> Result<usize, ConfigError> {
    let anchor = |other: &str| -> Result<usize, ConfigError> {
        if other == moving {
            return Err(ConfigError::invalid(
                "placement",
                format!("cannot place plugin '{}' relative to itself", moving),
            ));
        }
        remaining
            .iter()
            .position(|name| *name == other)
            .ok_or_else(|| not_found(category, other))
    };

    match placement {
        Placement::Before(other) => anchor(other),
        Placement::After(other) => anchor(other).map(|i| i + 1),
        Placement::Position(n) => position_index(*n, remaining.len() + 1),
    }
}
