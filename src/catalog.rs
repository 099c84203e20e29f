//! Catalog of anatomical region categories and their extraction protocols.
//!
//! Each category is known under several aliases ("eb", "ellipsoid body", ...) and
//! owns one protocol per extraction method. Lookups trim whitespace and ignore case.
//!
//! The built-in catalog is a process-wide static:
//!
//! ```
//! use neuro_roi::catalog::catalog;
//!
//! let protocol = catalog().default_protocol("FSB").unwrap();
//! assert_eq!(protocol.name(), "Outline fan");
//! ```

use crate::error::{RoiError, RoiResult};
use crate::protocols::{
    DrawRoi, ExtractionInput, ExtractionOptions, ExtractionProtocol, FitVonMises,
    FitVonMisesEllipse, GenericRoi, Ica, ManualSegmentation, OutlineFan, UseEllipse,
};
use crate::roi::Region;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

type ProtocolBox = Box<dyn ExtractionProtocol>;

static CATALOG: Lazy<Catalog> = Lazy::new(Catalog::builtin);

/// The built-in catalog.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

/// One anatomical region category.
#[derive(Debug)]
pub struct RegionCategory {
    name: String,
    aliases: Vec<String>,
    protocols: Vec<ProtocolBox>,
    default_protocol: usize,
}

impl RegionCategory {
    /// Category with no protocols yet.
    pub fn new(name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| normalize(a)).collect(),
            protocols: Vec::new(),
            default_protocol: 0,
        }
    }

    /// Add a protocol. Protocol names are unique within a category.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] for a duplicate name.
    pub fn with_protocol(mut self, protocol: impl ExtractionProtocol + 'static) -> RoiResult<Self> {
        if self.find(protocol.name()).is_some() {
            return Err(RoiError::InvalidParameter(format!(
                "protocol '{}' already registered for {}",
                protocol.name(),
                self.name
            )));
        }
        self.protocols.push(Box::new(protocol));
        Ok(self)
    }

    /// Make the named protocol the default.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] if no protocol has that name.
    pub fn with_default(mut self, protocol_name: &str) -> RoiResult<Self> {
        self.default_protocol = self.find(protocol_name).ok_or_else(|| {
            RoiError::InvalidParameter(format!(
                "no protocol '{}' for {}",
                protocol_name, self.name
            ))
        })?;
        Ok(self)
    }

    fn find(&self, protocol_name: &str) -> Option<usize> {
        let wanted = normalize(protocol_name);
        self.protocols
            .iter()
            .position(|p| p.name().to_lowercase() == wanted)
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup aliases, normalized.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Registered protocols in registration order.
    pub fn protocols(&self) -> impl Iterator<Item = &dyn ExtractionProtocol> {
        self.protocols.iter().map(|p| p.as_ref())
    }

    /// The default protocol, `None` for an empty category.
    pub fn default_protocol(&self) -> Option<&dyn ExtractionProtocol> {
        self.protocols.get(self.default_protocol).map(|p| p.as_ref())
    }

    /// Protocol by name, case-insensitive.
    pub fn protocol(&self, protocol_name: &str) -> Option<&dyn ExtractionProtocol> {
        self.find(protocol_name).map(|i| self.protocols[i].as_ref())
    }
}

/// Alias-indexed set of region categories.
#[derive(Debug, Default)]
pub struct Catalog {
    categories: Vec<RegionCategory>,
    by_alias: HashMap<String, usize>,
}

impl Catalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] if one of its aliases or its name is taken.
    pub fn register(&mut self, category: RegionCategory) -> RoiResult<()> {
        let index = self.categories.len();
        let mut keys: Vec<String> = category.aliases.clone();
        keys.push(normalize(&category.name));
        keys.sort();
        keys.dedup();
        for key in &keys {
            if let Some(&existing) = self.by_alias.get(key) {
                return Err(RoiError::InvalidParameter(format!(
                    "alias '{}' already maps to {}",
                    key, self.categories[existing].name
                )));
            }
        }
        for key in keys {
            self.by_alias.insert(key, index);
        }
        debug!(category = %category.name, "registered region category");
        self.categories.push(category);
        Ok(())
    }

    fn builtin() -> Self {
        let mut catalog = Self::new();
        if let Err(e) = catalog.register_builtin() {
            tracing::error!(error = %e, "built-in catalog is inconsistent");
        }
        catalog
    }

    fn register_builtin(&mut self) -> RoiResult<()> {
        self.register(
            RegionCategory::new("Ellipsoid body", &["eb", "ellipsoid body", "ellipsoid"])
                .with_protocol(UseEllipse)?
                .with_protocol(FitVonMisesEllipse)?
                .with_default("Use ellipse")?,
        )?;
        self.register(
            RegionCategory::new(
                "Fan-shaped body",
                &["fb", "fsb", "fan-shaped body", "fan shaped body", "fan"],
            )
            .with_protocol(OutlineFan)?
            .with_default("Outline fan")?,
        )?;
        self.register(
            RegionCategory::new(
                "Protocerebral bridge",
                &["pb", "pcb", "protocerebral bridge", "bridge"],
            )
            .with_protocol(FitVonMises)?
            .with_protocol(ManualSegmentation)?
            .with_default("Fit von Mises")?,
        )?;
        self.register(
            RegionCategory::new("Noduli", &["no", "noduli", "nodulus", "nod"])
                .with_protocol(DrawRoi)?
                .with_protocol(Ica)?
                .with_default("Draw ROI")?,
        )?;
        self.register(
            RegionCategory::new("Generic", &["generic"])
                .with_protocol(GenericRoi)?
                .with_default("Generic ROI")?,
        )
    }

    /// All categories in registration order.
    pub fn categories(&self) -> &[RegionCategory] {
        &self.categories
    }

    /// Category by alias.
    ///
    /// # Errors
    ///
    /// [`RoiError::InvalidParameter`] for an unknown alias.
    pub fn category(&self, alias: &str) -> RoiResult<&RegionCategory> {
        self.by_alias
            .get(&normalize(alias))
            .map(|&i| &self.categories[i])
            .ok_or_else(|| RoiError::InvalidParameter(format!("unknown region '{}'", alias)))
    }

    /// Default protocol of a category.
    pub fn default_protocol(&self, alias: &str) -> RoiResult<&dyn ExtractionProtocol> {
        let category = self.category(alias)?;
        category.default_protocol().ok_or_else(|| {
            RoiError::InvalidParameter(format!("{} has no protocols", category.name()))
        })
    }

    /// Named protocol of a category.
    pub fn protocol(&self, alias: &str, protocol_name: &str) -> RoiResult<&dyn ExtractionProtocol> {
        let category = self.category(alias)?;
        category.protocol(protocol_name).ok_or_else(|| {
            RoiError::InvalidParameter(format!(
                "{} has no protocol '{}'",
                category.name(),
                protocol_name
            ))
        })
    }

    /// Look up a protocol (the default when `protocol_name` is `None`) and run it.
    pub fn extract(
        &self,
        alias: &str,
        protocol_name: Option<&str>,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region> {
        let protocol = match protocol_name {
            Some(name) => self.protocol(alias, name)?,
            None => self.default_protocol(alias)?,
        };
        debug!(region = alias, protocol = protocol.name(), "dispatching extraction");
        protocol.extract(input, options)
    }
}
