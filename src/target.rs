//! Targets: a root element plus OS, device and middleware.
//!
//! Every tree-wide operation walks the elements one at a time in a fixed
//! order and stops at the first failure, which is attributed to the element
//! that caused it.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Write};
use std::path::Path;

use tracing::{info, instrument};

use crate::config::TargetDecl;
use crate::context::{TargetName, Toolbox};
use crate::element::Element;
use crate::error::{ConfigError, DeployError};
use crate::patch::PatchOutcome;

/// A deployable combination of OS, device and middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// The target's own element; its name is the target name.
    pub element: Element,
    /// The operating-system layer.
    pub os: Element,
    /// The device layer.
    pub device: Element,
    /// Middleware, in declaration order.
    pub middleware: Vec<Element>,
}

impl Target {
    /// Build the element tree for a validated target name.
    pub fn from_decl(
        name: &TargetName,
        decl: &TargetDecl,
        root: &Path,
    ) -> Result<Self, ConfigError> {
        let element = Element::from_decl(&decl.element, Some(name.as_str()), root)?;
        let os = Element::from_decl(&decl.os, Some(&format!("{name}.os")), root)?;
        let device = Element::from_decl(&decl.device, Some(&format!("{name}.device")), root)?;
        let middleware = decl
            .middleware
            .iter()
            .map(|(key, mw)| Element::from_decl(mw, Some(key), root))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            element,
            os,
            device,
            middleware,
        })
    }

    /// The target name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.element.name
    }

    /// Self, OS, device, then middleware.
    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        [&self.element, &self.os, &self.device]
            .into_iter()
            .chain(&self.middleware)
    }

    /// Whether any element still needs fetching.
    #[must_use]
    pub fn is_fetch_needed(&self) -> bool {
        self.elements().any(Element::is_fetch_needed)
    }

    /// Fetch every element.
    #[instrument(skip_all, fields(target = %self.name()))]
    pub fn fetch_elements(&self, tools: &Toolbox) -> Result<(), DeployError> {
        self.elements().try_for_each(|element| element.fetch(tools))
    }

    /// Delete every element's destination. The target's own destination
    /// goes last, since it may contain the others.
    #[instrument(skip_all, fields(target = %self.name()))]
    pub fn delete_elements(&self) -> Result<(), DeployError> {
        self.elements()
            .skip(1)
            .chain([&self.element])
            .try_for_each(Element::delete)
    }

    /// Apply every element's patch, skipping integrated ones.
    #[instrument(skip_all, fields(target = %self.name()))]
    pub fn patch_elements(
        &self,
        tools: &Toolbox,
    ) -> Result<Vec<(String, PatchOutcome)>, DeployError> {
        let mut outcomes = Vec::new();
        for element in self.elements() {
            if let Some(outcome) = element.apply_patch(tools)? {
                outcomes.push((element.name.clone(), outcome));
            }
        }
        Ok(outcomes)
    }

    /// Revert every element's patch, last applied first.
    #[instrument(skip_all, fields(target = %self.name()))]
    pub fn revert_patches(
        &self,
        tools: &Toolbox,
    ) -> Result<Vec<(String, PatchOutcome)>, DeployError> {
        let mut outcomes = Vec::new();
        for element in self.elements().rev() {
            if let Some(outcome) = element.revert_patch(tools)? {
                outcomes.push((element.name.clone(), outcome));
            }
        }
        info!("{} patch(es) processed", outcomes.len());
        Ok(outcomes)
    }

    /// Write the deployment instructions for the whole target.
    pub fn write_instructions(&self, out: &mut dyn Write) -> io::Result<()> {
        let name = self.name();
        let tail = 80usize.saturating_sub(22 + name.len());
        writeln!(out, "{} {name} {}", "~".repeat(30), "~".repeat(tail))?;
        for element in self.elements() {
            element.render(out)?;
        }
        writeln!(out)
    }
}
