// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Analyzer configuration.

/// Identity of the workflow framework and the names the analyzer looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Organization owning the framework module (default: "ballerina")
    pub framework_org: String,
    /// Framework module name (default: "workflow")
    pub framework_module: String,
    /// Internal support module that rewritten code calls into (default: "workflow.internal")
    pub internal_module: String,
    /// Prefix the rewriter uses when importing the internal module (default: "workflow_internal")
    pub internal_prefix: String,
    /// Remote method that mediates activity calls (default: "callActivity")
    pub dispatch_method: String,
    /// Remote method that is the entry point of a workflow service (default: "execute")
    pub entry_method: String,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            framework_org: "ballerina".to_string(),
            framework_module: "workflow".to_string(),
            internal_module: "workflow.internal".to_string(),
            internal_prefix: "workflow_internal".to_string(),
            dispatch_method: "callActivity".to_string(),
            entry_method: "execute".to_string(),
        }
    }
}

impl AnalyzerOptions {
    /// Set the framework organization and module name.
    pub fn with_framework(mut self, org: impl Into<String>, module: impl Into<String>) -> Self {
        self.framework_org = org.into();
        self.framework_module = module.into();
        self
    }

    /// Set the internal support module and the prefix used to import it.
    pub fn with_internal_module(
        mut self,
        module: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        self.internal_module = module.into();
        self.internal_prefix = prefix.into();
        self
    }

    /// Set the name of the mediating remote method.
    pub fn with_dispatch_method(mut self, name: impl Into<String>) -> Self {
        self.dispatch_method = name.into();
        self
    }

    /// Set the name of the service entry method.
    pub fn with_entry_method(mut self, name: impl Into<String>) -> Self {
        self.entry_method = name.into();
        self
    }

    /// Import line added to rewritten files.
    pub fn internal_import(&self) -> String {
        format!(
            "import {}/{} as {};",
            self.framework_org, self.internal_module, self.internal_prefix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalyzerOptions::default();
        assert_eq!(options.framework_org, "ballerina");
        assert_eq!(options.framework_module, "workflow");
        assert_eq!(
            options.internal_import(),
            "import ballerina/workflow.internal as workflow_internal;"
        );
    }

    #[test]
    fn test_builder_pattern() {
        let options = AnalyzerOptions::default()
            .with_framework("acme", "flows")
            .with_internal_module("flows.rt", "frt")
            .with_entry_method("run");
        assert_eq!(options.framework_org, "acme");
        assert_eq!(options.internal_prefix, "frt");
        assert_eq!(options.entry_method, "run");
        assert_eq!(options.dispatch_method, "callActivity");
    }
}
