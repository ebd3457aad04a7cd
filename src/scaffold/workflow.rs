//! GitHub Actions workflow that builds the registry and deploys it to Pages.
//!
//! The workflow is modelled as typed structs and serialized with
//! `serde_yaml`. Maps use `IndexMap` so the emitted YAML keeps insertion
//! order and is byte-identical across runs.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::types::BranchName;

/// Repository path of the generated workflow.
pub const WORKFLOW_PATH: &str = ".github/workflows/publish.yml";

/// Directory the registry build writes to and Pages serves from.
pub const BUILD_OUTPUT_DIR: &str = "public";

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    pub name: String,
    #[serde(rename = "on")]
    pub on: Triggers,
    pub permissions: IndexMap<String, String>,
    pub concurrency: Concurrency,
    pub jobs: IndexMap<String, Job>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Triggers {
    pub push: PushTrigger,
    pub workflow_dispatch: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushTrigger {
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Concurrency {
    pub group: String,
    pub cancel_in_progress: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    pub runs_on: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(rename = "with", skip_serializing_if = "IndexMap::is_empty")]
    pub with_inputs: IndexMap<String, String>,
}

impl Step {
    fn uses(name: &str, action: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            uses: Some(action.to_string()),
            ..Default::default()
        }
    }

    fn run(name: &str, command: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            run: Some(command.to_string()),
            ..Default::default()
        }
    }

    fn with_input(mut self, key: &str, value: &str) -> Self {
        self.with_inputs.insert(key.to_string(), value.to_string());
        self
    }

    fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

/// Workflow publishing the registry on every push to `branch`.
pub fn publish_workflow(branch: &BranchName) -> Workflow {
    let runner = "ubuntu-latest".to_string();

    let build = Job {
        needs: vec![],
        runs_on: runner.clone(),
        environment: None,
        steps: vec![
            Step::uses("Checkout", "actions/checkout@v4"),
            Step::uses("Setup Node", "actions/setup-node@v4").with_input("node-version", "20"),
            Step::run("Install", "npm install"),
            Step::run("Build registry", "npm run registry:build"),
            Step::uses("Upload artifact", "actions/upload-pages-artifact@v3")
                .with_input("path", BUILD_OUTPUT_DIR),
        ],
    };

    let deploy = Job {
        needs: vec!["build".to_string()],
        runs_on: runner,
        environment: Some(Environment {
            name: "github-pages".to_string(),
            url: "${{ steps.deployment.outputs.page_url }}".to_string(),
        }),
        steps: vec![Step::uses("Deploy", "actions/deploy-pages@v4").with_id("deployment")],
    };

    let permissions = [("contents", "read"), ("pages", "write"), ("id-token", "write")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Workflow {
        name: "Publish registry".to_string(),
        on: Triggers {
            push: PushTrigger {
                branches: vec![branch.to_string()],
            },
            workflow_dispatch: IndexMap::new(),
        },
        permissions,
        concurrency: Concurrency {
            group: "pages".to_string(),
            cancel_in_progress: false,
        },
        jobs: [("build".to_string(), build), ("deploy".to_string(), deploy)]
            .into_iter()
            .collect(),
    }
}

/// Render the workflow as YAML with a generation header.
pub fn render(workflow: &Workflow) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(workflow)?;
    Ok(format!(
        "# Generated by regsync; changes are overwritten on the next push.\n\n{yaml}"
    ))
}
