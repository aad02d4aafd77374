//! Translation job requests and the remote status snapshots they produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Derivative format requested from the translation service.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svf,
    Svf2,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "svf" => Some(OutputFormat::Svf),
            "svf2" => Some(OutputFormat::Svf2),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub urn: String,
    pub compressed_urn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_filename: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JobFormat {
    #[serde(rename = "type")]
    pub kind: OutputFormat,
    pub views: Vec<View>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JobOutput {
    pub formats: Vec<JobFormat>,
}

/// A request to produce viewable derivatives from an uploaded object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TranslationJob {
    pub input: JobInput,
    pub output: JobOutput,
}

impl TranslationJob {
    /// Build a job for `urn`.
    ///
    /// A non-empty `entry_file_name` marks the upload as a compressed archive
    /// whose root design is that file; an empty one means a single file.
    pub fn new(urn: &str, entry_file_name: &str, format: OutputFormat) -> Self {
        let root_filename = (!entry_file_name.is_empty()).then(|| entry_file_name.to_string());
        Self {
            input: JobInput {
                urn: urn.to_string(),
                compressed_urn: root_filename.is_some(),
                root_filename,
            },
            output: JobOutput {
                formats: vec![JobFormat {
                    kind: format,
                    views: vec![View::TwoD, View::ThreeD],
                }],
            },
        }
    }

    pub fn is_archive(&self) -> bool {
        self.input.compressed_urn
    }
}

/// Acceptance acknowledgment for a submitted job. Not a completion signal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobAcceptance {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_jobs: Option<Value>,
}

/// Remote status/result snapshot for a translation job.
///
/// Unknown fields are kept so the snapshot is passed through unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_thumbnail: Option<String>,
    #[serde(default)]
    pub derivatives: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
