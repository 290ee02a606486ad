//! Job parameter documents
//!
//! Each job submission carries a JSON parameter document whose schema
//! depends on the job kind. All documents share a common envelope:
//! `{"parameters": {"<job-key>": {...}}}` with common identity fields, and
//! each kind adds its own flags.

use crate::domain::provider::Provider;
use crate::domain::Result;
use serde::Serialize;

/// Fields common to every job parameter document
#[derive(Debug, Clone, Serialize)]
pub struct CommonParameters {
    pub name: String,
    pub user_name: String,
    pub organisation_name: String,
    pub referential_name: String,
    /// Wipe the referential before running; serialized as "1"/"0"
    pub clean_repository: String,
}

impl CommonParameters {
    fn new(name: &str, provider: &Provider, clean_repository: bool) -> Self {
        Self {
            name: name.to_string(),
            user_name: provider.transform.user.clone(),
            organisation_name: provider.transform.organisation.clone(),
            referential_name: provider.transform.referential.as_str().to_string(),
            clean_repository: if clean_repository { "1" } else { "0" }.to_string(),
        }
    }
}

/// GTFS import parameter document
#[derive(Debug, Serialize)]
pub struct GtfsImportParameters {
    pub parameters: GtfsImportEnvelope,
}

#[derive(Debug, Serialize)]
pub struct GtfsImportEnvelope {
    #[serde(rename = "gtfs-import")]
    pub gtfs_import: GtfsImport,
}

#[derive(Debug, Serialize)]
pub struct GtfsImport {
    #[serde(flatten)]
    pub common: CommonParameters,
    pub no_save: bool,
    pub object_id_prefix: String,
    pub max_distance_for_commercial: u32,
    pub ignore_last_word: bool,
    pub ignore_end_chars: u32,
    pub max_distance_for_connection_link: u32,
    pub references_type: String,
}

impl GtfsImportParameters {
    /// Builds the parameter document for a GTFS import
    pub fn new(name: &str, provider: &Provider) -> Self {
        Self {
            parameters: GtfsImportEnvelope {
                gtfs_import: GtfsImport {
                    common: CommonParameters::new(
                        name,
                        provider,
                        provider.transform.enable_clean_import,
                    ),
                    no_save: false,
                    object_id_prefix: provider.transform.object_id_prefix.clone(),
                    max_distance_for_commercial: 0,
                    ignore_last_word: false,
                    ignore_end_chars: 0,
                    max_distance_for_connection_link: 0,
                    references_type: String::new(),
                },
            },
        }
    }
}

/// Stop-area import behavior for NeTEx imports
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopAreaImportMode {
    CreateNew,
}

/// NeTEx import parameter document
#[derive(Debug, Serialize)]
pub struct NetexImportParameters {
    pub parameters: NetexImportEnvelope,
}

#[derive(Debug, Serialize)]
pub struct NetexImportEnvelope {
    #[serde(rename = "netexprofile-import")]
    pub netex_import: NetexImport,
}

#[derive(Debug, Serialize)]
pub struct NetexImport {
    #[serde(flatten)]
    pub common: CommonParameters,
    pub parse_site_frames: bool,
    pub validate_against_schema: bool,
    pub validate_against_profile: bool,
    pub continue_on_line_errors: bool,
    pub object_id_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_area_import_mode: Option<StopAreaImportMode>,
}

impl NetexImportParameters {
    /// Builds the parameter document for a NeTEx import
    pub fn new(name: &str, provider: &Provider) -> Self {
        let stop_area_import_mode = provider
            .transform
            .allow_create_missing_stop_place
            .then_some(StopAreaImportMode::CreateNew);
        Self {
            parameters: NetexImportEnvelope {
                netex_import: NetexImport {
                    common: CommonParameters::new(
                        name,
                        provider,
                        provider.transform.enable_clean_import,
                    ),
                    parse_site_frames: false,
                    validate_against_schema: true,
                    validate_against_profile: true,
                    continue_on_line_errors: true,
                    object_id_prefix: provider.transform.object_id_prefix.clone(),
                    stop_area_import_mode,
                },
            },
        }
    }
}

/// GTFS export parameter document
#[derive(Debug, Serialize)]
pub struct GtfsExportParameters {
    pub parameters: GtfsExportEnvelope,
}

#[derive(Debug, Serialize)]
pub struct GtfsExportEnvelope {
    #[serde(rename = "gtfs-export")]
    pub gtfs_export: GtfsExport,
}

#[derive(Debug, Serialize)]
pub struct GtfsExport {
    #[serde(flatten)]
    pub common: CommonParameters,
    pub object_id_prefix: String,
    pub references_type: String,
}

impl GtfsExportParameters {
    /// Builds the parameter document for a GTFS export
    pub fn new(name: &str, provider: &Provider) -> Self {
        Self {
            parameters: GtfsExportEnvelope {
                gtfs_export: GtfsExport {
                    common: CommonParameters::new(name, provider, false),
                    object_id_prefix: provider.transform.object_id_prefix.clone(),
                    references_type: String::new(),
                },
            },
        }
    }
}

/// Transfer-export parameter document
///
/// Exports the provider's data into the migration target's data-space.
#[derive(Debug, Serialize)]
pub struct TransferExportParameters {
    pub parameters: TransferExportEnvelope,
}

#[derive(Debug, Serialize)]
pub struct TransferExportEnvelope {
    #[serde(rename = "transfer-export")]
    pub transfer_export: TransferExport,
}

#[derive(Debug, Serialize)]
pub struct TransferExport {
    #[serde(flatten)]
    pub common: CommonParameters,
    pub dest_referential_name: String,
}

impl TransferExportParameters {
    /// Builds the parameter document for a transfer to another data-space
    pub fn new(name: &str, provider: &Provider, dest_referential: &str) -> Self {
        Self {
            parameters: TransferExportEnvelope {
                transfer_export: TransferExport {
                    common: CommonParameters::new(name, provider, false),
                    dest_referential_name: dest_referential.to_string(),
                },
            },
        }
    }
}

/// Validation parameter document
///
/// The validation level is not part of the document; it is carried by the
/// job's event action.
#[derive(Debug, Serialize)]
pub struct ValidationParameters {
    pub parameters: ValidationEnvelope,
}

#[derive(Debug, Serialize)]
pub struct ValidationEnvelope {
    pub validate: CommonParameters,
}

impl ValidationParameters {
    /// Builds the parameter document for a validation run
    pub fn new(name: &str, provider: &Provider) -> Self {
        Self {
            parameters: ValidationEnvelope {
                validate: CommonParameters::new(name, provider, false),
            },
        }
    }
}

/// Serializes a parameter document to its JSON string form
pub fn to_json<T: Serialize>(parameters: &T) -> Result<String> {
    Ok(serde_json::to_string(parameters)?)
}
