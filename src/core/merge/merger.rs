//! GTFS merge engine
//!
//! Merges a collection of GTFS archives into a single working directory,
//! file by file. Duplicates in stops.txt and transfers.txt are removed; all
//! other entries are assumed not to overlap. Stop duplicates are identified
//! by stop id, transfer duplicates by comparing the whole projected row.

use crate::core::merge::headers::{target_headers, GTFS_FILE_NAMES};
use crate::core::merge::route_types::{to_basic_route_type, to_google_route_type};
use crate::domain::MergeError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

/// GTFS export variant
///
/// Controls route type code translation and, together with the
/// shape-removal flag, shape retention in the merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GtfsExportVariant {
    /// Extended route type codes are kept as-is
    #[default]
    Extended,
    /// Extended codes are collapsed to the classic GTFS 0-7 set
    Basic,
    /// Extended codes are collapsed to Google's supported subset
    Google,
}

/// Merges GTFS archives into a working directory
///
/// The working directory and the dedup sets are owned exclusively by one
/// merge run and discarded when it completes; a merger is never shared
/// across concurrent merges.
pub struct GtfsMerger {
    working_directory: PathBuf,
    variant: GtfsExportVariant,
    remove_shapes: bool,
    stop_ids: HashSet<String>,
    transfers: HashSet<Vec<String>>,
}

impl GtfsMerger {
    /// Creates a merger writing into the given working directory
    ///
    /// # Arguments
    ///
    /// * `working_directory` - temporary directory in which the GTFS files
    ///   are merged
    /// * `variant` - the type of GTFS export
    /// * `remove_shapes` - drop shape data from the merged output
    pub fn new(
        working_directory: impl Into<PathBuf>,
        variant: GtfsExportVariant,
        remove_shapes: bool,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            variant,
            remove_shapes,
            stop_ids: HashSet::with_capacity(150_000),
            transfers: HashSet::with_capacity(15_000),
        }
    }

    /// Merges one GTFS archive into the working directory
    ///
    /// # Errors
    ///
    /// Any I/O or CSV error is fatal to the whole merge run. Non-UTF-8
    /// entry names or content are reported as [`MergeError::Encoding`].
    pub fn append_feed(&mut self, archive: &Path) -> Result<(), MergeError> {
        tracing::debug!(archive = %archive.display(), "Merging GTFS archive");

        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file))?;

        for index in 0..zip.len() {
            let entry = zip.by_index(index)?;
            let entry_name = std::str::from_utf8(entry.name_raw())
                .map_err(|_| {
                    MergeError::Encoding(format!(
                        "Non-UTF-8 entry name in archive {}",
                        archive.display()
                    ))
                })?
                .to_string();

            if !GTFS_FILE_NAMES.contains(&entry_name.as_str()) {
                continue;
            }
            if entry_name == "shapes.txt" && self.remove_shapes {
                tracing::trace!(archive = %archive.display(), "Ignoring shape data");
                continue;
            }

            let destination = self.working_directory.join(&entry_name);
            let ignore_header = destination.exists();

            match entry_name.as_str() {
                "stops.txt" => self.append_stop_entry(entry, &destination, ignore_header)?,
                "transfers.txt" => self.append_transfer_entry(entry, &destination, ignore_header)?,
                _ => self.append_entry(&entry_name, entry, &destination, ignore_header)?,
            }
        }
        Ok(())
    }

    /// Number of distinct stop ids seen so far
    pub fn unique_stop_count(&self) -> usize {
        self.stop_ids.len()
    }

    /// Number of distinct transfer rows seen so far
    pub fn unique_transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Appends stop entries, removing duplicates by stop id
    fn append_stop_entry(
        &mut self,
        entry: impl Read,
        destination: &Path,
        ignore_header: bool,
    ) -> Result<(), MergeError> {
        let headers = target_headers("stops.txt");
        let mut reader = csv_reader(entry);
        let source_index = header_index(&mut reader)?;
        let mut writer = self.open_writer(destination, headers, ignore_header)?;

        for record in reader.records() {
            let record = record?;
            let stop_id = field(&source_index, &record, "stop_id").unwrap_or("");
            if self.stop_ids.contains(stop_id) {
                tracing::trace!(stop_id, "Ignored duplicated stop");
                continue;
            }
            self.stop_ids.insert(stop_id.to_string());
            let values = self.project(&source_index, &record, headers);
            writer.write_record(&values)?;
        }
        writer.flush().map_err(MergeError::from)
    }

    /// Appends transfer entries, removing duplicates by full projected row
    fn append_transfer_entry(
        &mut self,
        entry: impl Read,
        destination: &Path,
        ignore_header: bool,
    ) -> Result<(), MergeError> {
        let headers = target_headers("transfers.txt");
        let mut reader = csv_reader(entry);
        let source_index = header_index(&mut reader)?;
        let mut writer = self.open_writer(destination, headers, ignore_header)?;

        for record in reader.records() {
            let record = record?;
            let values = self.project(&source_index, &record, headers);
            if self.transfers.contains(&values) {
                tracing::trace!(row = ?values, "Ignored duplicated transfer");
                continue;
            }
            writer.write_record(&values)?;
            self.transfers.insert(values);
        }
        writer.flush().map_err(MergeError::from)
    }

    /// Appends GTFS entries other than stops and transfers. No duplicate
    /// check is performed.
    fn append_entry(
        &mut self,
        entry_name: &str,
        entry: impl Read,
        destination: &Path,
        ignore_header: bool,
    ) -> Result<(), MergeError> {
        let headers = target_headers(entry_name);
        let mut reader = csv_reader(entry);
        let source_index = header_index(&mut reader)?;
        let mut writer = self.open_writer(destination, headers, ignore_header)?;

        for record in reader.records() {
            let record = record?;
            let values = self.project(&source_index, &record, headers);
            writer.write_record(&values)?;
        }
        writer.flush().map_err(MergeError::from)
    }

    /// Projects a source row onto the target headers
    fn project(
        &self,
        source_index: &HashMap<String, usize>,
        record: &csv::StringRecord,
        headers: &[&str],
    ) -> Vec<String> {
        headers
            .iter()
            .map(|header| self.convert_value(source_index, record, header))
            .collect()
    }

    /// Converts one field value during projection
    ///
    /// Missing and empty fields become empty strings. Legacy zero-valued
    /// enum fields collapse "0" to "" for compatibility with the original
    /// merge algorithm. Route type codes are translated per export variant.
    fn convert_value(
        &self,
        source_index: &HashMap<String, usize>,
        record: &csv::StringRecord,
        header: &str,
    ) -> String {
        let value = match field(source_index, record, header) {
            None => return String::new(),
            Some(value) => value,
        };
        if value.is_empty() {
            return String::new();
        }
        match header {
            "wheelchair_accessible" | "location_type" | "drop_off_type" | "pickup_type"
                if value == "0" =>
            {
                String::new()
            }
            "route_type" | "vehicle_type" => self.convert_route_type(value),
            "shape_id" if self.remove_shapes => String::new(),
            _ => value.to_string(),
        }
    }

    fn convert_route_type(&self, value: &str) -> String {
        if self.variant == GtfsExportVariant::Extended {
            return value.to_string();
        }
        let code: i64 = match value.parse() {
            Ok(code) => code,
            Err(_) => {
                tracing::warn!(route_type = value, "Invalid route type");
                return value.to_string();
            }
        };
        match self.variant {
            GtfsExportVariant::Google => to_google_route_type(code).to_string(),
            GtfsExportVariant::Basic => match to_basic_route_type(code) {
                Some(basic) => basic.to_string(),
                None => {
                    tracing::warn!(route_type = code, "Route type has no basic equivalent");
                    value.to_string()
                }
            },
            GtfsExportVariant::Extended => unreachable!(),
        }
    }

    /// Opens an appending CSV writer for a destination file
    ///
    /// The header row is written only when the destination file is first
    /// created.
    fn open_writer(
        &self,
        destination: &Path,
        headers: &[&str],
        ignore_header: bool,
    ) -> Result<csv::Writer<BufWriter<File>>, MergeError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(destination)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        if !ignore_header {
            writer.write_record(headers)?;
        }
        Ok(writer)
    }
}

/// Builds the CSV reader used for all GTFS entries
fn csv_reader(entry: impl Read) -> csv::Reader<impl Read> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(entry)
}

/// Indexes the source header row, lowercased for case-insensitive lookup
fn header_index(reader: &mut csv::Reader<impl Read>) -> Result<HashMap<String, usize>, MergeError> {
    let headers = reader.headers()?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(position, name)| (name.to_ascii_lowercase(), position))
        .collect())
}

/// Looks up a field by target header name, case-insensitively
fn field<'r>(
    source_index: &HashMap<String, usize>,
    record: &'r csv::StringRecord,
    header: &str,
) -> Option<&'r str> {
    source_index
        .get(&header.to_ascii_lowercase())
        .and_then(|&position| record.get(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn gtfs_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        for (entry_name, content) in entries {
            writer.start_file(*entry_name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn read_merged(work: &Path, name: &str) -> Vec<String> {
        std::fs::read_to_string(work.join(name))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_stops_deduplicated_by_stop_id() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[("stops.txt", "stop_id,stop_name\nS1,First\nS2,Second\n")],
        );
        let b = gtfs_zip(
            dir.path(),
            "b.zip",
            &[("stops.txt", "stop_id,stop_name\nS1,Renamed\nS3,Third\n")],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, false);
        merger.append_feed(&a).unwrap();
        merger.append_feed(&b).unwrap();

        let lines = read_merged(&work, "stops.txt");
        // Header + S1 (first occurrence), S2, S3
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("S1,") && lines[1].contains("First"));
        assert_eq!(merger.unique_stop_count(), 3);
    }

    #[test]
    fn test_transfers_deduplicated_by_full_row() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let transfers = "from_stop_id,to_stop_id,transfer_type,min_transfer_time\nS1,S2,2,120\nS1,S2,2,180\n";
        let a = gtfs_zip(dir.path(), "a.zip", &[("transfers.txt", transfers)]);
        let b = gtfs_zip(dir.path(), "b.zip", &[("transfers.txt", transfers)]);

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, false);
        merger.append_feed(&a).unwrap();
        merger.append_feed(&b).unwrap();

        let lines = read_merged(&work, "transfers.txt");
        // Header + the two distinct rows; identical rows from b are dropped
        assert_eq!(lines.len(), 3);
        assert_eq!(merger.unique_transfer_count(), 2);
    }

    #[test]
    fn test_rows_projected_onto_target_headers() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        // Source has reordered columns and an extra one
        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[(
                "calendar_dates.txt",
                "date,extra,service_id,exception_type\n20260701,x,SV1,1\n",
            )],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, false);
        merger.append_feed(&a).unwrap();

        let lines = read_merged(&work, "calendar_dates.txt");
        assert_eq!(lines[0], "service_id,date,exception_type");
        assert_eq!(lines[1], "SV1,20260701,1");
    }

    #[test]
    fn test_zero_valued_enum_fields_collapse_to_empty() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[(
                "stops.txt",
                "stop_id,location_type\nS1,0\nS2,1\n",
            )],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, false);
        merger.append_feed(&a).unwrap();

        let lines = read_merged(&work, "stops.txt");
        let location_type_position = target_headers("stops.txt")
            .iter()
            .position(|h| *h == "location_type")
            .unwrap();
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[location_type_position], "");
        let fields: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(fields[location_type_position], "1");
    }

    #[test]
    fn test_shapes_skipped_and_shape_ids_blanked_when_removing_shapes() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();

        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[
                ("shapes.txt", "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nSH1,59.9,10.7,1\n"),
                ("trips.txt", "route_id,service_id,trip_id,shape_id\nR1,SV1,T1,SH1\n"),
            ],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, true);
        merger.append_feed(&a).unwrap();

        assert!(!work.join("shapes.txt").exists());
        let lines = read_merged(&work, "trips.txt");
        let shape_id_position = target_headers("trips.txt")
            .iter()
            .position(|h| *h == "shape_id")
            .unwrap();
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[shape_id_position], "");
    }

    #[test]
    fn test_route_type_translation_per_variant() {
        for (variant, expected) in [
            (GtfsExportVariant::Extended, "1501"),
            (GtfsExportVariant::Basic, "3"),
            (GtfsExportVariant::Google, "1501"),
        ] {
            let dir = TempDir::new().unwrap();
            let work = dir.path().join("work");
            std::fs::create_dir(&work).unwrap();
            let a = gtfs_zip(
                dir.path(),
                "a.zip",
                &[("routes.txt", "route_id,route_type\nR1,1501\n")],
            );

            let mut merger = GtfsMerger::new(&work, variant, false);
            merger.append_feed(&a).unwrap();

            let lines = read_merged(&work, "routes.txt");
            let route_type_position = target_headers("routes.txt")
                .iter()
                .position(|h| *h == "route_type")
                .unwrap();
            let fields: Vec<&str> = lines[1].split(',').collect();
            assert_eq!(fields[route_type_position], expected, "variant {variant:?}");
        }
    }

    #[test]
    fn test_unparsable_route_type_passes_through() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[("routes.txt", "route_id,route_type\nR1,tram\n")],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Basic, false);
        merger.append_feed(&a).unwrap();

        let lines = read_merged(&work, "routes.txt");
        assert!(lines[1].contains("tram"));
    }

    #[test]
    fn test_non_whitelisted_entries_ignored() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let a = gtfs_zip(
            dir.path(),
            "a.zip",
            &[
                ("fares.txt", "fare_id\nF1\n"),
                ("agency.txt", "agency_id,agency_name\nA1,Agency\n"),
            ],
        );

        let mut merger = GtfsMerger::new(&work, GtfsExportVariant::Extended, false);
        merger.append_feed(&a).unwrap();

        assert!(work.join("agency.txt").exists());
        assert!(!work.join("fares.txt").exists());
    }

    #[test]
    fn test_missing_archive_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut merger = GtfsMerger::new(dir.path(), GtfsExportVariant::Extended, false);
        let err = merger.append_feed(&dir.path().join("missing.zip")).unwrap_err();
        assert!(matches!(err, MergeError::Io(_)));
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.zip");
        std::fs::write(&bogus, b"not a zip at all").unwrap();
        let mut merger = GtfsMerger::new(dir.path(), GtfsExportVariant::Extended, false);
        let err = merger.append_feed(&bogus).unwrap_err();
        assert!(matches!(err, MergeError::Archive(_)));
    }
}
