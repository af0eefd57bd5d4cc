//! Build [`PropertyData`] from NYC Open Data CSV exports (one file per registry).

mod parser;

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::scoring::PropertyData;

#[derive(Debug)]
pub enum ImportError {
    Io { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io { path, source } => {
                write!(f, "failed to read export {}: {}", path.display(), source)
            }
            ImportError::Csv(err) => write!(f, "invalid Open Data CSV: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io { source, .. } => Some(source),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Paths to the per-registry exports; any source may be omitted.
#[derive(Debug, Clone, Default)]
pub struct ImportSources {
    pub dob_violations: Option<PathBuf>,
    pub ecb_violations: Option<PathBuf>,
    pub hpd_violations: Option<PathBuf>,
    pub permits: Option<PathBuf>,
}

/// Importer bound to one building; rows carrying a different BIN are skipped.
#[derive(Debug, Clone)]
pub struct PropertyImporter {
    template: PropertyData,
}

impl PropertyImporter {
    pub fn new(bin: impl Into<String>, borough: impl Into<String>) -> Self {
        let mut template = PropertyData::new(bin, borough);
        template.bin = template.bin.trim().to_string();
        Self { template }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.template.address = address.into();
        self
    }

    pub fn with_block_lot(mut self, block: impl Into<String>, lot: impl Into<String>) -> Self {
        self.template.block = block.into();
        self.template.lot = lot.into();
        self
    }

    pub fn import(&self, sources: &ImportSources) -> Result<PropertyData, ImportError> {
        let mut property = self.template.clone();

        if let Some(path) = &sources.dob_violations {
            property.dob_violations = self.read_path(path)?;
        }
        if let Some(path) = &sources.ecb_violations {
            property.ecb_violations = self.read_path(path)?;
        }
        if let Some(path) = &sources.hpd_violations {
            property.hpd_violations = self.read_path(path)?;
        }
        if let Some(path) = &sources.permits {
            property.permits = self.read_path(path)?;
        }

        info!(
            bin = %property.bin,
            dob = property.dob_violations.len(),
            ecb = property.ecb_violations.len(),
            hpd = property.hpd_violations.len(),
            permits = property.permits.len(),
            "imported registry exports"
        );

        Ok(property)
    }

    /// Parse a single export from any reader, e.g. an uploaded CSV body.
    pub fn read<T, R>(&self, reader: R) -> Result<Vec<T>, ImportError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let parsed = parser::parse_rows(reader, &self.template.bin)?;
        if parsed.skipped > 0 {
            debug!(
                bin = %self.template.bin,
                skipped = parsed.skipped,
                "skipped rows filed under other buildings"
            );
        }
        Ok(parsed.rows)
    }

    fn read_path<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, ImportError> {
        let file = File::open(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.read(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{DobViolation, EcbViolation, HpdViolation, Permit};
    use std::io::Cursor;

    fn importer() -> PropertyImporter {
        PropertyImporter::new("1012345", "MANHATTAN").with_address("100 Broadway")
    }

    #[test]
    fn normalize_header_maps_open_data_column_styles() {
        assert_eq!(parser::normalize_header("\u{feff}ISSUE_DATE"), "issue_date");
        assert_eq!(parser::normalize_header("NOVIssuedDate"), "novissueddate");
        assert_eq!(parser::normalize_header("Job #"), "job__");
        assert_eq!(parser::normalize_header(" Filing Status "), "filing_status");
    }

    #[test]
    fn reads_dob_export_and_skips_other_buildings() {
        let csv = "ISN_DOB_BIS_VIOL,BIN,ISSUE_DATE,VIOLATION_NUMBER,VIOLATION_CATEGORY,VIOLATION_TYPE\n\
1,1012345,20240105,0105/24,V-DOB VIOLATION - ACTIVE,LL6291-LOCAL LAW 62/91 - BOILERS\n\
2,9999999,20240106,0106/24,V-DOB VIOLATION - ACTIVE,ELEVATOR\n\
3,1012345,20190210,0210/19,V*-DOB VIOLATION - DISMISSED,IMMEDIATELY HAZARDOUS\n";

        let rows: Vec<DobViolation> = importer().read(Cursor::new(csv)).expect("parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].issue_date.as_deref(), Some("20240105"));
        assert_eq!(
            rows[1].violation_category.as_deref(),
            Some("V*-DOB VIOLATION - DISMISSED")
        );
        assert!(rows[0].status.is_none());
    }

    #[test]
    fn reads_hpd_and_ecb_exports_with_blank_cells() {
        let hpd = "ViolationID,BIN,Class,InspectionDate,NOVIssuedDate,CurrentStatus,ViolationStatus,CertifiedDate\n\
14022931,1012345,C,2025-05-01,2025-05-10,NOV SENT OUT,Open,\n";
        let rows: Vec<HpdViolation> = importer().read(Cursor::new(hpd)).expect("parses");
        assert_eq!(rows[0].violation_id.as_deref(), Some("14022931"));
        assert_eq!(rows[0].class.as_deref(), Some("C"));
        assert!(rows[0].certifieddate.is_none());

        let ecb = "ECB_VIOLATION_NUMBER,ECB_VIOLATION_STATUS,BIN,SEVERITY,ISSUE_DATE,BALANCE_DUE\n\
35012345X,RESOLVE,1012345,CLASS - 1,20230301,1250.00\n\
35012346Y,ACTIVE,1012345,,20240301,\n";
        let rows: Vec<EcbViolation> = importer().read(Cursor::new(ecb)).expect("parses");
        assert_eq!(rows[0].balance_due, Some(1250.0));
        assert_eq!(rows[1].balance_due, None);
        assert!(rows[1].severity.is_none());
    }

    #[test]
    fn reads_permit_export_without_bin_column() {
        let csv = "Job #,Job Type,Filing Status,Permit Status,Filing Date\n\
121234567,A2,INITIAL,ISSUED,01/15/2024\n";
        let rows: Vec<Permit> = importer().read(Cursor::new(csv)).expect("parses");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_number.as_deref(), Some("121234567"));
        assert_eq!(rows[0].filing_date.as_deref(), Some("01/15/2024"));
    }

    #[test]
    fn import_without_sources_returns_clean_property() {
        let property = importer()
            .with_block_lot("00047", "0007")
            .import(&ImportSources::default())
            .expect("imports");
        assert!(property.is_clean());
        assert_eq!(property.address, "100 Broadway");
        assert_eq!(property.block, "00047");
    }

    #[test]
    fn import_reports_missing_files_with_path() {
        let sources = ImportSources {
            hpd_violations: Some(PathBuf::from("./does-not-exist.csv")),
            ..ImportSources::default()
        };
        match importer().import(&sources) {
            Err(ImportError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("./does-not-exist.csv"))
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
