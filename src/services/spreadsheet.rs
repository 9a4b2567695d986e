//! Spreadsheet import and export

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, Local, Utc};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::{
    error::{AppError, AppResult},
    models::{
        badge::{is_truthy, BadgeRow, CreateBadge},
        ImportReport,
    },
    repository::Repository,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const FIRST_NAME_HEADERS: &[&str] = &["prénom", "prenom", "first_name", "first name"];
const LAST_NAME_HEADERS: &[&str] = &["nom", "last_name", "last name"];
const VALIDATED_HEADERS: &[&str] = &["validé", "valide", "validated"];

const EXPORT_HEADERS: [&str; 7] = [
    "ID",
    "Prénom",
    "Nom",
    "Validé",
    "Date de création",
    "Dernière modification",
    "Source",
];
const EXPORT_WIDTHS: [f64; 7] = [8.0, 20.0, 20.0, 10.0, 20.0, 20.0, 12.0];

/// A generated workbook ready for download
#[derive(Debug)]
pub struct SpreadsheetFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Column positions found in the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportColumns {
    pub first_name: usize,
    pub last_name: usize,
    pub validated: Option<usize>,
}

impl ImportColumns {
    /// Locate columns by header name, ignoring case
    pub fn locate(headers: &[String]) -> AppResult<Self> {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| headers.iter().position(|h| h.as_str() == *name))
        };

        match (find(FIRST_NAME_HEADERS), find(LAST_NAME_HEADERS)) {
            (Some(first_name), Some(last_name)) => Ok(Self {
                first_name,
                last_name,
                validated: find(VALIDATED_HEADERS),
            }),
            _ => Err(AppError::Validation(
                "Excel file must contain \"Prénom\" and \"Nom\" columns".to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct SpreadsheetService {
    repository: Repository,
}

impl SpreadsheetService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Import an uploaded `.xlsx`/`.xls` workbook
    pub async fn import(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<ImportReport> {
        if file_name.is_empty() {
            return Err(AppError::Validation("No file selected".to_string()));
        }
        let lower = file_name.to_lowercase();
        if !(lower.ends_with(".xlsx") || lower.ends_with(".xls")) {
            return Err(AppError::Validation(
                "Invalid file format. Please upload an Excel file (.xlsx or .xls)".to_string(),
            ));
        }

        let rows = tokio::task::spawn_blocking(move || read_rows(bytes))
            .await
            .map_err(|e| AppError::Internal(format!("Spreadsheet parsing failed: {}", e)))??;
        let report = self.import_rows(&rows).await?;

        tracing::info!(
            "Imported {}: {} new, {} skipped, {} errors",
            file_name,
            report.imported,
            report.skipped,
            report.errors.len()
        );
        Ok(report)
    }

    /// Upsert every data row. The first row holds the headers.
    pub async fn import_rows(&self, rows: &[Vec<String>]) -> AppResult<ImportReport> {
        let Some((headers, data)) = rows.split_first() else {
            return Err(AppError::Validation("The spreadsheet is empty".to_string()));
        };
        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let columns = ImportColumns::locate(&headers)?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (index, row) in data.iter().enumerate() {
            let cell = move |column: usize| row.get(column).map(|c| c.trim()).unwrap_or_default();

            let first_name = cell(columns.first_name);
            let last_name = cell(columns.last_name);
            if first_name.is_empty() || last_name.is_empty() {
                skipped += 1;
                continue;
            }
            let validated = columns.validated.map(|c| is_truthy(cell(c))).unwrap_or(false);

            match self.upsert(last_name, first_name, validated).await {
                Ok(true) => imported += 1,
                Ok(false) => skipped += 1,
                // spreadsheet rows are 1-based and the header is row 1
                Err(e) => errors.push(format!("Row {}: {}", index + 2, e)),
            }
        }

        Ok(ImportReport::finish(imported, skipped, errors))
    }

    /// Insert a badge, or refresh the flag of the existing one. Returns
    /// whether a badge was inserted.
    async fn upsert(&self, last_name: &str, first_name: &str, validated: bool) -> AppResult<bool> {
        match self.repository.badges.find_by_name(last_name, first_name).await? {
            Some(existing) => {
                self.repository.badges.set_validated(existing.id, validated).await?;
                Ok(false)
            }
            None => {
                self.repository
                    .badges
                    .create(&CreateBadge::new(last_name, first_name, validated))
                    .await?;
                Ok(true)
            }
        }
    }

    /// All local badges as a workbook
    pub async fn export(&self) -> AppResult<SpreadsheetFile> {
        let rows = self.repository.badges.list().await?;
        let bytes = tokio::task::spawn_blocking(move || export_workbook(&rows))
            .await
            .map_err(|e| AppError::Internal(format!("Workbook generation failed: {}", e)))??;
        Ok(SpreadsheetFile {
            file_name: format!("badges_export_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S")),
            bytes,
        })
    }

    /// Import template with example rows and instructions
    pub fn template(&self) -> AppResult<SpreadsheetFile> {
        Ok(SpreadsheetFile {
            file_name: "badges_import_template.xlsx".to_string(),
            bytes: template_workbook()?,
        })
    }
}

/// First worksheet as rows of trimmed cell text
pub fn read_rows(bytes: Vec<u8>) -> AppResult<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Spreadsheet("The workbook has no worksheet".to_string()))??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_size(12)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str], widths: &[f64]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, (header, width)) in headers.iter().zip(widths).enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &format)?;
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn export_workbook(rows: &[BadgeRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Badges")?;
    write_headers(worksheet, &EXPORT_HEADERS, &EXPORT_WIDTHS)?;

    let cell = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter);

    for (index, badge) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_number_with_format(row, 0, badge.id as f64, &cell)?;
        worksheet.write_string_with_format(row, 1, &badge.first_name, &cell)?;
        worksheet.write_string_with_format(row, 2, &badge.last_name, &cell)?;
        worksheet.write_string_with_format(row, 3, if badge.validated { "Oui" } else { "Non" }, &cell)?;
        worksheet.write_string_with_format(row, 4, timestamp(&badge.created_at), &cell)?;
        worksheet.write_string_with_format(row, 5, timestamp(&badge.updated_at), &cell)?;
        worksheet.write_string_with_format(row, 6, "local", &cell)?;
    }

    workbook.save_to_buffer()
}

pub fn template_workbook() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Template Import Badges")?;
    write_headers(worksheet, &["Prénom", "Nom", "Validé"], &[20.0, 20.0, 15.0])?;

    let example = Format::new()
        .set_background_color(Color::RGB(0xE7E6E6))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Left);
    let examples = [
        ["Mohamed", "Alami", "Oui"],
        ["Fatima", "Bennani", "Non"],
        ["Ahmed", "El Idrissi", "Oui"],
    ];
    for (index, values) in examples.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            worksheet.write_string_with_format(index as u32 + 1, col as u16, *value, &example)?;
        }
    }

    worksheet.write_string_with_format(5, 0, "INSTRUCTIONS:", &Format::new().set_bold().set_font_size(11))?;
    let note = Format::new().set_italic().set_font_size(10);
    let instructions = [
        "1. Remplissez les colonnes Prénom et Nom (obligatoires)",
        "2. Colonne Validé: \"Oui\" ou \"Non\" (optionnel, par défaut \"Non\")",
        "3. Supprimez les lignes d'exemple avant l'import",
        "4. Sauvegardez le fichier et importez-le dans l'application",
    ];
    for (index, line) in instructions.iter().enumerate() {
        worksheet.write_string_with_format(index as u32 + 6, 0, *line, &note)?;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_badge, setup_test_repository};

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_locate_columns() {
        let headers: Vec<String> = ["id", "nom", "prénom", "validé"].iter().map(|h| h.to_string()).collect();
        let columns = ImportColumns::locate(&headers).unwrap();
        assert_eq!(
            columns,
            ImportColumns {
                first_name: 2,
                last_name: 1,
                validated: Some(3),
            }
        );

        let headers: Vec<String> = ["first name", "last_name"].iter().map(|h| h.to_string()).collect();
        let columns = ImportColumns::locate(&headers).unwrap();
        assert_eq!(columns.validated, None);

        let headers = vec!["prénom".to_string(), "email".to_string()];
        assert!(matches!(ImportColumns::locate(&headers), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_import_inserts_then_updates_as_skipped() {
        let repo = setup_test_repository().await;
        let service = SpreadsheetService::new(repo.clone());

        let sheet = rows(&[&["Prénom", "Nom", "Validé"], &["Omar", "Tazi", "Oui"]]);
        let report = service.import_rows(&sheet).await.unwrap();
        assert_eq!((report.imported, report.skipped), (1, 0));

        let row = repo.badges.find_by_name("Tazi", "Omar").await.unwrap().unwrap();
        assert!(row.validated);

        let sheet = rows(&[&["PRENOM", "NOM", "valide"], &["omar", "TAZI", "Non"]]);
        let report = service.import_rows(&sheet).await.unwrap();
        assert_eq!((report.imported, report.skipped), (0, 1));
        assert_eq!(report.total_processed, 1);
        assert_eq!(repo.badges.count().await.unwrap(), 1);

        let row = repo.badges.get_by_id(row.id).await.unwrap();
        assert!(!row.validated);
    }

    #[tokio::test]
    async fn test_import_skips_blank_names() {
        let repo = setup_test_repository().await;
        let service = SpreadsheetService::new(repo.clone());

        let sheet = rows(&[
            &["Nom", "Prénom"],
            &["Tazi", ""],
            &["", "Ali"],
            &["Alaoui", "Sara"],
            &["Amrani"],
        ]);
        let report = service.import_rows(&sheet).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 3);
        assert!(report.errors.is_empty());
        assert_eq!(report.error_count, None);
        assert!(!repo.badges.find_by_name("Alaoui", "Sara").await.unwrap().unwrap().validated);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_files() {
        let repo = setup_test_repository().await;
        let service = SpreadsheetService::new(repo);

        let result = service.import("badges.csv", Vec::new()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = service.import("", Vec::new()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = service.import("badges.xlsx", b"not a workbook".to_vec()).await;
        assert!(matches!(result, Err(AppError::Spreadsheet(_))));
    }

    #[tokio::test]
    async fn test_template_imports_example_rows() {
        let repo = setup_test_repository().await;
        let service = SpreadsheetService::new(repo.clone());

        let template = service.template().unwrap();
        let report = service.import(&template.file_name, template.bytes).await.unwrap();

        assert_eq!(report.imported, 3);
        assert_eq!(repo.badges.count_validated().await.unwrap(), 2);
        assert!(repo.badges.find_by_name("El Idrissi", "Ahmed").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_export_lists_local_badges() {
        let repo = setup_test_repository().await;
        create_test_badge(&repo, "Tazi", "Omar", true).await;
        create_test_badge(&repo, "Alaoui", "Sara", false).await;
        let service = SpreadsheetService::new(repo);

        let file = service.export().await.unwrap();
        assert!(file.file_name.starts_with("badges_export_"));

        let rows = read_rows(file.bytes).unwrap();
        assert_eq!(rows[0], EXPORT_HEADERS.map(String::from).to_vec());
        assert_eq!(rows[1][1..4], ["Omar", "Tazi", "Oui"].map(String::from));
        assert_eq!(rows[2][3], "Non");
        assert_eq!(rows[2][6], "local");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_workbook_work_runs_on_blocking_pool() {
        let repo = setup_test_repository().await;
        create_test_badge(&repo, "Tazi", "Omar", true).await;
        let service = SpreadsheetService::new(repo.clone());

        let file = service.export().await.unwrap();
        let report = service.import(&file.file_name, file.bytes).await.unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(repo.badges.count().await.unwrap(), 1);
    }
}
