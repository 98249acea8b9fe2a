use crate::infra::{export_saved_exam, generation_time, parse_date};
use chrono::{NaiveDate, Utc};
use clap::Args;
use customs_exam::error::AppError;
use customs_exam::navigation::{NavigationTable, Role, RoleNavigation};
use customs_exam::workflows::exam::export::DEFAULT_FILE_PREFIX;
use customs_exam::workflows::exam::{
    DocumentStore, ExamGateway, ExamHeader, ExamService, ExportFile, ExportFormat,
    ExportSettings, Identity, InMemoryDocumentStore, JsonFileDocumentStore, ProductDetails,
    Quantity,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tracking number (NE) used for the demo exam.
    #[arg(long, default_value = "ne-demo-001")]
    pub(crate) tracking_number: String,
    /// Write the text, spreadsheet and csv exports into this directory.
    #[arg(long)]
    pub(crate) out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON exam store written by `serve --store`.
    #[arg(long)]
    pub(crate) store: PathBuf,
    /// Tracking number (NE) of the saved exam, in any case.
    #[arg(long)]
    pub(crate) tracking_number: String,
    /// Destination directory for the exported files.
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
    /// Date used in the file names (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// File name prefix.
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    pub(crate) prefix: String,
    /// Also write a csv copy of the spreadsheet.
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct NavigationArgs {
    /// Only print the entry for this role.
    #[arg(long)]
    pub(crate) role: Option<Role>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tracking_number,
        out_dir,
    } = args;

    let settings = ExportSettings::default();
    let service = ExamService::new(Arc::new(InMemoryDocumentStore::new()), settings.clone());
    let identity = Identity::new("demo-inspector").ok_or_else(|| {
        AppError::Io(io::Error::new(io::ErrorKind::InvalidInput, "blank demo identity"))
    })?;

    println!("Previous exam demo");
    let (session, snapshot) = service.create_session()?;
    println!("- Session {} opened on {}", session.0, snapshot.step);

    let snapshot = service.submit_header(&session, demo_header(&tracking_number))?;
    println!(
        "- Header captured for NE {} -> {}",
        snapshot.session.header.tracking_number, snapshot.step
    );

    for details in demo_products() {
        let id = service.add_product(&session, details)?;
        println!("  + product {id}");
    }

    let preview = service.open_preview(&session)?;
    println!("- Preview lists {} product(s)", preview.products.len());
    for (index, product) in preview.products.iter().enumerate() {
        println!(
            "  {}. {} -> {}",
            index + 1,
            product.details.description.as_deref().unwrap_or("N/A"),
            product.details.status_summary()
        );
    }

    let snapshot = service.confirm(&session)?;
    println!("- Confirmed -> {}", snapshot.step);

    let now = Utc::now();
    let record = service.save(&session, Some(&identity), false, now)?;
    println!(
        "- Saved {} as {} by {}",
        record.header.tracking_number,
        record.status.label(),
        record.saved_by
    );

    let text = service.export(&session, ExportFormat::Text, now)?;
    println!("\n{}", String::from_utf8_lossy(&text.bytes));

    if let Some(dir) = out_dir {
        for format in [ExportFormat::Text, ExportFormat::Spreadsheet, ExportFormat::Csv] {
            let file = service.export(&session, format, now)?;
            let path = write_export(&dir, &file)?;
            println!("- Wrote {}", path.display());
        }
    }

    let (recovery, _) = service.create_session()?;
    let recovered = service.recover(&recovery, &tracking_number.to_lowercase())?;
    println!(
        "- Recovered {} in a new session: {} product(s), recovered={}",
        recovered.session.header.tracking_number,
        recovered.products.len(),
        recovered.session.is_recovered
    );

    let dashboard = service.dashboard()?;
    match serde_json::to_string_pretty(&dashboard) {
        Ok(json) => println!("- Dashboard:\n{json}"),
        Err(err) => println!("- Dashboard unavailable: {err}"),
    }

    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        store,
        tracking_number,
        out_dir,
        date,
        prefix,
        csv,
    } = args;

    if !store.is_file() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("exam store {} does not exist", store.display()),
        )));
    }

    let gateway = ExamGateway::new(Arc::new(JsonFileDocumentStore::open(&store)?));
    let settings = ExportSettings {
        file_prefix: prefix,
    };
    let generated_at = generation_time(date);

    let mut formats = vec![ExportFormat::Text, ExportFormat::Spreadsheet];
    if csv {
        formats.push(ExportFormat::Csv);
    }

    let written = export_to_dir(
        &gateway,
        &tracking_number,
        &formats,
        &settings,
        generated_at,
        &out_dir,
    )?;
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn export_to_dir<S: DocumentStore>(
    gateway: &ExamGateway<S>,
    tracking_number: &str,
    formats: &[ExportFormat],
    settings: &ExportSettings,
    generated_at: chrono::DateTime<Utc>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, AppError> {
    formats
        .iter()
        .map(|format| {
            let file =
                export_saved_exam(gateway, tracking_number, *format, settings, generated_at)?;
            write_export(out_dir, &file)
        })
        .collect()
}

pub(crate) fn run_navigation(args: NavigationArgs) -> Result<(), AppError> {
    let table = NavigationTable::global();
    match args.role {
        Some(role) => print_navigation(table.for_role(role)),
        None => {
            for entry in table.roles() {
                print_navigation(entry);
            }
        }
    }
    Ok(())
}

fn print_navigation(entry: &RoleNavigation) {
    println!(
        "{} ({}) -> home {}",
        entry.role.label(),
        entry.role,
        entry.home_route
    );
    for link in &entry.links {
        println!("  - {}: {}", link.label, link.route);
    }
}

fn write_export(dir: &Path, file: &ExportFile) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file.filename);
    std::fs::write(&path, &file.bytes)?;
    Ok(path)
}

fn demo_header(tracking_number: &str) -> ExamHeader {
    ExamHeader {
        tracking_number: tracking_number.to_string(),
        reference: Some("REF-2025-118".to_string()),
        manager: "Gestoría Aduanal Norte".to_string(),
        location: "Almacén fiscal 4".to_string(),
        consignee: None,
    }
}

fn demo_products() -> Vec<ProductDetails> {
    vec![
        ProductDetails {
            item_number: Some("1".to_string()),
            description: Some("Rodamientos de acero".to_string()),
            brand: Some("SKF".to_string()),
            model: Some("6205-2RS".to_string()),
            origin: Some("SE".to_string()),
            weight: Some("120".to_string()),
            unit_measure: Some("kg".to_string()),
            number_packages: Some("4".to_string()),
            quantity_packages: Quantity::from(4),
            quantity_units: Quantity::from(400),
            is_conform: true,
            ..ProductDetails::default()
        },
        ProductDetails {
            item_number: Some("2".to_string()),
            description: Some("Bandas transportadoras".to_string()),
            origin: Some("CN".to_string()),
            quantity_packages: Quantity::from(2),
            quantity_units: Quantity::Text("2 rollos".to_string()),
            is_missing: true,
            is_fault: true,
            observation: Some("Un rollo con daño en empaque".to_string()),
            ..ProductDetails::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end_and_writes_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        run_demo(DemoArgs {
            tracking_number: "ne-demo-test".to_string(),
            out_dir: Some(dir.path().to_path_buf()),
        })
        .expect("demo succeeds");

        let written: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written.len(), 3);
        assert!(written
            .iter()
            .all(|name| name.starts_with("ExamenPrevio_NE-DEMO-TEST_")));
    }

    #[test]
    fn export_rejects_missing_store_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = run_export(ExportArgs {
            store: dir.path().join("missing.json"),
            tracking_number: "ne-1".to_string(),
            out_dir: dir.path().to_path_buf(),
            date: None,
            prefix: DEFAULT_FILE_PREFIX.to_string(),
            csv: false,
        });
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn export_writes_text_and_spreadsheet_for_saved_exam() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store_path = dir.path().join("exams.json");
        let store = Arc::new(JsonFileDocumentStore::open(&store_path).expect("store opens"));
        let service = ExamService::new(store, ExportSettings::default());
        let (session, _) = service.create_session().expect("session");
        service
            .submit_header(&session, demo_header("ne-file-9"))
            .expect("header");
        service.open_preview(&session).expect("preview");
        service.confirm(&session).expect("confirm");
        let identity = Identity::new("inspector-9").expect("identity");
        service
            .save(&session, Some(&identity), true, Utc::now())
            .expect("save");

        let out_dir = dir.path().join("out");
        run_export(ExportArgs {
            store: store_path,
            tracking_number: "Ne-File-9".to_string(),
            out_dir: out_dir.clone(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14),
            prefix: "Aduana".to_string(),
            csv: true,
        })
        .expect("export succeeds");

        for name in [
            "Aduana_NE-FILE-9_2025-03-14.txt",
            "Aduana_NE-FILE-9_2025-03-14.xlsx",
            "Aduana_NE-FILE-9_2025-03-14.csv",
        ] {
            assert!(out_dir.join(name).is_file(), "{name} missing");
        }
    }

    #[test]
    fn navigation_prints_without_error() {
        run_navigation(NavigationArgs::default()).expect("prints table");
        run_navigation(NavigationArgs {
            role: Some(Role::Examinador),
        })
        .expect("prints role");
    }
}
