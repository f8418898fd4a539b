//! Process command - run one vendor profile over a batch of files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, warn};

use invex_core::batch::{self, BatchOutcome, FileStatus};
use invex_core::{build_pipeline, OutputTable, Profile};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Vendor profile (ACS, BRC, PANU, SINMIX, GW, ISLAND)
    profile: Profile,

    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output workbook path (defaults into the configured output dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a per-file summary CSV next to the workbook
    #[arg(long)]
    summary: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let (pdfs, sheets) = collect_inputs(&args.input)?;
    if pdfs.is_empty() {
        anyhow::bail!("No PDF files found for input: {}", args.input);
    }
    if sheets.len() > 1 {
        warn!(
            "multiple spreadsheets found, using {}",
            sheets[0].display()
        );
    }

    println!(
        "{} {} profile, {} PDF files{}",
        style("ℹ").blue(),
        args.profile,
        pdfs.len(),
        if sheets.is_empty() {
            String::new()
        } else {
            format!(", annotations from {}", sheets[0].display())
        }
    );

    let pipeline = build_pipeline(args.profile, &config.ocr)?;

    let progress = ProgressBar::new(pdfs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let outcome = batch::run(
        pipeline.as_ref(),
        &pdfs,
        sheets.first().map(PathBuf::as_path),
        |_, report| {
            if let FileStatus::Failed { error } = &report.status {
                progress.println(format!(
                    "{} {}: {}",
                    style("✗").red(),
                    report.file_name,
                    error
                ));
            }
            progress.inc(1);
        },
    )?;
    progress.finish_with_message("Complete");

    let output_path = output_path(&args, &config.output_dir);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_workbook(&outcome.table, args.profile, &output_path)?;

    if args.summary {
        let summary_path = output_path.with_extension("csv");
        write_summary(&summary_path, &outcome)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_report(&outcome, &output_path, start);
    Ok(())
}

/// Split the input directory or glob into PDF and spreadsheet paths.
fn collect_inputs(input: &str) -> anyhow::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let pattern = if Path::new(input).is_dir() {
        format!("{}/*", input.trim_end_matches('/'))
    } else {
        input.to_string()
    };

    let mut pdfs = Vec::new();
    let mut sheets = Vec::new();
    for path in glob(&pattern)?.filter_map(|r| r.ok()) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "pdf" => pdfs.push(path),
            "xlsx" | "xls" => sheets.push(path),
            _ => debug!("ignoring {}", path.display()),
        }
    }
    Ok((pdfs, sheets))
}

fn output_path(args: &ProcessArgs, output_dir: &Path) -> PathBuf {
    match &args.output {
        Some(path) => path.clone(),
        None => {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            output_dir.join(format!(
                "{}-{}.xlsx",
                args.profile.name().to_lowercase(),
                stamp
            ))
        }
    }
}

/// Write the batch table as one worksheet named after the profile.
fn write_workbook(table: &OutputTable, profile: Profile, path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(profile.name())?;

    let bold = Format::new().set_bold();
    for (col, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (row_idx, col_idx) = (r as u32 + 1, c as u16);
            if let Some(number) = cell.as_f64() {
                worksheet.write_number(row_idx, col_idx, number)?;
            } else if !cell.is_empty() {
                worksheet.write_string(row_idx, col_idx, cell.display())?;
            }
        }
    }

    workbook.save(path)?;
    debug!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_summary(path: &Path, outcome: &BatchOutcome) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "filename",
        "status",
        "rows",
        "failed_pages",
        "subtotal_discrepancy",
        "error",
    ])?;

    for report in &outcome.reports {
        match &report.status {
            FileStatus::Extracted {
                rows,
                failed_pages,
                subtotal_discrepancy,
            } => {
                let pages = failed_pages
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                wtr.write_record([
                    report.file_name.as_str(),
                    "ok",
                    &rows.to_string(),
                    &pages,
                    &subtotal_discrepancy
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    "",
                ])?;
            }
            FileStatus::Failed { error } => {
                wtr.write_record([report.file_name.as_str(), "error", "", "", "", error])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

fn print_report(outcome: &BatchOutcome, output_path: &Path, start: Instant) {
    let failed = outcome.failure_count();
    let ok = outcome.reports.len() - failed;

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcome.reports.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} output rows",
        style(ok).green(),
        style(failed).red(),
        outcome.table.len()
    );
    println!("   Workbook: {}", output_path.display());

    for report in &outcome.reports {
        match &report.status {
            FileStatus::Extracted {
                failed_pages,
                subtotal_discrepancy,
                ..
            } => {
                if !failed_pages.is_empty() {
                    println!(
                        "  {} {}: no DO number on pages {:?}",
                        style("!").yellow(),
                        report.file_name,
                        failed_pages
                    );
                }
                if let Some(diff) = subtotal_discrepancy {
                    println!(
                        "  {} {}: computed total differs from printed subtotal by {}",
                        style("!").yellow(),
                        report.file_name,
                        diff
                    );
                }
            }
            FileStatus::Failed { error } => {
                println!("  {} {}: {}", style("✗").red(), report.file_name, error);
            }
        }
    }
}
