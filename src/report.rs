//! # Report Writers Module
//!
//! Questo modulo produce i report del batch consumando la lista aggregata
//! dei risultati:
//! - CSV: una riga per risultato, ordine colonne fisso
//! - HTML: report self-contained con totali, link relativi ai chart e una
//!   tabella che rispecchia le righe del CSV
//!
//! I writer sono generici su `Write` così i test verificano l'output su un
//! buffer in memoria; `write_reports` è l'entry point che scrive i file veri
//! (chart inclusi) nella output directory.
//!
//! Un fallimento qui è fatale per lo step di reporting ma arriva solo dopo
//! che tutto il lavoro di ottimizzazione è già stato fatto: le immagini
//! ottimizzate restano sul disco.

use crate::charts::{self, BAR_CHART_FILE, PIE_CHART_FILE};
use crate::config::Config;
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::result::{BatchTotals, OptimizationResult};
use chrono::Local;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Paths of every report artifact written for one batch
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub html: PathBuf,
    pub bar_chart: PathBuf,
    pub pie_chart: PathBuf,
}

/// Write CSV, charts and HTML for the aggregated result list
pub fn write_reports(
    results: &[OptimizationResult],
    config: &Config,
) -> Result<ReportPaths, OptimizeError> {
    let charts_dir = config.output_dir.join("charts");
    let chart_paths = charts::render_charts(results, &charts_dir)?;

    let csv_path = config.output_dir.join(format!("{}.csv", config.report_prefix));
    let csv_file = fs::File::create(&csv_path)
        .map_err(|e| OptimizeError::Report(format!("Cannot create {}: {e}", csv_path.display())))?;
    write_csv(results, BufWriter::new(csv_file))
        .map_err(|e| OptimizeError::Report(format!("Cannot write {}: {e}", csv_path.display())))?;

    let html_path = config.output_dir.join(format!("{}.html", config.report_prefix));
    let html_file = fs::File::create(&html_path)
        .map_err(|e| OptimizeError::Report(format!("Cannot create {}: {e}", html_path.display())))?;
    let context = ReportContext {
        input_dir: config.input_dir.display().to_string(),
        output_dir: config.output_dir.display().to_string(),
        generated: Local::now().format("%Y-%m-%d %H:%M").to_string(),
    };
    write_html(results, BufWriter::new(html_file), &context)
        .map_err(|e| OptimizeError::Report(format!("Cannot write {}: {e}", html_path.display())))?;

    Ok(ReportPaths {
        csv: csv_path,
        html: html_path,
        bar_chart: chart_paths.bar,
        pie_chart: chart_paths.pie,
    })
}

/// Run metadata embedded in the HTML header
pub struct ReportContext {
    pub input_dir: String,
    pub output_dir: String,
    pub generated: String,
}

/// Write the CSV report: header plus one row per result, fixed column order
pub fn write_csv<W: Write>(
    results: &[OptimizationResult],
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "filename,status,original_bytes,optimized_bytes,reduction_pct,output_path"
    )?;

    for result in results {
        writeln!(
            writer,
            "{},{},{},{},{:.2},{}",
            csv_field(&result.filename),
            csv_field(&result.status.to_string()),
            result.original_bytes,
            result.optimized_bytes,
            result.reduction_pct,
            csv_field(&result.output_path)
        )?;
    }

    Ok(())
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write the self-contained HTML report
pub fn write_html<W: Write>(
    results: &[OptimizationResult],
    mut writer: W,
    context: &ReportContext,
) -> std::io::Result<()> {
    let totals = BatchTotals::from_results(results);

    write!(
        writer,
        r#"<!doctype html><html lang="en"><head><meta charset="utf-8">
<title>Image Optimization Report</title>
<style>body{{font-family:sans-serif;margin:32px}}table{{border-collapse:collapse;width:100%}}th,td{{border:1px solid #ddd;padding:6px}}th{{background:#f6f6f6}}</style>
</head><body>
<h1>Image Optimization Report</h1>
<p>Generated: {generated}</p>
<p><b>Input:</b> {input} <br><b>Output:</b> {output}</p>
<p>Files: {files} <br>Total saved: {saved} ({saved_pct:.2}%)</p>
<h2>Charts</h2>
<p><img src="charts/{bar}" alt="Savings per file (%)"></p>
<p><img src="charts/{pie}" alt="Total size before vs after"></p>
<h2>Details</h2>
<table><tr><th>File</th><th>Before</th><th>After</th><th>Saved</th><th>Status</th></tr>
"#,
        generated = escape_html(&context.generated),
        input = escape_html(&context.input_dir),
        output = escape_html(&context.output_dir),
        files = totals.files,
        saved = FileManager::format_size(totals.saved_bytes()),
        saved_pct = totals.saved_percent(),
        bar = BAR_CHART_FILE,
        pie = PIE_CHART_FILE,
    )?;

    for result in results {
        writeln!(
            writer,
            "<tr><td>{}</td><td align='right'>{}</td><td align='right'>{}</td>\
             <td align='right'>{:.2}%</td><td>{}</td></tr>",
            escape_html(&result.filename),
            FileManager::format_size(result.original_bytes),
            FileManager::format_size(result.optimized_bytes),
            result.reduction_pct,
            escape_html(&result.status.to_string()),
        )?;
    }

    write!(writer, "</table></body></html>")?;
    Ok(())
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_results() -> Vec<OptimizationResult> {
        vec![
            OptimizationResult::success("a.jpg".into(), 500_000, 350_000, "/out/a.jpg".into()),
            OptimizationResult::success("b.jpg".into(), 800_000, 640_000, "/out/b.jpg".into()),
            OptimizationResult::success("c.jpg".into(), 200_000, 180_000, "/out/c.jpg".into()),
        ]
    }

    fn sample_context() -> ReportContext {
        ReportContext {
            input_dir: "/in".into(),
            output_dir: "/out".into(),
            generated: "2026-01-01 12:00".into(),
        }
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_result() {
        let mut output = Vec::new();
        write_csv(&sample_results(), &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "filename,status,original_bytes,optimized_bytes,reduction_pct,output_path"
        );
        assert!(lines[1].starts_with("a.jpg,ok,500000,350000,30.00,"));
    }

    #[test]
    fn test_csv_quotes_fields_with_separators() {
        let results = vec![OptimizationResult::failure(
            "x.jpg".into(),
            100,
            "decode failed, truncated stream".into(),
        )];
        let mut output = Vec::new();
        write_csv(&results, &mut output).unwrap();

        let csv = String::from_utf8(output).unwrap();
        assert!(csv.contains("\"error: decode failed, truncated stream\""));
    }

    #[test]
    fn test_html_contains_summary_and_chart_links() {
        let mut output = Vec::new();
        write_html(&sample_results(), &mut output, &sample_context()).unwrap();

        let html = String::from_utf8(output).unwrap();
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.ends_with("</html>"));
        assert!(html.contains("Files: 3"));
        assert!(html.contains("charts/per_file_savings.png"));
        assert!(html.contains("charts/total_pie.png"));
        assert!(html.contains("<td>a.jpg</td>"));
    }

    #[test]
    fn test_html_escapes_error_messages() {
        let results = vec![OptimizationResult::failure(
            "weird.png".into(),
            10,
            "tag <oops> & co".into(),
        )];
        let mut output = Vec::new();
        write_html(&results, &mut output, &sample_context()).unwrap();

        let html = String::from_utf8(output).unwrap();
        assert!(html.contains("tag &lt;oops&gt; &amp; co"));
        assert!(!html.contains("<oops>"));
    }

    #[test]
    fn test_write_reports_creates_all_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            output_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let paths = write_reports(&sample_results(), &config).unwrap();

        assert!(paths.csv.exists());
        assert!(paths.html.exists());
        assert!(paths.bar_chart.exists());
        assert!(paths.pie_chart.exists());

        let csv = fs::read_to_string(&paths.csv).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }
}
