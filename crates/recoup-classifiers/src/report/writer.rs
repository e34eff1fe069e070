//! Persistence of models, evaluation reports and encoded datasets.

use std::path::{Path, PathBuf};

use maud::html;

use crate::data_handling::{EncodedSplit, Record};
use crate::error::{RecoupError, Result};
use crate::evaluation::{EvaluationReport, ImpactMeasure};
use crate::io;
use crate::models::FittedModel;
use crate::report::plots::{plot_confusion_matrix, plot_feature_impact, plot_roc_curve};
use crate::report::report::{Report, ReportSection};

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const IMPACT_TABLE_FILE: &str = "feature_impact.csv";
pub const CONFUSION_PLOT_FILE: &str = "confusion_matrix.html";
pub const ROC_PLOT_FILE: &str = "roc_curve.html";
pub const IMPACT_PLOT_FILE: &str = "feature_impact.html";
pub const REPORT_FILE: &str = "report.html";
pub const TRAIN_RECORDS_FILE: &str = "train_records.csv";
pub const TEST_RECORDS_FILE: &str = "test_records.csv";

/// Sink for everything a run produces. Writes are not transactional: a
/// failure leaves whatever was already written in place.
pub trait ArtifactWriter {
    fn write_model(&self, backend: &str, model: &FittedModel) -> Result<()>;

    fn write_report(&self, backend: &str, report: &EvaluationReport) -> Result<()>;

    fn write_encoded_split(&self, split: &EncodedSplit) -> Result<()>;

    /// Untransformed records of each partition, in partition order.
    fn write_record_split(&self, train: &[Record], test: &[Record]) -> Result<()>;
}

/// Writes artifacts below `root`, one directory per backend.
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    root: PathBuf,
}

impl FsArtifactWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FsArtifactWriter { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend_dir(&self, backend: &str) -> PathBuf {
        self.root.join(backend)
    }

    fn ensure_dir(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| RecoupError::artifact(path, e))
    }

    fn write_text(path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content).map_err(|e| RecoupError::artifact(path, e))?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// `feature,<measure>[,coefficient]` with one row per ranked feature.
fn write_impact_table(path: &Path, report: &EvaluationReport) -> Result<()> {
    let ranking = &report.impact;
    let with_coefficient = ranking.measure == ImpactMeasure::OddsChange;
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["feature", ranking.measure.label()];
    if with_coefficient {
        header.push("coefficient");
    }
    writer.write_record(&header)?;
    for entry in &ranking.entries {
        let mut row = vec![entry.feature.clone(), entry.score.to_string()];
        if let Some(coef) = entry.coefficient.filter(|_| with_coefficient) {
            row.push(coef.to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn build_report(report: &EvaluationReport) -> Report {
    let mut out = Report::new(
        "recoup",
        env!("CARGO_PKG_VERSION"),
        &format!("{} evaluation report", report.display_name),
    );

    let class_names = ["0 (no positive response)", "1 (positive response)"];
    let mut overview = ReportSection::new("Overview");
    overview.add_content(html! {
        p {
            "Held-out evaluation of the " (report.display_name) " backend on "
            (report.test_size) " test records. A record is predicted positive when its "
            "probability exceeds " (report.threshold) "."
        }
        table {
            tr { th { "Accuracy" } td { (format!("{:.3}", report.classification.accuracy)) } }
            tr { th { "ROC AUC" } td { (format!("{:.3}", report.auc)) } }
        }
    });
    report_table(&mut overview, report, &class_names);
    out.add_section(overview);

    let mut confusion = ReportSection::new("Confusion matrix");
    confusion.add_plot(plot_confusion_matrix(&report.confusion_matrix, "Confusion matrix"));
    out.add_section(confusion);

    let mut roc = ReportSection::new("ROC curve");
    roc.add_plot(plot_roc_curve(&report.roc, report.auc, "ROC curve"));
    out.add_section(roc);

    let mut impact = ReportSection::new("Feature impact");
    let note = match report.impact.measure {
        ImpactMeasure::Gain => "Total split gain per feature, summed over all boosting rounds.",
        ImpactMeasure::GiniImportance => {
            "Mean decrease in Gini impurity per feature, normalized to sum to 1."
        }
        ImpactMeasure::OddsChange => {
            "Relative change in the odds of a positive response per unit increase of the \
             feature (exp(coefficient) - 1)."
        }
    };
    impact.add_content(html! { p { (note) } });
    impact.add_plot(plot_feature_impact(&report.impact, "Feature impact"));
    impact.add_content(html! {
        table {
            tr {
                th { "feature" }
                th { (report.impact.measure.label()) }
                @if report.impact.measure == ImpactMeasure::OddsChange { th { "coefficient" } }
            }
            @for entry in &report.impact.entries {
                tr {
                    td { (entry.feature) }
                    td { (format!("{:.4}", entry.score)) }
                    @if let Some(coef) = entry.coefficient { td { (format!("{:.4}", coef)) } }
                }
            }
        }
    });
    out.add_section(impact);

    out
}

fn report_table(section: &mut ReportSection, report: &EvaluationReport, class_names: &[&str; 2]) {
    let c = &report.classification;
    let rows = [
        (class_names[0], &c.classes[0]),
        (class_names[1], &c.classes[1]),
        ("macro avg", &c.macro_avg),
        ("weighted avg", &c.weighted_avg),
    ];
    section.add_content(html! {
        table {
            tr {
                th { "class" } th { "precision" } th { "recall" }
                th { "f1-score" } th { "support" }
            }
            @for (name, m) in rows {
                tr {
                    td { (name) }
                    td { (format!("{:.2}", m.precision)) }
                    td { (format!("{:.2}", m.recall)) }
                    td { (format!("{:.2}", m.f1)) }
                    td { (m.support) }
                }
            }
        }
    });
}

impl ArtifactWriter for FsArtifactWriter {
    fn write_model(&self, backend: &str, model: &FittedModel) -> Result<()> {
        let dir = self.backend_dir(backend);
        Self::ensure_dir(&dir)?;
        let path = dir.join(MODEL_FILE);
        let json = model.to_json().map_err(|e| RecoupError::artifact(&path, e))?;
        Self::write_text(&path, &json)?;
        log::info!("{}: model saved to {}", backend, path.display());
        Ok(())
    }

    fn write_report(&self, backend: &str, report: &EvaluationReport) -> Result<()> {
        let dir = self.backend_dir(backend);
        Self::ensure_dir(&dir)?;

        let path = dir.join(METRICS_FILE);
        let json =
            serde_json::to_string_pretty(report).map_err(|e| RecoupError::artifact(&path, e))?;
        Self::write_text(&path, &json)?;

        let path = dir.join(IMPACT_TABLE_FILE);
        write_impact_table(&path, report).map_err(|e| RecoupError::artifact(&path, e))?;

        let title = report.display_name.as_str();
        let plots = [
            (
                CONFUSION_PLOT_FILE,
                plot_confusion_matrix(
                    &report.confusion_matrix,
                    &format!("Confusion matrix - {}", title),
                ),
            ),
            (
                ROC_PLOT_FILE,
                plot_roc_curve(&report.roc, report.auc, &format!("ROC curve - {}", title)),
            ),
            (
                IMPACT_PLOT_FILE,
                plot_feature_impact(&report.impact, &format!("Feature impact - {}", title)),
            ),
        ];
        for (file, plot) in plots {
            Self::write_text(&dir.join(file), &plot.to_html())?;
        }

        let path = dir.join(REPORT_FILE);
        build_report(report)
            .save_to_file(&path)
            .map_err(|e| RecoupError::artifact(&path, e))?;
        log::info!("{}: report written to {}", backend, path.display());
        Ok(())
    }

    fn write_encoded_split(&self, split: &EncodedSplit) -> Result<()> {
        Self::ensure_dir(&self.root)?;
        let files = [
            ("X_train.csv", "y_train.csv", &split.train),
            ("X_test.csv", "y_test.csv", &split.test),
        ];
        for (x_file, y_file, partition) in files {
            let path = self.root.join(x_file);
            io::write_matrix(&path, &split.feature_names, &partition.x)
                .map_err(|e| RecoupError::artifact(&path, e))?;
            let path = self.root.join(y_file);
            io::write_labels(&path, &partition.y).map_err(|e| RecoupError::artifact(&path, e))?;
        }
        log::info!(
            "encoded split written to {} ({} train / {} test rows, {} features)",
            self.root.display(),
            split.train.len(),
            split.test.len(),
            split.feature_names.len()
        );
        Ok(())
    }

    fn write_record_split(&self, train: &[Record], test: &[Record]) -> Result<()> {
        Self::ensure_dir(&self.root)?;
        for (file, records) in [(TRAIN_RECORDS_FILE, train), (TEST_RECORDS_FILE, test)] {
            let path = self.root.join(file);
            io::write_records(&path, records).map_err(|e| RecoupError::artifact(&path, e))?;
        }
        log::debug!("untransformed partitions written to {}", self.root.display());
        Ok(())
    }
}
