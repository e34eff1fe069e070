use plotly::common::{DashType, Line, Mode, Orientation};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, HeatMap, Plot, Scatter};

use crate::evaluation::ImpactRanking;
use crate::stats::{ConfusionMatrix, RocCurve};

/// Heatmap of the confusion matrix, actual classes on the y axis.
pub fn plot_confusion_matrix(cm: &ConfusionMatrix, title: &str) -> Plot {
    let labels = vec!["0", "1"];
    let z: Vec<Vec<usize>> = cm.as_rows().iter().map(|row| row.to_vec()).collect();

    let trace = HeatMap::new(labels.clone(), labels, z).name("count");
    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Predicted"))
        .y_axis(Axis::new().title("Actual"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// ROC curve with the chance diagonal for reference.
pub fn plot_roc_curve(roc: &RocCurve, auc: f64, title: &str) -> Plot {
    let curve = Scatter::new(roc.fpr.clone(), roc.tpr.clone())
        .mode(Mode::Lines)
        .name(&format!("ROC (AUC = {:.2})", auc));
    let chance = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("Chance")
        .line(Line::new().color("gray").dash(DashType::Dash));

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("False positive rate"))
        .y_axis(Axis::new().title("True positive rate"));

    let mut plot = Plot::new();
    plot.add_trace(curve);
    plot.add_trace(chance);
    plot.set_layout(layout);
    plot
}

/// Horizontal bars, one per feature, in ranking order.
pub fn plot_feature_impact(ranking: &ImpactRanking, title: &str) -> Plot {
    let names: Vec<String> = ranking.entries.iter().map(|e| e.feature.clone()).collect();
    let scores: Vec<f64> = ranking.entries.iter().map(|e| e.score).collect();

    let trace = Bar::new(scores, names)
        .orientation(Orientation::Horizontal)
        .name(ranking.measure.label());
    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title(ranking.measure.label()))
        .height(200 + 22 * ranking.len());

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureImpact;

    #[test]
    fn plots_render_to_html() {
        let cm = ConfusionMatrix {
            tn: 5,
            fp: 1,
            fn_: 2,
            tp: 4,
        };
        let html = plot_confusion_matrix(&cm, "Confusion matrix").to_html();
        assert!(html.contains("Confusion matrix"));

        let roc = RocCurve {
            fpr: vec![0.0, 0.5, 1.0],
            tpr: vec![0.0, 1.0, 1.0],
            thresholds: vec![f64::INFINITY, 0.7, 0.1],
        };
        let html = plot_roc_curve(&roc, 0.75, "ROC").to_html();
        assert!(html.contains("AUC = 0.75"));

        let ranking = ImpactRanking::new(
            &["dias_em_atraso".to_string(), "valor_divida".to_string()],
            FeatureImpact::Impurity(vec![0.25, 0.75]),
        )
        .unwrap();
        let html = plot_feature_impact(&ranking, "Impact").to_html();
        assert!(html.contains("valor_divida"));
    }
}
