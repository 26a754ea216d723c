//! Console tables for rankings, model comparison and the recommendation

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{
    ComparisonTable, DataQualityWarning, FeatureSet, Ranking, Recommendation,
};

/// Wall-clock time spent in each stage of a run
#[derive(Debug, Default, Clone)]
pub struct StageTimings {
    pub load: Duration,
    pub preprocess: Duration,
    pub correlation: Duration,
    pub importance: Duration,
    pub evaluation: Duration,
    pub recommendation: Duration,
    pub save: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.load
            + self.preprocess
            + self.correlation
            + self.importance
            + self.evaluation
            + self.recommendation
            + self.save
    }

    pub fn display(&self) {
        print_section("⏱️", "TIMING");

        let mut table = new_table(vec!["Stage", "Time"]);
        for (stage, elapsed) in [
            ("Load", self.load),
            ("Preprocess", self.preprocess),
            ("Correlation", self.correlation),
            ("Attribution", self.importance),
            ("Evaluation", self.evaluation),
            ("Recommendation", self.recommendation),
            ("Save", self.save),
        ] {
            table.add_row(vec![
                Cell::new(stage),
                Cell::new(format_duration(elapsed)).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(format_duration(self.total()))
                .set_alignment(CellAlignment::Right)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        print_indented(&table);
    }
}

fn format_duration(d: Duration) -> String {
    if d.as_secs_f64() >= 1.0 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}ms", d.as_millis())
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Ranked features with their scores, at most `limit` rows
pub fn display_ranking(title: &str, ranking: &Ranking, limit: usize, score_label: &str) {
    print_section("📊", title);

    let mut table = new_table(vec!["#", "Feature", score_label]);
    for (i, entry) in ranking.entries().iter().take(limit).enumerate() {
        let color = if entry.score >= 0.0 {
            Color::Green
        } else {
            Color::Red
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&entry.feature),
            Cell::new(format!("{:.4}", entry.score))
                .fg(color)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    print_indented(&table);
}

/// Union of ranked features used for the reduced models
pub fn display_selected_features(selected: &[String], total: usize) {
    print_section("🎯", "SELECTED FEATURES");
    println!(
        "      {} of {} features",
        style(selected.len()).yellow().bold(),
        total
    );
    for feature in selected {
        println!("        {} {}", style("•").dim(), feature);
    }
}

/// Full vs selected metrics per backend
pub fn display_comparison_table(comparison: &ComparisonTable) {
    print_section("📋", "MODEL COMPARISON (test set, natural units)");

    let best_r2 = comparison
        .rows
        .iter()
        .map(|r| r.r2)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut table = new_table(vec!["Model", "Features", "R²", "MSE", "MAE"]);
    for row in &comparison.rows {
        let name_cell = match row.feature_set {
            FeatureSet::Full => Cell::new(&row.model),
            FeatureSet::Selected => Cell::new(&row.model).fg(Color::Cyan),
        };
        let r2_cell = Cell::new(format!("{:.4}", row.r2)).set_alignment(CellAlignment::Right);
        let r2_cell = if row.r2 == best_r2 {
            r2_cell.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            r2_cell
        };
        table.add_row(vec![
            name_cell,
            Cell::new(row.n_features).set_alignment(CellAlignment::Right),
            r2_cell,
            Cell::new(format!("{:.4}", row.mse)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", row.mae)).set_alignment(CellAlignment::Right),
        ]);
    }
    print_indented(&table);
}

/// Recommended conditions from the top-conductivity subset
pub fn display_recommendation(rec: &Recommendation) {
    print_section("🧪", "RECOMMENDED ELECTROLYTE CONDITIONS");
    println!(
        "      Top {:.0}% cutoff for k: {}",
        (1.0 - rec.quantile) * 100.0,
        style(format!("{:.4}", rec.threshold)).yellow().bold()
    );
    println!(
        "      Samples in subset: {} / {}",
        style(rec.subset_size).yellow().bold(),
        rec.total_size
    );
    println!();

    let mut table = new_table(vec!["Condition", "Value"]);
    for mode in &rec.modes {
        table.add_row(vec![
            Cell::new(&mode.field),
            Cell::new(format!("{} ({} samples)", mode.value, mode.count)).fg(Color::Green),
        ]);
    }
    if let Some(t) = rec.temperature {
        table.add_row(vec![Cell::new("T (mean)"), Cell::new(format!("{:.1} °C", t))]);
    }
    if let Some(c) = rec.concentration {
        table.add_row(vec![
            Cell::new("c (mean)"),
            Cell::new(format!("{:.2} mol/L", c)),
        ]);
    }
    print_indented(&table);

    if !rec.top_solvents.is_empty() {
        println!();
        let mut solvents = new_table(vec!["Solvent", "Mean fraction"]);
        for entry in rec.top_solvents.entries() {
            solvents.add_row(vec![
                Cell::new(&entry.feature),
                Cell::new(format!("{:.4}", entry.score)).set_alignment(CellAlignment::Right),
            ]);
        }
        print_indented(&solvents);
    }

    if !rec.absent_fields.is_empty() {
        println!();
        println!(
            "      {} {}",
            style("Not in table:").dim(),
            rec.absent_fields.join(", ")
        );
    }
}

/// Data-quality warnings collected during preprocessing
pub fn display_warnings(warnings: &[DataQualityWarning]) {
    if warnings.is_empty() {
        return;
    }
    print_section("⚠️", "DATA QUALITY");
    for warning in warnings {
        println!("      {} {}", style("•").yellow(), warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_total_sums_stages() {
        let timings = StageTimings {
            load: Duration::from_millis(10),
            evaluation: Duration::from_millis(30),
            ..Default::default()
        };
        assert_eq!(timings.total(), Duration::from_millis(40));
    }
}
