//! Run summary report generation

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

/// Summary of one end-to-end pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Width of the prepared feature matrix
    pub features_out: usize,
    /// Search candidates scored; 0 when search was disabled
    pub candidates_scored: usize,
    pub best_cv_auc: Option<f64>,
    pub test_auc: f64,
    pub test_accuracy: f64,
    /// Most important features, descending
    pub top_features: Vec<(String, f64)>,
    pub artifacts_dir: PathBuf,
}

impl RunSummary {
    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Input Rows"), Cell::new(self.input_rows)]);
        table.add_row(vec![
            Cell::new("✂️  Train / Test Rows"),
            Cell::new(format!("{} / {}", self.train_rows, self.test_rows)),
        ]);
        table.add_row(vec![
            Cell::new("🧮 Prepared Features"),
            Cell::new(self.features_out),
        ]);
        table.add_row(vec![
            Cell::new("🔍 Candidates Scored"),
            Cell::new(if self.candidates_scored == 0 {
                "search disabled".to_string()
            } else {
                self.candidates_scored.to_string()
            }),
        ]);
        if let Some(cv_auc) = self.best_cv_auc {
            table.add_row(vec![
                Cell::new("📈 Best CV ROC-AUC"),
                Cell::new(format!("{:.4}", cv_auc)),
            ]);
        }

        table.add_row(vec![
            Cell::new("🎯 Test Accuracy"),
            Cell::new(format!("{:.4}", self.test_accuracy)),
        ]);

        let color = if self.test_auc >= 0.75 {
            Color::Green
        } else if self.test_auc >= 0.6 {
            Color::Yellow
        } else {
            Color::Red
        };
        table.add_row(vec![
            Cell::new("✅ Test ROC-AUC"),
            Cell::new(format!("{:.4}", self.test_auc))
                .fg(color)
                .add_attribute(Attribute::Bold),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.top_features.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("TOP FEATURES").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            println!();
            for (feature, importance) in &self.top_features {
                println!(
                    "        {} {} {}",
                    style("•").dim(),
                    feature,
                    style(format!("({:.4})", importance)).dim()
                );
            }
        }

        println!();
        println!(
            "    {} {}",
            style("Artifacts:").dim(),
            style(self.artifacts_dir.display()).cyan()
        );
    }
}
