//! Self-contained HTML report assembled from maud fragments and plotly plots.

use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

const STYLE: &str = "
body { font-family: sans-serif; margin: 0 auto; max-width: 1100px; padding: 0 20px; color: #222; }
header { border-bottom: 2px solid #2a6f97; margin-bottom: 20px; }
header .meta { color: #666; font-size: 0.9em; }
section { margin-bottom: 40px; }
table { border-collapse: collapse; margin: 10px 0; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th:first-child, td:first-child { text-align: left; }
";

/// One titled block of the report: free content and plots, in insertion order.
pub struct ReportSection {
    title: String,
    blocks: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.blocks.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.blocks.push(PreEscaped(plot.to_inline_html(None)));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.blocks {
                    div { (block) }
                }
            }
        }
    }
}

pub struct Report {
    software: String,
    version: String,
    title: String,
    generated_at: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(software: &str, version: &str, title: &str) -> Self {
        Report {
            software: software.to_string(),
            version: version.to_string(),
            title: title.to_string(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    header {
                        h1 { (self.title) }
                        p class="meta" {
                            (self.software) " " (self.version) " | generated " (self.generated_at)
                        }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.render().into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_render_in_order_and_escape_text() {
        let mut report = Report::new("recoup", "0.1.0", "Run <1>");
        let mut first = ReportSection::new("Overview");
        first.add_content(html! { p { "a & b" } });
        report.add_section(first);
        report.add_section(ReportSection::new("Metrics"));

        let out = report.render().into_string();
        assert!(out.contains("Run &lt;1&gt;"));
        assert!(out.contains("a &amp; b"));
        let overview = out.find("Overview").unwrap();
        let metrics = out.find("Metrics").unwrap();
        assert!(overview < metrics);
    }
}
