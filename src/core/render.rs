use crate::core::Presenter;
use crate::domain::model::MenuItem;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// What a single table row shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub title: String,
    pub additives: String,
    pub price: String,
}

impl Row {
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            title: item.name.clone(),
            additives: item.additives_description.clone(),
            price: item.price.clone(),
        }
    }
}

/// Row for `index`, or an empty row when the index does not (or no longer)
/// points into `items`.
pub fn row_at(items: &[MenuItem], index: usize) -> Row {
    items.get(index).map(Row::from_item).unwrap_or_default()
}

pub fn project(items: &[MenuItem]) -> Vec<Row> {
    (0..items.len()).map(|index| row_at(items, index)).collect()
}

/// Plain text table: title line, then name / additives / price columns.
pub struct TerminalPresenter<W: Write> {
    out: W,
    title: String,
    loading: bool,
    show_progress: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            title: String::new(),
            loading: false,
            show_progress: false,
        }
    }

    /// Also echo loading titles as they happen (interactive sessions).
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_table(&mut self, items: &[MenuItem]) -> std::io::Result<()> {
        writeln!(self.out, "{}", self.title)?;

        let rows = project(items);
        if rows.is_empty() {
            writeln!(self.out, "  (no dishes)")?;
            return Ok(());
        }

        let name_width = column_width(rows.iter().map(|row| row.title.as_str()));
        let additives_width = column_width(rows.iter().map(|row| row.additives.as_str()));

        for row in &rows {
            writeln!(
                self.out,
                "  {}  {}  {}",
                pad(&row.title, name_width),
                pad(&row.additives, additives_width),
                row.price
            )?;
        }
        Ok(())
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        if self.show_progress && self.loading {
            if let Err(e) = writeln!(self.out, "{}", title) {
                tracing::debug!("Cannot write title: {}", e);
            }
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn reload(&mut self, items: &[MenuItem]) -> Result<()> {
        self.write_table(items)?;
        self.out.flush()?;
        Ok(())
    }
}

fn column_width<'a>(cells: impl Iterator<Item = &'a str>) -> usize {
    cells.map(|cell| cell.chars().count()).max().unwrap_or(0)
}

fn pad(cell: &str, width: usize) -> String {
    let missing = width.saturating_sub(cell.chars().count());
    format!("{}{}", cell, " ".repeat(missing))
}

/// CSV with a header row; image URLs are joined with spaces.
pub struct CsvPresenter<W: Write> {
    out: W,
}

impl<W: Write> CsvPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for CsvPresenter<W> {
    fn set_title(&mut self, _title: &str) {}

    fn set_loading(&mut self, _loading: bool) {}

    fn reload(&mut self, items: &[MenuItem]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(&mut self.out);
        writer.write_record(["name", "additives", "price", "images"])?;
        for item in items {
            writer.write_record([
                item.name.as_str(),
                item.additives_description.as_str(),
                item.price.as_str(),
                item.image_urls.join(" ").as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct JsonPresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn set_title(&mut self, _title: &str) {}

    fn set_loading(&mut self, _loading: bool) {}

    fn reload(&mut self, items: &[MenuItem]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, items)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Boxed presenter for the requested format.
pub fn presenter_for<W: Write + 'static>(
    format: OutputFormat,
    out: W,
    show_progress: bool,
) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Table => Box::new(TerminalPresenter::new(out).with_progress(show_progress)),
        OutputFormat::Csv => Box::new(CsvPresenter::new(out)),
        OutputFormat::Json => Box::new(JsonPresenter::new(out)),
    }
}

impl Presenter for Box<dyn Presenter> {
    fn set_title(&mut self, title: &str) {
        (**self).set_title(title)
    }

    fn set_loading(&mut self, loading: bool) {
        (**self).set_loading(loading)
    }

    fn reload(&mut self, items: &[MenuItem]) -> Result<()> {
        (**self).reload(items)
    }
}
