use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Context, Result};
use crate::fetch::cache::normalize_ticker;
use crate::fetch::BarField;

pub mod export;
pub mod filters;

pub use export::{export_file_name, export_series, write_series_csv};
pub use filters::{apply_filters, Comparison, Filter};

/// Category label for tickers without an assignment.
pub const UNCATEGORISED: &str = "Sem categoria";

/// Durable watchlist document: tracked tickers, their categories, saved
/// filters and the columns shown for a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    #[serde(default)]
    stocks: Vec<String>,
    #[serde(default)]
    categories: BTreeMap<String, String>,
    #[serde(default)]
    category_list: Vec<String>,
    #[serde(default)]
    filters: BTreeMap<String, Filter>,
    #[serde(default = "BarField::default_columns")]
    selected_columns: Vec<BarField>,
}

impl Default for Watchlist {
    fn default() -> Self {
        Self {
            stocks: Vec::new(),
            categories: BTreeMap::new(),
            category_list: Vec::new(),
            filters: BTreeMap::new(),
            selected_columns: BarField::default_columns(),
        }
    }
}

impl Watchlist {
    /// Load the document, starting empty when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read watchlist {}", path.display()))?,
        };
        let watchlist = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse watchlist {}", path.display()))?;
        Ok(watchlist)
    }

    /// Write the document, then read it back and confirm every ticker landed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize watchlist")?;
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create watchlist file {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write watchlist file {}", path.display()))?;
        drop(file);

        let saved = Self::load(path)?;
        if saved.stocks.len() != self.stocks.len() {
            return Err(AppError::message(format!(
                "Watchlist verification failed for {}: expected {} tickers, found {}",
                path.display(),
                self.stocks.len(),
                saved.stocks.len()
            )));
        }
        Ok(())
    }

    pub fn stocks(&self) -> &[String] {
        &self.stocks
    }

    pub fn contains(&self, ticker: &str) -> bool {
        let ticker = normalize_ticker(ticker);
        self.stocks.iter().any(|stock| *stock == ticker)
    }

    pub fn add_ticker(&mut self, ticker: &str) -> Result<String> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(AppError::message("Ticker must not be empty"));
        }
        if self.contains(&ticker) {
            return Err(AppError::message(format!("{} is already tracked", ticker)));
        }
        self.stocks.push(ticker.clone());
        Ok(ticker)
    }

    pub fn remove_ticker(&mut self, ticker: &str) -> Result<()> {
        let ticker = normalize_ticker(ticker);
        let index = self.position(&ticker)?;
        self.stocks.remove(index);
        self.categories.remove(&ticker);
        Ok(())
    }

    /// Rename in place, keeping list order and the category assignment.
    pub fn rename_ticker(&mut self, from: &str, to: &str) -> Result<String> {
        let from = normalize_ticker(from);
        let to = normalize_ticker(to);
        if to.is_empty() {
            return Err(AppError::message("Ticker must not be empty"));
        }
        let index = self.position(&from)?;
        if from != to && self.contains(&to) {
            return Err(AppError::message(format!("{} is already tracked", to)));
        }

        self.stocks[index] = to.clone();
        if let Some(category) = self.categories.remove(&from) {
            self.categories.insert(to.clone(), category);
        }
        Ok(to)
    }

    pub fn category_list(&self) -> &[String] {
        &self.category_list
    }

    pub fn category_of(&self, ticker: &str) -> &str {
        self.categories
            .get(&normalize_ticker(ticker))
            .map(String::as_str)
            .unwrap_or(UNCATEGORISED)
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || name == UNCATEGORISED {
            return Err(AppError::message(format!("`{}` is not a valid category name", name)));
        }
        if self.category_list.iter().any(|existing| existing == name) {
            return Err(AppError::message(format!("Category `{}` already exists", name)));
        }
        self.category_list.push(name.to_string());
        Ok(())
    }

    /// Drop the category and unassign every ticker that used it.
    pub fn remove_category(&mut self, name: &str) -> Result<()> {
        let index = self.category_position(name)?;
        self.category_list.remove(index);
        self.categories.retain(|_, category| category != name);
        Ok(())
    }

    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        let index = self.category_position(from)?;
        if from == to {
            return Ok(());
        }
        if to.is_empty() || to == UNCATEGORISED {
            return Err(AppError::message(format!("`{}` is not a valid category name", to)));
        }
        if self.category_list.iter().any(|existing| existing == to) {
            return Err(AppError::message(format!("Category `{}` already exists", to)));
        }

        self.category_list[index] = to.to_string();
        for category in self.categories.values_mut() {
            if category == from {
                *category = to.to_string();
            }
        }
        Ok(())
    }

    /// Assign a ticker to a category; `None` or the uncategorised label clears it.
    pub fn assign_category(&mut self, ticker: &str, category: Option<&str>) -> Result<()> {
        let ticker = normalize_ticker(ticker);
        self.position(&ticker)?;

        match category.map(str::trim).filter(|name| *name != UNCATEGORISED) {
            Some(name) => {
                self.category_position(name)?;
                self.categories.insert(ticker, name.to_string());
            }
            None => {
                self.categories.remove(&ticker);
            }
        }
        Ok(())
    }

    /// Tracked tickers, optionally restricted to one category.
    pub fn tickers_in(&self, category: Option<&str>) -> Vec<String> {
        self.stocks
            .iter()
            .filter(|ticker| category.map_or(true, |wanted| self.category_of(ticker) == wanted))
            .cloned()
            .collect()
    }

    pub fn filters(&self) -> &BTreeMap<String, Filter> {
        &self.filters
    }

    pub fn add_filter(&mut self, name: &str, filter: Filter) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::message("Filter name must not be empty"));
        }
        self.filters.insert(name.to_string(), filter);
        Ok(())
    }

    pub fn remove_filter(&mut self, name: &str) -> Result<Filter> {
        self.filters
            .remove(name)
            .ok_or_else(|| AppError::message(format!("No filter named `{}`", name)))
    }

    pub fn selected_columns(&self) -> &[BarField] {
        &self.selected_columns
    }

    pub fn set_selected_columns(&mut self, columns: Vec<BarField>) {
        let mut unique = Vec::with_capacity(columns.len());
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        self.selected_columns = unique;
    }

    fn position(&self, ticker: &str) -> Result<usize> {
        self.stocks
            .iter()
            .position(|stock| stock == ticker)
            .ok_or_else(|| AppError::message(format!("{} is not tracked", ticker)))
    }

    fn category_position(&self, name: &str) -> Result<usize> {
        self.category_list
            .iter()
            .position(|existing| existing == name.trim())
            .ok_or_else(|| AppError::message(format!("Unknown category `{}`", name)))
    }
}
