//! Interactive menus over an [`InventoryLedger`].
//!
//! Every action runs to completion or reports its ledger error and returns to
//! the menu it came from. Only I/O failures (including end of input) leave
//! the session.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use stockbook_infra::{InventoryLedger, InventoryStore, LedgerError};
use stockbook_inventory::{AdjustStock, HistoryRecord, NewProduct, Product, ProductPatch};

use crate::prompt::{Console, is_eof};
use crate::render::{self, Cell, DESCRIPTION_WIDTH, NAME_WIDTH, Table};

#[derive(Debug, Error)]
enum ActionError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

type ActionResult<T = ()> = Result<T, ActionError>;

/// Words that leave product selection.
const BACK_WORDS: [&str; 3] = ["0", "back", "quit"];

pub struct Session<'a, S, R, W> {
    ledger: &'a InventoryLedger<S>,
    console: &'a mut Console<R, W>,
}

impl<'a, S, R, W> Session<'a, S, R, W>
where
    S: InventoryStore,
    R: BufRead,
    W: Write,
{
    pub fn new(ledger: &'a InventoryLedger<S>, console: &'a mut Console<R, W>) -> Self {
        Self { ledger, console }
    }

    /// Run the main menu until the user exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        match self.main_menu() {
            Err(err) if is_eof(&err) => {
                tracing::debug!("input closed, leaving menu");
                Ok(())
            }
            other => other,
        }
    }

    fn main_menu(&mut self) -> io::Result<()> {
        loop {
            self.console.header("")?;
            self.show_statistics()?;

            self.console.blank()?;
            self.console.say("Main menu:")?;
            self.console.say("1. Manage products")?;
            self.console.say("2. Stock control")?;
            self.console.say("3. Search products")?;
            self.console.say("4. Stock history")?;
            self.console.say("0. Exit")?;

            match self.console.choice("Select an option", &["0", "1", "2", "3", "4"])?.as_str() {
                "1" => self.products_menu()?,
                "2" => self.stock_menu()?,
                "3" => self.attempt(Self::search_products)?,
                "4" => self.history_menu()?,
                _ => {
                    if self.console.confirm("Are you sure you want to exit?")? {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn show_statistics(&mut self) -> io::Result<()> {
        match self.ledger.summary() {
            Ok(summary) => {
                self.console.say("Statistics:")?;
                self.console.say(format!("   Total products: {}", summary.total))?;
                self.console.say(format!("   Low stock: {}", summary.low_stock))?;
                self.console.say(format!("   Out of stock: {}", summary.out_of_stock))
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load statistics");
                self.console.fail(format!("Statistics unavailable: {err}"))
            }
        }
    }

    fn products_menu(&mut self) -> io::Result<()> {
        loop {
            self.console.header("Manage products")?;
            self.console.say("1. List all products")?;
            self.console.say("2. Add product")?;
            self.console.say("3. Edit product")?;
            self.console.say("4. Delete product")?;
            self.console.say("5. Product details")?;
            self.console.say("0. Back to main menu")?;

            match self
                .console
                .choice("Select an option", &["0", "1", "2", "3", "4", "5"])?
                .as_str()
            {
                "1" => self.attempt(Self::list_products)?,
                "2" => self.attempt(Self::add_product)?,
                "3" => self.attempt(Self::edit_product)?,
                "4" => self.attempt(Self::delete_product)?,
                "5" => self.attempt(Self::product_details)?,
                _ => return Ok(()),
            }
        }
    }

    fn stock_menu(&mut self) -> io::Result<()> {
        loop {
            self.console.header("Stock control")?;
            self.console.say("1. Adjust stock")?;
            self.console.say("2. Low stock products")?;
            self.console.say("3. Out of stock products")?;
            self.console.say("0. Back to main menu")?;

            match self.console.choice("Select an option", &["0", "1", "2", "3"])?.as_str() {
                "1" => self.attempt(Self::adjust_stock)?,
                "2" => self.attempt(Self::low_stock)?,
                "3" => self.attempt(Self::out_of_stock)?,
                _ => return Ok(()),
            }
        }
    }

    fn history_menu(&mut self) -> io::Result<()> {
        loop {
            self.console.header("Stock history")?;
            self.console.say("1. History by product")?;
            self.console.say("2. Recent history")?;
            self.console.say("0. Back to main menu")?;

            match self.console.choice("Select an option", &["0", "1", "2"])?.as_str() {
                "1" => self.attempt(Self::product_history)?,
                "2" => self.attempt(Self::recent_history)?,
                _ => return Ok(()),
            }
        }
    }

    /// Run an action; ledger errors are logged and reported, I/O errors propagate.
    fn attempt(&mut self, action: fn(&mut Self) -> ActionResult) -> io::Result<()> {
        match action(self) {
            Ok(()) => Ok(()),
            Err(ActionError::Io(err)) => Err(err),
            Err(ActionError::Ledger(err)) => {
                tracing::error!(error = %err, "menu action failed");
                self.console.fail(format!("Error: {err}"))?;
                self.console.pause()
            }
        }
    }

    /// Search-driven product picker. `None` when the user backs out.
    fn select_product(&mut self, prompt: &str) -> ActionResult<Option<Product>> {
        loop {
            self.console.blank()?;
            let term = self
                .console
                .line(&format!("{prompt} (name, brand or ID; 0 to go back)"))?;

            if BACK_WORDS.contains(&term.to_ascii_lowercase().as_str()) {
                return Ok(None);
            }
            if term.is_empty() {
                self.console.warn("Enter a search term")?;
                continue;
            }

            let mut results = self.ledger.search_products(&term)?;
            if results.is_empty() {
                self.console.warn(format!("No products found for '{term}'"))?;
                continue;
            }

            self.console.success(format!("Found {} products:", results.len()))?;
            let mut table = Table::new(&["#", "ID", "Name", "Brand", "Stock", "Price"]);
            for (i, product) in results.iter().enumerate() {
                table.row(vec![
                    (i + 1).to_string().into(),
                    product.id.to_string().into(),
                    render::truncate(&product.name, DESCRIPTION_WIDTH).into(),
                    render::or_dash(&product.brand).into(),
                    self.stock_cell(product),
                    render::price(product.price).into(),
                ]);
            }
            self.print_table(&table)?;

            self.console.blank()?;
            self.console
                .say(format!("1-{} select a product, 0 go back, 'new' search again", results.len()))?;
            let choice = self.console.line("Your choice")?.to_ascii_lowercase();

            if BACK_WORDS.contains(&choice.as_str()) {
                return Ok(None);
            }
            if choice == "new" {
                continue;
            }
            match choice.parse::<usize>() {
                Ok(n) if (1..=results.len()).contains(&n) => {
                    return Ok(Some(results.swap_remove(n - 1)));
                }
                _ => self.console.fail("Invalid option")?,
            }
        }
    }

    fn list_products(&mut self) -> ActionResult {
        self.console.header("Product list")?;

        let products = self.ledger.list_products()?;
        if products.is_empty() {
            self.console.warn("No products registered.")?;
        } else {
            self.print_products(&products)?;
        }
        Ok(self.console.pause()?)
    }

    fn add_product(&mut self) -> ActionResult {
        self.console.header("Add product")?;

        let name = self.console.line("Product name")?;
        if name.is_empty() {
            self.console.fail("Product name is required!")?;
            return Ok(self.console.pause()?);
        }
        let description = self.console.line_or("Description", "")?;
        let price = self.console.decimal("Sale price", None)?;
        let stock = self.console.number("Initial stock", Some(0))?;
        let brand = self.console.line_or("Brand", "")?;

        if self.console.confirm("Save product?")? {
            let product = self.ledger.add_product(
                NewProduct::new(name, price)
                    .with_description(description)
                    .with_stock(stock)
                    .with_brand(brand),
            )?;
            self.console.success(format!(
                "Product '{}' created with ID {}",
                product.name, product.id
            ))?;
        }
        Ok(self.console.pause()?)
    }

    fn edit_product(&mut self) -> ActionResult {
        self.console.header("Edit product")?;

        let Some(product) = self.select_product("Product to edit")? else {
            return Ok(());
        };
        self.console.blank()?;
        self.console.say(format!("Editing: {} (ID {})", product.name, product.id))?;

        let name = self.console.line_or("Name", &product.name)?;
        let description = self.console.line_or("Description", &product.description)?;
        let price = self.console.decimal("Price", Some(product.price))?;
        let brand = self.console.line_or("Brand", &product.brand)?;

        let mut patch = ProductPatch::default();
        if name != product.name {
            patch = patch.name(name);
        }
        if description != product.description {
            patch = patch.description(description);
        }
        if price != product.price {
            patch = patch.price(price);
        }
        if brand != product.brand {
            patch = patch.brand(brand);
        }

        if patch.is_empty() {
            self.console.warn("Nothing changed.")?;
        } else if self.console.confirm("Update product?")? {
            self.ledger.edit_product(product.id, patch)?;
            self.console.success("Product updated")?;
        }
        Ok(self.console.pause()?)
    }

    fn delete_product(&mut self) -> ActionResult {
        self.console.header("Delete product")?;

        let Some(product) = self.select_product("Product to delete")? else {
            return Ok(());
        };
        self.console.blank()?;
        self.console.say(format!("ID: {}", product.id))?;
        self.console.say(format!("Name: {}", product.name))?;
        self.console.say(format!("Brand: {}", render::or_dash(&product.brand)))?;
        self.console.say(format!("Current stock: {} units", product.stock))?;

        if self
            .console
            .confirm("Are you sure you want to delete this product?")?
        {
            if self.ledger.delete_product(product.id)? {
                self.console.success("Product deleted")?;
            } else {
                self.console.fail("Product no longer exists")?;
            }
        }
        Ok(self.console.pause()?)
    }

    fn product_details(&mut self) -> ActionResult {
        self.console.header("Product details")?;

        let Some(product) = self.select_product("Product to show")? else {
            return Ok(());
        };
        let level = self.ledger.classify(&product);

        self.console.blank()?;
        self.console.say(format!("ID:          {}", product.id))?;
        self.console.say(format!("Name:        {}", product.name))?;
        self.console.say(format!("Description: {}", render::or_dash(&product.description)))?;
        self.console.say(format!("Price:       {}", render::price(product.price)))?;
        self.console
            .say(format!("Stock:       {} ({})", product.stock, level.as_str()))?;
        self.console.say(format!("Brand:       {}", render::or_dash(&product.brand)))?;
        self.console
            .say(format!("Created:     {}", render::timestamp(product.created_at)))?;
        self.console
            .say(format!("Updated:     {}", render::timestamp(product.updated_at)))?;
        Ok(self.console.pause()?)
    }

    fn adjust_stock(&mut self) -> ActionResult {
        self.console.header("Adjust stock")?;

        let Some(product) = self.select_product("Product to adjust")? else {
            return Ok(());
        };
        self.console.blank()?;
        self.console.say(format!("Name: {}", product.name))?;
        self.console.say(format!("Current stock: {} units", product.stock))?;

        let new_stock = self.console.number("New stock", None)?;
        let reason = self.console.line_or("Reason", "Manual adjustment")?;

        if self.console.confirm(&format!(
            "Change stock from {} to {new_stock}?",
            product.stock
        ))? {
            self.ledger
                .adjust_stock(AdjustStock::new(product.id, new_stock).with_reason(reason))?;
            self.console.success("Stock updated")?;
        }
        Ok(self.console.pause()?)
    }

    fn low_stock(&mut self) -> ActionResult {
        let threshold = self.ledger.settings().low_stock_threshold.get();
        self.console
            .header(&format!("Low stock products (<= {threshold} units)"))?;

        let products = self.ledger.low_stock_default()?;
        if products.is_empty() {
            self.console.success("No products with low stock")?;
        } else {
            let mut table = Table::new(&["ID", "Name", "Brand", "Stock", "Price"]);
            for product in &products {
                table.row(vec![
                    product.id.to_string().into(),
                    render::truncate(&product.name, NAME_WIDTH).into(),
                    render::or_dash(&product.brand).into(),
                    self.stock_cell(product),
                    render::price(product.price).into(),
                ]);
            }
            self.print_table(&table)?;
        }
        Ok(self.console.pause()?)
    }

    fn out_of_stock(&mut self) -> ActionResult {
        self.console.header("Out of stock products")?;

        let products = self.ledger.out_of_stock()?;
        if products.is_empty() {
            self.console.success("No products out of stock")?;
        } else {
            let mut table = Table::new(&["ID", "Name", "Brand", "Price", "Last update"]);
            for product in &products {
                table.row(vec![
                    product.id.to_string().into(),
                    render::truncate(&product.name, NAME_WIDTH).into(),
                    render::or_dash(&product.brand).into(),
                    render::price(product.price).into(),
                    render::timestamp(product.updated_at).into(),
                ]);
            }
            self.print_table(&table)?;
        }
        Ok(self.console.pause()?)
    }

    fn search_products(&mut self) -> ActionResult {
        self.console.header("Search products")?;

        let term = self.console.line("Search term (name, brand or ID)")?;
        if term.is_empty() {
            self.console.warn("Empty search term.")?;
            return Ok(self.console.pause()?);
        }

        let products = self.ledger.search_products(&term)?;
        if products.is_empty() {
            self.console.warn(format!("No products found for '{term}'"))?;
        } else {
            self.console.success(format!("Found {} products", products.len()))?;
            self.print_products(&products)?;
        }
        Ok(self.console.pause()?)
    }

    fn product_history(&mut self) -> ActionResult {
        self.console.header("History by product")?;

        let Some(product) = self.select_product("Product to show history for")? else {
            return Ok(());
        };
        self.console.blank()?;
        self.console.say(format!("Product: {}", product.name))?;

        let history = self.ledger.history_for_product_default(product.id)?;
        if history.is_empty() {
            self.console.warn("No history recorded for this product.")?;
        } else {
            let mut table = Table::new(&["Date", "Old stock", "New stock", "Variation", "Type", "Reason"]);
            for record in &history {
                let mut row = vec![render::timestamp(record.entry.created_at).into()];
                row.extend(self.movement_cells(record));
                row.push(render::or_dash(&record.entry.reason).into());
                table.row(row);
            }
            self.print_table(&table)?;
        }
        Ok(self.console.pause()?)
    }

    fn recent_history(&mut self) -> ActionResult {
        self.console.header("Recent history")?;

        let history = self.ledger.recent_history_default()?;
        if history.is_empty() {
            self.console.warn("No stock movements recorded.")?;
        } else {
            let mut table = Table::new(&["Date", "Product", "Old stock", "New stock", "Variation", "Type"]);
            for record in &history {
                let mut row = vec![
                    render::timestamp(record.entry.created_at).into(),
                    render::truncate(&record.product_name, NAME_WIDTH).into(),
                ];
                row.extend(self.movement_cells(record));
                table.row(row);
            }
            self.print_table(&table)?;
        }
        Ok(self.console.pause()?)
    }

    fn print_products(&mut self, products: &[Product]) -> io::Result<()> {
        let mut table = Table::new(&["ID", "Name", "Brand", "Price", "Stock", "Description"]);
        for product in products {
            table.row(vec![
                product.id.to_string().into(),
                render::truncate(&product.name, NAME_WIDTH).into(),
                render::or_dash(&product.brand).into(),
                render::price(product.price).into(),
                self.stock_cell(product),
                render::truncate(render::or_dash(&product.description), DESCRIPTION_WIDTH).into(),
            ]);
        }
        self.print_table(&table)
    }

    fn print_table(&mut self, table: &Table) -> io::Result<()> {
        let rendered = table.render(self.console.styled());
        self.console.say(rendered)
    }

    fn stock_cell(&self, product: &Product) -> Cell {
        let color = render::stock_color(self.ledger.classify(product));
        Cell::colored(product.stock.to_string(), color)
    }

    /// Old stock, new stock, signed variation, change type.
    fn movement_cells(&self, record: &HistoryRecord) -> [Cell; 4] {
        let delta = record.entry.variation();
        [
            record.entry.old_stock.to_string().into(),
            record.entry.new_stock.to_string().into(),
            Cell::colored(render::variation(delta), render::variation_color(delta)),
            record.entry.change_type.as_str().into(),
        ]
    }
}
