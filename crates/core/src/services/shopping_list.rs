//! Shopping list aggregation and text export.
//!
//! The cart's recipes are flattened into ingredient lines, grouped by
//! ingredient id and summed. Groups are sorted by name (case-insensitive),
//! then unit, then id, and numbered from 1.

use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use foodgram_common::{AppResult, AppSettings};
use foodgram_db::repositories::{
    IngredientRow, MembershipKind, RecipeMembershipRepository, RecipeRepository,
};
use serde::Serialize;

/// One consolidated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    /// 1-based position after sorting.
    pub index: usize,
    /// Ingredient name, capitalized.
    pub name: String,
    pub measurement_unit: String,
    /// Sum of the amounts across every recipe in the cart.
    pub total_amount: i64,
}

/// Rendered shopping list ready to be sent as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListExport {
    pub file_name: String,
    pub content: String,
}

/// Consolidate ingredient lines into a sorted, numbered shopping list.
#[must_use]
pub fn aggregate(rows: &[IngredientRow]) -> Vec<ShoppingListItem> {
    let mut groups: HashMap<&str, (&str, &str, i64)> = HashMap::new();
    for row in rows {
        let entry = groups
            .entry(row.ingredient.id.as_str())
            .or_insert((
                row.ingredient.name.as_str(),
                row.ingredient.measurement_unit.as_str(),
                0,
            ));
        entry.2 += i64::from(row.amount);
    }

    let mut sorted: Vec<(String, &str, &str, &str, i64)> = groups
        .into_iter()
        .map(|(id, (name, unit, total))| (name.to_lowercase(), unit, id, name, total))
        .collect();
    sorted.sort_unstable_by(|a, b| (&a.0, a.1, a.2).cmp(&(&b.0, b.1, b.2)));

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (_, unit, _, name, total))| ShoppingListItem {
            index: i + 1,
            name: capitalize(name),
            measurement_unit: unit.to_string(),
            total_amount: total,
        })
        .collect()
}

/// Render the list as plain text: header, blank line, one line per item.
#[must_use]
pub fn render(header: &str, items: &[ShoppingListItem]) -> String {
    let mut out = format!("{header}\n\n");
    for item in items {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}. {} ({}) — {}",
            item.index, item.name, item.measurement_unit, item.total_amount
        );
    }
    out
}

/// File name for an export taken at `now`, stamped in time zone `tz`.
#[must_use]
pub fn file_name(prefix: &str, now: DateTime<Utc>, tz: Tz) -> String {
    format!("{prefix}_{}.txt", now.with_timezone(&tz).format("%d-%b_%H-%M"))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Builds the shopping list for a user's cart.
#[derive(Clone)]
pub struct ShoppingListService {
    membership_repo: RecipeMembershipRepository,
    recipe_repo: RecipeRepository,
    settings: AppSettings,
}

impl ShoppingListService {
    /// Create a new shopping list service.
    #[must_use]
    pub const fn new(
        membership_repo: RecipeMembershipRepository,
        recipe_repo: RecipeRepository,
        settings: AppSettings,
    ) -> Self {
        Self {
            membership_repo,
            recipe_repo,
            settings,
        }
    }

    /// Aggregated items for the user's current cart.
    pub async fn items(&self, user_id: &str) -> AppResult<Vec<ShoppingListItem>> {
        let recipe_ids = self
            .membership_repo
            .list_recipe_ids(user_id, MembershipKind::ShoppingCart)
            .await?;
        let rows = self.recipe_repo.find_ingredient_rows(&recipe_ids).await?;
        Ok(aggregate(&rows))
    }

    /// Render the user's cart as a text file.
    pub async fn export(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ShoppingListExport> {
        let items = self.items(user_id).await?;
        tracing::debug!(user_id, items = items.len(), "Exporting shopping list");

        Ok(ShoppingListExport {
            file_name: file_name(
                &self.settings.shopping_list_file_prefix,
                now,
                self.settings.tz(),
            ),
            content: render(&self.settings.shopping_list_header, &items),
        })
    }
}
