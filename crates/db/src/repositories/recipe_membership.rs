//! Favorite and shopping cart membership repository.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    entities::{Favorite, ShoppingCart, favorite, shopping_cart},
    map_write_err,
};
use chrono::Utc;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, prelude::DateTimeWithTimeZone,
};

/// Which per-user recipe collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    /// Favorited recipes.
    Favorite,
    /// Recipes in the shopping cart.
    ShoppingCart,
}

impl MembershipKind {
    /// Human-readable collection name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }

    fn already_added(self) -> AppError {
        AppError::AlreadyExists(format!("Recipe is already in {}", self.label()))
    }

    fn not_present(self) -> AppError {
        AppError::NotFound(format!("Recipe is not in {}", self.label()))
    }
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Repository for the favorite and shopping cart tables.
#[derive(Clone)]
pub struct RecipeMembershipRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeMembershipRepository {
    /// Create a new membership repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Add a recipe to a user's collection.
    ///
    /// Fails with `AlreadyExists` if the pair is present, including when a
    /// concurrent insert wins the unique index.
    pub async fn add(
        &self,
        id: String,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if find_pair(&txn, user_id, recipe_id, kind).await? {
            return Err(kind.already_added());
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let inserted = match kind {
            MembershipKind::Favorite => {
                Favorite::insert(favorite::ActiveModel {
                    id: Set(id),
                    user_id: Set(user_id.to_string()),
                    recipe_id: Set(recipe_id.to_string()),
                    created_at: Set(now),
                })
                .exec_without_returning(&txn)
                .await
            }
            MembershipKind::ShoppingCart => {
                ShoppingCart::insert(shopping_cart::ActiveModel {
                    id: Set(id),
                    user_id: Set(user_id.to_string()),
                    recipe_id: Set(recipe_id.to_string()),
                    created_at: Set(now),
                })
                .exec_without_returning(&txn)
                .await
            }
        };
        inserted.map_err(|e| map_write_err(e, || kind.already_added()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a recipe from a user's collection in a single statement.
    pub async fn remove(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<()> {
        let deleted = match kind {
            MembershipKind::Favorite => {
                Favorite::delete_many()
                    .filter(favorite::Column::UserId.eq(user_id))
                    .filter(favorite::Column::RecipeId.eq(recipe_id))
                    .exec(self.db.as_ref())
                    .await
            }
            MembershipKind::ShoppingCart => {
                ShoppingCart::delete_many()
                    .filter(shopping_cart::Column::UserId.eq(user_id))
                    .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                    .exec(self.db.as_ref())
                    .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        if deleted.rows_affected == 0 {
            return Err(kind.not_present());
        }
        Ok(())
    }

    /// Check whether a recipe is in a user's collection.
    pub async fn contains(
        &self,
        user_id: &str,
        recipe_id: &str,
        kind: MembershipKind,
    ) -> AppResult<bool> {
        find_pair(self.db.as_ref(), user_id, recipe_id, kind).await
    }

    /// The subset of `recipe_ids` present in a user's collection.
    pub async fn contained_among(
        &self,
        user_id: &str,
        recipe_ids: &[String],
        kind: MembershipKind,
    ) -> AppResult<HashSet<String>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<String> = match kind {
            MembershipKind::Favorite => Favorite::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
            MembershipKind::ShoppingCart => ShoppingCart::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.into_iter().collect())
    }

    /// Recipe IDs in a user's collection, newest first.
    pub async fn list_recipe_ids(
        &self,
        user_id: &str,
        kind: MembershipKind,
    ) -> AppResult<Vec<String>> {
        match kind {
            MembershipKind::Favorite => Favorite::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .order_by_desc(favorite::Column::CreatedAt)
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
            MembershipKind::ShoppingCart => ShoppingCart::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .order_by_desc(shopping_cart::Column::CreatedAt)
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
        }
        .map_err(|e| AppError::Database(e.to_string()))
    }
}

async fn find_pair<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    recipe_id: &str,
    kind: MembershipKind,
) -> AppResult<bool> {
    let found = match kind {
        MembershipKind::Favorite => Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .one(conn)
            .await
            .map(|row| row.is_some()),
        MembershipKind::ShoppingCart => ShoppingCart::find()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
            .one(conn)
            .await
            .map(|row| row.is_some()),
    };
    found.map_err(|e| AppError::Database(e.to_string()))
}
