//! Recipe repository.

use std::sync::Arc;

use crate::{
    Page,
    entities::{
        Favorite, Ingredient, Recipe, RecipeIngredient, RecipeTag, ShoppingCart, Tag, favorite,
        ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag,
    },
};
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, TransactionTrait,
};

/// Filters applied to recipe listings. Empty fields do not restrict.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Only recipes by this author.
    pub author_id: Option<String>,
    /// Only recipes carrying at least one of these tag slugs.
    pub tag_slugs: Vec<String>,
    /// Only recipes this user has favorited.
    pub favorited_by: Option<String>,
    /// Only recipes in this user's shopping cart.
    pub in_cart_of: Option<String>,
}

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    /// Recipe the line belongs to.
    pub recipe_id: String,
    /// The ingredient.
    pub ingredient: ingredient::Model,
    /// Amount in the ingredient's measurement unit.
    pub amount: i32,
}

/// Recipe repository for database operations.
#[derive(Clone)]
pub struct RecipeRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeRepository {
    /// Create a new recipe repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a recipe by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<recipe::Model>> {
        Recipe::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<recipe::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// Insert a recipe together with its ingredient and tag rows.
    pub async fn create_with_relations(
        &self,
        model: recipe::ActiveModel,
        ingredients: Vec<recipe_ingredient::ActiveModel>,
        tags: Vec<recipe_tag::ActiveModel>,
    ) -> AppResult<recipe::Model> {
        let txn = self.begin().await?;

        let recipe = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_relations(&txn, ingredients, tags).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(recipe)
    }

    /// Update a recipe and replace its ingredient and tag rows.
    pub async fn update_with_relations(
        &self,
        model: recipe::ActiveModel,
        ingredients: Vec<recipe_ingredient::ActiveModel>,
        tags: Vec<recipe_tag::ActiveModel>,
    ) -> AppResult<recipe::Model> {
        let txn = self.begin().await?;

        let recipe = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeIngredient::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        RecipeTag::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_relations(&txn, ingredients, tags).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(recipe)
    }

    /// Delete a recipe. Join rows and memberships cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Recipe::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List recipes matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<recipe::Model>> {
        let query = apply_filter(Recipe::find(), filter);

        let total = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = query
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_asc(recipe::Column::Name)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page { items, total })
    }

    /// Recipes by an author, newest first, optionally truncated.
    pub async fn find_by_author(
        &self,
        author_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<recipe::Model>> {
        let mut query = Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .order_by_desc(recipe::Column::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes by an author.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find recipes by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<recipe::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Recipe::find()
            .filter(recipe::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ingredient lines of the given recipes, joined with their ingredient.
    pub async fn find_ingredient_rows(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<IngredientRow>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(Ingredient)
            .order_by_asc(recipe_ingredient::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(line, ingredient)| {
                ingredient.map(|ingredient| IngredientRow {
                    recipe_id: line.recipe_id,
                    ingredient,
                    amount: line.amount,
                })
            })
            .collect())
    }

    /// Tags of the given recipes as `(recipe_id, tag)` pairs.
    pub async fn find_tag_rows(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<(String, tag::Model)>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = RecipeTag::find()
            .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, tag)| tag.map(|tag| (link.recipe_id, tag)))
            .collect())
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

async fn insert_relations(
    txn: &DatabaseTransaction,
    ingredients: Vec<recipe_ingredient::ActiveModel>,
    tags: Vec<recipe_tag::ActiveModel>,
) -> AppResult<()> {
    if !ingredients.is_empty() {
        RecipeIngredient::insert_many(ingredients)
            .exec_without_returning(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }
    if !tags.is_empty() {
        RecipeTag::insert_many(tags)
            .exec_without_returning(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }
    Ok(())
}

fn apply_filter(mut query: Select<Recipe>, filter: &RecipeFilter) -> Select<Recipe> {
    if let Some(author_id) = &filter.author_id {
        query = query.filter(recipe::Column::AuthorId.eq(author_id.as_str()));
    }

    if !filter.tag_slugs.is_empty() {
        let tagged = RecipeTag::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .inner_join(Tag)
            .filter(tag::Column::Slug.is_in(filter.tag_slugs.clone()))
            .into_query();
        query = query.filter(recipe::Column::Id.in_subquery(tagged));
    }

    if let Some(user_id) = &filter.favorited_by {
        let favorited = Favorite::find()
            .select_only()
            .column(favorite::Column::RecipeId)
            .filter(favorite::Column::UserId.eq(user_id.as_str()))
            .into_query();
        query = query.filter(recipe::Column::Id.in_subquery(favorited));
    }

    if let Some(user_id) = &filter.in_cart_of {
        let in_cart = ShoppingCart::find()
            .select_only()
            .column(shopping_cart::Column::RecipeId)
            .filter(shopping_cart::Column::UserId.eq(user_id.as_str()))
            .into_query();
        query = query.filter(recipe::Column::Id.in_subquery(in_cart));
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Set};

    fn create_test_recipe(id: &str, author_id: &str, name: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: name.to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            image: "recipes/images/pie.png".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_ingredient(id: &str, name: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: name.to_string(),
            measurement_unit: "g".to_string(),
        }
    }

    fn line(
        id: &str,
        recipe_id: &str,
        ingredient_id: &str,
        amount: i32,
    ) -> recipe_ingredient::Model {
        recipe_ingredient::Model {
            id: id.to_string(),
            recipe_id: recipe_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            amount,
        }
    }

    fn active(recipe: &recipe::Model) -> recipe::ActiveModel {
        recipe::ActiveModel {
            id: Set(recipe.id.clone()),
            author_id: Set(recipe.author_id.clone()),
            name: Set(recipe.name.clone()),
            text: Set(recipe.text.clone()),
            cooking_time: Set(recipe.cooking_time),
            image: Set(recipe.image.clone()),
            created_at: Set(recipe.created_at),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe::Model>::new()])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let result = repo.get_by_id("r404").await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(id)) if id == "r404"));
    }

    #[tokio::test]
    async fn test_create_with_relations_commits() {
        let recipe = create_test_recipe("r1", "u1", "Pie");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let ingredients = vec![
            recipe_ingredient::ActiveModel {
                id: Set("ri1".to_string()),
                recipe_id: Set("r1".to_string()),
                ingredient_id: Set("i1".to_string()),
                amount: Set(200),
            },
            recipe_ingredient::ActiveModel {
                id: Set("ri2".to_string()),
                recipe_id: Set("r1".to_string()),
                ingredient_id: Set("i2".to_string()),
                amount: Set(5),
            },
        ];
        let tags = vec![recipe_tag::ActiveModel {
            id: Set("rt1".to_string()),
            recipe_id: Set("r1".to_string()),
            tag_id: Set("t1".to_string()),
        }];

        let created = repo
            .create_with_relations(active(&recipe), ingredients, tags)
            .await
            .unwrap();

        assert_eq!(created.id, "r1");
        assert_eq!(created.name, "Pie");
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn replacement_rows() -> (
        Vec<recipe_ingredient::ActiveModel>,
        Vec<recipe_tag::ActiveModel>,
    ) {
        let ingredients = vec![recipe_ingredient::ActiveModel {
            id: Set("ri9".to_string()),
            recipe_id: Set("r1".to_string()),
            ingredient_id: Set("i9".to_string()),
            amount: Set(50),
        }];
        let tags = vec![recipe_tag::ActiveModel {
            id: Set("rt9".to_string()),
            recipe_id: Set("r1".to_string()),
            tag_id: Set("t9".to_string()),
        }];
        (ingredients, tags)
    }

    /// Assert that every marker appears in `log`, each after the previous one.
    fn assert_in_order(log: &str, markers: &[&str]) {
        let mut from = 0;
        for marker in markers {
            let at = log[from..]
                .find(marker)
                .unwrap_or_else(|| panic!("{marker} missing after offset {from} in {log}"));
            from += at + marker.len();
        }
    }

    #[tokio::test]
    async fn test_update_with_relations_replaces_joins_in_one_transaction() {
        let recipe = create_test_recipe("r1", "u1", "Pie");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([exec(2), exec(1), exec(1), exec(1)])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db.clone());
        let (ingredients, tags) = replacement_rows();
        let updated = repo
            .update_with_relations(active(&recipe), ingredients, tags)
            .await
            .unwrap();
        assert_eq!(updated.id, "r1");
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        assert_in_order(
            &format!("{log:?}"),
            &[
                "BEGIN",
                r#"UPDATE \"recipe\""#,
                r#"DELETE FROM \"recipe_ingredient\""#,
                r#"DELETE FROM \"recipe_tag\""#,
                r#"INSERT INTO \"recipe_ingredient\""#,
                r#"INSERT INTO \"recipe_tag\""#,
                "COMMIT",
            ],
        );
    }

    #[tokio::test]
    async fn test_update_with_relations_rolls_back_on_insert_failure() {
        let recipe = create_test_recipe("r1", "u1", "Pie");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([exec(2), exec(1), exec(1)])
                .append_exec_errors([DbErr::Custom("tag insert failed".to_string())])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db.clone());
        let (ingredients, tags) = replacement_rows();
        let result = repo
            .update_with_relations(active(&recipe), ingredients, tags)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Database(msg)) if msg.contains("tag insert failed")
        ));
        drop(repo);

        let log = format!("{:?}", Arc::try_unwrap(db).unwrap().into_transaction_log());
        assert_in_order(&log, &[r#"INSERT INTO \"recipe_tag\""#, "ROLLBACK"]);
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_list_applies_page() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .append_query_results([[
                    create_test_recipe("r2", "u1", "Soup"),
                    create_test_recipe("r1", "u1", "Pie"),
                ]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let filter = RecipeFilter {
            author_id: Some("u1".to_string()),
            tag_slugs: vec!["lunch".to_string()],
            ..RecipeFilter::default()
        };
        let page = repo.list(&filter, 0, 2).await.unwrap();

        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "r2");
    }

    #[test]
    fn test_apply_filter_builds_subqueries() {
        let filter = RecipeFilter {
            author_id: None,
            tag_slugs: vec!["breakfast".to_string()],
            favorited_by: Some("u1".to_string()),
            in_cart_of: Some("u1".to_string()),
        };

        let sql = apply_filter(Recipe::find(), &filter)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"INNER JOIN "tag""#));
        assert!(sql.contains(r#"FROM "favorite""#));
        assert!(sql.contains(r#"FROM "shopping_cart_recipe""#));
        assert!(!sql.contains(r#""recipe"."author_id" ="#));
    }

    #[tokio::test]
    async fn test_find_ingredient_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    (line("ri1", "r1", "i1", 5), create_test_ingredient("i1", "Salt")),
                    (line("ri2", "r2", "i1", 3), create_test_ingredient("i1", "Salt")),
                ]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let rows = repo
            .find_ingredient_rows(&["r1".to_string(), "r2".to_string()])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].recipe_id, "r1");
        assert_eq!(rows[0].ingredient.name, "Salt");
        assert_eq!(rows[1].amount, 3);
    }

    #[tokio::test]
    async fn test_find_ingredient_rows_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = RecipeRepository::new(db);
        let rows = repo.find_ingredient_rows(&[]).await.unwrap();

        assert!(rows.is_empty());
    }
}
