//! Recipe service: validated create/update/delete and composed read views.

use std::collections::{HashMap, HashSet};

use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    Page,
    entities::{recipe, recipe_ingredient, recipe_tag, tag, user},
    repositories::{
        FollowRepository, IngredientRepository, MembershipKind, RecipeFilter,
        RecipeMembershipRepository, RecipeRepository, TagRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::services::user::UserView;

/// Bounds on an ingredient amount.
const MIN_AMOUNT: i32 = 1;
const MAX_AMOUNT: i32 = 100_000;

/// One ingredient line of a recipe input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientAmountInput {
    /// Ingredient ID.
    pub id: String,
    /// Amount in the ingredient's measurement unit.
    pub amount: i32,
}

/// Input for creating or replacing a recipe.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecipeInput {
    #[validate(custom(function = validate_ingredients))]
    pub ingredients: Vec<IngredientAmountInput>,

    /// Tag IDs.
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,

    /// Opaque image reference.
    #[validate(length(min = 1))]
    pub image: String,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1))]
    pub text: String,

    /// Minutes.
    #[validate(range(min = 1, max = 7200))]
    pub cooking_time: i32,
}

fn validate_ingredients(ingredients: &[IngredientAmountInput]) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::new("empty")
            .with_message("A recipe needs at least one ingredient".into()));
    }

    let mut seen = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id.as_str()) {
            return Err(ValidationError::new("duplicate")
                .with_message(format!("Ingredient {} is listed twice", line.id).into()));
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&line.amount) {
            return Err(ValidationError::new("range").with_message(
                format!("Amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}").into(),
            ));
        }
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.is_empty() {
        return Err(
            ValidationError::new("empty").with_message("A recipe needs at least one tag".into())
        );
    }

    let unique: HashSet<&str> = tags.iter().map(String::as_str).collect();
    if unique.len() != tags.len() {
        return Err(ValidationError::new("duplicate").with_message("Tags must be unique".into()));
    }
    Ok(())
}

/// Filters for recipe listings.
#[derive(Debug, Clone, Default)]
pub struct RecipeListQuery {
    /// Restrict to one author.
    pub author: Option<String>,
    /// Tag slugs; a recipe matches if it carries any of them.
    pub tags: Vec<String>,
    /// Only the viewer's favorites. Ignored for anonymous viewers.
    pub is_favorited: bool,
    /// Only recipes in the viewer's cart. Ignored for anonymous viewers.
    pub is_in_shopping_cart: bool,
}

/// Compact recipe representation used by membership and subscription responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for RecipeSummary {
    fn from(recipe: recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Ingredient line of a recipe view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation as seen by a viewer.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub tags: Vec<tag::Model>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe service for business logic.
#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    ingredient_repo: IngredientRepository,
    tag_repo: TagRepository,
    user_repo: UserRepository,
    follow_repo: FollowRepository,
    membership_repo: RecipeMembershipRepository,
    id_gen: IdGenerator,
}

impl RecipeService {
    /// Create a new recipe service.
    #[must_use]
    pub const fn new(
        recipe_repo: RecipeRepository,
        ingredient_repo: IngredientRepository,
        tag_repo: TagRepository,
        user_repo: UserRepository,
        follow_repo: FollowRepository,
        membership_repo: RecipeMembershipRepository,
    ) -> Self {
        Self {
            recipe_repo,
            ingredient_repo,
            tag_repo,
            user_repo,
            follow_repo,
            membership_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a recipe authored by `author`.
    pub async fn create(&self, author: &user::Model, input: RecipeInput) -> AppResult<RecipeView> {
        input.validate()?;
        self.ensure_references(&input).await?;

        let recipe_id = self.id_gen.generate();
        let model = recipe::ActiveModel {
            id: Set(recipe_id.clone()),
            author_id: Set(author.id.clone()),
            name: Set(input.name.clone()),
            text: Set(input.text.clone()),
            cooking_time: Set(input.cooking_time),
            image: Set(input.image.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };
        let (ingredients, tags) = self.relation_rows(&recipe_id, &input);

        let recipe = self
            .recipe_repo
            .create_with_relations(model, ingredients, tags)
            .await?;
        tracing::info!(recipe_id = %recipe.id, author_id = %author.id, "Recipe created");

        self.view(Some(author), recipe).await
    }

    /// Replace a recipe's fields, ingredients and tags. Author only.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: RecipeInput,
    ) -> AppResult<RecipeView> {
        let recipe = self.get_owned(actor, id).await?;
        input.validate()?;
        self.ensure_references(&input).await?;

        let (ingredients, tags) = self.relation_rows(&recipe.id, &input);
        let mut model: recipe::ActiveModel = recipe.into();
        model.name = Set(input.name);
        model.text = Set(input.text);
        model.cooking_time = Set(input.cooking_time);
        model.image = Set(input.image);

        let recipe = self
            .recipe_repo
            .update_with_relations(model, ingredients, tags)
            .await?;

        self.view(Some(actor), recipe).await
    }

    /// Delete a recipe. Author only.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let recipe = self.get_owned(actor, id).await?;
        self.recipe_repo.delete(&recipe.id).await?;
        tracing::info!(recipe_id = %recipe.id, "Recipe deleted");
        Ok(())
    }

    /// Get a recipe as seen by `viewer`.
    pub async fn get(&self, viewer: Option<&user::Model>, id: &str) -> AppResult<RecipeView> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        self.view(viewer, recipe).await
    }

    /// List recipes, newest first.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        query: RecipeListQuery,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<RecipeView>> {
        let viewer_id = viewer.map(|v| v.id.clone());
        let filter = RecipeFilter {
            author_id: query.author,
            tag_slugs: query.tags,
            favorited_by: viewer_id.clone().filter(|_| query.is_favorited),
            in_cart_of: viewer_id.filter(|_| query.is_in_shopping_cart),
        };

        let page = self.recipe_repo.list(&filter, offset, limit).await?;
        Ok(Page {
            items: self.views(viewer, page.items).await?,
            total: page.total,
        })
    }

    async fn get_owned(&self, actor: &user::Model, id: &str) -> AppResult<recipe::Model> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        if recipe.author_id != actor.id {
            return Err(AppError::Forbidden(
                "Only the author can modify this recipe".to_string(),
            ));
        }
        Ok(recipe)
    }

    /// Check that every referenced ingredient and tag exists.
    async fn ensure_references(&self, input: &RecipeInput) -> AppResult<()> {
        let ingredient_ids: Vec<String> = input.ingredients.iter().map(|i| i.id.clone()).collect();
        let found = self.ingredient_repo.find_by_ids(&ingredient_ids).await?;
        if found.len() != ingredient_ids.len() {
            let known: HashSet<&str> = found.iter().map(|i| i.id.as_str()).collect();
            let missing = missing_ids(&ingredient_ids, &known);
            return Err(AppError::Validation(format!(
                "ingredients: unknown ingredient {missing}"
            )));
        }

        let found = self.tag_repo.find_by_ids(&input.tags).await?;
        if found.len() != input.tags.len() {
            let known: HashSet<&str> = found.iter().map(|t| t.id.as_str()).collect();
            let missing = missing_ids(&input.tags, &known);
            return Err(AppError::Validation(format!("tags: unknown tag {missing}")));
        }

        Ok(())
    }

    fn relation_rows(
        &self,
        recipe_id: &str,
        input: &RecipeInput,
    ) -> (Vec<recipe_ingredient::ActiveModel>, Vec<recipe_tag::ActiveModel>) {
        let ingredients = input
            .ingredients
            .iter()
            .map(|line| recipe_ingredient::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                ingredient_id: Set(line.id.clone()),
                amount: Set(line.amount),
            })
            .collect();
        let tags = input
            .tags
            .iter()
            .map(|tag_id| recipe_tag::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                tag_id: Set(tag_id.clone()),
            })
            .collect();
        (ingredients, tags)
    }

    async fn view(
        &self,
        viewer: Option<&user::Model>,
        recipe: recipe::Model,
    ) -> AppResult<RecipeView> {
        let id = recipe.id.clone();
        self.views(viewer, vec![recipe])
            .await?
            .pop()
            .ok_or(AppError::RecipeNotFound(id))
    }

    /// Compose views for a batch of recipes with a fixed number of queries.
    async fn views(
        &self,
        viewer: Option<&user::Model>,
        recipes: Vec<recipe::Model>,
    ) -> AppResult<Vec<RecipeView>> {
        if recipes.is_empty() {
            return Ok(vec![]);
        }

        let recipe_ids: Vec<String> = recipes.iter().map(|r| r.id.clone()).collect();
        let mut author_ids: Vec<String> = recipes.iter().map(|r| r.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let mut ingredients: HashMap<String, Vec<RecipeIngredientView>> = HashMap::new();
        for row in self.recipe_repo.find_ingredient_rows(&recipe_ids).await? {
            ingredients
                .entry(row.recipe_id)
                .or_default()
                .push(RecipeIngredientView {
                    id: row.ingredient.id,
                    name: row.ingredient.name,
                    measurement_unit: row.ingredient.measurement_unit,
                    amount: row.amount,
                });
        }

        let mut tags: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (recipe_id, tag) in self.recipe_repo.find_tag_rows(&recipe_ids).await? {
            tags.entry(recipe_id).or_default().push(tag);
        }

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let (followed, favorited, in_cart) = match viewer {
            Some(viewer) => (
                self.follow_repo
                    .followed_among(&viewer.id, &author_ids)
                    .await?,
                self.membership_repo
                    .contained_among(&viewer.id, &recipe_ids, MembershipKind::Favorite)
                    .await?,
                self.membership_repo
                    .contained_among(&viewer.id, &recipe_ids, MembershipKind::ShoppingCart)
                    .await?,
            ),
            None => Default::default(),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!(
                        "Author {} of recipe {} is missing",
                        recipe.author_id, recipe.id
                    ))
                })?;
                let is_subscribed = followed.contains(&author.id);
                Ok(RecipeView {
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    author: UserView::new(author, is_subscribed),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    id: recipe.id,
                    name: recipe.name,
                    image: recipe.image,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                })
            })
            .collect()
    }
}

fn missing_ids(requested: &[String], known: &HashSet<&str>) -> String {
    requested
        .iter()
        .filter(|id| !known.contains(id.as_str()))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
