//! Business logic services.

pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod recipe_membership;
pub mod shopping_list;
pub mod tag;
pub mod user;

pub use follow::{FollowService, SubscriptionView};
pub use ingredient::IngredientService;
pub use recipe::{
    IngredientAmountInput, RecipeIngredientView, RecipeInput, RecipeListQuery, RecipeService,
    RecipeSummary, RecipeView,
};
pub use recipe_membership::RecipeMembershipService;
pub use shopping_list::{ShoppingListExport, ShoppingListItem, ShoppingListService};
pub use tag::TagService;
pub use user::{LoginInput, RegisterInput, SetPasswordInput, UserService, UserView};
