//! Repository layer.

mod follow;
mod ingredient;
mod recipe;
mod recipe_membership;
mod tag;
mod user;

pub use follow::FollowRepository;
pub use ingredient::IngredientRepository;
pub use recipe::{IngredientRow, RecipeFilter, RecipeRepository};
pub use recipe_membership::{MembershipKind, RecipeMembershipRepository};
pub use tag::TagRepository;
pub use user::UserRepository;

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};

/// Case-insensitive `LIKE` on `column`; `pattern` must already be lowercase.
fn lower_like(column: impl IntoColumnRef, pattern: String) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// Lowercase `term` with `LIKE` wildcards escaped.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pattern matching values that start with `prefix`.
fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

/// Pattern matching values that contain `term`.
fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}
