//! Create favorite and shopping cart tables migration.
//!
//! Both tables share one layout: a `(user_id, recipe_id)` pair that is
//! unique per table, cascading on deletion of either side.

use sea_orm_migration::prelude::*;

const MEMBERSHIP_TABLES: [&str; 2] = ["favorite", "shopping_cart_recipe"];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in MEMBERSHIP_TABLES {
            create_membership_table(manager, table).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in MEMBERSHIP_TABLES {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

async fn create_membership_table(manager: &SchemaManager<'_>, table: &str) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Alias::new(table))
                .if_not_exists()
                .col(
                    ColumnDef::new(Membership::Id)
                        .string_len(32)
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Membership::UserId).string_len(32).not_null())
                .col(ColumnDef::new(Membership::RecipeId).string_len(32).not_null())
                .col(
                    ColumnDef::new(Membership::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_user"))
                        .from(Alias::new(table), Membership::UserId)
                        .to(User::Table, User::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_recipe"))
                        .from(Alias::new(table), Membership::RecipeId)
                        .to(Recipe::Table, Recipe::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await?;

    // Unique index: (user_id, recipe_id) - at most one entry per pair
    manager
        .create_index(
            Index::create()
                .name(format!("idx_{table}_user_recipe"))
                .table(Alias::new(table))
                .col(Membership::UserId)
                .col(Membership::RecipeId)
                .unique()
                .to_owned(),
        )
        .await?;

    // Index: recipe_id (for cascades and per-recipe counts)
    manager
        .create_index(
            Index::create()
                .name(format!("idx_{table}_recipe_id"))
                .table(Alias::new(table))
                .col(Membership::RecipeId)
                .to_owned(),
        )
        .await
}

#[derive(Iden)]
enum Membership {
    Id,
    UserId,
    RecipeId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Recipe {
    Table,
    Id,
}
