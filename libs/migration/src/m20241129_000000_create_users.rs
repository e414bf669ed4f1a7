use sea_orm_migration::{prelude::*, schema::*};

/// Name of the case-insensitive unique index on `users.email`.
///
/// The account repository matches unique violations against this name.
pub const USERS_EMAIL_KEY: &str = "users_email_key";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id).default(Expr::cust("gen_random_uuid()")))
                    .col(text(Users::Email))
                    .col(text(Users::DisplayName))
                    .col(text(Users::PasswordHash))
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        // Case-insensitive uniqueness
        db.execute_unprepared(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {USERS_EMAIL_KEY} ON users (lower(email))"
        ))
        .await?;

        db.execute_unprepared(
            r#"
            ALTER TABLE users
                ADD CONSTRAINT users_email_present CHECK (email <> ''),
                ADD CONSTRAINT users_display_name_present CHECK (btrim(display_name) <> ''),
                ADD CONSTRAINT users_password_hash_present CHECK (password_hash <> '')
            "#,
        )
        .await?;

        db.execute_unprepared(
            r#"
            CREATE TRIGGER users_touch_updated_at
                BEFORE UPDATE ON users
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_updated_at()
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS users_touch_updated_at ON users")
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}
