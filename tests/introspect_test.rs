//! Live introspection against PostgreSQL.
//!
//! Runs only when `I18N_COLUMNS_TEST_POSTGRES_URL` points at a scratch database.

use pretty_assertions::assert_eq;

use i18n_columns::introspect::introspect;
use i18n_columns::prelude::*;

const SETUP: &[&str] = &[
    "DROP TABLE IF EXISTS i18n_t_post, i18n_t_page, i18n_t_dictionary, i18n_t_glossary",
    "CREATE TABLE i18n_t_dictionary (id integer PRIMARY KEY)",
    "CREATE TABLE i18n_t_glossary (code integer PRIMARY KEY)",
    "CREATE TABLE i18n_t_post (
        id integer PRIMARY KEY,
        title integer,
        CONSTRAINT fk_title FOREIGN KEY (title) REFERENCES i18n_t_dictionary (id) ON DELETE CASCADE
    )",
    "CREATE TABLE i18n_t_page (
        id integer PRIMARY KEY,
        title integer NOT NULL,
        CONSTRAINT fk_title FOREIGN KEY (title) REFERENCES i18n_t_glossary (code) ON UPDATE SET NULL
    )",
];

const TEARDOWN: &str =
    "DROP TABLE IF EXISTS i18n_t_post, i18n_t_page, i18n_t_dictionary, i18n_t_glossary";

#[tokio::test]
async fn test_same_constraint_name_on_two_tables() {
    let Ok(url) = std::env::var("I18N_COLUMNS_TEST_POSTGRES_URL") else {
        return;
    };

    let pool = sqlx::PgPool::connect(&url).await.unwrap();
    for statement in SETUP {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    let snapshot = introspect(&url, &["i18n_t_post", "i18n_t_page"]).await;
    sqlx::query(TEARDOWN).execute(&pool).await.unwrap();
    pool.close().await;
    let snapshot = snapshot.unwrap();

    let post = snapshot
        .outgoing_foreign_key("i18n_t_post", "title")
        .unwrap()
        .unwrap();
    assert_eq!(
        post,
        ForeignKeyInfo::new("fk_title", "i18n_t_dictionary", "id")
            .on_delete("CASCADE")
            .on_update("NO ACTION")
    );

    let page = snapshot
        .outgoing_foreign_key("i18n_t_page", "title")
        .unwrap()
        .unwrap();
    assert_eq!(
        page,
        ForeignKeyInfo::new("fk_title", "i18n_t_glossary", "code")
            .on_delete("NO ACTION")
            .on_update("SET NULL")
    );
    assert!(!snapshot.column_info("i18n_t_page", "title").unwrap().allow_null);
}
