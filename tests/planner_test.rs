//! End-to-end planning scenarios against in-memory schemas.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use i18n_columns::config::LanguageSettings;
use i18n_columns::prelude::*;
use i18n_columns::run::plan_checked;

fn settings() -> LanguageSettings {
    LanguageSettings {
        languages: vec!["en".into(), "fr".into()],
        source_language: "en".into(),
    }
}

fn post(title: ColumnInfo) -> SchemaSnapshot {
    SchemaSnapshot::new().with_table(
        TableSchema::new("post")
            .column(ColumnInfo::new("id", "int(11)").not_null())
            .column(title),
    )
}

fn post_model() -> Vec<ModelDescriptor> {
    vec![ModelDescriptor::new("post", ["title"]).unwrap()]
}

fn plan(schema: &SchemaSnapshot) -> MigrationPlan {
    let s = settings();
    MigrationPlanner::new(schema, &s.languages, &s.source_language)
        .plan(&post_model())
        .unwrap()
}

#[test]
fn test_plain_column_rename_and_add() {
    let mut schema = post(ColumnInfo::new("title", "varchar(255)").not_null());
    let plan = plan(&schema);

    assert_eq!(
        plan.up(),
        vec![
            Operation::RenameColumn {
                table: "post".into(),
                from: "title".into(),
                to: "title_en".into(),
            },
            Operation::AddColumn {
                table: "post".into(),
                name: "title_fr".into(),
                db_type: "varchar(255)".into(),
                nullable: false,
            },
        ]
    );

    schema.apply_all(&plan.up()).unwrap();
    assert!(self::plan(&schema).is_empty());
}

#[test]
fn test_foreign_key_scenario() {
    let fk = ForeignKeyInfo::new("fk_title", "dictionary", "id").on_delete("CASCADE");
    let schema = post(ColumnInfo::new("title", "int(11)").references(fk));
    let plan = plan(&schema);

    let add_fk = |name: &str, column: &str| Operation::AddForeignKey {
        constraint_name: name.into(),
        table: "post".into(),
        column: column.into(),
        ref_table: "dictionary".into(),
        ref_column: "id".into(),
        on_delete: "CASCADE".into(),
        on_update: "RESTRICT".into(),
    };
    let drop_fk = Operation::DropForeignKey {
        constraint_name: "fk_title".into(),
        table: "post".into(),
    };

    assert_eq!(
        plan.up(),
        vec![
            drop_fk.clone(),
            Operation::RenameColumn {
                table: "post".into(),
                from: "title".into(),
                to: "title_en".into(),
            },
            add_fk("fk_title", "title_en"),
            Operation::AddColumn {
                table: "post".into(),
                name: "title_fr".into(),
                db_type: "int(11)".into(),
                nullable: true,
            },
            add_fk("fk_title_fr", "title_fr"),
        ]
    );
    assert_eq!(
        plan.down(),
        vec![
            Operation::DropColumn {
                table: "post".into(),
                name: "title_fr".into(),
            },
            drop_fk,
            Operation::RenameColumn {
                table: "post".into(),
                from: "title_en".into(),
                to: "title".into(),
            },
            add_fk("fk_title", "title"),
        ]
    );
}

#[test]
fn test_checked_plan_round_trips() {
    let fk = ForeignKeyInfo::new("fk_title", "dictionary", "id").on_delete("CASCADE");
    let schema = post(ColumnInfo::new("title", "int(11)").references(fk));

    let plan = plan_checked(&schema, &settings(), &post_model()).unwrap();
    assert_eq!(plan.steps.len(), 2);

    let mut roundtrip = schema.clone();
    roundtrip.apply_all(&plan.up()).unwrap();
    roundtrip.apply_all(&plan.down()).unwrap();
    assert_eq!(roundtrip, schema);
}

#[test]
fn test_no_translatable_attributes() {
    let schema = post(ColumnInfo::new("title", "text"));
    let s = settings();
    let models = vec![ModelDescriptor::new("post", Vec::<String>::new()).unwrap()];

    let plan = MigrationPlanner::new(&schema, &s.languages, &s.source_language)
        .plan(&models)
        .unwrap();
    assert!(plan.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let err = MigrationEmitter::new(dir.path(), Dialect::MySql)
        .emit(&plan.up(), &plan.down())
        .unwrap_err();
    assert!(err.is_up_to_date());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_unreachable_table_aborts() {
    let schema = SchemaSnapshot::new();
    let s = settings();
    let err = MigrationPlanner::new(&schema, &s.languages, &s.source_language)
        .plan(&post_model())
        .unwrap_err();
    assert!(matches!(err, Error::SchemaUnavailable { ref table, .. } if table == "post"));
}

#[test]
fn test_written_script() {
    let schema = post(ColumnInfo::new("title", "varchar(255)").not_null());
    let plan = plan(&schema);
    let dir = tempfile::tempdir().unwrap();
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let artifact = MigrationEmitter::new(dir.path(), Dialect::MySql)
        .emit_at(&plan.up(), &plan.down(), at)
        .unwrap();

    assert_eq!(artifact.name, "m260102_030405_i18n");
    let text = std::fs::read_to_string(dir.path().join("m260102_030405_i18n.sql")).unwrap();
    assert_eq!(
        text,
        "-- Migration: m260102_030405_i18n
-- Generated: 2026-01-02T03:04:05+00:00

-- migrate:up
ALTER TABLE `post` RENAME COLUMN `title` TO `title_en`;
ALTER TABLE `post` ADD COLUMN `title_fr` varchar(255) NOT NULL;

-- migrate:down
ALTER TABLE `post` DROP COLUMN `title_fr`;
ALTER TABLE `post` RENAME COLUMN `title_en` TO `title`;
"
    );
}
