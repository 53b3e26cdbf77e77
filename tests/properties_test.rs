//! Planner invariants over generated schemas.

use proptest::prelude::*;

use i18n_columns::config::LanguageSettings;
use i18n_columns::planner::qualify;
use i18n_columns::prelude::*;
use i18n_columns::run::plan_checked;

/// Where an attribute's data lives before migration.
#[derive(Debug, Clone, Copy)]
enum Layout {
    Unqualified,
    Suffixed,
    Both,
}

#[derive(Debug, Clone)]
struct AttrCase {
    layout: Layout,
    db_type: &'static str,
    nullable: bool,
    on_delete: Option<&'static str>,
    /// Per language position: whether that non-source column already exists.
    present: Vec<bool>,
}

#[derive(Debug, Clone)]
struct Case {
    languages: Vec<String>,
    source: usize,
    tables: Vec<Vec<AttrCase>>,
}

fn arb_attr() -> impl Strategy<Value = AttrCase> {
    (
        prop_oneof![
            Just(Layout::Unqualified),
            Just(Layout::Suffixed),
            Just(Layout::Both)
        ],
        prop::sample::select(vec!["varchar(255)", "int(11)", "text", "character varying(64)"]),
        any::<bool>(),
        prop::option::of(prop::sample::select(vec![
            "CASCADE",
            "SET NULL",
            "RESTRICT",
            "NO ACTION",
        ])),
        prop::collection::vec(any::<bool>(), 3),
    )
        .prop_map(|(layout, db_type, nullable, on_delete, present)| AttrCase {
            layout,
            db_type,
            nullable,
            on_delete,
            present,
        })
}

fn arb_case() -> impl Strategy<Value = Case> {
    (
        Just(vec!["en".to_string(), "fr".to_string(), "de".to_string()]).prop_shuffle(),
        0..3usize,
        prop::collection::vec(prop::collection::vec(arb_attr(), 1..4), 1..3),
    )
        .prop_map(|(languages, source, tables)| Case {
            languages,
            source,
            tables,
        })
}

impl Case {
    fn settings(&self) -> LanguageSettings {
        LanguageSettings {
            languages: self.languages.clone(),
            source_language: self.languages[self.source].clone(),
        }
    }

    fn build(&self) -> (SchemaSnapshot, Vec<ModelDescriptor>) {
        let src = &self.languages[self.source];
        let mut schema = SchemaSnapshot::new();
        let mut models = Vec::new();

        for (t, attrs) in self.tables.iter().enumerate() {
            let table_name = format!("t{}", t);
            let mut table = TableSchema::new(&table_name).column(ColumnInfo::new("id", "int(11)").not_null());
            let mut names = Vec::new();

            for (a, case) in attrs.iter().enumerate() {
                let attr = format!("a{}", a);
                let mut source = ColumnInfo::new(attr.clone(), case.db_type);
                source.allow_null = case.nullable;
                if let Some(rule) = case.on_delete {
                    source = source.references(
                        ForeignKeyInfo::new(format!("fk_{}_{}", table_name, attr), "dictionary", "id")
                            .on_delete(rule),
                    );
                }

                match case.layout {
                    Layout::Unqualified => table = table.column(source),
                    Layout::Suffixed => {
                        source.name = qualify(&attr, src);
                        table = table.column(source);
                    }
                    Layout::Both => {
                        table = table
                            .column(source)
                            .column(ColumnInfo::new(qualify(&attr, src), "text"));
                    }
                }

                for (i, lang) in self.languages.iter().enumerate() {
                    if i != self.source && case.present[i] {
                        table = table.column(ColumnInfo::new(qualify(&attr, lang), "text"));
                    }
                }
                names.push(attr);
            }

            schema.add_table(table);
            models.push(ModelDescriptor::new(table_name, names).unwrap());
        }
        (schema, models)
    }
}

fn plan(schema: &SchemaSnapshot, settings: &LanguageSettings, models: &[ModelDescriptor]) -> MigrationPlan {
    MigrationPlanner::new(schema, &settings.languages, &settings.source_language)
        .plan(models)
        .unwrap()
}

proptest! {
    #[test]
    fn plan_is_idempotent(case in arb_case()) {
        let settings = case.settings();
        let (mut schema, models) = case.build();

        let first = plan(&schema, &settings, &models);
        schema.apply_all(&first.up()).unwrap();
        prop_assert!(plan(&schema, &settings, &models).is_empty());
    }

    #[test]
    fn down_restores_schema(case in arb_case()) {
        let settings = case.settings();
        let (original, models) = case.build();

        let plan = plan(&original, &settings, &models);
        let mut schema = original.clone();
        schema.apply_all(&plan.up()).unwrap();
        schema.apply_all(&plan.down()).unwrap();
        prop_assert_eq!(schema, original);
    }

    #[test]
    fn checked_plan_accepts_every_layout(case in arb_case()) {
        let settings = case.settings();
        let (schema, models) = case.build();
        let checked = plan_checked(&schema, &settings, &models).unwrap();
        prop_assert_eq!(checked, plan(&schema, &settings, &models));
    }

    #[test]
    fn source_language_is_renamed_never_duplicated(case in arb_case()) {
        let settings = case.settings();
        let (original, models) = case.build();
        let plan = plan(&original, &settings, &models);

        let mut migrated = original.clone();
        migrated.apply_all(&plan.up()).unwrap();

        for step in plan.steps.iter().filter(|s| s.kind == StepKind::Rename) {
            prop_assert_eq!(&step.language, &settings.source_language);
            prop_assert!(!migrated.column_exists(&step.table, &step.attribute).unwrap());

            let before = original.column_info(&step.table, &step.attribute).unwrap();
            let after = migrated
                .column_info(&step.table, &qualify(&step.attribute, &step.language))
                .unwrap();
            prop_assert_eq!(before.db_type, after.db_type);
            prop_assert_eq!(before.allow_null, after.allow_null);
            prop_assert_eq!(before.foreign_key, after.foreign_key);
        }
    }

    #[test]
    fn source_language_column_untouched_by_other_languages(case in arb_case()) {
        let settings = case.settings();
        let (original, models) = case.build();
        let plan = plan(&original, &settings, &models);

        let mut migrated = original.clone();
        migrated.apply_all(&plan.up()).unwrap();

        for model in &models {
            for attr in model.attributes() {
                let column = qualify(attr, &settings.source_language);
                if original.column_exists(model.table(), &column).unwrap() {
                    prop_assert_eq!(
                        original.column_info(model.table(), &column).unwrap(),
                        migrated.column_info(model.table(), &column).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn foreign_keys_follow_new_columns(case in arb_case()) {
        let settings = case.settings();
        let (original, models) = case.build();
        let plan = plan(&original, &settings, &models);

        let mut migrated = original.clone();
        migrated.apply_all(&plan.up()).unwrap();

        for step in plan.steps.iter().filter(|s| s.kind == StepKind::Add) {
            let source_fk = original
                .outgoing_foreign_key(&step.table, &step.source_column)
                .unwrap();
            let new_fk = migrated
                .outgoing_foreign_key(&step.table, &qualify(&step.attribute, &step.language))
                .unwrap();

            match (source_fk, new_fk) {
                (None, None) => {}
                (Some(source), Some(added)) => {
                    prop_assert_eq!(&source.referenced_table, &added.referenced_table);
                    prop_assert_eq!(&source.referenced_column, &added.referenced_column);
                    prop_assert_eq!(&source.on_delete, &added.on_delete);
                    prop_assert_ne!(&source.constraint_name, &added.constraint_name);
                }
                (source, added) => {
                    prop_assert!(false, "foreign key mismatch: {:?} vs {:?}", source, added);
                }
            }
        }
    }

    #[test]
    fn planning_is_deterministic(case in arb_case()) {
        let settings = case.settings();
        let (schema, models) = case.build();
        prop_assert_eq!(plan(&schema, &settings, &models), plan(&schema, &settings, &models));
    }
}
