use super::test_util::{create_user, prepare_db_and_test};
use crate::domain::DrivenPortError;
use crate::domain::category::driven_ports::{CategoryReader, CategoryWriter, DetectCategory};
use crate::domain::category::driving_ports::{CategoryError, CategoryPort};
use crate::domain::category::{CategoryService, NewCategory, UpdateCategory};
use crate::domain::task::driven_ports::TaskWriter;
use crate::domain::task::NewTask;
use crate::persistence::ExternalConnectivity;
use crate::persistence::db_category_driven_ports::{
    DbDetectCategory, DbReadCategories, DbWriteCategories,
};
use crate::persistence::db_task_driven_ports::DbWriteTasks;
use speculoos::prelude::*;
use std::time::Duration;

fn named(name: &str) -> NewCategory {
    NewCategory {
        name: name.to_owned(),
    }
}

#[test]
fn names_are_unique_per_user() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let john = create_user(&mut ext_cxn, "john@example.com").await;

        DbWriteCategories
            .create_category(jane, &named("Work"), &mut ext_cxn)
            .await
            .expect("first category should be created");
        let johns_category = DbWriteCategories
            .create_category(john, &named("Work"), &mut ext_cxn)
            .await;
        assert_that!(johns_category).is_ok();

        let duplicate = DbWriteCategories
            .create_category(jane, &named("Work"), &mut ext_cxn)
            .await;
        let Err(DrivenPortError::Conflict) = duplicate else {
            panic!("Expected a conflict, got {duplicate:?}");
        };

        let service_duplicate = CategoryService
            .create_category(
                jane,
                &named("Work"),
                &mut ext_cxn,
                &DbWriteCategories,
                &DbDetectCategory,
            )
            .await;
        let Err(CategoryError::NameTaken) = service_duplicate else {
            panic!("Expected the service to report the name as taken");
        };
    });
}

#[test]
fn renaming_onto_a_taken_name_is_a_conflict() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;

        DbWriteCategories
            .create_category(jane, &named("Work"), &mut ext_cxn)
            .await
            .expect("category should be created");
        let home = DbWriteCategories
            .create_category(jane, &named("Home"), &mut ext_cxn)
            .await
            .expect("category should be created");

        let rename = DbWriteCategories
            .update_category(
                jane,
                home.id,
                &UpdateCategory {
                    name: Some("Work".to_owned()),
                },
                &mut ext_cxn,
            )
            .await;
        let Err(DrivenPortError::Conflict) = rename else {
            panic!("Expected a conflict, got {rename:?}");
        };
    });
}

#[test]
fn listing_is_newest_first_with_task_counts() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let john = create_user(&mut ext_cxn, "john@example.com").await;

        let work = DbWriteCategories
            .create_category(jane, &named("Work"), &mut ext_cxn)
            .await
            .expect("category should be created");
        tokio::time::sleep(Duration::from_millis(10)).await;
        let home = DbWriteCategories
            .create_category(jane, &named("Home"), &mut ext_cxn)
            .await
            .expect("category should be created");
        DbWriteCategories
            .create_category(john, &named("Johns"), &mut ext_cxn)
            .await
            .expect("category should be created");

        for title in ["Report", "Slides"] {
            DbWriteTasks
                .create_task_for_user(
                    jane,
                    &NewTask {
                        title: title.to_owned(),
                        category_id: Some(work.id),
                        ..Default::default()
                    },
                    &mut ext_cxn,
                )
                .await
                .expect("task should be created");
        }

        let categories = DbReadCategories
            .categories_for_user(jane, &mut ext_cxn)
            .await
            .expect("listing should succeed");
        let listed: Vec<_> = categories
            .iter()
            .map(|counted| (counted.category.id, counted.task_count))
            .collect();
        assert_eq!(vec![(home.id, 0), (work.id, 2)], listed);

        let foreign_lookup = DbReadCategories
            .user_category_by_id(john, work.id, &mut ext_cxn)
            .await
            .expect("lookup should succeed");
        assert!(foreign_lookup.is_none());
        let owns_foreign = DbDetectCategory
            .user_owns_category(john, work.id, &mut ext_cxn)
            .await
            .expect("ownership check should succeed");
        assert!(!owns_foreign);
    });
}

#[test]
fn only_the_owner_can_delete() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let john = create_user(&mut ext_cxn, "john@example.com").await;
        let work = DbWriteCategories
            .create_category(jane, &named("Work"), &mut ext_cxn)
            .await
            .expect("category should be created");

        let johns_delete = DbWriteCategories
            .delete_category(john, work.id, &mut ext_cxn)
            .await;
        assert_that!(johns_delete).is_ok_containing(false);

        let janes_delete = DbWriteCategories
            .delete_category(jane, work.id, &mut ext_cxn)
            .await;
        assert_that!(janes_delete).is_ok_containing(true);
    });
}
