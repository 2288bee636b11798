use super::test_util::{create_user, prepare_db_and_test};
use crate::domain::category::NewCategory;
use crate::domain::category::driven_ports::CategoryWriter;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::domain::task::{
    CompletionFilter, NewTask, PageRequest, TaskFilter, TaskService, UpdateTask, parse_deadline,
};
use crate::persistence::ExternalConnectivity;
use crate::persistence::db_category_driven_ports::{DbDetectCategory, DbWriteCategories};
use crate::persistence::db_task_driven_ports::{DbReadTasks, DbWriteTasks};
use speculoos::prelude::*;
use std::time::Duration;
use uuid::Uuid;

async fn insert_task(
    ext_cxn: &mut ExternalConnectivity,
    user_id: Uuid,
    new_task: NewTask,
) -> Uuid {
    let task_id = DbWriteTasks
        .create_task_for_user(user_id, &new_task, ext_cxn)
        .await
        .expect("task should be created");
    // Keeps creation timestamps distinct so newest-first ordering is deterministic
    tokio::time::sleep(Duration::from_millis(5)).await;
    task_id
}

async fn listed_ids(
    ext_cxn: &mut ExternalConnectivity,
    user_id: Uuid,
    filter: TaskFilter,
) -> Vec<Uuid> {
    DbReadTasks
        .tasks_matching(user_id, &filter, &PageRequest::default(), ext_cxn)
        .await
        .expect("listing should succeed")
        .into_iter()
        .map(|task| task.id)
        .collect()
}

fn titled(title: &str) -> NewTask {
    NewTask {
        title: title.to_owned(),
        ..Default::default()
    }
}

#[test]
fn starred_tasks_come_first_then_newest() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;

        let task_a = insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                is_starred: true,
                ..titled("A")
            },
        )
        .await;
        let task_b = insert_task(&mut ext_cxn, jane, titled("B")).await;
        let task_c = insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                is_starred: true,
                ..titled("C")
            },
        )
        .await;

        let task_page = TaskService
            .tasks_for_user(
                jane,
                &TaskFilter::default(),
                &PageRequest::default(),
                &mut ext_cxn,
                &DbReadTasks,
            )
            .await
            .expect("listing should succeed");
        let ordered_ids: Vec<Uuid> = task_page.tasks.iter().map(|task| task.id).collect();
        assert_eq!(vec![task_c, task_a, task_b], ordered_ids);
    });
}

#[test]
fn pages_through_matching_tasks() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let john = create_user(&mut ext_cxn, "john@example.com").await;
        for index in 0..15 {
            DbWriteTasks
                .create_task_for_user(jane, &titled(&format!("Task {index}")), &mut ext_cxn)
                .await
                .expect("task should be created");
        }
        insert_task(&mut ext_cxn, john, titled("Someone else's")).await;

        let first_page = TaskService
            .tasks_for_user(
                jane,
                &TaskFilter::default(),
                &PageRequest { page: 1, limit: 10 },
                &mut ext_cxn,
                &DbReadTasks,
            )
            .await
            .expect("listing should succeed");
        let second_page = TaskService
            .tasks_for_user(
                jane,
                &TaskFilter::default(),
                &PageRequest { page: 2, limit: 10 },
                &mut ext_cxn,
                &DbReadTasks,
            )
            .await
            .expect("listing should succeed");

        assert_eq!(10, first_page.tasks.len());
        assert_eq!(5, second_page.tasks.len());
        assert_eq!(15, first_page.meta.total);
        assert_eq!(2, first_page.meta.total_pages);
        assert!(
            first_page
                .tasks
                .iter()
                .chain(second_page.tasks.iter())
                .all(|task| task.owner_user_id == jane)
        );
    });
}

#[test]
fn pages_past_the_end_are_empty() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        insert_task(&mut ext_cxn, jane, titled("Only task")).await;

        let far_page = TaskService
            .tasks_for_user(
                jane,
                &TaskFilter::default(),
                &PageRequest {
                    page: u32::MAX,
                    limit: u32::MAX,
                },
                &mut ext_cxn,
                &DbReadTasks,
            )
            .await;

        assert_that!(far_page)
            .is_ok()
            .matches(|page| page.tasks.is_empty() && page.meta.total == 1);
    });
}

#[test]
fn history_only_returns_completed_tasks() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let done = insert_task(&mut ext_cxn, jane, titled("Done")).await;
        insert_task(&mut ext_cxn, jane, titled("Open")).await;
        DbWriteTasks
            .toggle_completion(jane, done, &mut ext_cxn)
            .await
            .expect("toggle should succeed");

        let history = TaskService
            .task_history(
                jane,
                &TaskFilter {
                    completion: CompletionFilter::Incomplete,
                    ..Default::default()
                },
                &PageRequest::default(),
                &mut ext_cxn,
                &DbReadTasks,
            )
            .await
            .expect("history should load");

        assert_eq!(1, history.meta.total);
        assert_eq!(1, history.tasks.len());
        assert!(history.tasks.iter().all(|task| task.id == done && task.is_completed));
    });
}

#[test]
fn filters_by_search_category_and_deadline() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let work = DbWriteCategories
            .create_category(
                jane,
                &NewCategory {
                    name: "Work".to_owned(),
                },
                &mut ext_cxn,
            )
            .await
            .expect("category should be created");

        let report = insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                category_id: Some(work.id),
                deadline: Some(parse_deadline("2024-06-15").expect("valid date")),
                ..titled("Quarterly REPORT")
            },
        )
        .await;
        let discount = insert_task(&mut ext_cxn, jane, titled("Apply 50% discount")).await;
        insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                deadline: Some(parse_deadline("2024-09-01").expect("valid date")),
                ..titled("Plan holiday")
            },
        )
        .await;

        let by_search = listed_ids(
            &mut ext_cxn,
            jane,
            TaskFilter {
                search: Some("report".to_owned()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(vec![report], by_search);

        let by_literal_percent = listed_ids(
            &mut ext_cxn,
            jane,
            TaskFilter {
                search: Some("50%".to_owned()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(vec![discount], by_literal_percent);

        let by_category = listed_ids(
            &mut ext_cxn,
            jane,
            TaskFilter {
                category_id: Some(work.id),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(vec![report], by_category);

        let by_deadline = listed_ids(
            &mut ext_cxn,
            jane,
            TaskFilter {
                deadline_from: Some(parse_deadline("2024-06-15").expect("valid date")),
                deadline_to: Some(parse_deadline("2024-06-30").expect("valid date")),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(vec![report], by_deadline);
    });
}

#[test]
fn deleting_a_category_unlinks_its_tasks() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let work = DbWriteCategories
            .create_category(
                jane,
                &NewCategory {
                    name: "Work".to_owned(),
                },
                &mut ext_cxn,
            )
            .await
            .expect("category should be created");
        let task_id = insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                category_id: Some(work.id),
                ..titled("Report")
            },
        )
        .await;

        DbWriteCategories
            .delete_category(jane, work.id, &mut ext_cxn)
            .await
            .expect("delete should succeed");

        let task = TaskService
            .user_task_by_id(jane, task_id, &mut ext_cxn, &DbReadTasks)
            .await;
        assert_that!(task)
            .is_ok()
            .matches(|task| task.category.is_none());
    });
}

#[test]
fn updates_link_and_clear_categories() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let work = DbWriteCategories
            .create_category(
                jane,
                &NewCategory {
                    name: "Work".to_owned(),
                },
                &mut ext_cxn,
            )
            .await
            .expect("category should be created");
        let task_id = insert_task(
            &mut ext_cxn,
            jane,
            NewTask {
                details: Some("Draft first".to_owned()),
                ..titled("Report")
            },
        )
        .await;

        let linked = TaskService
            .update_task(
                jane,
                task_id,
                &UpdateTask {
                    category_id: Some(Some(work.id)),
                    ..Default::default()
                },
                &mut ext_cxn,
                &DbReadTasks,
                &DbWriteTasks,
                &DbDetectCategory,
            )
            .await
            .expect("linking should succeed");
        assert_eq!(Some(work.id), linked.category.as_ref().map(|category| category.id));
        assert_eq!(Some("Draft first".to_owned()), linked.details);

        let untouched = TaskService
            .update_task(
                jane,
                task_id,
                &UpdateTask {
                    title: Some("Final report".to_owned()),
                    ..Default::default()
                },
                &mut ext_cxn,
                &DbReadTasks,
                &DbWriteTasks,
                &DbDetectCategory,
            )
            .await
            .expect("rename should succeed");
        assert_eq!("Final report", untouched.title);
        assert_eq!(Some(work.id), untouched.category.as_ref().map(|category| category.id));

        let cleared = TaskService
            .update_task(
                jane,
                task_id,
                &UpdateTask {
                    category_id: Some(None),
                    details: Some(None),
                    ..Default::default()
                },
                &mut ext_cxn,
                &DbReadTasks,
                &DbWriteTasks,
                &DbDetectCategory,
            )
            .await
            .expect("clearing should succeed");
        assert!(cleared.category.is_none());
        assert!(cleared.details.is_none());
        assert_eq!("Final report", cleared.title);
    });
}

#[test]
fn other_users_cannot_touch_tasks() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let john = create_user(&mut ext_cxn, "john@example.com").await;
        let task_id = insert_task(&mut ext_cxn, jane, titled("Private")).await;

        let johns_read = TaskService
            .user_task_by_id(john, task_id, &mut ext_cxn, &DbReadTasks)
            .await;
        let Err(TaskError::NotFound) = johns_read else {
            panic!("Expected another user's task to be invisible");
        };

        let johns_toggle = TaskService
            .toggle_completion(john, task_id, &mut ext_cxn, &DbReadTasks, &DbWriteTasks)
            .await;
        let Err(TaskError::NotFound) = johns_toggle else {
            panic!("Expected toggling another user's task to fail");
        };

        let johns_delete = TaskService
            .delete_task(john, task_id, &mut ext_cxn, &DbWriteTasks)
            .await;
        let Err(TaskError::NotFound) = johns_delete else {
            panic!("Expected deleting another user's task to fail");
        };

        let janes_task = TaskService
            .user_task_by_id(jane, task_id, &mut ext_cxn, &DbReadTasks)
            .await;
        assert_that!(janes_task)
            .is_ok()
            .matches(|task| !task.is_completed);
    });
}

#[test]
fn toggling_twice_restores_completion() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let jane = create_user(&mut ext_cxn, "jane@example.com").await;
        let task_id = insert_task(&mut ext_cxn, jane, titled("Flip me")).await;

        let once = TaskService
            .toggle_completion(jane, task_id, &mut ext_cxn, &DbReadTasks, &DbWriteTasks)
            .await
            .expect("first toggle should succeed");
        let twice = TaskService
            .toggle_completion(jane, task_id, &mut ext_cxn, &DbReadTasks, &DbWriteTasks)
            .await
            .expect("second toggle should succeed");

        assert!(once.is_completed);
        assert!(!twice.is_completed);
    });
}
