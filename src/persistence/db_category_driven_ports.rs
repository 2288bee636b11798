use super::{Count, classify_write_error};
use crate::domain;
use crate::domain::DrivenPortError;
use crate::domain::category::{Category, CategoryWithCount, NewCategory, UpdateCategory};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::query_as;
use uuid::Uuid;

const CATEGORY_COLUMNS: &str = "id, name, user_id, created_at, updated_at";
const COUNTED_CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.user_id, c.created_at, c.updated_at, \
     (SELECT count(*) FROM tasks t WHERE t.category_id = c.id) AS task_count \
     FROM categories c";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(value: CategoryRow) -> Self {
        Category {
            id: value.id,
            name: value.name,
            owner_user_id: value.user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CountedCategoryRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    task_count: Option<i64>,
}

impl From<CountedCategoryRow> for CategoryWithCount {
    fn from(value: CountedCategoryRow) -> Self {
        CategoryWithCount {
            category: value.category.into(),
            task_count: value.task_count.unwrap_or(0),
        }
    }
}

pub struct DbReadCategories;

impl domain::category::driven_ports::CategoryReader for DbReadCategories {
    async fn categories_for_user(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<CategoryWithCount>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let categories = query_as::<_, CountedCategoryRow>(&format!(
            "{COUNTED_CATEGORY_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC, c.id"
        ))
        .bind(user_id)
        .fetch_all(cxn_handle.borrow_connection())
        .await
        .context("fetching a user's categories")?
        .into_iter()
        .map(CategoryWithCount::from)
        .collect();

        Ok(categories)
    }

    async fn user_category_by_id(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<CategoryWithCount>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let category = query_as::<_, CountedCategoryRow>(&format!(
            "{COUNTED_CATEGORY_SELECT} WHERE c.id = $1 AND c.user_id = $2"
        ))
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("fetching a category by id")?;

        Ok(category.map(CategoryWithCount::from))
    }
}

pub struct DbWriteCategories;

impl domain::category::driven_ports::CategoryWriter for DbWriteCategories {
    async fn create_category(
        &self,
        user_id: Uuid,
        new_category: &NewCategory,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Category, DrivenPortError> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let created = query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (id, name, user_id) VALUES ($1, $2, $3) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_category.name)
        .bind(user_id)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .map_err(|err| classify_write_error(err, "inserting a new category"))?;

        Ok(created.into())
    }

    async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        update: &UpdateCategory,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Category>, DrivenPortError> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let updated = query_as::<_, CategoryRow>(&format!(
            "UPDATE categories SET name = COALESCE($3, name), updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category_id)
        .bind(user_id)
        .bind(update.name.as_deref())
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .map_err(|err| classify_write_error(err, "updating a category"))?;

        Ok(updated.map(Category::from))
    }

    async fn delete_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(user_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("deleting a category")?;

        Ok(deleted.rows_affected() > 0)
    }
}

pub struct DbDetectCategory;

impl domain::category::driven_ports::DetectCategory for DbDetectCategory {
    async fn user_owns_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let owned_count = query_as::<_, Count>(
            "SELECT count(*) AS count FROM categories WHERE id = $1 AND user_id = $2",
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("detecting category ownership")?;

        Ok(owned_count.count() > 0)
    }

    async fn user_category_name_taken(
        &self,
        user_id: Uuid,
        name: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let named_count = query_as::<_, Count>(
            "SELECT count(*) AS count FROM categories WHERE name = $1 AND user_id = $2",
        )
        .bind(name)
        .bind(user_id)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("detecting category with name")?;

        Ok(named_count.count() > 0)
    }
}
