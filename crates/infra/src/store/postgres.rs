//! Postgres-backed catalog store.
//!
//! Every write runs in one transaction. Field validation goes through the same
//! domain constructors as the in-memory store; cross-row rules are checked with
//! explicit queries inside the transaction, and the schema's constraints act as
//! the last line:
//!
//! | Postgres error | `StoreError` |
//! |----------------|--------------|
//! | unique violation (`23505`) | `Domain(Conflict)` |
//! | foreign key violation (`23503`) | `Domain(Restricted)` |
//! | check violation (`23514`) | `Domain(Validation)` |
//! | anything else | `Database` |
//!
//! Category writes lock the `category` table, rebuild the [`CategoryTree`] from
//! the rows, apply the change to it and write the recomputed nested-set bounds
//! back.

use std::collections::HashSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use storefront_catalog::query::feature_image;
use storefront_catalog::{
    Category, CategoryDetail, CategoryPatch, CategoryTree, CatalogPolicy, ImagePath, NewCategory,
    NewProduct, NewProductImage, NewProductSpecification, NewProductType, NewSpecificationValue,
    Price, Product, ProductDetail, ProductImage, ProductImagePatch, ProductPatch, ProductQuery,
    ProductSpecification, ProductSpecificationValue, ProductType, ProductTypePatch,
    RemovedProduct, SpecificationEntry, invalid_choice,
};
use storefront_core::{
    CategoryId, DomainError, ProductId, ProductImageId, ProductSpecificationId, ProductTypeId,
    Slug, SpecificationValueId,
};

use super::{CatalogStore, StoreError, StoreResult, now};
use crate::db;

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
    policy: CatalogPolicy,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool, policy: CatalogPolicy) -> Self {
        Self { pool, policy }
    }

    /// Connect, apply the schema and return a ready store.
    pub async fn connect(database_url: &str, policy: CatalogPolicy) -> StoreResult<Self> {
        let pool = db::connect(database_url, 10).await?;
        db::apply_schema(&pool).await?;
        Ok(Self::new(pool, policy))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self, operation: &'static str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(db_error(operation))
    }

    /// Read-only transaction with a single snapshot for multi-query reads.
    async fn snapshot(&self, operation: &'static str) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.begin(operation).await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error(operation))?;
        Ok(tx)
    }

    async fn commit(tx: Transaction<'static, Postgres>, operation: &'static str) -> StoreResult<()> {
        tx.commit().await.map_err(db_error(operation))
    }

    /// Lock the category table against concurrent writers and load the tree.
    async fn lock_tree(
        tx: &mut Transaction<'static, Postgres>,
        operation: &'static str,
    ) -> StoreResult<CategoryTree> {
        sqlx::query("LOCK TABLE category IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut **tx)
            .await
            .map_err(db_error(operation))?;
        load_tree(&mut **tx, operation).await
    }

    async fn detail_in(
        tx: &mut Transaction<'static, Postgres>,
        id: ProductId,
    ) -> StoreResult<ProductDetail> {
        const OP: &str = "product_detail";

        let product = fetch_product(&mut **tx, id, false, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let tree = load_tree(&mut **tx, OP).await?;

        let product_type = sqlx::query(
            r#"
            SELECT id, name, is_active
            FROM product_type
            WHERE id = $1
            "#,
        )
        .bind(product.product_type.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error(OP))?;
        let product_type = product_type_from_row(&product_type)?;

        let rows = sqlx::query(
            r#"
            SELECT
                v.id AS value_id,
                v.value,
                s.id AS specification_id,
                s.product_type_id,
                s.name
            FROM product_specification_value v
            JOIN product_specification s ON s.id = v.specification_id
            WHERE v.product_id = $1
            ORDER BY s.name ASC, v.id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(db_error(OP))?;

        let mut specifications = Vec::with_capacity(rows.len());
        for row in &rows {
            let specification = ProductSpecification {
                id: ProductSpecificationId::from_uuid(row.try_get("specification_id")?),
                product_type: ProductTypeId::from_uuid(row.try_get("product_type_id")?),
                name: row.try_get("name")?,
            };
            let value = ProductSpecificationValue {
                id: SpecificationValueId::from_uuid(row.try_get("value_id")?),
                product: id,
                specification: specification.id,
                value: row.try_get("value")?,
            };
            specifications.push(SpecificationEntry { specification, value });
        }

        let images = fetch_images(&mut **tx, id, OP).await?;
        let feature = feature_image(&images).cloned();

        Ok(ProductDetail {
            category_path: tree
                .ancestors(product.category, true)
                .into_iter()
                .cloned()
                .collect(),
            product,
            product_type,
            specifications,
            images,
            feature_image: feature,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    fn policy(&self) -> CatalogPolicy {
        self.policy
    }

    // ---- categories ----

    async fn category_tree(&self) -> StoreResult<CategoryTree> {
        load_tree(&self.pool, "category_tree").await
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Category> {
        let row = sqlx::query(
            r#"
            SELECT id, name, slug, parent_id, is_active
            FROM category
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("category"))?
        .ok_or_else(DomainError::not_found)?;
        category_from_row(&row)
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        const OP: &str = "create_category";
        let category = Category::create(CategoryId::new(), new)?;

        let mut tx = self.begin(OP).await?;
        let mut tree = Self::lock_tree(&mut tx, OP).await?;
        tree.insert(category.clone())?;

        sqlx::query(
            r#"
            INSERT INTO category (id, name, slug, parent_id, is_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(category.slug.as_str())
        .bind(category.parent.map(Uuid::from))
        .bind(category.is_active)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;

        write_bounds(&mut tx, &tree, OP).await?;
        Self::commit(tx, OP).await?;

        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        const OP: &str = "update_category";
        let mut tx = self.begin(OP).await?;
        let mut tree = Self::lock_tree(&mut tx, OP).await?;
        let category = tree.update(id, &patch)?;

        sqlx::query(
            r#"
            UPDATE category
            SET name = $2, slug = $3, parent_id = $4, is_active = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&category.name)
        .bind(category.slug.as_str())
        .bind(category.parent.map(Uuid::from))
        .bind(category.is_active)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;

        write_bounds(&mut tx, &tree, OP).await?;
        Self::commit(tx, OP).await?;

        tracing::info!(category_id = %id, "category updated");
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<Vec<Category>> {
        const OP: &str = "delete_category";
        let mut tx = self.begin(OP).await?;
        let mut tree = Self::lock_tree(&mut tx, OP).await?;
        if !tree.contains(id) {
            return Err(DomainError::not_found().into());
        }

        let subtree: Vec<Uuid> = tree.descendant_ids(id, true).into_iter().map(Uuid::from).collect();
        let referenced: Option<String> = sqlx::query_scalar(
            r#"
            SELECT title
            FROM product
            WHERE category_id = ANY($1)
            LIMIT 1
            "#,
        )
        .bind(&subtree)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        if let Some(title) = referenced {
            return Err(DomainError::restricted(format!(
                "category is referenced by product '{title}'"
            ))
            .into());
        }

        let removed = tree.remove(id)?;
        sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;

        write_bounds(&mut tx, &tree, OP).await?;
        Self::commit(tx, OP).await?;

        tracing::info!(category_id = %id, removed = removed.len(), "category subtree deleted");
        Ok(removed)
    }

    async fn category_detail(&self, slug: &Slug) -> StoreResult<CategoryDetail> {
        const OP: &str = "category_detail";
        let mut tx = self.snapshot(OP).await?;
        let tree = load_tree(&mut *tx, OP).await?;
        let category = tree
            .get_by_slug(slug.as_str())
            .ok_or_else(DomainError::not_found)?;

        let query = ProductQuery::storefront().in_category(category.id, true);
        let products = fetch_products(&mut *tx, &query, query.category_scope(&tree), OP).await?;
        Self::commit(tx, OP).await?;

        Ok(CategoryDetail {
            category: category.clone(),
            ancestors: tree.ancestors(category.id, false).into_iter().cloned().collect(),
            children: tree
                .children(category.id)
                .into_iter()
                .filter(|c| c.is_active)
                .cloned()
                .collect(),
            products,
        })
    }

    // ---- product types and specifications ----

    async fn product_types(&self) -> StoreResult<Vec<ProductType>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, is_active
            FROM product_type
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("product_types"))?;
        rows.iter().map(product_type_from_row).collect()
    }

    async fn product_type(&self, id: ProductTypeId) -> StoreResult<ProductType> {
        fetch_product_type(&self.pool, id, false, "product_type")
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn create_product_type(&self, new: NewProductType) -> StoreResult<ProductType> {
        let product_type = ProductType::create(ProductTypeId::new(), new)?;
        sqlx::query("INSERT INTO product_type (id, name, is_active) VALUES ($1, $2, $3)")
            .bind(product_type.id.as_uuid())
            .bind(&product_type.name)
            .bind(product_type.is_active)
            .execute(&self.pool)
            .await
            .map_err(db_error("create_product_type"))?;

        tracing::info!(product_type_id = %product_type.id, name = %product_type.name, "product type created");
        Ok(product_type)
    }

    async fn update_product_type(
        &self,
        id: ProductTypeId,
        patch: ProductTypePatch,
    ) -> StoreResult<ProductType> {
        const OP: &str = "update_product_type";
        let mut tx = self.begin(OP).await?;
        let mut product_type = fetch_product_type(&mut *tx, id, true, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;
        product_type.apply_patch(&patch)?;

        sqlx::query("UPDATE product_type SET name = $2, is_active = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(&product_type.name)
            .bind(product_type.is_active)
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(product_type_id = %id, "product type updated");
        Ok(product_type)
    }

    async fn delete_product_type(&self, id: ProductTypeId) -> StoreResult<ProductType> {
        const OP: &str = "delete_product_type";
        let mut tx = self.begin(OP).await?;
        let product_type = fetch_product_type(&mut *tx, id, true, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;

        let declares_specs: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_specification WHERE product_type_id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        if declares_specs {
            return Err(DomainError::restricted("product type still declares specifications").into());
        }

        let referenced: Option<String> =
            sqlx::query_scalar("SELECT title FROM product WHERE product_type_id = $1 LIMIT 1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error(OP))?;
        if let Some(title) = referenced {
            return Err(DomainError::restricted(format!(
                "product type is referenced by product '{title}'"
            ))
            .into());
        }

        sqlx::query("DELETE FROM product_type WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(product_type_id = %id, "product type deleted");
        Ok(product_type)
    }

    async fn specifications(&self, product_type: ProductTypeId) -> StoreResult<Vec<ProductSpecification>> {
        const OP: &str = "specifications";
        self.product_type(product_type).await?;
        let rows = sqlx::query(
            r#"
            SELECT id, product_type_id, name
            FROM product_specification
            WHERE product_type_id = $1
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(product_type.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error(OP))?;
        rows.iter().map(specification_from_row).collect()
    }

    async fn create_specification(
        &self,
        new: NewProductSpecification,
    ) -> StoreResult<ProductSpecification> {
        const OP: &str = "create_specification";
        let spec = ProductSpecification::create(ProductSpecificationId::new(), new)?;

        let mut tx = self.begin(OP).await?;
        if fetch_product_type(&mut *tx, spec.product_type, true, OP).await?.is_none() {
            return Err(invalid_choice("product_type").into());
        }
        sqlx::query(
            r#"
            INSERT INTO product_specification (id, product_type_id, name)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(spec.id.as_uuid())
        .bind(spec.product_type.as_uuid())
        .bind(&spec.name)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(specification_id = %spec.id, name = %spec.name, "specification created");
        Ok(spec)
    }

    async fn delete_specification(&self, id: ProductSpecificationId) -> StoreResult<ProductSpecification> {
        const OP: &str = "delete_specification";
        let mut tx = self.begin(OP).await?;
        let row = sqlx::query(
            r#"
            SELECT id, product_type_id, name
            FROM product_specification
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error(OP))?
        .ok_or_else(DomainError::not_found)?;
        let spec = specification_from_row(&row)?;

        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_specification_value WHERE specification_id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        if in_use {
            return Err(DomainError::restricted("specification still has values on products").into());
        }

        sqlx::query("DELETE FROM product_specification WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(specification_id = %id, "specification deleted");
        Ok(spec)
    }

    // ---- products ----

    async fn products(&self, query: ProductQuery) -> StoreResult<Vec<Product>> {
        const OP: &str = "products";
        let scope = match query.category {
            Some(_) if query.include_subcategories => {
                let tree = load_tree(&self.pool, OP).await?;
                query.category_scope(&tree)
            }
            Some(category) => Some(HashSet::from([category])),
            None => None,
        };
        fetch_products(&self.pool, &query, scope, OP).await
    }

    async fn product(&self, id: ProductId) -> StoreResult<Product> {
        fetch_product(&self.pool, id, false, "product")
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn product_detail(&self, id: ProductId) -> StoreResult<ProductDetail> {
        let mut tx = self.snapshot("product_detail").await?;
        let detail = Self::detail_in(&mut tx, id).await?;
        Self::commit(tx, "product_detail").await?;
        Ok(detail)
    }

    async fn storefront_product(&self, slug: &Slug) -> StoreResult<ProductDetail> {
        const OP: &str = "storefront_product";
        let mut tx = self.snapshot(OP).await?;
        let id: Uuid = sqlx::query_scalar(
            r#"
            SELECT id
            FROM product
            WHERE slug = $1 AND is_active
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(slug.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error(OP))?
        .ok_or_else(DomainError::not_found)?;

        let detail = Self::detail_in(&mut tx, ProductId::from_uuid(id)).await?;
        Self::commit(tx, OP).await?;
        Ok(detail)
    }

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        const OP: &str = "create_product";
        let product = Product::create(ProductId::new(), new, now())?;

        let mut tx = self.begin(OP).await?;
        ensure_product_refs(&mut tx, product.product_type, product.category, OP).await?;
        sqlx::query(
            r#"
            INSERT INTO product (
                id,
                product_type_id,
                category_id,
                title,
                description,
                slug,
                regular_price,
                discount_price,
                is_active,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.product_type.as_uuid())
        .bind(product.category.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.slug.as_str())
        .bind(product.regular_price.amount())
        .bind(product.discount_price.amount())
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(product_id = %product.id, title = %product.title, "product created");
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        const OP: &str = "update_product";
        let mut tx = self.begin(OP).await?;
        let current = fetch_product(&mut *tx, id, true, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let next = current.patched(&patch, now())?;
        ensure_product_refs(&mut tx, next.product_type, next.category, OP).await?;

        if self.policy.enforce_specification_type && next.product_type != current.product_type {
            let stale: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1
                    FROM product_specification_value v
                    JOIN product_specification s ON s.id = v.specification_id
                    WHERE v.product_id = $1 AND s.product_type_id <> $2
                )
                "#,
            )
            .bind(id.as_uuid())
            .bind(next.product_type.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error(OP))?;
            if stale {
                return Err(DomainError::field(
                    "product_type",
                    "invalid",
                    "Remove the specification values of the current product type first.",
                )
                .into());
            }
        }

        sqlx::query(
            r#"
            UPDATE product
            SET
                product_type_id = $2,
                category_id = $3,
                title = $4,
                description = $5,
                slug = $6,
                regular_price = $7,
                discount_price = $8,
                is_active = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(next.product_type.as_uuid())
        .bind(next.category.as_uuid())
        .bind(&next.title)
        .bind(&next.description)
        .bind(next.slug.as_str())
        .bind(next.regular_price.amount())
        .bind(next.discount_price.amount())
        .bind(next.is_active)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(product_id = %id, "product updated");
        Ok(next)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<RemovedProduct> {
        const OP: &str = "delete_product";
        let mut tx = self.begin(OP).await?;
        let product = fetch_product(&mut *tx, id, true, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let values = fetch_values(&mut *tx, id, OP).await?;
        let images = fetch_images(&mut *tx, id, OP).await?;

        sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(
            product_id = %id,
            values = values.len(),
            images = images.len(),
            "product deleted"
        );
        Ok(RemovedProduct {
            product,
            values,
            images,
        })
    }

    // ---- specification values ----

    async fn specification_values(&self, product: ProductId) -> StoreResult<Vec<ProductSpecificationValue>> {
        self.product(product).await?;
        fetch_values(&self.pool, product, "specification_values").await
    }

    async fn set_specification_value(
        &self,
        new: NewSpecificationValue,
    ) -> StoreResult<ProductSpecificationValue> {
        const OP: &str = "set_specification_value";
        let mut tx = self.begin(OP).await?;

        let product = fetch_product(&mut *tx, new.product, true, OP)
            .await?
            .ok_or_else(|| invalid_choice("product"))?;
        let spec_type: Uuid = sqlx::query_scalar(
            "SELECT product_type_id FROM product_specification WHERE id = $1",
        )
        .bind(new.specification.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error(OP))?
        .ok_or_else(|| invalid_choice("specification"))?;

        if self.policy.enforce_specification_type && spec_type != Uuid::from(product.product_type) {
            return Err(DomainError::field(
                "specification",
                "invalid_choice",
                "The specification does not belong to the product's type.",
            )
            .into());
        }

        let existing: Option<Uuid> = if self.policy.unique_specification_values {
            sqlx::query_scalar(
                r#"
                SELECT id
                FROM product_specification_value
                WHERE product_id = $1 AND specification_id = $2
                ORDER BY id ASC
                LIMIT 1
                "#,
            )
            .bind(new.product.as_uuid())
            .bind(new.specification.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error(OP))?
        } else {
            None
        };

        let id = existing.map_or_else(SpecificationValueId::new, SpecificationValueId::from_uuid);
        let value = ProductSpecificationValue::create(id, new)?;
        let sql = if existing.is_some() {
            r#"
            UPDATE product_specification_value
            SET value = $4
            WHERE id = $1 AND product_id = $2 AND specification_id = $3
            "#
        } else {
            r#"
            INSERT INTO product_specification_value (id, product_id, specification_id, value)
            VALUES ($1, $2, $3, $4)
            "#
        };
        sqlx::query(sql)
            .bind(value.id.as_uuid())
            .bind(value.product.as_uuid())
            .bind(value.specification.as_uuid())
            .bind(&value.value)
            .execute(&mut *tx)
            .await
            .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::debug!(
            value_id = %value.id,
            product_id = %value.product,
            specification_id = %value.specification,
            replaced = existing.is_some(),
            "specification value set"
        );
        Ok(value)
    }

    async fn delete_specification_value(
        &self,
        id: SpecificationValueId,
    ) -> StoreResult<ProductSpecificationValue> {
        let row = sqlx::query(
            r#"
            DELETE FROM product_specification_value
            WHERE id = $1
            RETURNING id, product_id, specification_id, value
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("delete_specification_value"))?
        .ok_or_else(DomainError::not_found)?;

        tracing::debug!(value_id = %id, "specification value deleted");
        value_from_row(&row)
    }

    // ---- images ----

    async fn images(&self, product: ProductId) -> StoreResult<Vec<ProductImage>> {
        self.product(product).await?;
        fetch_images(&self.pool, product, "images").await
    }

    async fn image(&self, id: ProductImageId) -> StoreResult<ProductImage> {
        fetch_image(&self.pool, id, false, "image")
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn add_image(&self, new: NewProductImage) -> StoreResult<ProductImage> {
        const OP: &str = "add_image";
        let stamp = now();
        let image = ProductImage::create(ProductImageId::new(), new, stamp)?;

        let mut tx = self.begin(OP).await?;
        if fetch_product(&mut *tx, image.product, true, OP).await?.is_none() {
            return Err(invalid_choice("product").into());
        }
        if image.is_feature && self.policy.exclusive_feature_image {
            clear_other_features(&mut tx, &image, OP).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO product_image (
                id,
                product_id,
                image,
                alt_text,
                is_feature,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(image.id.as_uuid())
        .bind(image.product.as_uuid())
        .bind(image.image.as_str())
        .bind(image.alt_text.as_deref())
        .bind(image.is_feature)
        .bind(image.created_at)
        .bind(image.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::info!(image_id = %image.id, product_id = %image.product, path = %image.image, "image added");
        Ok(image)
    }

    async fn update_image(&self, id: ProductImageId, patch: ProductImagePatch) -> StoreResult<ProductImage> {
        const OP: &str = "update_image";
        let mut tx = self.begin(OP).await?;
        let current = fetch_image(&mut *tx, id, true, OP)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let next = current.patched(&patch, now())?;
        if patch.is_feature == Some(true) && self.policy.exclusive_feature_image {
            clear_other_features(&mut tx, &next, OP).await?;
        }

        sqlx::query(
            r#"
            UPDATE product_image
            SET alt_text = $2, is_feature = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(next.alt_text.as_deref())
        .bind(next.is_feature)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error(OP))?;
        Self::commit(tx, OP).await?;

        tracing::debug!(image_id = %id, is_feature = next.is_feature, "image updated");
        Ok(next)
    }

    async fn delete_image(&self, id: ProductImageId) -> StoreResult<ProductImage> {
        let row = sqlx::query(
            r#"
            DELETE FROM product_image
            WHERE id = $1
            RETURNING id, product_id, image, alt_text, is_feature, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("delete_image"))?
        .ok_or_else(DomainError::not_found)?;

        let image = image_from_row(&row)?;
        tracing::info!(image_id = %id, path = %image.image, "image deleted");
        Ok(image)
    }
}

// ---- queries shared by several operations ----

async fn load_tree<'e>(executor: impl PgExecutor<'e>, operation: &'static str) -> StoreResult<CategoryTree> {
    let rows = sqlx::query("SELECT id, name, slug, parent_id, is_active FROM category")
        .fetch_all(executor)
        .await
        .map_err(db_error(operation))?;
    let categories = rows.iter().map(category_from_row).collect::<StoreResult<Vec<_>>>()?;
    Ok(CategoryTree::from_categories(categories)?)
}

/// Persist the nested-set coordinates of every node.
async fn write_bounds(
    tx: &mut Transaction<'static, Postgres>,
    tree: &CategoryTree,
    operation: &'static str,
) -> StoreResult<()> {
    let mut ids = Vec::with_capacity(tree.len());
    let mut tree_ids = Vec::with_capacity(tree.len());
    let mut lfts = Vec::with_capacity(tree.len());
    let mut rgts = Vec::with_capacity(tree.len());
    let mut levels = Vec::with_capacity(tree.len());
    for (category, bounds) in tree.walk() {
        ids.push(Uuid::from(category.id));
        tree_ids.push(to_i32(bounds.tree_id)?);
        lfts.push(to_i32(bounds.lft)?);
        rgts.push(to_i32(bounds.rgt)?);
        levels.push(to_i32(bounds.level)?);
    }

    sqlx::query(
        r#"
        UPDATE category AS c
        SET tree_id = b.tree_id, lft = b.lft, rgt = b.rgt, level = b.level
        FROM UNNEST($1::uuid[], $2::int4[], $3::int4[], $4::int4[], $5::int4[])
            AS b(id, tree_id, lft, rgt, level)
        WHERE c.id = b.id
        "#,
    )
    .bind(&ids)
    .bind(&tree_ids)
    .bind(&lfts)
    .bind(&rgts)
    .bind(&levels)
    .execute(&mut **tx)
    .await
    .map_err(db_error(operation))?;
    Ok(())
}

fn to_i32(value: u32) -> StoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| DomainError::invariant("category tree too large for the nested-set columns").into())
}

async fn ensure_product_refs(
    tx: &mut Transaction<'static, Postgres>,
    product_type: ProductTypeId,
    category: CategoryId,
    operation: &'static str,
) -> StoreResult<()> {
    if fetch_product_type(&mut **tx, product_type, true, operation).await?.is_none() {
        return Err(invalid_choice("product_type").into());
    }
    let category: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM category WHERE id = $1 FOR SHARE")
            .bind(category.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_error(operation))?;
    if category.is_none() {
        return Err(invalid_choice("category").into());
    }
    Ok(())
}

async fn clear_other_features(
    tx: &mut Transaction<'static, Postgres>,
    keep: &ProductImage,
    operation: &'static str,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE product_image
        SET is_feature = FALSE, updated_at = $3
        WHERE product_id = $1 AND id <> $2 AND is_feature
        "#,
    )
    .bind(keep.product.as_uuid())
    .bind(keep.id.as_uuid())
    .bind(keep.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_error(operation))?;
    Ok(())
}

async fn fetch_product_type<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductTypeId,
    for_update: bool,
    operation: &'static str,
) -> StoreResult<Option<ProductType>> {
    let sql = if for_update {
        "SELECT id, name, is_active FROM product_type WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id, name, is_active FROM product_type WHERE id = $1"
    };
    let row = sqlx::query(sql)
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(db_error(operation))?;
    row.as_ref().map(product_type_from_row).transpose()
}

async fn fetch_product<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductId,
    for_update: bool,
    operation: &'static str,
) -> StoreResult<Option<Product>> {
    let sql = if for_update {
        r#"
        SELECT
            id, product_type_id, category_id, title, description, slug,
            regular_price, discount_price, is_active, created_at, updated_at
        FROM product
        WHERE id = $1
        FOR UPDATE
        "#
    } else {
        r#"
        SELECT
            id, product_type_id, category_id, title, description, slug,
            regular_price, discount_price, is_active, created_at, updated_at
        FROM product
        WHERE id = $1
        "#
    };
    let row = sqlx::query(sql)
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(db_error(operation))?;
    row.as_ref().map(product_from_row).transpose()
}

async fn fetch_products<'e>(
    executor: impl PgExecutor<'e>,
    query: &ProductQuery,
    scope: Option<HashSet<CategoryId>>,
    operation: &'static str,
) -> StoreResult<Vec<Product>> {
    let scope: Option<Vec<Uuid>> = scope.map(|ids| ids.into_iter().map(Uuid::from).collect());
    let rows = sqlx::query(
        r#"
        SELECT
            id, product_type_id, category_id, title, description, slug,
            regular_price, discount_price, is_active, created_at, updated_at
        FROM product
        WHERE (NOT $1 OR is_active)
          AND ($2::uuid[] IS NULL OR category_id = ANY($2))
          AND ($3::text IS NULL OR slug = $3)
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(query.active_only)
    .bind(scope)
    .bind(query.slug.as_ref().map(Slug::as_str))
    .fetch_all(executor)
    .await
    .map_err(db_error(operation))?;
    rows.iter().map(product_from_row).collect()
}

async fn fetch_values<'e>(
    executor: impl PgExecutor<'e>,
    product: ProductId,
    operation: &'static str,
) -> StoreResult<Vec<ProductSpecificationValue>> {
    let rows = sqlx::query(
        r#"
        SELECT v.id, v.product_id, v.specification_id, v.value
        FROM product_specification_value v
        JOIN product_specification s ON s.id = v.specification_id
        WHERE v.product_id = $1
        ORDER BY s.name ASC, v.id ASC
        "#,
    )
    .bind(product.as_uuid())
    .fetch_all(executor)
    .await
    .map_err(db_error(operation))?;
    rows.iter().map(value_from_row).collect()
}

async fn fetch_image<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductImageId,
    for_update: bool,
    operation: &'static str,
) -> StoreResult<Option<ProductImage>> {
    let sql = if for_update {
        r#"
        SELECT id, product_id, image, alt_text, is_feature, created_at, updated_at
        FROM product_image
        WHERE id = $1
        FOR UPDATE
        "#
    } else {
        r#"
        SELECT id, product_id, image, alt_text, is_feature, created_at, updated_at
        FROM product_image
        WHERE id = $1
        "#
    };
    let row = sqlx::query(sql)
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(db_error(operation))?;
    row.as_ref().map(image_from_row).transpose()
}

async fn fetch_images<'e>(
    executor: impl PgExecutor<'e>,
    product: ProductId,
    operation: &'static str,
) -> StoreResult<Vec<ProductImage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, image, alt_text, is_feature, created_at, updated_at
        FROM product_image
        WHERE product_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(product.as_uuid())
    .fetch_all(executor)
    .await
    .map_err(db_error(operation))?;
    rows.iter().map(image_from_row).collect()
}

// ---- row mapping ----

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    let slug: String = row.try_get("slug")?;
    let parent: Option<Uuid> = row.try_get("parent_id")?;
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        slug: Slug::parse(&slug)?,
        parent: parent.map(CategoryId::from_uuid),
        is_active: row.try_get("is_active")?,
    })
}

fn product_type_from_row(row: &PgRow) -> StoreResult<ProductType> {
    Ok(ProductType {
        id: ProductTypeId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
    })
}

fn specification_from_row(row: &PgRow) -> StoreResult<ProductSpecification> {
    Ok(ProductSpecification {
        id: ProductSpecificationId::from_uuid(row.try_get("id")?),
        product_type: ProductTypeId::from_uuid(row.try_get("product_type_id")?),
        name: row.try_get("name")?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let slug: String = row.try_get("slug")?;
    let regular: Decimal = row.try_get("regular_price")?;
    let discount: Decimal = row.try_get("discount_price")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        product_type: ProductTypeId::from_uuid(row.try_get("product_type_id")?),
        category: CategoryId::from_uuid(row.try_get("category_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: Slug::parse(&slug)?,
        regular_price: Price::parse_field("regular_price", regular)?,
        discount_price: Price::parse_field("discount_price", discount)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn value_from_row(row: &PgRow) -> StoreResult<ProductSpecificationValue> {
    Ok(ProductSpecificationValue {
        id: SpecificationValueId::from_uuid(row.try_get("id")?),
        product: ProductId::from_uuid(row.try_get("product_id")?),
        specification: ProductSpecificationId::from_uuid(row.try_get("specification_id")?),
        value: row.try_get("value")?,
    })
}

fn image_from_row(row: &PgRow) -> StoreResult<ProductImage> {
    let path: String = row.try_get("image")?;
    Ok(ProductImage {
        id: ProductImageId::from_uuid(row.try_get("id")?),
        product: ProductId::from_uuid(row.try_get("product_id")?),
        image: ImagePath::parse(&path)?,
        alt_text: row.try_get("alt_text")?,
        is_feature: row.try_get("is_feature")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ---- error mapping ----

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message().to_string();
        if db_err.is_unique_violation() {
            tracing::debug!(operation, %msg, "unique violation");
            return DomainError::conflict(msg).into();
        }
        if db_err.is_foreign_key_violation() {
            tracing::debug!(operation, %msg, "foreign key violation");
            return DomainError::restricted(msg).into();
        }
        if db_err.is_check_violation() {
            tracing::debug!(operation, %msg, "check violation");
            return DomainError::validation(msg).into();
        }
    }
    tracing::error!(operation, error = %err, "database error");
    StoreError::Database(err)
}

#[cfg(test)]
mod tests {
    //! Runs against a live database when `STOREFRONT_TEST_DATABASE_URL` is set;
    //! otherwise each test returns early.

    use super::*;

    async fn store() -> Option<PostgresCatalogStore> {
        let url = std::env::var("STOREFRONT_TEST_DATABASE_URL").ok()?;
        let store = PostgresCatalogStore::connect(&url, CatalogPolicy::default())
            .await
            .expect("connect to test database");
        sqlx::query(
            "TRUNCATE product_image, product_specification_value, product, \
             product_specification, product_type, category",
        )
        .execute(store.pool())
        .await
        .expect("truncate catalog tables");
        Some(store)
    }

    fn new_product(product_type: ProductTypeId, category: CategoryId, regular: Decimal) -> NewProduct {
        NewProduct {
            product_type,
            category,
            title: "Trail Runner".into(),
            description: String::new(),
            slug: None,
            regular_price: regular,
            discount_price: Decimal::ZERO,
            is_active: None,
        }
    }

    // One test so the shared tables are never truncated under a concurrent test.
    #[tokio::test]
    async fn postgres_store_enforces_catalog_rules() {
        let Some(store) = store().await else {
            return;
        };

        let footwear = store.create_category(NewCategory::new("Footwear")).await.unwrap();
        let running = store
            .create_category(NewCategory::new("Running").under(footwear.id))
            .await
            .unwrap();
        let err = store
            .update_category(footwear.id, CategoryPatch::move_to(Some(running.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvalidField(_))));

        let bounds: (i32, i32, i32) =
            sqlx::query_as("SELECT lft, rgt, level FROM category WHERE id = $1")
                .bind(running.id.as_uuid())
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(bounds, (2, 3, 1));

        let shoes = store
            .create_product_type(NewProductType { name: "Shoes".into(), is_active: None })
            .await
            .unwrap();
        let err = store
            .create_product(new_product(shoes.id, running.id, Decimal::new(100_000, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvalidField(_))));

        let product = store
            .create_product(new_product(shoes.id, running.id, Decimal::new(99_999, 2)))
            .await
            .unwrap();
        assert_eq!(store.product(product.id).await.unwrap(), product);

        let err = store.delete_product_type(shoes.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Restricted(_))));
        let err = store.delete_category(footwear.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Restricted(_))));

        let image = store
            .add_image(NewProductImage::new(product.id, ImagePath::parse("images/a.png").unwrap()))
            .await
            .unwrap();
        assert!(!image.is_feature);

        let removed = store.delete_product(product.id).await.unwrap();
        assert_eq!(removed.images, vec![image]);
        store.delete_product_type(shoes.id).await.unwrap();

        let removed = store.delete_category(footwear.id).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.category_tree().await.unwrap().is_empty());
    }
}
