//! Catalog: components, categories, products, reviews and ratings.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Category, Component, ComponentKind, Product, ProductView, Rate, RatingSummary, Review};
use crate::domain::value_objects::Rating;
use crate::store::{Store, Transaction};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_ids: Vec<Uuid>,
    pub plant_ids: Vec<Uuid>,
    pub accessory_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct CatalogService<S: Store> { store: S }

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub async fn add_component(&self, component: Component) -> Result<Component> {
        let mut tx = self.store.begin().await?;
        tx.insert_component(&component).await?;
        tx.commit().await?;
        tracing::info!(component_id = %component.id, kind = component.kind.as_str(), "component added");
        Ok(component)
    }

    /// Sets a component's stock directly, e.g. after a stock count.
    pub async fn restock(&self, id: Uuid, stock: i32) -> Result<Component> {
        let mut tx = self.store.begin().await?;
        let mut component = tx.component(id).await?.ok_or(EcommerceError::ComponentNotFound(id))?;
        component.stock = stock;
        component.updated_at = chrono::Utc::now();
        tx.update_component(&component).await?;
        tx.commit().await?;
        Ok(component)
    }

    pub async fn remove_component(&self, id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.delete_component(id).await?;
        tx.commit().await
    }

    pub async fn add_category(&self, name: impl Into<String>, parent_id: Option<Uuid>) -> Result<Category> {
        let category = Category::create(name, parent_id);
        let mut tx = self.store.begin().await?;
        tx.insert_category(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn sub_categories(&self, parent_id: Uuid) -> Result<Vec<Category>> {
        let mut tx = self.store.begin().await?;
        tx.category(parent_id).await?.ok_or(EcommerceError::CategoryNotFound(parent_id))?;
        let all = tx.categories().await?;
        Ok(Category::sub_categories(&all, parent_id).into_iter().cloned().collect())
    }

    pub async fn remove_category(&self, id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.delete_category(id).await?;
        tx.commit().await
    }

    pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
        let mut product = Product::create(new.name, new.price);
        product.description = new.description;
        product.category_ids = new.category_ids;
        let mut tx = self.store.begin().await?;
        self.link_components(&mut tx, &mut product, &new.plant_ids, ComponentKind::Plant).await?;
        self.link_components(&mut tx, &mut product, &new.accessory_ids, ComponentKind::Accessory).await?;
        tx.insert_product(&product).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id, components = product.component_ids().count(), "product added");
        Ok(product)
    }

    /// Replaces the product's fields and links. Existing order items keep their snapshot.
    pub async fn update_product(&self, id: Uuid, new: NewProduct) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        let mut product = tx.product(id).await?.ok_or(EcommerceError::ProductNotFound(id))?;
        product.name = new.name;
        product.description = new.description;
        product.price = new.price;
        product.category_ids = new.category_ids;
        product.plant_ids.clear();
        product.accessory_ids.clear();
        self.link_components(&mut tx, &mut product, &new.plant_ids, ComponentKind::Plant).await?;
        self.link_components(&mut tx, &mut product, &new.accessory_ids, ComponentKind::Accessory).await?;
        product.touch();
        tx.update_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    pub async fn remove_product(&self, id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        tx.delete_product(id).await?;
        tx.commit().await?;
        tracing::info!(product_id = %id, "product removed");
        Ok(())
    }

    /// The product with cost and stock derived from its current components.
    pub async fn product(&self, id: Uuid) -> Result<ProductView> {
        let mut tx = self.store.begin().await?;
        let product = tx.product(id).await?.ok_or(EcommerceError::ProductNotFound(id))?;
        let components = tx.components_of(id).await?;
        Ok(ProductView::new(product, &components))
    }

    pub async fn add_review(&self, user_id: Uuid, product_id: Uuid, text: Option<String>) -> Result<Review> {
        let review = Review::create(user_id, product_id, text);
        let mut tx = self.store.begin().await?;
        tx.product(product_id).await?.ok_or(EcommerceError::ProductNotFound(product_id))?;
        tx.insert_review(&review).await?;
        tx.commit().await?;
        Ok(review)
    }

    pub async fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        let mut tx = self.store.begin().await?;
        tx.product(product_id).await?.ok_or(EcommerceError::ProductNotFound(product_id))?;
        tx.reviews_for(product_id).await
    }

    pub async fn rate(&self, user_id: Uuid, product_id: Uuid, value: Rating) -> Result<RatingSummary> {
        let mut tx = self.store.begin().await?;
        tx.product(product_id).await?.ok_or(EcommerceError::ProductNotFound(product_id))?;
        tx.insert_rate(&Rate::create(user_id, product_id, value)).await?;
        let rates = tx.rates_for(product_id).await?;
        tx.commit().await?;
        Ok(RatingSummary::from_rates(&rates))
    }

    pub async fn rating(&self, product_id: Uuid) -> Result<RatingSummary> {
        let mut tx = self.store.begin().await?;
        tx.product(product_id).await?.ok_or(EcommerceError::ProductNotFound(product_id))?;
        Ok(RatingSummary::from_rates(&tx.rates_for(product_id).await?))
    }

    async fn link_components(&self, tx: &mut S::Tx, product: &mut Product, ids: &[Uuid], kind: ComponentKind) -> Result<()> {
        for id in ids {
            let component = tx.component(*id).await?.ok_or(EcommerceError::ComponentNotFound(*id))?;
            if component.kind != kind {
                return Err(EcommerceError::Validation(format!("component {id} is a {}, not a {}", component.kind.as_str(), kind.as_str())));
            }
            product.link(&component);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn new_product(name: &str, plants: Vec<Uuid>, accessories: Vec<Uuid>) -> NewProduct {
        NewProduct { name: name.into(), description: None, price: Decimal::new(100, 0), category_ids: vec![], plant_ids: plants, accessory_ids: accessories }
    }

    #[tokio::test]
    async fn test_product_view_derives_cost_and_stock() {
        let catalog = CatalogService::new(MemoryStore::new());
        let fern = catalog.add_component(Component::plant("Fern", Decimal::new(40, 0), 12)).await.unwrap();
        let pot = catalog.add_component(Component::accessory("Pot", Decimal::new(15, 0), 3)).await.unwrap();
        let bare = catalog.add_product(new_product("Gift card", vec![], vec![])).await.unwrap();
        let bundle = catalog.add_product(new_product("Fern in pot", vec![fern.id], vec![pot.id])).await.unwrap();

        let view = catalog.product(bare.id).await.unwrap();
        assert_eq!((view.cost, view.stock), (Decimal::ZERO, 0));

        let view = catalog.product(bundle.id).await.unwrap();
        assert_eq!((view.cost, view.stock), (Decimal::new(55, 0), 3));

        catalog.restock(pot.id, 50).await.unwrap();
        assert_eq!(catalog.product(bundle.id).await.unwrap().stock, 12);

        catalog.remove_component(fern.id).await.unwrap();
        let view = catalog.product(bundle.id).await.unwrap();
        assert_eq!((view.cost, view.stock), (Decimal::new(15, 0), 50));
    }

    #[tokio::test]
    async fn test_links_must_match_kind() {
        let catalog = CatalogService::new(MemoryStore::new());
        let pot = catalog.add_component(Component::accessory("Pot", Decimal::ONE, 3)).await.unwrap();
        let err = catalog.add_product(new_product("Broken", vec![pot.id], vec![])).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));
        let err = catalog.add_product(new_product("Broken", vec![Uuid::now_v7()], vec![])).await.unwrap_err();
        assert!(matches!(err, EcommerceError::ComponentNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let catalog = CatalogService::new(MemoryStore::new());
        let fern = catalog.add_component(Component::plant("Fern", Decimal::new(40, 0), 12)).await.unwrap();
        let cactus = catalog.add_component(Component::plant("Cactus", Decimal::new(20, 0), 2)).await.unwrap();
        let p = catalog.add_product(new_product("Plant", vec![fern.id], vec![])).await.unwrap();
        let p = catalog.update_product(p.id, new_product("Plant", vec![cactus.id], vec![])).await.unwrap();
        assert_eq!(p.plant_ids, vec![cactus.id]);
        assert_eq!(catalog.product(p.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_categories_tree() {
        let catalog = CatalogService::new(MemoryStore::new());
        let indoor = catalog.add_category("Indoor", None).await.unwrap();
        let ferns = catalog.add_category("Ferns", Some(indoor.id)).await.unwrap();
        assert_eq!(catalog.sub_categories(indoor.id).await.unwrap(), vec![ferns.clone()]);
        catalog.remove_category(indoor.id).await.unwrap();
        assert!(catalog.sub_categories(ferns.id).await.unwrap().is_empty());
        assert!(matches!(catalog.sub_categories(indoor.id).await, Err(EcommerceError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_reviews_and_ratings() {
        let catalog = CatalogService::new(MemoryStore::new());
        let p = catalog.add_product(new_product("Fern", vec![], vec![])).await.unwrap();
        let user = Uuid::now_v7();
        catalog.add_review(user, p.id, Some("lovely".into())).await.unwrap();
        let second = catalog.add_review(user, p.id, Some("still alive".into())).await.unwrap();
        assert_eq!(catalog.reviews(p.id).await.unwrap()[0].id, second.id);

        catalog.rate(user, p.id, Rating::new(4).unwrap()).await.unwrap();
        let summary = catalog.rate(user, p.id, Rating::new(5).unwrap()).await.unwrap();
        assert_eq!(summary, RatingSummary { count: 2, average: Some(4.5) });
        assert_eq!(catalog.rating(p.id).await.unwrap(), summary);
        assert!(matches!(catalog.rating(Uuid::now_v7()).await, Err(EcommerceError::ProductNotFound(_))));
        assert!(matches!(catalog.add_review(user, Uuid::now_v7(), None).await, Err(EcommerceError::ProductNotFound(_))));
    }
}
