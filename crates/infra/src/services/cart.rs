use tracing::instrument;

use marketplace_cart::{Cart, CartCommand, RemoveItem, SetItem};
use marketplace_core::{Aggregate, AggregateRoot, CartId, DomainError, ExpectedVersion, ProductId, UserId};

use super::views::{CartLineView, CartView};
use super::ServiceResult;
use crate::store::SharedStore;

/// Buyer cart operations.
#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
}

impl CartService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Put `quantity` of a product in the buyer's cart, creating the cart if needed.
    ///
    /// An existing line for the product gets its quantity replaced.
    #[instrument(skip(self), fields(buyer_id = %buyer_id, product_id = %product_id), err)]
    pub async fn add_item(&self, buyer_id: UserId, product_id: ProductId, quantity: i64) -> ServiceResult<CartView> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(DomainError::not_found)?;

        let mut cart = self
            .store
            .load_cart(buyer_id)
            .await?
            .unwrap_or_else(|| Cart::new(CartId::new(), buyer_id));
        let expected = ExpectedVersion::Exact(cart.version());

        cart.execute(&CartCommand::SetItem(SetItem { product, quantity }))?;
        self.store.save_cart(&cart, expected).await?;

        tracing::info!(quantity, total = %cart.total_price(), "cart item set");
        self.view(&cart).await
    }

    /// Change the quantity of a product in the cart. Same rules as [`Self::add_item`].
    pub async fn update_item(&self, buyer_id: UserId, product_id: ProductId, quantity: i64) -> ServiceResult<CartView> {
        self.add_item(buyer_id, product_id, quantity).await
    }

    /// Drop a product's line. Removing the last line deletes the cart.
    #[instrument(skip(self), fields(buyer_id = %buyer_id, product_id = %product_id), err)]
    pub async fn remove_item(&self, buyer_id: UserId, product_id: ProductId) -> ServiceResult<CartView> {
        let mut cart = self
            .store
            .load_cart(buyer_id)
            .await?
            .ok_or_else(DomainError::not_found)?;
        let expected = ExpectedVersion::Exact(cart.version());

        cart.execute(&CartCommand::RemoveItem(RemoveItem { product_id }))?;
        self.store.save_cart(&cart, expected).await?;

        if cart.is_empty() {
            tracing::info!("last item removed; cart deleted");
        }
        self.view(&cart).await
    }

    /// The buyer's cart with product and distributor details; an empty value if none.
    #[instrument(skip(self), fields(buyer_id = %buyer_id), err)]
    pub async fn get_cart(&self, buyer_id: UserId) -> ServiceResult<CartView> {
        match self.store.load_cart(buyer_id).await? {
            Some(cart) => self.view(&cart).await,
            None => Ok(CartView::empty(buyer_id)),
        }
    }

    /// Delete the buyer's cart if there is one.
    pub async fn clear(&self, buyer_id: UserId) -> ServiceResult<()> {
        self.store.delete_cart(buyer_id).await?;
        Ok(())
    }

    async fn view(&self, cart: &Cart) -> ServiceResult<CartView> {
        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = self.store.product(item.product_id).await?;
            let distributor = self.store.distributor(item.distributor_id).await?;
            lines.push(CartLineView {
                product_id: item.product_id,
                product,
                distributor,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total()?,
            });
        }
        Ok(CartView::from_cart(cart, lines))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::ServiceError;
    use crate::store::{CartStore, CatalogStore, InMemoryMarketStore};
    use marketplace_catalog::{Distributor, Product};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<InMemoryMarketStore>,
        service: CartService,
        buyer: UserId,
        flour: Product,
        sugar: Product,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMarketStore::new());
        let seller = UserId::new();
        store
            .insert_distributor(Distributor {
                user_id: seller,
                name: "Aigerim".to_string(),
                company_name: "Steppe Foods".to_string(),
                details: String::new(),
                phone_number: "+7 700 000 0000".to_string(),
                city: "Almaty".to_string(),
                img_url: String::new(),
            })
            .unwrap();

        let product = |name: &str, price, stock, minimum_quantity| Product {
            id: ProductId::new(),
            distributor_id: seller,
            product_name: name.to_string(),
            product_description: String::new(),
            price,
            minimum_quantity,
            stock,
            city: "Almaty".to_string(),
            category: "grocery".to_string(),
            img_urls: Vec::new(),
        };
        let flour = product("Flour", dec!(10), 10, 2);
        let sugar = product("Sugar", dec!(5.555), 3, 1);
        store.insert_product(flour.clone()).unwrap();
        store.insert_product(sugar.clone()).unwrap();

        Fixture {
            service: CartService::new(store.clone()),
            store,
            buyer: UserId::new(),
            flour,
            sugar,
        }
    }

    #[tokio::test]
    async fn add_creates_cart_and_fills_details() {
        let f = fixture();
        let view = f.service.add_item(f.buyer, f.flour.id, 2).await.unwrap();

        assert!(view.id.is_some());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_price, dec!(20));
        let line = &view.items[0];
        assert_eq!(line.product.as_ref().unwrap().product_name, "Flour");
        assert_eq!(line.distributor.as_ref().unwrap().company_name, "Steppe Foods");
    }

    #[tokio::test]
    async fn update_replaces_quantity_and_rounds_total() {
        let f = fixture();
        f.service.add_item(f.buyer, f.sugar.id, 1).await.unwrap();
        let view = f.service.update_item(f.buyer, f.sugar.id, 3).await.unwrap();

        assert_eq!(view.items[0].quantity, 3);
        // 3 * 5.555 = 16.665
        assert_eq!(view.total_price, dec!(16.67));
    }

    #[tokio::test]
    async fn over_stock_fails_and_changes_nothing() {
        let f = fixture();
        let err = f.service.add_item(f.buyer, f.sugar.id, 4).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock { requested: 4, available: 3, .. })
        ));
        assert_eq!(f.store.product(f.sugar.id).await.unwrap().unwrap().stock, 3);
        assert!(f.service.get_cart(f.buyer).await.unwrap().id.is_none());
    }

    #[tokio::test]
    async fn oversized_line_total_is_rejected_without_creating_cart() {
        let f = fixture();
        let bulk = Product {
            id: ProductId::new(),
            price: dec!(9999999999.9999),
            minimum_quantity: 1,
            stock: i64::MAX,
            ..f.flour.clone()
        };
        f.store.insert_product(bulk.clone()).unwrap();

        let err = f.service.add_item(f.buyer, bulk.id, i64::MAX).await.unwrap_err();

        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert!(f.store.load_cart(f.buyer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn below_minimum_is_rejected() {
        let f = fixture();
        let err = f.service.add_item(f.buyer, f.flour.id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::BelowMinimumQuantity { minimum: 2, requested: 1 })
        ));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let f = fixture();
        let err = f.service.add_item(f.buyer, ProductId::new(), 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn removing_last_item_deletes_cart() {
        let f = fixture();
        f.service.add_item(f.buyer, f.flour.id, 2).await.unwrap();
        f.service.add_item(f.buyer, f.sugar.id, 1).await.unwrap();

        let view = f.service.remove_item(f.buyer, f.flour.id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_price, dec!(5.56));

        let view = f.service.remove_item(f.buyer, f.sugar.id).await.unwrap();
        assert_eq!(view, CartView::empty(f.buyer));
        assert!(f.store.load_cart(f.buyer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removing_from_missing_cart_is_not_found() {
        let f = fixture();
        let err = f.service.remove_item(f.buyer, f.flour.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn clear_is_silent_without_cart() {
        let f = fixture();
        f.service.clear(f.buyer).await.unwrap();
        f.service.add_item(f.buyer, f.flour.id, 2).await.unwrap();
        f.service.clear(f.buyer).await.unwrap();
        assert_eq!(f.service.get_cart(f.buyer).await.unwrap(), CartView::empty(f.buyer));
    }
}
