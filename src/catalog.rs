use crate::error::AppError;
use crate::models::{NewProduct, Product};
use crate::store::ProductStore;

pub const NEW_COLLECTION_SIZE: usize = 8;
pub const SHOWCASE_SIZE: usize = 4;
pub const WOMEN_CATEGORY: &str = "women";

pub async fn list_all(products: &dyn ProductStore) -> Result<Vec<Product>, AppError> {
    Ok(products.all().await?)
}

/// The last eight products by insertion, not by their date field.
pub async fn list_new_collections(products: &dyn ProductStore) -> Result<Vec<Product>, AppError> {
    Ok(products.newest(NEW_COLLECTION_SIZE).await?)
}

pub async fn list_popular_in_women(products: &dyn ProductStore) -> Result<Vec<Product>, AppError> {
    Ok(products.by_category(WOMEN_CATEGORY, SHOWCASE_SIZE).await?)
}

pub async fn list_related(
    products: &dyn ProductStore,
    category: &str,
) -> Result<Vec<Product>, AppError> {
    Ok(products.by_category(category, SHOWCASE_SIZE).await?)
}

pub async fn add_product(
    products: &dyn ProductStore,
    product: NewProduct,
) -> Result<Product, AppError> {
    let product = products.insert(product).await?;
    log::info!("Added product {} ({})", product.id, product.name);
    Ok(product)
}

/// Removing an id that does not exist is a no-op, not an error.
pub async fn remove_product(
    products: &dyn ProductStore,
    id: i64,
) -> Result<Option<Product>, AppError> {
    let removed = products.remove(id).await?;
    if removed.is_some() {
        log::info!("Removed product {}", id);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn draft(name: &str, category: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "desc".to_string(),
            image: format!("/images/{name}.png"),
            category: category.to_string(),
            new_price: Some(25.0),
            old_price: Some(40.0),
        }
    }

    async fn seeded(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        let categories = ["women", "men", "kid"];
        for i in 0..count {
            add_product(&store, draft(&format!("p{i}"), categories[i % 3]))
                .await
                .unwrap();
        }
        store
    }

    #[actix_web::test]
    async fn new_collections_is_a_suffix_of_all_products() {
        for count in [0, 3, 8, 13] {
            let store = seeded(count).await;
            let all = list_all(&store).await.unwrap();
            let newest = list_new_collections(&store).await.unwrap();

            assert!(newest.len() <= NEW_COLLECTION_SIZE);
            assert_eq!(newest.len(), count.min(NEW_COLLECTION_SIZE));
            assert_eq!(&all[all.len() - newest.len()..], &newest[..]);
        }
    }

    #[actix_web::test]
    async fn showcases_take_the_first_four_matches() {
        let store = seeded(15).await;

        let women = list_popular_in_women(&store).await.unwrap();
        let ids: Vec<i64> = women.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 4, 7, 10]);

        let men = list_related(&store, "men").await.unwrap();
        assert!(men.iter().all(|p| p.category == "men"));
        assert_eq!(men.len(), SHOWCASE_SIZE);

        assert!(list_related(&store, "shoes").await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn ids_follow_the_current_maximum() {
        let store = seeded(2).await;
        let added = add_product(&store, draft("next", "kid")).await.unwrap();
        assert_eq!(added.id, 3);
        assert!(added.available);
    }

    #[actix_web::test]
    async fn removing_an_absent_product_changes_nothing() {
        let store = seeded(3).await;
        let before = list_all(&store).await.unwrap();

        let removed = remove_product(&store, 99).await.unwrap();

        assert!(removed.is_none());
        assert_eq!(list_all(&store).await.unwrap(), before);
    }
}
